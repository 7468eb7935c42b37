//! Sentiment classification of product posts.
//!
//! Posts are normalized, encoded against a frequency-ranked [`Vocabulary`]
//! and scored by a [`SentimentClassifier`] that the [`ModelRegistry`]
//! fetches once per process. [`SentimentInference`] ties these together
//! and folds the per-post labels into a product verdict.

pub mod bundle;
pub mod config;
pub mod corpus;
pub mod encoder;
pub mod error;
pub mod inference;
pub mod model;
pub mod registry;
pub mod store;
pub mod training;
pub mod vocabulary;

pub use bundle::{load_bundle, load_bundle_file, save_bundle, write_bundle};
pub use config::{InferenceConfig, ModelConfig};
pub use corpus::{LabeledText, ReferenceCorpus};
pub use encoder::{encode, EncodedSequence, SequenceEncoder};
pub use error::{InferenceError, Result};
pub use inference::{ClassificationReport, SentimentInference};
pub use model::SentimentClassifier;
pub use registry::ModelRegistry;
pub use store::{HttpParameterStore, LocalParameterStore, ParameterStore};
pub use training::{train_classifier, EpochMetrics, TrainingHistory, TrainingOptions};
pub use vocabulary::{build_vocabulary, Vocabulary};

pub use candle_core::Device;
