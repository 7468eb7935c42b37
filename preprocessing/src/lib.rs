// Post normalization and the data model shared by the classification crates

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod config;
pub mod error;
pub mod models;
pub mod normalizer;

pub use config::Config;
pub use error::{PreprocessingError, Result};
pub use models::{CleanedText, Post, SentimentLabel};
pub use normalizer::{normalize, TextNormalizer};
