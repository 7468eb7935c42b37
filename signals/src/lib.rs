//! Product-level sentiment signals.
//!
//! A product's label is derived from the per-post predictions of one
//! classification run. See [`SentimentAggregator`] for the voting policy.

pub mod aggregation;

pub use aggregation::{AggregateResult, SentimentAggregator, SentimentTally};
pub use prodswing_preprocessing::SentimentLabel;
