use thiserror::Error;
use anyhow::Error as AnyhowError;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Vocabulary mismatch: model expects {expected} entries, got {actual}")]
    VocabularyMismatch { expected: usize, actual: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input validation failed: {0}")]
    InvalidInput(String),

    #[error("Training failed: {0}")]
    Training(String),

    #[error("Reference corpus error: {0}")]
    Corpus(String),

    #[error("Tensor error: {0}")]
    Candle(#[from] candle_core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Other error: {0}")]
    Other(#[from] AnyhowError),
}

impl InferenceError {
    pub fn model_unavailable(message: impl Into<String>) -> Self {
        Self::ModelUnavailable(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}

impl From<csv::Error> for InferenceError {
    fn from(err: csv::Error) -> Self {
        InferenceError::Corpus(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, InferenceError>;
