use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PreprocessingError {
    #[error("Invalid sentiment label: {0}")]
    InvalidLabel(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for preprocessing operations
pub type Result<T> = std::result::Result<T, PreprocessingError>;
