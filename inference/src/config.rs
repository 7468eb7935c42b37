use prodswing_preprocessing::{Config as PreprocessingConfig, SentimentLabel};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{InferenceError, Result};

pub const MODEL_FORMAT_VERSION: u32 = 1;

/// Hyperparameters a parameter bundle was trained with.
///
/// Serialized next to the weights so that a runtime with different
/// constants refuses the bundle instead of mispredicting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub format_version: u32,
    pub vocab_size: usize,
    pub sequence_length: usize,
    pub embedding_dim: usize,
    pub lstm_units: usize,
    pub conv_filters: usize,
    pub conv_kernel: usize,
    pub dense_units: [usize; 2],
    pub dropout: f32,
    pub labels: Vec<SentimentLabel>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            format_version: MODEL_FORMAT_VERSION,
            vocab_size: 500_000,
            sequence_length: 100,
            embedding_dim: 100,
            lstm_units: 64,
            conv_filters: 128,
            conv_kernel: 5,
            dense_units: [64, 32],
            dropout: 0.5,
            labels: SentimentLabel::ALL.to_vec(),
        }
    }
}

impl ModelConfig {
    pub fn with_vocab_size(vocab_size: usize) -> Self {
        Self {
            vocab_size,
            ..Self::default()
        }
    }

    pub fn num_classes(&self) -> usize {
        self.labels.len()
    }

    pub fn validate(&self) -> Result<()> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(InferenceError::config(format!(
                "Unsupported model format version {} (expected {})",
                self.format_version, MODEL_FORMAT_VERSION
            )));
        }

        if self.vocab_size < 2 {
            return Err(InferenceError::config(
                "Vocabulary size must leave room for padding and the OOV sentinel",
            ));
        }

        if self.embedding_dim == 0
            || self.lstm_units == 0
            || self.conv_filters == 0
            || self.conv_kernel == 0
            || self.dense_units.iter().any(|&units| units == 0)
        {
            return Err(InferenceError::config("Layer sizes must be greater than zero"));
        }

        if self.sequence_length < self.conv_kernel {
            return Err(InferenceError::config(format!(
                "Sequence length {} is shorter than the convolution kernel {}",
                self.sequence_length, self.conv_kernel
            )));
        }

        if !(0.0..1.0).contains(&self.dropout) {
            return Err(InferenceError::config("Dropout must be in [0, 1)"));
        }

        if self.labels.as_slice() != SentimentLabel::ALL.as_slice() {
            return Err(InferenceError::config(format!(
                "Label order {:?} does not match Negative, Neutral, Positive",
                self.labels
            )));
        }

        Ok(())
    }
}

/// Runtime settings for fetching the model and building the vocabulary.
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub model_base_url: String,
    pub model_identifier: String,
    pub scratch_dir: PathBuf,
    pub fetch_max_retries: usize,
    pub fetch_backoff_ms: u64,
    pub fetch_timeout_secs: u64,
    pub corpus_path: String,
    /// Vocabulary written by training; when unset it is rebuilt from the corpus.
    pub vocab_path: Option<PathBuf>,
    pub vocab_size: usize,
    pub batch_size: usize,
    pub preprocessing: PreprocessingConfig,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            model_base_url: "https://storage.googleapis.com/prodswing-ml".to_string(),
            model_identifier: "sentiment_analysis_model_500000.safetensors".to_string(),
            scratch_dir: std::env::temp_dir(),
            fetch_max_retries: 3,
            fetch_backoff_ms: 500,
            fetch_timeout_secs: 120,
            corpus_path: "https://storage.googleapis.com/prodswing-ml/shuffled_df.csv".to_string(),
            vocab_path: None,
            vocab_size: 500_000,
            batch_size: 32,
            preprocessing: PreprocessingConfig::default(),
        }
    }
}

impl InferenceConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("MODEL_BASE_URL") {
            config.model_base_url = url;
        }

        if let Ok(identifier) = std::env::var("MODEL_IDENTIFIER") {
            config.model_identifier = identifier;
        }

        if let Ok(dir) = std::env::var("MODEL_SCRATCH_DIR") {
            config.scratch_dir = PathBuf::from(dir);
        }

        if let Ok(retries_str) = std::env::var("MODEL_FETCH_MAX_RETRIES") {
            if let Ok(retries) = retries_str.parse::<usize>() {
                config.fetch_max_retries = retries;
            }
        }

        if let Ok(backoff_str) = std::env::var("MODEL_FETCH_BACKOFF_MS") {
            if let Ok(backoff) = backoff_str.parse::<u64>() {
                config.fetch_backoff_ms = backoff;
            }
        }

        if let Ok(timeout_str) = std::env::var("MODEL_FETCH_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                config.fetch_timeout_secs = timeout;
            }
        }

        if let Ok(corpus) = std::env::var("CORPUS_PATH") {
            config.corpus_path = corpus;
        }

        if let Ok(path) = std::env::var("VOCAB_PATH") {
            if !path.is_empty() {
                config.vocab_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(vocab_str) = std::env::var("VOCAB_SIZE") {
            if let Ok(vocab_size) = vocab_str.parse::<usize>() {
                config.vocab_size = vocab_size;
            }
        }

        if let Ok(batch_str) = std::env::var("INFERENCE_BATCH_SIZE") {
            if let Ok(batch_size) = batch_str.parse::<usize>() {
                config.batch_size = batch_size;
            }
        }

        config.preprocessing = PreprocessingConfig::from_env_or_default();
        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.model_base_url.is_empty() {
            return Err(InferenceError::config("Model base URL cannot be empty"));
        }

        if self.model_identifier.is_empty() {
            return Err(InferenceError::config("Model identifier cannot be empty"));
        }

        if self.fetch_max_retries == 0 {
            return Err(InferenceError::config("At least one fetch attempt is required"));
        }

        if self.fetch_timeout_secs == 0 {
            return Err(InferenceError::config("Fetch timeout must be greater than zero"));
        }

        if self.corpus_path.is_empty() {
            return Err(InferenceError::config("Corpus path cannot be empty"));
        }

        if self.vocab_size < 2 {
            return Err(InferenceError::config("Vocabulary size must be at least 2"));
        }

        if self.batch_size == 0 {
            return Err(InferenceError::config("Batch size must be greater than zero"));
        }

        self.preprocessing
            .validate()
            .map_err(|e| InferenceError::config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.vocab_size, 500_000);
        assert_eq!(config.sequence_length, 100);
        assert_eq!(config.embedding_dim, 100);
        assert_eq!(config.num_classes(), 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_model_config_validation() {
        let mut config = ModelConfig::with_vocab_size(1);
        assert!(config.validate().is_err());

        config.vocab_size = 50;
        config.sequence_length = 4;
        assert!(config.validate().is_err(), "sequence shorter than kernel");

        config.sequence_length = 10;
        config.dropout = 1.0;
        assert!(config.validate().is_err());

        config.dropout = 0.5;
        config.labels = vec![SentimentLabel::Positive, SentimentLabel::Neutral, SentimentLabel::Negative];
        assert!(config.validate().is_err(), "label order is fixed");

        config.labels = SentimentLabel::ALL.to_vec();
        config.format_version = 99;
        assert!(config.validate().is_err());

        config.format_version = MODEL_FORMAT_VERSION;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_model_config_json_roundtrip() {
        let config = ModelConfig::with_vocab_size(1000);
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("\"labels\":[\"Negative\",\"Neutral\",\"Positive\"]"));
        let back: ModelConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_inference_config_validation() {
        let mut config = InferenceConfig::default();
        assert!(config.validate().is_ok());

        config.batch_size = 0;
        assert!(config.validate().is_err());

        config.batch_size = 8;
        config.fetch_max_retries = 0;
        assert!(config.validate().is_err());

        config.fetch_max_retries = 3;
        config.preprocessing.max_text_length = 0;
        assert!(matches!(config.validate(), Err(InferenceError::Config(_))));
    }
}
