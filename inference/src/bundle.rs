//! Safetensors parameter bundles.
//!
//! The header metadata carries the [`ModelConfig`] under
//! [`CONFIG_METADATA_KEY`], so a bundle is self-describing and is rejected
//! when its shapes disagree with the configuration it claims.

use std::collections::HashMap;
use std::path::Path;

use candle_core::Device;
use safetensors::SafeTensors;

use crate::config::ModelConfig;
use crate::model::SentimentClassifier;
use crate::{InferenceError, Result};

pub const CONFIG_METADATA_KEY: &str = "prodswing.model_config";

const EMBEDDING_TENSOR: &str = "embedding.weight";

/// Serializes the classifier's parameters and configuration.
pub fn save_bundle(classifier: &SentimentClassifier) -> Result<Vec<u8>> {
    let tensors = classifier.named_tensors()?;

    let mut metadata = HashMap::new();
    metadata.insert(
        CONFIG_METADATA_KEY.to_string(),
        serde_json::to_string(classifier.config())?,
    );

    let data = tensors.iter().map(|(name, tensor)| (name.as_str(), tensor));
    safetensors::serialize(data, &Some(metadata))
        .map_err(|e| InferenceError::Other(anyhow::anyhow!("Failed to serialize bundle: {}", e)))
}

pub fn write_bundle(classifier: &SentimentClassifier, path: &Path) -> Result<()> {
    let bytes = save_bundle(classifier)?;
    std::fs::write(path, &bytes)?;

    tracing::info!(
        "Wrote parameter bundle ({} bytes, vocabulary {}) to {:?}",
        bytes.len(),
        classifier.config().vocab_size,
        path
    );
    Ok(())
}

/// Reads only the configuration from a bundle's header.
pub fn read_bundle_config(bytes: &[u8]) -> Result<ModelConfig> {
    let (_, metadata) = SafeTensors::read_metadata(bytes)
        .map_err(|e| InferenceError::model_unavailable(format!("Malformed bundle header: {}", e)))?;

    let raw = metadata
        .metadata()
        .as_ref()
        .and_then(|entries| entries.get(CONFIG_METADATA_KEY))
        .ok_or_else(|| {
            InferenceError::model_unavailable(format!(
                "Bundle metadata has no '{}' entry",
                CONFIG_METADATA_KEY
            ))
        })?;

    serde_json::from_str(raw)
        .map_err(|e| InferenceError::model_unavailable(format!("Malformed model config: {}", e)))
}

pub fn load_bundle(bytes: &[u8], device: &Device) -> Result<SentimentClassifier> {
    let config = read_bundle_config(bytes)?;
    config.validate()?;

    let tensors = candle_core::safetensors::load_buffer(bytes, device)
        .map_err(|e| InferenceError::model_unavailable(format!("Malformed bundle tensors: {}", e)))?;

    let embedding = tensors.get(EMBEDDING_TENSOR).ok_or_else(|| {
        InferenceError::model_unavailable(format!("Bundle has no '{}' tensor", EMBEDDING_TENSOR))
    })?;
    let (rows, width) = embedding.dims2()?;
    if rows != config.vocab_size {
        return Err(InferenceError::VocabularyMismatch {
            expected: config.vocab_size,
            actual: rows,
        });
    }
    if width != config.embedding_dim {
        return Err(InferenceError::model_unavailable(format!(
            "Embedding width {} does not match configured {}",
            width, config.embedding_dim
        )));
    }

    let classifier = SentimentClassifier::from_tensors(config, tensors, device)?;
    tracing::debug!(
        "Loaded bundle: vocabulary {}, sequence length {}",
        classifier.config().vocab_size,
        classifier.config().sequence_length
    );
    Ok(classifier)
}

pub fn load_bundle_file(path: &Path, device: &Device) -> Result<SentimentClassifier> {
    let bytes = std::fs::read(path)?;
    load_bundle(&bytes, device)
}
