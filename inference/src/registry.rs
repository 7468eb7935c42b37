use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use candle_core::Device;
use tokio::sync::OnceCell;

use crate::bundle::load_bundle_file;
use crate::config::InferenceConfig;
use crate::model::SentimentClassifier;
use crate::store::{HttpParameterStore, ParameterStore};
use crate::{InferenceError, Result};

/// Lazily fetched, process-wide classifier.
///
/// The first `get` fetches and loads the bundle; concurrent first callers
/// wait on that same load. A failed load leaves the registry empty so the
/// next call tries again.
pub struct ModelRegistry {
    store: Arc<dyn ParameterStore>,
    identifier: String,
    scratch_dir: PathBuf,
    device: Device,
    model: OnceCell<Arc<SentimentClassifier>>,
}

impl ModelRegistry {
    pub fn new(
        store: Arc<dyn ParameterStore>,
        identifier: impl Into<String>,
        scratch_dir: impl Into<PathBuf>,
        device: Device,
    ) -> Self {
        Self {
            store,
            identifier: identifier.into(),
            scratch_dir: scratch_dir.into(),
            device,
            model: OnceCell::new(),
        }
    }

    /// HTTP-backed registry on the CPU device.
    pub fn from_config(config: &InferenceConfig) -> Result<Self> {
        let store = HttpParameterStore::from_config(config)?;
        Ok(Self::new(
            Arc::new(store),
            config.model_identifier.clone(),
            config.scratch_dir.clone(),
            Device::Cpu,
        ))
    }

    pub async fn get(&self) -> Result<Arc<SentimentClassifier>> {
        self.model
            .get_or_try_init(|| self.load())
            .await
            .map(Arc::clone)
    }

    pub fn is_loaded(&self) -> bool {
        self.model.initialized()
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn load(&self) -> Result<Arc<SentimentClassifier>> {
        let started = Instant::now();
        tracing::info!("Loading sentiment model '{}'", self.identifier);

        let bytes = self
            .store
            .fetch(&self.identifier)
            .await
            .map_err(|e| unavailable("fetch", e))?;

        let destination = self.scratch_dir.join(basename(&self.identifier)?);
        let scratch_dir = self.scratch_dir.clone();
        let device = self.device.clone();

        let classifier = tokio::task::spawn_blocking(move || -> Result<SentimentClassifier> {
            persist_bundle(&scratch_dir, &destination, &bytes).map_err(|e| unavailable("persist", e))?;
            load_bundle_file(&destination, &device).map_err(|e| unavailable("load", e))
        })
        .await
        .map_err(|e| InferenceError::model_unavailable(format!("Model load task failed: {}", e)))??;

        tracing::info!(
            "Sentiment model '{}' ready in {:.2?} (vocabulary {})",
            self.identifier,
            started.elapsed(),
            classifier.config().vocab_size
        );

        Ok(Arc::new(classifier))
    }
}

/// Everything but a vocabulary mismatch surfaces as `ModelUnavailable`.
fn unavailable(stage: &str, error: InferenceError) -> InferenceError {
    match error {
        InferenceError::ModelUnavailable(_) | InferenceError::VocabularyMismatch { .. } => error,
        other => InferenceError::model_unavailable(format!("Model {} failed: {}", stage, other)),
    }
}

fn basename(identifier: &str) -> Result<&str> {
    Path::new(identifier)
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            InferenceError::model_unavailable(format!("Identifier '{}' has no file name", identifier))
        })
}

/// Writes through a uniquely named temp file so a concurrent reader never
/// sees a partial bundle at `destination`.
fn persist_bundle(scratch_dir: &Path, destination: &Path, bytes: &[u8]) -> Result<()> {
    std::fs::create_dir_all(scratch_dir)?;

    let mut file = tempfile::NamedTempFile::new_in(scratch_dir)?;
    file.write_all(bytes)?;
    file.flush()?;
    file.persist(destination).map_err(|e| InferenceError::Io(e.error))?;

    tracing::debug!("Persisted {} bytes to {:?}", bytes.len(), destination);
    Ok(())
}
