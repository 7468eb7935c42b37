use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::InferenceConfig;
use crate::{InferenceError, Result};

/// Source of serialized parameter bundles.
#[async_trait]
pub trait ParameterStore: Send + Sync {
    async fn fetch(&self, identifier: &str) -> Result<Vec<u8>>;
}

/// Fetches bundles with `GET {base_url}/{identifier}`.
pub struct HttpParameterStore {
    client: reqwest::Client,
    base_url: String,
    max_retries: usize,
    backoff: Duration,
}

impl HttpParameterStore {
    pub fn new(
        base_url: impl Into<String>,
        max_retries: usize,
        backoff: Duration,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            max_retries: max_retries.max(1),
            backoff,
        })
    }

    pub fn from_config(config: &InferenceConfig) -> Result<Self> {
        Self::new(
            config.model_base_url.clone(),
            config.fetch_max_retries,
            Duration::from_millis(config.fetch_backoff_ms),
            Duration::from_secs(config.fetch_timeout_secs),
        )
    }

    pub fn url_for(&self, identifier: &str) -> String {
        format!("{}/{}", self.base_url, identifier.trim_start_matches('/'))
    }

    async fn fetch_once(&self, url: &str) -> std::result::Result<Vec<u8>, String> {
        let response = self.client.get(url).send().await.map_err(|e| e.to_string())?;

        let status = response.status();
        if !status.is_success() {
            return Err(format!("HTTP {}", status));
        }

        let bytes = response.bytes().await.map_err(|e| e.to_string())?;
        Ok(bytes.to_vec())
    }
}

#[async_trait]
impl ParameterStore for HttpParameterStore {
    async fn fetch(&self, identifier: &str) -> Result<Vec<u8>> {
        let url = self.url_for(identifier);
        let mut last_error = String::from("no attempt made");

        for attempt in 0..self.max_retries {
            match self.fetch_once(&url).await {
                Ok(bytes) => {
                    tracing::info!("Fetched {} bytes from {}", bytes.len(), url);
                    return Ok(bytes);
                }
                Err(e) => {
                    tracing::warn!(
                        "Fetch attempt {}/{} for {} failed: {}",
                        attempt + 1,
                        self.max_retries,
                        url,
                        e
                    );
                    last_error = e;

                    if attempt + 1 < self.max_retries {
                        tokio::time::sleep(backoff_delay(self.backoff, attempt)).await;
                    }
                }
            }
        }

        Err(InferenceError::model_unavailable(format!(
            "Could not fetch {} after {} attempts: {}",
            url, self.max_retries, last_error
        )))
    }
}

/// `backoff * 2^attempt`, saturating instead of overflowing.
fn backoff_delay(backoff: Duration, attempt: usize) -> Duration {
    backoff
        .checked_mul(1u32 << attempt.min(16))
        .unwrap_or(Duration::MAX)
}

/// Reads bundles from `{root}/{identifier}`.
pub struct LocalParameterStore {
    root: PathBuf,
}

impl LocalParameterStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

#[async_trait]
impl ParameterStore for LocalParameterStore {
    async fn fetch(&self, identifier: &str) -> Result<Vec<u8>> {
        let path = self.root.join(identifier);
        tokio::fs::read(&path).await.map_err(|e| {
            InferenceError::model_unavailable(format!("Could not read {:?}: {}", path, e))
        })
    }
}
