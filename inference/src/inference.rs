use std::sync::Arc;
use std::time::Instant;

use prodswing_preprocessing::{SentimentLabel, TextNormalizer};
use prodswing_signals::{SentimentAggregator, SentimentTally};
use serde::Serialize;

use crate::config::InferenceConfig;
use crate::corpus::ReferenceCorpus;
use crate::encoder::{encode, EncodedSequence};
use crate::registry::ModelRegistry;
use crate::vocabulary::{build_vocabulary, Vocabulary};
use crate::{InferenceError, Result};

/// Outcome of classifying one batch of posts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassificationReport {
    pub label: SentimentLabel,
    pub tally: SentimentTally,
    /// Per-post labels in input order.
    pub predictions: Vec<SentimentLabel>,
}

/// Raw posts in, product-level sentiment out.
pub struct SentimentInference {
    registry: Arc<ModelRegistry>,
    vocabulary: Arc<Vocabulary>,
    normalizer: TextNormalizer,
    batch_size: usize,
}

impl SentimentInference {
    pub fn new(registry: Arc<ModelRegistry>, vocabulary: Vocabulary, batch_size: usize) -> Self {
        Self {
            registry,
            vocabulary: Arc::new(vocabulary),
            normalizer: TextNormalizer::new(),
            batch_size: batch_size.max(1),
        }
    }

    /// Loads or rebuilds the vocabulary and wires an HTTP-backed registry.
    /// The model itself is fetched on first use.
    pub async fn from_config(config: &InferenceConfig) -> Result<Self> {
        config.validate()?;

        let vocabulary = load_vocabulary(config).await?;
        let registry = ModelRegistry::from_config(config)?;

        Ok(Self::new(Arc::new(registry), vocabulary, config.batch_size)
            .with_normalizer(TextNormalizer::with_config(&config.preprocessing)))
    }

    pub fn with_normalizer(mut self, normalizer: TextNormalizer) -> Self {
        self.normalizer = normalizer;
        self
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    /// Per-post labels, in input order. No model is fetched for an empty batch.
    pub async fn predict_posts<S: AsRef<str>>(&self, posts: &[S]) -> Result<Vec<SentimentLabel>> {
        if posts.is_empty() {
            return Ok(Vec::new());
        }

        let cleaned = self.normalizer.normalize_batch(posts);
        let model = self.registry.get().await?;

        let config = model.config();
        if self.vocabulary.capacity() != config.vocab_size {
            return Err(InferenceError::VocabularyMismatch {
                expected: config.vocab_size,
                actual: self.vocabulary.capacity(),
            });
        }

        let sequences: Vec<EncodedSequence> = cleaned
            .iter()
            .map(|text| encode(text, &self.vocabulary, config.sequence_length))
            .collect();

        let batch_size = self.batch_size;
        let started = Instant::now();

        let predictions = tokio::task::spawn_blocking(move || -> Result<Vec<SentimentLabel>> {
            let mut labels = Vec::with_capacity(sequences.len());
            for chunk in sequences.chunks(batch_size) {
                labels.extend(model.predict(chunk)?);
            }
            Ok(labels)
        })
        .await
        .map_err(|e| InferenceError::Other(anyhow::anyhow!("Prediction task failed: {}", e)))??;

        tracing::debug!("Predicted {} posts in {:.2?}", predictions.len(), started.elapsed());
        Ok(predictions)
    }

    pub async fn classify<S: AsRef<str>>(&self, posts: &[S]) -> Result<SentimentLabel> {
        let predictions = self.predict_posts(posts).await?;
        Ok(SentimentAggregator::aggregate(&predictions))
    }

    pub async fn classify_detailed<S: AsRef<str>>(&self, posts: &[S]) -> Result<ClassificationReport> {
        let predictions = self.predict_posts(posts).await?;
        let tally = SentimentTally::from_labels(&predictions);
        let label = SentimentAggregator::aggregate(&predictions);

        tracing::info!(
            "Classified {} posts as {} (pos={}, neu={}, neg={})",
            predictions.len(),
            label,
            tally.positive,
            tally.neutral,
            tally.negative
        );

        Ok(ClassificationReport {
            label,
            tally,
            predictions,
        })
    }
}

/// The vocabulary saved by training when `vocab_path` is set, otherwise one
/// rebuilt from the reference corpus.
async fn load_vocabulary(config: &InferenceConfig) -> Result<Vocabulary> {
    if let Some(path) = &config.vocab_path {
        let vocabulary = Vocabulary::load(path)?;
        tracing::info!("Loaded vocabulary of {} tokens from {:?}", vocabulary.len(), path);
        return Ok(vocabulary);
    }

    let corpus = ReferenceCorpus::load(&config.corpus_path).await?;
    Ok(build_vocabulary(corpus.training_sentences(), config.vocab_size))
}
