use anyhow::{anyhow, Context, Result};
use chrono::{Duration as ChronoDuration, Local, NaiveDateTime, NaiveTime};
use inference::{
    build_vocabulary, train_classifier, write_bundle, ClassificationReport, Device, ModelConfig,
    ReferenceCorpus, SentimentInference, SequenceEncoder, TrainingOptions,
};
use prodswing_signals::AggregateResult;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

use crate::config::AppConfig;
use crate::harvester::{read_posts_file, PostSource};
use crate::output::ResultFormatter;
use crate::results::ResultStore;

pub struct PipelineOrchestrator {
    config: AppConfig,
    inference: Arc<SentimentInference>,
    source: Arc<dyn PostSource>,
    store: ResultStore,
    formatter: ResultFormatter,
}

impl PipelineOrchestrator {
    pub fn new(
        config: AppConfig,
        inference: Arc<SentimentInference>,
        source: Arc<dyn PostSource>,
    ) -> Result<Self> {
        info!("Initializing Pipeline Orchestrator...");
        let store = ResultStore::load(&config.results_path)?;
        if store.is_empty() {
            warn!("No products tracked in {:?} yet", store.path());
        } else {
            info!(
                "Tracking {} products from {:?}",
                store.products().len(),
                store.path()
            );
        }

        Ok(Self {
            config,
            inference,
            source,
            store,
            formatter: ResultFormatter::new(),
        })
    }

    #[cfg(test)]
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Harvests, classifies and stores the verdict for one product.
    #[instrument(skip(self))]
    pub async fn update_product(&mut self, product: &str) -> Result<AggregateResult> {
        let posts = self
            .source
            .fetch_posts(product)
            .await
            .with_context(|| format!("Failed to harvest posts for '{}'", product))?;

        let report = self.inference.classify_detailed(&posts).await?;
        let result = AggregateResult::new(product, report.tally);

        if let Some(previous) = self.store.get(product).and_then(|record| record.result) {
            if previous != result.label {
                info!("'{}' moved from {} to {}", product, previous, result.label);
            }
        }
        self.store.update_result(&result);
        self.store.save()?;

        info!("Updated '{}' result to: {}", product, result.label);
        self.formatter.display_result(&result);
        Ok(result)
    }

    /// One update: the named product, or a random stored one.
    /// Returns `None` when there is nothing to update.
    #[instrument(skip(self, product), fields(product = tracing::field::Empty))]
    pub async fn run_once(&mut self, product: Option<String>) -> Result<Option<AggregateResult>> {
        let product = match product {
            Some(product) => product,
            None => {
                // Pick up edits made to the results file between runs.
                self.store = ResultStore::load(&self.config.results_path)?;
                let mut rng = rand::thread_rng();
                match self.store.random_product(&mut rng) {
                    Some(record) => record.name.clone(),
                    None => {
                        warn!("No products in {:?}; skipping update", self.store.path());
                        return Ok(None);
                    }
                }
            }
        };

        tracing::Span::current().record("product", product.as_str());
        self.update_product(&product).await.map(Some)
    }

    #[instrument(skip(self))]
    pub async fn run_continuous(&mut self) -> Result<()> {
        let at = NaiveTime::from_hms_opt(self.config.schedule_hour, self.config.schedule_minute, 0)
            .ok_or_else(|| {
                anyhow!(
                    "Invalid schedule time {:02}:{:02}",
                    self.config.schedule_hour,
                    self.config.schedule_minute
                )
            })?;

        info!("Starting daily schedule at {} local time", at.format("%H:%M"));
        self.formatter.display_pipeline_start("Continuous");

        loop {
            let now = Local::now().naive_local();
            let next = next_run_after(now, at);
            let wait = (next - now).to_std().unwrap_or_default();

            info!("Next update at {} (in {:?})", next.format("%Y-%m-%d %H:%M"), wait);
            sleep(wait).await;

            if let Err(e) = self.run_once(None).await {
                error!("Scheduled update failed: {:#}", e);
                self.formatter.display_error(&e);
            }
        }
    }

    /// Classifies posts read from a file without touching the result store.
    #[instrument(skip(self))]
    pub async fn classify_file(&self, path: &Path) -> Result<ClassificationReport> {
        let posts = read_posts_file(path)?;
        info!("Classifying {} posts from {:?}", posts.len(), path);

        let report = self.inference.classify_detailed(&posts).await?;
        self.formatter
            .display_report(&path.display().to_string(), &posts, &report);
        Ok(report)
    }
}

/// First instant strictly after `now` whose wall-clock time is `at`.
pub fn next_run_after(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + ChronoDuration::days(1)
    }
}

/// Builds the vocabulary from the reference corpus, trains a classifier and
/// writes its parameter bundle (plus the vocabulary as JSON next to it).
#[instrument(skip(config))]
pub async fn train_model(config: &AppConfig, output: &Path, epochs: usize) -> Result<PathBuf> {
    let corpus = ReferenceCorpus::load(&config.inference.corpus_path).await?;
    info!("Loaded reference corpus with {} rows", corpus.len());

    let model_config = ModelConfig::with_vocab_size(config.inference.vocab_size);
    let vocabulary = build_vocabulary(corpus.training_sentences(), model_config.vocab_size);
    let vocabulary_path = output.with_extension("vocab.json");
    vocabulary.save(&vocabulary_path)?;

    let encoder = SequenceEncoder::new(vocabulary, model_config.sequence_length);
    let options = TrainingOptions {
        epochs,
        batch_size: config.inference.batch_size,
        ..TrainingOptions::default()
    };

    let output = output.to_path_buf();
    let bundle_path = output.clone();
    let history = tokio::task::spawn_blocking(move || -> Result<_> {
        let (classifier, history) =
            train_classifier(&corpus, &encoder, model_config, &options, &Device::Cpu)?;
        write_bundle(&classifier, &output)?;
        Ok(history)
    })
    .await??;

    ResultFormatter::new().display_training(&history);
    info!(
        "Wrote bundle to {:?} and vocabulary to {:?} (serve it with VOCAB_PATH)",
        bundle_path, vocabulary_path
    );
    Ok(bundle_path)
}
