use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use prodswing_signals::{AggregateResult, SentimentLabel, SentimentTally};
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One tracked product and its latest verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub result: Option<SentimentLabel>,
    #[serde(default)]
    pub tally: Option<SentimentTally>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ProductRecord {
    pub fn new(name: impl Into<String>, category: Option<String>) -> Self {
        Self {
            name: name.into(),
            category,
            result: None,
            tally: None,
            updated_at: None,
        }
    }
}

/// Product records persisted as a JSON array.
#[derive(Debug)]
pub struct ResultStore {
    path: PathBuf,
    records: Vec<ProductRecord>,
}

impl ResultStore {
    /// Opens `path`; a missing file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let records = if path.exists() {
            let content =
                std::fs::read_to_string(&path).with_context(|| format!("Failed to read {:?}", path))?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content).with_context(|| format!("Failed to parse {:?}", path))?
            }
        } else {
            Vec::new()
        };

        debug!("Loaded {} product records from {:?}", records.len(), path);
        Ok(Self { path, records })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn products(&self) -> &[ProductRecord] {
        &self.records
    }

    pub fn get(&self, name: &str) -> Option<&ProductRecord> {
        self.records.iter().find(|record| record.name == name)
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Uniformly random product, or `None` for an empty store.
    pub fn random_product<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&ProductRecord> {
        self.records.choose(rng)
    }

    /// Overwrites the product's result, adding the product when unknown.
    pub fn update_result(&mut self, result: &AggregateResult) {
        let index = match self.records.iter().position(|record| record.name == result.product) {
            Some(index) => index,
            None => {
                info!("Tracking new product '{}'", result.product);
                self.records.push(ProductRecord::new(result.product.clone(), None));
                self.records.len() - 1
            }
        };

        let record = &mut self.records[index];
        record.result = Some(result.label);
        record.tally = Some(result.tally);
        record.updated_at = Some(result.updated_at);
    }

    /// Writes through a temp file in the same directory, then renames.
    pub fn save(&self) -> Result<()> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(&self.records)?;
        let mut file = tempfile::NamedTempFile::new_in(&dir)?;
        file.write_all(json.as_bytes())?;
        file.flush()?;
        file.persist(&self.path)
            .with_context(|| format!("Failed to replace {:?}", self.path))?;

        debug!("Saved {} product records to {:?}", self.records.len(), self.path);
        Ok(())
    }
}
