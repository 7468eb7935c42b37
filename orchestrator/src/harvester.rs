use anyhow::{anyhow, bail, Context, Result};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDate};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use crate::config::AppConfig;

/// Column the harvester writes post bodies to.
pub const TEXT_COLUMN: &str = "full_text";

/// Anything that can produce recent posts mentioning a product.
#[async_trait]
pub trait PostSource: Send + Sync {
    async fn fetch_posts(&self, product: &str) -> Result<Vec<String>>;
}

/// Runs the external scraping tool and reads back its CSV output.
pub struct TweetHarvester {
    command: String,
    package: String,
    output_dir: PathBuf,
    auth_token: Option<String>,
    limit: usize,
    lookback_days: i64,
    run_timeout: Duration,
}

impl TweetHarvester {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            command: config.harvest_command.clone(),
            package: config.harvest_package.clone(),
            output_dir: config.harvest_output_dir.clone(),
            auth_token: config.twitter_auth_token.clone(),
            limit: config.harvest_limit,
            lookback_days: config.harvest_lookback_days,
            run_timeout: Duration::from_secs(config.harvest_timeout_secs),
        }
    }

    /// Search window: `lookback_days` before `today` up to `today`.
    pub fn window(&self, today: NaiveDate) -> (NaiveDate, NaiveDate) {
        (today - ChronoDuration::days(self.lookback_days), today)
    }

    pub fn search_query(&self, product: &str, today: NaiveDate) -> String {
        let (since, until) = self.window(today);
        format!(
            "{} lang:en since:{} until:{}",
            product,
            since.format("%Y-%m-%d"),
            until.format("%Y-%m-%d")
        )
    }

    pub fn output_filename(&self, product: &str, today: NaiveDate) -> String {
        let (since, _) = self.window(today);
        format!("updated_{}_{}.csv", product, since.format("%Y-%m-%d"))
    }

    pub fn build_args(&self, product: &str, today: NaiveDate, token: &str) -> Vec<String> {
        vec![
            "--yes".to_string(),
            self.package.clone(),
            "-o".to_string(),
            self.output_filename(product, today),
            "-s".to_string(),
            self.search_query(product, today),
            "--tab".to_string(),
            "LATEST".to_string(),
            "-l".to_string(),
            self.limit.to_string(),
            "--token".to_string(),
            token.to_string(),
        ]
    }

    async fn run_tool(&self, args: Vec<String>) -> Result<()> {
        // kill_on_drop: a timed-out wait drops the child and kills it.
        let child = Command::new(&self.command)
            .args(&args)
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start harvest command '{}'", self.command))?;

        match timeout(self.run_timeout, child.wait_with_output()).await {
            Ok(Ok(output)) if output.status.success() => {
                debug!("Harvest command finished: {}", output.status);
                Ok(())
            }
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                bail!("Harvest command exited with {}: {}", output.status, stderr.trim())
            }
            Ok(Err(e)) => Err(anyhow!("Error waiting for harvest command: {}", e)),
            Err(_) => {
                warn!("Harvest command exceeded {:?}, killed", self.run_timeout);
                bail!("Harvest command timed out after {:?}", self.run_timeout)
            }
        }
    }
}

#[async_trait]
impl PostSource for TweetHarvester {
    async fn fetch_posts(&self, product: &str) -> Result<Vec<String>> {
        let token = self
            .auth_token
            .as_deref()
            .ok_or_else(|| anyhow!("TWITTER_AUTH_TOKEN is not set"))?;

        let today = chrono::Local::now().date_naive();
        let output_path = self.output_dir.join(self.output_filename(product, today));

        info!("Harvesting posts for '{}': {}", product, self.search_query(product, today));
        self.run_tool(self.build_args(product, today, token)).await?;

        if !output_path.exists() {
            // The tool writes no file when the search returns nothing.
            warn!("No harvest output at {:?}; treating as zero posts", output_path);
            return Ok(Vec::new());
        }

        let posts = read_csv_posts(&output_path);
        if let Err(e) = std::fs::remove_file(&output_path) {
            warn!("Failed to remove harvest output {:?}: {}", output_path, e);
        }

        let posts = posts?;
        info!("Harvested {} posts for '{}'", posts.len(), product);
        Ok(posts)
    }
}

/// Reads the `full_text` column of a harvest CSV.
pub fn read_csv_posts(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {:?}", path))?;

    let column = reader
        .headers()?
        .iter()
        .position(|header| header.trim() == TEXT_COLUMN)
        .ok_or_else(|| anyhow!("{:?} has no '{}' column", path, TEXT_COLUMN))?;

    let mut posts = Vec::new();
    for record in reader.records() {
        let record = record?;
        posts.push(record.get(column).unwrap_or("").to_string());
    }
    Ok(posts)
}

/// Posts from a harvest CSV, or one post per non-empty line of a text file.
pub fn read_posts_file(path: &Path) -> Result<Vec<String>> {
    let is_csv = path
        .extension()
        .map_or(false, |ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        return read_csv_posts(path);
    }

    let content = std::fs::read_to_string(path).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}
