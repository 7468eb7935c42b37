use anyhow::{bail, Result};
use inference::InferenceConfig;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub results_path: PathBuf,
    pub harvest_command: String,
    pub harvest_package: String,
    pub harvest_output_dir: PathBuf,
    pub twitter_auth_token: Option<String>,
    pub harvest_limit: usize,
    pub harvest_lookback_days: i64,
    pub harvest_timeout_secs: u64,
    pub schedule_hour: u32,
    pub schedule_minute: u32,
    pub inference: InferenceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            results_path: PathBuf::from("results.json"),
            harvest_command: "npx".to_string(),
            harvest_package: "tweet-harvest@2.6.1".to_string(),
            harvest_output_dir: PathBuf::from("tweets-data"),
            twitter_auth_token: None,
            harvest_limit: 15,
            harvest_lookback_days: 5,
            harvest_timeout_secs: 300,
            schedule_hour: 1,
            schedule_minute: 10,
            inference: InferenceConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env_or_default() -> Self {
        let mut config = Self {
            inference: InferenceConfig::from_env_or_default(),
            ..Self::default()
        };

        if let Ok(path) = std::env::var("RESULTS_PATH") {
            config.results_path = PathBuf::from(path);
        }

        if let Ok(command) = std::env::var("HARVEST_COMMAND") {
            config.harvest_command = command;
        }

        if let Ok(package) = std::env::var("HARVEST_PACKAGE") {
            config.harvest_package = package;
        }

        if let Ok(dir) = std::env::var("HARVEST_OUTPUT_DIR") {
            config.harvest_output_dir = PathBuf::from(dir);
        }

        if let Ok(token) = std::env::var("TWITTER_AUTH_TOKEN") {
            if !token.trim().is_empty() {
                config.twitter_auth_token = Some(token);
            }
        }

        if let Ok(limit_str) = std::env::var("HARVEST_LIMIT") {
            if let Ok(limit) = limit_str.parse::<usize>() {
                config.harvest_limit = limit;
            }
        }

        if let Ok(days_str) = std::env::var("HARVEST_LOOKBACK_DAYS") {
            if let Ok(days) = days_str.parse::<i64>() {
                config.harvest_lookback_days = days;
            }
        }

        if let Ok(timeout_str) = std::env::var("HARVEST_TIMEOUT_SECS") {
            if let Ok(timeout) = timeout_str.parse::<u64>() {
                config.harvest_timeout_secs = timeout;
            }
        }

        if let Ok(hour_str) = std::env::var("SCHEDULE_HOUR") {
            if let Ok(hour) = hour_str.parse::<u32>() {
                config.schedule_hour = hour;
            }
        }

        if let Ok(minute_str) = std::env::var("SCHEDULE_MINUTE") {
            if let Ok(minute) = minute_str.parse::<u32>() {
                config.schedule_minute = minute;
            }
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        self.inference.validate()?;

        if self.harvest_command.trim().is_empty() {
            bail!("Harvest command cannot be empty");
        }

        if self.harvest_limit == 0 {
            bail!("Harvest limit must be greater than zero");
        }

        if self.harvest_lookback_days < 1 {
            bail!("Harvest lookback must be at least one day");
        }

        if self.harvest_timeout_secs == 0 {
            bail!("Harvest timeout must be greater than zero");
        }

        if self.schedule_hour > 23 || self.schedule_minute > 59 {
            bail!(
                "Invalid schedule time {:02}:{:02}",
                self.schedule_hour,
                self.schedule_minute
            );
        }

        Ok(())
    }
}
