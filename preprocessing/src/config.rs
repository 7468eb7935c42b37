use crate::error::PreprocessingError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Characters of a raw post read before normalizing; the rest is ignored.
    pub max_text_length: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_text_length: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from environment variables with fallback to defaults
    pub fn from_env_or_default() -> Self {
        let mut config = Self::default();

        if let Ok(max_length_str) = std::env::var("PREPROCESSING_MAX_TEXT_LENGTH") {
            if let Ok(max_length) = max_length_str.parse::<usize>() {
                config.max_text_length = max_length;
            }
        }

        config
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_text_length == 0 {
            return Err(PreprocessingError::Config(
                "Max text length must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = Config::default();
        assert_eq!(config.max_text_length, 10_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_length_rejected() {
        let config = Config { max_text_length: 0 };
        assert!(matches!(config.validate(), Err(PreprocessingError::Config(_))));
    }
}
