use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PreprocessingError;
use crate::normalizer::TIMESTAMP_PATTERN;

/// A raw social-media post as handed over by a post source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub text: String,
    pub timestamp: Option<String>, // "YYYY:MM:DD HH:MM:SS" prefix when the source emitted one
}

impl Post {
    pub fn new(raw: impl Into<String>) -> Self {
        let text = raw.into();
        let timestamp = TIMESTAMP_PATTERN
            .find(&text)
            .map(|m| m.as_str().trim_end().to_string());

        Self { text, timestamp }
    }
}

/// Normalized post text: lowercase ASCII letters, digits and single spaces.
///
/// Only [`crate::TextNormalizer`] constructs values of this type, so every
/// instance is already a fixed point of normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CleanedText(String);

impl CleanedText {
    pub(crate) fn new_unchecked(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tokens(&self) -> impl Iterator<Item = &str> {
        self.0.split_whitespace()
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for CleanedText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CleanedText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Sentiment classes. The discriminants are the output-layer indices of the
/// trained classifier and must never be reordered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentLabel {
    Negative = 0,
    Neutral = 1,
    Positive = 2,
}

impl SentimentLabel {
    pub const ALL: [SentimentLabel; 3] = [
        SentimentLabel::Negative,
        SentimentLabel::Neutral,
        SentimentLabel::Positive,
    ];

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentLabel::Negative => "Negative",
            SentimentLabel::Neutral => "Neutral",
            SentimentLabel::Positive => "Positive",
        }
    }
}

impl fmt::Display for SentimentLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SentimentLabel {
    type Err = PreprocessingError;

    /// Accepts a class name in any case or a class index.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(index) = trimmed.parse::<usize>() {
            return Self::from_index(index)
                .ok_or_else(|| PreprocessingError::InvalidLabel(trimmed.to_string()));
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "negative" => Ok(SentimentLabel::Negative),
            "neutral" => Ok(SentimentLabel::Neutral),
            "positive" => Ok(SentimentLabel::Positive),
            _ => Err(PreprocessingError::InvalidLabel(trimmed.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_timestamp_extraction() {
        let post = Post::new("2024:01:01 10:00:00 I love this drone!");
        assert_eq!(post.timestamp.as_deref(), Some("2024:01:01 10:00:00"));
        assert_eq!(post.text, "2024:01:01 10:00:00 I love this drone!");

        let post = Post::new("no timestamp here");
        assert!(post.timestamp.is_none());
    }

    #[test]
    fn test_label_index_mapping_is_fixed() {
        assert_eq!(SentimentLabel::from_index(0), Some(SentimentLabel::Negative));
        assert_eq!(SentimentLabel::from_index(1), Some(SentimentLabel::Neutral));
        assert_eq!(SentimentLabel::from_index(2), Some(SentimentLabel::Positive));
        assert_eq!(SentimentLabel::from_index(3), None);

        for label in SentimentLabel::ALL {
            assert_eq!(SentimentLabel::from_index(label.index()), Some(label));
        }
    }

    #[test]
    fn test_label_parsing() {
        assert_eq!("Positive".parse::<SentimentLabel>().unwrap(), SentimentLabel::Positive);
        assert_eq!(" negative ".parse::<SentimentLabel>().unwrap(), SentimentLabel::Negative);
        assert_eq!("1".parse::<SentimentLabel>().unwrap(), SentimentLabel::Neutral);
        assert!("7".parse::<SentimentLabel>().is_err());
        assert!("mixed".parse::<SentimentLabel>().is_err());
    }

    #[test]
    fn test_label_serializes_as_name() {
        let json = serde_json::to_string(&SentimentLabel::Neutral).unwrap();
        assert_eq!(json, "\"Neutral\"");
    }
}
