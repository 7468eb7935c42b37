use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use crate::{InferenceError, Result};

pub const PADDING_INDEX: u32 = 0;
pub const OOV_INDEX: u32 = 1;
pub const OOV_TOKEN: &str = "<OOV>";

/// Frequency-ranked token index.
///
/// `max_size` counts index slots: 0 is padding, 1 is the OOV sentinel and the
/// `max_size - 2` most frequent tokens take 2..max_size. Every index fits an
/// embedding table with `max_size` rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vocabulary {
    max_size: usize,
    word_index: HashMap<String, u32>,
}

/// Builds a vocabulary from an ordered corpus of cleaned texts.
pub fn build_vocabulary<I, S>(corpus: I, max_size: usize) -> Vocabulary
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    Vocabulary::build(corpus, max_size)
}

impl Vocabulary {
    pub fn build<I, S>(corpus: I, max_size: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        // (token, count) in first-seen order
        let mut counts: Vec<(String, usize)> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();

        for text in corpus {
            for token in text.as_ref().split_whitespace() {
                match positions.get(token) {
                    Some(&pos) => counts[pos].1 += 1,
                    None => {
                        positions.insert(token.to_string(), counts.len());
                        counts.push((token.to_string(), 1));
                    }
                }
            }
        }

        // Stable sort keeps first-seen order among equal counts.
        counts.sort_by(|a, b| b.1.cmp(&a.1));

        let retained = max_size.saturating_sub(2);
        let word_index: HashMap<String, u32> = counts
            .into_iter()
            .take(retained)
            .enumerate()
            .map(|(rank, (token, _))| (token, rank as u32 + 2))
            .collect();

        tracing::info!(
            "Built vocabulary with {} tokens (capacity {})",
            word_index.len(),
            max_size
        );

        Self { max_size, word_index }
    }

    /// Number of index slots the vocabulary was built for, padding and OOV included.
    pub fn capacity(&self) -> usize {
        self.max_size
    }

    /// Number of real tokens with their own index.
    pub fn len(&self) -> usize {
        self.word_index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.word_index.is_empty()
    }

    pub fn index_of(&self, token: &str) -> u32 {
        self.word_index.get(token).copied().unwrap_or(OOV_INDEX)
    }

    pub fn contains(&self, token: &str) -> bool {
        self.word_index.contains_key(token)
    }

    /// Tokens ordered by index, most frequent first.
    pub fn tokens(&self) -> Vec<&str> {
        let mut entries: Vec<(&str, u32)> = self
            .word_index
            .iter()
            .map(|(token, &index)| (token.as_str(), index))
            .collect();
        entries.sort_by_key(|&(_, index)| index);
        entries.into_iter().map(|(token, _)| token).collect()
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let vocabulary: Vocabulary = serde_json::from_str(&content)?;

        let out_of_range = vocabulary
            .word_index
            .values()
            .any(|&index| index < 2 || index as usize >= vocabulary.max_size);
        if out_of_range {
            return Err(InferenceError::InvalidInput(format!(
                "Vocabulary file {:?} holds indices outside 2..{}",
                path, vocabulary.max_size
            )));
        }

        Ok(vocabulary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indices_follow_frequency() {
        let corpus = ["good phone good", "bad phone", "good"];
        let vocab = build_vocabulary(corpus, 10);

        assert_eq!(vocab.index_of("good"), 2);
        assert_eq!(vocab.index_of("phone"), 3);
        assert_eq!(vocab.index_of("bad"), 4);
        assert_eq!(vocab.index_of("missing"), OOV_INDEX);
        assert_eq!(vocab.len(), 3);
        assert_eq!(vocab.capacity(), 10);
    }

    #[test]
    fn test_ties_broken_by_first_seen() {
        let vocab = build_vocabulary(["zeta alpha", "mid zeta alpha mid"], 10);
        // every token appears twice; first-seen order decides
        assert_eq!(vocab.tokens(), vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn test_capacity_caps_tokens() {
        let vocab = build_vocabulary(["a a a a b b b c c d"], 4);
        assert_eq!(vocab.len(), 2);
        assert_eq!(vocab.index_of("a"), 2);
        assert_eq!(vocab.index_of("b"), 3);
        assert_eq!(vocab.index_of("c"), OOV_INDEX);

        for token in ["a", "b", "c", "d"] {
            assert!((vocab.index_of(token) as usize) < vocab.capacity());
            assert_ne!(vocab.index_of(token), PADDING_INDEX);
        }
    }

    #[test]
    fn test_tiny_capacity_has_no_tokens() {
        let vocab = build_vocabulary(["a b c"], 2);
        assert!(vocab.is_empty());
        assert_eq!(vocab.index_of("a"), OOV_INDEX);

        let vocab = build_vocabulary(["a b c"], 0);
        assert!(vocab.is_empty());
    }

    #[test]
    fn test_deterministic() {
        let corpus = vec!["x y z", "y z", "z"];
        assert_eq!(build_vocabulary(&corpus, 100), build_vocabulary(&corpus, 100));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.json");

        let vocab = build_vocabulary(["love this drone", "hate this drone"], 50);
        vocab.save(&path).unwrap();
        assert_eq!(Vocabulary::load(&path).unwrap(), vocab);
    }

    #[test]
    fn test_load_rejects_out_of_range_indices() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.json");
        std::fs::write(&path, r#"{"max_size":3,"word_index":{"a":2,"b":7}}"#).unwrap();
        assert!(Vocabulary::load(&path).is_err());
    }
}
