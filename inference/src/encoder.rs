use prodswing_preprocessing::CleanedText;

use crate::vocabulary::{Vocabulary, PADDING_INDEX};

/// Fixed-length token index sequence, right padded with [`PADDING_INDEX`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EncodedSequence(Vec<u32>);

impl EncodedSequence {
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of slots holding a token rather than padding.
    pub fn token_count(&self) -> usize {
        self.0.iter().take_while(|&&id| id != PADDING_INDEX).count()
    }

    pub fn into_inner(self) -> Vec<u32> {
        self.0
    }
}

impl From<Vec<u32>> for EncodedSequence {
    fn from(ids: Vec<u32>) -> Self {
        Self(ids)
    }
}

/// Encodes `text` into exactly `length` indices. Never fails.
pub fn encode(text: &CleanedText, vocab: &Vocabulary, length: usize) -> EncodedSequence {
    encode_str(text.as_str(), vocab, length)
}

fn encode_str(text: &str, vocab: &Vocabulary, length: usize) -> EncodedSequence {
    // Keep the earliest tokens; anything past `length` is dropped.
    let mut input_ids: Vec<u32> = text
        .split_whitespace()
        .take(length)
        .map(|token| vocab.index_of(token))
        .collect();

    input_ids.resize(length, PADDING_INDEX);

    EncodedSequence(input_ids)
}

/// Vocabulary-backed encoder with a fixed sequence length.
#[derive(Debug, Clone)]
pub struct SequenceEncoder {
    vocabulary: Vocabulary,
    sequence_length: usize,
}

impl SequenceEncoder {
    pub fn new(vocabulary: Vocabulary, sequence_length: usize) -> Self {
        Self {
            vocabulary,
            sequence_length,
        }
    }

    pub fn encode(&self, text: &CleanedText) -> EncodedSequence {
        encode(text, &self.vocabulary, self.sequence_length)
    }

    pub fn encode_batch(&self, texts: &[CleanedText]) -> Vec<EncodedSequence> {
        texts.iter().map(|text| self.encode(text)).collect()
    }

    /// Encodes corpus text that is already clean (e.g. the reference corpus).
    pub fn encode_raw(&self, text: &str) -> EncodedSequence {
        encode_str(text, &self.vocabulary, self.sequence_length)
    }

    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocabulary
    }

    pub fn sequence_length(&self) -> usize {
        self.sequence_length
    }
}
