use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use prodswing_preprocessing::SentimentLabel;

use crate::{InferenceError, Result};

pub const TEXT_COLUMN: &str = "cleaned_text";
pub const LABEL_COLUMN: &str = "sentiment";

/// Portion of the corpus, in file order, used for training and vocabulary.
pub const TRAINING_PORTION: f64 = 0.8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledText {
    pub text: String,
    pub label: SentimentLabel,
}

/// Labeled, already cleaned sentences in file order.
#[derive(Debug, Clone, Default)]
pub struct ReferenceCorpus {
    rows: Vec<LabeledText>,
}

impl ReferenceCorpus {
    pub fn new(rows: Vec<LabeledText>) -> Self {
        Self { rows }
    }

    /// Loads from a local path or an http(s) URL.
    pub async fn load(source: &str) -> Result<Self> {
        if source.starts_with("http://") || source.starts_with("https://") {
            tracing::info!("Downloading reference corpus from {}", source);
            let response = reqwest::get(source)
                .await
                .map_err(|e| InferenceError::Corpus(format!("Failed to fetch {}: {}", source, e)))?;
            if !response.status().is_success() {
                return Err(InferenceError::Corpus(format!(
                    "Failed to fetch {}: HTTP {}",
                    source,
                    response.status()
                )));
            }
            let bytes = response
                .bytes()
                .await
                .map_err(|e| InferenceError::Corpus(format!("Failed to read {}: {}", source, e)))?;
            Self::from_reader(bytes.as_ref())
        } else {
            Self::from_path(Path::new(source))
        }
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| InferenceError::Corpus(format!("Failed to open {:?}: {}", path, e)))?;
        let corpus = Self::from_reader(file)?;
        tracing::info!("Loaded {} labeled rows from {:?}", corpus.len(), path);
        Ok(corpus)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|header| header.trim() == name)
                .ok_or_else(|| InferenceError::Corpus(format!("Missing '{}' column", name)))
        };
        let text_idx = column(TEXT_COLUMN)?;
        let label_idx = column(LABEL_COLUMN)?;

        let mut rows = Vec::new();
        let mut skipped = 0usize;

        for record in csv_reader.records() {
            let record = record?;
            let raw_label = record.get(label_idx).unwrap_or("").trim();

            match parse_label(raw_label) {
                Some(label) => rows.push(LabeledText {
                    text: record.get(text_idx).unwrap_or("").to_string(),
                    label,
                }),
                None => {
                    skipped += 1;
                    tracing::warn!("Skipping corpus row with label '{}'", raw_label);
                }
            }
        }

        if skipped > 0 {
            tracing::warn!("Skipped {} corpus rows with unusable labels", skipped);
        }

        Ok(Self { rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[LabeledText] {
        &self.rows
    }

    /// Chronological split: the first `floor(len * portion)` rows train.
    pub fn split(&self, portion: f64) -> (&[LabeledText], &[LabeledText]) {
        let portion = portion.clamp(0.0, 1.0);
        let training_size = (self.rows.len() as f64 * portion).floor() as usize;
        self.rows.split_at(training_size)
    }

    /// Texts of the training split, the input of vocabulary building.
    pub fn training_sentences(&self) -> impl Iterator<Item = &str> {
        self.split(TRAINING_PORTION)
            .0
            .iter()
            .map(|row| row.text.as_str())
    }
}

// Labels arrive as class names or indices; exported frames sometimes carry
// them as floats ("2.0").
fn parse_label(raw: &str) -> Option<SentimentLabel> {
    if let Ok(label) = SentimentLabel::from_str(raw) {
        return Some(label);
    }

    let value = raw.parse::<f64>().ok()?;
    if value.fract() != 0.0 || value < 0.0 {
        return None;
    }
    SentimentLabel::from_index(value as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
cleaned_text,sentiment
great phone,2
terrible battery,0
it is a phone,1
love it,Positive
broken,unknown
,1
";

    #[test]
    fn test_parse_rows() {
        let corpus = ReferenceCorpus::from_reader(SAMPLE.as_bytes()).unwrap();
        assert_eq!(corpus.len(), 5, "the 'unknown' row is skipped");
        assert_eq!(corpus.rows()[0].label, SentimentLabel::Positive);
        assert_eq!(corpus.rows()[1].label, SentimentLabel::Negative);
        assert_eq!(corpus.rows()[3].label, SentimentLabel::Positive);
        assert_eq!(corpus.rows()[4].text, "");
    }

    #[test]
    fn test_missing_column() {
        let result = ReferenceCorpus::from_reader("text,label\nhello,1\n".as_bytes());
        assert!(matches!(result, Err(InferenceError::Corpus(_))));
    }

    #[test]
    fn test_split_is_chronological() {
        let rows: Vec<LabeledText> = (0..10)
            .map(|i| LabeledText {
                text: format!("row{}", i),
                label: SentimentLabel::Neutral,
            })
            .collect();
        let corpus = ReferenceCorpus::new(rows);

        let (train, validation) = corpus.split(0.8);
        assert_eq!(train.len(), 8);
        assert_eq!(validation.len(), 2);
        assert_eq!(validation[0].text, "row8");

        let sentences: Vec<&str> = corpus.training_sentences().collect();
        assert_eq!(sentences.len(), 8);
        assert_eq!(sentences[0], "row0");
    }

    #[test]
    fn test_split_floors() {
        let rows = vec![
            LabeledText { text: "a".into(), label: SentimentLabel::Negative };
            7
        ];
        let corpus = ReferenceCorpus::new(rows);
        // floor(7 * 0.8) = 5
        assert_eq!(corpus.split(0.8).0.len(), 5);
    }

    #[test]
    fn test_float_labels() {
        assert_eq!(parse_label("2.0"), Some(SentimentLabel::Positive));
        assert_eq!(parse_label("0"), Some(SentimentLabel::Negative));
        assert_eq!(parse_label("1.5"), None);
        assert_eq!(parse_label("7"), None);
    }

    #[tokio::test]
    async fn test_load_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.csv");
        std::fs::write(&path, SAMPLE).unwrap();

        let corpus = ReferenceCorpus::load(path.to_str().unwrap()).await.unwrap();
        assert_eq!(corpus.len(), 5);
    }
}
