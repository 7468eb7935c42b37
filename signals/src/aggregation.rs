use chrono::{DateTime, Utc};
use prodswing_preprocessing::SentimentLabel;
use serde::{Deserialize, Serialize};

/// Per-class counts of a batch of post predictions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentTally {
    pub negative: usize,
    pub neutral: usize,
    pub positive: usize,
}

impl SentimentTally {
    pub fn from_labels(labels: &[SentimentLabel]) -> Self {
        let mut tally = Self::default();
        for label in labels {
            tally.record(*label);
        }
        tally
    }

    pub fn record(&mut self, label: SentimentLabel) {
        match label {
            SentimentLabel::Negative => self.negative += 1,
            SentimentLabel::Neutral => self.neutral += 1,
            SentimentLabel::Positive => self.positive += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.negative + self.neutral + self.positive
    }

    /// Positive against Negative; Neutral wins every tie, including 0 vs 0.
    /// The neutral count never takes part in the comparison.
    pub fn verdict(&self) -> SentimentLabel {
        use std::cmp::Ordering;

        match self.positive.cmp(&self.negative) {
            Ordering::Greater => SentimentLabel::Positive,
            Ordering::Less => SentimentLabel::Negative,
            Ordering::Equal => SentimentLabel::Neutral,
        }
    }
}

/// Folds per-post predictions into one product-level label.
pub struct SentimentAggregator;

impl SentimentAggregator {
    pub fn aggregate(labels: &[SentimentLabel]) -> SentimentLabel {
        let tally = SentimentTally::from_labels(labels);
        let verdict = tally.verdict();

        tracing::debug!(
            "Aggregated {} predictions (pos={}, neu={}, neg={}) into {}",
            tally.total(),
            tally.positive,
            tally.neutral,
            tally.negative,
            verdict
        );

        verdict
    }
}

/// Stored outcome of one classification run for a product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateResult {
    pub product: String,
    pub label: SentimentLabel,
    pub tally: SentimentTally,
    pub updated_at: DateTime<Utc>,
}

impl AggregateResult {
    pub fn new(product: impl Into<String>, tally: SentimentTally) -> Self {
        Self {
            product: product.into(),
            label: tally.verdict(),
            tally,
            updated_at: Utc::now(),
        }
    }

    pub fn from_labels(product: impl Into<String>, labels: &[SentimentLabel]) -> Self {
        Self::new(product, SentimentTally::from_labels(labels))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SentimentLabel::*;

    #[test]
    fn test_empty_input_is_neutral() {
        assert_eq!(SentimentAggregator::aggregate(&[]), Neutral);
    }

    #[test]
    fn test_majority_votes() {
        assert_eq!(SentimentAggregator::aggregate(&[Positive, Positive, Negative]), Positive);
        assert_eq!(SentimentAggregator::aggregate(&[Negative, Neutral, Negative]), Negative);
        assert_eq!(SentimentAggregator::aggregate(&[Positive, Positive, Neutral]), Positive);
    }

    #[test]
    fn test_ties_are_neutral() {
        assert_eq!(SentimentAggregator::aggregate(&[Positive, Negative]), Neutral);
        assert_eq!(SentimentAggregator::aggregate(&[Neutral, Neutral, Neutral]), Neutral);
    }

    #[test]
    fn test_neutral_count_is_not_a_vote() {
        // Neutral is the plurality here, yet one positive post decides.
        let labels = [Neutral, Neutral, Neutral, Neutral, Positive];
        assert_eq!(SentimentAggregator::aggregate(&labels), Positive);

        let labels = [Neutral, Neutral, Neutral, Negative, Negative, Positive];
        assert_eq!(SentimentAggregator::aggregate(&labels), Negative);
    }

    #[test]
    fn test_tally_counts() {
        let tally = SentimentTally::from_labels(&[Positive, Neutral, Negative, Positive]);
        assert_eq!(tally.positive, 2);
        assert_eq!(tally.neutral, 1);
        assert_eq!(tally.negative, 1);
        assert_eq!(tally.total(), 4);
        assert_eq!(tally.verdict(), Positive);
    }

    #[test]
    fn test_aggregate_result_roundtrip() {
        let result = AggregateResult::from_labels("drone", &[Negative, Negative, Positive]);
        assert_eq!(result.label, Negative);
        assert_eq!(result.tally.total(), 3);

        let json = serde_json::to_string(&result).unwrap();
        let back: AggregateResult = serde_json::from_str(&json).unwrap();
        assert_eq!(back, result);
    }
}
