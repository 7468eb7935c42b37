use chrono::{DateTime, Utc};
use inference::{ClassificationReport, TrainingHistory};
use prodswing_signals::{AggregateResult, SentimentLabel, SentimentTally};

pub struct ResultFormatter {
    update_count: u64,
    start_time: DateTime<Utc>,
}

impl ResultFormatter {
    pub fn new() -> Self {
        Self {
            update_count: 0,
            start_time: Utc::now(),
        }
    }

    pub fn display_result(&mut self, result: &AggregateResult) {
        self.update_count += 1;

        println!("\n{}", "=".repeat(60));
        println!("PRODUCT SENTIMENT UPDATE #{}", self.update_count);
        println!("{}", "=".repeat(60));
        println!("Product: {}", result.product);
        println!("Updated: {}", result.updated_at.format("%Y-%m-%d %H:%M:%S UTC"));
        println!(
            "Verdict: {} {}",
            result.label,
            self.label_emoji(result.label)
        );
        self.display_tally(&result.tally);
    }

    pub fn display_report(&self, source: &str, posts: &[String], report: &ClassificationReport) {
        println!("\n{}", "=".repeat(60));
        println!("CLASSIFICATION: {}", source);
        println!("{}", "=".repeat(60));

        for (post, label) in posts.iter().zip(&report.predictions) {
            println!("  [{:>8}] {}", label.as_str(), self.truncate_text(post, 70));
        }

        println!(
            "\nVerdict: {} {}",
            report.label,
            self.label_emoji(report.label)
        );
        self.display_tally(&report.tally);
    }

    pub fn display_training(&self, history: &TrainingHistory) {
        println!("\n{}", "-".repeat(40));
        println!("TRAINING SUMMARY");
        println!("{}", "-".repeat(40));

        for metrics in &history.epochs {
            let validation = match (metrics.validation_loss, metrics.validation_accuracy) {
                (Some(loss), Some(accuracy)) => {
                    format!("val loss {:.4}, val accuracy {:.2}%", loss, accuracy * 100.0)
                }
                _ => "no validation split".to_string(),
            };
            println!("Epoch {:>3}: train loss {:.4}, {}", metrics.epoch, metrics.train_loss, validation);
        }
    }

    fn display_tally(&self, tally: &SentimentTally) {
        println!("{}", "-".repeat(40));
        println!("Posts classified: {}", tally.total());
        println!("   Positive: {}", tally.positive);
        println!("   Neutral:  {}", tally.neutral);
        println!("   Negative: {}", tally.negative);
    }

    pub fn display_pipeline_start(&self, mode: &str) {
        println!("\n{}", "-".repeat(20));
        println!("PRODSWING SENTIMENT PIPELINE");
        println!("{}", "-".repeat(20));
        println!("Pipeline Flow:");
        println!("   Post Harvest → Normalization → Sequence Encoding → Classifier → Aggregation → Results");
        println!("Mode: {}", mode);
        println!("Started: {}", self.start_time.format("%Y-%m-%d %H:%M:%S UTC"));
        println!("{}", "=".repeat(60));
    }

    pub fn display_error(&self, error: &anyhow::Error) {
        println!("\n{}", "!".repeat(20));
        println!("PIPELINE ERROR");
        println!("{}", "!".repeat(20));
        println!("Error: {:#}", error);
        println!("Updates completed before error: {}", self.update_count);
        println!("{}", "=".repeat(60));
    }

    fn label_emoji(&self, label: SentimentLabel) -> &'static str {
        match label {
            SentimentLabel::Positive => "📈",
            SentimentLabel::Neutral => "➡️",
            SentimentLabel::Negative => "📉",
        }
    }

    fn truncate_text(&self, text: &str, max_chars: usize) -> String {
        if text.chars().count() <= max_chars {
            text.to_string()
        } else {
            let head: String = text.chars().take(max_chars).collect();
            format!("{}...", head)
        }
    }
}

impl Default for ResultFormatter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_is_char_safe() {
        let formatter = ResultFormatter::new();
        assert_eq!(formatter.truncate_text("short", 10), "short");
        assert_eq!(formatter.truncate_text("ééééé", 3), "ééé...");
    }

    #[test]
    fn test_update_counter() {
        let mut formatter = ResultFormatter::new();
        let result = AggregateResult::from_labels("drone", &[SentimentLabel::Positive]);
        formatter.display_result(&result);
        formatter.display_result(&result);
        assert_eq!(formatter.update_count, 2);
    }
}
