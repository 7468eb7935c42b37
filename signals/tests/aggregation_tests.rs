use prodswing_signals::{AggregateResult, SentimentAggregator, SentimentLabel, SentimentTally};

#[test]
fn test_documented_aggregation_cases() {
    use SentimentLabel::*;

    let cases: Vec<(Vec<SentimentLabel>, SentimentLabel)> = vec![
        (vec![], Neutral),
        (vec![Positive, Positive, Negative], Positive),
        (vec![Positive, Negative], Neutral),
        (vec![Neutral, Neutral, Neutral], Neutral),
        (vec![Positive, Positive, Neutral], Positive),
        (vec![Negative], Negative),
    ];

    for (labels, expected) in cases {
        assert_eq!(
            SentimentAggregator::aggregate(&labels),
            expected,
            "aggregate({:?})",
            labels
        );
    }
}

#[test]
fn test_order_does_not_matter() {
    use SentimentLabel::*;

    let a = [Negative, Positive, Neutral, Positive];
    let b = [Positive, Positive, Negative, Neutral];
    assert_eq!(SentimentAggregator::aggregate(&a), SentimentAggregator::aggregate(&b));
}

#[test]
fn test_result_label_matches_tally_verdict() {
    let tally = SentimentTally {
        negative: 4,
        neutral: 10,
        positive: 4,
    };
    let result = AggregateResult::new("phone", tally);
    assert_eq!(result.label, SentimentLabel::Neutral);
    assert_eq!(result.product, "phone");
}
