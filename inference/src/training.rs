use candle_core::{DType, Device, Tensor, D};
use candle_nn::{AdamW, Optimizer, ParamsAdamW};

use crate::config::ModelConfig;
use crate::corpus::{LabeledText, ReferenceCorpus, TRAINING_PORTION};
use crate::encoder::{EncodedSequence, SequenceEncoder};
use crate::model::SentimentClassifier;
use crate::{InferenceError, Result};

#[derive(Debug, Clone)]
pub struct TrainingOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub learning_rate: f64,
    pub training_portion: f64,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            epochs: 5,
            batch_size: 32,
            learning_rate: 0.001,
            training_portion: TRAINING_PORTION,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochMetrics {
    pub epoch: usize,
    pub train_loss: f64,
    pub validation_loss: Option<f64>,
    pub validation_accuracy: Option<f64>,
}

#[derive(Debug, Clone, Default)]
pub struct TrainingHistory {
    pub epochs: Vec<EpochMetrics>,
}

impl TrainingHistory {
    pub fn last(&self) -> Option<&EpochMetrics> {
        self.epochs.last()
    }
}

/// Encoded inputs and class targets of one corpus split.
struct Split {
    sequences: Vec<EncodedSequence>,
    targets: Vec<u32>,
}

impl Split {
    fn encode(rows: &[LabeledText], encoder: &SequenceEncoder) -> Self {
        Self {
            sequences: rows.iter().map(|row| encoder.encode_raw(&row.text)).collect(),
            targets: rows.iter().map(|row| row.label.index() as u32).collect(),
        }
    }

    fn len(&self) -> usize {
        self.targets.len()
    }
}

/// Trains a fresh classifier on the chronological training split of
/// `corpus`, reporting validation loss and accuracy after every epoch.
/// Rows are visited in file order every epoch.
pub fn train_classifier(
    corpus: &ReferenceCorpus,
    encoder: &SequenceEncoder,
    config: ModelConfig,
    options: &TrainingOptions,
    device: &Device,
) -> Result<(SentimentClassifier, TrainingHistory)> {
    if encoder.vocabulary().capacity() != config.vocab_size {
        return Err(InferenceError::VocabularyMismatch {
            expected: config.vocab_size,
            actual: encoder.vocabulary().capacity(),
        });
    }
    if encoder.sequence_length() != config.sequence_length {
        return Err(InferenceError::config(format!(
            "Encoder length {} differs from model sequence length {}",
            encoder.sequence_length(),
            config.sequence_length
        )));
    }
    if options.batch_size == 0 {
        return Err(InferenceError::config("Batch size must be greater than zero"));
    }

    let (training_rows, validation_rows) = corpus.split(options.training_portion);
    if training_rows.is_empty() {
        return Err(InferenceError::Training("Training split is empty".to_string()));
    }

    let training = Split::encode(training_rows, encoder);
    let validation = Split::encode(validation_rows, encoder);

    let model = SentimentClassifier::new_trainable(config, device)?;
    let parameter_count: usize = model.varmap().all_vars().iter().map(|v| v.elem_count()).sum();
    tracing::info!(
        "Training on {} rows, validating on {} ({} parameters, {} epochs)",
        training.len(),
        validation.len(),
        parameter_count,
        options.epochs
    );

    let params = ParamsAdamW {
        lr: options.learning_rate,
        weight_decay: 0.0,
        ..Default::default()
    };
    let mut optimizer = AdamW::new(model.varmap().all_vars(), params)?;

    let mut history = TrainingHistory::default();

    for epoch in 1..=options.epochs {
        let mut loss_sum = 0.0;

        for start in (0..training.len()).step_by(options.batch_size) {
            let end = (start + options.batch_size).min(training.len());

            let input_ids = model.batch_tensor(&training.sequences[start..end])?;
            let targets = Tensor::from_vec(training.targets[start..end].to_vec(), end - start, device)?;

            let logits = model.forward(&input_ids, true)?;
            let loss = candle_nn::loss::cross_entropy(&logits, &targets)?;
            optimizer.backward_step(&loss)?;

            loss_sum += loss.to_scalar::<f32>()? as f64 * (end - start) as f64;
        }

        let train_loss = loss_sum / training.len() as f64;
        let (validation_loss, validation_accuracy) = if !validation.targets.is_empty() {
            let (loss, accuracy) = evaluate_split(&model, &validation, options.batch_size)?;
            (Some(loss), Some(accuracy))
        } else {
            (None, None)
        };

        tracing::info!(
            "Epoch {}/{}: train loss {:.4}, validation loss {}, validation accuracy {}",
            epoch,
            options.epochs,
            train_loss,
            format_metric(validation_loss),
            format_metric(validation_accuracy)
        );

        if !train_loss.is_finite() {
            return Err(InferenceError::Training(format!(
                "Training loss diverged at epoch {}",
                epoch
            )));
        }

        history.epochs.push(EpochMetrics {
            epoch,
            train_loss,
            validation_loss,
            validation_accuracy,
        });
    }

    Ok((model, history))
}

/// Mean cross-entropy and accuracy over an encoded split.
fn evaluate_split(model: &SentimentClassifier, split: &Split, batch_size: usize) -> Result<(f64, f64)> {
    let mut loss_sum = 0.0;
    let mut correct = 0.0;

    for start in (0..split.len()).step_by(batch_size) {
        let end = (start + batch_size).min(split.len());

        let input_ids = model.batch_tensor(&split.sequences[start..end])?;
        let targets = Tensor::from_vec(split.targets[start..end].to_vec(), end - start, model.device())?;

        let logits = model.forward(&input_ids, false)?;
        let loss = candle_nn::loss::cross_entropy(&logits, &targets)?;
        loss_sum += loss.to_scalar::<f32>()? as f64 * (end - start) as f64;

        let hits = logits
            .argmax(D::Minus1)?
            .eq(&targets)?
            .to_dtype(DType::F32)?
            .sum_all()?
            .to_scalar::<f32>()?;
        correct += hits as f64;
    }

    let count = split.len() as f64;
    Ok((loss_sum / count, correct / count))
}

fn format_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{:.4}", v))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::tests::tiny_config;
    use crate::vocabulary::build_vocabulary;
    use prodswing_preprocessing::SentimentLabel;

    fn toy_corpus() -> ReferenceCorpus {
        let samples = [
            ("love this great phone", SentimentLabel::Positive),
            ("awful broken battery", SentimentLabel::Negative),
            ("the phone ships today", SentimentLabel::Neutral),
            ("great camera love it", SentimentLabel::Positive),
            ("broken screen awful", SentimentLabel::Negative),
            ("box arrives today", SentimentLabel::Neutral),
        ];
        let rows = samples
            .iter()
            .cycle()
            .take(20)
            .map(|(text, label)| LabeledText {
                text: text.to_string(),
                label: *label,
            })
            .collect();
        ReferenceCorpus::new(rows)
    }

    fn toy_encoder(corpus: &ReferenceCorpus, config: &ModelConfig) -> SequenceEncoder {
        let vocab = build_vocabulary(corpus.training_sentences(), config.vocab_size);
        SequenceEncoder::new(vocab, config.sequence_length)
    }

    #[test]
    fn test_history_per_epoch() {
        let corpus = toy_corpus();
        let config = tiny_config();
        let encoder = toy_encoder(&corpus, &config);
        let options = TrainingOptions {
            epochs: 2,
            batch_size: 4,
            ..TrainingOptions::default()
        };

        let (model, history) = train_classifier(&corpus, &encoder, config, &options, &Device::Cpu).unwrap();

        assert_eq!(history.epochs.len(), 2);
        for (i, metrics) in history.epochs.iter().enumerate() {
            assert_eq!(metrics.epoch, i + 1);
            assert!(metrics.train_loss.is_finite());
            let accuracy = metrics.validation_accuracy.unwrap();
            assert!((0.0..=1.0).contains(&accuracy));
        }
        assert_eq!(model.config().vocab_size, 32);
    }

    #[test]
    fn test_loss_decreases_on_separable_data() {
        let corpus = toy_corpus();
        let config = ModelConfig {
            dropout: 0.0,
            ..tiny_config()
        };
        let encoder = toy_encoder(&corpus, &config);
        let options = TrainingOptions {
            epochs: 30,
            batch_size: 8,
            learning_rate: 0.01,
            ..TrainingOptions::default()
        };

        let (_, history) = train_classifier(&corpus, &encoder, config, &options, &Device::Cpu).unwrap();
        let first = history.epochs.first().unwrap().train_loss;
        let last = history.last().unwrap().train_loss;
        assert!(last < first, "loss went from {} to {}", first, last);
    }

    #[test]
    fn test_vocabulary_capacity_must_match() {
        let corpus = toy_corpus();
        let config = tiny_config();
        let vocab = build_vocabulary(corpus.training_sentences(), 64);
        let encoder = SequenceEncoder::new(vocab, config.sequence_length);

        let result = train_classifier(&corpus, &encoder, config, &TrainingOptions::default(), &Device::Cpu);
        assert!(matches!(
            result,
            Err(InferenceError::VocabularyMismatch { expected: 32, actual: 64 })
        ));
    }

    #[test]
    fn test_empty_corpus() {
        let corpus = ReferenceCorpus::default();
        let config = tiny_config();
        let encoder = toy_encoder(&corpus, &config);

        let result = train_classifier(&corpus, &encoder, config, &TrainingOptions::default(), &Device::Cpu);
        assert!(matches!(result, Err(InferenceError::Training(_))));
    }
}
