use std::collections::{BTreeSet, HashMap};

use candle_core::{DType, Device, Module, Tensor, Var, D};
use candle_nn::rnn::{lstm, LSTMConfig, LSTM, RNN};
use candle_nn::{conv1d, embedding, linear, Conv1d, Conv1dConfig, Dropout, Embedding, Linear, VarBuilder, VarMap};
use prodswing_preprocessing::SentimentLabel;

use crate::config::ModelConfig;
use crate::encoder::EncodedSequence;
use crate::{InferenceError, Result};

/// Embedding -> bidirectional LSTM -> Conv1d -> global max-pool -> dense
/// stack -> 3-way output.
///
/// The forward pass returns logits; [`SentimentClassifier::predict_proba`]
/// applies the softmax. Variable names (`embedding`, `lstm_fwd`, `lstm_bwd`,
/// `conv`, `dense1`, `dense2`, `output`) are the tensor names of a
/// parameter bundle.
pub struct SentimentClassifier {
    embedding: Embedding,
    lstm_fwd: LSTM,
    lstm_bwd: LSTM,
    conv: Conv1d,
    dense1: Linear,
    dense2: Linear,
    dropout: Dropout,
    output: Linear,
    varmap: VarMap,
    config: ModelConfig,
    device: Device,
}

impl SentimentClassifier {
    /// Freshly initialised, trainable classifier.
    pub fn new_trainable(config: ModelConfig, device: &Device) -> Result<Self> {
        Self::build(config, VarMap::new(), device)
    }

    /// Classifier over previously trained parameters.
    ///
    /// Every variable the architecture needs must be present in `tensors`;
    /// a missing one would otherwise be silently initialised at random.
    pub fn from_tensors(
        config: ModelConfig,
        tensors: HashMap<String, Tensor>,
        device: &Device,
    ) -> Result<Self> {
        let provided: BTreeSet<String> = tensors.keys().cloned().collect();

        let varmap = VarMap::new();
        {
            let mut data = varmap
                .data()
                .lock()
                .map_err(|_| InferenceError::model_unavailable("Parameter map lock poisoned"))?;
            for (name, tensor) in tensors {
                let tensor = tensor.to_dtype(DType::F32)?.to_device(device)?;
                data.insert(name, Var::from_tensor(&tensor)?);
            }
        }

        let model = Self::build(config, varmap, device)?;

        let missing: Vec<String> = model
            .parameter_names()?
            .into_iter()
            .filter(|name| !provided.contains(name))
            .collect();
        if !missing.is_empty() {
            return Err(InferenceError::model_unavailable(format!(
                "Parameter bundle is missing tensors: {}",
                missing.join(", ")
            )));
        }

        Ok(model)
    }

    fn build(config: ModelConfig, varmap: VarMap, device: &Device) -> Result<Self> {
        config.validate()?;
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);

        let embedding = embedding(config.vocab_size, config.embedding_dim, vb.pp("embedding"))?;
        let lstm_fwd = lstm(
            config.embedding_dim,
            config.lstm_units,
            LSTMConfig::default(),
            vb.pp("lstm_fwd"),
        )?;
        let lstm_bwd = lstm(
            config.embedding_dim,
            config.lstm_units,
            LSTMConfig::default(),
            vb.pp("lstm_bwd"),
        )?;
        let conv = conv1d(
            2 * config.lstm_units,
            config.conv_filters,
            config.conv_kernel,
            Conv1dConfig::default(),
            vb.pp("conv"),
        )?;
        let dense1 = linear(config.conv_filters, config.dense_units[0], vb.pp("dense1"))?;
        let dense2 = linear(config.dense_units[0], config.dense_units[1], vb.pp("dense2"))?;
        let output = linear(config.dense_units[1], config.num_classes(), vb.pp("output"))?;

        Ok(Self {
            embedding,
            lstm_fwd,
            lstm_bwd,
            conv,
            dense1,
            dense2,
            dropout: Dropout::new(config.dropout),
            output,
            varmap,
            config,
            device: device.clone(),
        })
    }

    /// Trainable variables, for the optimizer.
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    pub fn parameter_names(&self) -> Result<Vec<String>> {
        let data = self
            .varmap
            .data()
            .lock()
            .map_err(|_| InferenceError::model_unavailable("Parameter map lock poisoned"))?;
        let mut names: Vec<String> = data.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Current parameter values by variable name, sorted by name.
    pub fn named_tensors(&self) -> Result<Vec<(String, Tensor)>> {
        let data = self
            .varmap
            .data()
            .lock()
            .map_err(|_| InferenceError::model_unavailable("Parameter map lock poisoned"))?;
        let mut tensors: Vec<(String, Tensor)> = data
            .iter()
            .map(|(name, var)| (name.clone(), var.as_tensor().clone()))
            .collect();
        tensors.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(tensors)
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// `input_ids`: u32 tensor of shape (batch, sequence_length).
    /// Returns logits of shape (batch, num_classes).
    pub fn forward(&self, input_ids: &Tensor, train: bool) -> candle_core::Result<Tensor> {
        let (_batch, seq_len) = input_ids.dims2()?;
        let xs = self.embedding.forward(input_ids)?;

        let forward_states = self.lstm_fwd.seq(&xs)?;
        let forward = self.lstm_fwd.states_to_tensor(&forward_states)?;

        // The backward LSTM reads the sequence from the end; its outputs are
        // flipped back so both directions line up per time step.
        let reverse_index = reverse_time_index(seq_len, &self.device)?;
        let reversed = xs.index_select(&reverse_index, 1)?;
        let backward_states = self.lstm_bwd.seq(&reversed)?;
        let backward = self
            .lstm_bwd
            .states_to_tensor(&backward_states)?
            .index_select(&reverse_index, 1)?;

        let xs = Tensor::cat(&[&forward, &backward], 2)?;
        let xs = xs.transpose(1, 2)?.contiguous()?;
        let xs = self.conv.forward(&xs)?.relu()?;
        let xs = xs.max(2)?;

        let xs = self.dense1.forward(&xs)?.relu()?;
        let xs = self.dense2.forward(&xs)?.relu()?;
        let xs = self.dropout.forward(&xs, train)?;
        self.output.forward(&xs)
    }

    pub fn batch_tensor(&self, sequences: &[EncodedSequence]) -> Result<Tensor> {
        let length = self.config.sequence_length;
        let mut flat = Vec::with_capacity(sequences.len() * length);

        for (position, sequence) in sequences.iter().enumerate() {
            if sequence.len() != length {
                return Err(InferenceError::InvalidInput(format!(
                    "Sequence {} has length {}, model expects {}",
                    position,
                    sequence.len(),
                    length
                )));
            }

            if let Some(&max_id) = sequence.as_slice().iter().max() {
                if max_id as usize >= self.config.vocab_size {
                    return Err(InferenceError::VocabularyMismatch {
                        expected: self.config.vocab_size,
                        actual: max_id as usize + 1,
                    });
                }
            }

            flat.extend_from_slice(sequence.as_slice());
        }

        Ok(Tensor::from_vec(flat, (sequences.len(), length), &self.device)?)
    }

    /// Class probabilities per sequence, in input order.
    pub fn predict_proba(&self, sequences: &[EncodedSequence]) -> Result<Vec<Vec<f32>>> {
        if sequences.is_empty() {
            return Ok(Vec::new());
        }

        let input_ids = self.batch_tensor(sequences)?;
        let logits = self.forward(&input_ids, false)?;
        let probabilities = candle_nn::ops::softmax(&logits, D::Minus1)?;

        Ok(probabilities.to_vec2::<f32>()?)
    }

    /// Argmax label per sequence, in input order.
    pub fn predict(&self, sequences: &[EncodedSequence]) -> Result<Vec<SentimentLabel>> {
        if sequences.is_empty() {
            return Ok(Vec::new());
        }

        let input_ids = self.batch_tensor(sequences)?;
        let logits = self.forward(&input_ids, false)?;
        let class_ids = logits.argmax(D::Minus1)?.to_vec1::<u32>()?;

        class_ids
            .into_iter()
            .map(|class_id| {
                SentimentLabel::from_index(class_id as usize).ok_or_else(|| {
                    InferenceError::InvalidInput(format!("Model produced unknown class {}", class_id))
                })
            })
            .collect()
    }
}

fn reverse_time_index(seq_len: usize, device: &Device) -> candle_core::Result<Tensor> {
    let index: Vec<u32> = (0..seq_len as u32).rev().collect();
    Tensor::from_vec(index, seq_len, device)
}
