use burn::nn::{Linear, LinearConfig};
use burn::prelude::*;
use burn::tensor::activation::{log_softmax, tanh};
use burn::tensor::TensorData;

use super::gru::{Gru, GruConfig};
use super::normalizer::{FeatureStats, Rescale};
use super::regularization::{InputNoise, Regularized, SwitchableDropout};
use crate::audio::FeatureSequence;
use crate::labels::OUTPUT_CLASSES;

/// Architecture hyperparameters for [`SpeechNetwork`].
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Hidden units per recurrent direction.
    pub hidden_size: usize,
    pub output_hidden_size: usize,
    /// Standard deviation of the recurrent weight initialization.
    pub weight_std: f64,
    /// Standard deviation of the noise added to normalized inputs in training.
    pub input_noise: f64,
    /// Drop probability before the output head in training.
    pub output_dropout: f64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            hidden_size: 128,
            output_hidden_size: 128,
            weight_std: 0.05,
            input_noise: 0.3,
            output_dropout: 0.0,
        }
    }
}

impl NetworkConfig {
    /// Build a fresh network whose front end normalizes with `stats`. The
    /// network starts in eval mode.
    pub fn init<B: Backend>(&self, stats: &FeatureStats, device: &B::Device) -> SpeechNetwork<B> {
        let input_size = stats.dim();
        let gru = GruConfig::new(input_size, self.hidden_size).with_weight_std(self.weight_std);
        SpeechNetwork {
            rescale: Rescale::new(stats, device),
            noise: InputNoise::new(self.input_noise),
            forward_rnn: gru.init(device),
            backward_rnn: gru.init(device),
            dropout: SwitchableDropout::new(self.output_dropout),
            hidden: LinearConfig::new(2 * self.hidden_size, self.output_hidden_size).init(device),
            output: LinearConfig::new(self.output_hidden_size, OUTPUT_CLASSES).init(device),
        }
    }
}

/// Bidirectional GRU acoustic model.
///
/// ```text
/// Input:    [steps, features]
/// Rescale:  (x - mean) * inv_std      (frozen)
/// Noise:    + N(0, input_noise)        (training only)
/// BiGRU:    forward ++ backward    =>  [steps, 2 * hidden]
/// Dropout:                             (training only)
/// Dense:    2 * hidden -> output_hidden, tanh
/// Dense:    output_hidden -> 16, log-softmax
/// ```
#[derive(Module, Debug)]
pub struct SpeechNetwork<B: Backend> {
    rescale: Rescale<B>,
    noise: InputNoise,
    forward_rnn: Gru<B>,
    backward_rnn: Gru<B>,
    dropout: SwitchableDropout,
    hidden: Linear<B>,
    output: Linear<B>,
}

impl<B: Backend> SpeechNetwork<B> {
    /// Features `[steps, dim]` -> log-probabilities `[steps, 16]`.
    pub fn forward(&self, features: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = self.noise.forward(self.rescale.forward(features));

        let forward = self.forward_rnn.forward(x.clone());
        let backward = self.backward_rnn.forward(x.flip([0])).flip([0]);
        let x = Tensor::cat(vec![forward, backward], 1);

        let x = self.dropout.forward(x);
        let x = tanh(self.hidden.forward(x));
        log_softmax(self.output.forward(x), 1)
    }

    pub fn forward_sequence(&self, features: &FeatureSequence) -> Tensor<B, 2> {
        let device = self.devices().into_iter().next().unwrap_or_default();
        self.forward(sequence_tensor(features, &device))
    }

    /// Log-probabilities for each sequence in the batch.
    pub fn forward_batch(&self, batch: &[&FeatureSequence]) -> Vec<Tensor<B, 2>> {
        batch.iter().map(|seq| self.forward_sequence(seq)).collect()
    }

    /// Expected feature dimension.
    pub fn input_size(&self) -> usize {
        self.rescale.stats().dim()
    }
}

impl<B: Backend> Regularized for SpeechNetwork<B> {
    fn set_training_mode(&mut self, enabled: bool) {
        self.noise.active = enabled;
        self.dropout.active = enabled;
    }

    fn is_training_mode(&self) -> bool {
        self.noise.active && self.dropout.active
    }
}

/// Build a `[steps, dim]` tensor from a feature sequence.
pub fn sequence_tensor<B: Backend>(features: &FeatureSequence, device: &B::Device) -> Tensor<B, 2> {
    let steps = features.len();
    let dim = features.first().map_or(0, |f| f.len());
    let data: Vec<f32> = features.iter().flatten().copied().collect();
    Tensor::from_data(TensorData::new(data, [steps, dim]), device)
}
