use burn::nn::{Initializer, Linear, LinearConfig};
use burn::module::Param;
use burn::prelude::*;
use burn::tensor::activation::{sigmoid, tanh};

/// Gated recurrent unit run over one sequence at a time.
///
/// Gates are laid out as `[update, reset, candidate]` along the output axis of
/// both projections.
#[derive(Module, Debug)]
pub struct Gru<B: Backend> {
    input: Linear<B>,
    hidden: Linear<B>,
    hidden_size: usize,
}

#[derive(Config, Debug)]
pub struct GruConfig {
    pub input_size: usize,
    pub hidden_size: usize,
    /// Standard deviation of the weight matrices. Biases start at zero.
    #[config(default = 0.05)]
    pub weight_std: f64,
}

impl GruConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> Gru<B> {
        let gates = 3 * self.hidden_size;
        let initializer = Initializer::Normal {
            mean: 0.0,
            std: self.weight_std,
        };
        let mut input = LinearConfig::new(self.input_size, gates)
            .with_initializer(initializer.clone())
            .init(device);
        input.bias = Some(Param::from_tensor(Tensor::zeros([gates], device)));
        let hidden = LinearConfig::new(self.hidden_size, gates)
            .with_bias(false)
            .with_initializer(initializer)
            .init(device);

        Gru {
            input,
            hidden,
            hidden_size: self.hidden_size,
        }
    }
}

impl<B: Backend> Gru<B> {
    /// Input `[steps, input_size]` -> hidden states `[steps, hidden_size]`.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let [steps, _] = input.dims();
        let h = self.hidden_size;
        let device = input.device();

        let projected = self.input.forward(input);
        let mut state = Tensor::<B, 2>::zeros([1, h], &device);
        let mut outputs = Vec::with_capacity(steps);

        for t in 0..steps {
            let x = projected.clone().slice([t..t + 1, 0..3 * h]);
            let r = self.hidden.forward(state.clone());

            let update = sigmoid(
                x.clone().slice([0..1, 0..h]) + r.clone().slice([0..1, 0..h]),
            );
            let reset = sigmoid(
                x.clone().slice([0..1, h..2 * h]) + r.clone().slice([0..1, h..2 * h]),
            );
            let candidate = tanh(x.slice([0..1, 2 * h..3 * h]) + reset * r.slice([0..1, 2 * h..3 * h]));

            state = update.clone() * state + update.neg().add_scalar(1.0) * candidate;
            outputs.push(state.clone());
        }

        Tensor::cat(outputs, 0)
    }

    pub fn hidden_size(&self) -> usize {
        self.hidden_size
    }

    #[cfg(test)]
    pub(crate) fn input_bias(&self) -> Option<Tensor<B, 1>> {
        self.input.bias.as_ref().map(|b| b.val())
    }

    #[cfg(test)]
    pub(crate) fn input_weight(&self) -> Tensor<B, 2> {
        self.input.weight.val()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_output_shape() {
        let device = Default::default();
        let gru = GruConfig::new(6, 4).init::<TestBackend>(&device);
        let output = gru.forward(Tensor::ones([5, 6], &device));
        assert_eq!(output.dims(), [5, 4]);
    }

    #[test]
    fn test_states_are_bounded() {
        let device = Default::default();
        let gru = GruConfig::new(3, 8)
            .with_weight_std(1.0)
            .init::<TestBackend>(&device);
        let output = gru.forward(Tensor::ones([10, 3], &device).mul_scalar(5.0));
        let values = output.into_data().to_vec::<f32>().unwrap();
        assert!(values.iter().all(|v| v.abs() <= 1.0));
    }

    #[test]
    fn test_init_zero_bias_small_weights() {
        let device = Default::default();
        let gru = GruConfig::new(26, 32).init::<TestBackend>(&device);

        let bias = gru.input_bias().unwrap().into_data().to_vec::<f32>().unwrap();
        assert!(bias.iter().all(|&b| b == 0.0));

        let weights = gru.input_weight().into_data().to_vec::<f32>().unwrap();
        let n = weights.len() as f32;
        let mean = weights.iter().sum::<f32>() / n;
        let var = weights.iter().map(|w| (w - mean).powi(2)).sum::<f32>() / n;
        assert!(mean.abs() < 0.01);
        assert!((var.sqrt() - 0.05).abs() < 0.01);
    }
}
