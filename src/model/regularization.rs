use burn::prelude::*;
use burn::tensor::Distribution;

/// Models with stages that behave differently while training.
pub trait Regularized {
    /// Enable or disable every regularization stage together.
    fn set_training_mode(&mut self, enabled: bool);

    fn is_training_mode(&self) -> bool;
}

/// Adds Gaussian noise while active; identity otherwise.
#[derive(Module, Clone, Debug)]
pub struct InputNoise {
    pub std: f64,
    pub active: bool,
}

impl InputNoise {
    pub fn new(std: f64) -> Self {
        InputNoise { std, active: false }
    }

    pub fn forward<B: Backend, const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        if !self.active || self.std <= 0.0 {
            return input;
        }
        let noise = Tensor::random(
            input.shape(),
            Distribution::Normal(0.0, self.std),
            &input.device(),
        );
        input + noise
    }
}

/// Inverted dropout that is only applied while active.
///
/// Unlike `burn::nn::Dropout` this does not key off the autodiff backend, so
/// cost evaluation on the training model can switch it off.
#[derive(Module, Clone, Debug)]
pub struct SwitchableDropout {
    pub prob: f64,
    pub active: bool,
}

impl SwitchableDropout {
    pub fn new(prob: f64) -> Self {
        SwitchableDropout {
            prob,
            active: false,
        }
    }

    pub fn forward<B: Backend, const D: usize>(&self, input: Tensor<B, D>) -> Tensor<B, D> {
        if !self.active || self.prob <= 0.0 {
            return input;
        }
        let keep = 1.0 - self.prob;
        let mask = Tensor::random(
            input.shape(),
            Distribution::Bernoulli(keep),
            &input.device(),
        );
        input * mask / keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_inactive_stages_are_identity() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 2>::ones([4, 3], &device);

        let noise = InputNoise::new(0.3);
        let dropout = SwitchableDropout::new(0.5);
        let out = dropout.forward(noise.forward(input.clone()));

        assert_eq!(
            out.into_data().to_vec::<f32>().unwrap(),
            input.into_data().to_vec::<f32>().unwrap()
        );
    }

    #[test]
    fn test_active_noise_perturbs() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 2>::zeros([8, 8], &device);
        let mut noise = InputNoise::new(0.3);
        noise.active = true;
        let out = noise.forward(input).into_data().to_vec::<f32>().unwrap();
        assert!(out.iter().any(|v| *v != 0.0));
    }

    #[test]
    fn test_active_dropout_scales_kept_units() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 2>::ones([16, 16], &device);
        let mut dropout = SwitchableDropout::new(0.5);
        dropout.active = true;
        let out = dropout.forward(input).into_data().to_vec::<f32>().unwrap();
        assert!(out.iter().all(|&v| v == 0.0 || (v - 2.0).abs() < 1e-6));
    }
}
