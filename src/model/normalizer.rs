use burn::module::Param;
use burn::prelude::*;
use burn::tensor::TensorData;

use crate::dataset::SampleSet;

/// Variance below which a feature dimension is treated as constant.
const MIN_VARIANCE: f64 = 1e-12;

/// Per-dimension feature mean and inverse standard deviation.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureStats {
    pub mean: Vec<f32>,
    pub inv_std: Vec<f32>,
}

impl FeatureStats {
    /// Zero mean, unit scale.
    pub fn identity(dim: usize) -> Self {
        FeatureStats {
            mean: vec![0.0; dim],
            inv_std: vec![1.0; dim],
        }
    }

    /// Statistics over every frame of every example in `set`.
    pub fn from_sample_set(set: &SampleSet, dim: usize) -> Self {
        let frames = set.iter().flat_map(|e| e.features.iter());
        Self::from_frames(frames, dim)
    }

    pub fn from_frames<'a>(frames: impl Iterator<Item = &'a Vec<f32>>, dim: usize) -> Self {
        let mut sum = vec![0f64; dim];
        let mut sum_sq = vec![0f64; dim];
        let mut count = 0usize;
        for frame in frames {
            for (d, &v) in frame.iter().take(dim).enumerate() {
                sum[d] += f64::from(v);
                sum_sq[d] += f64::from(v) * f64::from(v);
            }
            count += 1;
        }
        if count == 0 {
            return Self::identity(dim);
        }

        let n = count as f64;
        let mut mean = Vec::with_capacity(dim);
        let mut inv_std = Vec::with_capacity(dim);
        for d in 0..dim {
            let m = sum[d] / n;
            let var = (sum_sq[d] / n - m * m).max(0.0);
            mean.push(m as f32);
            inv_std.push(if var > MIN_VARIANCE {
                (1.0 / var.sqrt()) as f32
            } else {
                1.0
            });
        }
        FeatureStats { mean, inv_std }
    }

    pub fn dim(&self) -> usize {
        self.mean.len()
    }
}

/// Fixed affine front end: `(x - mean) * inv_std`. Its parameters are
/// stored with the model but never trained.
#[derive(Module, Debug)]
pub struct Rescale<B: Backend> {
    mean: Param<Tensor<B, 1>>,
    inv_std: Param<Tensor<B, 1>>,
}

impl<B: Backend> Rescale<B> {
    pub fn new(stats: &FeatureStats, device: &B::Device) -> Self {
        let frozen = |values: &[f32]| {
            let tensor = Tensor::from_data(TensorData::new(values.to_vec(), [values.len()]), device);
            Param::from_tensor(tensor).set_require_grad(false)
        };
        Rescale {
            mean: frozen(&stats.mean),
            inv_std: frozen(&stats.inv_std),
        }
    }

    /// Input `[steps, dim]`.
    pub fn forward(&self, input: Tensor<B, 2>) -> Tensor<B, 2> {
        let mean = self.mean.val().detach().unsqueeze::<2>();
        let inv_std = self.inv_std.val().detach().unsqueeze::<2>();
        (input - mean) * inv_std
    }

    pub fn stats(&self) -> FeatureStats {
        let read = |p: &Param<Tensor<B, 1>>| p.val().into_data().to_vec::<f32>().unwrap_or_default();
        FeatureStats {
            mean: read(&self.mean),
            inv_std: read(&self.inv_std),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{example, SampleSet};
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_stats_over_all_frames() {
        let frames = vec![vec![1.0, 5.0], vec![3.0, 5.0]];
        let stats = FeatureStats::from_frames(frames.iter(), 2);
        assert_eq!(stats.mean, vec![2.0, 5.0]);
        assert!((stats.inv_std[0] - 1.0).abs() < 1e-6);
        // Constant dimension keeps unit scale.
        assert_eq!(stats.inv_std[1], 1.0);
    }

    #[test]
    fn test_stats_from_sample_set() {
        let set = SampleSet::new(vec![example("a", 3, vec![6]), example("b", 5, vec![7])]);
        let stats = FeatureStats::from_sample_set(&set, 4);
        assert_eq!(stats.dim(), 4);
        assert!(stats.inv_std.iter().all(|v| v.is_finite() && *v > 0.0));
    }

    #[test]
    fn test_empty_set_gives_identity() {
        let stats = FeatureStats::from_sample_set(&SampleSet::default(), 3);
        assert_eq!(stats, FeatureStats::identity(3));
    }

    #[test]
    fn test_rescale_normalizes() {
        let device = Default::default();
        let stats = FeatureStats {
            mean: vec![1.0, -2.0],
            inv_std: vec![0.5, 2.0],
        };
        let rescale = Rescale::<TestBackend>::new(&stats, &device);
        let input = Tensor::from_data(TensorData::new(vec![3.0f32, -1.0, 1.0, -2.0], [2, 2]), &device);
        let out = rescale.forward(input).into_data().to_vec::<f32>().unwrap();
        assert_eq!(out, vec![1.0, 2.0, 0.0, 0.0]);
        assert_eq!(rescale.stats(), stats);
    }
}
