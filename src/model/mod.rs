mod gru;
mod network;
mod normalizer;
mod regularization;

use burn::backend::Autodiff;

pub use gru::{Gru, GruConfig};
pub use network::{sequence_tensor, NetworkConfig, SpeechNetwork};
pub use normalizer::{FeatureStats, Rescale};
pub use regularization::{InputNoise, Regularized, SwitchableDropout};

/// Backend used for inference and cost evaluation.
#[cfg(not(feature = "wgpu"))]
pub type InferBackend = burn::backend::NdArray<f32>;

/// Backend used for inference and cost evaluation.
#[cfg(feature = "wgpu")]
pub type InferBackend = burn::backend::Wgpu<f32, i32>;

/// Backend used for gradient steps.
pub type TrainBackend = Autodiff<InferBackend>;
