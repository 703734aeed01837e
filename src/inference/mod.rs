//! Decoding recordings with a trained checkpoint.

mod classifier;
mod rate;

pub use classifier::{Classification, Classifier, DecodeConfig, DecodeMode};
pub use rate::{rate_samples, SampleRating};
