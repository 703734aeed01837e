mod builder;
mod manifest;
pub mod scramble;
mod sample_set;

pub use builder::{build_sample_set, load_sample_set};
pub use manifest::{SampleIndex, SampleRecord, INDEX_FILE};
pub use sample_set::{split_train_validation, SampleSet, TrainingExample};

#[cfg(test)]
pub(crate) use sample_set::tests::example;
