use std::ops::Range;
use std::sync::Arc;

use rand::seq::{IndexedRandom, SliceRandom};
use rand::Rng;

use crate::audio::FeatureSequence;

/// A feature sequence paired with its label class indices.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingExample {
    pub id: String,
    pub features: FeatureSequence,
    pub labels: Vec<usize>,
}

/// Ordered collection of training examples. Cloning and slicing share the
/// underlying examples.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    examples: Vec<Arc<TrainingExample>>,
}

impl SampleSet {
    pub fn new(examples: Vec<TrainingExample>) -> Self {
        SampleSet {
            examples: examples.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<TrainingExample>> {
        self.examples.iter()
    }

    pub fn as_slice(&self) -> &[Arc<TrainingExample>] {
        &self.examples
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.examples.shuffle(rng);
    }

    /// Contiguous sub-range, clamped to the set's length.
    pub fn subset(&self, range: Range<usize>) -> SampleSet {
        let end = range.end.min(self.len());
        let start = range.start.min(end);
        SampleSet {
            examples: self.examples[start..end].to_vec(),
        }
    }

    /// Up to `count` examples drawn without replacement.
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> SampleSet {
        if count >= self.len() {
            return self.clone();
        }
        SampleSet {
            examples: self.examples.choose_multiple(rng, count).cloned().collect(),
        }
    }

    /// Iterate over consecutive batches of `size` examples.
    pub fn batches(&self, size: usize) -> impl Iterator<Item = &[Arc<TrainingExample>]> {
        self.examples.chunks(size.max(1))
    }

    /// Total number of feature frames across all examples.
    pub fn frame_count(&self) -> usize {
        self.examples.iter().map(|e| e.features.len()).sum()
    }
}

/// Shuffle `set` and split it into `(training, validation)`, where the
/// validation partition is the leading `floor(ratio * len)` examples.
pub fn split_train_validation<R: Rng + ?Sized>(
    set: &SampleSet,
    validation_ratio: f64,
    rng: &mut R,
) -> (SampleSet, SampleSet) {
    let mut shuffled = set.clone();
    shuffled.shuffle(rng);
    let total = shuffled.len();
    let validation_len = ((total as f64) * validation_ratio).floor() as usize;
    let validation_len = validation_len.min(total);

    let validation = shuffled.subset(0..validation_len);
    let training = shuffled.subset(validation_len..total);

    tracing::debug!(
        training = training.len(),
        validation = validation.len(),
        "split dataset"
    );
    (training, validation)
}
