use std::path::Path;

use rand::Rng;
use tracing::{debug, info};

use super::manifest::SampleIndex;
use super::sample_set::{SampleSet, TrainingExample};
use crate::audio::FeatureExtractor;
use crate::error::DatasetError;
use crate::labels;

/// Load the sample directory at `dir` into training examples.
pub fn load_sample_set<R: Rng + ?Sized>(
    dir: &Path,
    extractor: &FeatureExtractor,
    rng: &mut R,
) -> Result<SampleSet, DatasetError> {
    let index = SampleIndex::load(dir)?;
    build_sample_set(&index, extractor, rng)
}

/// Extract features for every recorded sample in `index`.
///
/// Samples without a file are skipped. Any unreadable recording fails the
/// whole load.
pub fn build_sample_set<R: Rng + ?Sized>(
    index: &SampleIndex,
    extractor: &FeatureExtractor,
    rng: &mut R,
) -> Result<SampleSet, DatasetError> {
    let mut examples = Vec::new();
    for (record, path) in index.recorded() {
        let features =
            extractor
                .extract_file(&path, rng)
                .map_err(|source| DatasetError::Audio {
                    id: record.id.clone(),
                    source,
                })?;
        let labels = labels::to_indices(&labels::encode(&record.label));
        debug!(id = %record.id, frames = features.len(), labels = labels.len(), "loaded sample");
        examples.push(TrainingExample {
            id: record.id.clone(),
            features,
            labels,
        });
    }

    info!(
        samples = examples.len(),
        skipped = index.samples.len() - examples.len(),
        dir = %index.dir.display(),
        "loaded sample directory"
    );
    Ok(SampleSet::new(examples))
}
