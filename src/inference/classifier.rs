use std::path::Path;

use burn::prelude::*;
use burn::tensor::TensorData;
use rand::Rng;

use crate::audio::{FeatureExtractor, FeatureSequence};
use crate::checkpoint::{CheckpointManager, CheckpointMetadata};
use crate::ctc::{best_path, prefix_search, PrefixSearch};
use crate::error::{CheckpointError, InferenceError};
use crate::labels::{self, Label, BLANK_INDEX};
use crate::model::{InferBackend, SpeechNetwork};

/// Decoder selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeMode {
    #[default]
    BestPath,
    PrefixSearch,
}

/// Decoder settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct DecodeConfig {
    pub mode: DecodeMode,
    /// Labels below this probability are not extended during prefix search.
    pub prefix_cutoff: f64,
    pub beam_width: usize,
}

impl Default for DecodeConfig {
    fn default() -> Self {
        DecodeConfig {
            mode: DecodeMode::BestPath,
            prefix_cutoff: 1e-4,
            beam_width: 16,
        }
    }
}

/// Decoded output for one recording.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub labels: Vec<Label>,
    pub moves: String,
}

/// A trained network with the feature settings it was trained on.
pub struct Classifier {
    network: SpeechNetwork<InferBackend>,
    extractor: FeatureExtractor,
    metadata: CheckpointMetadata,
}

impl Classifier {
    pub fn new(network: SpeechNetwork<InferBackend>, metadata: CheckpointMetadata) -> Self {
        Classifier {
            network,
            extractor: FeatureExtractor::new(metadata.features.clone()),
            metadata,
        }
    }

    /// Load from a checkpoint file. A missing file is an error here.
    pub fn load(path: &Path) -> Result<Self, CheckpointError> {
        let device = <InferBackend as Backend>::Device::default();
        let loaded = CheckpointManager::new(path)
            .load::<InferBackend>(&device)?
            .ok_or_else(|| CheckpointError::Read {
                path: path.to_path_buf(),
                source: std::io::ErrorKind::NotFound.into(),
            })?;
        Ok(Self::new(loaded.network, loaded.metadata))
    }

    pub fn network(&self) -> &SpeechNetwork<InferBackend> {
        &self.network
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn metadata(&self) -> &CheckpointMetadata {
        &self.metadata
    }

    /// Per-step log-probabilities, one row per frame.
    pub fn log_probs(&self, features: &FeatureSequence) -> Result<Vec<Vec<f32>>, InferenceError> {
        if features.is_empty() {
            return Ok(Vec::new());
        }
        let output = self.network.forward_sequence(features);
        let [_, classes] = output.dims();
        output_rows(output.into_data(), classes)
    }

    pub fn classify_features(
        &self,
        features: &FeatureSequence,
        decode: &DecodeConfig,
    ) -> Result<Classification, InferenceError> {
        let log_probs = self.log_probs(features)?;
        let path = match decode.mode {
            DecodeMode::BestPath => best_path(&log_probs, BLANK_INDEX),
            DecodeMode::PrefixSearch => prefix_search(
                &log_probs,
                &PrefixSearch {
                    blank: BLANK_INDEX,
                    cutoff: decode.prefix_cutoff,
                    beam_width: decode.beam_width,
                },
            ),
        };
        let labels = labels::from_indices(&path);
        let moves = labels::decode(&labels);
        Ok(Classification { labels, moves })
    }

    /// Decode a recording into moves.
    pub fn classify_file<R: Rng + ?Sized>(
        &self,
        path: &Path,
        decode: &DecodeConfig,
        rng: &mut R,
    ) -> Result<Classification, InferenceError> {
        let features = self
            .extractor
            .extract_file(path, rng)
            .map_err(|source| InferenceError::Audio {
                path: path.to_path_buf(),
                source,
            })?;
        self.classify_features(&features, decode)
    }
}

/// Split flat `[steps, classes]` output into one row per step.
fn output_rows(data: TensorData, classes: usize) -> Result<Vec<Vec<f32>>, InferenceError> {
    let values = data
        .to_vec::<f32>()
        .map_err(|e| InferenceError::Output(format!("{e:?}")))?;
    Ok(values.chunks(classes.max(1)).map(<[f32]>::to_vec).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::tests::write_wav;
    use crate::audio::FeatureConfig;
    use crate::labels::OUTPUT_CLASSES;
    use crate::model::{FeatureStats, NetworkConfig};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn classifier() -> Classifier {
        let network = NetworkConfig {
            hidden_size: 4,
            output_hidden_size: 4,
            ..NetworkConfig::default()
        };
        let metadata = CheckpointMetadata::new(FeatureConfig::default(), network.clone());
        let model = network.init(&FeatureStats::identity(26), &Default::default());
        Classifier::new(model, metadata)
    }

    #[test]
    fn test_log_probs_rows() {
        let classifier = classifier();
        let features: FeatureSequence = vec![vec![0.1; 26]; 4];
        let rows = classifier.log_probs(&features).unwrap();
        assert_eq!(rows.len(), 4);
        assert!(rows.iter().all(|r| r.len() == OUTPUT_CLASSES));
        assert!(classifier.log_probs(&Vec::new()).unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_output_is_error() {
        let data = TensorData::new(vec![1i64, 2, 3, 4], [2, 2]);
        let result = output_rows(data, 2);
        assert!(matches!(result, Err(InferenceError::Output(_))));

        let rows = output_rows(TensorData::new(vec![0.5f32, -0.5, 1.0, 2.0], [2, 2]), 2).unwrap();
        assert_eq!(rows, vec![vec![0.5, -0.5], vec![1.0, 2.0]]);
    }

    #[test]
    fn test_decoded_moves_match_labels() {
        let classifier = classifier();
        let features: FeatureSequence = (0..12).map(|t| vec![t as f32 * 0.2; 26]).collect();
        for mode in [DecodeMode::BestPath, DecodeMode::PrefixSearch] {
            let decode = DecodeConfig {
                mode,
                ..DecodeConfig::default()
            };
            let result = classifier.classify_features(&features, &decode).unwrap();
            assert_eq!(result.moves, labels::decode(&result.labels));
        }
    }

    #[test]
    fn test_classify_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.wav");
        let tone: Vec<i16> = (0..4000).map(|i| ((i as f32 * 0.1).sin() * 8000.0) as i16).collect();
        write_wav(&path, 1, 16_000, &tone);

        let result = classifier()
            .classify_file(&path, &DecodeConfig::default(), &mut StdRng::seed_from_u64(0))
            .unwrap();
        assert_eq!(result.moves, labels::decode(&result.labels));
    }

    #[test]
    fn test_missing_checkpoint_is_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Classifier::load(&dir.path().join("none.bin")).is_err());
    }
}
