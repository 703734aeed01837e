use std::cmp::Ordering;

use super::classifier::Classifier;
use crate::dataset::SampleSet;
use crate::error::TrainingError;
use crate::training::evaluation::example_costs;

/// CTC log-likelihood of one sample's label under the model.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleRating {
    pub id: String,
    pub log_likelihood: f64,
}

/// Rate every sample, least likely first.
pub fn rate_samples(
    classifier: &Classifier,
    samples: &SampleSet,
    batch_size: usize,
    workers: usize,
) -> Result<Vec<SampleRating>, TrainingError> {
    let costs = example_costs(classifier.network(), samples.as_slice(), batch_size, workers)?;
    let mut ratings: Vec<SampleRating> = samples
        .iter()
        .zip(costs)
        .map(|(example, cost)| SampleRating {
            id: example.id.clone(),
            log_likelihood: -cost,
        })
        .collect();
    ratings.sort_by(|a, b| {
        a.log_likelihood
            .partial_cmp(&b.log_likelihood)
            .unwrap_or(Ordering::Equal)
    });
    Ok(ratings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::FeatureConfig;
    use crate::checkpoint::CheckpointMetadata;
    use crate::dataset::example;
    use crate::model::{FeatureStats, NetworkConfig};

    #[test]
    fn test_ratings_sorted_ascending() {
        let features = FeatureConfig {
            cepstral_coefficients: 2,
            ..FeatureConfig::default()
        };
        let network = NetworkConfig {
            hidden_size: 4,
            output_hidden_size: 4,
            ..NetworkConfig::default()
        };
        let model = network.init(&FeatureStats::identity(4), &Default::default());
        let classifier = Classifier::new(model, CheckpointMetadata::new(features, network));

        let samples = SampleSet::new(vec![
            example("short", 3, vec![6]),
            example("long", 8, vec![6, 7, 8, 9]),
            example("mid", 5, vec![6, 1]),
        ]);
        let ratings = rate_samples(&classifier, &samples, 2, 2).unwrap();

        assert_eq!(ratings.len(), 3);
        assert!(ratings.windows(2).all(|w| w[0].log_likelihood <= w[1].log_likelihood));
        assert!(ratings.iter().all(|r| r.log_likelihood < 0.0));
    }

    #[test]
    fn test_unalignable_sample_rates_negative_infinity() {
        let features = FeatureConfig {
            cepstral_coefficients: 2,
            ..FeatureConfig::default()
        };
        let network = NetworkConfig {
            hidden_size: 4,
            output_hidden_size: 4,
            ..NetworkConfig::default()
        };
        let model = network.init(&FeatureStats::identity(4), &Default::default());
        let classifier = Classifier::new(model, CheckpointMetadata::new(features, network));

        let samples = SampleSet::new(vec![
            example("ok", 6, vec![6]),
            example("mislabeled", 1, vec![6, 7, 8]),
        ]);
        let ratings = rate_samples(&classifier, &samples, 2, 1).unwrap();

        assert_eq!(ratings[0].id, "mislabeled");
        assert_eq!(ratings[0].log_likelihood, f64::NEG_INFINITY);
        assert_eq!(format!("{:e}", ratings[0].log_likelihood), "-inf");
        assert!(ratings[1].log_likelihood.is_finite());
    }
}
