use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::audio::FeatureConfig;
use crate::model::NetworkConfig;

/// Costs at checkpoint time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetrics {
    pub train_cost: f64,
    /// Absent when the validation partition is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation_cost: Option<f64>,
}

/// Header stored in front of the model record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckpointMetadata {
    pub epochs_trained: usize,
    pub timestamp: u64,
    /// Feature dimension the network expects.
    pub input_size: usize,
    pub features: FeatureConfig,
    pub network: NetworkConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<CheckpointMetrics>,
}

impl CheckpointMetadata {
    pub fn new(features: FeatureConfig, network: NetworkConfig) -> Self {
        CheckpointMetadata {
            epochs_trained: 0,
            timestamp: unix_now(),
            input_size: features.feature_dim(),
            features,
            network,
            metrics: None,
        }
    }

    pub fn touch(&mut self) {
        self.timestamp = unix_now();
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
