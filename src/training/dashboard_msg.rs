use std::path::PathBuf;

use super::metrics::EpochReport;

/// Updates sent from the training thread to the UI.
#[derive(Debug, Clone)]
pub enum TrainingUpdate {
    Started {
        training_samples: usize,
        validation_samples: usize,
        /// Epochs already in the checkpoint when this run started.
        starting_epoch: usize,
    },
    Epoch(EpochReport),
    CheckpointSaved {
        epoch: usize,
        path: PathBuf,
    },
    Failed(String),
    Finished,
}
