use std::collections::VecDeque;

use crate::training::dashboard_msg::TrainingUpdate;
use crate::training::metrics::EpochReport;

const MAX_HISTORY: usize = 500;

/// Status of the training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrainingStatus {
    Starting,
    Running,
    Paused,
    Finished,
    Failed,
}

/// Dashboard state holding history buffers and current values.
pub struct DashboardState {
    // History buffers: (epoch, value)
    pub cost_history: VecDeque<(f64, f64)>,
    pub cross_history: VecDeque<(f64, f64)>,
    pub epoch_secs_history: VecDeque<u64>,

    pub training_samples: usize,
    pub validation_samples: usize,
    pub starting_epoch: usize,
    pub last_report: Option<EpochReport>,
    pub best_cross: Option<f64>,

    pub status: TrainingStatus,
    pub last_checkpoint: Option<String>,
    pub failure: Option<String>,
}

impl DashboardState {
    pub fn new() -> Self {
        DashboardState {
            cost_history: VecDeque::new(),
            cross_history: VecDeque::new(),
            epoch_secs_history: VecDeque::new(),
            training_samples: 0,
            validation_samples: 0,
            starting_epoch: 0,
            last_report: None,
            best_cross: None,
            status: TrainingStatus::Starting,
            last_checkpoint: None,
            failure: None,
        }
    }

    /// Apply an update from the training thread.
    pub fn apply_update(&mut self, update: TrainingUpdate) {
        match update {
            TrainingUpdate::Started {
                training_samples,
                validation_samples,
                starting_epoch,
            } => {
                self.training_samples = training_samples;
                self.validation_samples = validation_samples;
                self.starting_epoch = starting_epoch;
                if self.status == TrainingStatus::Starting {
                    self.status = TrainingStatus::Running;
                }
            }
            TrainingUpdate::Epoch(report) => self.apply_epoch(report),
            TrainingUpdate::CheckpointSaved { epoch, path } => {
                self.last_checkpoint = Some(format!("epoch {} ({})", epoch, path.display()));
            }
            TrainingUpdate::Failed(message) => {
                self.failure = Some(message);
                self.status = TrainingStatus::Failed;
            }
            TrainingUpdate::Finished => {
                if self.status != TrainingStatus::Failed {
                    self.status = TrainingStatus::Finished;
                }
            }
        }
    }

    fn apply_epoch(&mut self, report: EpochReport) {
        let epoch = report.epoch as f64;
        push_capped(&mut self.cost_history, (epoch, report.train_cost));
        if let Some(cross) = report.validation_cost {
            push_capped(&mut self.cross_history, (epoch, cross));
            self.best_cross = Some(self.best_cross.map_or(cross, |best| best.min(cross)));
        }
        let millis = report.duration.as_millis().min(u64::MAX as u128) as u64;
        push_capped(&mut self.epoch_secs_history, millis.div_ceil(1000));
        self.last_report = Some(report);
    }

    /// Latest epoch number, counted across resumed runs.
    pub fn epoch(&self) -> usize {
        self.last_report
            .as_ref()
            .map_or(self.starting_epoch, |r| r.epoch)
    }

    /// Epochs completed since this run started.
    pub fn epochs_this_run(&self) -> usize {
        self.epoch().saturating_sub(self.starting_epoch)
    }
}

impl Default for DashboardState {
    fn default() -> Self {
        Self::new()
    }
}

fn push_capped<T>(buffer: &mut VecDeque<T>, value: T) {
    buffer.push_back(value);
    if buffer.len() > MAX_HISTORY {
        buffer.pop_front();
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    fn report(epoch: usize, cost: f64, cross: Option<f64>) -> EpochReport {
        EpochReport {
            epoch,
            train_cost: cost,
            validation_cost: cross,
            batch_loss: cost,
            recent_loss: cost,
            total_batches: epoch * 3,
            duration: Duration::from_millis(1500),
        }
    }

    #[test]
    fn test_started_sets_counts() {
        let mut state = DashboardState::new();
        state.apply_update(TrainingUpdate::Started {
            training_samples: 70,
            validation_samples: 30,
            starting_epoch: 12,
        });
        assert_eq!(state.status, TrainingStatus::Running);
        assert_eq!(state.training_samples, 70);
        assert_eq!(state.validation_samples, 30);
        assert_eq!(state.epoch(), 12);
        assert_eq!(state.epochs_this_run(), 0);
    }

    #[test]
    fn test_epoch_updates_histories() {
        let mut state = DashboardState::new();
        state.apply_update(TrainingUpdate::Started {
            training_samples: 7,
            validation_samples: 3,
            starting_epoch: 4,
        });
        state.apply_update(TrainingUpdate::Epoch(report(5, 40.0, Some(50.0))));
        state.apply_update(TrainingUpdate::Epoch(report(6, 30.0, Some(55.0))));

        assert_eq!(state.cost_history.len(), 2);
        assert_eq!(state.cross_history.back(), Some(&(6.0, 55.0)));
        assert_eq!(state.best_cross, Some(50.0));
        assert_eq!(state.epoch_secs_history.back(), Some(&2));
        assert_eq!(state.epoch(), 6);
        assert_eq!(state.epochs_this_run(), 2);
    }

    #[test]
    fn test_missing_validation_cost_skips_cross_history() {
        let mut state = DashboardState::new();
        state.apply_update(TrainingUpdate::Epoch(report(1, 10.0, None)));
        assert_eq!(state.cost_history.len(), 1);
        assert!(state.cross_history.is_empty());
        assert_eq!(state.best_cross, None);
    }

    #[test]
    fn test_history_caps_at_500() {
        let mut state = DashboardState::new();
        for i in 0..600 {
            state.apply_update(TrainingUpdate::Epoch(report(i, 1.0, Some(2.0))));
        }
        assert_eq!(state.cost_history.len(), 500);
        assert_eq!(state.cross_history.len(), 500);
        assert_eq!(state.epoch_secs_history.len(), 500);
        assert_eq!(state.cost_history.front().map(|p| p.0), Some(100.0));
    }

    #[test]
    fn test_failure_survives_finished() {
        let mut state = DashboardState::new();
        state.apply_update(TrainingUpdate::Failed("disk full".into()));
        state.apply_update(TrainingUpdate::Finished);
        assert_eq!(state.status, TrainingStatus::Failed);
        assert_eq!(state.failure.as_deref(), Some("disk full"));
    }

    #[test]
    fn test_checkpoint_saved_is_shown() {
        let mut state = DashboardState::new();
        state.apply_update(TrainingUpdate::CheckpointSaved {
            epoch: 3,
            path: PathBuf::from("model.ckpt"),
        });
        state.apply_update(TrainingUpdate::Finished);
        assert_eq!(state.status, TrainingStatus::Finished);
        assert_eq!(state.last_checkpoint.as_deref(), Some("epoch 3 (model.ckpt)"));
    }
}
