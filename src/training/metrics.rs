use std::collections::VecDeque;
use std::time::Duration;

/// Costs and timing for one completed epoch.
#[derive(Debug, Clone, PartialEq)]
pub struct EpochReport {
    /// Epoch number, counted across resumed runs.
    pub epoch: usize,
    /// Mean CTC cost over a sample of the training partition.
    pub train_cost: f64,
    /// Mean CTC cost over a sample of the validation partition, if it is non-empty.
    pub validation_cost: Option<f64>,
    /// Mean minibatch loss seen during the epoch's gradient steps.
    pub batch_loss: f64,
    /// Mean loss over the most recent minibatches, spanning epoch boundaries.
    pub recent_loss: f64,
    /// Minibatches trained since this run started.
    pub total_batches: usize,
    pub duration: Duration,
}

/// Number of minibatches behind [`EpochReport::recent_loss`].
pub const RECENT_LOSS_WINDOW: usize = 100;

/// Rolling minibatch loss and epoch timing.
pub struct TrainingMetrics {
    batch_losses: VecDeque<f64>,
    epoch_times: VecDeque<Duration>,
    capacity: usize,
    total_batches: usize, // lifetime count, never capped
}

impl TrainingMetrics {
    pub fn with_capacity(capacity: usize) -> Self {
        TrainingMetrics {
            batch_losses: VecDeque::with_capacity(capacity),
            epoch_times: VecDeque::with_capacity(capacity),
            capacity,
            total_batches: 0,
        }
    }

    pub fn new() -> Self {
        Self::with_capacity(100)
    }

    pub fn record_batch(&mut self, loss: f64) {
        self.total_batches += 1;
        self.batch_losses.push_back(loss);
        if self.batch_losses.len() > self.capacity {
            self.batch_losses.pop_front();
        }
    }

    pub fn record_epoch(&mut self, duration: Duration) {
        self.epoch_times.push_back(duration);
        if self.epoch_times.len() > self.capacity {
            self.epoch_times.pop_front();
        }
    }

    /// Average loss over the last N batches.
    pub fn average_loss(&self, last_n: usize) -> f64 {
        let n = self.batch_losses.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        self.batch_losses.iter().rev().take(n).sum::<f64>() / n as f64
    }

    /// Mean duration of the last N epochs in seconds.
    pub fn average_epoch_secs(&self, last_n: usize) -> f64 {
        let n = self.epoch_times.len().min(last_n);
        if n == 0 {
            return 0.0;
        }
        self.epoch_times
            .iter()
            .rev()
            .take(n)
            .map(Duration::as_secs_f64)
            .sum::<f64>()
            / n as f64
    }

    pub fn total_batches(&self) -> usize {
        self.total_batches
    }
}

impl Default for TrainingMetrics {
    fn default() -> Self {
        Self::new()
    }
}
