use std::ops::ControlFlow;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::time::{Duration, Instant};

use burn::grad_clipping::GradientClippingConfig;
use burn::module::AutodiffModule;
use burn::optim::adaptor::OptimizerAdaptor;
use burn::optim::{Adam, AdamConfig, GradientsAccumulator, GradientsParams, Optimizer};
use burn::prelude::*;
use burn::tensor::ElementConversion;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, info};

use crate::audio::{FeatureConfig, FeatureExtractor};
use crate::checkpoint::{CheckpointManager, CheckpointMetadata, CheckpointMetrics, LoadedCheckpoint};
use crate::config::AppConfig;
use crate::ctc::ctc_batch_loss;
use crate::dataset::{load_sample_set, split_train_validation, SampleSet, TrainingExample};
use crate::error::TrainingError;
use crate::labels::BLANK_INDEX;
use crate::model::{FeatureStats, NetworkConfig, Regularized, SpeechNetwork, TrainBackend};
use crate::training::dashboard_msg::TrainingUpdate;
use crate::training::evaluation::mean_cost;
use crate::training::metrics::{EpochReport, TrainingMetrics, RECENT_LOSS_WINDOW};

/// Optimization and evaluation settings.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TrainerConfig {
    /// Adam step size.
    pub step_size: f64,
    /// Examples per optimization step.
    pub batch_size: usize,
    /// Examples per forward pass during cost evaluation.
    pub cost_batch_size: usize,
    /// Examples drawn from each partition for the per-epoch cost.
    pub cost_sample_size: usize,
    /// Largest group of examples whose gradients are computed together.
    pub max_sub_batch: usize,
    /// Worker threads for cost evaluation.
    pub max_concurrency: usize,
    pub validation_ratio: f64,
    pub seed: u64,
    /// Stop after this many epochs in one run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_epochs: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grad_clip_norm: Option<f32>,
}

impl Default for TrainerConfig {
    fn default() -> Self {
        TrainerConfig {
            step_size: 1e-3,
            batch_size: 16,
            cost_batch_size: 4,
            cost_sample_size: 64,
            max_sub_batch: 8,
            max_concurrency: 2,
            validation_ratio: 0.3,
            seed: 123,
            max_epochs: None,
            grad_clip_norm: None,
        }
    }
}

/// Where the network comes from.
pub enum ModelSource {
    Resume(LoadedCheckpoint<TrainBackend>),
    Fresh {
        features: FeatureConfig,
        network: NetworkConfig,
    },
}

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct TrainingSummary {
    pub epochs_this_run: usize,
    pub epochs_total: usize,
    pub last_report: Option<EpochReport>,
}

/// Epoch loop over a fixed train/validation split.
///
/// Construction performs setup, [`Trainer::run`] repeats epochs until the
/// callback breaks, then switches the network to eval mode and writes the
/// checkpoint.
pub struct Trainer {
    config: TrainerConfig,
    checkpoint: CheckpointManager,
    metadata: CheckpointMetadata,
    network: SpeechNetwork<TrainBackend>,
    optimizer: OptimizerAdaptor<Adam, SpeechNetwork<TrainBackend>, TrainBackend>,
    training: SampleSet,
    validation: SampleSet,
    metrics: TrainingMetrics,
    rng: StdRng,
}

impl Trainer {
    /// Load the checkpoint if one exists, build the dataset in `sample_dir`
    /// and prepare to train.
    pub fn initialize(
        app: &AppConfig,
        checkpoint: CheckpointManager,
        sample_dir: &Path,
    ) -> Result<Self, TrainingError> {
        let device = <TrainBackend as Backend>::Device::default();
        TrainBackend::seed(app.training.seed);
        let mut rng = StdRng::seed_from_u64(app.training.seed);

        let source = match checkpoint.load::<TrainBackend>(&device)? {
            Some(loaded) => {
                info!(
                    path = %checkpoint.path().display(),
                    epochs = loaded.metadata.epochs_trained,
                    "resuming from checkpoint"
                );
                ModelSource::Resume(loaded)
            }
            None => {
                info!(path = %checkpoint.path().display(), "no checkpoint found, creating model");
                ModelSource::Fresh {
                    features: app.features.clone(),
                    network: app.network.clone(),
                }
            }
        };

        let features = match &source {
            ModelSource::Resume(loaded) => loaded.metadata.features.clone(),
            ModelSource::Fresh { features, .. } => features.clone(),
        };
        let extractor = FeatureExtractor::new(features);
        let samples = load_sample_set(sample_dir, &extractor, &mut rng)?;

        Self::new(app.training.clone(), checkpoint, source, samples, rng)
    }

    /// Split `samples` and set up the network and optimizer.
    pub fn new(
        config: TrainerConfig,
        checkpoint: CheckpointManager,
        source: ModelSource,
        samples: SampleSet,
        mut rng: StdRng,
    ) -> Result<Self, TrainingError> {
        let device = <TrainBackend as Backend>::Device::default();
        let (training, validation) =
            split_train_validation(&samples, config.validation_ratio, &mut rng);
        if training.is_empty() {
            return Err(TrainingError::EmptyTrainingSet);
        }

        let (network, metadata) = match source {
            ModelSource::Resume(loaded) => (loaded.network, loaded.metadata),
            ModelSource::Fresh { features, network } => {
                let stats = FeatureStats::from_sample_set(&training, features.feature_dim());
                let model = network.init::<TrainBackend>(&stats, &device);
                (model, CheckpointMetadata::new(features, network))
            }
        };

        let found = training.iter().find_map(|e| e.features.first()).map_or(
            metadata.input_size,
            Vec::len,
        );
        if found != metadata.input_size {
            return Err(TrainingError::FeatureMismatch {
                expected: metadata.input_size,
                found,
            });
        }

        let mut adam = AdamConfig::new();
        if let Some(norm) = config.grad_clip_norm {
            adam = adam.with_grad_clipping(Some(GradientClippingConfig::Norm(norm)));
        }

        info!(
            training = training.len(),
            validation = validation.len(),
            frames = training.frame_count(),
            "dataset split"
        );

        Ok(Trainer {
            config,
            checkpoint,
            metadata,
            network,
            optimizer: adam.init(),
            training,
            validation,
            metrics: TrainingMetrics::new(),
            rng,
        })
    }

    pub fn training_len(&self) -> usize {
        self.training.len()
    }

    pub fn validation_len(&self) -> usize {
        self.validation.len()
    }

    pub fn epochs_trained(&self) -> usize {
        self.metadata.epochs_trained
    }

    /// Train until `on_epoch` breaks or `max_epochs` is reached, then save.
    pub fn run<F>(mut self, mut on_epoch: F) -> Result<TrainingSummary, TrainingError>
    where
        F: FnMut(&EpochReport) -> ControlFlow<()>,
    {
        self.network.set_training_mode(true);
        let mut epochs_this_run = 0;
        let mut last_report = None;

        loop {
            let report = self.run_epoch()?;
            epochs_this_run += 1;
            let flow = on_epoch(&report);
            last_report = Some(report);

            let limit_hit = self
                .config
                .max_epochs
                .is_some_and(|max| epochs_this_run >= max);
            if flow.is_break() || limit_hit {
                break;
            }
        }

        self.finalize()?;
        Ok(TrainingSummary {
            epochs_this_run,
            epochs_total: self.metadata.epochs_trained,
            last_report,
        })
    }

    /// Train while logging each epoch. Used without the dashboard. Setting
    /// `stop` ends the run at the next epoch boundary and saves.
    pub fn run_headless(self, stop: Arc<AtomicBool>) -> Result<TrainingSummary, TrainingError> {
        info!(
            training = self.training.len(),
            validation = self.validation.len(),
            "starting training"
        );
        self.run(|report| {
            match report.validation_cost {
                Some(cross) => info!(
                    "Epoch {}: cost={:e} cross={:e}",
                    report.epoch, report.train_cost, cross
                ),
                None => info!("Epoch {}: cost={:e}", report.epoch, report.train_cost),
            }
            if stop.load(Ordering::Relaxed) {
                info!("stop requested, saving");
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        })
    }

    /// Train while streaming updates to the dashboard. `quit` is honored at
    /// epoch boundaries; `pause` holds training at the next boundary.
    pub fn run_with_dashboard(
        self,
        updates: Sender<TrainingUpdate>,
        pause: Arc<AtomicBool>,
        quit: Arc<AtomicBool>,
    ) -> Result<TrainingSummary, TrainingError> {
        let _ = updates.send(TrainingUpdate::Started {
            training_samples: self.training.len(),
            validation_samples: self.validation.len(),
            starting_epoch: self.metadata.epochs_trained,
        });
        let path = self.checkpoint.path().to_path_buf();
        let epoch_updates = updates.clone();

        let result = self.run(|report| {
            let _ = epoch_updates.send(TrainingUpdate::Epoch(report.clone()));
            while pause.load(Ordering::Relaxed) && !quit.load(Ordering::Relaxed) {
                std::thread::sleep(Duration::from_millis(100));
            }
            if quit.load(Ordering::Relaxed) {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });

        match &result {
            Ok(summary) => {
                let _ = updates.send(TrainingUpdate::CheckpointSaved {
                    epoch: summary.epochs_total,
                    path,
                });
            }
            Err(e) => {
                let _ = updates.send(TrainingUpdate::Failed(e.to_string()));
            }
        }
        let _ = updates.send(TrainingUpdate::Finished);
        result
    }

    fn run_epoch(&mut self) -> Result<EpochReport, TrainingError> {
        let start = Instant::now();
        self.training.shuffle(&mut self.rng);
        let order = self.training.clone();

        let mut loss_sum = 0.0;
        let mut batches = 0;
        for batch in order.batches(self.config.batch_size) {
            let loss = self.train_step(batch);
            self.metrics.record_batch(loss);
            loss_sum += loss;
            batches += 1;
        }

        let (train_cost, validation_cost) = self.evaluate_costs()?;
        self.metadata.epochs_trained += 1;
        self.metadata.metrics = Some(CheckpointMetrics {
            train_cost,
            validation_cost,
        });

        let duration = start.elapsed();
        self.metrics.record_epoch(duration);
        debug!(
            epoch = self.metadata.epochs_trained,
            batches,
            avg_epoch_secs = self.metrics.average_epoch_secs(10),
            "epoch complete"
        );

        Ok(EpochReport {
            epoch: self.metadata.epochs_trained,
            train_cost,
            validation_cost,
            batch_loss: if batches > 0 {
                loss_sum / batches as f64
            } else {
                0.0
            },
            recent_loss: self.metrics.average_loss(RECENT_LOSS_WINDOW),
            total_batches: self.metrics.total_batches(),
            duration,
        })
    }

    /// One Adam step on the mean CTC loss of `batch`. Gradients are
    /// accumulated over sub-batches of at most `max_sub_batch` examples.
    fn train_step(&mut self, batch: &[Arc<TrainingExample>]) -> f64 {
        let mut accumulator = GradientsAccumulator::new();
        let mut total = 0.0;

        for sub_batch in batch.chunks(self.config.max_sub_batch.max(1)) {
            let pairs = sub_batch
                .iter()
                .map(|e| {
                    (
                        self.network.forward_sequence(&e.features),
                        e.labels.as_slice(),
                    )
                })
                .collect();
            let Some(loss) = ctc_batch_loss(pairs, BLANK_INDEX) else {
                continue;
            };
            let loss = loss.mul_scalar(sub_batch.len() as f32 / batch.len() as f32);
            total += loss.clone().into_scalar().elem::<f64>();

            let grads = GradientsParams::from_grads(loss.backward(), &self.network);
            accumulator.accumulate(&self.network, grads);
        }

        let grads = accumulator.grads();
        self.network = self
            .optimizer
            .step(self.config.step_size, self.network.clone(), grads);
        total
    }

    /// Mean costs over samples of both partitions with regularization off.
    fn evaluate_costs(&mut self) -> Result<(f64, Option<f64>), TrainingError> {
        self.network.set_training_mode(false);
        let model = self.network.valid();

        let size = self.config.cost_sample_size.max(1);
        let train_sample = self.training.sample(size, &mut self.rng);
        let validation_sample = self.validation.sample(size, &mut self.rng);

        let batch = self.config.cost_batch_size;
        let workers = self.config.max_concurrency;
        let train = mean_cost(&model, train_sample.as_slice(), batch, workers);
        let validation = mean_cost(&model, validation_sample.as_slice(), batch, workers);

        self.network.set_training_mode(true);
        Ok((train?.unwrap_or(0.0), validation?))
    }

    fn finalize(&mut self) -> Result<(), TrainingError> {
        self.network.set_training_mode(false);
        self.metadata.touch();
        self.checkpoint.save(&self.network.valid(), &self.metadata)?;
        info!(
            path = %self.checkpoint.path().display(),
            epochs = self.metadata.epochs_trained,
            "saved checkpoint"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::example;
    use std::sync::mpsc;

    fn features() -> FeatureConfig {
        FeatureConfig {
            cepstral_coefficients: 2,
            ..FeatureConfig::default()
        }
    }

    fn network() -> NetworkConfig {
        NetworkConfig {
            hidden_size: 4,
            output_hidden_size: 4,
            ..NetworkConfig::default()
        }
    }

    fn samples(n: usize) -> SampleSet {
        SampleSet::new(
            (0..n)
                .map(|i| example(&format!("s{i}"), 5 + i % 3, vec![6, 7, 1]))
                .collect(),
        )
    }

    fn config() -> TrainerConfig {
        TrainerConfig {
            batch_size: 3,
            max_sub_batch: 2,
            cost_sample_size: 4,
            ..TrainerConfig::default()
        }
    }

    fn fresh() -> ModelSource {
        ModelSource::Fresh {
            features: features(),
            network: network(),
        }
    }

    fn trainer(path: &Path, n: usize) -> Trainer {
        Trainer::new(
            config(),
            CheckpointManager::new(path),
            fresh(),
            samples(n),
            StdRng::seed_from_u64(1),
        )
        .unwrap()
    }

    #[test]
    fn test_split_on_construction() {
        let dir = tempfile::tempdir().unwrap();
        let trainer = trainer(&dir.path().join("m.bin"), 10);
        assert_eq!(trainer.validation_len(), 3);
        assert_eq!(trainer.training_len(), 7);
        assert_eq!(trainer.epochs_trained(), 0);
    }

    #[test]
    fn test_empty_training_set_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = Trainer::new(
            config(),
            CheckpointManager::new(dir.path().join("m.bin")),
            fresh(),
            SampleSet::default(),
            StdRng::seed_from_u64(1),
        );
        assert!(matches!(result, Err(TrainingError::EmptyTrainingSet)));
    }

    #[test]
    fn test_feature_mismatch_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = ModelSource::Fresh {
            features: FeatureConfig::default(),
            network: network(),
        };
        let result = Trainer::new(
            config(),
            CheckpointManager::new(dir.path().join("m.bin")),
            source,
            samples(4),
            StdRng::seed_from_u64(1),
        );
        assert!(matches!(
            result,
            Err(TrainingError::FeatureMismatch {
                expected: 26,
                found: 4
            })
        ));
    }

    #[test]
    fn test_runs_until_callback_breaks_then_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.bin");
        let mut seen = Vec::new();

        let summary = trainer(&path, 8)
            .run(|report| {
                assert!(report.train_cost.is_finite());
                assert!(report.validation_cost.is_some());
                seen.push(report.epoch);
                if seen.len() == 2 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();

        assert_eq!(seen, vec![1, 2]);
        assert_eq!(summary.epochs_this_run, 2);

        let loaded = CheckpointManager::new(&path)
            .load::<TrainBackend>(&Default::default())
            .unwrap()
            .unwrap();
        assert_eq!(loaded.metadata.epochs_trained, 2);
        assert!(loaded.metadata.metrics.is_some_and(|m| m.validation_cost.is_some()));
        assert!(!loaded.network.is_training_mode());
    }

    #[test]
    fn test_empty_validation_partition_checkpoint_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.bin");
        let trainer = trainer(&path, 3);
        assert_eq!(trainer.validation_len(), 0);

        trainer
            .run(|report| {
                assert_eq!(report.validation_cost, None);
                ControlFlow::Break(())
            })
            .unwrap();

        let loaded = CheckpointManager::new(&path)
            .load::<TrainBackend>(&Default::default())
            .unwrap()
            .unwrap();
        let metrics = loaded.metadata.metrics.unwrap();
        assert!(metrics.train_cost.is_finite());
        assert_eq!(metrics.validation_cost, None);
    }

    #[test]
    fn test_headless_stop_flag_saves_at_epoch_boundary() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.bin");
        let stop = Arc::new(AtomicBool::new(true));

        let summary = trainer(&path, 5).run_headless(stop).unwrap();

        assert_eq!(summary.epochs_this_run, 1);
        let report = summary.last_report.unwrap();
        assert_eq!(report.total_batches, 2);
        assert!(report.recent_loss.is_finite());
        let loaded = CheckpointManager::new(&path)
            .load::<TrainBackend>(&Default::default())
            .unwrap()
            .unwrap();
        assert_eq!(loaded.metadata.epochs_trained, 1);
    }

    #[test]
    fn test_resume_continues_epoch_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.bin");
        trainer(&path, 6).run(|_| ControlFlow::Break(())).unwrap();

        let loaded = CheckpointManager::new(&path)
            .load::<TrainBackend>(&Default::default())
            .unwrap()
            .unwrap();
        let resumed = Trainer::new(
            TrainerConfig {
                max_epochs: Some(2),
                ..config()
            },
            CheckpointManager::new(&path),
            ModelSource::Resume(loaded),
            samples(6),
            StdRng::seed_from_u64(2),
        )
        .unwrap();
        assert_eq!(resumed.epochs_trained(), 1);

        let summary = resumed.run(|_| ControlFlow::Continue(())).unwrap();
        assert_eq!(summary.epochs_this_run, 2);
        assert_eq!(summary.epochs_total, 3);
    }

    #[test]
    fn test_training_reduces_cost() {
        let dir = tempfile::tempdir().unwrap();
        let mut costs = Vec::new();
        let mut config = config();
        config.step_size = 1e-2;
        config.max_epochs = Some(15);
        config.validation_ratio = 0.0;
        Trainer::new(
            config,
            CheckpointManager::new(dir.path().join("m.bin")),
            fresh(),
            samples(4),
            StdRng::seed_from_u64(3),
        )
        .unwrap()
        .run(|report| {
            costs.push(report.train_cost);
            ControlFlow::Continue(())
        })
        .unwrap();

        assert_eq!(costs.len(), 15);
        assert!(costs.last().unwrap() < costs.first().unwrap());
    }

    #[test]
    fn test_dashboard_mode_quits_and_reports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("m.bin");
        let (tx, rx) = mpsc::channel();
        let quit = Arc::new(AtomicBool::new(true));
        let pause = Arc::new(AtomicBool::new(false));

        trainer(&path, 5)
            .run_with_dashboard(tx, pause, quit)
            .unwrap();

        let updates: Vec<TrainingUpdate> = rx.try_iter().collect();
        assert!(matches!(updates.first(), Some(TrainingUpdate::Started { .. })));
        assert!(matches!(updates[1], TrainingUpdate::Epoch(ref r) if r.epoch == 1));
        assert!(matches!(updates[2], TrainingUpdate::CheckpointSaved { epoch: 1, .. }));
        assert!(matches!(updates.last(), Some(TrainingUpdate::Finished)));
        assert!(path.exists());
    }
}
