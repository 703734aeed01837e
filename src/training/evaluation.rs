use std::sync::Arc;
use std::thread;

use burn::prelude::*;
use burn::tensor::ElementConversion;
use tracing::debug;

use crate::ctc::ctc_loss;
use crate::dataset::TrainingExample;
use crate::error::TrainingError;
use crate::labels::BLANK_INDEX;
use crate::model::SpeechNetwork;

/// Costs at or above this come from alignments the loss cannot represent,
/// such as more labels than frames.
const INFEASIBLE_COST: f64 = 1e29;

/// CTC cost of each example, in input order. Examples with no valid alignment
/// cost `f64::INFINITY`.
///
/// Examples are divided among up to `workers` scoped threads, each running its
/// own copy of `network` over batches of `batch_size`.
pub fn example_costs<B: Backend>(
    network: &SpeechNetwork<B>,
    examples: &[Arc<TrainingExample>],
    batch_size: usize,
    workers: usize,
) -> Result<Vec<f64>, TrainingError> {
    if examples.is_empty() {
        return Ok(Vec::new());
    }
    let workers = workers.clamp(1, examples.len());
    let share = examples.len().div_ceil(workers);

    thread::scope(|scope| {
        let handles: Vec<_> = examples
            .chunks(share)
            .map(|part| {
                let model = network.clone();
                scope.spawn(move || {
                    part.chunks(batch_size.max(1))
                        .flat_map(|batch| batch_costs(&model, batch))
                        .collect::<Vec<f64>>()
                })
            })
            .collect();

        let mut costs = Vec::with_capacity(examples.len());
        for handle in handles {
            costs.extend(handle.join().map_err(|_| TrainingError::WorkerPanic)?);
        }
        Ok(costs)
    })
}

/// Mean CTC cost over `examples`, or `None` when there are none. Examples
/// with no valid alignment are left out; if none has one the mean is infinite.
pub fn mean_cost<B: Backend>(
    network: &SpeechNetwork<B>,
    examples: &[Arc<TrainingExample>],
    batch_size: usize,
    workers: usize,
) -> Result<Option<f64>, TrainingError> {
    let costs = example_costs(network, examples, batch_size, workers)?;
    if costs.is_empty() {
        return Ok(None);
    }
    let feasible: Vec<f64> = costs.iter().copied().filter(|c| c.is_finite()).collect();
    if feasible.len() < costs.len() {
        debug!(
            skipped = costs.len() - feasible.len(),
            "examples without a valid alignment left out of the mean cost"
        );
    }
    if feasible.is_empty() {
        return Ok(Some(f64::INFINITY));
    }
    Ok(Some(feasible.iter().sum::<f64>() / feasible.len() as f64))
}

fn batch_costs<B: Backend>(network: &SpeechNetwork<B>, batch: &[Arc<TrainingExample>]) -> Vec<f64> {
    let sequences: Vec<_> = batch.iter().map(|e| &e.features).collect();
    network
        .forward_batch(&sequences)
        .into_iter()
        .zip(batch)
        .map(|(log_probs, example)| {
            let cost = ctc_loss(log_probs, &example.labels, BLANK_INDEX)
                .into_scalar()
                .elem::<f64>();
            if cost >= INFEASIBLE_COST {
                f64::INFINITY
            } else {
                cost
            }
        })
        .collect()
}
