use burn::prelude::*;
use burn::tensor::{Int, TensorData};

/// Stand-in for log(0) that keeps sums finite.
const LOG_ZERO: f32 = -1e30;

/// Negative log-likelihood of `labels` under per-step log-probabilities
/// `[steps, classes]`, summed over all alignments. Returns a one-element
/// tensor.
pub fn ctc_loss<B: Backend>(log_probs: Tensor<B, 2>, labels: &[usize], blank: usize) -> Tensor<B, 1> {
    let device = log_probs.device();
    let [steps, _] = log_probs.dims();

    let extended = extend_with_blanks(labels, blank);
    let width = extended.len();
    let indices: Vec<i64> = extended.iter().map(|&i| i as i64).collect();
    let indices = Tensor::<B, 1, Int>::from_data(TensorData::new(indices, [width]), &device);
    let emissions = log_probs.select(1, indices);

    let skip = Tensor::<B, 1>::from_data(TensorData::new(skip_mask(&extended), [width]), &device);
    let start: Vec<f32> = (0..width).map(|s| if s < 2 { 0.0 } else { LOG_ZERO }).collect();
    let start = Tensor::<B, 1>::from_data(TensorData::new(start, [width]), &device);

    let mut alpha = emissions.clone().slice([0..1, 0..width]).reshape([width]) + start;
    for t in 1..steps {
        let stay = alpha.clone();
        let advance = shift_right(alpha.clone(), 1);
        let jump = shift_right(alpha, 2) + skip.clone();
        alpha = log_sum_exp3(stay, advance, jump)
            + emissions.clone().slice([t..t + 1, 0..width]).reshape([width]);
    }

    let last = alpha.clone().slice([width - 1..width]);
    let log_likelihood = if width > 1 {
        log_add(last, alpha.slice([width - 2..width - 1]))
    } else {
        last
    };
    log_likelihood.neg()
}

/// Mean loss over a batch of `(log_probs, labels)` pairs.
pub fn ctc_batch_loss<B: Backend>(
    batch: Vec<(Tensor<B, 2>, &[usize])>,
    blank: usize,
) -> Option<Tensor<B, 1>> {
    let n = batch.len();
    let losses: Vec<Tensor<B, 1>> = batch
        .into_iter()
        .map(|(log_probs, labels)| ctc_loss(log_probs, labels, blank))
        .collect();
    (n > 0).then(|| Tensor::cat(losses, 0).sum().div_scalar(n as f32))
}

/// `[b, l0, b, l1, ..., b]`
fn extend_with_blanks(labels: &[usize], blank: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(2 * labels.len() + 1);
    out.push(blank);
    for &label in labels {
        out.push(label);
        out.push(blank);
    }
    out
}

/// 0 where a path may skip the preceding blank, log(0) elsewhere.
fn skip_mask(extended: &[usize]) -> Vec<f32> {
    (0..extended.len())
        .map(|s| {
            let allowed = s >= 2 && extended[s] != extended[s - 2];
            if allowed {
                0.0
            } else {
                LOG_ZERO
            }
        })
        .collect()
}

fn shift_right<B: Backend>(x: Tensor<B, 1>, by: usize) -> Tensor<B, 1> {
    let [width] = x.dims();
    let device = x.device();
    if by >= width {
        return Tensor::full([width], LOG_ZERO, &device);
    }
    Tensor::cat(
        vec![Tensor::full([by], LOG_ZERO, &device), x.slice([0..width - by])],
        0,
    )
}

fn log_add<B: Backend>(a: Tensor<B, 1>, b: Tensor<B, 1>) -> Tensor<B, 1> {
    let max = a.clone().max_pair(b.clone());
    max.clone() + ((a - max.clone()).exp() + (b - max).exp()).log()
}

fn log_sum_exp3<B: Backend>(a: Tensor<B, 1>, b: Tensor<B, 1>, c: Tensor<B, 1>) -> Tensor<B, 1> {
    let max = a.clone().max_pair(b.clone()).max_pair(c.clone());
    let sum = (a - max.clone()).exp() + (b - max.clone()).exp() + (c - max.clone()).exp();
    max + sum.log()
}
