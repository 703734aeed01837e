use std::cmp::Ordering;
use std::collections::HashMap;

/// Greedy decoding: arg-max per step, collapse repeats, drop blanks.
pub fn best_path(log_probs: &[Vec<f32>], blank: usize) -> Vec<usize> {
    let mut path = Vec::new();
    let mut previous = None;
    for step in log_probs {
        let best = argmax(step);
        if best != previous {
            if let Some(label) = best.filter(|&l| l != blank) {
                path.push(label);
            }
        }
        previous = best;
    }
    path
}

fn argmax(values: &[f32]) -> Option<usize> {
    values
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(Ordering::Equal))
        .map(|(i, _)| i)
}

/// Settings for [`prefix_search`].
#[derive(Debug, Clone, Copy)]
pub struct PrefixSearch {
    pub blank: usize,
    /// Labels with probability below this are not extended at a step.
    pub cutoff: f64,
    pub beam_width: usize,
}

#[derive(Debug, Clone, Copy)]
struct PrefixScore {
    /// Log-probability of the prefix with a trailing blank.
    blank: f64,
    /// Log-probability of the prefix ending in its last label.
    label: f64,
}

impl PrefixScore {
    const EMPTY: PrefixScore = PrefixScore {
        blank: f64::NEG_INFINITY,
        label: f64::NEG_INFINITY,
    };

    fn total(&self) -> f64 {
        log_add(self.blank, self.label)
    }
}

fn log_add(a: f64, b: f64) -> f64 {
    if a == f64::NEG_INFINITY {
        return b;
    }
    if b == f64::NEG_INFINITY {
        return a;
    }
    let max = a.max(b);
    max + ((a - max).exp() + (b - max).exp()).ln()
}

/// Beam search over label prefixes, merging alignments of the same prefix.
pub fn prefix_search(log_probs: &[Vec<f32>], params: &PrefixSearch) -> Vec<usize> {
    let log_cutoff = params.cutoff.max(f64::MIN_POSITIVE).ln();
    let beam_width = params.beam_width.max(1);

    let mut beam: Vec<(Vec<usize>, PrefixScore)> = vec![(
        Vec::new(),
        PrefixScore {
            blank: 0.0,
            label: f64::NEG_INFINITY,
        },
    )];

    for step in log_probs {
        let mut next: HashMap<Vec<usize>, PrefixScore> = HashMap::new();
        let candidates: Vec<(usize, f64)> = step
            .iter()
            .enumerate()
            .map(|(c, &lp)| (c, f64::from(lp)))
            .filter(|&(c, lp)| c == params.blank || lp >= log_cutoff)
            .collect();

        for (prefix, score) in &beam {
            let total = score.total();
            for &(class, lp) in &candidates {
                if class == params.blank {
                    let entry = next.entry(prefix.clone()).or_insert(PrefixScore::EMPTY);
                    entry.blank = log_add(entry.blank, total + lp);
                    continue;
                }

                let mut extended = prefix.clone();
                extended.push(class);
                let entry = next.entry(extended).or_insert(PrefixScore::EMPTY);
                if prefix.last() == Some(&class) {
                    // A repeat only extends after a blank; otherwise it stays collapsed.
                    entry.label = log_add(entry.label, score.blank + lp);
                    let same = next.entry(prefix.clone()).or_insert(PrefixScore::EMPTY);
                    same.label = log_add(same.label, score.label + lp);
                } else {
                    entry.label = log_add(entry.label, total + lp);
                }
            }
        }

        let mut ranked: Vec<(Vec<usize>, PrefixScore)> = next.into_iter().collect();
        ranked.sort_by(|a, b| {
            b.1.total()
                .partial_cmp(&a.1.total())
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        ranked.truncate(beam_width);
        if ranked.is_empty() {
            break;
        }
        beam = ranked;
    }

    beam.into_iter()
        .next()
        .map(|(prefix, _)| prefix)
        .unwrap_or_default()
}
