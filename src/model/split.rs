//! Seeded, class-stratified train/test split.

use std::collections::BTreeMap;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::types::{MatchOutcome, PipelineError};

/// Row indices of each partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Split {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Partition `labels` so each outcome keeps (as near as possible) its
/// share in both halves. `ceil(test_fraction * n)` rows go to the test
/// side and every class lands at least once on each side.
///
/// Fails with `InsufficientData` rather than dropping a class: every
/// outcome needs two rows, there must be two distinct outcomes, and each
/// partition must hold at least one row per class.
pub fn stratified_split(labels: &[MatchOutcome], test_fraction: f64, seed: u64) -> Result<Split, PipelineError> {
    let n = labels.len();
    if n == 0 {
        return Err(PipelineError::InsufficientData("dataset is empty".into()));
    }

    let mut by_class: BTreeMap<MatchOutcome, Vec<usize>> = BTreeMap::new();
    for (i, label) in labels.iter().enumerate() {
        by_class.entry(*label).or_default().push(i);
    }
    let n_classes = by_class.len();
    if n_classes < 2 {
        return Err(PipelineError::InsufficientData(format!(
            "need at least two distinct outcomes, found {n_classes}"
        )));
    }
    if let Some((outcome, rows)) = by_class.iter().find(|(_, rows)| rows.len() < 2) {
        return Err(PipelineError::InsufficientData(format!(
            "outcome {outcome} has only {} row(s); a stratified split needs at least 2 per outcome",
            rows.len()
        )));
    }

    let n_test = ((test_fraction * n as f64 - 1e-9).ceil() as usize).min(n);
    let n_train = n - n_test;
    if n_test < n_classes || n_train < n_classes {
        return Err(PipelineError::InsufficientData(format!(
            "{n} rows give a {n_train}/{n_test} split, too small for {n_classes} outcomes"
        )));
    }

    let counts: Vec<usize> = by_class.values().map(Vec::len).collect();
    let allocation = allocate(&counts, n, n_test);

    let mut rng = StdRng::seed_from_u64(seed);
    let mut split = Split {
        train: Vec::with_capacity(n_train),
        test: Vec::with_capacity(n_test),
    };
    for (mut rows, take) in by_class.into_values().zip(allocation) {
        rows.shuffle(&mut rng);
        split.test.extend_from_slice(&rows[..take]);
        split.train.extend_from_slice(&rows[take..]);
    }
    split.train.shuffle(&mut rng);
    split.test.shuffle(&mut rng);
    Ok(split)
}

/// Test rows per class: proportional shares rounded by largest remainder,
/// each kept within `1..=count - 1`, summing to `n_test`.
fn allocate(counts: &[usize], n: usize, n_test: usize) -> Vec<usize> {
    let exact: Vec<f64> = counts
        .iter()
        .map(|&c| c as f64 * n_test as f64 / n as f64)
        .collect();
    let mut alloc: Vec<usize> = exact
        .iter()
        .zip(counts)
        .map(|(e, &c)| (e.floor() as usize).clamp(1, c - 1))
        .collect();

    // Classes ordered by how much rounding shortchanged them.
    let mut order: Vec<usize> = (0..counts.len()).collect();
    order.sort_by(|&a, &b| {
        let fa = exact[a] - alloc[a] as f64;
        let fb = exact[b] - alloc[b] as f64;
        fb.total_cmp(&fa).then(a.cmp(&b))
    });

    let mut total: usize = alloc.iter().sum();
    while total < n_test {
        let before = total;
        for &i in &order {
            if total < n_test && alloc[i] < counts[i] - 1 {
                alloc[i] += 1;
                total += 1;
            }
        }
        if total == before {
            break;
        }
    }
    while total > n_test {
        let before = total;
        for &i in order.iter().rev() {
            if total > n_test && alloc[i] > 1 {
                alloc[i] -= 1;
                total -= 1;
            }
        }
        if total == before {
            break;
        }
    }
    alloc
}
