//! Simple k-fold: random shuffle then consecutive slices.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use super::{Fold, SplitPlanner, validate_folds};
use crate::error::Result;
use crate::frame::Frame;
use crate::outcome::OutcomeSpec;

/// Shuffles all row indices once, then slices them into `k` contiguous
/// application chunks; each fold's `train_indices` is the complement.
pub struct SimpleKFold {
    pub k: usize,
}

impl SimpleKFold {
    pub fn new(k: usize) -> Self {
        Self { k }
    }
}

impl SplitPlanner for SimpleKFold {
    fn plan(&self, frame: &Frame, _outcome: &OutcomeSpec, rng: &mut ChaCha8Rng) -> Result<Vec<Fold>> {
        let n = frame.row_count();
        let mut order: Vec<usize> = (0..n).collect();
        order.shuffle(rng);

        let folds = partition_into_folds(&order, self.k);
        validate_folds(&folds, n)?;
        Ok(folds)
    }
}

/// Split a (possibly pre-shuffled) row order into `k` contiguous
/// application chunks, each fold's train set the complement. Chunk sizes
/// differ by at most one row. Tie-break within a chunk is stable: rows
/// retain the relative order given in `order`.
pub(crate) fn partition_into_folds(order: &[usize], k: usize) -> Vec<Fold> {
    let n = order.len();
    let base = n / k;
    let remainder = n % k;

    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold_idx in 0..k {
        let size = base + if fold_idx < remainder { 1 } else { 0 };
        let end = start + size;
        let mut app_indices: Vec<usize> = order[start..end].to_vec();
        app_indices.sort_unstable();
        let mut train_indices: Vec<usize> = order[..start]
            .iter()
            .chain(order[end..].iter())
            .copied()
            .collect();
        train_indices.sort_unstable();
        folds.push(Fold {
            train_indices,
            app_indices,
        });
        start = end;
    }
    folds
}
