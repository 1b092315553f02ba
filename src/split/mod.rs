//! Split planner (§4.1): partitions training rows into disjoint
//! application folds, with a fixed-seed deterministic sub-stream per the
//! concurrency model in §5.

mod kfold;
mod precomputed;
mod stratified;

pub use kfold::SimpleKFold;
pub(crate) use kfold::partition_into_folds;
pub use precomputed::PrecomputedSplit;
pub use stratified::StratifiedKFold;

use rand_chacha::ChaCha8Rng;
use rand_chacha::rand_core::SeedableRng;

use crate::error::Result;
use crate::frame::Frame;
use crate::outcome::OutcomeSpec;

/// One fold's disjoint row partitions.
#[derive(Debug, Clone)]
pub struct Fold {
    pub train_indices: Vec<usize>,
    pub app_indices: Vec<usize>,
}

/// Produces the ordered list of folds used by the cross-fit driver.
pub trait SplitPlanner {
    fn plan(&self, frame: &Frame, outcome: &OutcomeSpec, rng: &mut ChaCha8Rng) -> Result<Vec<Fold>>;
}

/// Derive a fit-level `ChaCha8Rng` from the fit seed. Every stochastic step
/// (split assignment, tie-breaks) seeds its own sub-stream from this one so
/// reproducibility does not depend on worker execution order.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Validate that a candidate fold set partitions `{0..row_count}` exactly:
/// every index covered by `app_indices` across folds, no duplicates within
/// a fold's `app_indices`, and `train_indices` the complement within each
/// fold.
pub(crate) fn validate_folds(folds: &[Fold], row_count: usize) -> Result<()> {
    use crate::error::VartreatError;
    use std::collections::HashSet;

    let mut covered: HashSet<usize> = HashSet::new();
    for fold in folds {
        let mut seen_in_fold: HashSet<usize> = HashSet::new();
        for &idx in &fold.app_indices {
            if idx >= row_count {
                return Err(VartreatError::InvalidSplit(format!(
                    "app index {idx} out of bounds for {row_count} rows"
                )));
            }
            if !seen_in_fold.insert(idx) {
                return Err(VartreatError::InvalidSplit(format!(
                    "row {idx} appears twice in the same fold's app_indices"
                )));
            }
            covered.insert(idx);
        }
        let train_set: HashSet<usize> = fold.train_indices.iter().copied().collect();
        if !train_set.is_disjoint(&seen_in_fold) {
            return Err(VartreatError::InvalidSplit(
                "a fold's train_indices and app_indices overlap".to_string(),
            ));
        }
    }

    if covered.len() != row_count {
        return Err(VartreatError::InvalidSplit(format!(
            "app_indices across folds cover {} of {row_count} rows",
            covered.len()
        )));
    }

    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::frame::Column;

    pub(crate) fn dummy_frame(n: usize) -> Frame {
        Frame::new(vec![Column::numeric(
            "x",
            (0..n).map(|i| Some(i as f64)).collect(),
        )])
        .unwrap()
    }

    #[test]
    fn validate_folds_accepts_exact_partition() {
        let folds = vec![
            Fold {
                train_indices: vec![2, 3],
                app_indices: vec![0, 1],
            },
            Fold {
                train_indices: vec![0, 1],
                app_indices: vec![2, 3],
            },
        ];
        assert!(validate_folds(&folds, 4).is_ok());
    }

    #[test]
    fn validate_folds_rejects_missing_coverage() {
        let folds = vec![Fold {
            train_indices: vec![],
            app_indices: vec![0, 1],
        }];
        let err = validate_folds(&folds, 4).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SPLIT");
    }

    #[test]
    fn validate_folds_rejects_duplicate_within_fold() {
        let folds = vec![Fold {
            train_indices: vec![],
            app_indices: vec![0, 0, 1, 2, 3],
        }];
        let err = validate_folds(&folds, 4).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SPLIT");
    }
}
