//! Pre-computed split: caller supplies fold assignments directly.

use rand_chacha::ChaCha8Rng;

use super::{Fold, SplitPlanner, validate_folds};
use crate::error::Result;
use crate::frame::Frame;
use crate::outcome::OutcomeSpec;

/// Wraps a caller-supplied fold list. `plan` only validates disjointness
/// and coverage; it never reshuffles or re-derives the folds.
pub struct PrecomputedSplit {
    pub folds: Vec<Fold>,
}

impl PrecomputedSplit {
    pub fn new(folds: Vec<Fold>) -> Self {
        Self { folds }
    }
}

impl SplitPlanner for PrecomputedSplit {
    fn plan(&self, frame: &Frame, _outcome: &OutcomeSpec, _rng: &mut ChaCha8Rng) -> Result<Vec<Fold>> {
        validate_folds(&self.folds, frame.row_count())?;
        Ok(self.folds.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::seeded_rng;
    use crate::split::tests::dummy_frame;

    #[test]
    fn accepts_a_valid_precomputed_partition() {
        let frame = dummy_frame(4);
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
        let mut rng = seeded_rng(1);
        let planned = PrecomputedSplit::new(folds)
            .plan(&frame, &OutcomeSpec::Unsupervised, &mut rng)
            .unwrap();
        assert_eq!(planned.len(), 2);
    }

    #[test]
    fn rejects_a_partition_missing_coverage() {
        let frame = dummy_frame(4);
        let folds = vec![Fold {
            train_indices: vec![],
            app_indices: vec![0, 1],
        }];
        let mut rng = seeded_rng(1);
        let err = PrecomputedSplit::new(folds)
            .plan(&frame, &OutcomeSpec::Unsupervised, &mut rng)
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_SPLIT");
    }
}
