//! Stratified k-fold: preserve class/bucket proportions per fold.

use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;

use super::{Fold, SplitPlanner, validate_folds};
use crate::error::Result;
use crate::frame::Frame;
use crate::outcome::OutcomeSpec;

/// Within each outcome class (binomial/multinomial) or outcome quantile
/// bucket (numeric, default 10 buckets), shuffles and distributes rows
/// round-robin across `k` folds so proportions are preserved.
pub struct StratifiedKFold {
    pub k: usize,
    pub numeric_buckets: usize,
}

impl StratifiedKFold {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            numeric_buckets: 10,
        }
    }
}

impl SplitPlanner for StratifiedKFold {
    fn plan(&self, frame: &Frame, outcome: &OutcomeSpec, rng: &mut ChaCha8Rng) -> Result<Vec<Fold>> {
        let n = frame.row_count();
        let strata = assign_strata(frame, outcome, n, self.numeric_buckets)?;

        let mut per_fold_app: Vec<Vec<usize>> = vec![Vec::new(); self.k];

        let mut by_stratum: std::collections::BTreeMap<i64, Vec<usize>> = std::collections::BTreeMap::new();
        for (row, stratum) in strata.into_iter().enumerate() {
            by_stratum.entry(stratum).or_default().push(row);
        }

        for (_, mut rows) in by_stratum {
            rows.shuffle(rng);
            for (i, row) in rows.into_iter().enumerate() {
                per_fold_app[i % self.k].push(row);
            }
        }

        let folds = per_fold_app
            .into_iter()
            .map(|mut app_indices| {
                app_indices.sort_unstable();
                let app_set: std::collections::HashSet<usize> = app_indices.iter().copied().collect();
                let mut train_indices: Vec<usize> = (0..n).filter(|r| !app_set.contains(r)).collect();
                train_indices.sort_unstable();
                Fold {
                    train_indices,
                    app_indices,
                }
            })
            .collect::<Vec<_>>();

        validate_folds(&folds, n)?;
        Ok(folds)
    }
}

/// Assigns each row an integer stratum id: the class index for
/// binomial/multinomial outcomes, or a quantile-bucket index for numeric
/// ones. Rows with a missing outcome get their own id so they still fall
/// into exactly one fold rather than being silently dropped by the
/// planner (the cross-fit driver excludes them from fitting separately).
fn assign_strata(
    frame: &Frame,
    outcome: &OutcomeSpec,
    n: usize,
    numeric_buckets: usize,
) -> Result<Vec<i64>> {
    match outcome {
        OutcomeSpec::Unsupervised => Ok(vec![0; n]),
        OutcomeSpec::Numeric { column } => {
            let col = frame.require_column(column)?;
            let mut present: Vec<f64> = (0..n).filter_map(|r| col.numeric_value(r)).collect();
            present.sort_by(|a, b| a.partial_cmp(b).unwrap());
            Ok((0..n)
                .map(|r| match col.numeric_value(r) {
                    Some(v) => bucket_of(&present, v, numeric_buckets) as i64,
                    None => -1,
                })
                .collect())
        }
        OutcomeSpec::Binomial { column, positive_value } => {
            let col = frame.require_column(column)?;
            Ok((0..n)
                .map(|r| match col.categorical_value(r).or_else(|| {
                    col.numeric_value(r).map(|_| "")
                }) {
                    None => -1,
                    Some(_) => {
                        let is_positive = col
                            .categorical_value(r)
                            .map(|v| v == positive_value)
                            .unwrap_or(false);
                        if is_positive { 1 } else { 0 }
                    }
                })
                .collect())
        }
        OutcomeSpec::Multinomial { column } => {
            let col = frame.require_column(column)?;
            let mut labels: Vec<String> = Vec::new();
            Ok((0..n)
                .map(|r| match col.categorical_value(r) {
                    None => -1,
                    Some(label) => {
                        if let Some(pos) = labels.iter().position(|l| l == label) {
                            pos as i64
                        } else {
                            labels.push(label.to_string());
                            (labels.len() - 1) as i64
                        }
                    }
                })
                .collect())
        }
    }
}

fn bucket_of(sorted_present: &[f64], value: f64, buckets: usize) -> usize {
    if sorted_present.is_empty() {
        return 0;
    }
    let rank = sorted_present.partition_point(|&v| v <= value);
    let fraction = rank as f64 / sorted_present.len() as f64;
    ((fraction * buckets as f64) as usize).min(buckets - 1)
}
