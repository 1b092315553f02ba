//! Significance scorer (§4.4): per-derived-column significance against the
//! outcome, and the recommendation filter.

use serde::{Deserialize, Serialize};

use crate::config::EncoderKind;
use crate::regression::{self, RegressionSummary};

/// One derived column awaiting a score, alongside the metadata that ends
/// up on its [`ScoreRow`].
pub struct DerivedColumn<'a> {
    pub var_name: &'a str,
    pub origin: &'a str,
    pub kind: EncoderKind,
    pub needs_split: bool,
    pub extra_model_degrees: usize,
    pub values: &'a [f64],
}

/// One record per derived column (and per outcome class, in multinomial)
/// summarizing its fit against the outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRow {
    pub var_name: String,
    pub var_moves: bool,
    pub rsq: f64,
    pub sig: f64,
    pub needs_split: bool,
    pub extra_model_degrees: usize,
    pub origin: String,
    pub kind: EncoderKind,
    pub recommended: bool,
    pub outcome_level: Option<String>,
}

/// Score every derived column in `columns` against `targets`, a per-row
/// target aligned with each column's values (`None` rows are dropped from
/// that column's fit). `outcome_is_numeric` selects OLS vs. logistic;
/// `outcome_level` is stamped onto every row, for the multinomial
/// per-class score frame. `rare_sig`, when set, additionally suppresses
/// recommendation for any derived column (each indicator-kind column
/// being one categorical level) whose significance doesn't clear it.
///
/// The recommendation threshold `1 / derived_variable_count` uses
/// `columns.len()` as the denominator, matching the cross-frame-wide
/// variable count rather than a per-origin-column count.
pub fn score_columns(
    columns: &[DerivedColumn<'_>],
    targets: &[Option<f64>],
    outcome_is_numeric: bool,
    outcome_level: Option<&str>,
    rare_sig: Option<f64>,
) -> Vec<ScoreRow> {
    let derived_variable_count = columns.len().max(1);
    let threshold = 1.0 / derived_variable_count as f64;

    columns
        .iter()
        .map(|column| score_one(column, targets, outcome_is_numeric, outcome_level, threshold, rare_sig))
        .collect()
}

fn score_one(
    column: &DerivedColumn<'_>,
    targets: &[Option<f64>],
    outcome_is_numeric: bool,
    outcome_level: Option<&str>,
    threshold: f64,
    rare_sig: Option<f64>,
) -> ScoreRow {
    let var_moves = has_variance(column.values);

    let (rsq, sig) = if var_moves {
        let (x, y) = paired_present(column.values, targets);
        let summary = fit(outcome_is_numeric, &x, &y, column.extra_model_degrees);
        (summary.rsq, summary.sig)
    } else {
        (0.0, 1.0)
    };

    let clears_rare_sig = rare_sig.is_none_or(|rs| sig <= rs);
    let recommended = var_moves && sig < threshold && clears_rare_sig;

    ScoreRow {
        var_name: column.var_name.to_string(),
        var_moves,
        rsq,
        sig,
        needs_split: column.needs_split,
        extra_model_degrees: column.extra_model_degrees,
        origin: column.origin.to_string(),
        kind: column.kind,
        recommended,
        outcome_level: outcome_level.map(str::to_string),
    }
}

fn fit(outcome_is_numeric: bool, x: &[f64], y: &[f64], extra_model_degrees: usize) -> RegressionSummary {
    if outcome_is_numeric {
        regression::ols(x, y, extra_model_degrees)
    } else {
        regression::logistic(x, y, extra_model_degrees)
    }
}

fn has_variance(values: &[f64]) -> bool {
    match values.split_first() {
        None => false,
        Some((first, rest)) => rest.iter().any(|v| (v - first).abs() > f64::EPSILON),
    }
}

fn paired_present(values: &[f64], targets: &[Option<f64>]) -> (Vec<f64>, Vec<f64>) {
    values
        .iter()
        .zip(targets)
        .filter_map(|(&v, t)| t.map(|y| (v, y)))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_column_is_never_recommended() {
        let values = vec![1.0; 20];
        let targets: Vec<Option<f64>> = (0..20).map(|i| Some(i as f64)).collect();
        let columns = vec![DerivedColumn {
            var_name: "x_clean",
            origin: "x",
            kind: EncoderKind::Clean,
            needs_split: false,
            extra_model_degrees: 0,
            values: &values,
        }];
        let rows = score_columns(&columns, &targets, true, None, None);
        assert!(!rows[0].var_moves);
        assert!(!rows[0].recommended);
    }

    #[test]
    fn strong_numeric_signal_is_recommended() {
        let values: Vec<f64> = (0..100).map(|i| i as f64).collect();
        let targets: Vec<Option<f64>> = values.iter().map(|x| Some(2.0 * x + 1.0)).collect();
        let columns = vec![DerivedColumn {
            var_name: "x_impact",
            origin: "x",
            kind: EncoderKind::Impact,
            needs_split: true,
            extra_model_degrees: 5,
            values: &values,
        }];
        let rows = score_columns(&columns, &targets, true, None, None);
        assert!(rows[0].recommended);
        assert!(rows[0].rsq > 0.9);
    }

    #[test]
    fn more_derived_columns_tighten_the_threshold() {
        // A weak-but-real signal: p-value comfortably above 1/1000 but
        // below 1/10. Scoring it alongside one other column should
        // recommend it; scoring the identical fit alongside 999 others
        // should not.
        let x: Vec<f64> = vec![
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0,
        ];
        let y: Vec<Option<f64>> = vec![
            Some(1.0),
            Some(1.2),
            Some(3.0),
            Some(1.8),
            Some(4.0),
            Some(2.6),
            Some(5.0),
            Some(3.4),
            Some(6.0),
            Some(4.2),
            Some(7.0),
            Some(5.0),
        ];

        fn column(values: &[f64]) -> DerivedColumn<'_> {
            DerivedColumn {
                var_name: "x_impact",
                origin: "x",
                kind: EncoderKind::Impact,
                needs_split: true,
                extra_model_degrees: 0,
                values,
            }
        }

        let few = vec![column(&x)];
        let sig = score_columns(&few, &y, true, None, None)[0].sig;
        assert!(sig > 1e-6 && sig < 0.1, "expected a borderline p-value, got {sig}");

        let many: Vec<DerivedColumn<'_>> = (0..999).map(|_| column(&x)).collect();
        let mut many_with_target = many;
        many_with_target.push(column(&x));
        let crowded = score_columns(&many_with_target, &y, true, None, None);
        assert!(!crowded[0].recommended);
    }

    #[test]
    fn rare_sig_suppresses_recommendation_below_threshold() {
        let x: Vec<f64> = vec![
            1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0, 11.0, 12.0,
        ];
        let y: Vec<Option<f64>> = vec![
            Some(1.0),
            Some(1.2),
            Some(3.0),
            Some(1.8),
            Some(4.0),
            Some(2.6),
            Some(5.0),
            Some(3.4),
            Some(6.0),
            Some(4.2),
            Some(7.0),
            Some(5.0),
        ];
        let columns = vec![DerivedColumn {
            var_name: "x_impact",
            origin: "x",
            kind: EncoderKind::Impact,
            needs_split: true,
            extra_model_degrees: 0,
            values: &x,
        }];

        let unconstrained = score_columns(&columns, &y, true, None, None);
        assert!(unconstrained[0].recommended);

        let sig = unconstrained[0].sig;
        let constrained = score_columns(&columns, &y, true, None, Some(sig / 10.0));
        assert!(!constrained[0].recommended);
    }

    #[test]
    fn outcome_level_is_stamped_through() {
        let values = vec![0.0, 1.0, 0.0, 1.0];
        let targets: Vec<Option<f64>> = vec![Some(0.0), Some(1.0), Some(0.0), Some(1.0)];
        let columns = vec![DerivedColumn {
            var_name: "c_impact",
            origin: "c",
            kind: EncoderKind::Impact,
            needs_split: true,
            extra_model_degrees: 5,
            values: &values,
        }];
        let rows = score_columns(&columns, &targets, false, Some("large"), None);
        assert_eq!(rows[0].outcome_level.as_deref(), Some("large"));
    }
}
