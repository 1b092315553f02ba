//! Cross-fit driver (§4.3): orchestrates k-fold out-of-fold encoder
//! fitting, producing an unbiased training cross-frame alongside the
//! deployment encoder set retained for transform.

use tracing::debug;

use crate::config::{EncoderKind, Parameters};
use crate::encoders::{
    Encoder, fallback_mean, fit_clean, fit_deviation, fit_impact_binomial, fit_impact_numeric,
    fit_indicators, fit_is_bad, fit_prevalence, kind_priority,
};
use crate::error::{Result, VartreatError};
use crate::frame::{Column, Frame};
use crate::outcome::OutcomeSpec;
use crate::pipeline::{CancellationToken, FitProgress, FitStage, ProgressReporter};
use crate::split::Fold;

/// Everything the cross-fit driver produced from one fit pass.
pub struct CrossFitOutput {
    /// Deployment encoders, grouped by origin column in variable order,
    /// each group internally ordered `(kind_priority, level_lex_order)`.
    pub encoders: Vec<Encoder>,
    /// The training-row-aligned cross-frame (derived columns only).
    pub cross_frame: Frame,
    /// Non-fatal edge-policy notices (e.g. an all-missing column was
    /// suppressed entirely).
    pub warnings: Vec<String>,
}

/// Run the cross-fit procedure over `variables`, given `folds` from the
/// split planner. `outcome_targets[r]` is `None` for rows whose outcome is
/// missing; those rows are excluded from every fit and, in the
/// cross-frame, filled with each derived column's own training-set mean.
#[allow(clippy::too_many_arguments)]
pub fn run(
    frame: &Frame,
    outcome: &OutcomeSpec,
    variables: &[String],
    folds: &[Fold],
    outcome_targets: Option<&[Option<f64>]>,
    parameters: &Parameters,
    cancellation: &CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<CrossFitOutput> {
    let row_count = frame.row_count();
    let outcome_is_numeric = outcome.is_numeric();

    let mut deployment_encoders = Vec::new();
    let mut cross_columns: Vec<Column> = Vec::new();
    let mut warnings = Vec::new();

    for origin_name in variables {
        if cancellation.is_cancelled() {
            return Err(VartreatError::InvalidParameter(
                "fit cancelled by caller".to_string(),
            ));
        }

        let column = frame.require_column(origin_name)?;

        if column.len() > 0 && column.missing_count() == column.len() {
            warnings.push(format!(
                "column '{origin_name}' is entirely missing; all encoders suppressed"
            ));
            continue;
        }

        let kinds = candidate_kinds(column, outcome, parameters);
        let mut per_column_encoders: Vec<Encoder> = Vec::new();

        for kind in kinds {
            progress.report(FitProgress::for_column(
                FitStage::Encoding,
                origin_name.clone(),
                format!("fitting {kind:?}"),
            ));

            if force_cross_validated(kind, parameters) {
                let Some((derived_name, values, deployment_encoder)) = fit_split(
                    kind,
                    frame,
                    column,
                    origin_name,
                    folds,
                    outcome_targets,
                    outcome_is_numeric,
                    parameters,
                    cancellation,
                    progress,
                )?
                else {
                    continue;
                };
                cross_columns.push(Column::numeric(derived_name, values.into_iter().map(Some).collect()));
                per_column_encoders.push(deployment_encoder);
            } else {
                let fit_rows = non_missing_outcome_rows(row_count, outcome_targets);
                let fit_frame = frame.select_rows(&fit_rows);
                let fit_column = fit_frame.require_column(origin_name)?;
                let fit_targets = outcome_targets.map(|t| select_targets(t, &fit_rows));

                let mut encoders = fit_kind(
                    kind,
                    fit_column,
                    origin_name,
                    fit_targets.as_deref(),
                    outcome_is_numeric,
                    parameters,
                );
                encoders.sort_by(|a, b| level_sort_key(a).cmp(&level_sort_key(b)));

                for encoder in encoders {
                    let values: Vec<Option<f64>> = (0..row_count).map(|r| Some(encoder.apply(column, r))).collect();
                    cross_columns.push(Column::numeric(encoder.derived_name(), values));
                    per_column_encoders.push(encoder);
                }
            }
        }

        debug!(column = %origin_name, encoders = per_column_encoders.len(), "fitted origin column");
        deployment_encoders.extend(per_column_encoders);
    }

    let cross_frame = Frame::new(cross_columns)?;
    Ok(CrossFitOutput {
        encoders: deployment_encoders,
        cross_frame,
        warnings,
    })
}

/// Fold-split a single-encoder kind: fit per-fold encoders on each fold's
/// training rows and apply them only to that fold's application rows,
/// plus a full-data deployment encoder retained for transform. Returns
/// `None` if the column yields no encoder of this kind even on full data
/// (e.g. a categorical column with a single observed level).
#[allow(clippy::too_many_arguments)]
fn fit_split(
    kind: EncoderKind,
    frame: &Frame,
    column: &Column,
    origin_name: &str,
    folds: &[Fold],
    outcome_targets: Option<&[Option<f64>]>,
    outcome_is_numeric: bool,
    parameters: &Parameters,
    cancellation: &CancellationToken,
    progress: &dyn ProgressReporter,
) -> Result<Option<(String, Vec<f64>, Encoder)>> {
    let row_count = frame.row_count();

    let deploy_rows = non_missing_outcome_rows(row_count, outcome_targets);
    let deploy_frame = frame.select_rows(&deploy_rows);
    let deploy_column = deploy_frame.require_column(origin_name)?;
    let deploy_targets = outcome_targets.map(|t| select_targets(t, &deploy_rows));

    let Some(deployment_encoder) = fit_kind(
        kind,
        deploy_column,
        origin_name,
        deploy_targets.as_deref(),
        outcome_is_numeric,
        parameters,
    )
    .into_iter()
    .next() else {
        return Ok(None);
    };

    let derived_name = deployment_encoder.derived_name().to_string();
    let mut values = vec![f64::NAN; row_count];

    for (fold_index, fold) in folds.iter().enumerate() {
        if cancellation.is_cancelled() {
            return Err(VartreatError::InvalidParameter(
                "fit cancelled by caller".to_string(),
            ));
        }
        progress.report(FitProgress::for_fold(
            FitStage::Encoding,
            origin_name.to_string(),
            fold_index,
            format!("fold {fold_index}"),
        ));

        let train_rows: Vec<usize> = fold
            .train_indices
            .iter()
            .copied()
            .filter(|&r| outcome_targets.is_none_or(|t| t[r].is_some()))
            .collect();
        let train_frame = frame.select_rows(&train_rows);
        let train_column = train_frame.require_column(origin_name)?;
        let train_targets = outcome_targets.map(|t| select_targets(t, &train_rows));

        let fold_encoder = fit_kind(
            kind,
            train_column,
            origin_name,
            train_targets.as_deref(),
            outcome_is_numeric,
            parameters,
        )
        .into_iter()
        .next();

        // A fold whose training slice lacks enough distinct levels to fit
        // this kind falls back to the deployment encoder for that fold's
        // rows, treating them the way a novel level would be treated.
        let encoder_for_fold = fold_encoder.as_ref().unwrap_or(&deployment_encoder);
        for &row in &fold.app_indices {
            values[row] = encoder_for_fold.apply(column, row);
        }
    }

    let fallback = fallback_mean(&deployment_encoder);
    for r in 0..row_count {
        let outcome_missing = outcome_targets.is_some_and(|t| t[r].is_none());
        if values[r].is_nan() || outcome_missing {
            values[r] = fallback;
        }
    }

    Ok(Some((derived_name, values, deployment_encoder)))
}

/// Whether `kind` must be fold-split for this fit: the encoder's own
/// `needs_split` flag, or `force_split` promoting an otherwise in-sample
/// kind. Indicator is excluded from forced promotion even when
/// `force_split` is set. Its qualifying level set can differ per fold,
/// which would break the fixed cross-frame schema fold-splitting assumes
/// for every other kind.
fn force_cross_validated(kind: EncoderKind, parameters: &Parameters) -> bool {
    let inherently_split = matches!(
        kind,
        EncoderKind::Prevalence | EncoderKind::Impact | EncoderKind::Deviation
    );
    let forced = parameters.force_split && matches!(kind, EncoderKind::Clean | EncoderKind::IsBad);
    inherently_split || forced
}

/// Encoder kinds instantiable for `column` under `outcome`, filtered by
/// `code_restriction` and ordered by `kind_priority`.
fn candidate_kinds(column: &Column, outcome: &OutcomeSpec, parameters: &Parameters) -> Vec<EncoderKind> {
    let mut kinds = if column.is_numeric() {
        vec![EncoderKind::Clean, EncoderKind::IsBad]
    } else {
        let mut kinds = vec![EncoderKind::IsBad, EncoderKind::Prevalence, EncoderKind::Indicator];
        if outcome.is_binomial() || outcome.is_numeric() {
            kinds.push(EncoderKind::Impact);
        }
        if outcome.is_numeric() {
            kinds.push(EncoderKind::Deviation);
        }
        kinds
    };

    kinds.retain(|k| parameters.allows(*k));
    kinds.sort_by_key(|k| kind_priority(*k));
    kinds
}

/// Fit one kind against a fixed row subset (already filtered to rows with
/// a present outcome). Returns zero, one (most kinds), or many (indicator)
/// encoders.
fn fit_kind(
    kind: EncoderKind,
    column: &Column,
    origin: &str,
    targets: Option<&[Option<f64>]>,
    outcome_is_numeric: bool,
    parameters: &Parameters,
) -> Vec<Encoder> {
    match kind {
        EncoderKind::Clean => fit_clean(
            column,
            &format!("{origin}_clean"),
            parameters.do_collar,
            parameters.collar_prob,
            parameters.missingness_imputation,
        )
        .into_iter()
        .collect(),
        EncoderKind::IsBad => fit_is_bad(column, &format!("{origin}_is_bad")).into_iter().collect(),
        EncoderKind::Indicator => fit_indicators(column, parameters.min_fraction),
        EncoderKind::Prevalence => fit_prevalence(column, &format!("{origin}_prevalence"))
            .into_iter()
            .collect(),
        EncoderKind::Impact => {
            let Some(targets) = targets else { return Vec::new() };
            let derived = format!("{origin}_impact");
            if outcome_is_numeric {
                fit_impact_numeric(column, targets, &derived, parameters.sm_factor, parameters.rare_count)
                    .into_iter()
                    .collect()
            } else {
                fit_impact_binomial(
                    column,
                    targets,
                    &derived,
                    parameters.sm_factor,
                    parameters.rare_count,
                    parameters.cat_scaling,
                )
                .into_iter()
                .collect()
            }
        }
        EncoderKind::Deviation => {
            let Some(targets) = targets else { return Vec::new() };
            fit_deviation(column, targets, &format!("{origin}_deviation")).into_iter().collect()
        }
    }
}

fn level_sort_key(encoder: &Encoder) -> String {
    match encoder {
        Encoder::Indicator { level, .. } => level.clone(),
        _ => String::new(),
    }
}

fn non_missing_outcome_rows(row_count: usize, outcome_targets: Option<&[Option<f64>]>) -> Vec<usize> {
    match outcome_targets {
        None => (0..row_count).collect(),
        Some(targets) => (0..row_count).filter(|&r| targets[r].is_some()).collect(),
    }
}

fn select_targets(targets: &[Option<f64>], rows: &[usize]) -> Vec<Option<f64>> {
    rows.iter().map(|&r| targets[r]).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::NullProgressReporter;
    use crate::split::partition_into_folds;

    fn binomial_frame() -> (Frame, Vec<Option<f64>>) {
        let n = 60;
        let cat: Vec<Option<String>> = (0..n)
            .map(|i| Some(if i % 3 == 0 { "a".to_string() } else { "b".to_string() }))
            .collect();
        let num: Vec<Option<f64>> = (0..n).map(|i| if i % 10 == 0 { None } else { Some(i as f64) }).collect();
        let frame = Frame::new(vec![Column::categorical("c", cat), Column::numeric("x", num)]).unwrap();
        let targets: Vec<Option<f64>> = (0..n).map(|i| Some(if i % 3 == 0 { 1.0 } else { 0.0 })).collect();
        (frame, targets)
    }

    #[test]
    fn cross_frame_has_no_non_finite_cells() {
        let (frame, targets) = binomial_frame();
        let folds = partition_into_folds(&(0..frame.row_count()).collect::<Vec<_>>(), 3);
        let outcome = OutcomeSpec::Binomial {
            column: "c".into(),
            positive_value: "a".into(),
        };
        let parameters = Parameters::default();
        let output = run(
            &frame,
            &outcome,
            &["c".to_string(), "x".to_string()],
            &folds,
            Some(&targets),
            &parameters,
            &CancellationToken::new(),
            &NullProgressReporter,
        )
        .unwrap();

        for column in output.cross_frame.columns() {
            for row in 0..column.len() {
                assert!(column.numeric_value(row).is_some(), "non-finite cell in {}", column.name);
            }
        }
    }

    #[test]
    fn entirely_missing_column_is_suppressed_with_warning() {
        let frame = Frame::new(vec![Column::numeric("x", vec![None, None, None])]).unwrap();
        let folds = partition_into_folds(&(0..3).collect::<Vec<_>>(), 3);
        let outcome = OutcomeSpec::Unsupervised;
        let parameters = Parameters::default();
        let output = run(
            &frame,
            &outcome,
            &["x".to_string()],
            &folds,
            None,
            &parameters,
            &CancellationToken::new(),
            &NullProgressReporter,
        )
        .unwrap();

        assert!(output.encoders.is_empty());
        assert!(!output.warnings.is_empty());
    }

    #[test]
    fn single_level_categorical_yields_no_indicator_or_impact() {
        let n = 20;
        let cat: Vec<Option<String>> = vec![Some("only".to_string()); n];
        let frame = Frame::new(vec![Column::categorical("c", cat)]).unwrap();
        let targets: Vec<Option<f64>> = (0..n).map(|i| Some((i % 2) as f64)).collect();
        let folds = partition_into_folds(&(0..n).collect::<Vec<_>>(), 2);
        let outcome = OutcomeSpec::Binomial {
            column: "y".into(),
            positive_value: "1".into(),
        };
        let parameters = Parameters::default();
        let output = run(
            &frame,
            &outcome,
            &["c".to_string()],
            &folds,
            Some(&targets),
            &parameters,
            &CancellationToken::new(),
            &NullProgressReporter,
        )
        .unwrap();

        assert!(output.encoders.iter().all(|e| !matches!(e, Encoder::Indicator { .. })));
        assert!(output.encoders.iter().all(|e| !matches!(e, Encoder::Impact { .. })));
    }

    #[test]
    fn code_restriction_limits_emitted_encoder_kinds() {
        let (frame, targets) = binomial_frame();
        let folds = partition_into_folds(&(0..frame.row_count()).collect::<Vec<_>>(), 3);
        let outcome = OutcomeSpec::Binomial {
            column: "c".into(),
            positive_value: "a".into(),
        };
        let parameters = Parameters::builder()
            .code_restriction([EncoderKind::Clean, EncoderKind::IsBad, EncoderKind::Indicator])
            .build()
            .unwrap();
        let output = run(
            &frame,
            &outcome,
            &["c".to_string(), "x".to_string()],
            &folds,
            Some(&targets),
            &parameters,
            &CancellationToken::new(),
            &NullProgressReporter,
        )
        .unwrap();

        assert!(output.encoders.iter().all(|e| !matches!(
            e,
            Encoder::Impact { .. } | Encoder::Prevalence { .. } | Encoder::Deviation { .. }
        )));
    }

    #[test]
    fn cancellation_is_observed_before_completion() {
        let (frame, targets) = binomial_frame();
        let folds = partition_into_folds(&(0..frame.row_count()).collect::<Vec<_>>(), 3);
        let outcome = OutcomeSpec::Binomial {
            column: "c".into(),
            positive_value: "a".into(),
        };
        let parameters = Parameters::default();
        let cancellation = CancellationToken::new();
        cancellation.cancel();
        let result = run(
            &frame,
            &outcome,
            &["c".to_string(), "x".to_string()],
            &folds,
            Some(&targets),
            &parameters,
            &cancellation,
            &NullProgressReporter,
        );
        assert!(result.is_err());
    }
}
