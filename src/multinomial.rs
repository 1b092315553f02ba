//! Multinomial orchestrator (§4.6): fans a K-class outcome out into a
//! shared outcome-free encoder set plus one binomial impact pass per class.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::{EncoderKind, Parameters};
use crate::crossfit;
use crate::encoders::Encoder;
use crate::error::{Result, VartreatError};
use crate::frame::{Column, Frame};
use crate::outcome::OutcomeSpec;
use crate::pipeline::{CancellationToken, FitProgress, FitStage, NullProgressReporter, ProgressReporter};
use crate::plan::{PLAN_VERSION, TransformOutput, score_cross_frame};
use crate::sanitize::sanitize_level;
use crate::scale;
use crate::scorer::ScoreRow;
use crate::split::{SimpleKFold, SplitPlanner, seeded_rng};

const SHARED_KINDS: [EncoderKind; 4] = [
    EncoderKind::Clean,
    EncoderKind::IsBad,
    EncoderKind::Indicator,
    EncoderKind::Prevalence,
];

/// The fitted artifact for a K-class outcome: one shared outcome-free
/// encoder set plus, per class, a one-vs-rest impact encoder set named
/// with that class's prefix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultinomialPlan {
    version: u32,
    outcome_column: String,
    classes: Vec<String>,
    shared_encoders: Vec<Encoder>,
    /// Identity (`1.0`) throughout: the shared, outcome-free encoders have
    /// no single class target to rescale against.
    shared_scale_factors: Vec<f64>,
    /// Per class, its impact encoders alongside their outcome-unit rescale
    /// factors (§4.4 `scale`), parallel to each other.
    class_impact_encoders: Vec<(String, Vec<Encoder>, Vec<f64>)>,
    parameters: Parameters,
    warnings: Vec<String>,
    score_rows: Vec<ScoreRow>,
    fit_fingerprint: (usize, u64),
}

impl MultinomialPlan {
    pub fn fit(
        frame: &Frame,
        outcome: &OutcomeSpec,
        variables: &[String],
        parameters: Parameters,
    ) -> Result<(Self, Frame)> {
        let planner = SimpleKFold::new(parameters.n_cross);
        Self::fit_with(
            frame,
            outcome,
            variables,
            parameters,
            &planner,
            &CancellationToken::new(),
            &NullProgressReporter,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn fit_with(
        frame: &Frame,
        outcome: &OutcomeSpec,
        variables: &[String],
        parameters: Parameters,
        planner: &dyn SplitPlanner,
        cancellation: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<(Self, Frame)> {
        let OutcomeSpec::Multinomial { column: outcome_column } = outcome else {
            return Err(VartreatError::InvalidParameter(
                "MultinomialPlan::fit requires a Multinomial outcome".to_string(),
            ));
        };
        parameters.validate(false)?;

        let classes = outcome.class_labels(frame)?;

        let mut rng = seeded_rng(parameters.seed);
        progress.report(FitProgress::new(FitStage::Splitting, "planning folds"));
        let folds = planner.plan(frame, outcome, &mut rng)?;

        // Step 1: the shared outcome-free encoder set, built once under an
        // unsupervised pass so no class's target leaks into it.
        let shared_parameters = restrict(&parameters, &SHARED_KINDS);
        let shared_output = crossfit::run(
            frame,
            &OutcomeSpec::Unsupervised,
            variables,
            &folds,
            None,
            &shared_parameters,
            cancellation,
            progress,
        )?;

        let mut cross_columns = shared_output.cross_frame.columns().to_vec();
        let mut score_rows = Vec::new();
        let mut class_impact_encoders = Vec::new();
        let mut warnings = shared_output.warnings;

        // Step 2: one binomial one-vs-rest impact pass per class.
        let impact_parameters = restrict(&parameters, &[EncoderKind::Impact]);

        for class in &classes {
            if cancellation.is_cancelled() {
                return Err(VartreatError::InvalidParameter("fit cancelled by caller".to_string()));
            }
            let binomial = outcome.as_class_binomial(class);
            let targets = binomial.numeric_targets(frame)?;

            let class_output = crossfit::run(
                frame,
                &binomial,
                variables,
                &folds,
                Some(&targets),
                &impact_parameters,
                cancellation,
                progress,
            )?;

            let prefix = sanitize_level(class);
            let renamed: Vec<Encoder> = class_output
                .encoders
                .into_iter()
                .map(|encoder| {
                    let name = format!("{prefix}_{}_impact", encoder.origin());
                    encoder.with_derived_name(name)
                })
                .collect();

            let renamed_columns: Vec<Column> = class_output
                .cross_frame
                .columns()
                .iter()
                .zip(&renamed)
                .map(|(column, encoder)| {
                    let values: Vec<Option<f64>> = (0..column.len()).map(|r| column.numeric_value(r)).collect();
                    Column::numeric(encoder.derived_name(), values)
                })
                .collect();

            let class_frame = Frame::new(renamed_columns)?;

            // Step 3: score the shared encoders and this class's impact
            // encoders together, against this class's one-vs-rest target.
            // The shared encoders' fitted values don't change per class,
            // but their significance legitimately does.
            score_rows.extend(score_cross_frame(
                &shared_output.encoders,
                &shared_output.cross_frame,
                Some(&targets),
                &binomial,
                Some(class),
                parameters.rare_sig,
            ));
            score_rows.extend(score_cross_frame(
                &renamed,
                &class_frame,
                Some(&targets),
                &binomial,
                Some(class),
                parameters.rare_sig,
            ));

            let impact_scale_factors = scale::factors_for_frame(&class_frame, Some(&targets), parameters.scale);
            let scaled_class_frame = scale::apply_to_frame(&class_frame, &impact_scale_factors)?;
            let mut scaled_renamed_columns = scaled_class_frame.columns().to_vec();

            cross_columns.append(&mut scaled_renamed_columns);
            class_impact_encoders.push((class.clone(), renamed, impact_scale_factors));
            warnings.extend(class_output.warnings);
        }

        warnings.sort_unstable();
        warnings.dedup();

        let total_encoders: usize =
            shared_output.encoders.len() + class_impact_encoders.iter().map(|(_, e, _)| e.len()).sum::<usize>();
        if total_encoders == 0 {
            return Err(VartreatError::EmptyVariableList(
                "every candidate column was suppressed by edge policy or code_restriction".to_string(),
            ));
        }

        let cross_frame = Frame::new(cross_columns)?;
        let shared_scale_factors = vec![1.0; shared_output.encoders.len()];

        let plan = MultinomialPlan {
            version: PLAN_VERSION,
            outcome_column: outcome_column.clone(),
            classes,
            shared_encoders: shared_output.encoders,
            shared_scale_factors,
            class_impact_encoders,
            parameters,
            warnings,
            score_rows,
            fit_fingerprint: frame.content_fingerprint(),
        };

        Ok((plan, cross_frame))
    }

    /// Apply the shared encoders once, then each class's impact encoders,
    /// yielding exactly one impact column per `(class, origin)` pair.
    pub fn transform(&self, frame: &Frame) -> Result<TransformOutput> {
        let row_count = frame.row_count();
        let mut seen: Vec<&str> = Vec::new();
        let all_encoders = self
            .shared_encoders
            .iter()
            .chain(self.class_impact_encoders.iter().flat_map(|(_, encoders, _)| encoders.iter()));
        for encoder in all_encoders {
            let origin = encoder.origin();
            if !seen.contains(&origin) {
                frame.require_column(origin)?;
                seen.push(origin);
            }
        }

        let mut columns = Vec::new();
        for (encoder, &factor) in self.shared_encoders.iter().zip(&self.shared_scale_factors) {
            let origin = frame.require_column(encoder.origin())?;
            let values: Vec<Option<f64>> = (0..row_count).map(|r| Some(encoder.apply(origin, r) * factor)).collect();
            columns.push(Column::numeric(encoder.derived_name(), values));
        }
        for (_, encoders, factors) in &self.class_impact_encoders {
            for (encoder, &factor) in encoders.iter().zip(factors) {
                let origin = frame.require_column(encoder.origin())?;
                let values: Vec<Option<f64>> =
                    (0..row_count).map(|r| Some(encoder.apply(origin, r) * factor)).collect();
                columns.push(Column::numeric(encoder.derived_name(), values));
            }
        }

        let mut warnings = Vec::new();
        if frame.content_fingerprint() == self.fit_fingerprint {
            let message = "SameFrameTransformWarning: transform() was called on the frame used to fit \
                this plan; these are deployment-encoder outputs, not out-of-fold values, and are \
                optimistic for downstream modelling. Use fit_transform's cross_frame for training instead."
                .to_string();
            warn!(target: "vartreat::multinomial", "{message}");
            warnings.push(message);
        }

        Ok(TransformOutput {
            frame: Frame::new(columns)?,
            warnings,
        })
    }

    pub fn score_frame(&self) -> &[ScoreRow] {
        &self.score_rows
    }

    pub fn feature_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared_encoders.iter().map(|e| e.derived_name().to_string()).collect();
        for (_, encoders, _) in &self.class_impact_encoders {
            names.extend(encoders.iter().map(|e| e.derived_name().to_string()));
        }
        names
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn outcome_column(&self) -> &str {
        &self.outcome_column
    }
}

/// Narrow `parameters.code_restriction` to the intersection with `allowed`,
/// used to keep the shared pass outcome-free-only and the per-class pass
/// impact-only without fitting encoder kinds twice.
fn restrict(parameters: &Parameters, allowed: &[EncoderKind]) -> Parameters {
    let mut restricted = parameters.clone();
    let allowed_set: HashSet<EncoderKind> = allowed.iter().copied().collect();
    restricted.code_restriction = Some(match &restricted.code_restriction {
        Some(existing) => existing.intersection(&allowed_set).copied().collect(),
        None => allowed_set,
    });
    restricted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Column;

    fn three_class_frame(n: usize) -> Frame {
        let cat: Vec<Option<String>> = (0..n)
            .map(|i| Some(if i % 3 == 0 { "x".to_string() } else { "y".to_string() }))
            .collect();
        let y: Vec<Option<String>> = (0..n)
            .map(|i| {
                Some(
                    match i % 3 {
                        0 => "large",
                        1 => "liminal",
                        _ => "small",
                    }
                    .to_string(),
                )
            })
            .collect();
        Frame::new(vec![Column::categorical("c", cat), Column::categorical("y", y)]).unwrap()
    }

    #[test]
    fn fits_one_impact_column_per_class_origin_pair() {
        let frame = three_class_frame(90);
        let outcome = OutcomeSpec::Multinomial { column: "y".into() };
        let (plan, cross_frame) =
            MultinomialPlan::fit(&frame, &outcome, &["c".to_string()], Parameters::default()).unwrap();

        assert_eq!(plan.classes().len(), 3);
        let impact_columns: usize = cross_frame
            .column_names()
            .filter(|name| name.ends_with("_impact"))
            .count();
        assert_eq!(impact_columns, 3);
    }

    #[test]
    fn score_frame_has_three_times_impact_rows_with_outcome_level() {
        let frame = three_class_frame(90);
        let outcome = OutcomeSpec::Multinomial { column: "y".into() };
        let (plan, _) = MultinomialPlan::fit(&frame, &outcome, &["c".to_string()], Parameters::default()).unwrap();

        let impact_rows: Vec<_> = plan
            .score_frame()
            .iter()
            .filter(|row| row.kind == EncoderKind::Impact)
            .collect();
        assert_eq!(impact_rows.len(), 3);
        assert!(impact_rows.iter().all(|row| row.outcome_level.is_some()));
    }

    #[test]
    fn scale_enabled_still_fits_and_transforms_cleanly() {
        let frame = three_class_frame(90);
        let outcome = OutcomeSpec::Multinomial { column: "y".into() };
        let params = Parameters::builder().scale(true).build().unwrap();
        let (plan, cross_frame) = MultinomialPlan::fit(&frame, &outcome, &["c".to_string()], params).unwrap();
        assert_eq!(cross_frame.row_count(), 90);

        let held_out = three_class_frame(10);
        let output = plan.transform(&held_out).unwrap();
        for column in output.frame.columns() {
            for row in 0..column.len() {
                assert!(column.numeric_value(row).is_some(), "non-finite cell in {}", column.name);
            }
        }
    }

    #[test]
    fn binomial_outcome_rejected_by_multinomial_fit() {
        let frame = three_class_frame(30);
        let outcome = OutcomeSpec::Binomial {
            column: "y".into(),
            positive_value: "large".into(),
        };
        let err = MultinomialPlan::fit(&frame, &outcome, &["c".to_string()], Parameters::default()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn transform_yields_one_impact_column_per_class() {
        let frame = three_class_frame(90);
        let outcome = OutcomeSpec::Multinomial { column: "y".into() };
        let (plan, _) = MultinomialPlan::fit(&frame, &outcome, &["c".to_string()], Parameters::default()).unwrap();

        let held_out = three_class_frame(10);
        let output = plan.transform(&held_out).unwrap();
        let impact_columns: usize = output.frame.column_names().filter(|name| name.ends_with("_impact")).count();
        assert_eq!(impact_columns, 3);
        assert!(output.warnings.is_empty());
    }
}
