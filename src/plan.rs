//! Treatment plan (§4.5): the immutable, serializable artifact produced by
//! a fit and replayed at transform time.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Parameters;
use crate::crossfit;
use crate::encoders::Encoder;
use crate::error::{Result, VartreatError};
use crate::frame::{Column, Frame};
use crate::outcome::OutcomeSpec;
use crate::pipeline::{CancellationToken, FitProgress, FitStage, NullProgressReporter, ProgressReporter};
use crate::scale;
use crate::scorer::{DerivedColumn, ScoreRow, score_columns};
use crate::split::{SimpleKFold, SplitPlanner, seeded_rng};

/// Bumped whenever the serialized shape of [`TreatmentPlan`] or [`Encoder`]
/// changes in a way that breaks old plans.
pub const PLAN_VERSION: u32 = 1;

/// A frame produced by [`TreatmentPlan::transform`], plus any non-fatal
/// notices raised while producing it.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    pub frame: Frame,
    pub warnings: Vec<String>,
}

/// The fitted, read-only artifact that deploys a column's worth of
/// encoders at transform time. Built once by [`TreatmentPlan::fit`];
/// every field below is set at construction and never mutated after.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreatmentPlan {
    version: u32,
    outcome: OutcomeSpec,
    variables: Vec<String>,
    encoders: Vec<Encoder>,
    /// Per-encoder outcome-unit rescale factor (§4.4 `scale`), parallel to
    /// `encoders`. `1.0` everywhere when `parameters.scale` is false.
    scale_factors: Vec<f64>,
    parameters: Parameters,
    warnings: Vec<String>,
    score_rows: Vec<ScoreRow>,
    fit_fingerprint: (usize, u64),
}

impl TreatmentPlan {
    /// Fit a plan against `frame` under `outcome`, using a `SimpleKFold`
    /// split plan seeded by `parameters.seed`. Rejects `Multinomial`
    /// outcomes: those are handled by `MultinomialPlan::fit`, which needs
    /// the per-class fan-out this single-outcome entry point doesn't do.
    pub fn fit(
        frame: &Frame,
        outcome: OutcomeSpec,
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

    /// Full-control entry point: caller supplies the split planner (the
    /// spec's `split_function` override), a cancellation token, and a
    /// progress reporter.
    #[allow(clippy::too_many_arguments)]
    pub fn fit_with(
        frame: &Frame,
        outcome: OutcomeSpec,
        variables: &[String],
        parameters: Parameters,
        planner: &dyn SplitPlanner,
        cancellation: &CancellationToken,
        progress: &dyn ProgressReporter,
    ) -> Result<(Self, Frame)> {
        if outcome.is_multinomial() {
            return Err(VartreatError::InvalidParameter(
                "multinomial outcomes are fit through MultinomialPlan::fit, not TreatmentPlan::fit".to_string(),
            ));
        }
        parameters.validate(outcome.is_numeric())?;

        let mut rng = seeded_rng(parameters.seed);
        progress.report(FitProgress::new(FitStage::Splitting, "planning folds"));
        let folds = planner.plan(frame, &outcome, &mut rng)?;

        let outcome_targets = if outcome.is_unsupervised() {
            None
        } else {
            Some(outcome.numeric_targets(frame)?)
        };

        let output = crossfit::run(
            frame,
            &outcome,
            variables,
            &folds,
            outcome_targets.as_deref(),
            &parameters,
            cancellation,
            progress,
        )?;

        if output.encoders.is_empty() {
            return Err(VartreatError::EmptyVariableList(
                "every candidate column was suppressed by edge policy or code_restriction".to_string(),
            ));
        }

        progress.report(FitProgress::new(FitStage::Scoring, "scoring derived columns"));
        let score_rows = score_cross_frame(
            &output.encoders,
            &output.cross_frame,
            outcome_targets.as_deref(),
            &outcome,
            None,
            parameters.rare_sig,
        );
        progress.report(FitProgress::complete("fit finished"));

        let scale_factors = scale::factors_for_frame(&output.cross_frame, outcome_targets.as_deref(), parameters.scale);
        let cross_frame = scale::apply_to_frame(&output.cross_frame, &scale_factors)?;

        let plan = TreatmentPlan {
            version: PLAN_VERSION,
            outcome,
            variables: variables.to_vec(),
            encoders: output.encoders,
            scale_factors,
            parameters,
            warnings: output.warnings,
            score_rows,
            fit_fingerprint: frame.content_fingerprint(),
        };

        Ok((plan, cross_frame))
    }

    /// Shorthand for [`fit`](Self::fit). `fit` already returns the plan
    /// directly rather than stashing it on a mutable builder object, so
    /// there is nothing further for this entry point to retain.
    pub fn fit_transform(
        frame: &Frame,
        outcome: OutcomeSpec,
        variables: &[String],
        parameters: Parameters,
    ) -> Result<(Self, Frame)> {
        Self::fit(frame, outcome, variables, parameters)
    }

    /// Apply every stored deployment encoder to `frame`, in derived-column
    /// order. Fails with `SchemaMismatch` if a required origin column is
    /// absent; columns in `frame` that no encoder references are ignored.
    pub fn transform(&self, frame: &Frame) -> Result<TransformOutput> {
        let row_count = frame.row_count();
        let mut seen: Vec<&str> = Vec::new();
        for encoder in &self.encoders {
            let origin = encoder.origin();
            if !seen.contains(&origin) {
                frame.require_column(origin)?;
                seen.push(origin);
            }
        }

        let mut columns = Vec::with_capacity(self.encoders.len());
        for (encoder, &factor) in self.encoders.iter().zip(&self.scale_factors) {
            let origin = frame.require_column(encoder.origin())?;
            let values: Vec<Option<f64>> = (0..row_count).map(|r| Some(encoder.apply(origin, r) * factor)).collect();
            columns.push(Column::numeric(encoder.derived_name(), values));
        }

        let mut warnings = Vec::new();
        if frame.content_fingerprint() == self.fit_fingerprint {
            let message = "SameFrameTransformWarning: transform() was called on the frame used to fit \
                this plan; these are deployment-encoder outputs, not out-of-fold values, and are \
                optimistic for downstream modelling. Use fit_transform's cross_frame for training instead."
                .to_string();
            warn!(target: "vartreat::plan", "{message}");
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
        self.encoders.iter().map(|e| e.derived_name().to_string()).collect()
    }

    /// Plan-level edge-policy notices (e.g. an entirely-missing column was
    /// suppressed). Distinct from `transform`'s per-call `TransformOutput`
    /// warnings.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn outcome(&self) -> &OutcomeSpec {
        &self.outcome
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(VartreatError::from)
    }

    /// Deserialize a persisted plan. An encoder kind tag this build does
    /// not recognize surfaces as `UnsupportedEncoderVersion` rather than a
    /// bare JSON parse error.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|err| {
            let message = err.to_string();
            if message.contains("unknown variant") {
                VartreatError::UnsupportedEncoderVersion(message)
            } else {
                VartreatError::Json(err)
            }
        })
    }
}

/// Score every `(encoder, cross_frame column)` pair positionally: the
/// cross-fit driver pushes both vectors in lockstep, so `encoders[i]`
/// fitted exactly the values in `cross_frame.columns()[i]`. Returns no
/// rows for an unsupervised outcome, since there is no target to score
/// against.
pub(crate) fn score_cross_frame(
    encoders: &[Encoder],
    cross_frame: &Frame,
    targets: Option<&[Option<f64>]>,
    outcome: &OutcomeSpec,
    outcome_level: Option<&str>,
    rare_sig: Option<f64>,
) -> Vec<ScoreRow> {
    let Some(targets) = targets else { return Vec::new() };

    let materialized: Vec<Vec<f64>> = cross_frame.columns().iter().map(Column::numeric_values).collect();
    let derived: Vec<DerivedColumn<'_>> = encoders
        .iter()
        .zip(&materialized)
        .map(|(encoder, values)| DerivedColumn {
            var_name: encoder.derived_name(),
            origin: encoder.origin(),
            kind: encoder.kind(),
            needs_split: encoder.needs_split(),
            extra_model_degrees: encoder.extra_model_degrees(),
            values,
        })
        .collect();

    score_columns(&derived, targets, outcome.is_numeric(), outcome_level, rare_sig)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::Column;

    fn sample_frame(n: usize) -> Frame {
        let cat: Vec<Option<String>> = (0..n)
            .map(|i| Some(if i % 4 == 0 { "a".to_string() } else { "b".to_string() }))
            .collect();
        let y: Vec<Option<String>> = (0..n)
            .map(|i| Some(if i % 4 == 0 { "yes".to_string() } else { "no".to_string() }))
            .collect();
        Frame::new(vec![Column::categorical("c", cat), Column::categorical("y", y)]).unwrap()
    }

    #[test]
    fn fit_transform_yields_cross_frame_matching_row_count() {
        let frame = sample_frame(80);
        let outcome = OutcomeSpec::Binomial {
            column: "y".into(),
            positive_value: "yes".into(),
        };
        let (plan, cross_frame) =
            TreatmentPlan::fit_transform(&frame, outcome, &["c".to_string()], Parameters::default()).unwrap();
        assert_eq!(cross_frame.row_count(), 80);
        assert!(!plan.feature_names().is_empty());
    }

    #[test]
    fn transform_on_training_frame_emits_same_frame_warning() {
        let frame = sample_frame(80);
        let outcome = OutcomeSpec::Binomial {
            column: "y".into(),
            positive_value: "yes".into(),
        };
        let (plan, _) = TreatmentPlan::fit(&frame, outcome, &["c".to_string()], Parameters::default()).unwrap();
        let output = plan.transform(&frame).unwrap();
        assert!(!output.warnings.is_empty());
    }

    #[test]
    fn transform_on_disjoint_frame_has_no_warning() {
        let frame = sample_frame(80);
        let outcome = OutcomeSpec::Binomial {
            column: "y".into(),
            positive_value: "yes".into(),
        };
        let (plan, _) = TreatmentPlan::fit(&frame, outcome, &["c".to_string()], Parameters::default()).unwrap();
        let test_frame = sample_frame(12);
        let output = plan.transform(&test_frame).unwrap();
        assert!(output.warnings.is_empty());
    }

    #[test]
    fn transform_rejects_missing_required_column() {
        let frame = sample_frame(40);
        let outcome = OutcomeSpec::Binomial {
            column: "y".into(),
            positive_value: "yes".into(),
        };
        let (plan, _) = TreatmentPlan::fit(&frame, outcome, &["c".to_string()], Parameters::default()).unwrap();
        let other = Frame::new(vec![Column::numeric("unrelated", vec![Some(1.0); 10])]).unwrap();
        let err = plan.transform(&other).unwrap_err();
        assert_eq!(err.error_code(), "SCHEMA_MISMATCH");
    }

    #[test]
    fn scale_rescales_transform_output_by_the_recovered_slope() {
        let n = 60;
        let x: Vec<Option<f64>> = (0..n).map(|i| Some(i as f64)).collect();
        let y: Vec<Option<f64>> = (0..n).map(|i| Some(3.0 * i as f64 + 1.0)).collect();
        let frame = Frame::new(vec![Column::numeric("x", x), Column::numeric("y", y)]).unwrap();
        let outcome = OutcomeSpec::Numeric { column: "y".into() };

        let plain_params = Parameters::builder().cat_scaling(false).build().unwrap();
        let (plain_plan, _) = TreatmentPlan::fit(&frame, outcome.clone(), &["x".to_string()], plain_params).unwrap();
        let scaled_params = Parameters::builder().cat_scaling(false).scale(true).build().unwrap();
        let (scaled_plan, _) = TreatmentPlan::fit(&frame, outcome, &["x".to_string()], scaled_params).unwrap();

        let held_out = Frame::new(vec![Column::numeric("x", vec![Some(5.0), Some(10.0)])]).unwrap();
        let plain_values = plain_plan.transform(&held_out).unwrap().frame;
        let scaled_values = scaled_plan.transform(&held_out).unwrap().frame;

        for row in 0..2 {
            let plain = plain_values.columns()[0].numeric_value(row).unwrap();
            let scaled = scaled_values.columns()[0].numeric_value(row).unwrap();
            assert!((scaled / plain - 3.0).abs() < 1e-3, "expected scaled ~= 3x plain, got {scaled} vs {plain}");
        }
    }

    #[test]
    fn multinomial_outcome_rejected_by_single_outcome_fit() {
        let frame = sample_frame(40);
        let outcome = OutcomeSpec::Multinomial { column: "y".into() };
        let err = TreatmentPlan::fit(&frame, outcome, &["c".to_string()], Parameters::default()).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_PARAMETER");
    }

    #[test]
    fn json_round_trip_preserves_feature_names() {
        let frame = sample_frame(80);
        let outcome = OutcomeSpec::Binomial {
            column: "y".into(),
            positive_value: "yes".into(),
        };
        let (plan, _) = TreatmentPlan::fit(&frame, outcome, &["c".to_string()], Parameters::default()).unwrap();
        let json = plan.to_json().unwrap();
        let restored = TreatmentPlan::from_json(&json).unwrap();
        assert_eq!(restored.feature_names(), plan.feature_names());
        assert_eq!(restored.version(), PLAN_VERSION);
    }

    #[test]
    fn unknown_encoder_kind_rejects_at_load() {
        let json = r#"{
            "version": 1,
            "outcome": "Unsupervised",
            "variables": ["c"],
            "encoders": [{"kind": "mystery_kind", "origin": "c", "derived": "c_mystery"}],
            "parameters": {
                "min_fraction": 0.02, "sm_factor": 0.0, "rare_count": 0, "rare_sig": null,
                "collar_prob": 0.0, "do_collar": false, "code_restriction": null, "n_cross": 3,
                "scale": false, "cat_scaling": true, "missingness_imputation": "mean",
                "force_split": false, "seed": 0
            },
            "warnings": [],
            "score_rows": [],
            "fit_fingerprint": [0, 0]
        }"#;
        let err = TreatmentPlan::from_json(json).unwrap_err();
        assert_eq!(err.error_code(), "UNSUPPORTED_ENCODER_VERSION");
    }
}
