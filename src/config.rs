//! Fit parameters for the variable treatment pipeline.
//!
//! This module provides the recognized-parameter table using the same
//! builder pattern as the rest of the crate's configuration surface.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::error::VartreatError;

/// Which encoder kinds may be instantiated during a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    Clean,
    IsBad,
    Indicator,
    Prevalence,
    Impact,
    Deviation,
}

/// Strategy for imputing missing numeric values ahead of encoding.
///
/// Only the statistical strategies are supported; a caller-supplied
/// imputer is passed separately and is not representable in a
/// serializable parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingnessImputation {
    #[default]
    Mean,
    Median,
}

/// Fit-time parameters controlling encoder instantiation, smoothing, and
/// the cross-fit driver.
///
/// Use [`Parameters::builder()`] to construct one with the fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use vartreat::config::Parameters;
///
/// let params = Parameters::builder()
///     .n_cross(5)
///     .sm_factor(2.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parameters {
    /// Threshold prevalence for indicator emission.
    /// Default: 0.02
    pub min_fraction: f64,

    /// Smoothing in impact/deviation means.
    /// Default: 0.0
    pub sm_factor: f64,

    /// Category counts at or below this are merged into `_rare_`.
    /// Default: 0
    pub rare_count: usize,

    /// Levels with significance above this are suppressed.
    /// `None` disables the filter.
    /// Default: None
    pub rare_sig: Option<f64>,

    /// Numeric tail-clipping probability, applied when `do_collar` is true.
    /// Default: 0.0
    pub collar_prob: f64,

    /// Enable numeric winsorization at fit-time quantiles.
    /// Default: false
    pub do_collar: bool,

    /// Restrict instantiation to this set of encoder kinds.
    /// `None` permits all kinds.
    /// Default: None
    pub code_restriction: Option<HashSet<EncoderKind>>,

    /// Fold count for the cross-fit driver.
    /// Default: 3
    pub n_cross: usize,

    /// Rescale numeric derived columns to outcome units.
    /// Default: false
    pub scale: bool,

    /// Impact in link space (true) vs identity (false). Binomial only;
    /// rejected for numeric outcomes at validation time.
    /// Default: true
    pub cat_scaling: bool,

    /// Strategy for imputing missing numeric values ahead of encoding.
    /// Default: Mean
    pub missingness_imputation: MissingnessImputation,

    /// Force cross-validated significance scoring on all encoders, even
    /// outcome-free ones.
    /// Default: false
    pub force_split: bool,

    /// Random seed driving the split planner and every derived sub-stream.
    /// Default: 0
    pub seed: u64,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            min_fraction: 0.02,
            sm_factor: 0.0,
            rare_count: 0,
            rare_sig: None,
            collar_prob: 0.0,
            do_collar: false,
            code_restriction: None,
            n_cross: 3,
            scale: false,
            cat_scaling: true,
            missingness_imputation: MissingnessImputation::default(),
            force_split: false,
            seed: 0,
        }
    }
}

impl Parameters {
    /// Create a new parameters builder.
    pub fn builder() -> ParametersBuilder {
        ParametersBuilder::default()
    }

    /// Validate the parameters, given whether the outcome is numeric (the
    /// only combination `cat_scaling` is rejected under).
    pub fn validate(&self, outcome_is_numeric: bool) -> Result<(), ConfigValidationError> {
        if !(0.0..=1.0).contains(&self.min_fraction) {
            return Err(ConfigValidationError::InvalidFraction {
                field: "min_fraction",
                value: self.min_fraction,
            });
        }

        if self.sm_factor < 0.0 {
            return Err(ConfigValidationError::Negative {
                field: "sm_factor",
                value: self.sm_factor,
            });
        }

        if !(0.0..=1.0).contains(&self.collar_prob) {
            return Err(ConfigValidationError::InvalidFraction {
                field: "collar_prob",
                value: self.collar_prob,
            });
        }

        if let Some(rare_sig) = self.rare_sig
            && !(0.0..=1.0).contains(&rare_sig)
        {
            return Err(ConfigValidationError::InvalidFraction {
                field: "rare_sig",
                value: rare_sig,
            });
        }

        if self.n_cross < 2 {
            return Err(ConfigValidationError::InvalidFoldCount(self.n_cross));
        }

        if self.cat_scaling && outcome_is_numeric {
            return Err(ConfigValidationError::CatScalingRequiresBinomial);
        }

        Ok(())
    }

    /// Whether `kind` is permitted under `code_restriction`.
    pub fn allows(&self, kind: EncoderKind) -> bool {
        match &self.code_restriction {
            None => true,
            Some(allowed) => allowed.contains(&kind),
        }
    }
}

/// Errors that can occur during parameter validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("invalid fraction for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidFraction { field: &'static str, value: f64 },

    #[error("'{field}' must be non-negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("invalid fold count: {0} (must be at least 2)")]
    InvalidFoldCount(usize),

    #[error("cat_scaling is only meaningful for binomial outcomes; reject it for numeric ones")]
    CatScalingRequiresBinomial,
}

impl From<ConfigValidationError> for VartreatError {
    fn from(err: ConfigValidationError) -> Self {
        VartreatError::InvalidParameter(err.to_string())
    }
}

/// Builder for [`Parameters`] with fluent API.
#[derive(Debug, Default)]
pub struct ParametersBuilder {
    min_fraction: Option<f64>,
    sm_factor: Option<f64>,
    rare_count: Option<usize>,
    rare_sig: Option<f64>,
    collar_prob: Option<f64>,
    do_collar: Option<bool>,
    code_restriction: Option<HashSet<EncoderKind>>,
    n_cross: Option<usize>,
    scale: Option<bool>,
    cat_scaling: Option<bool>,
    missingness_imputation: Option<MissingnessImputation>,
    force_split: Option<bool>,
    seed: Option<u64>,
}

impl ParametersBuilder {
    /// Set the threshold prevalence for indicator emission.
    pub fn min_fraction(mut self, value: f64) -> Self {
        self.min_fraction = Some(value);
        self
    }

    /// Set the smoothing factor for impact/deviation means.
    pub fn sm_factor(mut self, value: f64) -> Self {
        self.sm_factor = Some(value);
        self
    }

    /// Set the rare-level pooling threshold.
    pub fn rare_count(mut self, value: usize) -> Self {
        self.rare_count = Some(value);
        self
    }

    /// Set the significance-suppression threshold.
    pub fn rare_sig(mut self, value: f64) -> Self {
        self.rare_sig = Some(value);
        self
    }

    /// Set the numeric tail-clipping probability.
    pub fn collar_prob(mut self, value: f64) -> Self {
        self.collar_prob = Some(value);
        self
    }

    /// Enable or disable numeric winsorization.
    pub fn do_collar(mut self, value: bool) -> Self {
        self.do_collar = Some(value);
        self
    }

    /// Restrict instantiation to the given encoder kinds.
    pub fn code_restriction(mut self, kinds: impl IntoIterator<Item = EncoderKind>) -> Self {
        self.code_restriction = Some(kinds.into_iter().collect());
        self
    }

    /// Set the cross-fit fold count.
    pub fn n_cross(mut self, value: usize) -> Self {
        self.n_cross = Some(value);
        self
    }

    /// Enable or disable rescaling numeric derived columns to outcome units.
    pub fn scale(mut self, value: bool) -> Self {
        self.scale = Some(value);
        self
    }

    /// Enable or disable link-space impact coding.
    pub fn cat_scaling(mut self, value: bool) -> Self {
        self.cat_scaling = Some(value);
        self
    }

    /// Set the missing-value imputation strategy.
    pub fn missingness_imputation(mut self, value: MissingnessImputation) -> Self {
        self.missingness_imputation = Some(value);
        self
    }

    /// Force cross-validated significance scoring on all encoders.
    pub fn force_split(mut self, value: bool) -> Self {
        self.force_split = Some(value);
        self
    }

    /// Set the random seed driving the split planner and sub-streams.
    pub fn seed(mut self, value: u64) -> Self {
        self.seed = Some(value);
        self
    }

    /// Build the parameters, validating under a permissive binomial-outcome
    /// assumption. `TreatmentPlan::fit` re-validates with the real outcome
    /// once it is known, so `cat_scaling` left at its default is caught
    /// there if the outcome turns out to be numeric.
    pub fn build(self) -> Result<Parameters, ConfigValidationError> {
        let params = Parameters {
            min_fraction: self.min_fraction.unwrap_or(0.02),
            sm_factor: self.sm_factor.unwrap_or(0.0),
            rare_count: self.rare_count.unwrap_or(0),
            rare_sig: self.rare_sig,
            collar_prob: self.collar_prob.unwrap_or(0.0),
            do_collar: self.do_collar.unwrap_or(false),
            code_restriction: self.code_restriction,
            n_cross: self.n_cross.unwrap_or(3),
            scale: self.scale.unwrap_or(false),
            cat_scaling: self.cat_scaling.unwrap_or(true),
            missingness_imputation: self.missingness_imputation.unwrap_or_default(),
            force_split: self.force_split.unwrap_or(false),
            seed: self.seed.unwrap_or(0),
        };

        params.validate(false)?;
        Ok(params)
    }
}
