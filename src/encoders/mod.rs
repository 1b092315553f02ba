//! Column encoders (§4.2): per-column fittable transforms, each emitting
//! one or more derived numeric columns.
//!
//! `Encoder` is a sum type rather than a trait object, per the Design Note
//! in §9 ("dynamic dispatch on encoder kind ... represented as a sum
//! type"). The cross-fit driver consumes it through `apply` alone; it never
//! inspects the variant.

mod clean;
mod deviation;
mod impact;
mod indicator;
mod is_bad;
mod prevalence;

pub use clean::fit_clean;
pub use deviation::fit_deviation;
pub use impact::{fit_impact_binomial, fit_impact_numeric};
pub use indicator::fit_indicators;
pub use is_bad::fit_is_bad;
pub use prevalence::fit_prevalence;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::config::EncoderKind as ConfigEncoderKind;
use crate::frame::Column;

/// A fitted, immutable encoder. Each variant carries exactly the
/// fitted-parameter fields its kind needs.
///
/// Serializes with an explicit `kind` tag so a persisted plan's encoder
/// list matches the layout in §6 ("each encoder carries its kind tag plus
/// kind-specific parameter map"); an unrecognized tag fails deserialization
/// with a `serde` "unknown variant" error, which `TreatmentPlan::from_json`
/// maps to `UnsupportedEncoderVersion`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Encoder {
    Clean {
        origin: String,
        derived: String,
        /// Training-set mean or median, per `missingness_imputation`, used
        /// to fill non-finite cells at `apply` time.
        fill_value: f64,
        /// Fit-time `(low, high)` winsorization bounds, set only when
        /// `do_collar` was enabled.
        collar: Option<(f64, f64)>,
    },
    IsBad {
        origin: String,
        derived: String,
    },
    Indicator {
        origin: String,
        derived: String,
        level: String,
    },
    Prevalence {
        origin: String,
        derived: String,
        prevalence: HashMap<String, f64>,
        novel_default: f64,
    },
    Impact {
        origin: String,
        derived: String,
        per_level: HashMap<String, f64>,
        novel_value: f64,
        /// Cross-validated estimation complexity, tracked on the score row.
        extra_model_degrees: usize,
    },
    Deviation {
        origin: String,
        derived: String,
        per_level: HashMap<String, f64>,
        pooled: f64,
    },
}

impl Encoder {
    pub fn kind(&self) -> ConfigEncoderKind {
        match self {
            Self::Clean { .. } => ConfigEncoderKind::Clean,
            Self::IsBad { .. } => ConfigEncoderKind::IsBad,
            Self::Indicator { .. } => ConfigEncoderKind::Indicator,
            Self::Prevalence { .. } => ConfigEncoderKind::Prevalence,
            Self::Impact { .. } => ConfigEncoderKind::Impact,
            Self::Deviation { .. } => ConfigEncoderKind::Deviation,
        }
    }

    pub fn origin(&self) -> &str {
        match self {
            Self::Clean { origin, .. }
            | Self::IsBad { origin, .. }
            | Self::Indicator { origin, .. }
            | Self::Prevalence { origin, .. }
            | Self::Impact { origin, .. }
            | Self::Deviation { origin, .. } => origin,
        }
    }

    pub fn derived_name(&self) -> &str {
        match self {
            Self::Clean { derived, .. }
            | Self::IsBad { derived, .. }
            | Self::Indicator { derived, .. }
            | Self::Prevalence { derived, .. }
            | Self::Impact { derived, .. }
            | Self::Deviation { derived, .. } => derived,
        }
    }

    /// Rename the derived column this encoder emits, keeping its fitted
    /// parameters. Used by the multinomial orchestrator to prefix each
    /// class's impact encoders (`{class}_{origin}_impact`) without refitting.
    pub fn with_derived_name(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        match &mut self {
            Self::Clean { derived, .. }
            | Self::IsBad { derived, .. }
            | Self::Indicator { derived, .. }
            | Self::Prevalence { derived, .. }
            | Self::Impact { derived, .. }
            | Self::Deviation { derived, .. } => *derived = name,
        }
        self
    }

    /// Whether the cross-fit driver must fold-split this encoder to avoid
    /// nested-model bias.
    pub fn needs_split(&self) -> bool {
        matches!(
            self,
            Self::Prevalence { .. } | Self::Impact { .. } | Self::Deviation { .. }
        )
    }

    pub fn extra_model_degrees(&self) -> usize {
        match self {
            Self::Impact {
                extra_model_degrees,
                ..
            } => *extra_model_degrees,
            _ => 0,
        }
    }

    /// Apply the encoder to a single row of `column`, substituting the
    /// fit-time mean of the emitted column whenever the origin cell is
    /// missing or the result would be non-finite.
    pub fn apply(&self, column: &Column, row: usize) -> f64 {
        let value = match self {
            Self::Clean { fill_value, collar, .. } => {
                let raw = column.numeric_value(row).unwrap_or(*fill_value);
                match collar {
                    Some((lo, hi)) => raw.clamp(*lo, *hi),
                    None => raw,
                }
            }
            Self::IsBad { .. } => {
                if column.is_missing(row) {
                    1.0
                } else {
                    0.0
                }
            }
            Self::Indicator { level, .. } => {
                let cell = column.categorical_value(row).unwrap_or("missing");
                if cell == level { 1.0 } else { 0.0 }
            }
            Self::Prevalence {
                prevalence,
                novel_default,
                ..
            } => {
                let level = level_of(column, row);
                prevalence.get(&level).copied().unwrap_or(*novel_default)
            }
            Self::Impact {
                per_level,
                novel_value,
                ..
            } => {
                let level = level_of(column, row);
                per_level.get(&level).copied().unwrap_or(*novel_value)
            }
            Self::Deviation {
                per_level, pooled, ..
            } => {
                let level = level_of(column, row);
                per_level.get(&level).copied().unwrap_or(*pooled)
            }
        };

        if value.is_finite() { value } else { fallback_mean(self) }
    }
}

/// The fit-time mean of an encoder's own emitted column, used both as its
/// internal non-finite fallback and as the cross-fit driver's fill value
/// for rows excluded from the cross-frame (missing outcome, uncovered
/// fold gaps).
pub(crate) fn fallback_mean(encoder: &Encoder) -> f64 {
    match encoder {
        Encoder::Clean { fill_value, .. } => *fill_value,
        Encoder::Impact { per_level, .. } => crate::stats::mean(&per_level.values().copied().collect::<Vec<_>>()),
        Encoder::Deviation { pooled, .. } => *pooled,
        Encoder::Prevalence { novel_default, .. } => *novel_default,
        _ => 0.0,
    }
}

/// The missing sentinel level name used consistently across indicator,
/// prevalence, impact, and deviation encoders.
pub const MISSING_LEVEL: &str = "missing";

pub(crate) fn level_of(column: &Column, row: usize) -> String {
    column
        .categorical_value(row)
        .map(str::to_string)
        .unwrap_or_else(|| MISSING_LEVEL.to_string())
}

/// Stable ordering priority used to sort derived columns: `(origin_index,
/// kind_priority, level_lex_order)`.
pub fn kind_priority(kind: ConfigEncoderKind) -> u8 {
    match kind {
        ConfigEncoderKind::Clean => 0,
        ConfigEncoderKind::IsBad => 1,
        ConfigEncoderKind::Prevalence => 2,
        ConfigEncoderKind::Impact => 3,
        ConfigEncoderKind::Indicator => 4,
        ConfigEncoderKind::Deviation => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn needs_split_matches_outcome_dependent_kinds() {
        let clean = Encoder::Clean {
            origin: "x".into(),
            derived: "x_clean".into(),
            fill_value: 0.0,
            collar: None,
        };
        let impact = Encoder::Impact {
            origin: "c".into(),
            derived: "c_impact".into(),
            per_level: HashMap::new(),
            novel_value: 0.0,
            extra_model_degrees: 5,
        };
        assert!(!clean.needs_split());
        assert!(impact.needs_split());
        assert_eq!(impact.extra_model_degrees(), 5);
    }

    #[test]
    fn kind_priority_matches_spec_order() {
        assert!(kind_priority(ConfigEncoderKind::Clean) < kind_priority(ConfigEncoderKind::IsBad));
        assert!(kind_priority(ConfigEncoderKind::IsBad) < kind_priority(ConfigEncoderKind::Prevalence));
        assert!(kind_priority(ConfigEncoderKind::Prevalence) < kind_priority(ConfigEncoderKind::Impact));
        assert!(kind_priority(ConfigEncoderKind::Impact) < kind_priority(ConfigEncoderKind::Indicator));
        assert!(kind_priority(ConfigEncoderKind::Indicator) < kind_priority(ConfigEncoderKind::Deviation));
    }

    #[test]
    fn apply_falls_back_to_mean_on_non_finite() {
        let encoder = Encoder::Clean {
            origin: "x".into(),
            derived: "x_clean".into(),
            fill_value: 3.5,
            collar: None,
        };
        let col = Column::numeric("x", vec![Some(f64::NAN)]);
        assert_eq!(encoder.apply(&col, 0), 3.5);
    }
}
