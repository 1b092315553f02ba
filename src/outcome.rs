//! Outcome descriptors (§3): what the treatment plan is being fit against.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VartreatError};
use crate::frame::Frame;

/// What kind of target the plan is being fit to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutcomeSpec {
    /// A real-valued column; encoders treat its centered values as
    /// regression targets.
    Numeric { column: String },
    /// An arbitrary column plus a distinguished positive value; encoders
    /// treat `column == positive_value` as a 0/1 target.
    Binomial {
        column: String,
        positive_value: String,
    },
    /// An arbitrary column whose distinct non-missing values define the
    /// class set; the target is expanded per-class.
    Multinomial { column: String },
    /// No outcome; only outcome-free encoders are instantiated.
    Unsupervised,
}

impl OutcomeSpec {
    pub fn column_name(&self) -> Option<&str> {
        match self {
            Self::Numeric { column } => Some(column),
            Self::Binomial { column, .. } => Some(column),
            Self::Multinomial { column } => Some(column),
            Self::Unsupervised => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Self::Numeric { .. })
    }

    pub fn is_binomial(&self) -> bool {
        matches!(self, Self::Binomial { .. })
    }

    pub fn is_multinomial(&self) -> bool {
        matches!(self, Self::Multinomial { .. })
    }

    pub fn is_unsupervised(&self) -> bool {
        matches!(self, Self::Unsupervised)
    }

    /// Extract the numeric outcome vector, `None` for rows with a missing
    /// outcome. Fails if the column is absent or degenerate (constant, or
    /// for binomial, the positive value never occurs).
    pub fn numeric_targets(&self, frame: &Frame) -> Result<Vec<Option<f64>>> {
        match self {
            Self::Numeric { column } => {
                let col = frame.require_column(column)?;
                let values: Vec<Option<f64>> =
                    (0..col.len()).map(|r| col.numeric_value(r)).collect();
                ensure_non_degenerate(&values, column)?;
                Ok(values)
            }
            Self::Binomial {
                column,
                positive_value,
            } => {
                let col = frame.require_column(column)?;
                let mut saw_positive = false;
                let values: Vec<Option<f64>> = (0..col.len())
                    .map(|r| {
                        let label = categorical_label(col, r)?;
                        let is_positive = label == *positive_value;
                        saw_positive |= is_positive;
                        Some(if is_positive { 1.0 } else { 0.0 })
                    })
                    .collect();
                if !saw_positive {
                    return Err(VartreatError::DegenerateOutcome(format!(
                        "positive_value '{positive_value}' never occurs in column '{column}'"
                    )));
                }
                ensure_non_degenerate(&values, column)?;
                Ok(values)
            }
            Self::Multinomial { column } => Err(VartreatError::InvalidParameter(format!(
                "column '{column}' is multinomial; use class_targets for a specific class"
            ))),
            Self::Unsupervised => Err(VartreatError::InvalidParameter(
                "unsupervised outcome has no numeric targets".to_string(),
            )),
        }
    }

    /// Distinct non-missing class labels for a multinomial outcome, in
    /// first-seen order.
    pub fn class_labels(&self, frame: &Frame) -> Result<Vec<String>> {
        let Self::Multinomial { column } = self else {
            return Err(VartreatError::InvalidParameter(
                "class_labels is only defined for multinomial outcomes".to_string(),
            ));
        };
        let col = frame.require_column(column)?;
        let mut seen = Vec::new();
        for r in 0..col.len() {
            if let Some(label) = categorical_label(col, r)
                && !seen.contains(&label)
            {
                seen.push(label);
            }
        }
        if seen.len() < 2 {
            return Err(VartreatError::DegenerateOutcome(format!(
                "column '{column}' has fewer than 2 distinct classes"
            )));
        }
        Ok(seen)
    }

    /// Build the binomial sub-problem `outcome == class` for multinomial
    /// fan-out.
    pub fn as_class_binomial(&self, class: &str) -> Self {
        match self {
            Self::Multinomial { column } => Self::Binomial {
                column: column.clone(),
                positive_value: class.to_string(),
            },
            other => other.clone(),
        }
    }
}

/// Render a column cell as a comparable label string, whether the column is
/// categorical or numeric (a numeric outcome column compared by string
/// representation is legal input for a binomial `positive_value`, since the
/// Frame's outcome column type is not otherwise constrained).
fn categorical_label(col: &crate::frame::Column, row: usize) -> Option<String> {
    if let Some(s) = col.categorical_value(row) {
        return Some(s.to_string());
    }
    col.numeric_value(row).map(|x| {
        if x.fract() == 0.0 {
            format!("{}", x as i64)
        } else {
            x.to_string()
        }
    })
}

fn ensure_non_degenerate(values: &[Option<f64>], column: &str) -> Result<()> {
    let mut seen = None;
    for v in values.iter().flatten() {
        match seen {
            None => seen = Some(*v),
            Some(first) if (first - v).abs() > f64::EPSILON => return Ok(()),
            _ => {}
        }
    }
    Err(VartreatError::DegenerateOutcome(format!(
        "column '{column}' has zero variance"
    )))
}
