//! Outcome-unit rescaling (§4.4 `scale` parameter): multiply each derived
//! numeric column by a single linear factor so a unit move in the column
//! corresponds to roughly a unit move in the outcome.

use crate::error::Result;
use crate::frame::{Column, Frame};
use crate::regression::ols;

/// The OLS slope of `targets` on `values` over their paired present rows,
/// or `1.0` (no rescale) whenever `enabled` is false or the fit is
/// degenerate. Rescaling this way leaves `rsq`/`sig` unchanged, since both
/// are invariant to a linear transform of the predictor; only the
/// derived column's own scale moves.
pub fn factor_for(values: &[f64], targets: &[Option<f64>], enabled: bool) -> f64 {
    if !enabled {
        return 1.0;
    }

    let (x, y): (Vec<f64>, Vec<f64>) = values
        .iter()
        .zip(targets)
        .filter_map(|(&v, t)| t.map(|y| (v, y)))
        .unzip();

    if x.len() < 3 {
        return 1.0;
    }

    let slope = ols(&x, &y, 0).slope;
    if slope.is_finite() && slope.abs() > f64::EPSILON { slope } else { 1.0 }
}

/// [`factor_for`] applied to every column of `frame`, in column order.
pub fn factors_for_frame(frame: &Frame, targets: Option<&[Option<f64>]>, enabled: bool) -> Vec<f64> {
    match targets {
        Some(targets) => frame
            .columns()
            .iter()
            .map(|column| factor_for(&column.numeric_values(), targets, enabled))
            .collect(),
        None => vec![1.0; frame.columns().len()],
    }
}

/// Multiply each column of `frame` by its parallel entry in `factors`,
/// leaving a column untouched when its factor is exactly `1.0`.
pub fn apply_to_frame(frame: &Frame, factors: &[f64]) -> Result<Frame> {
    let scaled: Vec<Column> = frame
        .columns()
        .iter()
        .zip(factors)
        .map(|(column, &factor)| {
            if (factor - 1.0).abs() <= f64::EPSILON {
                column.clone()
            } else {
                let values: Vec<Option<f64>> = column.numeric_values().into_iter().map(|v| Some(v * factor)).collect();
                Column::numeric(column.name.clone(), values)
            }
        })
        .collect();
    Frame::new(scaled)
}
