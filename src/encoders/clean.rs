//! `clean` (numeric origin): fills non-finite cells with the training
//! mean, optionally winsorizing finite cells at fit-time quantiles first.

use crate::config::MissingnessImputation;
use crate::frame::Column;
use crate::stats::{mean, median, quantile};

use super::Encoder;

/// Fit a `clean` encoder on `column`. Returns `None` if the column has no
/// finite values to average (handled upstream as "entirely missing": all
/// encoders for it are suppressed).
///
/// `imputation` selects whether missing/non-finite cells are filled with
/// the training mean or median at `apply` time. When `do_collar` is set,
/// the fitted bounds are the `collar_prob` and `1 - collar_prob` quantiles
/// of the training values; `apply` clamps finite cells into that range
/// before emission.
pub fn fit_clean(
    column: &Column,
    derived_name: &str,
    do_collar: bool,
    collar_prob: f64,
    imputation: MissingnessImputation,
) -> Option<Encoder> {
    let values = column.numeric_values();
    if values.is_empty() {
        return None;
    }

    let collar = if do_collar && collar_prob > 0.0 {
        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
        let lo = quantile(&sorted, collar_prob);
        let hi = quantile(&sorted, 1.0 - collar_prob);
        Some((lo, hi))
    } else {
        None
    };

    let fill_value = match imputation {
        MissingnessImputation::Mean => mean(&values),
        MissingnessImputation::Median => median(&values),
    };

    Some(Encoder::Clean {
        origin: column.name.clone(),
        derived: derived_name.to_string(),
        fill_value,
        collar,
    })
}
