//! `is_bad`: a 0/1 missingness flag, skipped when the column has no
//! missing values.

use crate::frame::Column;

use super::Encoder;

/// Fit an `is_bad` encoder, or `None` if `column` has zero missing cells
/// (the indicator would be constant).
pub fn fit_is_bad(column: &Column, derived_name: &str) -> Option<Encoder> {
    if column.missing_count() == 0 {
        return None;
    }
    Some(Encoder::IsBad {
        origin: column.name.clone(),
        derived: derived_name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_missing_cells() {
        let col = Column::numeric("x", vec![Some(1.0), None, Some(3.0)]);
        let encoder = fit_is_bad(&col, "x_is_bad").unwrap();
        assert_eq!(encoder.apply(&col, 1), 1.0);
        assert_eq!(encoder.apply(&col, 0), 0.0);
    }

    #[test]
    fn skipped_when_no_missing_values() {
        let col = Column::numeric("x", vec![Some(1.0), Some(2.0)]);
        assert!(fit_is_bad(&col, "x_is_bad").is_none());
    }

    #[test]
    fn flags_missing_categorical_cells() {
        let col = Column::categorical("c", vec![Some("a".into()), None]);
        let encoder = fit_is_bad(&col, "c_is_bad").unwrap();
        assert_eq!(encoder.apply(&col, 1), 1.0);
        assert_eq!(encoder.apply(&col, 0), 0.0);
    }
}
