//! `deviation` (categorical origin, numeric outcome only): per-level
//! outcome standard deviation.

use std::collections::HashMap;

use crate::frame::Column;
use crate::stats::std_dev;

use super::{Encoder, MISSING_LEVEL};

/// Fit a deviation encoder from `column` against numeric `outcome`, using
/// only rows where the outcome is present. Returns `None` if fewer than two
/// levels have an outcome-bearing row.
pub fn fit_deviation(column: &Column, outcome: &[Option<f64>], derived_name: &str) -> Option<Encoder> {
    let n = column.len().min(outcome.len());

    let mut by_level: HashMap<String, Vec<f64>> = HashMap::new();
    let mut pooled_values = Vec::new();
    for row in 0..n {
        let Some(y) = outcome[row] else { continue };
        let level = column
            .categorical_value(row)
            .map(str::to_string)
            .unwrap_or_else(|| MISSING_LEVEL.to_string());
        by_level.entry(level).or_default().push(y);
        pooled_values.push(y);
    }

    if by_level.len() <= 1 {
        return None;
    }

    let pooled = std_dev(&pooled_values);
    let per_level: HashMap<String, f64> = by_level
        .into_iter()
        .map(|(level, values)| (level, std_dev(&values)))
        .collect();

    Some(Encoder::Deviation {
        origin: column.name.clone(),
        derived: derived_name.to_string(),
        per_level,
        pooled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_level_std_dev_reflects_spread() {
        let col = Column::categorical(
            "c",
            vec![Some("a".into()), Some("a".into()), Some("b".into()), Some("b".into())],
        );
        let outcome = vec![Some(1.0), Some(1.0), Some(1.0), Some(9.0)];
        let encoder = fit_deviation(&col, &outcome, "c_deviation").unwrap();
        assert_eq!(encoder.apply(&col, 0), 0.0);
        assert!(encoder.apply(&col, 2) > 0.0);
    }

    #[test]
    fn novel_level_falls_back_to_pooled() {
        let col = Column::categorical(
            "c",
            vec![Some("a".into()), Some("a".into()), Some("b".into()), Some("b".into())],
        );
        let outcome = vec![Some(1.0), Some(3.0), Some(5.0), Some(9.0)];
        let encoder = fit_deviation(&col, &outcome, "c_deviation").unwrap();
        let Encoder::Deviation { pooled, .. } = &encoder else {
            unreachable!()
        };
        let novel = Column::categorical("c", vec![Some("z".into())]);
        assert_eq!(encoder.apply(&novel, 0), *pooled);
    }
}
