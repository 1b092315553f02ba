//! `prevalence` (categorical origin): level -> training prevalence.

use std::collections::HashMap;

use crate::frame::Column;

use super::{Encoder, MISSING_LEVEL};

/// Fit a prevalence encoder. Novel levels at apply-time map to
/// `1 / (n_train + 1)`, matching the fold edge policy in §4.3.
pub fn fit_prevalence(column: &Column, derived_name: &str) -> Option<Encoder> {
    let n = column.len();
    if n == 0 {
        return None;
    }

    let mut counts: HashMap<String, usize> = HashMap::new();
    for row in 0..n {
        let level = column
            .categorical_value(row)
            .map(str::to_string)
            .unwrap_or_else(|| MISSING_LEVEL.to_string());
        *counts.entry(level).or_insert(0) += 1;
    }

    if counts.len() <= 1 {
        return None;
    }

    let prevalence: HashMap<String, f64> = counts
        .into_iter()
        .map(|(level, count)| (level, count as f64 / n as f64))
        .collect();

    Some(Encoder::Prevalence {
        origin: column.name.clone(),
        derived: derived_name.to_string(),
        prevalence,
        novel_default: 1.0 / (n as f64 + 1.0),
    })
}
