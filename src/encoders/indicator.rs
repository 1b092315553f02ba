//! `indicator` (categorical origin, per level): one 0/1 column per
//! sufficiently prevalent level.

use crate::frame::Column;
use crate::sanitize::sanitize_levels;

use super::{Encoder, MISSING_LEVEL};

/// Fit one indicator encoder per level whose training-set prevalence is at
/// least `min_fraction`, capped at `floor(1 / min_fraction)` indicators. The
/// missing sentinel counts as its own level. Levels are returned in
/// descending-prevalence order, then first-seen order for ties.
pub fn fit_indicators(column: &Column, min_fraction: f64) -> Vec<Encoder> {
    let n = column.len();
    if n == 0 {
        return Vec::new();
    }

    let mut counts: Vec<(String, usize)> = Vec::new();
    for row in 0..n {
        let level = match column.categorical_value(row) {
            Some(v) => v.to_string(),
            None => MISSING_LEVEL.to_string(),
        };
        if let Some(entry) = counts.iter_mut().find(|(l, _)| l == &level) {
            entry.1 += 1;
        } else {
            counts.push((level, 1));
        }
    }

    if counts.len() <= 1 {
        // A single observed level would make every indicator constant.
        return Vec::new();
    }

    let max_indicators = if min_fraction > 0.0 {
        (1.0 / min_fraction).floor() as usize
    } else {
        counts.len()
    };

    let mut qualifying: Vec<(String, usize)> = counts
        .into_iter()
        .filter(|(_, count)| *count as f64 / n as f64 >= min_fraction)
        .collect();
    qualifying.sort_by(|a, b| b.1.cmp(&a.1));
    qualifying.truncate(max_indicators);

    let levels: Vec<String> = qualifying.into_iter().map(|(level, _)| level).collect();
    let sanitized = sanitize_levels(&levels);

    levels
        .into_iter()
        .zip(sanitized)
        .map(|(level, safe_name)| Encoder::Indicator {
            origin: column.name.clone(),
            derived: format!("{}_lev_{safe_name}", column.name),
            level,
        })
        .collect()
}
