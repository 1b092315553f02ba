//! `impact` (categorical origin, outcome-dependent): one-variable smoothed
//! mean (numeric outcome) or smoothed log-odds (binomial outcome) model of
//! the outcome conditional on level.

use std::collections::HashMap;

use crate::frame::Column;
use crate::stats::{logit, mean};

use super::{Encoder, MISSING_LEVEL};

/// Per-level `(sum_of_residuals, count)` or `(positive_count, count)`
/// accumulator, shared by both outcome flavors before the final smoothing
/// division.
struct LevelAccumulator {
    weighted_sum: f64,
    count: usize,
}

/// Fit an impact encoder for a numeric outcome: per level `b_l = sum(y_i -
/// y_bar) / (n_l + sm_factor)`.
pub fn fit_impact_numeric(
    column: &Column,
    outcome: &[Option<f64>],
    derived_name: &str,
    sm_factor: f64,
    rare_count: usize,
) -> Option<Encoder> {
    let n = column.len().min(outcome.len());
    let present: Vec<(String, f64)> = (0..n)
        .filter_map(|row| {
            let y = outcome[row]?;
            Some((level_or_missing(column, row), y))
        })
        .collect();

    if present.is_empty() {
        return None;
    }

    let y_bar = mean(&present.iter().map(|(_, y)| *y).collect::<Vec<_>>());

    let mut accumulators: HashMap<String, LevelAccumulator> = HashMap::new();
    for (level, y) in &present {
        let entry = accumulators.entry(level.clone()).or_insert(LevelAccumulator {
            weighted_sum: 0.0,
            count: 0,
        });
        entry.weighted_sum += y - y_bar;
        entry.count += 1;
    }

    if accumulators.len() <= 1 {
        return None;
    }

    let (kept, rare): (Vec<_>, Vec<_>) = accumulators
        .into_iter()
        .partition(|(_, acc)| acc.count > rare_count);

    let mut per_level: HashMap<String, f64> = kept
        .into_iter()
        .map(|(level, acc)| (level, acc.weighted_sum / (acc.count as f64 + sm_factor)))
        .collect();

    if !rare.is_empty() {
        let pooled_sum: f64 = rare.iter().map(|(_, a)| a.weighted_sum).sum();
        let pooled_count: usize = rare.iter().map(|(_, a)| a.count).sum();
        per_level.insert(
            "_rare_".to_string(),
            pooled_sum / (pooled_count as f64 + sm_factor),
        );
    }

    Some(Encoder::Impact {
        origin: column.name.clone(),
        derived: derived_name.to_string(),
        per_level,
        novel_value: 0.0,
        extra_model_degrees: 5,
    })
}

/// Fit an impact encoder for a binomial 0/1 outcome in link space: per
/// level `logit((k_l + sm_factor * p_bar) / (n_l + sm_factor)) -
/// logit(p_bar)`, with Laplace-style smoothing toward the grand positive
/// rate. If `cat_scaling` is false, the identity-space positive rate
/// difference is used instead.
pub fn fit_impact_binomial(
    column: &Column,
    outcome01: &[Option<f64>],
    derived_name: &str,
    sm_factor: f64,
    rare_count: usize,
    cat_scaling: bool,
) -> Option<Encoder> {
    let n = column.len().min(outcome01.len());
    let present: Vec<(String, f64)> = (0..n)
        .filter_map(|row| {
            let y = outcome01[row]?;
            Some((level_or_missing(column, row), y))
        })
        .collect();

    if present.is_empty() {
        return None;
    }

    let p_bar = mean(&present.iter().map(|(_, y)| *y).collect::<Vec<_>>());

    let mut accumulators: HashMap<String, LevelAccumulator> = HashMap::new();
    for (level, y) in &present {
        let entry = accumulators.entry(level.clone()).or_insert(LevelAccumulator {
            weighted_sum: 0.0,
            count: 0,
        });
        entry.weighted_sum += y; // positive count
        entry.count += 1;
    }

    if accumulators.len() <= 1 {
        return None;
    }

    let (kept, rare): (Vec<_>, Vec<_>) = accumulators
        .into_iter()
        .partition(|(_, acc)| acc.count > rare_count);

    let value_for = |positive_count: f64, count: usize| -> f64 {
        let smoothed_rate = (positive_count + sm_factor * p_bar) / (count as f64 + sm_factor);
        if cat_scaling {
            logit(smoothed_rate) - logit(p_bar)
        } else {
            smoothed_rate - p_bar
        }
    };

    let mut per_level: HashMap<String, f64> = kept
        .into_iter()
        .map(|(level, acc)| (level, value_for(acc.weighted_sum, acc.count)))
        .collect();

    if !rare.is_empty() {
        let pooled_positive: f64 = rare.iter().map(|(_, a)| a.weighted_sum).sum();
        let pooled_count: usize = rare.iter().map(|(_, a)| a.count).sum();
        per_level.insert("_rare_".to_string(), value_for(pooled_positive, pooled_count));
    }

    Some(Encoder::Impact {
        origin: column.name.clone(),
        derived: derived_name.to_string(),
        per_level,
        novel_value: 0.0,
        extra_model_degrees: 5,
    })
}

fn level_or_missing(column: &Column, row: usize) -> String {
    column
        .categorical_value(row)
        .map(str::to_string)
        .unwrap_or_else(|| MISSING_LEVEL.to_string())
}
