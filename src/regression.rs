//! One-variable regression fits backing impact encoding and the
//! significance scorer.
//!
//! Every model here has exactly one predictor plus an intercept, so the
//! normal-equations solve is a closed 2x2 system; logistic fits use a short
//! Newton-Raphson (IRLS) loop rather than pulling in a general linear
//! algebra crate for a single scalar coefficient.

use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::stats::mean;

/// Summary statistics for a one-variable fit against an outcome, in the
/// shape the significance scorer needs.
#[derive(Debug, Clone, Copy)]
pub struct RegressionSummary {
    pub slope: f64,
    pub rsq: f64,
    /// Two-sided p-value of the slope under a Wald test.
    pub sig: f64,
}

/// Ordinary least squares of `y ~ intercept + slope * x`, with
/// `extra_model_degrees` subtracted from the residual degrees of freedom to
/// account for cross-validated encoder complexity.
pub fn ols(x: &[f64], y: &[f64], extra_model_degrees: usize) -> RegressionSummary {
    let n = x.len();
    debug_assert_eq!(n, y.len());
    if n < 3 {
        return RegressionSummary {
            slope: 0.0,
            rsq: 0.0,
            sig: 1.0,
        };
    }

    let x_bar = mean(x);
    let y_bar = mean(y);
    let sxx: f64 = x.iter().map(|xi| (xi - x_bar).powi(2)).sum();
    let sxy: f64 = x.iter().zip(y).map(|(xi, yi)| (xi - x_bar) * (yi - y_bar)).sum();

    if sxx <= f64::EPSILON {
        return RegressionSummary {
            slope: 0.0,
            rsq: 0.0,
            sig: 1.0,
        };
    }

    let slope = sxy / sxx;
    let intercept = y_bar - slope * x_bar;

    let sst: f64 = y.iter().map(|yi| (yi - y_bar).powi(2)).sum();
    let sse: f64 = x
        .iter()
        .zip(y)
        .map(|(xi, yi)| {
            let fitted = intercept + slope * xi;
            (yi - fitted).powi(2)
        })
        .sum();

    let rsq = if sst <= f64::EPSILON { 0.0 } else { 1.0 - sse / sst };

    let df_resid = (n as i64 - 2 - extra_model_degrees as i64).max(1) as f64;
    let mse = sse / df_resid;
    let se_slope = (mse / sxx).sqrt();

    let sig = if se_slope <= f64::EPSILON {
        if slope.abs() <= f64::EPSILON { 1.0 } else { 0.0 }
    } else {
        let t_stat = slope / se_slope;
        two_sided_p_value_t(t_stat, df_resid)
    };

    RegressionSummary { slope, rsq, sig }
}

/// Logistic regression of a binary `y` on a single continuous `x`, fit by a
/// short Newton-Raphson loop over `(intercept, slope)`.
pub fn logistic(x: &[f64], y: &[f64], extra_model_degrees: usize) -> RegressionSummary {
    let n = x.len();
    debug_assert_eq!(n, y.len());
    if n < 3 {
        return RegressionSummary {
            slope: 0.0,
            rsq: 0.0,
            sig: 1.0,
        };
    }

    let x_bar = mean(x);
    let x_std = {
        let var = x.iter().map(|xi| (xi - x_bar).powi(2)).sum::<f64>() / n as f64;
        var.sqrt()
    };
    if x_std <= f64::EPSILON {
        return RegressionSummary {
            slope: 0.0,
            rsq: 0.0,
            sig: 1.0,
        };
    }

    // Newton-Raphson on standardized x for numerical stability.
    let xs: Vec<f64> = x.iter().map(|xi| (xi - x_bar) / x_std).collect();
    let mut intercept = 0.0_f64;
    let mut slope = 0.0_f64;

    let mut se_slope_std = f64::INFINITY;
    for _ in 0..50 {
        let mut grad_b0 = 0.0;
        let mut grad_b1 = 0.0;
        let mut h00 = 0.0;
        let mut h01 = 0.0;
        let mut h11 = 0.0;

        for (xi, yi) in xs.iter().zip(y) {
            let eta = intercept + slope * xi;
            let p = crate::stats::sigmoid(eta);
            let w = (p * (1.0 - p)).max(1e-9);
            grad_b0 += yi - p;
            grad_b1 += (yi - p) * xi;
            h00 += w;
            h01 += w * xi;
            h11 += w * xi * xi;
        }

        let det = h00 * h11 - h01 * h01;
        if det.abs() <= f64::EPSILON {
            break;
        }
        let delta_b0 = (h11 * grad_b0 - h01 * grad_b1) / det;
        let delta_b1 = (-h01 * grad_b0 + h00 * grad_b1) / det;
        intercept += delta_b0;
        slope += delta_b1;
        se_slope_std = (h00 / det).sqrt();

        if delta_b0.abs() < 1e-10 && delta_b1.abs() < 1e-10 {
            break;
        }
    }

    let slope_original_scale = slope / x_std;
    let se_slope = se_slope_std / x_std;

    let p_bar = mean(y);
    let ln_l = log_likelihood(&xs, y, intercept, slope);
    let ln_l_null = xs.len() as f64
        * (p_bar * p_bar.max(1e-9).ln() + (1.0 - p_bar) * (1.0 - p_bar).max(1e-9).ln());
    let rsq = if ln_l_null.abs() <= f64::EPSILON {
        0.0
    } else {
        (1.0 - ln_l / ln_l_null).clamp(0.0, 1.0)
    };

    let df_resid = (n as i64 - 2 - extra_model_degrees as i64).max(1) as f64;
    let sig = if !se_slope.is_finite() || se_slope <= f64::EPSILON {
        1.0
    } else {
        let wald_stat = slope_original_scale / se_slope;
        two_sided_p_value_t(wald_stat, df_resid)
    };

    RegressionSummary {
        slope: slope_original_scale,
        rsq,
        sig,
    }
}

fn log_likelihood(x: &[f64], y: &[f64], intercept: f64, slope: f64) -> f64 {
    x.iter()
        .zip(y)
        .map(|(xi, yi)| {
            let eta = intercept + slope * xi;
            let p = crate::stats::sigmoid(eta).clamp(1e-9, 1.0 - 1e-9);
            yi * p.ln() + (1.0 - yi) * (1.0 - p).ln()
        })
        .sum()
}

fn two_sided_p_value_t(t_stat: f64, df: f64) -> f64 {
    let Ok(dist) = StudentsT::new(0.0, 1.0, df) else {
        return 1.0;
    };
    2.0 * (1.0 - dist.cdf(t_stat.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ols_recovers_exact_linear_relationship() {
        let x: Vec<f64> = (0..20).map(|i| i as f64).collect();
        let y: Vec<f64> = x.iter().map(|xi| 2.0 * xi + 1.0).collect();
        let summary = ols(&x, &y, 0);
        assert!((summary.slope - 2.0).abs() < 1e-9);
        assert!((summary.rsq - 1.0).abs() < 1e-9);
        assert!(summary.sig < 1e-6);
    }

    #[test]
    fn ols_on_noise_has_low_rsq() {
        let x: Vec<f64> = vec![1.0, 2.0, 1.5, 2.5, 1.2, 2.8, 1.9, 2.1];
        let y: Vec<f64> = vec![5.0, 1.0, 4.0, 2.0, 5.0, 1.0, 3.0, 3.0];
        let summary = ols(&x, &y, 0);
        assert!(summary.rsq < 0.5);
    }

    #[test]
    fn ols_on_constant_predictor_is_degenerate() {
        let x = vec![1.0; 10];
        let y: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let summary = ols(&x, &y, 0);
        assert_eq!(summary.slope, 0.0);
        assert_eq!(summary.sig, 1.0);
    }

    #[test]
    fn logistic_separates_cleanly_separable_classes() {
        let x: Vec<f64> = (0..40).map(|i| i as f64 - 20.0).collect();
        let y: Vec<f64> = x.iter().map(|xi| if *xi > 0.0 { 1.0 } else { 0.0 }).collect();
        let summary = logistic(&x, &y, 0);
        assert!(summary.slope > 0.0);
        assert!(summary.sig < 0.05);
    }

    #[test]
    fn logistic_on_noise_has_high_p_value() {
        let x: Vec<f64> = vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let y: Vec<f64> = vec![1.0, 0.0, 1.0, 0.0, 1.0, 0.0, 1.0, 0.0];
        let summary = logistic(&x, &y, 0);
        assert!(summary.sig > 0.1);
    }

    #[test]
    fn logistic_extra_model_degrees_widens_the_p_value() {
        let x: Vec<f64> = (0..40).map(|i| i as f64 - 20.0).collect();
        let y: Vec<f64> = x.iter().map(|xi| if *xi > 0.0 { 1.0 } else { 0.0 }).collect();
        let plain = logistic(&x, &y, 0);
        let charged = logistic(&x, &y, 5);
        assert!(charged.sig > plain.sig);
    }
}
