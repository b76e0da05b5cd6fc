//! Residual-based confidence band and transition-midpoint estimate.
//!
//! The band uses the simple-regression prediction margin, evaluated on a
//! unit-step grid over the observed temperature range:
//!
//! ```text
//! margin(g) = t · sqrt(SSR / (n − 2)) · sqrt(1/n + (g − T̄)² / (Σ Tᵢ² − n·T̄²))
//! ```
//!
//! `t` is a fixed critical value supplied by configuration (the default 2.093
//! is the two-sided 95% value for 19 degrees of freedom). It is not looked up
//! from a distribution, so callers with other sample sizes or confidence levels
//! pass their own value.

use tracing::debug;

use crate::domain::{BandPoint, ConfidenceBand, FitResult, PercentageSeries, TransitionMidpoint};
use crate::error::PipelineError;
use crate::math::{mean, sum_of_squares};

/// Smallest sample size for which `SSR/(n − 2)` is defined.
const ABSOLUTE_MIN_OBSERVATIONS: usize = 3;

/// Confidence band configuration.
#[derive(Debug, Clone)]
pub struct ConfidenceConfig {
    /// Critical value of the t-distribution for the chosen level and sample size.
    pub t_crit: f64,
    /// Minimum number of observations. Values below 3 are raised to 3.
    pub min_observations: usize,
}

impl Default for ConfidenceConfig {
    fn default() -> Self {
        Self {
            t_crit: 2.093,
            min_observations: ABSOLUTE_MIN_OBSERVATIONS,
        }
    }
}

impl ConfidenceConfig {
    fn effective_min_observations(&self) -> usize {
        self.min_observations.max(ABSOLUTE_MIN_OBSERVATIONS)
    }
}

/// Compute the confidence band around `fit` for the observations in `series`.
pub fn estimate_band(
    series: &PercentageSeries,
    fit: &FitResult,
    config: &ConfidenceConfig,
) -> Result<ConfidenceBand, PipelineError> {
    if !(config.t_crit.is_finite() && config.t_crit > 0.0) {
        return Err(PipelineError::precondition(format!(
            "Critical value must be positive and finite, got {}.",
            config.t_crit
        )));
    }

    let n = series.len();
    let min_n = config.effective_min_observations();
    if n < min_n {
        return Err(PipelineError::precondition(format!(
            "Confidence band needs at least {min_n} observations, got {n}."
        )));
    }

    let temps = series.temperatures();
    let observed = series.percentages();
    let params = fit.params;

    let ssr: f64 = temps
        .iter()
        .zip(&observed)
        .map(|(&t, &y)| {
            let r = y - params.eval(t);
            r * r
        })
        .sum();

    let n_f = n as f64;
    let mean_t = mean(&temps)
        .ok_or_else(|| PipelineError::precondition("Confidence band needs observations."))?;
    let sxx = sum_of_squares(&temps) - n_f * mean_t * mean_t;
    if !(sxx > 0.0) {
        return Err(PipelineError::precondition(
            "Confidence band needs at least two distinct temperatures.",
        ));
    }

    let scale = config.t_crit * (ssr / (n_f - 2.0)).sqrt();
    let grid = unit_grid(temps[0], temps[n - 1]);

    let points: Vec<BandPoint> = grid
        .into_iter()
        .map(|g| {
            let margin = (scale * (1.0 / n_f + (g - mean_t).powi(2) / sxx).sqrt()).abs();
            let predicted = params.eval(g);
            BandPoint {
                temperature: g,
                predicted,
                upper: predicted + margin,
                lower: predicted - margin,
            }
        })
        .collect();

    debug!(n, ssr, grid_points = points.len(), "confidence band computed");

    Ok(ConfidenceBand { points })
}

/// Transition midpoint `c` with bounds `c ± t·se(c)` from the fit covariance.
pub fn transition_midpoint(fit: &FitResult, config: &ConfidenceConfig) -> TransitionMidpoint {
    let c = fit.params.c;
    let std_error = fit.covariance[0][0].sqrt();
    let (lower, upper) = if std_error.is_finite() {
        let half = config.t_crit * std_error;
        (Some(c - half), Some(c + half))
    } else {
        (None, None)
    };

    TransitionMidpoint {
        temperature: c,
        std_error,
        lower,
        upper,
    }
}

/// `start, start + 1, …` up to and including `end` (last value `≤ end`).
fn unit_grid(start: f64, end: f64) -> Vec<f64> {
    let steps = (end - start).floor().max(0.0) as usize;
    (0..=steps).map(|i| start + i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FitDiagnostics, SigmoidParams, Termination};

    fn fit_with(params: SigmoidParams, var_c: f64) -> FitResult {
        FitResult {
            params,
            covariance: [[var_c, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            diagnostics: FitDiagnostics {
                sse: 0.0,
                rmse: 0.0,
                n_observations: 0,
                iterations: 0,
                termination: Termination::Gradient,
            },
        }
    }

    fn noisy_series() -> PercentageSeries {
        PercentageSeries::from_pairs(
            &[30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0],
            &[58.0, 55.5, 49.0, 42.0, 33.0, 27.5, 21.0],
        )
        .unwrap()
    }

    #[test]
    fn grid_spans_range_at_unit_step() {
        assert_eq!(unit_grid(30.0, 33.0), vec![30.0, 31.0, 32.0, 33.0]);
        assert_eq!(unit_grid(30.5, 32.9), vec![30.5, 31.5, 32.5]);
        assert_eq!(unit_grid(30.0, 30.0), vec![30.0]);
    }

    #[test]
    fn band_brackets_prediction() {
        let series = noisy_series();
        let fit = fit_with(SigmoidParams::new(46.0, 20.0, 60.0), 1.0);
        let band = estimate_band(&series, &fit, &ConfidenceConfig::default()).unwrap();

        assert_eq!(band.len(), 31);
        assert_eq!(band.points[0].temperature, 30.0);
        assert_eq!(band.points[30].temperature, 60.0);
        for p in &band.points {
            assert!(p.upper >= p.predicted && p.predicted >= p.lower);
            assert!((p.predicted - fit.params.eval(p.temperature)).abs() < 1e-12);
        }
    }

    #[test]
    fn margin_matches_closed_form() {
        let series = noisy_series();
        let params = SigmoidParams::new(46.0, 20.0, 60.0);
        let fit = fit_with(params, 1.0);
        let config = ConfidenceConfig {
            t_crit: 2.571,
            min_observations: 3,
        };
        let band = estimate_band(&series, &fit, &config).unwrap();

        let temps = series.temperatures();
        let ys = series.percentages();
        let n = temps.len() as f64;
        let ssr: f64 = temps.iter().zip(&ys).map(|(&t, &y)| (y - params.eval(t)).powi(2)).sum();
        let mean_t = temps.iter().sum::<f64>() / n;
        let sxx: f64 = temps.iter().map(|t| t * t).sum::<f64>() - n * mean_t * mean_t;

        // Narrowest at the mean temperature (45), wider at the edges.
        let at = |t: f64| band.points.iter().find(|p| p.temperature == t).unwrap();
        let expected = 2.571 * (ssr / (n - 2.0)).sqrt() * (1.0 / n + (30.0 - mean_t).powi(2) / sxx).sqrt();
        assert!((at(30.0).upper - at(30.0).predicted - expected).abs() < 1e-9);
        assert!(at(45.0).upper - at(45.0).lower < at(30.0).upper - at(30.0).lower);
    }

    #[test]
    fn perfect_fit_collapses_band() {
        let params = SigmoidParams::new(46.0, 20.0, 60.0);
        let temps = [30.0, 40.0, 50.0, 60.0];
        let ys: Vec<f64> = temps.iter().map(|&t| params.eval(t)).collect();
        let series = PercentageSeries::from_pairs(&temps, &ys).unwrap();

        let band = estimate_band(&series, &fit_with(params, 0.0), &ConfidenceConfig::default()).unwrap();
        for p in &band.points {
            assert!((p.upper - p.lower).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_fewer_than_three_observations() {
        let series = PercentageSeries::from_pairs(&[30.0, 60.0], &[50.0, 40.0]).unwrap();
        let fit = fit_with(SigmoidParams::new(46.0, 20.0, 60.0), 1.0);
        let err = estimate_band(&series, &fit, &ConfidenceConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));

        // A configured minimum below 3 is not honored.
        let config = ConfidenceConfig {
            t_crit: 2.093,
            min_observations: 1,
        };
        let err = estimate_band(&series, &fit, &config).unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));
    }

    #[test]
    fn respects_configured_minimum() {
        let fit = fit_with(SigmoidParams::new(46.0, 20.0, 60.0), 1.0);
        let config = ConfidenceConfig {
            t_crit: 2.093,
            min_observations: 10,
        };
        let err = estimate_band(&noisy_series(), &fit, &config).unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));
    }

    #[test]
    fn rejects_single_temperature() {
        let series = PercentageSeries::from_pairs(&[40.0, 40.0, 40.0], &[50.0, 52.0, 48.0]).unwrap();
        let fit = fit_with(SigmoidParams::new(46.0, 20.0, 60.0), 1.0);
        let err = estimate_band(&series, &fit, &ConfidenceConfig::default()).unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));
    }

    #[test]
    fn midpoint_bounds_follow_covariance() {
        let config = ConfidenceConfig::default();
        let mid = transition_midpoint(&fit_with(SigmoidParams::new(46.0, 20.0, 60.0), 4.0), &config);
        assert_eq!(mid.temperature, 46.0);
        assert_eq!(mid.std_error, 2.0);
        assert!((mid.lower.unwrap() - (46.0 - 2.093 * 2.0)).abs() < 1e-12);
        assert!((mid.upper.unwrap() - (46.0 + 2.093 * 2.0)).abs() < 1e-12);

        let mid = transition_midpoint(
            &fit_with(SigmoidParams::new(46.0, 20.0, 60.0), f64::INFINITY),
            &config,
        );
        assert!(mid.lower.is_none() && mid.upper.is_none());
    }
}
