//! Nonlinear least-squares fitting of the sigmoid model.
//!
//! Given temperatures `x_i` and observed percentages `y_i`, we minimize
//!
//! ```text
//! SSE(c, d, a) = Σ (y_i − f(x_i; c, d, a))²
//! ```
//!
//! with Levenberg–Marquardt:
//! - each iteration solves the damped problem `min ‖J δ − r‖² + μ‖δ‖²` via SVD
//! - steps are accepted or rejected by the gain ratio (actual vs. predicted
//!   SSE reduction), and `μ` is updated with Nielsen's rule
//!
//! The rate is optimized as `k = 1/d`. In that form the model is smooth through
//! `k = 0` (a flat curve), so a decaying initial guess can move to a rising fit
//! (negative `d`) without crossing the `d = 0` pole.
//!
//! The fit is deterministic for a given series, guess and options. It is only
//! a local optimizer: a poor initial guess can land in a poor local minimum.

use nalgebra::{DMatrix, DVector, Matrix3, Vector3};
use tracing::{debug, trace, warn};

use crate::domain::{FitDiagnostics, FitResult, PercentageSeries, SigmoidParams, Termination};
use crate::error::PipelineError;
use crate::math::{equilibrated_condition_number, solve_damped};
use crate::models::{gradient, gradient_rate, sigmoid_rate};

/// Number of free model parameters.
const N_PARAMS: usize = 3;

/// Minimum number of distinct temperatures for a well-posed fit.
pub const MIN_FIT_POINTS: usize = N_PARAMS;

/// Below this `|k|·span`, the fitted curve is flat over the data and `c` is
/// unidentifiable.
const FLAT_CURVE_EPS: f64 = 1e-6;

/// Optimizer settings.
#[derive(Debug, Clone)]
pub struct FitOptions {
    /// Iteration budget (accepted and rejected steps both count).
    pub max_iterations: usize,
    /// Relative SSE reduction below which the fit is considered converged.
    pub ftol: f64,
    /// Relative parameter step below which the fit is considered converged.
    pub xtol: f64,
    /// Gradient max-norm below which the fit is considered converged.
    pub gtol: f64,
    /// Column-equilibrated condition number of the Jacobian above which the
    /// solution is treated as singular.
    pub singular_condition: f64,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            max_iterations: 800,
            ftol: 1.49012e-8,
            xtol: 1.49012e-8,
            gtol: 1e-10,
            singular_condition: 1e8,
        }
    }
}

/// Fit the sigmoid to `series` starting from `guess`.
pub fn fit_sigmoid(
    series: &PercentageSeries,
    guess: SigmoidParams,
    opts: &FitOptions,
) -> Result<FitResult, PipelineError> {
    let distinct = series.distinct_temperatures();
    if distinct < MIN_FIT_POINTS {
        return Err(PipelineError::precondition(format!(
            "Fitting needs at least {MIN_FIT_POINTS} distinct temperatures, got {distinct}."
        )));
    }
    if !guess.is_finite() || guess.d == 0.0 {
        return Err(PipelineError::precondition(format!(
            "Initial guess must be finite with a non-zero decay rate, got c={}, d={}, a={}.",
            guess.c, guess.d, guess.a
        )));
    }
    if opts.max_iterations == 0 {
        return Err(PipelineError::precondition("Iteration budget must be > 0."));
    }

    let xs = series.temperatures();
    let ys = series.percentages();
    let n = xs.len();

    let outcome = levenberg_marquardt(&xs, &ys, guess, opts)?;
    let theta = outcome.theta;
    let last_params = params_from_theta(&theta);

    let fail = |reason: String| PipelineError::FitConvergence {
        reason,
        last_params,
        iterations: outcome.iterations,
    };

    // The converged point must still identify all three parameters.
    let span = xs[n - 1] - xs[0];
    if (theta[1] * span).abs() < FLAT_CURVE_EPS {
        return Err(fail(
            "singular Jacobian: fitted curve is flat over the observed temperatures".to_string(),
        ));
    }
    let cond = equilibrated_condition_number(&rate_jacobian(&xs, &theta));
    if !(cond <= opts.singular_condition) {
        return Err(fail(format!("singular Jacobian (condition number {cond:.3e})")));
    }

    let covariance = covariance(&xs, &last_params, outcome.sse, n)
        .ok_or_else(|| fail("singular Jacobian: JᵀJ is not invertible".to_string()))?;

    debug!(
        c = last_params.c,
        d = last_params.d,
        a = last_params.a,
        sse = outcome.sse,
        iterations = outcome.iterations,
        termination = ?outcome.termination,
        "sigmoid fit converged"
    );

    Ok(FitResult {
        params: last_params,
        covariance,
        diagnostics: FitDiagnostics {
            sse: outcome.sse,
            rmse: (outcome.sse / n as f64).sqrt(),
            n_observations: n,
            iterations: outcome.iterations,
            termination: outcome.termination,
        },
    })
}

#[derive(Debug, Clone)]
struct LmOutcome {
    theta: Vector3<f64>,
    sse: f64,
    iterations: usize,
    termination: Termination,
}

fn levenberg_marquardt(
    xs: &[f64],
    ys: &[f64],
    guess: SigmoidParams,
    opts: &FitOptions,
) -> Result<LmOutcome, PipelineError> {
    let mut theta = Vector3::new(guess.c, 1.0 / guess.d, guess.a);

    let fail = |reason: &str, theta: &Vector3<f64>, iterations: usize| PipelineError::FitConvergence {
        reason: reason.to_string(),
        last_params: params_from_theta(theta),
        iterations,
    };

    let mut r = residuals(xs, ys, &theta);
    let mut sse = r.norm_squared();
    if !sse.is_finite() {
        return Err(fail("objective is not finite at the initial guess", &theta, 0));
    }
    let mut j = rate_jacobian(xs, &theta);
    let mut g = objective_gradient(&j, &r);

    let jtj = j.tr_mul(&j);
    let mut mu = 1e-3 * (0..N_PARAMS).map(|i| jtj[(i, i)]).fold(0.0_f64, f64::max);
    if !(mu.is_finite() && mu > 0.0) {
        mu = 1e-3;
    }
    let mut nu = 2.0;

    for iter in 0..opts.max_iterations {
        if g.amax() <= opts.gtol {
            return Ok(LmOutcome {
                theta,
                sse,
                iterations: iter,
                termination: Termination::Gradient,
            });
        }

        let Some(h) = solve_damped(&j, &r, mu) else {
            mu *= nu;
            nu *= 2.0;
            if !mu.is_finite() {
                return Err(fail("damped normal equations could not be solved", &theta, iter));
            }
            continue;
        };
        let h = Vector3::new(h[0], h[1], h[2]);

        if h.norm() <= opts.xtol * (theta.norm() + opts.xtol) {
            return Ok(LmOutcome {
                theta,
                sse,
                iterations: iter,
                termination: Termination::Step,
            });
        }

        let theta_new = theta + h;
        let r_new = residuals(xs, ys, &theta_new);
        let sse_new = r_new.norm_squared();

        // Predicted reduction of the linearized model: hᵀ(μh + Jᵀr).
        let predicted = h.dot(&(h * mu + g));
        let rho = if sse_new.is_finite() && predicted > 0.0 {
            (sse - sse_new) / predicted
        } else {
            -1.0
        };

        trace!(iter, sse, sse_new, mu, rho, "lm step");

        if rho > 0.0 {
            let converged = sse - sse_new <= opts.ftol * sse;
            theta = theta_new;
            r = r_new;
            sse = sse_new;
            j = rate_jacobian(xs, &theta);
            g = objective_gradient(&j, &r);
            mu *= (1.0 / 3.0_f64).max(1.0 - (2.0 * rho - 1.0).powi(3));
            nu = 2.0;
            if converged {
                return Ok(LmOutcome {
                    theta,
                    sse,
                    iterations: iter + 1,
                    termination: Termination::Objective,
                });
            }
        } else {
            mu *= nu;
            nu *= 2.0;
            if !mu.is_finite() {
                return Err(fail("damping diverged without an acceptable step", &theta, iter + 1));
            }
        }
    }

    Err(fail(
        &format!("iteration budget of {} exhausted", opts.max_iterations),
        &theta,
        opts.max_iterations,
    ))
}

fn params_from_theta(theta: &Vector3<f64>) -> SigmoidParams {
    SigmoidParams::new(theta[0], 1.0 / theta[1], theta[2])
}

fn residuals(xs: &[f64], ys: &[f64], theta: &Vector3<f64>) -> DVector<f64> {
    DVector::from_iterator(
        xs.len(),
        xs.iter()
            .zip(ys)
            .map(|(&x, &y)| y - sigmoid_rate(x, theta[0], theta[1], theta[2])),
    )
}

/// `Jᵀr`, the descent direction of the SSE (up to a factor of −2).
fn objective_gradient(j: &DMatrix<f64>, r: &DVector<f64>) -> Vector3<f64> {
    let g = j.tr_mul(r);
    Vector3::new(g[0], g[1], g[2])
}

fn rate_jacobian(xs: &[f64], theta: &Vector3<f64>) -> DMatrix<f64> {
    let mut j = DMatrix::<f64>::zeros(xs.len(), N_PARAMS);
    for (i, &x) in xs.iter().enumerate() {
        let row = gradient_rate(x, theta[0], theta[1], theta[2]);
        for (k, v) in row.into_iter().enumerate() {
            j[(i, k)] = v;
        }
    }
    j
}

/// Parameter covariance in `(c, d, a)`: `(JᵀJ)⁻¹ · SSE/(n − 3)`.
///
/// With exactly three observations the residual variance has no degrees of
/// freedom left and every entry is `+∞`.
fn covariance(xs: &[f64], params: &SigmoidParams, sse: f64, n: usize) -> Option<[[f64; 3]; 3]> {
    let mut jtj = Matrix3::<f64>::zeros();
    for &x in xs {
        let g = Vector3::from(gradient(x, params));
        jtj += g * g.transpose();
    }
    let inv = jtj.try_inverse()?;
    if inv.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let mut out = [[f64::INFINITY; 3]; 3];
    if n > N_PARAMS {
        let scale = sse / (n - N_PARAMS) as f64;
        for (row, out_row) in out.iter_mut().enumerate() {
            for (col, v) in out_row.iter_mut().enumerate() {
                *v = inv[(row, col)] * scale;
            }
        }
    } else {
        warn!(n, "covariance of the fitted parameters could not be estimated");
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sigmoid;

    fn series_from_model(temps: &[f64], params: SigmoidParams) -> PercentageSeries {
        let ys: Vec<f64> = temps.iter().map(|&t| params.eval(t)).collect();
        PercentageSeries::from_pairs(temps, &ys).unwrap()
    }

    #[test]
    fn recovers_known_parameters_from_noise_free_data() {
        let truth = SigmoidParams::new(46.0, 20.0, 60.0);
        let temps = [25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0];
        let series = series_from_model(&temps, truth);

        for guess in [
            SigmoidParams::new(40.0, 15.0, 50.0),
            SigmoidParams::new(50.0, 25.0, 70.0),
            SigmoidParams::new(46.0, 20.0, 60.0),
        ] {
            let fit = fit_sigmoid(&series, guess, &FitOptions::default()).unwrap();
            assert!((fit.params.c - 46.0).abs() < 1e-3, "c = {}", fit.params.c);
            assert!((fit.params.d - 20.0).abs() < 1e-3, "d = {}", fit.params.d);
            assert!((fit.params.a - 60.0).abs() < 1e-3, "a = {}", fit.params.a);
            assert!(fit.diagnostics.sse < 1e-12);
        }
    }

    #[test]
    fn fits_rising_series_from_decaying_guess() {
        let series = PercentageSeries::from_pairs(
            &[30.0, 40.0, 46.0, 52.0, 60.0],
            &[2.0, 20.0, 50.0, 80.0, 98.0],
        )
        .unwrap();
        let fit = fit_sigmoid(&series, SigmoidParams::new(46.0, 20.0, 60.0), &FitOptions::default()).unwrap();

        assert!((fit.params.c - 46.0).abs() < 0.5, "c = {}", fit.params.c);
        assert!((fit.params.a - 100.0).abs() < 3.0, "a = {}", fit.params.a);
        assert!(fit.params.d < 0.0, "rising data needs d < 0, got {}", fit.params.d);

        // Five points, three parameters: the covariance is finite and positive on the diagonal.
        for (i, row) in fit.covariance.iter().enumerate() {
            assert!(row.iter().all(|v| v.is_finite()));
            assert!(row[i] > 0.0);
        }
    }

    #[test]
    fn rejects_fewer_than_three_distinct_temperatures() {
        let series = PercentageSeries::from_pairs(&[30.0, 60.0], &[2.0, 98.0]).unwrap();
        let err = fit_sigmoid(&series, SigmoidParams::new(46.0, 20.0, 60.0), &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));

        // Duplicates do not count towards the minimum.
        let series = PercentageSeries::from_pairs(&[30.0, 30.0, 60.0, 60.0], &[2.0, 4.0, 98.0, 96.0]).unwrap();
        let err = fit_sigmoid(&series, SigmoidParams::new(46.0, 20.0, 60.0), &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));
    }

    #[test]
    fn rejects_zero_rate_guess() {
        let series = series_from_model(&[30.0, 40.0, 50.0, 60.0], SigmoidParams::new(46.0, 20.0, 60.0));
        let err = fit_sigmoid(&series, SigmoidParams::new(46.0, 0.0, 60.0), &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Precondition(_)));
    }

    #[test]
    fn flat_series_reports_convergence_failure() {
        let series = PercentageSeries::from_pairs(&[30.0, 35.0, 40.0, 45.0, 50.0], &[40.0; 5]).unwrap();
        let err = fit_sigmoid(&series, SigmoidParams::new(46.0, 20.0, 60.0), &FitOptions::default())
            .unwrap_err();
        match err {
            PipelineError::FitConvergence { reason, .. } => assert!(reason.contains("singular")),
            other => panic!("expected FitConvergence, got {other:?}"),
        }
    }

    #[test]
    fn exhausted_budget_reports_last_parameters() {
        let series = series_from_model(
            &[25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0],
            SigmoidParams::new(46.0, 20.0, 60.0),
        );
        let opts = FitOptions {
            max_iterations: 2,
            ..FitOptions::default()
        };
        let err = fit_sigmoid(&series, SigmoidParams::new(40.0, 15.0, 50.0), &opts).unwrap_err();
        match err {
            PipelineError::FitConvergence {
                last_params,
                iterations,
                ..
            } => {
                assert_eq!(iterations, 2);
                assert!(last_params.is_finite());
            }
            other => panic!("expected FitConvergence, got {other:?}"),
        }
    }

    #[test]
    fn exactly_three_points_gives_infinite_covariance() {
        let truth = SigmoidParams::new(46.0, 8.0, 80.0);
        let temps = [36.0, 46.0, 56.0];
        let ys: Vec<f64> = temps.iter().map(|&t| sigmoid(t, truth.c, truth.d, truth.a)).collect();
        let series = PercentageSeries::from_pairs(&temps, &ys).unwrap();

        let fit = fit_sigmoid(&series, SigmoidParams::new(45.0, 10.0, 70.0), &FitOptions::default()).unwrap();
        assert!((fit.params.c - 46.0).abs() < 1e-3);
        assert!(fit.covariance[0][0].is_infinite());
    }
}
