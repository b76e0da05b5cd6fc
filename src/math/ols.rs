//! Linear least squares helpers for the Levenberg–Marquardt step.
//!
//! Each LM iteration solves a small damped problem:
//!
//! ```text
//! minimize ‖J δ − r‖² + μ‖δ‖²
//! ```
//!
//! which is the ordinary least squares problem for the augmented system
//! `[J; √μ·I] δ = [r; 0]`. We solve it with SVD rather than forming the normal
//! equations, so a nearly rank-deficient Jacobian degrades gracefully.
//!
//! The same SVD machinery provides the condition number used to decide whether
//! a converged Jacobian is too close to singular to yield a covariance.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    // Try progressively looser tolerances if strict solve fails.
    for &tol in &[1e-14, 1e-12, 1e-10] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}

/// Solve the damped system `[J; √μ·I] δ = [r; 0]`.
pub fn solve_damped(j: &DMatrix<f64>, r: &DVector<f64>, mu: f64) -> Option<DVector<f64>> {
    let (n, p) = j.shape();
    let sqrt_mu = mu.max(0.0).sqrt();

    let mut aug = DMatrix::<f64>::zeros(n + p, p);
    aug.view_mut((0, 0), (n, p)).copy_from(j);
    for k in 0..p {
        aug[(n + k, k)] = sqrt_mu;
    }

    let mut rhs = DVector::<f64>::zeros(n + p);
    rhs.rows_mut(0, n).copy_from(r);

    solve_least_squares(&aug, &rhs)
}

/// Condition number of `x` after scaling every column to unit norm.
///
/// Column equilibration removes the effect of parameters living on different
/// scales (e.g. a temperature of ~50 vs. a rate of ~0.05), so a large value
/// indicates genuine collinearity. Returns `+∞` when a column is all zeros.
pub fn equilibrated_condition_number(x: &DMatrix<f64>) -> f64 {
    let mut scaled = x.clone();
    for mut col in scaled.column_iter_mut() {
        let norm = col.norm();
        if !(norm.is_finite() && norm > 0.0) {
            return f64::INFINITY;
        }
        col /= norm;
    }

    let sv = scaled.singular_values();
    let max = sv.max();
    let min = sv.min();
    if min <= 0.0 || !min.is_finite() {
        f64::INFINITY
    } else {
        max / min
    }
}
