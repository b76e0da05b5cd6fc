//! Decaying sigmoid model.
//!
//! ```text
//! f(x; c, d, a) = a · (1 − 1/(1 + exp(−(x − c)/d)))
//! ```
//!
//! - `c`: inflection temperature, `f(c) = a/2`
//! - `d`: decay rate (`d > 0` falls with x, `d < 0` rises)
//! - `a`: asymptote
//!
//! Numerical notes:
//! - `1 − 1/(1 + e^u)` is the logistic `σ(−u)`, so with `z = (c − x)/d` we
//!   evaluate `f = a·σ(z)`. The logistic is computed in the branch that never
//!   exponentiates a positive number, so huge |z| saturates to 0 or 1 instead of
//!   producing `inf/inf`.
//! - The fitter works with the rate `k = 1/d`; the `*_rate` helpers expose the
//!   model and its Jacobian in that parametrization.

use crate::domain::SigmoidParams;

/// Logistic function `1 / (1 + exp(−z))`.
pub fn logistic(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

/// Evaluate the sigmoid at `x`.
pub fn sigmoid(x: f64, c: f64, d: f64, a: f64) -> f64 {
    a * logistic((c - x) / d)
}

/// Evaluate the sigmoid elementwise.
pub fn sigmoid_many(xs: &[f64], params: &SigmoidParams) -> Vec<f64> {
    xs.iter().map(|&x| params.eval(x)).collect()
}

/// Partial derivatives `[∂f/∂c, ∂f/∂d, ∂f/∂a]` at `x`.
pub fn gradient(x: f64, params: &SigmoidParams) -> [f64; 3] {
    let SigmoidParams { c, d, a } = *params;
    let s = logistic((c - x) / d);
    let ds = a * s * (1.0 - s);
    [ds / d, -ds * (c - x) / (d * d), s]
}

/// Evaluate the sigmoid with rate `k = 1/d` (`k = 0` is the flat curve `a/2`).
pub fn sigmoid_rate(x: f64, c: f64, k: f64, a: f64) -> f64 {
    a * logistic((c - x) * k)
}

/// Partial derivatives `[∂f/∂c, ∂f/∂k, ∂f/∂a]` in the rate parametrization.
pub fn gradient_rate(x: f64, c: f64, k: f64, a: f64) -> [f64; 3] {
    let s = logistic((c - x) * k);
    let ds = a * s * (1.0 - s);
    [ds * k, ds * (c - x), s]
}
