//! Reporting utilities: per-observation residuals and formatted terminal output.

pub mod format;

pub use format::{format_overlay_summary, format_run_summary};

use crate::domain::ExperimentRun;

/// Observed vs fitted value at one temperature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObservationResidual {
    pub temperature: f64,
    pub observed: f64,
    pub fitted: f64,
    /// `observed - fitted`
    pub residual: f64,
}

/// Fitted values and residuals for every observation of a run.
pub fn compute_residuals(run: &ExperimentRun) -> Vec<ObservationResidual> {
    run.series
        .points()
        .iter()
        .map(|p| {
            let fitted = run.fit.params.eval(p.temperature);
            ObservationResidual {
                temperature: p.temperature,
                observed: p.percentage,
                fitted,
                residual: p.percentage - fitted,
            }
        })
        .collect()
}

/// Observation with the largest absolute residual.
pub fn worst_residual(residuals: &[ObservationResidual]) -> Option<&ObservationResidual> {
    residuals
        .iter()
        .max_by(|a, b| a.residual.abs().total_cmp(&b.residual.abs()))
}
