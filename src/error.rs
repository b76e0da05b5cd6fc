//! Error types.
//!
//! Two layers:
//!
//! - [`PipelineError`]: typed failures of the numerical pipeline (aggregation,
//!   fitting, confidence estimation). Library callers match on these.
//! - [`AppError`]: the CLI boundary type. It carries the process exit code and a
//!   human-readable message; `main` prints it and exits.
//!
//! Exit codes:
//! - `2`: input/IO problems (missing files, unreadable CSV/JSON)
//! - `3`: domain or precondition violations (bad counts, too few points)
//! - `4`: the optimizer failed to produce a usable fit

use thiserror::Error;

use crate::domain::SigmoidParams;

/// Failures of the aggregation → fit → confidence pipeline.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineError {
    /// Malformed or inconsistent aggregation input.
    #[error("domain error: {0}")]
    Domain(String),

    /// Not enough (or invalid) data/configuration to run a stage.
    #[error("precondition failed: {0}")]
    Precondition(String),

    /// The optimizer did not produce a valid fit.
    ///
    /// `last_params` holds the best-effort parameters at the point of failure,
    /// for diagnostics only.
    #[error("fit did not converge after {iterations} iterations: {reason}")]
    FitConvergence {
        reason: String,
        last_params: SigmoidParams,
        iterations: usize,
    },
}

impl PipelineError {
    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain(message.into())
    }

    pub fn precondition(message: impl Into<String>) -> Self {
        Self::Precondition(message.into())
    }

    /// Exit code used when this error reaches the CLI.
    pub fn exit_code(&self) -> u8 {
        match self {
            PipelineError::Domain(_) | PipelineError::Precondition(_) => 3,
            PipelineError::FitConvergence { .. } => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_errors_map_to_exit_codes() {
        let domain: AppError = PipelineError::domain("bad counts").into();
        assert_eq!(domain.exit_code(), 3);
        assert!(domain.to_string().contains("bad counts"));

        let fit: AppError = PipelineError::FitConvergence {
            reason: "singular Jacobian".to_string(),
            last_params: SigmoidParams::new(46.0, 20.0, 60.0),
            iterations: 12,
        }
        .into();
        assert_eq!(fit.exit_code(), 4);
        assert!(fit.to_string().contains("12 iterations"));
    }
}
