//! Shared "experiment pipeline" logic used by every CLI command.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! counts -> percentage series -> sigmoid fit -> confidence band + Tmix
//!
//! A failure names the stage that stopped the run and keeps whatever was
//! already computed (the percentage series once aggregation succeeded), so the
//! caller can still inspect or export it.

use tracing::{info, info_span};

use crate::data::{AnnotationSet, aggregate};
use crate::domain::{CountMap, ExperimentRun, PercentageSeries, RunConfig};
use crate::error::{AppError, PipelineError};
use crate::fit::{estimate_band, fit_sigmoid, transition_midpoint};

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Aggregate,
    Fit,
    Confidence,
}

impl Stage {
    pub fn display_name(self) -> &'static str {
        match self {
            Stage::Aggregate => "aggregation",
            Stage::Fit => "curve fit",
            Stage::Confidence => "confidence band",
        }
    }
}

/// Where an experiment's data enters the pipeline.
#[derive(Debug, Clone)]
pub enum ExperimentInput {
    /// Raw per-class counts.
    Counts {
        phase_separated: CountMap,
        mixed: CountMap,
    },
    /// Annotated click coordinates.
    Annotations(AnnotationSet),
    /// An already aggregated series (e.g. a saved results table).
    Series(PercentageSeries),
}

/// A stopped pipeline run.
#[derive(Debug, Clone)]
pub struct PipelineFailure {
    pub stage: Stage,
    pub error: PipelineError,
    /// The aggregated series, when aggregation had completed.
    pub series: Option<PercentageSeries>,
}

impl std::fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} failed: {}", self.stage.display_name(), self.error)
    }
}

impl std::error::Error for PipelineFailure {}

impl From<PipelineFailure> for AppError {
    fn from(failure: PipelineFailure) -> Self {
        AppError::new(failure.error.exit_code(), failure.to_string())
    }
}

/// Run aggregation (if needed), fitting and confidence estimation for one experiment.
pub fn run_experiment(
    label: &str,
    input: ExperimentInput,
    config: &RunConfig,
) -> Result<ExperimentRun, PipelineFailure> {
    let _span = info_span!("experiment", label).entered();

    let series = match input {
        ExperimentInput::Series(series) => series,
        ExperimentInput::Counts {
            phase_separated,
            mixed,
        } => aggregate(&phase_separated, &mixed).map_err(|error| PipelineFailure {
            stage: Stage::Aggregate,
            error,
            series: None,
        })?,
        ExperimentInput::Annotations(set) => set.aggregate().map_err(|error| PipelineFailure {
            stage: Stage::Aggregate,
            error,
            series: None,
        })?,
    };
    info!(points = series.len(), "percentage series ready");

    let fit = match fit_sigmoid(&series, config.initial_guess, &config.fit) {
        Ok(fit) => fit,
        Err(error) => {
            return Err(PipelineFailure {
                stage: Stage::Fit,
                error,
                series: Some(series),
            });
        }
    };
    info!(
        c = fit.params.c,
        d = fit.params.d,
        a = fit.params.a,
        iterations = fit.diagnostics.iterations,
        "sigmoid fitted"
    );

    let band = match estimate_band(&series, &fit, &config.confidence) {
        Ok(band) => band,
        Err(error) => {
            return Err(PipelineFailure {
                stage: Stage::Confidence,
                error,
                series: Some(series),
            });
        }
    };
    let midpoint = transition_midpoint(&fit, &config.confidence);
    info!(tmix = midpoint.temperature, grid_points = band.len(), "confidence band ready");

    Ok(ExperimentRun {
        label: label.to_string(),
        series,
        fit,
        band,
        midpoint,
    })
}
