//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - temperature keys and per-class counts (`Temperature`, `VesicleClass`, `CountMap`)
//! - the percentage series that feeds the fitter (`PercentageSeries`)
//! - fit outputs (`SigmoidParams`, `FitResult`, `ConfidenceBand`, `TransitionMidpoint`)
//! - per-experiment results and run configuration (`ExperimentRun`, `RunConfig`)

pub mod types;

pub use types::*;
