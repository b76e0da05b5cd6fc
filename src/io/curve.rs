//! Write fitted-curve JSON files.
//!
//! Curve JSON is the "portable" representation of one experiment's fit:
//! - sigmoid parameters, their covariance and one-sigma errors
//! - fit diagnostics and the Tmix estimate
//! - the observations and the confidence band grid, for replotting elsewhere

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::{
    BandPoint, ExperimentRun, FitDiagnostics, PercentagePoint, SigmoidParams, TransitionMidpoint,
};
use crate::error::AppError;

/// Serialized layout of a curve JSON file.
#[derive(Debug, Clone, Serialize)]
pub struct CurveFile<'a> {
    pub tool: &'static str,
    pub generated_at: DateTime<Utc>,
    pub label: &'a str,
    pub params: SigmoidParams,
    /// `[c, d, a]`; non-finite values are written as `null`.
    pub std_errors: [f64; 3],
    pub covariance: [[f64; 3]; 3],
    pub diagnostics: &'a FitDiagnostics,
    pub midpoint: TransitionMidpoint,
    pub observations: &'a [PercentagePoint],
    pub band: &'a [BandPoint],
}

impl<'a> CurveFile<'a> {
    pub fn from_run(run: &'a ExperimentRun, generated_at: DateTime<Utc>) -> Self {
        Self {
            tool: "tmix",
            generated_at,
            label: &run.label,
            params: run.fit.params,
            std_errors: run.fit.std_errors(),
            covariance: run.fit.covariance,
            diagnostics: &run.fit.diagnostics,
            midpoint: run.midpoint,
            observations: run.series.points(),
            band: &run.band.points,
        }
    }
}

/// Write a curve JSON file for one experiment.
pub fn write_curve_json(path: &Path, run: &ExperimentRun) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create curve JSON '{}': {e}", path.display())))?;

    let curve = CurveFile::from_run(run, Utc::now());
    serde_json::to_writer_pretty(BufWriter::new(file), &curve)
        .map_err(|e| AppError::new(2, format!("Failed to write curve JSON: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::{ExperimentInput, run_experiment};
    use crate::domain::{PercentageSeries, RunConfig};

    #[test]
    fn curve_json_contains_fit_and_band() {
        let series = PercentageSeries::from_pairs(
            &[30.0, 40.0, 46.0, 52.0, 60.0],
            &[2.0, 20.0, 50.0, 80.0, 98.0],
        )
        .unwrap();
        let run = run_experiment("1", ExperimentInput::Series(series), &RunConfig::default()).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("curve.json");
        write_curve_json(&path, &run).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["tool"], "tmix");
        assert_eq!(value["label"], "1");
        assert_eq!(value["band"].as_array().unwrap().len(), 31);
        assert_eq!(value["observations"].as_array().unwrap().len(), 5);
        assert!(value["params"]["c"].as_f64().unwrap() > 45.0);
        assert_eq!(value["diagnostics"]["n_observations"], 5);
    }
}
