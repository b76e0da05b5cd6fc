//! Multi-experiment overlay.
//!
//! `SeriesOverlay` is an ordered collection of complete per-experiment results
//! kept together for joint presentation (plots, summary tables). It performs no
//! math of its own beyond extents for axis bounds.
//!
//! `run_all` computes several experiments in parallel. Each pipeline run is pure
//! given its inputs, so no state is shared between workers.

use rayon::prelude::*;

use crate::app::pipeline::{ExperimentInput, PipelineFailure, run_experiment};
use crate::domain::{ExperimentRun, RunConfig};
use crate::math::finite_range;

#[derive(Debug, Clone, Default)]
pub struct SeriesOverlay {
    runs: Vec<ExperimentRun>,
}

impl SeriesOverlay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an experiment. Labels are caller-assigned and not checked for uniqueness.
    pub fn push(&mut self, run: ExperimentRun) {
        self.runs.push(run);
    }

    pub fn runs(&self) -> &[ExperimentRun] {
        &self.runs
    }

    pub fn len(&self) -> usize {
        self.runs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// First experiment carrying `label`.
    pub fn get(&self, label: &str) -> Option<&ExperimentRun> {
        self.runs.iter().find(|r| r.label == label)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ExperimentRun> {
        self.runs.iter()
    }

    /// Temperature extent over all observations.
    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        let temps: Vec<f64> = self
            .runs
            .iter()
            .flat_map(|r| r.series.points().iter().map(|p| p.temperature))
            .collect();
        finite_range(&temps)
    }

    /// Value extent over observations and band envelopes.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut values = Vec::new();
        for run in &self.runs {
            values.extend(run.series.points().iter().map(|p| p.percentage));
            for b in &run.band.points {
                values.push(b.upper);
                values.push(b.lower);
            }
        }
        finite_range(&values)
    }
}

impl<'a> IntoIterator for &'a SeriesOverlay {
    type Item = &'a ExperimentRun;
    type IntoIter = std::slice::Iter<'a, ExperimentRun>;

    fn into_iter(self) -> Self::IntoIter {
        self.runs.iter()
    }
}

impl FromIterator<ExperimentRun> for SeriesOverlay {
    fn from_iter<I: IntoIterator<Item = ExperimentRun>>(iter: I) -> Self {
        Self {
            runs: iter.into_iter().collect(),
        }
    }
}

/// Outcome of a parallel overlay run.
#[derive(Debug, Clone)]
pub struct OverlayOutcome {
    /// Successful experiments, in input order.
    pub overlay: SeriesOverlay,
    /// Failed experiments as `(label, failure)`, in input order.
    pub failures: Vec<(String, PipelineFailure)>,
}

/// Run the pipeline for every `(label, input)` pair in parallel.
///
/// A failing experiment does not affect the others.
pub fn run_all(inputs: Vec<(String, ExperimentInput)>, config: &RunConfig) -> OverlayOutcome {
    let results: Vec<(String, Result<ExperimentRun, PipelineFailure>)> = inputs
        .into_par_iter()
        .map(|(label, input)| {
            let result = run_experiment(&label, input, config);
            (label, result)
        })
        .collect();

    let mut overlay = SeriesOverlay::new();
    let mut failures = Vec::new();
    for (label, result) in results {
        match result {
            Ok(run) => overlay.push(run),
            Err(failure) => failures.push((label, failure)),
        }
    }

    OverlayOutcome { overlay, failures }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::Stage;
    use crate::domain::{PercentageSeries, SigmoidParams};

    fn series_from(params: SigmoidParams) -> PercentageSeries {
        let temps = [25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0];
        let ys: Vec<f64> = temps.iter().map(|&t| params.eval(t)).collect();
        PercentageSeries::from_pairs(&temps, &ys).unwrap()
    }

    #[test]
    fn run_all_keeps_input_order_and_isolates_failures() {
        let inputs = vec![
            ("1".to_string(), ExperimentInput::Series(series_from(SigmoidParams::new(46.0, 20.0, 60.0)))),
            (
                "2".to_string(),
                ExperimentInput::Series(PercentageSeries::from_pairs(&[30.0, 40.0], &[10.0, 20.0]).unwrap()),
            ),
            ("3".to_string(), ExperimentInput::Series(series_from(SigmoidParams::new(44.0, 18.0, 58.0)))),
        ];

        let outcome = run_all(inputs, &RunConfig::default());
        let labels: Vec<&str> = outcome.overlay.iter().map(|r| r.label.as_str()).collect();
        assert_eq!(labels, vec!["1", "3"]);

        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, "2");
        assert_eq!(outcome.failures[0].1.stage, Stage::Fit);

        let third = outcome.overlay.get("3").unwrap();
        assert!((third.fit.params.c - 44.0).abs() < 1e-3);
    }

    #[test]
    fn extents_cover_all_experiments() {
        let outcome = run_all(
            vec![
                ("a".to_string(), ExperimentInput::Series(series_from(SigmoidParams::new(46.0, 20.0, 60.0)))),
                ("b".to_string(), ExperimentInput::Series(series_from(SigmoidParams::new(40.0, 10.0, 90.0)))),
            ],
            &RunConfig::default(),
        );
        let overlay = outcome.overlay;
        assert_eq!(overlay.len(), 2);
        assert_eq!(overlay.temperature_range(), Some((25.0, 60.0)));

        let (lo, hi) = overlay.value_range().unwrap();
        assert!(lo <= SigmoidParams::new(40.0, 10.0, 90.0).eval(60.0));
        assert!(hi >= SigmoidParams::new(40.0, 10.0, 90.0).eval(25.0));
    }
}
