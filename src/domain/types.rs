//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - composed into multi-experiment overlays

use std::cmp::Ordering;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::PipelineError;
use crate::fit::{ConfidenceConfig, FitOptions};
use crate::models::sigmoid;

/// Default starting point for the fitter: inflection ≈ 46, decay rate ≈ 20,
/// asymptote ≈ 60.
///
/// These values suit the temperature range of the vacuole experiments this tool
/// was written for. They are only a default; the CLI exposes all three.
pub const DEFAULT_INITIAL_GUESS: SigmoidParams = SigmoidParams {
    c: 46.0,
    d: 20.0,
    a: 60.0,
};

/// A temperature set-point used as a map key.
///
/// `f64` is neither `Eq` nor `Hash`, so equality and ordering go through
/// `f64::total_cmp`. `-0.0` is normalized to `0.0` on construction so that both
/// compare (and hash) equal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Temperature(f64);

impl Temperature {
    pub fn new(value: f64) -> Self {
        if value == 0.0 {
            Self(0.0)
        } else {
            Self(value)
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl From<f64> for Temperature {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl From<i32> for Temperature {
    fn from(value: i32) -> Self {
        Self::new(f64::from(value))
    }
}

impl PartialEq for Temperature {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Temperature {}

impl PartialOrd for Temperature {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Temperature {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl Hash for Temperature {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl std::fmt::Display for Temperature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The two mutually exclusive vesicle classes counted in each micrograph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VesicleClass {
    PhaseSeparated,
    Mixed,
}

impl VesicleClass {
    pub fn display_name(self) -> &'static str {
        match self {
            VesicleClass::PhaseSeparated => "phase-separated",
            VesicleClass::Mixed => "mixed",
        }
    }
}

/// Number of objects of one class observed at one temperature.
pub type ClassCount = u64;

/// Temperature → count for a single class. Key order carries no meaning.
pub type CountMap = HashMap<Temperature, ClassCount>;

/// One observation: percentage of phase-separated vesicles at a temperature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentagePoint {
    pub temperature: f64,
    pub percentage: f64,
}

/// Percentage-vs-temperature observations, sorted ascending by temperature.
///
/// Construction validates every point, so holders of a `PercentageSeries` can
/// rely on finite temperatures and percentages within `[0, 100]`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PercentageSeries {
    points: Vec<PercentagePoint>,
}

impl PercentageSeries {
    pub fn new(mut points: Vec<PercentagePoint>) -> Result<Self, PipelineError> {
        for p in &points {
            if !p.temperature.is_finite() {
                return Err(PipelineError::domain(format!(
                    "Non-finite temperature {} in percentage series.",
                    p.temperature
                )));
            }
            if !(p.percentage.is_finite() && (0.0..=100.0).contains(&p.percentage)) {
                return Err(PipelineError::domain(format!(
                    "Percentage {} at temperature {} is outside [0, 100].",
                    p.percentage, p.temperature
                )));
            }
        }

        // Stable, so duplicate temperatures keep their input order.
        points.sort_by(|a, b| a.temperature.total_cmp(&b.temperature));
        Ok(Self { points })
    }

    /// Build a series from parallel temperature/percentage slices.
    pub fn from_pairs(temperatures: &[f64], percentages: &[f64]) -> Result<Self, PipelineError> {
        if temperatures.len() != percentages.len() {
            return Err(PipelineError::domain(format!(
                "Temperature and percentage columns differ in length ({} vs {}).",
                temperatures.len(),
                percentages.len()
            )));
        }
        let points = temperatures
            .iter()
            .zip(percentages)
            .map(|(&temperature, &percentage)| PercentagePoint {
                temperature,
                percentage,
            })
            .collect();
        Self::new(points)
    }

    pub fn points(&self) -> &[PercentagePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn temperatures(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.temperature).collect()
    }

    pub fn percentages(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.percentage).collect()
    }

    /// Number of distinct temperature values.
    pub fn distinct_temperatures(&self) -> usize {
        let mut count = 0usize;
        let mut prev: Option<f64> = None;
        for p in &self.points {
            if prev != Some(p.temperature) {
                count += 1;
            }
            prev = Some(p.temperature);
        }
        count
    }

    /// `(min, max)` temperature, or `None` for an empty series.
    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        let first = self.points.first()?;
        let last = self.points.last()?;
        Some((first.temperature, last.temperature))
    }
}

/// Parameters of the decaying sigmoid `a · (1 − 1/(1 + exp(−(x − c)/d)))`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SigmoidParams {
    /// Inflection (half-transition) temperature, a.k.a. Tmix.
    pub c: f64,
    /// Decay rate. Positive values give a curve that falls with temperature.
    pub d: f64,
    /// Asymptote.
    pub a: f64,
}

impl SigmoidParams {
    pub const fn new(c: f64, d: f64, a: f64) -> Self {
        Self { c, d, a }
    }

    pub fn eval(&self, x: f64) -> f64 {
        sigmoid(x, self.c, self.d, self.a)
    }

    pub fn is_finite(&self) -> bool {
        self.c.is_finite() && self.d.is_finite() && self.a.is_finite()
    }
}

/// Why the optimizer stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Gradient of the objective fell below `gtol`.
    Gradient,
    /// Parameter step fell below `xtol` relative to the parameters.
    Step,
    /// Relative reduction of the objective fell below `ftol`.
    Objective,
}

/// Fit quality diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitDiagnostics {
    pub sse: f64,
    pub rmse: f64,
    pub n_observations: usize,
    pub iterations: usize,
    pub termination: Termination,
}

/// Output of a successful sigmoid fit.
///
/// `covariance` rows/columns are ordered `(c, d, a)`.
#[derive(Debug, Clone, Serialize)]
pub struct FitResult {
    pub params: SigmoidParams,
    pub covariance: [[f64; 3]; 3],
    pub diagnostics: FitDiagnostics,
}

impl FitResult {
    /// One-sigma parameter uncertainties, `sqrt(diag(covariance))`.
    pub fn std_errors(&self) -> [f64; 3] {
        [
            self.covariance[0][0].sqrt(),
            self.covariance[1][1].sqrt(),
            self.covariance[2][2].sqrt(),
        ]
    }
}

/// One grid point of a confidence band.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BandPoint {
    pub temperature: f64,
    pub predicted: f64,
    pub upper: f64,
    pub lower: f64,
}

/// Upper/lower envelope around a fitted curve on a unit-step temperature grid.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConfidenceBand {
    pub points: Vec<BandPoint>,
}

impl ConfidenceBand {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Transition midpoint (Tmix) estimate with covariance-based bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TransitionMidpoint {
    pub temperature: f64,
    pub std_error: f64,
    /// `None` when the variance of `c` is not finite (e.g. exactly 3 observations).
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

/// Complete pipeline output for one experiment.
#[derive(Debug, Clone, Serialize)]
pub struct ExperimentRun {
    pub label: String,
    pub series: PercentageSeries,
    pub fit: FitResult,
    pub band: ConfidenceBand,
    pub midpoint: TransitionMidpoint,
}

/// A full run's numerical configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus environment and defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub initial_guess: SigmoidParams,
    pub fit: FitOptions,
    pub confidence: ConfidenceConfig,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            initial_guess: DEFAULT_INITIAL_GUESS,
            fit: FitOptions::default(),
            confidence: ConfidenceConfig::default(),
        }
    }
}
