//! Command-line parsing for the Tmix curve fitter.
//!
//! Argument parsing and command dispatch are kept separate from the
//! modeling/math code. Numerical settings fall back to environment variables
//! (a `.env` file is loaded first), then to the defaults below.

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{ArgGroup, Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "tmix", version, about = "Miscibility transition (Tmix) fitting for vesicle counts")]
pub struct Cli {
    /// Log at debug level (overrides RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Turn per-class counts into a results table (`<stem>_results.csv`).
    Aggregate(AggregateArgs),
    /// Fit one experiment, print diagnostics, and optionally plot/export.
    Fit(FitArgs),
    /// Fit every results table under a directory and overlay the curves.
    Combine(CombineArgs),
    /// Draw synthetic counts from a known transition curve.
    Simulate(SimulateArgs),
}

/// Where an experiment's counts or percentages come from.
#[derive(Debug, Args, Clone)]
#[command(group(ArgGroup::new("source").required(true).args(["table", "counts", "annotations"])))]
pub struct SourceArgs {
    /// Results table (`,Temperatures,PercentPS`).
    #[arg(long, value_name = "CSV")]
    pub table: Option<PathBuf>,

    /// Counts table (`Temperatures,PS,MIX`).
    #[arg(long, value_name = "CSV")]
    pub counts: Option<PathBuf>,

    /// Annotation JSON with per-slice click points.
    #[arg(long, value_name = "JSON")]
    pub annotations: Option<PathBuf>,
}

/// Initial guess, optimizer budget and confidence settings.
#[derive(Debug, Args, Clone)]
pub struct ModelArgs {
    /// Initial guess for the midpoint `c`.
    #[arg(long, env = "TMIX_GUESS_C", default_value_t = 46.0, allow_negative_numbers = true)]
    pub guess_c: f64,

    /// Initial guess for the width `d` (non-zero).
    #[arg(long, env = "TMIX_GUESS_D", default_value_t = 20.0, allow_negative_numbers = true)]
    pub guess_d: f64,

    /// Initial guess for the asymptote `a`.
    #[arg(long, env = "TMIX_GUESS_A", default_value_t = 60.0, allow_negative_numbers = true)]
    pub guess_a: f64,

    /// Optimizer iteration budget.
    #[arg(long, env = "TMIX_MAX_ITER", default_value_t = 800)]
    pub max_iter: usize,

    /// Critical t value used for the band and the Tmix bounds.
    #[arg(long, env = "TMIX_T_CRIT", default_value_t = 2.093)]
    pub t_crit: f64,

    /// Minimum observations for the confidence band (never below 3).
    #[arg(long, env = "TMIX_MIN_OBS", default_value_t = 3)]
    pub min_obs: usize,
}

/// Terminal and SVG plot options.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Disable the terminal plot.
    #[arg(long)]
    pub no_plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,

    /// Write an SVG figure to this path.
    #[arg(long, value_name = "SVG")]
    pub svg: Option<PathBuf>,

    /// Leave the confidence band out of plots.
    #[arg(long)]
    pub no_band: bool,

    /// SVG font family.
    #[arg(long, default_value = "serif")]
    pub font_family: String,

    /// SVG font size.
    #[arg(long, default_value_t = 14)]
    pub font_size: u32,

    /// Per-experiment SVG colors as `#rrggbb`, comma-separated.
    #[arg(long, value_delimiter = ',')]
    pub palette: Vec<String>,

    /// SVG confidence band color as `#rrggbb`.
    #[arg(long)]
    pub band_color: Option<String>,
}

/// Options for `tmix aggregate`.
#[derive(Debug, Args)]
#[command(group(ArgGroup::new("input").required(true).args(["counts", "annotations"])))]
pub struct AggregateArgs {
    /// Counts table (`Temperatures,PS,MIX`).
    #[arg(long, value_name = "CSV")]
    pub counts: Option<PathBuf>,

    /// Annotation JSON with per-slice click points.
    #[arg(long, value_name = "JSON")]
    pub annotations: Option<PathBuf>,

    /// Output path (default: `<stem>_results.csv` next to the input).
    #[arg(long, value_name = "CSV")]
    pub out: Option<PathBuf>,
}

/// Options for `tmix fit`.
#[derive(Debug, Args)]
pub struct FitArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub plot: PlotArgs,

    /// Experiment label (default: derived from the input file name).
    #[arg(long)]
    pub label: Option<String>,

    /// Do not write `<stem>_results.csv` next to a counts/annotation input.
    #[arg(long)]
    pub no_save: bool,

    /// Export the fit (params, covariance, band) to JSON.
    #[arg(long = "export-curve", value_name = "JSON")]
    pub export_curve: Option<PathBuf>,

    /// Append the Tmix estimate to this summary CSV.
    #[arg(long, value_name = "CSV")]
    pub summary: Option<PathBuf>,

    /// Date recorded in the summary CSV (default: today).
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,
}

/// Options for `tmix combine`.
#[derive(Debug, Args)]
pub struct CombineArgs {
    /// Directory searched recursively for results tables.
    #[arg(long, value_name = "DIR")]
    pub root: PathBuf,

    #[command(flatten)]
    pub model: ModelArgs,

    #[command(flatten)]
    pub plot: PlotArgs,

    /// Append one Tmix row per experiment to this summary CSV.
    #[arg(long, value_name = "CSV")]
    pub summary: Option<PathBuf>,

    /// Date recorded in the summary CSV (default: today).
    #[arg(long, value_name = "YYYY-MM-DD")]
    pub date: Option<NaiveDate>,

    /// Print the full per-experiment summary, not just the overview table.
    #[arg(long)]
    pub detailed: bool,
}

/// Options for `tmix simulate`.
#[derive(Debug, Args)]
pub struct SimulateArgs {
    /// Generating midpoint.
    #[arg(long, default_value_t = 46.0, allow_negative_numbers = true)]
    pub c: f64,

    /// Generating width (negative: percentage rises with temperature).
    #[arg(long, default_value_t = -4.0, allow_negative_numbers = true)]
    pub d: f64,

    /// Generating asymptote.
    #[arg(long, default_value_t = 100.0, allow_negative_numbers = true)]
    pub a: f64,

    /// Temperatures to sample.
    #[arg(long, value_delimiter = ',', default_value = "30,35,40,45,50,55,60")]
    pub temps: Vec<f64>,

    /// Objects counted per temperature.
    #[arg(long, default_value_t = 100)]
    pub per_temp: u64,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Write the counts table here (default: print it).
    #[arg(long, value_name = "CSV")]
    pub out: Option<PathBuf>,
}
