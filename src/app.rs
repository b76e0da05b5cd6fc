//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - initializes logging
//! - loads counts or results tables
//! - runs the aggregation/fit/confidence pipeline
//! - prints reports/plots
//! - writes optional exports

use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{AggregateArgs, CombineArgs, Command, FitArgs, ModelArgs, PlotArgs, SimulateArgs, SourceArgs};
use crate::data::{SyntheticConfig, simulate_counts};
use crate::domain::{PercentageSeries, RunConfig, SigmoidParams, Temperature};
use crate::error::AppError;
use crate::fit::{ConfidenceConfig, FitOptions};
use crate::io;
use crate::overlay::{SeriesOverlay, run_all};
use crate::plot::{PlotStyle, Rgb, render_ascii_overlay, render_svg_overlay};
use crate::report::{format_overlay_summary, format_run_summary};

use self::pipeline::{ExperimentInput, run_experiment};

pub mod pipeline;

/// Entry point for the `tmix` binary.
pub fn run() -> Result<(), AppError> {
    // Before parsing so `env` fallbacks see values from `.env`.
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Aggregate(args) => handle_aggregate(args),
        Command::Fit(args) => handle_fit(args),
        Command::Combine(args) => handle_combine(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("tmix_curves=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("tmix_curves=info"))
    };
    // Logs go to stderr so reports on stdout stay pipeable.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_aggregate(args: AggregateArgs) -> Result<(), AppError> {
    let (source, series) = match (&args.counts, &args.annotations) {
        (Some(path), _) => {
            let counts = io::read_counts_table(path)?;
            (path, crate::data::aggregate(&counts.phase_separated, &counts.mixed)?)
        }
        (None, Some(path)) => (path, io::read_annotations(path)?.aggregate()?),
        (None, None) => return Err(AppError::new(2, "Either --counts or --annotations is required.")),
    };

    let out = args.out.clone().unwrap_or_else(|| io::results_path_for(source));
    io::write_results_table(&out, &series)?;
    info!(points = series.len(), path = %out.display(), "results table written");

    for p in series.points() {
        println!("{:>8.2} {:>8.2}", p.temperature, p.percentage);
    }
    Ok(())
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.model)?;
    let (path, input) = load_source(&args.source)?;
    let label = args.label.clone().unwrap_or_else(|| io::experiment_label(&path));
    let save_to = match &input {
        ExperimentInput::Series(_) => None,
        _ if args.no_save => None,
        _ => Some(io::results_path_for(&path)),
    };

    let run = match run_experiment(&label, input, &config) {
        Ok(run) => run,
        Err(failure) => {
            // The aggregated table is still worth keeping when the fit fails.
            if let (Some(out), Some(series)) = (&save_to, &failure.series) {
                io::write_results_table(out, series)?;
                warn!(path = %out.display(), "fit failed; results table written anyway");
            }
            return Err(failure.into());
        }
    };

    if let Some(out) = &save_to {
        io::write_results_table(out, &run.series)?;
        info!(path = %out.display(), "results table written");
    }

    println!("{}", format_run_summary(&run));

    let overlay: SeriesOverlay = std::iter::once(run).collect();
    emit_plots(&overlay, &args.plot)?;

    let Some(run) = overlay.runs().first() else {
        return Ok(());
    };
    if let Some(path) = &args.export_curve {
        io::write_curve_json(path, run)?;
        info!(path = %path.display(), "curve exported");
    }
    if let Some(path) = &args.summary {
        io::append_tmix_summary(path, summary_date(args.date), overlay.runs())?;
        info!(path = %path.display(), "Tmix summary appended");
    }

    Ok(())
}

fn handle_combine(args: CombineArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args.model)?;
    let files = io::find_results_files(&args.root)?;
    if files.is_empty() {
        return Err(AppError::new(
            2,
            format!("No results tables found under '{}'.", args.root.display()),
        ));
    }
    info!(count = files.len(), root = %args.root.display(), "results tables found");

    let mut inputs = Vec::with_capacity(files.len());
    for path in &files {
        // Other CSVs (counts tables, summaries) may share the directory.
        match io::read_results_table(path) {
            Ok(series) => inputs.push((io::experiment_label(path), ExperimentInput::Series(series))),
            Err(e) => warn!(path = %path.display(), "skipping: {e}"),
        }
    }
    if inputs.is_empty() {
        return Err(AppError::new(
            2,
            format!("No readable results tables under '{}'.", args.root.display()),
        ));
    }

    let outcome = run_all(inputs, &config);
    for (label, failure) in &outcome.failures {
        warn!(label = %label, "{failure}");
    }

    if args.detailed {
        for run in &outcome.overlay {
            println!("{}", format_run_summary(run));
        }
    }
    println!("{}", format_overlay_summary(&outcome.overlay, &outcome.failures));

    if outcome.overlay.is_empty() {
        return Err(AppError::new(4, "Every experiment failed; nothing to plot."));
    }
    emit_plots(&outcome.overlay, &args.plot)?;

    if let Some(path) = &args.summary {
        io::append_tmix_summary(path, summary_date(args.date), outcome.overlay.runs())?;
        info!(path = %path.display(), rows = outcome.overlay.len(), "Tmix summary appended");
    }

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let config = SyntheticConfig {
        params: SigmoidParams::new(args.c, args.d, args.a),
        temperatures: args.temps.clone(),
        objects_per_temperature: args.per_temp,
        seed: args.seed,
    };
    let counts = simulate_counts(&config)?;

    match &args.out {
        Some(path) => {
            io::write_counts_table(path, &counts.phase_separated, &counts.mixed)?;
            info!(path = %path.display(), temperatures = config.temperatures.len(), "synthetic counts written");
        }
        None => {
            let series = crate::data::aggregate(&counts.phase_separated, &counts.mixed)?;
            println!("{:>8} {:>8} {:>8} {:>8}", "T", "PS", "MIX", "%PS");
            for p in series.points() {
                let key = Temperature::new(p.temperature);
                println!(
                    "{:>8.2} {:>8} {:>8} {:>8.2}",
                    p.temperature,
                    counts.phase_separated.get(&key).copied().unwrap_or_default(),
                    counts.mixed.get(&key).copied().unwrap_or_default(),
                    p.percentage
                );
            }
        }
    }
    Ok(())
}

/// Load the single input named by `source`, returning its path and pipeline input.
fn load_source(source: &SourceArgs) -> Result<(PathBuf, ExperimentInput), AppError> {
    if let Some(path) = &source.table {
        let series: PercentageSeries = io::read_results_table(path)?;
        return Ok((path.clone(), ExperimentInput::Series(series)));
    }
    if let Some(path) = &source.counts {
        let counts = io::read_counts_table(path)?;
        return Ok((
            path.clone(),
            ExperimentInput::Counts {
                phase_separated: counts.phase_separated,
                mixed: counts.mixed,
            },
        ));
    }
    if let Some(path) = &source.annotations {
        return Ok((path.clone(), ExperimentInput::Annotations(io::read_annotations(path)?)));
    }
    Err(AppError::new(2, "One of --table, --counts or --annotations is required."))
}

fn emit_plots(overlay: &SeriesOverlay, args: &PlotArgs) -> Result<(), AppError> {
    let style = plot_style_from_args(args)?;
    if !args.no_plot {
        println!("{}", render_ascii_overlay(overlay, &style));
    }
    if let Some(path) = &args.svg {
        render_svg_overlay(path, overlay, &style)?;
        info!(path = %path.display(), "SVG written");
    }
    Ok(())
}

fn summary_date(date: Option<NaiveDate>) -> NaiveDate {
    date.unwrap_or_else(|| Local::now().date_naive())
}

pub fn plot_style_from_args(args: &PlotArgs) -> Result<PlotStyle, AppError> {
    let parse = |hex: &str| {
        Rgb::from_hex(hex).ok_or_else(|| AppError::new(3, format!("Invalid color '{hex}', expected #rrggbb.")))
    };

    let mut style = PlotStyle {
        font_family: args.font_family.clone(),
        font_size: args.font_size,
        show_band: !args.no_band,
        ascii_width: args.width,
        ascii_height: args.height,
        ..PlotStyle::default()
    };
    if !args.palette.is_empty() {
        style.palette = args.palette.iter().map(|h| parse(h.as_str())).collect::<Result<_, _>>()?;
    }
    if let Some(hex) = &args.band_color {
        style.band_color = parse(hex.as_str())?;
    }
    Ok(style)
}

/// Collect numeric CLI/env settings into a validated `RunConfig`.
pub fn run_config_from_args(args: &ModelArgs) -> Result<RunConfig, AppError> {
    let initial_guess = SigmoidParams::new(args.guess_c, args.guess_d, args.guess_a);
    if !initial_guess.is_finite() || initial_guess.d == 0.0 {
        return Err(AppError::new(3, "Initial guess must be finite with a non-zero --guess-d."));
    }
    if args.max_iter == 0 {
        return Err(AppError::new(3, "--max-iter must be > 0."));
    }
    if !(args.t_crit.is_finite() && args.t_crit > 0.0) {
        return Err(AppError::new(3, "--t-crit must be positive and finite."));
    }

    Ok(RunConfig {
        initial_guess,
        fit: FitOptions {
            max_iterations: args.max_iter,
            ..FitOptions::default()
        },
        confidence: ConfidenceConfig {
            t_crit: args.t_crit,
            min_observations: args.min_obs,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Cli, Command};

    fn model_args(extra: &[&str]) -> ModelArgs {
        let mut argv = vec!["tmix", "fit", "--table", "x.csv"];
        argv.extend_from_slice(extra);
        match Cli::try_parse_from(argv).unwrap().command {
            Command::Fit(args) => args.model,
            other => panic!("expected fit, got {other:?}"),
        }
    }

    #[test]
    fn run_config_carries_cli_values() {
        let config = run_config_from_args(&model_args(&[
            "--guess-c", "40", "--guess-d", "-5", "--max-iter", "50", "--t-crit", "1.96", "--min-obs", "6",
        ]))
        .unwrap();
        assert_eq!(config.initial_guess, SigmoidParams::new(40.0, -5.0, 60.0));
        assert_eq!(config.fit.max_iterations, 50);
        assert_eq!(config.confidence.t_crit, 1.96);
        assert_eq!(config.confidence.min_observations, 6);
    }

    #[test]
    fn run_config_rejects_bad_values() {
        assert_eq!(run_config_from_args(&model_args(&["--guess-d", "0"])).unwrap_err().exit_code(), 3);
        assert!(run_config_from_args(&model_args(&["--max-iter", "0"])).is_err());
        assert!(run_config_from_args(&model_args(&["--t-crit", "-1"])).is_err());
    }

    #[test]
    fn load_source_reads_counts_tables() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.csv");
        std::fs::write(&path, "Temperatures,PS,MIX\n30,2,98\n40,20,80\n").unwrap();

        let source = SourceArgs {
            table: None,
            counts: Some(path.clone()),
            annotations: None,
        };
        let (loaded_path, input) = load_source(&source).unwrap();
        assert_eq!(loaded_path, path);
        match input {
            ExperimentInput::Counts { phase_separated, mixed } => {
                assert_eq!(phase_separated[&Temperature::new(40.0)], 20);
                assert_eq!(mixed[&Temperature::new(30.0)], 98);
            }
            other => panic!("expected counts, got {other:?}"),
        }
    }

    #[test]
    fn plot_style_follows_flags() {
        let cli = Cli::try_parse_from(["tmix", "fit", "--table", "x.csv", "--no-band", "--width", "60"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let style = plot_style_from_args(&args.plot).unwrap();
        assert!(!style.show_band);
        assert_eq!(style.ascii_width, 60);
        assert_eq!(style.font_family, "serif");

        let cli = Cli::try_parse_from(["tmix", "fit", "--table", "x.csv", "--palette", "#000000,#ffffff"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        let style = plot_style_from_args(&args.plot).unwrap();
        assert_eq!(style.palette, vec![Rgb(0, 0, 0), Rgb(255, 255, 255)]);

        let cli = Cli::try_parse_from(["tmix", "fit", "--table", "x.csv", "--band-color", "teal"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(plot_style_from_args(&args.plot).unwrap_err().exit_code(), 3);
    }
}
