//! Formatted terminal output.
//!
//! Formatting lives here so the fitting code stays free of presentation and
//! output changes are localized.

use crate::app::pipeline::PipelineFailure;
use crate::domain::{ExperimentRun, Termination};
use crate::overlay::SeriesOverlay;
use crate::report::{compute_residuals, worst_residual};

/// Full summary for one experiment: data, fit diagnostics, Tmix and residuals.
pub fn format_run_summary(run: &ExperimentRun) -> String {
    let mut out = String::new();
    let fit = &run.fit;
    let [se_c, se_d, se_a] = fit.std_errors();

    out.push_str(&format!("=== tmix - miscibility transition fit: {} ===\n", run.label));
    match run.series.temperature_range() {
        Some((lo, hi)) => out.push_str(&format!(
            "Points: n={} | T=[{lo:.2}, {hi:.2}]\n",
            run.series.len()
        )),
        None => out.push_str(&format!("Points: n={}\n", run.series.len())),
    }

    out.push_str("\nFit diagnostics:\n");
    out.push_str(&format!(
        "  SSE={:.4} RMSE={:.4} iterations={} stop={}\n",
        fit.diagnostics.sse,
        fit.diagnostics.rmse,
        fit.diagnostics.iterations,
        termination_name(fit.diagnostics.termination)
    ));

    out.push_str("\nParameters (f = a / (1 + exp(-(c - T)/d))):\n");
    out.push_str(&format!("  c (Tmix)      = {:>10.4} ± {}\n", fit.params.c, fmt_se(se_c)));
    out.push_str(&format!("  d (width)     = {:>10.4} ± {}\n", fit.params.d, fmt_se(se_d)));
    out.push_str(&format!("  a (asymptote) = {:>10.4} ± {}\n", fit.params.a, fmt_se(se_a)));

    out.push_str(&format!("\nTmix: {}\n", fmt_midpoint(run)));
    out.push_str(&format!("Band: {} grid points\n", run.band.len()));

    out.push_str("\nResiduals:\n");
    out.push_str(format!("{:>10} {:>10} {:>10} {:>10}", "T", "observed", "fitted", "residual").trim_end());
    out.push('\n');
    out.push_str(format!("{:-<10} {:-<10} {:-<10} {:-<10}", "", "", "", "").trim_end());
    out.push('\n');
    let residuals = compute_residuals(run);
    for r in &residuals {
        out.push_str(&format!(
            "{:>10.2} {:>10.2} {:>10.2} {:>10.2}\n",
            r.temperature, r.observed, r.fitted, r.residual
        ));
    }
    if let Some(worst) = worst_residual(&residuals) {
        out.push_str(&format!(
            "Largest |residual|: {:.2} at T={:.2}\n",
            worst.residual.abs(),
            worst.temperature
        ));
    }

    out
}

/// One line per experiment plus any failures.
pub fn format_overlay_summary(overlay: &SeriesOverlay, failures: &[(String, PipelineFailure)]) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "=== tmix - {} experiment(s), {} failed ===\n",
        overlay.len(),
        failures.len()
    ));
    out.push_str(
        format!(
            "{:<16} {:>4} {:>10} {:>10} {:>22} {:>10}",
            "label", "n", "Tmix", "std err", "bounds", "RMSE"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(format!("{:-<16} {:-<4} {:-<10} {:-<10} {:-<22} {:-<10}", "", "", "", "", "", "").trim_end());
    out.push('\n');

    for run in overlay {
        let bounds = match (run.midpoint.lower, run.midpoint.upper) {
            (Some(lo), Some(hi)) => format!("[{lo:.2}, {hi:.2}]"),
            _ => "n/a".to_string(),
        };
        out.push_str(&format!(
            "{:<16} {:>4} {:>10.2} {:>10} {:>22} {:>10.3}\n",
            truncate(&run.label, 16),
            run.series.len(),
            run.midpoint.temperature,
            fmt_se(run.midpoint.std_error),
            bounds,
            run.fit.diagnostics.rmse
        ));
    }

    if !failures.is_empty() {
        out.push_str("\nFailed:\n");
        for (label, failure) in failures {
            out.push_str(&format!("  {label}: {failure}\n"));
        }
    }

    out
}

fn fmt_midpoint(run: &ExperimentRun) -> String {
    let m = &run.midpoint;
    match (m.lower, m.upper) {
        (Some(lo), Some(hi)) => format!("{:.2} [{lo:.2}, {hi:.2}]", m.temperature),
        _ => format!("{:.2} (bounds undefined: parameter variance is not finite)", m.temperature),
    }
}

fn fmt_se(se: f64) -> String {
    if se.is_finite() { format!("{se:.4}") } else { "inf".to_string() }
}

fn termination_name(t: Termination) -> &'static str {
    match t {
        Termination::Gradient => "gradient",
        Termination::Step => "step",
        Termination::Objective => "objective",
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::{ExperimentInput, Stage};
    use crate::domain::{PercentageSeries, RunConfig};
    use crate::overlay::run_all;

    fn e2e_series() -> PercentageSeries {
        PercentageSeries::from_pairs(&[30.0, 40.0, 46.0, 52.0, 60.0], &[2.0, 20.0, 50.0, 80.0, 98.0]).unwrap()
    }

    #[test]
    fn run_summary_lists_parameters_and_residuals() {
        let outcome = run_all(
            vec![("exp1".to_string(), ExperimentInput::Series(e2e_series()))],
            &RunConfig::default(),
        );
        let run = &outcome.overlay.runs()[0];
        let txt = format_run_summary(run);

        assert!(txt.starts_with("=== tmix - miscibility transition fit: exp1 ===\n"));
        assert!(txt.contains("Points: n=5 | T=[30.00, 60.00]"));
        assert!(txt.contains("c (Tmix)"));
        assert!(txt.contains("Band: 31 grid points"));
        // One residual row per observation.
        assert_eq!(txt.lines().filter(|l| l.trim_start().starts_with("46.00")).count(), 1);
        assert!(txt.contains("Largest |residual|"));
    }

    #[test]
    fn overlay_summary_reports_failures() {
        let outcome = run_all(
            vec![
                ("good".to_string(), ExperimentInput::Series(e2e_series())),
                (
                    "short".to_string(),
                    ExperimentInput::Series(PercentageSeries::from_pairs(&[30.0, 60.0], &[2.0, 98.0]).unwrap()),
                ),
            ],
            &RunConfig::default(),
        );
        assert_eq!(outcome.failures[0].1.stage, Stage::Fit);

        let txt = format_overlay_summary(&outcome.overlay, &outcome.failures);
        assert!(txt.starts_with("=== tmix - 1 experiment(s), 1 failed ===\n"));
        assert!(txt.lines().any(|l| l.starts_with("good ")));
        assert!(txt.contains("  short: curve fit failed:"));
    }

    #[test]
    fn truncate_marks_cut_labels() {
        assert_eq!(truncate("abc", 16), "abc");
        assert_eq!(truncate("abcdefgh", 4), "abc.");
    }
}
