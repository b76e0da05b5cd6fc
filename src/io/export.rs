//! Tmix summary table.
//!
//! One row per experiment, keyed by the experiment date and label:
//!
//! ```text
//! Date,Label,Tmix,StdErr,Lower,Upper,Asymptote,Rate
//! ```
//!
//! Rows are appended, so repeated runs build up a history in one file. The
//! header is written only when the file is new or empty.

use std::fs::OpenOptions;
use std::path::Path;

use chrono::NaiveDate;

use crate::domain::ExperimentRun;
use crate::error::AppError;

const SUMMARY_HEADER: [&str; 8] = ["Date", "Label", "Tmix", "StdErr", "Lower", "Upper", "Asymptote", "Rate"];

/// Append Tmix rows for `runs` to the summary CSV at `path`.
pub fn append_tmix_summary<'a>(
    path: &Path,
    date: NaiveDate,
    runs: impl IntoIterator<Item = &'a ExperimentRun>,
) -> Result<(), AppError> {
    let is_new = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open summary CSV '{}': {e}", path.display())))?;
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    if is_new {
        writer
            .write_record(SUMMARY_HEADER)
            .map_err(|e| AppError::new(2, format!("Failed to write summary CSV header: {e}")))?;
    }

    let opt = |v: Option<f64>| v.map(|v| format!("{v:.4}")).unwrap_or_default();
    for run in runs {
        let m = &run.midpoint;
        let std_err = if m.std_error.is_finite() {
            format!("{:.4}", m.std_error)
        } else {
            String::new()
        };
        writer
            .write_record([
                date.to_string(),
                run.label.clone(),
                format!("{:.4}", m.temperature),
                std_err,
                opt(m.lower),
                opt(m.upper),
                format!("{:.4}", run.fit.params.a),
                format!("{:.4}", run.fit.params.d),
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write summary CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush summary CSV: {e}")))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::pipeline::{ExperimentInput, run_experiment};
    use crate::domain::{PercentageSeries, RunConfig, SigmoidParams};

    fn run(label: &str) -> ExperimentRun {
        let truth = SigmoidParams::new(46.0, 20.0, 60.0);
        let temps = [25.0, 30.0, 35.0, 40.0, 45.0, 50.0, 55.0, 60.0];
        let ys: Vec<f64> = temps.iter().map(|&t| truth.eval(t)).collect();
        let series = PercentageSeries::from_pairs(&temps, &ys).unwrap();
        run_experiment(label, ExperimentInput::Series(series), &RunConfig::default()).unwrap()
    }

    #[test]
    fn appends_rows_with_a_single_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tmix.csv");
        let date = NaiveDate::from_ymd_opt(2019, 4, 18).unwrap();

        append_tmix_summary(&path, date, [&run("1")]).unwrap();
        append_tmix_summary(&path, date, [&run("2")]).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Date,Label,Tmix,StdErr,Lower,Upper,Asymptote,Rate");
        assert!(lines[1].starts_with("2019-04-18,1,46.0000,"));
        assert!(lines[2].starts_with("2019-04-18,2,46.0000,"));
    }
}
