//! The flat temperature/percentage results table.
//!
//! Format (one row per temperature, ascending):
//!
//! ```text
//! ,Temperatures,PercentPS
//! 0,30,2
//! 1,40,20
//! ```
//!
//! The leading unnamed column is a 0-based row index. On read it is optional,
//! column names are matched case-insensitively, and a UTF-8 BOM is ignored.

use std::collections::HashMap;
use std::fs::File;
use std::path::{Path, PathBuf};

use csv::StringRecord;

use crate::domain::PercentageSeries;
use crate::error::AppError;

pub const TEMPERATURE_COLUMN: &str = "Temperatures";
pub const PERCENT_COLUMN: &str = "PercentPS";

/// Suffix appended to the source stack's base name for the results table.
pub const RESULTS_SUFFIX: &str = "_results.csv";

/// `<dir>/<stem>_results.csv` for a source file `<dir>/<stem>.<ext>`.
pub fn results_path_for(source: &Path) -> PathBuf {
    let stem = source
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    source.with_file_name(format!("{stem}{RESULTS_SUFFIX}"))
}

/// Write a series as a results table.
pub fn write_results_table(path: &Path, series: &PercentageSeries) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create results CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record(["", TEMPERATURE_COLUMN, PERCENT_COLUMN])
        .map_err(|e| AppError::new(2, format!("Failed to write results CSV header: {e}")))?;

    for (idx, p) in series.points().iter().enumerate() {
        writer
            .write_record([idx.to_string(), p.temperature.to_string(), p.percentage.to_string()])
            .map_err(|e| AppError::new(2, format!("Failed to write results CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush results CSV: {e}")))?;
    Ok(())
}

/// Read a results table into a (sorted) series.
pub fn read_results_table(path: &Path) -> Result<PercentageSeries, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open results CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers in '{}': {e}", path.display())))?
        .clone();
    let header_map = build_header_map(&headers);

    let t_idx = required_column(&header_map, TEMPERATURE_COLUMN, path)?;
    let p_idx = required_column(&header_map, PERCENT_COLUMN, path)?;

    let mut temperatures = Vec::new();
    let mut percentages = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // +2: records start after the header line, and lines are 1-based.
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("CSV parse error at line {line}: {e}")))?;
        if record.iter().all(str::is_empty) {
            continue;
        }
        temperatures.push(parse_f64(&record, t_idx, TEMPERATURE_COLUMN, line)?);
        percentages.push(parse_f64(&record, p_idx, PERCENT_COLUMN, line)?);
    }

    Ok(PercentageSeries::from_pairs(&temperatures, &percentages)?)
}

pub(crate) fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports sometimes prefix the first header with a BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

pub(crate) fn required_column(
    header_map: &HashMap<String, usize>,
    name: &str,
    path: &Path,
) -> Result<usize, AppError> {
    header_map
        .get(&name.to_ascii_lowercase())
        .copied()
        .ok_or_else(|| {
            AppError::new(
                2,
                format!("Missing required column `{name}` in '{}'.", path.display()),
            )
        })
}

fn parse_f64(record: &StringRecord, idx: usize, column: &str, line: usize) -> Result<f64, AppError> {
    let raw = record.get(idx).unwrap_or("");
    raw.parse::<f64>()
        .map_err(|_| AppError::new(2, format!("Line {line}: invalid `{column}` value '{raw}'.")))
}
