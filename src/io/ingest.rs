//! Loading raw count data.
//!
//! Two sources are supported, both produced by the annotation step:
//!
//! - a counts table with one row per temperature:
//!
//!   ```text
//!   Temperatures,PS,MIX
//!   30,2,98
//!   40,20,80
//!   ```
//!
//!   An empty cell means that class has no entry for the temperature. The
//!   mismatch is reported by aggregation, not here.
//!
//! - an annotation JSON file (`AnnotationSet`) holding per-slice click points.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use csv::StringRecord;

use crate::data::AnnotationSet;
use crate::domain::{ClassCount, CountMap, Temperature};
use crate::error::AppError;
use crate::io::table::{TEMPERATURE_COLUMN, build_header_map, required_column};

pub const PS_COLUMN: &str = "PS";
pub const MIX_COLUMN: &str = "MIX";

/// Per-class count maps loaded from a counts table.
#[derive(Debug, Clone, Default)]
pub struct LoadedCounts {
    pub phase_separated: CountMap,
    pub mixed: CountMap,
}

/// Load a counts table.
pub fn read_counts_table(path: &Path) -> Result<LoadedCounts, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open counts CSV '{}': {e}", path.display())))?;

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
    let ps_idx = required_column(&header_map, PS_COLUMN, path)?;
    let mix_idx = required_column(&header_map, MIX_COLUMN, path)?;

    let mut out = LoadedCounts::default();
    for (idx, result) in reader.records().enumerate() {
        let line = idx + 2;
        let record = result.map_err(|e| AppError::new(2, format!("CSV parse error at line {line}: {e}")))?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let raw_t = record.get(t_idx).unwrap_or("");
        let t: f64 = raw_t
            .parse()
            .map_err(|_| AppError::new(2, format!("Line {line}: invalid temperature '{raw_t}'.")))?;
        let key = Temperature::new(t);

        if let Some(count) = parse_count(&record, ps_idx, PS_COLUMN, line)? {
            *out.phase_separated.entry(key).or_default() += count;
        }
        if let Some(count) = parse_count(&record, mix_idx, MIX_COLUMN, line)? {
            *out.mixed.entry(key).or_default() += count;
        }
    }

    Ok(out)
}

fn parse_count(
    record: &StringRecord,
    idx: usize,
    column: &str,
    line: usize,
) -> Result<Option<ClassCount>, AppError> {
    let raw = record.get(idx).unwrap_or("");
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<ClassCount>().map(Some).map_err(|_| {
        AppError::new(
            2,
            format!("Line {line}: `{column}` must be a non-negative integer, got '{raw}'."),
        )
    })
}

/// Load an annotation JSON file.
pub fn read_annotations(path: &Path) -> Result<AnnotationSet, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open annotations '{}': {e}", path.display())))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| AppError::new(2, format!("Invalid annotations JSON '{}': {e}", path.display())))
}

/// Write per-class counts as a counts table, ascending by temperature.
pub fn write_counts_table(path: &Path, phase_separated: &CountMap, mixed: &CountMap) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create counts CSV '{}': {e}", path.display())))?;
    let mut writer = csv::Writer::from_writer(file);

    writer
        .write_record([TEMPERATURE_COLUMN, PS_COLUMN, MIX_COLUMN])
        .map_err(|e| AppError::new(2, format!("Failed to write counts CSV header: {e}")))?;

    let mut keys: Vec<Temperature> = phase_separated.keys().chain(mixed.keys()).copied().collect();
    keys.sort();
    keys.dedup();

    let cell = |map: &CountMap, t: &Temperature| map.get(t).map(|c| c.to_string()).unwrap_or_default();
    for t in &keys {
        writer
            .write_record([t.to_string(), cell(phase_separated, t), cell(mixed, t)])
            .map_err(|e| AppError::new(2, format!("Failed to write counts CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush counts CSV: {e}")))?;
    Ok(())
}
