//! Discovery of saved results tables for multi-experiment comparison.
//!
//! Results tables are found recursively under a root directory. Each file is
//! one experiment; its label comes from the file name, e.g.
//! `20190418_Exp1results_2.csv` is experiment `2`.

use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

use crate::error::AppError;

/// All `*.csv` files under `root`, sorted by path.
pub fn find_results_files(root: &Path) -> Result<Vec<PathBuf>, AppError> {
    if !root.is_dir() {
        return Err(AppError::new(
            2,
            format!("Results root '{}' is not a directory.", root.display()),
        ));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let is_csv = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if is_csv {
            files.push(entry.into_path());
        }
    }

    files.sort();
    Ok(files)
}

/// Experiment label for a results file.
///
/// - text after the last `results` in the stem (`…results_2` → `2`)
/// - else the text before it (`stack_results` → `stack`)
/// - else the whole stem
pub fn experiment_label(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if let Some(pos) = stem.rfind("results") {
        let after = stem[pos + "results".len()..].trim_matches('_');
        if !after.is_empty() {
            return after.to_string();
        }
        let before = stem[..pos].trim_matches('_');
        if !before.is_empty() {
            return before.to_string();
        }
    }
    stem
}
