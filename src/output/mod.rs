//! Output module for persisting the dataset and reporting a run
//!
//! This module handles:
//! - Writing the dataset as an Excel workbook or CSV file
//! - Falling back to CSV when the workbook cannot be written
//! - Rendering the per-region run report

mod delimited;
mod spreadsheet;
pub mod stats;
mod traits;

pub use delimited::DelimitedWriter;
pub use spreadsheet::SpreadsheetWriter;
pub use stats::{format_report, print_report, status_counts};
pub use traits::{DatasetWriter, OutputFormat};

use crate::dataset::Dataset;
use crate::{OutputError, OutputResult};
use std::fs;
use std::path::{Path, PathBuf};

/// Writes the dataset in the format selected by the path's extension
///
/// Workbook output falls back to a CSV file next to it (same stem) when the
/// workbook cannot be written.
///
/// # Arguments
///
/// * `dataset` - The rows to persist
/// * `path` - Destination, ending in `.xlsx` or `.csv`
///
/// # Returns
///
/// * `Ok(PathBuf)` - The file actually written
/// * `Err(OutputError)` - Unsupported extension, or every attempt failed
pub fn write_dataset(dataset: &Dataset, path: &Path) -> OutputResult<PathBuf> {
    match OutputFormat::from_path(path)? {
        OutputFormat::Spreadsheet => persist_with_fallback(
            dataset,
            path,
            &SpreadsheetWriter::default(),
            &DelimitedWriter,
        ),
        OutputFormat::Delimited => {
            DelimitedWriter.write(dataset, path)?;
            tracing::info!("Wrote {} rows to {}", dataset.len(), path.display());
            Ok(path.to_path_buf())
        }
    }
}

/// Writes with `primary`, retrying once with `fallback` at the same stem
///
/// # Returns
///
/// * `Ok(PathBuf)` - The path that was written
/// * `Err(OutputError::FallbackFailed)` - Both writers failed; carries both causes
pub fn persist_with_fallback(
    dataset: &Dataset,
    path: &Path,
    primary: &dyn DatasetWriter,
    fallback: &dyn DatasetWriter,
) -> OutputResult<PathBuf> {
    let primary_error = match primary.write(dataset, path) {
        Ok(()) => {
            tracing::info!("Wrote {} rows to {}", dataset.len(), path.display());
            return Ok(path.to_path_buf());
        }
        Err(e) => e,
    };

    let fallback_path = path.with_extension(fallback.format().extension());
    tracing::warn!(
        "Failed to write {} ({}), falling back to {}",
        path.display(),
        primary_error,
        fallback_path.display()
    );

    match fallback.write(dataset, &fallback_path) {
        Ok(()) => {
            tracing::info!(
                "Wrote {} rows to {}",
                dataset.len(),
                fallback_path.display()
            );
            Ok(fallback_path)
        }
        Err(fallback_error) => Err(OutputError::FallbackFailed {
            primary: Box::new(primary_error),
            fallback: Box::new(fallback_error),
            fallback_path: fallback_path.display().to_string(),
        }),
    }
}

/// Creates the parent directory of an output file if needed
pub(crate) fn ensure_parent_dir(path: &Path) -> OutputResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::aggregate;
    use crate::decoder::DEAL_SCHEMA;
    use crate::RegionResult;
    use tempfile::TempDir;

    fn sample_dataset() -> Dataset {
        let mut result = RegionResult::new("alpha");
        result.pages_total = 1;
        result.records = vec![DEAL_SCHEMA
            .record()
            .field("title", Some("样例房源".to_string()))
            .build()];
        aggregate(&["alpha".to_string()], vec![result], DEAL_SCHEMA).0
    }

    #[test]
    fn test_write_workbook() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deals.xlsx");

        let written = write_dataset(&sample_dataset(), &path).unwrap();
        assert_eq!(written, path);
        assert!(path.is_file());
    }

    #[test]
    fn test_write_csv_directly() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deals.csv");

        let written = write_dataset(&sample_dataset(), &path).unwrap();
        assert_eq!(written, path);
        assert!(!dir.path().join("deals.xlsx").exists());
    }

    #[test]
    fn test_unsupported_extension() {
        let dir = TempDir::new().unwrap();
        let result = write_dataset(&sample_dataset(), &dir.path().join("deals.txt"));
        assert!(matches!(result, Err(OutputError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_falls_back_to_csv() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deals.xlsx");
        // A directory in the way makes the workbook save fail
        fs::create_dir(&path).unwrap();

        let written = write_dataset(&sample_dataset(), &path).unwrap();
        assert_eq!(written, dir.path().join("deals.csv"));
        assert!(written.is_file());
    }

    #[test]
    fn test_double_failure_reports_both_causes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("deals.xlsx");
        fs::create_dir(&path).unwrap();
        fs::create_dir(dir.path().join("deals.csv")).unwrap();

        let result = write_dataset(&sample_dataset(), &path);
        match result {
            Err(OutputError::FallbackFailed { fallback_path, .. }) => {
                assert!(fallback_path.ends_with("deals.csv"));
            }
            other => panic!("expected FallbackFailed, got {:?}", other),
        }
    }
}
