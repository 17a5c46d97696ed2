//! Dataset writer trait and output formats
//!
//! This module defines the trait interface for dataset writers and the
//! formats the output path can select.

use crate::dataset::Dataset;
use crate::{OutputError, OutputResult};
use std::fmt;
use std::path::Path;

/// File format of a dataset output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Excel workbook (`.xlsx`)
    Spreadsheet,

    /// Comma-separated text with a UTF-8 byte order mark (`.csv`)
    Delimited,
}

impl OutputFormat {
    /// Picks the format from a path's extension (case-insensitive)
    pub fn from_path(path: &Path) -> OutputResult<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match extension.as_deref() {
            Some("xlsx") => Ok(Self::Spreadsheet),
            Some("csv") => Ok(Self::Delimited),
            _ => Err(OutputError::UnsupportedFormat(path.display().to_string())),
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Spreadsheet => "xlsx",
            Self::Delimited => "csv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.extension())
    }
}

/// Trait for dataset writers
///
/// A writer persists the whole dataset, header row first, in one call.
pub trait DatasetWriter {
    /// Format this writer produces
    fn format(&self) -> OutputFormat;

    /// Writes the dataset to `path`, replacing any existing file
    ///
    /// # Arguments
    ///
    /// * `dataset` - Rows and column layout to write
    /// * `path` - Destination file
    fn write(&self, dataset: &Dataset, path: &Path) -> OutputResult<()>;
}
