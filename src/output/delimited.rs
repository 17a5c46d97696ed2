//! CSV output, used directly or as the spreadsheet fallback

use crate::dataset::Dataset;
use crate::output::traits::{DatasetWriter, OutputFormat};
use crate::output::ensure_parent_dir;
use crate::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Byte order mark so spreadsheet programs detect UTF-8
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes the dataset as comma-separated text
#[derive(Debug, Clone, Copy, Default)]
pub struct DelimitedWriter;

impl DatasetWriter for DelimitedWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Delimited
    }

    fn write(&self, dataset: &Dataset, path: &Path) -> OutputResult<()> {
        ensure_parent_dir(path)?;

        let mut file = File::create(path)?;
        file.write_all(UTF8_BOM)?;

        let mut writer = csv::Writer::from_writer(file);
        writer.write_record(dataset.headers())?;
        for row in dataset.rows() {
            writer.write_record(dataset.row_values(row))?;
        }
        writer.flush()?;

        Ok(())
    }
}
