//! Excel workbook output

use crate::dataset::Dataset;
use crate::output::traits::{DatasetWriter, OutputFormat};
use crate::output::ensure_parent_dir;
use crate::OutputResult;
use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook, XlsxError};
use std::path::Path;

/// Writes the dataset to a single-sheet `.xlsx` workbook
#[derive(Debug, Clone)]
pub struct SpreadsheetWriter {
    sheet_name: String,
}

impl SpreadsheetWriter {
    pub fn new(sheet_name: impl Into<String>) -> Self {
        Self {
            sheet_name: sheet_name.into(),
        }
    }
}

impl Default for SpreadsheetWriter {
    fn default() -> Self {
        Self::new("listings")
    }
}

impl DatasetWriter for SpreadsheetWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Spreadsheet
    }

    fn write(&self, dataset: &Dataset, path: &Path) -> OutputResult<()> {
        ensure_parent_dir(path)?;

        let mut workbook = Workbook::new();
        let header_format = Format::new().set_bold();

        let worksheet = workbook.add_worksheet();
        worksheet.set_name(self.sheet_name.as_str())?;

        for (col, header) in dataset.headers().into_iter().enumerate() {
            worksheet.write_string_with_format(0, column(col)?, header, &header_format)?;
        }
        worksheet.set_freeze_panes(1, 0)?;

        for (index, row) in dataset.rows().iter().enumerate() {
            let row_num = RowNum::try_from(index + 1).map_err(|_| XlsxError::RowColumnLimitError)?;
            for (col, value) in dataset.row_values(row).into_iter().enumerate() {
                worksheet.write_string(row_num, column(col)?, value)?;
            }
        }

        workbook.save(path)?;
        Ok(())
    }
}

fn column(index: usize) -> Result<ColNum, XlsxError> {
    ColNum::try_from(index).map_err(|_| XlsxError::RowColumnLimitError)
}
