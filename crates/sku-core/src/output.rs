//! Output format selection and serialization of merged tables

use crate::config::{XLSX_MAX_COLS, XLSX_MAX_DATA_ROWS, XLSX_MAX_STRING_LEN};
use crate::error::{Error, Result};
use crate::merger::MergedTable;
use crate::table::CellValue;
use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Name of the worksheet holding the merged data
pub const SHEET_NAME: &str = "Merged";

/// Largest integer magnitude a worksheet number stores exactly
const MAX_EXACT_SHEET_INTEGER: u64 = 1 << 53;

/// Encoding chosen for the merged table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Csv,
    Xlsx,
}

impl OutputFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Xlsx => "xlsx",
        }
    }

    /// MIME type for this format
    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "text/csv",
            OutputFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Serialized merged table plus the format it was written in
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedOutput {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

/// Pick CSV when the table is larger than `threshold` rows, spreadsheet otherwise
///
/// Tables wider than a worksheet can hold also go to CSV.
pub fn select_format(row_count: usize, column_count: usize, threshold: usize) -> OutputFormat {
    if row_count > threshold || column_count > XLSX_MAX_COLS {
        OutputFormat::Csv
    } else {
        OutputFormat::Xlsx
    }
}

/// Whether every header and string cell fits in a worksheet cell
pub fn strings_fit_in_sheet(merged: &MergedTable) -> bool {
    let fits = |s: &str| s.chars().count() <= XLSX_MAX_STRING_LEN;
    merged.columns.iter().all(|c| fits(&c.name))
        && merged.rows.iter().flat_map(|r| &r.cells).all(|cell| match cell {
            CellValue::String(s) => fits(s),
            _ => true,
        })
}

/// Serialize a merged table in the format its size calls for
///
/// Text longer than a worksheet cell allows also forces CSV.
pub fn serialize(merged: &MergedTable, threshold: usize) -> Result<SerializedOutput> {
    let mut format = select_format(merged.row_count(), merged.column_count(), threshold);
    if format == OutputFormat::Xlsx && !strings_fit_in_sheet(merged) {
        warn!("text exceeds worksheet cell limit, writing CSV");
        format = OutputFormat::Csv;
    }
    info!(
        rows = merged.row_count(),
        threshold,
        format = %format,
        "selected output format"
    );

    let bytes = match format {
        OutputFormat::Csv => write_csv(merged)?,
        OutputFormat::Xlsx => write_xlsx(merged)?,
    };

    Ok(SerializedOutput { format, bytes })
}

/// Write the merged table as comma-separated values with a header row
pub fn write_csv(merged: &MergedTable) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer.write_record(merged.columns.iter().map(|c| c.name.as_str()))?;
    for row in &merged.rows {
        writer.write_record(row.cells.iter().map(|c| c.to_string_value()))?;
    }

    writer
        .into_inner()
        .map_err(|e| Error::Io(e.into_error()))
}

/// Write the merged table as a single-sheet workbook with a bold header row
pub fn write_xlsx(merged: &MergedTable) -> Result<Vec<u8>> {
    if merged.row_count() > XLSX_MAX_DATA_ROWS || merged.column_count() > XLSX_MAX_COLS {
        return Err(Error::TooLargeForSheet {
            rows: merged.row_count(),
            columns: merged.column_count(),
        });
    }

    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    {
        let sheet = workbook.add_worksheet();
        sheet.set_name(SHEET_NAME)?;

        for (col, column) in merged.columns.iter().enumerate() {
            sheet.write_string_with_format(0, col as u16, &column.name, &header_format)?;
        }

        for (row_idx, row) in merged.rows.iter().enumerate() {
            let sheet_row = (row_idx + 1) as u32;
            for (col, cell) in row.cells.iter().enumerate() {
                write_cell(sheet, sheet_row, col as u16, cell)?;
            }
        }
    }

    Ok(workbook.save_to_buffer()?)
}

fn write_cell(
    sheet: &mut Worksheet,
    row: u32,
    col: u16,
    cell: &CellValue,
) -> std::result::Result<(), XlsxError> {
    match cell {
        CellValue::Integer(i) if i.unsigned_abs() <= MAX_EXACT_SHEET_INTEGER => {
            sheet.write_number(row, col, *i as f64)?;
        }
        CellValue::Integer(i) => {
            sheet.write_string(row, col, i.to_string())?;
        }
        CellValue::Float(f) if f.is_finite() => {
            sheet.write_number(row, col, *f)?;
        }
        CellValue::Float(f) => {
            sheet.write_string(row, col, f.to_string())?;
        }
        CellValue::Bool(b) => {
            sheet.write_boolean(row, col, *b)?;
        }
        CellValue::String(s) => {
            sheet.write_string(row, col, s)?;
        }
        CellValue::Missing => {}
    }
    Ok(())
}
