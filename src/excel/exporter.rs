//! Excel exporter implementation - Workbook → Excel (.xlsx)

use crate::error::{EtlError, EtlResult};
use crate::excel::document::{format_number, CellValue, Sheet, Workbook};
use crate::excel::reference::cell_name;
use rust_xlsxwriter::{Formula, Workbook as XlsxWorkbook, Worksheet};
use std::path::Path;
use tracing::{info, warn};

/// Writes the in-memory document to an .xlsx file
pub struct ExcelExporter<'a> {
    workbook: &'a Workbook,
}

/// Cell counts from one export
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub sheets: usize,
    pub cells: usize,
    pub skipped: usize,
}

impl<'a> ExcelExporter<'a> {
    /// Create a new Excel exporter
    pub fn new(workbook: &'a Workbook) -> Self {
        Self { workbook }
    }

    /// Export the workbook to an Excel .xlsx file
    ///
    /// Sheet creation and the final save are fatal; individual cell writes
    /// are best-effort and only logged when they fail.
    pub fn export(&self, output_path: &Path) -> EtlResult<ExportStats> {
        let mut xlsx = XlsxWorkbook::new();
        let mut stats = ExportStats::default();

        for sheet in self.workbook.sheets() {
            let worksheet = xlsx.add_worksheet();
            worksheet.set_name(sheet.name()).map_err(|e| {
                EtlError::Export(format!(
                    "Failed to set worksheet name '{}': {}",
                    sheet.name(),
                    e
                ))
            })?;
            Self::export_sheet(worksheet, sheet, &mut stats);
            stats.sheets += 1;
        }

        xlsx.save(output_path).map_err(|e| {
            EtlError::Export(format!(
                "Failed to save Excel file {}: {}",
                output_path.display(),
                e
            ))
        })?;

        info!(
            path = %output_path.display(),
            sheets = stats.sheets,
            cells = stats.cells,
            "Workbook saved"
        );
        Ok(stats)
    }

    fn export_sheet(worksheet: &mut Worksheet, sheet: &Sheet, stats: &mut ExportStats) {
        for ((row, col), value) in sheet.cells() {
            match Self::write_cell(worksheet, row, col, value) {
                Ok(()) => stats.cells += 1,
                Err(e) => {
                    stats.skipped += 1;
                    warn!(
                        sheet = %sheet.name(),
                        "Skipped cell {}: {}",
                        cell_name(row, col),
                        e
                    );
                }
            }
        }
    }

    /// Write a single cell (document positions are 1-based, the writer's are 0-based)
    fn write_cell(
        worksheet: &mut Worksheet,
        row: u32,
        col: u32,
        value: &CellValue,
    ) -> Result<(), String> {
        let xl_row = row.checked_sub(1).ok_or("row 0 is not addressable")?;
        let xl_col = col
            .checked_sub(1)
            .and_then(|c| u16::try_from(c).ok())
            .ok_or("column is not addressable")?;

        let written = match value {
            CellValue::Empty => return Ok(()),
            CellValue::Number(n) => worksheet.write_number(xl_row, xl_col, *n).map(|_| ()),
            CellValue::Text(s) => worksheet.write_string(xl_row, xl_col, s).map(|_| ()),
            CellValue::Bool(b) => worksheet.write_boolean(xl_row, xl_col, *b).map(|_| ()),
            CellValue::Formula { text, cached } => {
                let mut formula = Formula::new(text);
                if let Some(value) = cached {
                    formula = formula.set_result(format_number(*value));
                }
                worksheet.write_formula(xl_row, xl_col, formula).map(|_| ())
            }
        };

        written.map_err(|e| e.to_string())
    }
}
