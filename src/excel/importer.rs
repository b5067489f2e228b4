//! Excel importer implementation - Excel (.xlsx/.xlsb/.xls) → Workbook

use crate::error::{EtlError, EtlResult};
use crate::excel::document::{CellValue, Sheet, Workbook};
use calamine::{open_workbook_auto, Data, Range, Reader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Loads a spreadsheet file into the in-memory document model
pub struct ExcelImporter {
    path: PathBuf,
}

impl ExcelImporter {
    /// Create a new Excel importer
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Import every sheet of the file, values and formulas
    pub fn import(&self) -> EtlResult<Workbook> {
        if !self.path.exists() {
            return Err(EtlError::FileNotFound(self.path.clone()));
        }

        let mut workbook = open_workbook_auto(&self.path).map_err(|e| {
            EtlError::Excel(format!(
                "Failed to open Excel file {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let mut result = Workbook::new();

        for sheet_name in workbook.sheet_names() {
            let range = workbook.worksheet_range(&sheet_name).map_err(|e| {
                EtlError::Excel(format!(
                    "Failed to read sheet '{}' of {}: {}",
                    sheet_name,
                    self.path.display(),
                    e
                ))
            })?;

            // Formula text is optional: some sources (and some sheet kinds) have none
            let formulas = match workbook.worksheet_formula(&sheet_name) {
                Ok(formulas) => Some(formulas),
                Err(e) => {
                    warn!(sheet = %sheet_name, "Formulas unavailable, loading values only: {}", e);
                    None
                }
            };

            let sheet = Self::build_sheet(&sheet_name, &range, formulas.as_ref());
            debug!(
                sheet = %sheet_name,
                rows = sheet.max_row(),
                columns = sheet.max_column(),
                "Loaded sheet"
            );
            result.push_sheet(sheet)?;
        }

        Ok(result)
    }

    /// Merge a value range and its formula range into one sheet
    fn build_sheet(name: &str, values: &Range<Data>, formulas: Option<&Range<String>>) -> Sheet {
        let mut sheet = Sheet::new(name);

        if let Some((row0, col0)) = values.start() {
            for (r, c, cell) in values.cells() {
                let value = Self::convert_cell(cell);
                if value.is_empty() {
                    continue;
                }
                let (row, col) = Self::absolute(row0, col0, r, c);
                sheet.set_best_effort(row, col, value);
            }
        }

        if let Some(formulas) = formulas {
            if let Some((row0, col0)) = formulas.start() {
                for (r, c, text) in formulas.cells() {
                    if text.trim().is_empty() {
                        continue;
                    }
                    let (row, col) = Self::absolute(row0, col0, r, c);
                    let cached = sheet.get(row, col).as_number();
                    let mut formula = CellValue::formula(text.clone());
                    if let CellValue::Formula { cached: slot, .. } = &mut formula {
                        *slot = cached;
                    }
                    sheet.set_best_effort(row, col, formula);
                }
            }
        }

        sheet
    }

    /// calamine positions are 0-based and relative to the range start
    fn absolute(row0: u32, col0: u32, r: usize, c: usize) -> (u32, u32) {
        let row = row0 as usize + r + 1;
        let col = col0 as usize + c + 1;
        (
            u32::try_from(row).unwrap_or(u32::MAX),
            u32::try_from(col).unwrap_or(u32::MAX),
        )
    }

    /// Convert a calamine cell to a document value
    fn convert_cell(cell: &Data) -> CellValue {
        match cell {
            Data::Int(i) => CellValue::Number(*i as f64),
            Data::Float(f) => CellValue::Number(*f),
            Data::String(s) if s.is_empty() => CellValue::Empty,
            Data::String(s) => CellValue::Text(s.clone()),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
            Data::Error(e) => CellValue::Text(e.to_string()),
            Data::Empty => CellValue::Empty,
        }
    }
}
