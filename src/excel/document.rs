//! In-memory spreadsheet document
//!
//! The pipeline never talks to a file format directly. Workbooks are loaded
//! into this model by [`super::ExcelImporter`], mutated by the pipeline
//! stages, and written back by [`super::ExcelExporter`].

use crate::error::{EtlError, EtlResult};
use crate::excel::reference::{cell_name, MAX_COLUMN, MAX_ROW};
use std::collections::BTreeMap;
use std::fmt;
use tracing::warn;

/// Value held by a single cell
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Number(f64),
    Text(String),
    Bool(bool),
    /// Formula text (always starting with `=`) and the value Excel last
    /// computed for it, when the source file carried one
    Formula { text: String, cached: Option<f64> },
}

static EMPTY: CellValue = CellValue::Empty;

impl CellValue {
    /// Build a formula cell, adding the leading `=` when missing
    pub fn formula(text: impl Into<String>) -> Self {
        let text = text.into();
        let text = if text.starts_with('=') {
            text
        } else {
            format!("={}", text)
        };
        CellValue::Formula { text, cached: None }
    }

    /// True for missing cells and whitespace-only text
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Numeric view of the cell: numbers as-is, formulas via their cached result
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            CellValue::Formula { cached, .. } => *cached,
            _ => None,
        }
    }

    pub fn as_formula(&self) -> Option<&str> {
        match self {
            CellValue::Formula { text, .. } => Some(text),
            _ => None,
        }
    }

    /// Cell rendered as text; whole numbers print without a decimal part
    pub fn to_display_string(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
            CellValue::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
            CellValue::Formula { text, .. } => text.clone(),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_display_string())
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// Format a number the way a spreadsheet shows it: `719` rather than `719.0`
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// A single worksheet, stored sparsely by 1-based `(row, col)`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Sheet {
    name: String,
    cells: BTreeMap<(u32, u32), CellValue>,
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cells: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self, row: u32, col: u32) -> &CellValue {
        self.cells.get(&(row, col)).unwrap_or(&EMPTY)
    }

    /// Write a cell; writing [`CellValue::Empty`] removes it
    pub fn set(&mut self, row: u32, col: u32, value: CellValue) -> EtlResult<()> {
        if row == 0 || col == 0 || row > MAX_ROW || col > MAX_COLUMN {
            return Err(EtlError::Structure(format!(
                "Cell ({}, {}) is outside the sheet bounds of '{}'",
                row, col, self.name
            )));
        }

        if matches!(value, CellValue::Empty) {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
        Ok(())
    }

    /// Write a cell that is not critical to the run: failures are logged, never raised
    pub fn set_best_effort(&mut self, row: u32, col: u32, value: CellValue) -> bool {
        match self.set(row, col, value) {
            Ok(()) => true,
            Err(e) => {
                warn!(sheet = %self.name, "Failed to write cell {}: {}", cell_name(row, col), e);
                false
            }
        }
    }

    pub fn clear(&mut self, row: u32, col: u32) {
        self.cells.remove(&(row, col));
    }

    /// Remove every cell at or below `row`
    pub fn clear_rows_from(&mut self, row: u32) {
        self.cells.retain(|&(r, _), _| r < row);
    }

    /// Last row holding a cell, 0 for an empty sheet
    pub fn max_row(&self) -> u32 {
        self.cells.keys().map(|&(r, _)| r).max().unwrap_or(0)
    }

    /// First row holding a cell, 0 for an empty sheet
    pub fn min_row(&self) -> u32 {
        self.cells.keys().map(|&(r, _)| r).min().unwrap_or(0)
    }

    /// Last column holding a cell, 0 for an empty sheet
    pub fn max_column(&self) -> u32 {
        self.cells.keys().map(|&(_, c)| c).max().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Values of one row from column 1 to `width`, gaps filled with `Empty`
    pub fn row_values(&self, row: u32, width: u32) -> Vec<CellValue> {
        (1..=width).map(|col| self.get(row, col).clone()).collect()
    }

    /// Non-empty header labels of a row, trimmed, with their columns
    pub fn header_labels(&self, row: u32) -> Vec<(u32, String)> {
        self.cells
            .range((row, 0)..=(row, u32::MAX))
            .filter(|(_, v)| !v.is_empty())
            .map(|(&(_, col), v)| (col, v.to_display_string().trim().to_string()))
            .collect()
    }

    /// Column whose trimmed header text equals `name` exactly
    pub fn find_header(&self, row: u32, name: &str) -> Option<u32> {
        self.header_labels(row)
            .into_iter()
            .find(|(_, label)| label == name)
            .map(|(col, _)| col)
    }

    /// Iterate over all stored cells in row-major order
    pub fn cells(&self) -> impl Iterator<Item = ((u32, u32), &CellValue)> {
        self.cells.iter().map(|(&pos, v)| (pos, v))
    }

    /// Mutable access to the text of every formula cell
    pub fn formulas_mut(&mut self) -> impl Iterator<Item = ((u32, u32), &mut String)> {
        self.cells.iter_mut().filter_map(|(&pos, v)| match v {
            CellValue::Formula { text, .. } => Some((pos, text)),
            _ => None,
        })
    }
}

/// An ordered collection of sheets
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Workbook {
    sheets: Vec<Sheet>,
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name()).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.sheet(name).is_some()
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    /// First sheet whose name contains `needle` (case-sensitive)
    pub fn find_sheet_containing(&self, needle: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name.contains(needle))
    }

    /// First sheet whose name contains `needle`, ignoring case
    pub fn find_sheet_containing_ignore_case(&self, needle: &str) -> Option<&Sheet> {
        let needle = needle.to_lowercase();
        self.sheets
            .iter()
            .find(|s| s.name.to_lowercase().contains(&needle))
    }

    pub fn first_sheet(&self) -> Option<&Sheet> {
        self.sheets.first()
    }

    /// Append a sheet; names must be unique
    pub fn push_sheet(&mut self, sheet: Sheet) -> EtlResult<&mut Sheet> {
        if self.contains(sheet.name()) {
            return Err(EtlError::Structure(format!(
                "Sheet '{}' already exists",
                sheet.name()
            )));
        }
        self.sheets.push(sheet);
        let last = self.sheets.len() - 1;
        Ok(&mut self.sheets[last])
    }

    pub fn add_sheet(&mut self, name: &str) -> EtlResult<&mut Sheet> {
        self.push_sheet(Sheet::new(name))
    }

    pub fn remove_sheet(&mut self, name: &str) -> Option<Sheet> {
        let idx = self.sheets.iter().position(|s| s.name == name)?;
        Some(self.sheets.remove(idx))
    }

    /// Rename a sheet in place, keeping its position
    pub fn rename_sheet(&mut self, from: &str, to: &str) -> EtlResult<()> {
        if from != to && self.contains(to) {
            return Err(EtlError::Structure(format!(
                "Cannot rename '{}' to '{}': a sheet with that name exists",
                from, to
            )));
        }
        let sheet = self.sheet_mut(from).ok_or_else(|| {
            EtlError::Structure(format!("Sheet '{}' not found for rename", from))
        })?;
        sheet.name = to.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_gets_leading_equals() {
        assert_eq!(
            CellValue::formula("SUM(A1:A2)").as_formula(),
            Some("=SUM(A1:A2)")
        );
        assert_eq!(CellValue::formula("=A1").as_formula(), Some("=A1"));
    }

    #[test]
    fn test_display_of_whole_numbers() {
        assert_eq!(CellValue::Number(719.0).to_display_string(), "719");
        assert_eq!(CellValue::Number(20001234.0).to_display_string(), "20001234");
        assert_eq!(CellValue::Number(1.5).to_display_string(), "1.5");
    }

    #[test]
    fn test_cached_formula_value_is_numeric() {
        let cell = CellValue::Formula {
            text: "=SUM(A1:A3)".to_string(),
            cached: Some(42.0),
        };
        assert_eq!(cell.as_number(), Some(42.0));
        assert_eq!(CellValue::formula("=A1").as_number(), None);
    }

    #[test]
    fn test_set_empty_removes_cell() {
        let mut sheet = Sheet::new("Dashboard");
        sheet.set(3, 1, CellValue::from("719")).unwrap();
        assert_eq!(sheet.max_row(), 3);
        sheet.set(3, 1, CellValue::Empty).unwrap();
        assert!(sheet.is_empty());
        assert_eq!(sheet.max_row(), 0);
    }

    #[test]
    fn test_set_rejects_row_zero() {
        let mut sheet = Sheet::new("Dashboard");
        assert!(sheet.set(0, 1, CellValue::Number(1.0)).is_err());
        assert!(!sheet.set_best_effort(1, 0, CellValue::Number(1.0)));
        assert!(sheet.is_empty());
    }

    #[test]
    fn test_clear_rows_from() {
        let mut sheet = Sheet::new("Data OPT");
        for row in 1..=6 {
            sheet.set(row, 2, CellValue::Number(f64::from(row))).unwrap();
        }
        sheet.clear_rows_from(4);
        assert_eq!(sheet.max_row(), 3);
        assert_eq!(sheet.get(3, 2), &CellValue::Number(3.0));
        assert_eq!(sheet.get(4, 2), &CellValue::Empty);
    }

    #[test]
    fn test_header_labels_are_trimmed() {
        let mut sheet = Sheet::new("ALL PRODUCT PDF");
        sheet.set(3, 1, CellValue::from(" ICON+ Product ")).unwrap();
        sheet.set(3, 3, CellValue::from("SEGMEN")).unwrap();
        sheet.set(4, 1, CellValue::Number(719.0)).unwrap();

        assert_eq!(
            sheet.header_labels(3),
            vec![(1, "ICON+ Product".to_string()), (3, "SEGMEN".to_string())]
        );
        assert_eq!(sheet.find_header(3, "SEGMEN"), Some(3));
        assert_eq!(sheet.find_header(3, "Kode 0"), None);
    }

    #[test]
    fn test_rename_sheet_keeps_position() {
        let mut wb = Workbook::new();
        wb.add_sheet("Dashboard").unwrap();
        wb.add_sheet("Realisasi November").unwrap();
        wb.add_sheet("Data Pelanggan").unwrap();

        wb.rename_sheet("Realisasi November", "Realisasi Desember")
            .unwrap();
        assert_eq!(
            wb.sheet_names(),
            vec!["Dashboard", "Realisasi Desember", "Data Pelanggan"]
        );
        assert!(wb.rename_sheet("Dashboard", "Data Pelanggan").is_err());
    }

    #[test]
    fn test_find_sheet_containing() {
        let mut wb = Workbook::new();
        wb.add_sheet("Pivot").unwrap();
        wb.add_sheet("Lampiran Konsol Des").unwrap();
        wb.add_sheet("Mapping SAP").unwrap();

        assert_eq!(
            wb.find_sheet_containing("Konsol").map(|s| s.name()),
            Some("Lampiran Konsol Des")
        );
        assert!(wb.find_sheet_containing("konsol").is_none());
        assert_eq!(
            wb.find_sheet_containing_ignore_case("sap").map(|s| s.name()),
            Some("Mapping SAP")
        );
        assert!(wb.add_sheet("Pivot").is_err());
    }
}
