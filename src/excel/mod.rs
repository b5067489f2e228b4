//! Spreadsheet I/O
//!
//! - Import: Excel (.xlsx, .xlsb, .xls) → [`Workbook`] via calamine
//! - Export: [`Workbook`] → Excel (.xlsx) via rust_xlsxwriter
//!
//! The pipeline only ever sees the in-memory [`Workbook`] model.

pub mod document;
mod exporter;
mod importer;
pub mod reference;

pub use document::{CellValue, Sheet, Workbook};
pub use exporter::{ExcelExporter, ExportStats};
pub use importer::ExcelImporter;
