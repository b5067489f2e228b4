//! Raw export extraction
//!
//! The monthly export is a flattened pivot table on a sheet whose name
//! contains "Konsol". The header row moves between months, and summary rows
//! look just like customer rows, so extraction is a header search followed by
//! three independent row filters.

use crate::error::{EtlError, EtlResult};
use crate::excel::{CellValue, Sheet, Workbook};
use crate::types::ProductCode;
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub const RAW_SHEET_MARKER: &str = "Konsol";
pub const CUSTOMER_NUMBER: &str = "Customer Number";
pub const CUSTOMER_NAME: &str = "Customer Name";

const HEADER_SCAN_ROWS: u32 = 20;
const HEADER_TOKENS: [&str; 3] = ["customer no", "customer name", "customer number"];
const ROW_LABELS: &str = "row labels";

/// Customer names of pivot group rows
const SUMMARY_NAMES: [&str; 4] = ["digital platform", "pln group", "publik", "retail"];

/// Fragments that only ever appear in pivot summary rows
const SUMMARY_FRAGMENTS: [&str; 7] = [
    "sum of",
    "persentase",
    "percentage",
    "row labels",
    "column labels",
    "subtotal",
    "total amount",
];

/// Rows kept after each filter layer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterCounts {
    pub rows_read: usize,
    pub after_customer_number: usize,
    pub after_grand_total: usize,
    pub after_summary_rows: usize,
}

/// Wide raw table with canonical identity headers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RawTable {
    /// 0-based index of a header
    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn remove_column(&mut self, idx: usize) {
        self.headers.remove(idx);
        for row in &mut self.rows {
            if idx < row.len() {
                row.remove(idx);
            }
        }
    }

    fn retain_rows<F>(&mut self, keep: F) -> usize
    where
        F: Fn(&[CellValue]) -> bool,
    {
        self.rows.retain(|row| keep(row));
        self.rows.len()
    }
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub sheet_name: String,
    /// 1-based header row on the raw sheet
    pub header_row: u32,
    pub table: RawTable,
    /// Full product names from the row above the header, keyed by code
    pub product_names: HashMap<String, String>,
    pub counts: FilterCounts,
}

/// Pull the customer table out of a raw export workbook
pub fn extract(workbook: &Workbook) -> EtlResult<Extraction> {
    let sheet = workbook
        .find_sheet_containing(RAW_SHEET_MARKER)
        .ok_or_else(|| {
            EtlError::Structure(format!(
                "No sheet containing '{}' in raw export. Available sheets: {:?}",
                RAW_SHEET_MARKER,
                workbook.sheet_names()
            ))
        })?;

    let header_row = find_header_row(sheet).ok_or_else(|| {
        EtlError::Structure(format!(
            "No header row with 'Customer No', 'Customer Name' or 'Customer Number' in the first {} rows of '{}'",
            HEADER_SCAN_ROWS,
            sheet.name()
        ))
    })?;
    info!(sheet = %sheet.name(), header_row, "Located raw header row");

    let product_names = read_product_names(sheet, header_row);
    debug!(count = product_names.len(), "Mapped product codes to full names");

    let mut table = read_table(sheet, header_row);
    canonicalize_headers(&mut table)?;

    let counts = filter_rows(&mut table);
    info!(rows = table.len(), "Customer rows kept after filtering");

    Ok(Extraction {
        sheet_name: sheet.name().to_string(),
        header_row,
        table,
        product_names,
        counts,
    })
}

fn is_header_token(cell: &CellValue) -> bool {
    let text = cell.to_display_string().trim().to_lowercase();
    HEADER_TOKENS.contains(&text.as_str())
}

/// First row within the scan window holding a customer header token
pub fn find_header_row(sheet: &Sheet) -> Option<u32> {
    let width = sheet.max_column();
    (1..=HEADER_SCAN_ROWS.min(sheet.max_row()))
        .find(|&row| (1..=width).any(|col| is_header_token(sheet.get(row, col))))
}

fn read_product_names(sheet: &Sheet, header_row: u32) -> HashMap<String, String> {
    let mut names = HashMap::new();
    if header_row <= 1 {
        return names;
    }

    for col in 1..=sheet.max_column() {
        let header = sheet.get(header_row, col);
        let lowered = header.to_display_string().trim().to_lowercase();
        if header.is_empty() || is_header_token(header) || lowered == ROW_LABELS {
            continue;
        }
        let Some(code) = ProductCode::from_cell(header) else {
            continue;
        };
        let name = sheet.get(header_row - 1, col);
        if !name.is_empty() {
            names.insert(
                code.as_str().to_string(),
                name.to_display_string().trim().to_string(),
            );
        }
    }
    names
}

fn read_table(sheet: &Sheet, header_row: u32) -> RawTable {
    let width = sheet.max_column();
    let headers = (1..=width)
        .map(|col| sheet.get(header_row, col).to_display_string().trim().to_string())
        .collect();
    let rows = (header_row + 1..=sheet.max_row())
        .map(|row| sheet.row_values(row, width))
        .collect();
    RawTable { headers, rows }
}

/// Drop "Row Labels" and settle on one spelling of the identity headers
fn canonicalize_headers(table: &mut RawTable) -> EtlResult<()> {
    if let Some(idx) = table
        .headers
        .iter()
        .position(|h| h.to_lowercase() == ROW_LABELS)
    {
        table.remove_column(idx);
        debug!("Dropped 'Row Labels' column");
    }

    let number_idx = table
        .headers
        .iter()
        .position(|h| matches!(h.to_lowercase().as_str(), "customer no" | "customer number"))
        .ok_or_else(|| {
            EtlError::Data(format!(
                "Customer number column ('Customer No' / 'Customer Number') not found. Columns found: {:?}",
                table.headers.iter().take(10).collect::<Vec<_>>()
            ))
        })?;
    if table.headers[number_idx] != CUSTOMER_NUMBER {
        debug!(from = %table.headers[number_idx], "Renamed customer number column");
        table.headers[number_idx] = CUSTOMER_NUMBER.to_string();
    }

    match table
        .headers
        .iter()
        .position(|h| h.to_lowercase() == "customer name")
    {
        Some(idx) => table.headers[idx] = CUSTOMER_NAME.to_string(),
        None => warn!("Column 'Customer Name' not found; detail sheet will omit it"),
    }
    Ok(())
}

fn filter_rows(table: &mut RawTable) -> FilterCounts {
    let mut counts = FilterCounts {
        rows_read: table.len(),
        ..FilterCounts::default()
    };
    let number_idx = table.column(CUSTOMER_NUMBER);
    let name_idx = table.column(CUSTOMER_NAME);
    let cell = |row: &[CellValue], idx: Option<usize>| -> CellValue {
        idx.and_then(|i| row.get(i)).cloned().unwrap_or(CellValue::Empty)
    };

    counts.after_customer_number = table.retain_rows(|row| !cell(row, number_idx).is_empty());
    log_dropped(
        counts.rows_read,
        counts.after_customer_number,
        "rows without a customer number (subtotal, header or merged cells)",
    );

    counts.after_grand_total = table.retain_rows(|row| !mentions_grand_total(row));
    log_dropped(
        counts.after_customer_number,
        counts.after_grand_total,
        "'Grand Total' rows",
    );

    counts.after_summary_rows = table.retain_rows(|row| {
        let name = name_idx.map(|_| cell(row, name_idx));
        is_valid_customer_row(&cell(row, number_idx), name.as_ref())
    });
    log_dropped(
        counts.after_grand_total,
        counts.after_summary_rows,
        "pivot summary rows",
    );

    counts
}

fn log_dropped(before: usize, after: usize, what: &str) {
    if before > after {
        info!(dropped = before - after, "Dropped {}", what);
    }
}

fn mentions_grand_total(row: &[CellValue]) -> bool {
    row.iter()
        .any(|c| c.to_display_string().to_lowercase().contains("grand total"))
}

/// Customer number cleaned of float artifacts (`20001234.0` → `20001234`)
pub fn clean_customer_number(cell: &CellValue) -> String {
    cell.to_display_string()
        .trim()
        .replace(".0", "")
        .replace('.', "")
}

/// Content test separating real customers from pivot summary rows
///
/// The number must be all digits and at least 8 long; the name must not be a
/// pivot group name or contain a summary fragment.
pub fn is_valid_customer_row(number: &CellValue, name: Option<&CellValue>) -> bool {
    let number = clean_customer_number(number);
    if number.len() < 8 || !number.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let name = name
        .map(|n| n.to_display_string().trim().to_lowercase())
        .unwrap_or_default();
    if SUMMARY_NAMES.contains(&name.as_str()) {
        return false;
    }
    !SUMMARY_FRAGMENTS.iter().any(|f| name.contains(f))
}
