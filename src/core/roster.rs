//! Roster sheet updater ("Data Pelanggan", "Data OPT")
//!
//! A roster sheet is refilled from a flat export whose column names only
//! roughly match the template headers. Template formulas on the first data
//! row are kept for every column the export does not supply.

use crate::config::{Month, RosterLayout};
use crate::core::normalize::{headers_match, normalize};
use crate::core::ordering::ProductCodeOrder;
use crate::error::{EtlError, EtlResult};
use crate::excel::reference::{cell_name, column_letter};
use crate::excel::{CellValue, Sheet, Workbook};
use crate::types::ProductCode;
use regex::{Captures, Regex};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info, warn};

const PRODUCT_CODE_FIELD: &str = "kodeMasterProduk";
const MONTH_LABEL: &str = "bulan berjalan";

/// Export values that mean "no value" and must not reach the sheet
const PLACEHOLDERS: [&str; 6] = ["--/--/--", "--", "---", "nan", "NaT", "None"];

/// Per-sheet differences between the two rosters
#[derive(Debug, Clone, Copy)]
pub struct RosterSpec {
    pub sheet: &'static str,
    /// Template header columns scanned, from column 1
    pub scan_width: u32,
    /// (export field, template header) pairs whose names differ
    pub exceptions: &'static [(&'static str, &'static str)],
    /// Where the month index goes when no "Bulan Berjalan" label exists
    pub fallback_cell: (u32, u32),
}

pub const CUSTOMER_ROSTER: RosterSpec = RosterSpec {
    sheet: "Data Pelanggan",
    scan_width: 99,
    exceptions: &[("namaPerusahaan", "Nama Pelanggan")],
    fallback_cell: (2, 48),
};

pub const OPT_ROSTER: RosterSpec = RosterSpec {
    sheet: "Data OPT",
    scan_width: 149,
    exceptions: &[("hargaInstalasi", "hargaInstallasi")],
    fallback_cell: (2, 84),
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RosterUpdate {
    pub sheet: String,
    pub rows_written: usize,
    pub rows_dropped: usize,
    pub mapped_columns: usize,
    pub formula_columns: usize,
    pub subtotals_rewritten: usize,
    pub month_cell: String,
}

/// Moves row-relative references of a template row onto another row
///
/// `=AY4*AZ4+$B$1` retargeted from row 4 to row 9 becomes `=AY9*AZ9+$B$1`.
pub struct RowRetargeter {
    pattern: Regex,
}

impl RowRetargeter {
    pub fn new(template_row: u32) -> EtlResult<Self> {
        let pattern = Regex::new(&format!(r"([A-Z]+){}\b", template_row))
            .map_err(|e| EtlError::Formula(format!("Regex error: {}", e)))?;
        Ok(Self { pattern })
    }

    pub fn retarget(&self, formula: &str, row: u32) -> String {
        self.pattern
            .replace_all(formula, |caps: &Captures| format!("{}{}", &caps[1], row))
            .into_owned()
    }
}

/// Export rows below the first non-empty row, which holds the headers
struct SourceTable {
    headers: Vec<(u32, String)>,
    rows: Vec<BTreeMap<u32, CellValue>>,
}

impl SourceTable {
    fn from_sheet(sheet: &Sheet) -> Self {
        let header_row = sheet.min_row();
        if header_row == 0 {
            return Self {
                headers: Vec::new(),
                rows: Vec::new(),
            };
        }

        let headers = sheet.header_labels(header_row);
        let rows = (header_row + 1..=sheet.max_row())
            .map(|row| {
                headers
                    .iter()
                    .map(|&(col, _)| (col, sheet.get(row, col).clone()))
                    .filter(|(_, v)| !v.is_empty())
                    .collect::<BTreeMap<_, _>>()
            })
            .filter(|row| !row.is_empty())
            .collect();
        Self { headers, rows }
    }

    fn column_named(&self, normalized: &str) -> Option<u32> {
        self.headers
            .iter()
            .find(|(_, label)| normalize(label) == normalized)
            .map(|&(col, _)| col)
    }
}

/// Source column → template column, by normalized header plus the field exceptions
fn map_columns(
    source: &SourceTable,
    template: &[(u32, String)],
    exceptions: &[(&str, &str)],
) -> BTreeMap<u32, u32> {
    let template_col = |header: &str| {
        template
            .iter()
            .find(|(_, label)| headers_match(header, label))
            .map(|&(col, _)| col)
    };

    let mut mapping = BTreeMap::new();
    for (src_col, label) in &source.headers {
        if let Some(col) = template_col(label.as_str()) {
            mapping.insert(*src_col, col);
        }
    }
    for (field, template_header) in exceptions {
        let src = source.headers.iter().find(|(_, label)| label.as_str() == *field);
        if let (Some(&(src_col, _)), Some(col)) = (src, template_col(*template_header)) {
            debug!(field, template_header, "Applied roster field exception");
            mapping.insert(src_col, col);
        }
    }
    mapping
}

fn is_placeholder(value: &CellValue) -> bool {
    let text = value.to_display_string();
    PLACEHOLDERS.contains(&text.trim())
}

/// Write the month index beside the "Bulan Berjalan" label, or at the fallback cell
fn write_month_index(sheet: &mut Sheet, spec: &RosterSpec, layout: &RosterLayout, month: Month) -> String {
    let label = (1..=layout.label_rows).find_map(|row| {
        (1..=spec.scan_width)
            .find(|&col| {
                sheet
                    .get(row, col)
                    .to_display_string()
                    .to_lowercase()
                    .contains(MONTH_LABEL)
            })
            .map(|col| (row, col))
    });

    let (row, col) = match label {
        Some((row, col)) => (row, col + 1),
        None => {
            warn!(
                sheet = spec.sheet,
                "No 'Bulan Berjalan' label found; writing month to {}",
                cell_name(spec.fallback_cell.0, spec.fallback_cell.1)
            );
            spec.fallback_cell
        }
    };
    sheet.set_best_effort(row, col, CellValue::Number(f64::from(month.index())));
    cell_name(row, col)
}

/// Refill one roster sheet from its export; `None` when the template lacks the sheet
pub fn update_roster(
    workbook: &mut Workbook,
    spec: &RosterSpec,
    layout: &RosterLayout,
    source: &Sheet,
    order: &ProductCodeOrder,
    month: Month,
) -> EtlResult<Option<RosterUpdate>> {
    let Some(sheet) = workbook.sheet_mut(spec.sheet) else {
        warn!(sheet = spec.sheet, "Roster sheet not found in template, skipping");
        return Ok(None);
    };

    let template: Vec<(u32, String)> = sheet
        .header_labels(layout.header_row)
        .into_iter()
        .filter(|(col, _)| *col <= spec.scan_width)
        .collect();
    let table = SourceTable::from_sheet(source);
    let mapping = map_columns(&table, &template, spec.exceptions);
    info!(
        sheet = spec.sheet,
        mapped = mapping.len(),
        source_columns = table.headers.len(),
        "Mapped export columns onto roster template"
    );

    let code_col = table.column_named(&normalize(PRODUCT_CODE_FIELD));
    let (rows, rows_dropped) = match code_col {
        Some(col) => {
            let ordered = order.sort_and_filter(table.rows, |row| {
                row.get(&col).and_then(ProductCode::from_cell)
            });
            (ordered.kept, ordered.dropped)
        }
        None => {
            warn!(sheet = spec.sheet, "Column '{}' not found, rows keep export order", PRODUCT_CODE_FIELD);
            (table.rows, 0)
        }
    };

    let month_cell = write_month_index(sheet, spec, layout, month);

    let template_formulas: Vec<(u32, String)> = sheet
        .cells()
        .filter(|((row, _), _)| *row == layout.data_start)
        .filter_map(|((_, col), v)| v.as_formula().map(|f| (col, f.to_string())))
        .collect();
    let mapped_targets: HashSet<u32> = mapping.values().copied().collect();
    let retargeter = RowRetargeter::new(layout.data_start)?;

    sheet.clear_rows_from(layout.data_start);

    for (i, row_values) in rows.iter().enumerate() {
        let row = layout.data_start + i as u32;
        for (src_col, dst_col) in &mapping {
            match row_values.get(src_col) {
                Some(value) if !is_placeholder(value) => {
                    sheet.set_best_effort(row, *dst_col, value.clone());
                }
                _ => {}
            }
        }
        for (col, formula) in &template_formulas {
            if !mapped_targets.contains(col) {
                sheet.set_best_effort(row, *col, CellValue::formula(retargeter.retarget(formula, row)));
            }
        }
    }

    let last_row = (layout.data_start + rows.len() as u32).saturating_sub(1);
    let subtotal_cols: Vec<u32> = sheet
        .cells()
        .filter(|((row, _), v)| {
            *row == layout.summary_row
                && v.as_formula()
                    .is_some_and(|f| f.to_uppercase().contains("SUBTOTAL"))
        })
        .map(|((_, col), _)| col)
        .collect();
    for &col in &subtotal_cols {
        let letter = column_letter(col);
        sheet.set_best_effort(
            layout.summary_row,
            col,
            CellValue::formula(format!(
                "=SUBTOTAL(9,{}{}:{}{})",
                letter, layout.data_start, letter, last_row
            )),
        );
    }

    info!(sheet = spec.sheet, rows = rows.len(), dropped = rows_dropped, "Roster sheet updated");
    Ok(Some(RosterUpdate {
        sheet: spec.sheet.to_string(),
        rows_written: rows.len(),
        rows_dropped,
        mapped_columns: mapping.len(),
        formula_columns: template_formulas
            .iter()
            .filter(|(col, _)| !mapped_targets.contains(col))
            .count(),
        subtotals_rewritten: subtotal_cols.len(),
        month_cell,
    }))
}
