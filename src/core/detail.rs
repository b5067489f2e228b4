//! "Realisasi" detail sheet and the Summary sheet
//!
//! The template carries last month's detail sheet. It is renamed to the
//! current month and refilled with this month's revenue lines in report order.

use crate::config::{DashboardLayout, Month, PipelineConfig};
use crate::core::ordering::ProductCodeOrder;
use crate::error::{EtlError, EtlResult};
use crate::excel::reference::{column_letter, sheet_prefix};
use crate::excel::{CellValue, Workbook};
use crate::types::DetailTable;
use tracing::{info, warn};

pub const SUMMARY_SHEET: &str = "Summary";

/// Where the dashboard SUMIF formulas read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailTarget {
    pub sheet: String,
    /// Column matched against the dashboard key (product code)
    pub key_col: u32,
    pub value_col: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailWrite {
    pub target: DetailTarget,
    pub written: usize,
    pub dropped: usize,
}

/// Rename or create the current month's detail sheet and fill it
pub fn write_detail_sheet(
    workbook: &mut Workbook,
    config: &PipelineConfig,
    table: &DetailTable,
    order: &ProductCodeOrder,
) -> EtlResult<DetailWrite> {
    let target_name = config.detail_sheet();
    let previous_name = config.previous_detail_sheet();

    if previous_name != target_name && workbook.contains(&previous_name) {
        if workbook.remove_sheet(&target_name).is_some() {
            warn!(sheet = %target_name, "Replaced a stale detail sheet left in the template");
        }
        workbook.rename_sheet(&previous_name, &target_name)?;
        info!(from = %previous_name, to = %target_name, "Renamed detail sheet");
    } else if !workbook.contains(&target_name) {
        workbook.add_sheet(&target_name)?;
        info!(sheet = %target_name, "Created detail sheet");
    }

    let sheet = workbook
        .sheet_mut(&target_name)
        .ok_or_else(|| EtlError::Structure(format!("Detail sheet '{}' vanished", target_name)))?;
    sheet.clear_rows_from(1);

    for (i, header) in table.headers().into_iter().enumerate() {
        sheet.set(1, i as u32 + 1, CellValue::from(header))?;
    }

    let ordered = order.sort_and_filter(table.lines.iter().collect(), |l| l.code.clone());
    for (i, line) in ordered.kept.iter().enumerate() {
        let row = i as u32 + 2;
        for (j, cell) in table.row_cells(line).into_iter().enumerate() {
            sheet.set(row, j as u32 + 1, cell)?;
        }
    }
    info!(
        sheet = %target_name,
        rows = ordered.kept.len(),
        "Detail sheet written in product-code order"
    );

    Ok(DetailWrite {
        target: DetailTarget {
            sheet: target_name,
            key_col: table.code_col(),
            value_col: table.value_col(),
        },
        written: ordered.kept.len(),
        dropped: ordered.dropped,
    })
}

/// Point the Summary sheet at this month; returns false when there is no Summary sheet
pub fn update_summary(
    workbook: &mut Workbook,
    layout: &DashboardLayout,
    month: Month,
) -> EtlResult<bool> {
    let Some(sheet) = workbook.sheet_mut(SUMMARY_SHEET) else {
        return Ok(false);
    };

    sheet.set(2, 3, CellValue::from(format!("Realisasi {}", month)))?;
    let formula = format!(
        "={}{}{}",
        sheet_prefix(&layout.sheet),
        column_letter(layout.cumulative_col(month)),
        layout.grand_total_row
    );
    info!(formula = %formula, "Summary sheet updated");
    sheet.set(3, 3, CellValue::formula(formula))?;
    Ok(true)
}
