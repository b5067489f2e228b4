//! Dashboard formula engine
//!
//! Each Dashboard row is classified once ([`RowKind`]) and the current month
//! picks the phase ([`MonthPhase`]). Every (phase, kind) pair has its own
//! formula shape:
//!
//! | phase    | first data row              | other data rows              | grand total        |
//! |----------|-----------------------------|------------------------------|--------------------|
//! | January  | SUMIF, SA = Kum, copy SA    | SUMIF, SA = Kum              | vertical sums      |
//! | Middle   | SUMIF, SA = Kum - Lalu, avg | SUMIF, SA = Kum - Lalu, CO+NR| vertical sums      |
//! | December | SUMIF, SA = Kum - Lalu      | SUMIF, SA = Kum - Lalu       | vertical sums      |
//!
//! Outside January the previous month's cumulative value is written back as
//! a literal number before any formula is placed.

use crate::config::{DashboardLayout, Month};
use crate::core::detail::DetailTarget;
use crate::error::EtlResult;
use crate::excel::reference::{column_letter, sheet_prefix, whole_column};
use crate::excel::{CellValue, Sheet};
use serde::Serialize;
use tracing::{debug, info, warn};

/// Where the current month sits in the year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonthPhase {
    /// No prior month exists
    January,
    /// Realised months behind, forecast months ahead
    Middle(Month),
    /// Nothing left to forecast
    December,
}

impl MonthPhase {
    pub fn of(month: Month) -> Self {
        match month {
            Month::Januari => MonthPhase::January,
            Month::Desember => MonthPhase::December,
            other => MonthPhase::Middle(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    FirstData,
    OtherData,
    GrandTotal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub rows_rewritten: usize,
    pub grand_total_rows: usize,
    pub carried_forward: usize,
}

pub struct DashboardEngine<'a> {
    layout: &'a DashboardLayout,
    month: Month,
    previous: Month,
    detail: &'a DetailTarget,
}

impl<'a> DashboardEngine<'a> {
    pub fn new(
        layout: &'a DashboardLayout,
        month: Month,
        previous: Month,
        detail: &'a DetailTarget,
    ) -> Self {
        if month != Month::Januari && month.previous() != Some(previous) {
            warn!(
                current = %month,
                previous = %previous,
                "Previous month is not the month before the current one; carrying forward {} anyway",
                previous
            );
        }
        Self {
            layout,
            month,
            previous,
            detail,
        }
    }

    pub fn phase(&self) -> MonthPhase {
        MonthPhase::of(self.month)
    }

    /// A "total" label only marks the grand total in January; later months
    /// rely on the configured row alone.
    pub fn classify(&self, row: u32, key: &CellValue) -> RowKind {
        let labelled_total = self.phase() == MonthPhase::January
            && key.to_display_string().to_lowercase().contains("total");
        if row == self.layout.grand_total_row || labelled_total {
            RowKind::GrandTotal
        } else if row == self.layout.data_start {
            RowKind::FirstData
        } else {
            RowKind::OtherData
        }
    }

    /// Column receiving last month's cumulative value as a literal
    pub fn carry_forward_col(&self) -> Option<u32> {
        match self.phase() {
            MonthPhase::January => None,
            _ => Some(self.layout.cumulative_col(self.previous)),
        }
    }

    /// Columns blanked before a row is rewritten
    pub fn cleared_columns(&self, kind: RowKind) -> Vec<u32> {
        let mut cols = vec![
            self.layout.cumulative_col(self.month),
            self.layout.standalone_col(self.month),
        ];
        if kind == RowKind::FirstData {
            cols.push(self.layout.standalone_col(Month::Desember));
            cols.push(self.layout.cumulative_col(Month::Desember));
        }
        cols.push(self.layout.remaining_col);
        cols
    }

    /// Cells written to one row, in write order
    pub fn plan_row(&self, row: u32, kind: RowKind) -> Vec<(u32, CellValue)> {
        match (self.phase(), kind) {
            (MonthPhase::January, RowKind::GrandTotal) => self.january_total(row),
            (MonthPhase::January, kind) => self.january_data(row, kind),
            (MonthPhase::Middle(m), RowKind::GrandTotal) => self.middle_total(row, m),
            (MonthPhase::Middle(m), RowKind::FirstData) => self.middle_first(row, m),
            (MonthPhase::Middle(m), RowKind::OtherData) => self.middle_other(row, m),
            (MonthPhase::December, RowKind::GrandTotal) => self.december_total(row),
            (MonthPhase::December, _) => self.december_data(row),
        }
    }

    /// Rewrite every keyed row of the Dashboard sheet
    pub fn apply(&self, sheet: &mut Sheet) -> EtlResult<DashboardStats> {
        self.check_headers(sheet);
        let carry_col = self.carry_forward_col();

        // Classify and read carried values before anything is written
        let rows: Vec<(u32, RowKind, Option<f64>)> = (self.layout.data_start..=sheet.max_row())
            .filter_map(|row| {
                let key = sheet.get(row, self.layout.key_col);
                if key.is_empty() {
                    return None;
                }
                let carried = carry_col.map(|col| carried_value(sheet.get(row, col)));
                Some((row, self.classify(row, key), carried))
            })
            .collect();

        let mut stats = DashboardStats::default();
        for (row, kind, carried) in rows {
            for col in self.cleared_columns(kind) {
                sheet.clear(row, col);
            }
            if let (Some(col), Some(value)) = (carry_col, carried) {
                sheet.set(row, col, CellValue::Number(value))?;
                stats.carried_forward += 1;
            }
            for (col, value) in self.plan_row(row, kind) {
                sheet.set(row, col, value)?;
            }

            stats.rows_rewritten += 1;
            if kind == RowKind::GrandTotal {
                stats.grand_total_rows += 1;
            }
        }

        if stats.grand_total_rows == 0 {
            warn!(
                row = self.layout.grand_total_row,
                "No grand total row found on '{}'",
                sheet.name()
            );
        }
        info!(
            month = %self.month,
            rows = stats.rows_rewritten,
            carried = stats.carried_forward,
            "Dashboard formulas rewritten"
        );
        Ok(stats)
    }

    fn check_headers(&self, sheet: &Sheet) {
        let month = self.month.name().to_lowercase();
        for col in [
            self.layout.cumulative_col(self.month),
            self.layout.standalone_col(self.month),
        ] {
            let header = sheet.get(self.layout.header_row, col).to_display_string();
            if !header.to_lowercase().contains(&month) {
                warn!(
                    column = %column_letter(col),
                    header = %header,
                    "Dashboard header does not mention {}; check the template layout",
                    self.month
                );
            } else {
                debug!(column = %column_letter(col), header = %header, "Dashboard column matched");
            }
        }
    }

    // --- column letters ---

    fn cum(&self, month: Month) -> String {
        column_letter(self.layout.cumulative_col(month))
    }

    /// Cumulative column of the month before `month`
    fn cum_before(&self, month: Month) -> String {
        column_letter(self.layout.cumulative_col(month) - 1)
    }

    fn sa(&self, month: Month) -> String {
        column_letter(self.layout.standalone_col(month))
    }

    fn key(&self, row: u32) -> String {
        format!("{}{}", column_letter(self.layout.key_col), row)
    }

    // --- formula shapes ---

    fn sumif_detail(&self, row: u32) -> CellValue {
        CellValue::formula(format!(
            "=SUMIF({}, {}, {})",
            whole_column(&self.detail.sheet, self.detail.key_col),
            self.key(row),
            whole_column(&self.detail.sheet, self.detail.value_col)
        ))
    }

    fn roster_forecast(&self, row: u32, month: Month) -> CellValue {
        let roster = self.layout.roster_sheet.as_str();
        let key_range = whole_column(roster, self.layout.roster_key_col);
        let key = format!("{}{}", sheet_prefix(&self.layout.sheet), self.key(row));
        CellValue::formula(format!(
            "=SUMIF({}, {}, {})+SUMIF({}, {}, {})",
            key_range,
            key,
            whole_column(roster, self.layout.carry_over_col(month)),
            key_range,
            key,
            whole_column(roster, self.layout.new_revenue_col(month))
        ))
    }

    fn vertical_sum(&self, col: u32, row: u32) -> (u32, CellValue) {
        let letter = column_letter(col);
        (
            col,
            CellValue::formula(format!(
                "=SUM({}{}:{}{})",
                letter,
                self.layout.data_start,
                letter,
                row - 1
            )),
        )
    }

    fn reference(col: String, row: u32) -> CellValue {
        CellValue::formula(format!("={}{}", col, row))
    }

    /// `cum(p) = cum(p-1) + sa(p)`
    fn chained_cumulative(&self, row: u32, month: Month) -> (u32, CellValue) {
        (
            self.layout.cumulative_col(month),
            CellValue::formula(format!(
                "={}{}+{}{}",
                self.cum_before(month),
                row,
                self.sa(month),
                row
            )),
        )
    }

    fn realised_delta(&self, row: u32) -> CellValue {
        CellValue::formula(format!(
            "={}{}-{}{}",
            self.cum(self.month),
            row,
            self.cum(self.previous),
            row
        ))
    }

    // --- January ---

    fn january_data(&self, row: u32, kind: RowKind) -> Vec<(u32, CellValue)> {
        let jan = Month::Januari;
        let mut cells = vec![
            (self.layout.cumulative_col(jan), self.sumif_detail(row)),
            (self.layout.standalone_col(jan), Self::reference(self.cum(jan), row)),
        ];

        if kind == RowKind::FirstData {
            for &p in months_after(jan) {
                cells.push((self.layout.standalone_col(p), Self::reference(self.sa(jan), row)));
                cells.push(self.chained_cumulative(row, p));
            }
        }

        cells.push((
            self.layout.remaining_col,
            CellValue::formula(format!(
                "=SUM({}{}:{}{})",
                self.sa(Month::Februari),
                row,
                self.sa(Month::Desember),
                row
            )),
        ));
        cells
    }

    fn january_total(&self, row: u32) -> Vec<(u32, CellValue)> {
        let mut cells = Vec::with_capacity(25);
        for month in Month::ALL {
            cells.push(self.vertical_sum(self.layout.cumulative_col(month), row));
            cells.push(self.vertical_sum(self.layout.standalone_col(month), row));
        }
        cells.push(self.vertical_sum(self.layout.remaining_col, row));
        cells
    }

    // --- February to November ---

    fn middle_realised(&self, row: u32, month: Month) -> Vec<(u32, CellValue)> {
        vec![
            (self.layout.cumulative_col(month), self.sumif_detail(row)),
            (self.layout.standalone_col(month), self.realised_delta(row)),
        ]
    }

    fn middle_remaining(&self, row: u32, month: Month) -> (u32, CellValue) {
        let dec = self.sa(Month::Desember);
        let value = match month.next() {
            Some(next) if next != Month::Desember => CellValue::formula(format!(
                "=SUM({}{}:{}{})",
                self.sa(next),
                row,
                dec,
                row
            )),
            // One month left: a direct reference equals the one-term sum
            _ => Self::reference(dec, row),
        };
        (self.layout.remaining_col, value)
    }

    /// Forecast every later month at the average realised SA so far
    fn middle_first(&self, row: u32, month: Month) -> Vec<(u32, CellValue)> {
        let mut cells = self.middle_realised(row, month);
        let sa_des = self.sa(Month::Desember);

        cells.push((
            self.layout.standalone_col(Month::Desember),
            CellValue::formula(format!(
                "=SUM({}{}:{}{})/{}",
                self.sa(Month::Januari),
                row,
                self.sa(month),
                row,
                month.index()
            )),
        ));
        for &p in months_after(month) {
            if p != Month::Desember {
                cells.push((self.layout.standalone_col(p), Self::reference(sa_des.clone(), row)));
            }
            cells.push(self.chained_cumulative(row, p));
        }

        cells.push(self.middle_remaining(row, month));
        cells
    }

    /// Forecast every later month from the roster's carry-over and new revenue
    fn middle_other(&self, row: u32, month: Month) -> Vec<(u32, CellValue)> {
        let mut cells = self.middle_realised(row, month);
        for &p in months_after(month) {
            cells.push((self.layout.standalone_col(p), self.roster_forecast(row, p)));
            cells.push(self.chained_cumulative(row, p));
        }
        cells.push(self.middle_remaining(row, month));
        cells
    }

    fn middle_total(&self, row: u32, month: Month) -> Vec<(u32, CellValue)> {
        let mut cells = vec![
            self.vertical_sum(self.layout.cumulative_col(month), row),
            self.vertical_sum(self.layout.standalone_col(month), row),
        ];
        for &p in months_after(month) {
            cells.push(self.vertical_sum(self.layout.cumulative_col(p), row));
            cells.push(self.vertical_sum(self.layout.standalone_col(p), row));
        }
        cells.push(self.vertical_sum(self.layout.remaining_col, row));
        cells
    }

    // --- December ---

    fn december_data(&self, row: u32) -> Vec<(u32, CellValue)> {
        let dec = Month::Desember;
        vec![
            (self.layout.cumulative_col(dec), self.sumif_detail(row)),
            (self.layout.standalone_col(dec), self.realised_delta(row)),
            (self.layout.remaining_col, CellValue::Number(0.0)),
        ]
    }

    fn december_total(&self, row: u32) -> Vec<(u32, CellValue)> {
        let dec = Month::Desember;
        vec![
            self.vertical_sum(self.layout.cumulative_col(dec), row),
            self.vertical_sum(self.layout.standalone_col(dec), row),
            (self.layout.remaining_col, CellValue::Number(0.0)),
        ]
    }
}

/// Months strictly after `month`, in calendar order
fn months_after(month: Month) -> &'static [Month] {
    &Month::ALL[month.index() as usize..]
}

/// Numeric value of the template's previous-month cell; blanks count as 0
fn carried_value(cell: &CellValue) -> f64 {
    match cell {
        CellValue::Text(s) => s.trim().parse().unwrap_or(0.0),
        other => other.as_number().unwrap_or(0.0),
    }
}
