//! Open-ended range rewriting
//!
//! `$M$4:$M$12429` becomes `$M:$M`, so aggregates keep covering rows added
//! to a sheet after the report is produced.

use crate::error::{EtlError, EtlResult};
use crate::excel::Sheet;
use regex::Regex;
use tracing::{debug, info};

pub struct RangeDynamicizer {
    pattern: Regex,
}

impl RangeDynamicizer {
    pub fn new() -> EtlResult<Self> {
        let pattern = Regex::new(r"\$([A-Z]+)\$\d+:\$([A-Z]+)\$\d+")
            .map_err(|e| EtlError::Formula(format!("Regex error: {}", e)))?;
        Ok(Self { pattern })
    }

    /// Rewrite one formula; text without absolute row ranges comes back unchanged
    pub fn rewrite(&self, formula: &str) -> String {
        self.pattern.replace_all(formula, "$$$1:$$$2").into_owned()
    }

    /// Rewrite the formulas of a sheet from `first_row` down, returning how many changed
    pub fn apply(&self, sheet: &mut Sheet, first_row: u32) -> usize {
        let name = sheet.name().to_string();
        let mut changed = 0;
        for ((row, col), text) in sheet.formulas_mut() {
            if row < first_row {
                continue;
            }
            let updated = self.rewrite(text);
            if updated != *text {
                debug!(sheet = %name, row, col, from = %text, to = %updated, "Range made dynamic");
                *text = updated;
                changed += 1;
            }
        }
        info!(sheet = %name, formulas = changed, "Fixed ranges replaced with whole columns");
        changed
    }
}
