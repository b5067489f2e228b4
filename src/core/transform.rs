//! Unpivot the wide raw table into revenue lines

use crate::core::extractor::{clean_customer_number, Extraction, CUSTOMER_NAME, CUSTOMER_NUMBER};
use crate::core::normalize::normalize;
use crate::core::resolver::{ProductMaster, MASTER_SHEET};
use crate::error::{EtlError, EtlResult};
use crate::excel::CellValue;
use crate::types::{CustomerRecord, DetailTable, ProductCode, RevenueLine};
use std::collections::HashSet;
use tracing::{info, warn};

/// Labels longer than this are treated as full product names
const FREE_TEXT_LABEL_LEN: usize = 10;

#[derive(Debug, Clone, Default)]
pub struct Transformed {
    pub detail: DetailTable,
    /// Product labels that resolved to no code, in first-seen order
    pub unresolved: Vec<String>,
    /// Resolved codes absent from the portfolio master
    pub missing_portfolio: Vec<String>,
}

/// True for headers that hold product amounts rather than identity or totals
pub fn is_product_column(header: &str) -> bool {
    let key = normalize(header);
    !key.is_empty()
        && !key.contains("total")
        && !key.contains("unnamed")
        && key != "segmen"
}

/// Numeric value of a raw amount cell; anything non-numeric counts as 0
pub fn coerce_amount(cell: &CellValue) -> f64 {
    let value = match cell {
        CellValue::Number(n) => *n,
        CellValue::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
        CellValue::Formula { cached, .. } => cached.unwrap_or(0.0),
        CellValue::Empty | CellValue::Bool(_) => 0.0,
    };
    if value.is_finite() {
        value
    } else {
        0.0
    }
}

pub fn transform(extraction: &Extraction, master: &ProductMaster) -> EtlResult<Transformed> {
    let table = &extraction.table;
    if table.is_empty() {
        return Err(EtlError::Data(
            "Raw input is empty: no customer rows left to process".to_string(),
        ));
    }

    let number_idx = table.column(CUSTOMER_NUMBER).ok_or_else(|| {
        EtlError::Data(format!(
            "Column '{}' not found. Columns found: {:?}",
            CUSTOMER_NUMBER,
            table.headers.iter().take(5).collect::<Vec<_>>()
        ))
    })?;
    let name_idx = table.column(CUSTOMER_NAME);

    let product_cols: Vec<usize> = table
        .headers
        .iter()
        .enumerate()
        .filter(|(i, h)| *i != number_idx && Some(*i) != name_idx && is_product_column(h))
        .map(|(i, _)| i)
        .collect();
    info!(
        products = product_cols.len(),
        with_customer_name = name_idx.is_some(),
        "Unpivoting product columns"
    );

    let mut result = Transformed {
        detail: DetailTable {
            include_customer_name: name_idx.is_some(),
            lines: Vec::new(),
        },
        ..Transformed::default()
    };
    let mut seen_unresolved = HashSet::new();
    let mut seen_missing = HashSet::new();

    // Column-major, the same order a melt produces
    for &col in &product_cols {
        let label = table.headers[col].as_str();
        let code = master.resolver.resolve(label);
        if code.is_none() && seen_unresolved.insert(label.to_string()) {
            warn!(label, "Product label did not resolve to a code");
            result.unresolved.push(label.to_string());
        }
        let product_name = display_name(label, code.as_ref(), extraction);

        let portfolio = match &code {
            Some(c) => match master.portfolio.get(c) {
                Some(attrs) => attrs.clone(),
                None => {
                    if seen_missing.insert(c.clone()) {
                        result.missing_portfolio.push(c.to_string());
                    }
                    Default::default()
                }
            },
            None => Default::default(),
        };

        for row in &table.rows {
            let value = row.get(col).map(coerce_amount).unwrap_or(0.0);
            if value == 0.0 {
                continue;
            }
            result.detail.lines.push(RevenueLine {
                customer: customer_record(row, number_idx, name_idx),
                code: code.clone(),
                product_name: product_name.clone(),
                value,
                portfolio: portfolio.clone(),
            });
        }
    }

    if !result.missing_portfolio.is_empty() {
        warn!(
            count = result.missing_portfolio.len(),
            "Product codes missing from '{}': {:?}",
            MASTER_SHEET,
            &result.missing_portfolio[..result.missing_portfolio.len().min(5)]
        );
    }
    info!(lines = result.detail.lines.len(), "Revenue lines produced");
    Ok(result)
}

fn customer_record(row: &[CellValue], number_idx: usize, name_idx: Option<usize>) -> CustomerRecord {
    let number = row
        .get(number_idx)
        .map(clean_customer_number)
        .unwrap_or_default();
    let name = name_idx
        .and_then(|i| row.get(i))
        .map(|c| c.to_display_string().trim().to_string())
        .filter(|s| !s.is_empty());
    CustomerRecord { number, name }
}

/// Long labels are kept verbatim, short ones use the name row of the export
fn display_name(label: &str, code: Option<&ProductCode>, extraction: &Extraction) -> String {
    if label.chars().count() > FREE_TEXT_LABEL_LEN {
        return label.to_string();
    }
    code.and_then(|c| extraction.product_names.get(c.as_str()))
        .cloned()
        .unwrap_or_else(|| label.to_string())
}
