//! Product code resolution and portfolio lookup from the product master
//!
//! The master workbook carries two tables:
//! - "ALL PRODUCT PDF" (header row 3): code column "ICON+ Product", segment
//!   name columns and the portfolio hierarchy
//! - an optional SAP sheet (first sheet whose name contains "sap", header
//!   row 2) mapping "Nama Produk" to "Kode di SAP"
//!
//! Names from the primary table always win; the SAP table only fills gaps.

use crate::core::normalize::lookup_key;
use crate::error::{EtlError, EtlResult};
use crate::excel::{Sheet, Workbook};
use crate::types::{PortfolioAttributes, ProductCode};
use std::collections::HashMap;
use tracing::{debug, info, warn};

pub const MASTER_SHEET: &str = "ALL PRODUCT PDF";
pub const MASTER_HEADER_ROW: u32 = 3;
pub const CODE_COLUMN: &str = "ICON+ Product";

/// Columns scanned for product names, in scan order
pub const NAME_COLUMNS: [&str; 4] = [
    "Product Portofolio Segmen 1",
    "Product Portofolio Segmen 2",
    "Product Portofolio Segmen 3",
    "SEGMEN",
];

const SAP_HEADER_ROW: u32 = 2;
const SAP_NAME_COLUMN: &str = "Nama Produk";
const SAP_CODE_COLUMN: &str = "Kode di SAP";

/// Maps free-text product names to canonical codes
#[derive(Debug, Clone, Default)]
pub struct ProductResolver {
    primary: HashMap<String, ProductCode>,
    fallback: HashMap<String, ProductCode>,
}

impl ProductResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a name from the primary table; a later row for the same name replaces it
    pub fn insert_primary(&mut self, name: &str, code: ProductCode) {
        let key = lookup_key(name);
        if !key.is_empty() {
            self.primary.insert(key, code);
        }
    }

    /// Register a name from the fallback table; never shadows an existing entry
    pub fn insert_fallback(&mut self, name: &str, code: ProductCode) -> bool {
        let key = lookup_key(name);
        if key.is_empty() || self.primary.contains_key(&key) || self.fallback.contains_key(&key) {
            return false;
        }
        self.fallback.insert(key, code);
        true
    }

    pub fn len(&self) -> usize {
        self.primary.len() + self.fallback.len()
    }

    pub fn is_empty(&self) -> bool {
        self.primary.is_empty() && self.fallback.is_empty()
    }

    /// Resolve a product label, which may already be a code
    pub fn resolve(&self, label: &str) -> Option<ProductCode> {
        if let Some(code) = ProductCode::parse(label) {
            return Some(code);
        }

        let key = lookup_key(label);
        self.primary
            .get(&key)
            .or_else(|| self.fallback.get(&key))
            .cloned()
    }
}

/// Portfolio hierarchy per product code, first master row per code wins
#[derive(Debug, Clone, Default)]
pub struct PortfolioIndex {
    entries: HashMap<String, PortfolioAttributes>,
}

impl PortfolioIndex {
    pub fn insert(&mut self, code: &ProductCode, attributes: PortfolioAttributes) {
        self.entries
            .entry(lookup_key(code.as_str()))
            .or_insert(attributes);
    }

    pub fn get(&self, code: &ProductCode) -> Option<&PortfolioAttributes> {
        self.entries.get(&lookup_key(code.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything the transformer needs from the product master workbook
#[derive(Debug, Clone, Default)]
pub struct ProductMaster {
    pub resolver: ProductResolver,
    pub portfolio: PortfolioIndex,
}

impl ProductMaster {
    pub fn from_workbook(workbook: &Workbook) -> EtlResult<Self> {
        let sheet = workbook.sheet(MASTER_SHEET).ok_or_else(|| {
            EtlError::Structure(format!(
                "Sheet '{}' not found in product master. Available sheets: {:?}",
                MASTER_SHEET,
                workbook.sheet_names()
            ))
        })?;

        let mut master = Self::from_master_sheet(sheet)?;

        match workbook.find_sheet_containing_ignore_case("sap") {
            Some(sap) => match master.add_sap_fallback(sap) {
                Ok(added) => info!(sheet = %sap.name(), added, "Loaded SAP fallback names"),
                Err(e) => warn!("Failed to load optional SAP sheet '{}': {}", sap.name(), e),
            },
            None => debug!("No SAP sheet in product master, skipping fallback names"),
        }

        if master.resolver.is_empty() {
            warn!("Product name mapping is empty; only numeric product labels will resolve");
        }
        info!(
            names = master.resolver.len(),
            portfolio_codes = master.portfolio.len(),
            "Product master loaded"
        );
        Ok(master)
    }

    fn from_master_sheet(sheet: &Sheet) -> EtlResult<Self> {
        let code_col = sheet
            .find_header(MASTER_HEADER_ROW, CODE_COLUMN)
            .ok_or_else(|| {
                let found: Vec<String> = sheet
                    .header_labels(MASTER_HEADER_ROW)
                    .into_iter()
                    .take(10)
                    .map(|(_, label)| label)
                    .collect();
                EtlError::Structure(format!(
                    "Required column '{}' missing from '{}'. Columns found: {:?}",
                    CODE_COLUMN,
                    sheet.name(),
                    found
                ))
            })?;

        let name_cols: Vec<u32> = NAME_COLUMNS
            .iter()
            .filter_map(|name| sheet.find_header(MASTER_HEADER_ROW, name))
            .collect();
        let attribute_cols: Vec<(usize, u32)> = PortfolioAttributes::COLUMNS
            .iter()
            .enumerate()
            .filter_map(|(i, name)| Some((i, sheet.find_header(MASTER_HEADER_ROW, name)?)))
            .collect();

        let mut master = Self::default();
        for row in MASTER_HEADER_ROW + 1..=sheet.max_row() {
            let Some(code) = ProductCode::from_reference(sheet.get(row, code_col)) else {
                continue;
            };

            for &col in &name_cols {
                let name = sheet.get(row, col).to_display_string();
                let name = name.trim();
                if !name.is_empty() && name != "nan" {
                    master.resolver.insert_primary(name, code.clone());
                }
            }

            let mut attributes = PortfolioAttributes::default();
            for &(idx, col) in &attribute_cols {
                if let Some(field) = attributes.field_mut(idx) {
                    *field = sheet.get(row, col).to_display_string().trim().to_string();
                }
            }
            master.portfolio.insert(&code, attributes);
        }

        Ok(master)
    }

    fn add_sap_fallback(&mut self, sheet: &Sheet) -> EtlResult<usize> {
        let missing = |name: &str| {
            EtlError::Structure(format!(
                "Required column '{}' missing from SAP sheet '{}'",
                name,
                sheet.name()
            ))
        };
        let name_col = sheet
            .find_header(SAP_HEADER_ROW, SAP_NAME_COLUMN)
            .ok_or_else(|| missing(SAP_NAME_COLUMN))?;
        let code_col = sheet
            .find_header(SAP_HEADER_ROW, SAP_CODE_COLUMN)
            .ok_or_else(|| missing(SAP_CODE_COLUMN))?;

        let mut added = 0;
        for row in SAP_HEADER_ROW + 1..=sheet.max_row() {
            let name = sheet.get(row, name_col).to_display_string();
            let name = name.trim();
            if name.is_empty() || name == "nan" {
                continue;
            }
            if let Some(code) = ProductCode::from_reference(sheet.get(row, code_col)) {
                if self.resolver.insert_fallback(name, code) {
                    added += 1;
                }
            }
        }
        Ok(added)
    }
}
