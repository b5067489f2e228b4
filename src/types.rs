//! Domain types shared by the pipeline stages

use crate::excel::document::format_number;
use crate::excel::CellValue;
use serde::Serialize;
use std::fmt;

/// Canonical product identifier, an integer-like string such as `"719"`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProductCode(String);

impl ProductCode {
    /// Parse a label that is already a code: digits, optionally with a
    /// trailing `.0` left over from a float cell
    pub fn parse(text: &str) -> Option<Self> {
        let cleaned = strip_float_suffix(text.trim());
        if !cleaned.is_empty() && cleaned.chars().all(|c| c.is_ascii_digit()) {
            Some(Self(cleaned.to_string()))
        } else {
            None
        }
    }

    /// Numeric-looking cell as a code (`719.0` → `"719"`)
    pub fn from_cell(cell: &CellValue) -> Option<Self> {
        match cell {
            CellValue::Number(n) if n.is_finite() && *n >= 0.0 && n.fract() == 0.0 => {
                Some(Self(format_number(*n)))
            }
            CellValue::Text(s) => Self::parse(s),
            _ => None,
        }
    }

    /// Code text from a reference table, cleaned but not required to be numeric
    pub fn from_reference(cell: &CellValue) -> Option<Self> {
        let text = cell.to_display_string();
        let cleaned = strip_float_suffix(text.trim());
        if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("nan") {
            None
        } else {
            Some(Self(cleaned.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_number(&self) -> Option<u32> {
        self.0.parse().ok()
    }
}

impl fmt::Display for ProductCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn strip_float_suffix(text: &str) -> &str {
    text.strip_suffix(".0").unwrap_or(text)
}

/// One customer of the raw export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerRecord {
    pub number: String,
    pub name: Option<String>,
}

/// Segment hierarchy joined from the product master by code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PortfolioAttributes {
    pub business_segment: String,
    pub business_code: String,
    pub segment_1: String,
    pub code_1: String,
    pub segment_2: String,
    pub code_2: String,
    pub segment_3: String,
    pub code_3: String,
    pub segmen: String,
}

impl PortfolioAttributes {
    /// Master-table header for each attribute, in output order
    pub const COLUMNS: [&'static str; 9] = [
        "Business Portofolio Segment 0",
        "Kode 0",
        "Product Portofolio Segmen 1",
        "Kode 1",
        "Product Portofolio Segmen 2",
        "Kode 2",
        "Product Portofolio Segmen 3",
        "Kode 3",
        "SEGMEN",
    ];

    pub fn values(&self) -> [&str; 9] {
        [
            self.business_segment.as_str(),
            self.business_code.as_str(),
            self.segment_1.as_str(),
            self.code_1.as_str(),
            self.segment_2.as_str(),
            self.code_2.as_str(),
            self.segment_3.as_str(),
            self.code_3.as_str(),
            self.segmen.as_str(),
        ]
    }

    pub fn field_mut(&mut self, index: usize) -> Option<&mut String> {
        match index {
            0 => Some(&mut self.business_segment),
            1 => Some(&mut self.business_code),
            2 => Some(&mut self.segment_1),
            3 => Some(&mut self.code_1),
            4 => Some(&mut self.segment_2),
            5 => Some(&mut self.code_2),
            6 => Some(&mut self.segment_3),
            7 => Some(&mut self.code_3),
            8 => Some(&mut self.segmen),
            _ => None,
        }
    }
}

/// One nonzero (customer, product) amount after unpivoting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RevenueLine {
    pub customer: CustomerRecord,
    pub code: Option<ProductCode>,
    pub product_name: String,
    pub value: f64,
    pub portfolio: PortfolioAttributes,
}

/// Long-form revenue table destined for the "Realisasi" detail sheet
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailTable {
    pub include_customer_name: bool,
    pub lines: Vec<RevenueLine>,
}

impl DetailTable {
    /// Header row of the detail sheet
    pub fn headers(&self) -> Vec<&'static str> {
        let mut headers = vec!["Customer Number"];
        if self.include_customer_name {
            headers.push("Customer Name");
        }
        headers.extend(["Kode Produk", "Produk/Layanan", "Value"]);
        headers.extend(PortfolioAttributes::COLUMNS);
        headers
    }

    /// 1-based column of the product code
    pub fn code_col(&self) -> u32 {
        if self.include_customer_name {
            3
        } else {
            2
        }
    }

    /// 1-based column of the amount
    pub fn value_col(&self) -> u32 {
        self.code_col() + 2
    }

    /// Cells of one line, in header order
    pub fn row_cells(&self, line: &RevenueLine) -> Vec<CellValue> {
        let mut cells = Vec::with_capacity(14);
        cells.push(numeric_or_text(&line.customer.number));
        if self.include_customer_name {
            cells.push(
                line.customer
                    .name
                    .as_deref()
                    .map(CellValue::from)
                    .unwrap_or(CellValue::Empty),
            );
        }
        cells.push(
            line.code
                .as_ref()
                .map(|c| numeric_or_text(c.as_str()))
                .unwrap_or(CellValue::Empty),
        );
        cells.push(CellValue::from(line.product_name.as_str()));
        cells.push(CellValue::Number(line.value));
        cells.extend(line.portfolio.values().into_iter().map(|v| {
            if v.is_empty() {
                CellValue::Empty
            } else {
                CellValue::from(v)
            }
        }));
        cells
    }
}

/// Digit strings become numbers so SUMIF criteria match them
fn numeric_or_text(text: &str) -> CellValue {
    if !text.is_empty() && text.chars().all(|c| c.is_ascii_digit()) {
        if let Ok(n) = text.parse::<u64>() {
            return CellValue::Number(n as f64);
        }
    }
    CellValue::from(text)
}
