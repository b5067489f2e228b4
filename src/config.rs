//! Run configuration
//!
//! A [`PipelineConfig`] is built once (from YAML and/or CLI flags) and passed
//! explicitly to every stage. Nothing in the pipeline reads process-wide state.

use crate::core::ordering::DEFAULT_PRODUCT_ORDER;
use crate::error::{EtlError, EtlResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Calendar month, named the way the report templates name them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Month {
    Januari,
    Februari,
    Maret,
    April,
    Mei,
    Juni,
    Juli,
    Agustus,
    September,
    Oktober,
    November,
    Desember,
}

impl Month {
    pub const ALL: [Month; 12] = [
        Month::Januari,
        Month::Februari,
        Month::Maret,
        Month::April,
        Month::Mei,
        Month::Juni,
        Month::Juli,
        Month::Agustus,
        Month::September,
        Month::Oktober,
        Month::November,
        Month::Desember,
    ];

    /// MonthIndex, 1 (Januari) through 12 (Desember)
    pub fn index(self) -> u32 {
        self as u32 + 1
    }

    pub fn from_index(index: u32) -> Option<Month> {
        let idx = usize::try_from(index).ok()?.checked_sub(1)?;
        Self::ALL.get(idx).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Month::Januari => "Januari",
            Month::Februari => "Februari",
            Month::Maret => "Maret",
            Month::April => "April",
            Month::Mei => "Mei",
            Month::Juni => "Juni",
            Month::Juli => "Juli",
            Month::Agustus => "Agustus",
            Month::September => "September",
            Month::Oktober => "Oktober",
            Month::November => "November",
            Month::Desember => "Desember",
        }
    }

    /// Month before this one within the same year
    pub fn previous(self) -> Option<Month> {
        Self::from_index(self.index() - 1)
    }

    /// Month after this one within the same year
    pub fn next(self) -> Option<Month> {
        Self::from_index(self.index() + 1)
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Month {
    type Err = EtlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();

        if let Ok(n) = key.parse::<u32>() {
            return Month::from_index(n)
                .ok_or_else(|| EtlError::Config(format!("Month number out of range: {}", n)));
        }

        let month = match key.as_str() {
            "januari" | "january" | "jan" => Month::Januari,
            "februari" | "february" | "feb" => Month::Februari,
            "maret" | "march" | "mar" => Month::Maret,
            "april" | "apr" => Month::April,
            "mei" | "may" => Month::Mei,
            "juni" | "june" | "jun" => Month::Juni,
            "juli" | "july" | "jul" => Month::Juli,
            "agustus" | "august" | "agu" | "aug" => Month::Agustus,
            "september" | "sep" => Month::September,
            "oktober" | "october" | "okt" | "oct" => Month::Oktober,
            "november" | "nov" => Month::November,
            "desember" | "december" | "des" | "dec" => Month::Desember,
            _ => {
                return Err(EtlError::Config(format!(
                    "Unknown month '{}'. Expected one of: {}",
                    s.trim(),
                    Month::ALL.map(Month::name).join(", ")
                )))
            }
        };
        Ok(month)
    }
}

impl TryFrom<String> for Month {
    type Error = EtlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Month> for String {
    fn from(month: Month) -> Self {
        month.name().to_string()
    }
}

/// Template positions on the Dashboard sheet
///
/// Month columns are derived from a base column plus the month index, so the
/// December forecast slots (U / AH with the default template) are not separate
/// constants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DashboardLayout {
    pub sheet: String,
    pub header_row: u32,
    pub data_start: u32,
    pub grand_total_row: u32,
    /// Column holding the row key matched by SUMIF (product code)
    pub key_col: u32,
    /// January cumulative ("Kumulatif") column
    pub cumulative_base: u32,
    /// January standalone ("SA") column
    pub standalone_base: u32,
    /// "Sisa perhitungan" (remaining) column
    pub remaining_col: u32,
    /// Roster sheet that feeds the carry-over / new-revenue forecast
    pub roster_sheet: String,
    /// Key column on the roster sheet matched against `key_col`
    pub roster_key_col: u32,
    /// January carry-over column on the roster sheet
    pub carry_over_base: u32,
    /// January new-revenue column on the roster sheet
    pub new_revenue_base: u32,
}

impl Default for DashboardLayout {
    fn default() -> Self {
        Self {
            sheet: "Dashboard".to_string(),
            header_row: 2,
            data_start: 3,
            grand_total_row: 64,
            key_col: 1,
            cumulative_base: 10,
            standalone_base: 23,
            remaining_col: 22,
            roster_sheet: "Data Pelanggan".to_string(),
            roster_key_col: 41,
            carry_over_base: 51,
            new_revenue_base: 63,
        }
    }
}

impl DashboardLayout {
    pub fn cumulative_col(&self, month: Month) -> u32 {
        self.cumulative_base + month.index() - 1
    }

    pub fn standalone_col(&self, month: Month) -> u32 {
        self.standalone_base + month.index() - 1
    }

    pub fn carry_over_col(&self, month: Month) -> u32 {
        self.carry_over_base + month.index() - 1
    }

    pub fn new_revenue_col(&self, month: Month) -> u32 {
        self.new_revenue_base + month.index() - 1
    }

    pub fn validate(&self) -> EtlResult<()> {
        let positions = [
            ("header_row", self.header_row),
            ("data_start", self.data_start),
            ("grand_total_row", self.grand_total_row),
            ("key_col", self.key_col),
            ("cumulative_base", self.cumulative_base),
            ("standalone_base", self.standalone_base),
            ("remaining_col", self.remaining_col),
            ("roster_key_col", self.roster_key_col),
            ("carry_over_base", self.carry_over_base),
            ("new_revenue_base", self.new_revenue_base),
        ];
        if let Some((name, _)) = positions.iter().find(|(_, v)| *v == 0) {
            return Err(EtlError::Config(format!(
                "layout.{} must be 1 or greater",
                name
            )));
        }
        if self.data_start <= self.header_row {
            return Err(EtlError::Config(format!(
                "layout.data_start ({}) must be below layout.header_row ({})",
                self.data_start, self.header_row
            )));
        }
        if self.grand_total_row <= self.data_start {
            return Err(EtlError::Config(format!(
                "layout.grand_total_row ({}) must be below layout.data_start ({})",
                self.grand_total_row, self.data_start
            )));
        }
        Ok(())
    }
}

/// Template positions shared by the roster sheets ("Data Pelanggan", "Data OPT")
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RosterLayout {
    /// Row holding the SUBTOTAL formulas
    pub summary_row: u32,
    pub header_row: u32,
    /// First data row; its formulas are the template for every written row
    pub data_start: u32,
    /// Rows scanned (from the top) for the "Bulan Berjalan" label
    pub label_rows: u32,
}

impl Default for RosterLayout {
    fn default() -> Self {
        Self {
            summary_row: 1,
            header_row: 3,
            data_start: 4,
            label_rows: 5,
        }
    }
}

/// The five input files of one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputFiles {
    /// Last month's report, used as the template for this month's output
    pub template: PathBuf,
    /// Monthly raw export with the "Konsol" pivot sheet
    pub raw_export: PathBuf,
    /// Product master ("ALL PRODUCT PDF" and optional SAP sheet)
    pub product_master: PathBuf,
    /// Source for the "Data Pelanggan" roster sheet
    pub customer_roster: PathBuf,
    /// Source for the "Data OPT" roster sheet
    pub opt_roster: PathBuf,
}

impl InputFiles {
    fn all(&self) -> [&PathBuf; 5] {
        [
            &self.template,
            &self.raw_export,
            &self.product_master,
            &self.customer_roster,
            &self.opt_roster,
        ]
    }
}

/// Everything one pipeline run needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PipelineConfig {
    pub inputs: InputFiles,
    pub output: PathBuf,
    pub previous_month: Month,
    pub current_month: Month,
    #[serde(default)]
    pub layout: DashboardLayout,
    #[serde(default)]
    pub roster: RosterLayout,
    /// Product codes in report order; codes outside this list are dropped
    #[serde(default = "default_product_order")]
    pub product_order: Vec<u32>,
}

fn default_product_order() -> Vec<u32> {
    DEFAULT_PRODUCT_ORDER.to_vec()
}

impl PipelineConfig {
    /// Load a YAML config; relative paths resolve against the file's directory
    pub fn from_yaml_file(path: &Path) -> EtlResult<Self> {
        if !path.exists() {
            return Err(EtlError::FileNotFound(path.to_path_buf()));
        }
        let content = fs::read_to_string(path)?;
        let mut config = Self::from_yaml_str(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_relative_to(base);
        }
        Ok(config)
    }

    pub fn from_yaml_str(content: &str) -> EtlResult<Self> {
        let config: PipelineConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        resolve(&mut self.inputs.template);
        resolve(&mut self.inputs.raw_export);
        resolve(&mut self.inputs.product_master);
        resolve(&mut self.inputs.customer_roster);
        resolve(&mut self.inputs.opt_roster);
        resolve(&mut self.output);
    }

    /// Check layout and roster positions
    pub fn validate(&self) -> EtlResult<()> {
        self.layout.validate()?;
        if self.roster.data_start <= self.roster.header_row {
            return Err(EtlError::Config(format!(
                "roster.data_start ({}) must be below roster.header_row ({})",
                self.roster.data_start, self.roster.header_row
            )));
        }
        if self.roster.summary_row == 0 || self.roster.label_rows == 0 {
            return Err(EtlError::Config(
                "roster.summary_row and roster.label_rows must be 1 or greater".to_string(),
            ));
        }
        if self.product_order.is_empty() {
            return Err(EtlError::Config(
                "product_order must list at least one product code".to_string(),
            ));
        }
        Ok(())
    }

    /// Every input must exist before any work starts
    pub fn check_inputs_exist(&self) -> EtlResult<()> {
        if let Some(missing) = self.inputs.all().into_iter().find(|p| !p.exists()) {
            return Err(EtlError::FileNotFound(missing.clone()));
        }
        if let Some(parent) = self.output.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                return Err(EtlError::FileNotFound(parent.to_path_buf()));
            }
        }
        Ok(())
    }

    /// Detail sheet the template carries for last month
    pub fn previous_detail_sheet(&self) -> String {
        format!("Realisasi {}", self.previous_month)
    }

    /// Detail sheet this run produces
    pub fn detail_sheet(&self) -> String {
        format!("Realisasi {}", self.current_month)
    }
}
