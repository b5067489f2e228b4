//! Revenue Dashboard - monthly revenue ETL into the "Dashboard" workbook
//!
//! Each month the finance team receives a raw pivot export of revenue per
//! customer and product. This library turns that export, the product master
//! and two roster exports into next month's report workbook:
//!
//! - **Extract**: locate the "Konsol" sheet, find its header row and filter
//!   out subtotal, Grand Total and pivot summary rows
//! - **Transform**: unpivot product columns into revenue lines and resolve
//!   free-text product labels to product codes
//! - **Load**: refill the "Realisasi" detail sheet, rewrite the Dashboard
//!   formulas for the current month, refresh the roster sheets and make the
//!   fixed ranges open-ended
//!
//! # Example
//!
//! ```no_run
//! use revenue_dashboard::config::PipelineConfig;
//! use revenue_dashboard::core::pipeline;
//! use std::path::Path;
//!
//! let config = PipelineConfig::from_yaml_file(Path::new("desember.yaml"))?;
//! let report = pipeline::run(&config)?;
//!
//! println!("Lines written: {}", report.lines_written);
//! # Ok::<(), revenue_dashboard::error::EtlError>(())
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod error;
pub mod excel;
pub mod types;

// Re-export commonly used types
pub use config::{Month, PipelineConfig};
pub use core::pipeline::RunReport;
pub use error::{EtlError, EtlResult};
pub use types::{ProductCode, RevenueLine};
