//! Extract → Transform → Load for one reporting month
//!
//! [`process`] works entirely in memory on already-loaded workbooks; [`run`]
//! adds file loading and the final save. Nothing is written to disk until
//! every stage has succeeded.

use crate::config::{DashboardLayout, InputFiles, Month, PipelineConfig};
use crate::core::dashboard::{DashboardEngine, DashboardStats};
use crate::core::detail::{update_summary, write_detail_sheet};
use crate::core::dynamic_range::RangeDynamicizer;
use crate::core::extractor::{extract, Extraction, FilterCounts};
use crate::core::ordering::ProductCodeOrder;
use crate::core::resolver::ProductMaster;
use crate::core::roster::{update_roster, RosterUpdate, CUSTOMER_ROSTER, OPT_ROSTER};
use crate::core::transform::{transform, Transformed};
use crate::error::{EtlError, EtlResult};
use crate::excel::{ExcelExporter, ExcelImporter, Workbook};
use crate::types::RevenueLine;
use chrono::{DateTime, Local};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// The five input workbooks of a run
#[derive(Debug, Clone)]
pub struct LoadedInputs {
    pub template: Workbook,
    pub raw_export: Workbook,
    pub product_master: Workbook,
    /// Roster exports are optional: a broken file only skips its sheet
    pub customer_roster: Option<Workbook>,
    pub opt_roster: Option<Workbook>,
}

impl LoadedInputs {
    pub fn load(inputs: &InputFiles) -> EtlResult<Self> {
        info!("Loading input workbooks");
        Ok(Self {
            template: ExcelImporter::new(&inputs.template).import()?,
            raw_export: ExcelImporter::new(&inputs.raw_export).import()?,
            product_master: ExcelImporter::new(&inputs.product_master).import()?,
            customer_roster: load_optional(&inputs.customer_roster),
            opt_roster: load_optional(&inputs.opt_roster),
        })
    }
}

fn load_optional(path: &Path) -> Option<Workbook> {
    match ExcelImporter::new(path).import() {
        Ok(workbook) => Some(workbook),
        Err(e) => {
            warn!(path = %path.display(), "Roster export could not be read, its sheet is left as is: {}", e);
            None
        }
    }
}

/// What a run did, for the console summary and the optional JSON report
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub generated_at: DateTime<Local>,
    pub previous_month: Month,
    pub current_month: Month,
    pub raw_sheet: String,
    pub filters: FilterCounts,
    pub lines_produced: usize,
    pub detail_sheet: String,
    pub lines_written: usize,
    pub lines_dropped_by_order: usize,
    pub unresolved_labels: Vec<String>,
    pub missing_portfolio: Vec<String>,
    pub dashboard: DashboardStats,
    pub summary_updated: bool,
    pub rosters: Vec<RosterUpdate>,
    pub formulas_dynamicized: usize,
    pub output: Option<PathBuf>,
}

impl RunReport {
    pub fn to_json(&self) -> EtlResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> EtlResult<()> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Extract and transform only; used by `preview` and by [`process`]
pub fn extract_and_transform(
    raw_export: &Workbook,
    product_master: &Workbook,
) -> EtlResult<(Extraction, Transformed)> {
    info!("[1/3] Extract");
    let master = ProductMaster::from_workbook(product_master)?;
    let extraction = extract(raw_export)?;

    info!("[2/3] Transform");
    let transformed = transform(&extraction, &master)?;
    Ok((extraction, transformed))
}

/// Build the output workbook from loaded inputs
pub fn process(inputs: LoadedInputs, config: &PipelineConfig) -> EtlResult<(Workbook, RunReport)> {
    let (extraction, transformed) =
        extract_and_transform(&inputs.raw_export, &inputs.product_master)?;

    info!("[3/3] Load");
    let mut workbook = inputs.template;
    if !workbook.contains(&config.layout.sheet) {
        return Err(EtlError::Structure(format!(
            "Sheet '{}' not found in template. Available sheets: {:?}",
            config.layout.sheet,
            workbook.sheet_names()
        )));
    }

    let order = ProductCodeOrder::new(config.product_order.iter().copied());
    let detail = write_detail_sheet(&mut workbook, config, &transformed.detail, &order)?;

    let dashboard = {
        let sheet = workbook.sheet_mut(&config.layout.sheet).ok_or_else(|| {
            EtlError::Structure(format!("Sheet '{}' not found in template", config.layout.sheet))
        })?;
        DashboardEngine::new(
            &config.layout,
            config.current_month,
            config.previous_month,
            &detail.target,
        )
        .apply(sheet)?
    };

    let summary_updated = update_summary(&mut workbook, &config.layout, config.current_month)?;
    if !summary_updated {
        info!("No Summary sheet in template, skipping");
    }

    let mut rosters = Vec::new();
    for (spec, source) in [
        (&CUSTOMER_ROSTER, inputs.customer_roster.as_ref()),
        (&OPT_ROSTER, inputs.opt_roster.as_ref()),
    ] {
        let Some(source_sheet) = source.and_then(Workbook::first_sheet) else {
            warn!(sheet = spec.sheet, "No roster export data, sheet left as is");
            continue;
        };
        if let Some(update) = update_roster(
            &mut workbook,
            spec,
            &config.roster,
            source_sheet,
            &order,
            config.current_month,
        )? {
            rosters.push(update);
        }
    }

    let formulas_dynamicized = match workbook.sheet_mut(&config.layout.sheet) {
        Some(sheet) => RangeDynamicizer::new()?.apply(sheet, config.layout.data_start),
        None => 0,
    };

    let report = RunReport {
        generated_at: Local::now(),
        previous_month: config.previous_month,
        current_month: config.current_month,
        raw_sheet: extraction.sheet_name,
        filters: extraction.counts,
        lines_produced: transformed.detail.lines.len(),
        detail_sheet: detail.target.sheet.clone(),
        lines_written: detail.written,
        lines_dropped_by_order: detail.dropped,
        unresolved_labels: transformed.unresolved,
        missing_portfolio: transformed.missing_portfolio,
        dashboard,
        summary_updated,
        rosters,
        formulas_dynamicized,
        output: None,
    };
    Ok((workbook, report))
}

/// Full run: validate paths, load, process, save
pub fn run(config: &PipelineConfig) -> EtlResult<RunReport> {
    config.check_inputs_exist()?;
    let inputs = LoadedInputs::load(&config.inputs)?;
    let (workbook, mut report) = process(inputs, config)?;

    ExcelExporter::new(&workbook).export(&config.output)?;
    info!(
        output = %config.output.display(),
        month = %config.current_month,
        "Dashboard written"
    );
    report.output = Some(config.output.clone());
    Ok(report)
}

/// Extract + transform result in report order, without touching any template
#[derive(Debug, Clone)]
pub struct Preview {
    pub raw_sheet: String,
    pub filters: FilterCounts,
    pub lines_produced: usize,
    pub lines: Vec<RevenueLine>,
    pub dropped_by_order: usize,
    pub unresolved_labels: Vec<String>,
    pub include_customer_name: bool,
}

pub fn preview(raw_export: &Path, product_master: &Path, order: &ProductCodeOrder) -> EtlResult<Preview> {
    let raw = ExcelImporter::new(raw_export).import()?;
    let master = ExcelImporter::new(product_master).import()?;
    let (extraction, transformed) = extract_and_transform(&raw, &master)?;

    let lines_produced = transformed.detail.lines.len();
    let ordered = order.sort_and_filter(transformed.detail.lines, |l| l.code.clone());
    Ok(Preview {
        raw_sheet: extraction.sheet_name,
        filters: extraction.counts,
        lines_produced,
        lines: ordered.kept,
        dropped_by_order: ordered.dropped,
        unresolved_labels: transformed.unresolved,
        include_customer_name: transformed.detail.include_customer_name,
    })
}

/// Make the fixed ranges of one sheet open-ended and save the result.
/// Header rows above the default first data row are left untouched.
pub fn dynamicize_file(input: &Path, output: &Path, sheet_name: &str) -> EtlResult<usize> {
    let mut workbook = ExcelImporter::new(input).import()?;
    let sheet = workbook.sheet_mut(sheet_name).ok_or_else(|| {
        EtlError::Structure(format!(
            "Sheet '{}' not found in {}",
            sheet_name,
            input.display()
        ))
    })?;
    let changed = RangeDynamicizer::new()?.apply(sheet, DashboardLayout::default().data_start);
    ExcelExporter::new(&workbook).export(output)?;
    Ok(changed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::excel::CellValue;
    use pretty_assertions::assert_eq;

    fn config() -> PipelineConfig {
        PipelineConfig::from_yaml_str(
            r#"
inputs:
  template: t.xlsx
  raw_export: r.xlsx
  product_master: m.xlsx
  customer_roster: c.xlsx
  opt_roster: o.xlsx
output: out.xlsx
previous_month: November
current_month: Desember
layout:
  grand_total_row: 6
"#,
        )
        .unwrap()
    }

    fn inputs() -> LoadedInputs {
        let mut template = Workbook::new();
        let dash = template.add_sheet("Dashboard").unwrap();
        dash.set(2, 21, CellValue::from("Kumulatif Desember")).unwrap();
        dash.set(2, 34, CellValue::from("SA Desember")).unwrap();
        for (row, code) in [(3, 756.0), (4, 719.0), (5, 731.0)] {
            dash.set(row, 1, CellValue::Number(code)).unwrap();
            dash.set(row, 20, CellValue::Number(100.0)).unwrap();
        }
        dash.set(6, 1, CellValue::from("Grand Total")).unwrap();
        dash.set(8, 2, CellValue::formula("=SUM($U$3:$U$5)")).unwrap();
        template.add_sheet("Realisasi November").unwrap();

        let mut raw = Workbook::new();
        let konsol = raw.add_sheet("Konsol").unwrap();
        konsol.set(1, 1, CellValue::from("Customer No")).unwrap();
        konsol.set(1, 2, CellValue::Number(719.0)).unwrap();
        konsol.set(2, 1, CellValue::Number(20001234.0)).unwrap();
        konsol.set(2, 2, CellValue::Number(500.0)).unwrap();

        let mut master = Workbook::new();
        let pdf = master.add_sheet("ALL PRODUCT PDF").unwrap();
        pdf.set(3, 1, CellValue::from("ICON+ Product")).unwrap();
        pdf.set(4, 1, CellValue::Number(719.0)).unwrap();

        LoadedInputs {
            template,
            raw_export: raw,
            product_master: master,
            customer_roster: None,
            opt_roster: None,
        }
    }

    #[test]
    fn test_process_in_memory() {
        let (wb, report) = process(inputs(), &config()).unwrap();

        assert_eq!(wb.sheet_names(), vec!["Dashboard", "Realisasi Desember"]);
        assert_eq!(report.lines_produced, 1);
        assert_eq!(report.lines_written, 1);
        assert_eq!(report.dashboard.rows_rewritten, 4);
        assert!(!report.summary_updated);
        assert!(report.rosters.is_empty());
        assert_eq!(report.formulas_dynamicized, 1);

        let dash = wb.sheet("Dashboard").unwrap();
        assert_eq!(
            dash.get(4, 21).as_formula(),
            Some("=SUMIF('Realisasi Desember'!$B:$B, A4, 'Realisasi Desember'!$D:$D)")
        );
        assert_eq!(dash.get(4, 20), &CellValue::Number(100.0));
        assert_eq!(dash.get(6, 22), &CellValue::Number(0.0));
        assert_eq!(dash.get(8, 2).as_formula(), Some("=SUM($U:$U)"));
    }

    #[test]
    fn test_missing_dashboard_is_structure_error() {
        let mut inputs = inputs();
        inputs.template.remove_sheet("Dashboard");
        assert!(matches!(
            process(inputs, &config()),
            Err(EtlError::Structure(_))
        ));
    }

    #[test]
    fn test_report_serializes() {
        let (_, report) = process(inputs(), &config()).unwrap();
        let json = report.to_json().unwrap();
        assert!(json.contains("\"current_month\": \"Desember\""));
        assert!(json.contains("\"lines_written\": 1"));
    }

    #[test]
    fn test_run_reports_missing_input() {
        match run(&config()) {
            Err(EtlError::FileNotFound(path)) => assert_eq!(path, PathBuf::from("t.xlsx")),
            other => panic!("expected FileNotFound, got {:?}", other.map(|r| r.output)),
        }
    }
}
