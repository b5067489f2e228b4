//! End-to-end pipeline tests over real .xlsx files
//!
//! Inputs are written with rust_xlsxwriter, the output is read back with
//! calamine (directly and through the importer).

mod common;

use calamine::{open_workbook_auto, Data, Reader};
use common::Fixture;
use pretty_assertions::assert_eq;
use revenue_dashboard::config::PipelineConfig;
use revenue_dashboard::core::pipeline;
use revenue_dashboard::excel::{CellValue, ExcelImporter, Workbook};
use revenue_dashboard::{EtlError, Month};

fn run_fixture() -> (Fixture, Workbook, revenue_dashboard::RunReport) {
    let fixture = Fixture::new();
    let config = PipelineConfig::from_yaml_file(&fixture.write_config()).unwrap();
    let report = pipeline::run(&config).unwrap();
    let output = ExcelImporter::new(fixture.path("output.xlsx"))
        .import()
        .unwrap();
    (fixture, output, report)
}

#[test]
fn test_output_sheets_read_back_with_calamine() {
    let (fixture, _, _) = run_fixture();

    let mut xlsx = open_workbook_auto(fixture.path("output.xlsx")).unwrap();
    assert_eq!(
        xlsx.sheet_names(),
        vec![
            "Summary",
            "Dashboard",
            "Realisasi Desember",
            "Data Pelanggan",
            "Data OPT"
        ]
    );

    let detail = xlsx.worksheet_range("Realisasi Desember").unwrap();
    assert_eq!(detail.get_value((0, 2)), Some(&Data::String("Kode Produk".into())));
    assert_eq!(detail.get_value((1, 2)), Some(&Data::Float(756.0)));
    assert_eq!(detail.height(), 4);
}

#[test]
fn test_report_counts() {
    let (fixture, _, report) = run_fixture();

    assert_eq!(report.previous_month, Month::November);
    assert_eq!(report.current_month, Month::Desember);
    assert_eq!(report.raw_sheet, "Lampiran Konsol Desember");
    assert_eq!(report.filters.rows_read, 5);
    assert_eq!(report.filters.after_customer_number, 4);
    assert_eq!(report.filters.after_grand_total, 3);
    assert_eq!(report.filters.after_summary_rows, 2);
    assert_eq!(report.lines_produced, 3);
    assert_eq!(report.lines_written, 3);
    assert_eq!(report.lines_dropped_by_order, 0);
    assert!(report.unresolved_labels.is_empty());
    assert!(report.missing_portfolio.is_empty());
    assert_eq!(report.dashboard.rows_rewritten, 5);
    assert_eq!(report.dashboard.grand_total_rows, 1);
    assert_eq!(report.dashboard.carried_forward, 5);
    assert!(report.summary_updated);
    assert_eq!(report.rosters.len(), 2);
    assert_eq!(report.formulas_dynamicized, 1);
    assert_eq!(report.output, Some(fixture.path("output.xlsx")));
}

#[test]
fn test_detail_sheet_in_report_order() {
    let (_, output, _) = run_fixture();
    let detail = output.sheet("Realisasi Desember").unwrap();

    assert_eq!(detail.max_row(), 4);
    let rows: Vec<(CellValue, CellValue, CellValue)> = (2..=4)
        .map(|r| {
            (
                detail.get(r, 1).clone(),
                detail.get(r, 3).clone(),
                detail.get(r, 5).clone(),
            )
        })
        .collect();
    assert_eq!(
        rows,
        vec![
            (
                CellValue::Number(20001234.0),
                CellValue::Number(756.0),
                CellValue::Number(50.0)
            ),
            (
                CellValue::Number(20001234.0),
                CellValue::Number(719.0),
                CellValue::Number(100.0)
            ),
            (
                CellValue::Number(20005555.0),
                CellValue::Number(731.0),
                CellValue::Number(250.0)
            ),
        ]
    );

    assert_eq!(
        detail.get(2, 4),
        &CellValue::from("Internet Dedicated Premium Plus")
    );
    assert_eq!(detail.get(3, 4), &CellValue::from("Internet Dedicated"));
    assert_eq!(detail.get(4, 4), &CellValue::from("VPN IP"));
    assert_eq!(detail.get(2, 14), &CellValue::from("Konektivitas"));
}

#[test]
fn test_dashboard_december_formulas() {
    let (_, output, _) = run_fixture();
    let dash = output.sheet("Dashboard").unwrap();

    for row in 3..=6 {
        assert_eq!(
            dash.get(row, 21).as_formula(),
            Some(
                format!(
                    "=SUMIF('Realisasi Desember'!$C:$C, A{}, 'Realisasi Desember'!$E:$E)",
                    row
                )
                .as_str()
            )
        );
        assert_eq!(
            dash.get(row, 34).as_formula(),
            Some(format!("=U{}-T{}", row, row).as_str())
        );
        assert_eq!(dash.get(row, 22).as_number(), Some(0.0));
    }

    assert_eq!(dash.get(7, 21).as_formula(), Some("=SUM(U3:U6)"));
    assert_eq!(dash.get(7, 34).as_formula(), Some("=SUM(AH3:AH6)"));
    assert_eq!(dash.get(7, 22).as_number(), Some(0.0));
    assert_eq!(dash.get(9, 2).as_formula(), Some("=SUM($U:$U)"));
}

#[test]
fn test_previous_month_carried_as_literal() {
    let (_, output, _) = run_fixture();
    let dash = output.sheet("Dashboard").unwrap();

    assert_eq!(dash.get(3, 20), &CellValue::Number(1250.0));
    assert_eq!(dash.get(4, 20), &CellValue::Number(80.0));
    assert_eq!(dash.get(5, 20), &CellValue::Number(0.0));
    assert_eq!(dash.get(6, 20), &CellValue::Number(10.0));
}

#[test]
fn test_summary_sheet_points_at_current_month() {
    let (_, output, _) = run_fixture();
    let summary = output.sheet("Summary").unwrap();

    assert_eq!(summary.get(2, 3), &CellValue::from("Realisasi Desember"));
    assert_eq!(summary.get(3, 3).as_formula(), Some("=Dashboard!U7"));
}

#[test]
fn test_customer_roster_refilled() {
    let (_, output, report) = run_fixture();
    let roster = output.sheet("Data Pelanggan").unwrap();

    assert_eq!(roster.get(2, 3), &CellValue::Number(12.0));
    assert_eq!(roster.get(4, 1), &CellValue::from("PT C"));
    assert_eq!(roster.get(5, 1), &CellValue::from("PT D"));
    assert_eq!(roster.get(6, 1), &CellValue::from("PT A"));
    assert_eq!(roster.get(4, 3), &CellValue::Number(30.0));
    assert!(roster.get(5, 3).is_empty());
    assert_eq!(roster.get(6, 4).as_formula(), Some("=C6*2"));
    assert_eq!(roster.get(1, 4).as_formula(), Some("=SUBTOTAL(9,D4:D6)"));
    assert!(roster.get(7, 1).is_empty());
    assert_eq!(roster.max_row(), 6);

    let update = report
        .rosters
        .iter()
        .find(|r| r.sheet == "Data Pelanggan")
        .unwrap();
    assert_eq!(update.rows_written, 3);
    assert_eq!(update.rows_dropped, 1);
    assert_eq!(update.mapped_columns, 3);
    assert_eq!(update.month_cell, "C2");
}

#[test]
fn test_opt_roster_uses_fallback_month_cell() {
    let (_, output, report) = run_fixture();
    let opt = output.sheet("Data OPT").unwrap();

    assert_eq!(opt.get(4, 1), &CellValue::Number(719.0));
    assert_eq!(opt.get(4, 2), &CellValue::Number(5000.0));
    assert_eq!(opt.get(2, 84), &CellValue::Number(12.0));

    let update = report.rosters.iter().find(|r| r.sheet == "Data OPT").unwrap();
    assert_eq!(update.month_cell, "CF2");
}

#[test]
fn test_template_is_left_untouched() {
    let (fixture, _, _) = run_fixture();
    let template = ExcelImporter::new(fixture.path("template.xlsx"))
        .import()
        .unwrap();
    assert!(template.contains("Realisasi November"));
    assert!(!template.contains("Realisasi Desember"));
}

#[test]
fn test_report_json_written() {
    let (fixture, _, report) = run_fixture();
    let path = fixture.path("report.json");
    report.write_json(&path).unwrap();

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["current_month"], "Desember");
    assert_eq!(json["lines_written"], 3);
    assert_eq!(json["filters"]["after_summary_rows"], 2);
    assert!(json["generated_at"].is_string());
}

#[test]
fn test_missing_konsol_sheet_writes_nothing() {
    let fixture = Fixture::new();
    let mut config = PipelineConfig::from_yaml_file(&fixture.write_config()).unwrap();
    // The product master has no "Konsol" sheet
    config.inputs.raw_export = fixture.path("master.xlsx");

    match pipeline::run(&config) {
        Err(EtlError::Structure(msg)) => assert!(msg.contains("Konsol")),
        other => panic!("expected Structure error, got {:?}", other.map(|r| r.output)),
    }
    assert!(!fixture.path("output.xlsx").exists());
}

#[test]
fn test_missing_input_is_reported_before_loading() {
    let fixture = Fixture::new();
    let mut config = PipelineConfig::from_yaml_file(&fixture.write_config()).unwrap();
    config.inputs.opt_roster = fixture.path("nope.xlsx");

    match pipeline::run(&config) {
        Err(EtlError::FileNotFound(path)) => assert_eq!(path, fixture.path("nope.xlsx")),
        other => panic!("expected FileNotFound, got {:?}", other.map(|r| r.output)),
    }
}

#[test]
fn test_dynamicize_file() {
    let fixture = Fixture::new();
    let output = fixture.path("dynamic.xlsx");

    let changed =
        pipeline::dynamicize_file(&fixture.path("template.xlsx"), &output, "Dashboard").unwrap();
    assert_eq!(changed, 1);

    let wb = ExcelImporter::new(&output).import().unwrap();
    let dash = wb.sheet("Dashboard").unwrap();
    assert_eq!(dash.get(9, 2).as_formula(), Some("=SUM($U:$U)"));
    assert_eq!(
        dash.get(3, 20).as_formula(),
        Some("=SUMIF('Realisasi November'!$C:$C, A3, 'Realisasi November'!$E:$E)")
    );
}
