//! Scratch workbooks for a November → Desember run, written with rust_xlsxwriter

#![allow(dead_code)]

use rust_xlsxwriter::{Formula, Workbook, Worksheet};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Fixture {
    pub dir: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let fixture = Self {
            dir: TempDir::new().unwrap(),
        };
        write_template(&fixture.path("template.xlsx"));
        write_raw_export(&fixture.path("raw.xlsx"));
        write_product_master(&fixture.path("master.xlsx"));
        write_customer_roster(&fixture.path("pelanggan.xlsx"));
        write_opt_roster(&fixture.path("opt.xlsx"));
        fixture
    }

    pub fn path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// Config file with paths relative to the fixture directory
    pub fn write_config(&self) -> PathBuf {
        let path = self.path("desember.yaml");
        std::fs::write(
            &path,
            r#"
inputs:
  template: template.xlsx
  raw_export: raw.xlsx
  product_master: master.xlsx
  customer_roster: pelanggan.xlsx
  opt_roster: opt.xlsx
output: output.xlsx
previous_month: November
current_month: Desember
layout:
  grand_total_row: 7
"#,
        )
        .unwrap();
        path
    }
}

fn strings(ws: &mut Worksheet, row: u32, col: u16, values: &[&str]) {
    for (i, v) in values.iter().enumerate() {
        ws.write_string(row, col + i as u16, *v).unwrap();
    }
}

/// Last month's report: Summary, Dashboard, detail sheet and both rosters
///
/// Positions below are 0-based (rust_xlsxwriter); the Dashboard keys sit on
/// rows 3-6 with the grand total on row 7.
fn write_template(path: &Path) {
    let mut wb = Workbook::new();

    let summary = wb.add_worksheet().set_name("Summary").unwrap();
    summary.write_string(1, 2, "Realisasi November").unwrap();

    let dash = wb.add_worksheet().set_name("Dashboard").unwrap();
    dash.write_string(1, 0, "Kode Produk").unwrap();
    dash.write_string(1, 20, "Kumulatif Desember").unwrap();
    dash.write_string(1, 33, "SA Desember").unwrap();
    for (i, code) in [756.0, 719.0, 731.0, 714.0].iter().enumerate() {
        dash.write_number(2 + i as u32, 0, *code).unwrap();
    }
    dash.write_formula(
        2,
        19,
        Formula::new("=SUMIF('Realisasi November'!$C:$C, A3, 'Realisasi November'!$E:$E)")
            .set_result("1250"),
    )
    .unwrap();
    dash.write_number(3, 19, 80.0).unwrap();
    dash.write_number(5, 19, 10.0).unwrap();
    dash.write_string(6, 0, "Grand Total").unwrap();
    dash.write_formula(8, 1, Formula::new("=SUM($U$3:$U$6)")).unwrap();

    let detail = wb.add_worksheet().set_name("Realisasi November").unwrap();
    strings(detail, 0, 0, &["Customer Number", "Customer Name", "Kode Produk"]);
    for row in 1..=30 {
        detail.write_string(row, 0, "stale").unwrap();
    }

    let pelanggan = wb.add_worksheet().set_name("Data Pelanggan").unwrap();
    pelanggan
        .write_formula(0, 3, Formula::new("=SUBTOTAL(9,D4:D500)"))
        .unwrap();
    pelanggan.write_string(1, 1, "Bulan Berjalan").unwrap();
    pelanggan.write_number(1, 2, 11.0).unwrap();
    strings(
        pelanggan,
        2,
        0,
        &["Nama Pelanggan", "Kode Master Produk", "Nilai", "Nilai x2"],
    );
    pelanggan.write_number(3, 2, 1.0).unwrap();
    pelanggan.write_formula(3, 3, Formula::new("=C4*2")).unwrap();
    for row in 4..=12 {
        pelanggan.write_string(row, 0, "old").unwrap();
    }

    let opt = wb.add_worksheet().set_name("Data OPT").unwrap();
    strings(opt, 2, 0, &["Kode Master Produk", "hargaInstallasi"]);

    wb.save(path).unwrap();
}

/// Pivot export: title, product names on row 2, header on row 3
fn write_raw_export(path: &Path) {
    let mut wb = Workbook::new();
    wb.add_worksheet().set_name("Pivot").unwrap();

    let ws = wb
        .add_worksheet()
        .set_name("Lampiran Konsol Desember")
        .unwrap();
    ws.write_string(0, 0, "Pendapatan Desember 2025").unwrap();
    ws.write_string(1, 3, "Internet Dedicated").unwrap();
    ws.write_string(1, 4, "VPN IP").unwrap();

    strings(ws, 2, 0, &["Row Labels", "Customer No", "Customer Name"]);
    ws.write_number(2, 3, 719.0).unwrap();
    ws.write_number(2, 4, 731.0).unwrap();
    ws.write_string(2, 5, "Internet Dedicated Premium Plus").unwrap();
    ws.write_string(2, 6, "Grand Total").unwrap();

    // (customer no, name, 719, 731, premium, grand total)
    ws.write_number(3, 1, 20001234.0).unwrap();
    ws.write_string(3, 2, "PT Maju").unwrap();
    for (col, v) in [(3, 100.0), (4, 0.0), (5, 50.0), (6, 150.0)] {
        ws.write_number(3, col, v).unwrap();
    }

    // subtotal row without customer number
    for (col, v) in [(3, 5.0), (4, 5.0)] {
        ws.write_number(4, col, v).unwrap();
    }

    ws.write_string(5, 1, "Grand Total").unwrap();
    ws.write_number(5, 3, 105.0).unwrap();

    ws.write_number(6, 1, 20009999.0).unwrap();
    ws.write_string(6, 2, "Retail").unwrap();
    ws.write_number(6, 3, 1.0).unwrap();

    ws.write_string(7, 1, "20005555.0").unwrap();
    ws.write_string(7, 2, "PT Jaya").unwrap();
    for (col, v) in [(3, 0.0), (4, 250.0), (5, 0.0), (6, 250.0)] {
        ws.write_number(7, col, v).unwrap();
    }

    wb.save(path).unwrap();
}

fn write_product_master(path: &Path) {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet().set_name("ALL PRODUCT PDF").unwrap();
    strings(
        ws,
        2,
        0,
        &["ICON+ Product", "Product Portofolio Segmen 1", "SEGMEN"],
    );
    let rows = [
        (719.0, "Internet Dedicated", "Konektivitas"),
        (756.0, "Internet Dedicated Premium Plus", "Konektivitas"),
        (731.0, "VPN IP", "Konektivitas"),
    ];
    for (i, (code, name, segmen)) in rows.iter().enumerate() {
        let row = 3 + i as u32;
        ws.write_number(row, 0, *code).unwrap();
        ws.write_string(row, 1, *name).unwrap();
        ws.write_string(row, 2, *segmen).unwrap();
    }
    wb.save(path).unwrap();
}

fn write_customer_roster(path: &Path) {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet().set_name("Sheet1").unwrap();
    strings(ws, 0, 0, &["namaPerusahaan", "kodeMasterProduk", "nilai"]);
    let rows = [
        ("PT A", 731.0, Some(10.0)),
        ("PT B", 999.0, Some(20.0)),
        ("PT C", 756.0, Some(30.0)),
        ("PT D", 719.0, None),
    ];
    for (i, (name, code, value)) in rows.iter().enumerate() {
        let row = 1 + i as u32;
        ws.write_string(row, 0, *name).unwrap();
        ws.write_number(row, 1, *code).unwrap();
        match value {
            Some(v) => ws.write_number(row, 2, *v).unwrap(),
            None => ws.write_string(row, 2, "--").unwrap(),
        };
    }
    wb.save(path).unwrap();
}

fn write_opt_roster(path: &Path) {
    let mut wb = Workbook::new();
    let ws = wb.add_worksheet().set_name("Sheet1").unwrap();
    strings(ws, 0, 0, &["kodeMasterProduk", "hargaInstalasi"]);
    ws.write_number(1, 0, 719.0).unwrap();
    ws.write_number(1, 1, 5000.0).unwrap();
    wb.save(path).unwrap();
}
