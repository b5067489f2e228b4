use crate::config::{DashboardLayout, InputFiles, Month, PipelineConfig, RosterLayout};
use crate::core::ordering::{ProductCodeOrder, DEFAULT_PRODUCT_ORDER};
use crate::core::pipeline::{self, RunReport};
use crate::error::{EtlError, EtlResult};
use crate::excel::document::format_number;
use colored::Colorize;
use std::path::PathBuf;

/// Flags of `revdash run`; each one overrides the config file value
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub template: Option<PathBuf>,
    pub raw_export: Option<PathBuf>,
    pub product_master: Option<PathBuf>,
    pub customer_roster: Option<PathBuf>,
    pub opt_roster: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub previous_month: Option<Month>,
    pub current_month: Option<Month>,
}

impl RunOptions {
    /// Merge the config file (if any) with the command-line overrides
    pub fn into_config(self) -> EtlResult<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_yaml_file(path)?,
            None => {
                let current = self.current_month.ok_or_else(|| missing_flag("--current"))?;
                let previous = match self.previous_month {
                    Some(month) => month,
                    None => current.previous().ok_or_else(|| missing_flag("--previous"))?,
                };
                PipelineConfig {
                    inputs: InputFiles {
                        template: required(&self.template, "--template")?,
                        raw_export: required(&self.raw_export, "--raw")?,
                        product_master: required(&self.product_master, "--master")?,
                        customer_roster: required(&self.customer_roster, "--customers")?,
                        opt_roster: required(&self.opt_roster, "--opt")?,
                    },
                    output: required(&self.output, "--output")?,
                    previous_month: previous,
                    current_month: current,
                    layout: DashboardLayout::default(),
                    roster: RosterLayout::default(),
                    product_order: DEFAULT_PRODUCT_ORDER.to_vec(),
                }
            }
        };

        if let Some(path) = self.template {
            config.inputs.template = path;
        }
        if let Some(path) = self.raw_export {
            config.inputs.raw_export = path;
        }
        if let Some(path) = self.product_master {
            config.inputs.product_master = path;
        }
        if let Some(path) = self.customer_roster {
            config.inputs.customer_roster = path;
        }
        if let Some(path) = self.opt_roster {
            config.inputs.opt_roster = path;
        }
        if let Some(path) = self.output {
            config.output = path;
        }
        if let Some(month) = self.current_month {
            config.current_month = month;
        }
        if let Some(month) = self.previous_month {
            config.previous_month = month;
        }

        config.validate()?;
        Ok(config)
    }
}

fn missing_flag(flag: &str) -> EtlError {
    EtlError::Config(format!("{} is required when no --config file is given", flag))
}

fn required(value: &Option<PathBuf>, flag: &str) -> EtlResult<PathBuf> {
    value.clone().ok_or_else(|| missing_flag(flag))
}

/// Execute the run command
pub fn run(options: RunOptions, report_path: Option<PathBuf>) -> EtlResult<()> {
    let config = options.into_config()?;

    println!("{}", "📊 Revenue Dashboard - Monthly run".bold().green());
    println!(
        "   Month:    {} → {}",
        config.previous_month,
        config.current_month.to_string().bright_yellow().bold()
    );
    println!("   Template: {}", config.inputs.template.display());
    println!("   Raw:      {}", config.inputs.raw_export.display());
    println!("   Output:   {}\n", config.output.display());

    let report = pipeline::run(&config)?;
    print_report(&report);

    if let Some(path) = report_path {
        report.write_json(&path)?;
        println!("   Report:   {}\n", path.display());
    }
    Ok(())
}

fn print_report(report: &RunReport) {
    println!("{}", "✅ Dashboard updated".bold().green());
    println!(
        "   Raw rows: {} read → {} with customer number → {} after Grand Total → {} customers",
        report.filters.rows_read,
        report.filters.after_customer_number,
        report.filters.after_grand_total,
        report.filters.after_summary_rows
    );
    println!(
        "   Revenue lines: {} produced, {} written to '{}', {} outside the report list",
        report.lines_produced,
        report.lines_written.to_string().bold(),
        report.detail_sheet.bright_blue(),
        report.lines_dropped_by_order
    );
    println!(
        "   Dashboard rows rewritten: {} ({} carried forward)",
        report.dashboard.rows_rewritten, report.dashboard.carried_forward
    );
    for roster in &report.rosters {
        println!(
            "   Roster '{}': {} rows, {} columns mapped",
            roster.sheet.bright_blue(),
            roster.rows_written,
            roster.mapped_columns
        );
    }
    println!("   Formulas made open-ended: {}", report.formulas_dynamicized);

    if !report.unresolved_labels.is_empty() {
        println!(
            "{}",
            format!(
                "⚠️  {} product label(s) without a code: {}",
                report.unresolved_labels.len(),
                preview_list(&report.unresolved_labels)
            )
            .yellow()
        );
    }
    if !report.missing_portfolio.is_empty() {
        println!(
            "{}",
            format!(
                "⚠️  {} code(s) missing from the portfolio master: {}",
                report.missing_portfolio.len(),
                preview_list(&report.missing_portfolio)
            )
            .yellow()
        );
    }
    println!();
}

fn preview_list(items: &[String]) -> String {
    let mut shown = items.iter().take(5).cloned().collect::<Vec<_>>().join(", ");
    if items.len() > 5 {
        shown.push_str(", ...");
    }
    shown
}

/// Execute the preview command (extract + transform, nothing written)
pub fn preview(
    config: Option<PathBuf>,
    raw_export: Option<PathBuf>,
    product_master: Option<PathBuf>,
    limit: usize,
) -> EtlResult<()> {
    let (raw_export, product_master, order) = match config {
        Some(path) => {
            let config = PipelineConfig::from_yaml_file(&path)?;
            (
                raw_export.unwrap_or(config.inputs.raw_export),
                product_master.unwrap_or(config.inputs.product_master),
                ProductCodeOrder::new(config.product_order),
            )
        }
        None => (
            required(&raw_export, "--raw")?,
            required(&product_master, "--master")?,
            ProductCodeOrder::default(),
        ),
    };

    println!("{}", "🔍 Revenue Dashboard - Preview".bold().green());
    println!("   Raw:    {}", raw_export.display());
    println!("   Master: {}\n", product_master.display());

    let preview = pipeline::preview(&raw_export, &product_master, &order)?;

    println!(
        "   Sheet '{}': {} customer rows",
        preview.raw_sheet.bright_blue(),
        preview.filters.after_summary_rows
    );
    println!(
        "   Revenue lines: {} produced, {} in the report list, {} dropped",
        preview.lines_produced,
        preview.lines.len().to_string().bold(),
        preview.dropped_by_order
    );
    if !preview.unresolved_labels.is_empty() {
        println!(
            "{}",
            format!(
                "⚠️  Unresolved labels: {}",
                preview_list(&preview.unresolved_labels)
            )
            .yellow()
        );
    }
    println!();

    for line in preview.lines.iter().take(limit) {
        let code = line.code.as_ref().map(|c| c.as_str()).unwrap_or("-");
        let customer = match (&line.customer.name, preview.include_customer_name) {
            (Some(name), true) => format!("{} {}", line.customer.number, name),
            _ => line.customer.number.clone(),
        };
        println!(
            "   {:>5}  {:<40}  {:>16}  {}",
            code.cyan(),
            customer,
            format_number(line.value),
            line.product_name
        );
    }
    if preview.lines.len() > limit {
        println!("   ... {} more", preview.lines.len() - limit);
    }
    println!();
    Ok(())
}

/// Execute the dynamicize command
pub fn dynamicize(input: PathBuf, output: PathBuf, sheet: String) -> EtlResult<()> {
    println!("{}", "🔁 Revenue Dashboard - Open-ended ranges".bold().green());
    println!("   Input:  {}", input.display());
    println!("   Output: {}\n", output.display());

    if !input.exists() {
        return Err(EtlError::FileNotFound(input));
    }
    let changed = pipeline::dynamicize_file(&input, &output, &sheet)?;

    println!(
        "{}",
        format!("✅ {} formula(s) on '{}' rewritten", changed, sheet)
            .bold()
            .green()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn flags() -> RunOptions {
        RunOptions {
            template: Some("t.xlsx".into()),
            raw_export: Some("r.xlsx".into()),
            product_master: Some("m.xlsx".into()),
            customer_roster: Some("c.xlsx".into()),
            opt_roster: Some("o.xlsx".into()),
            output: Some("out.xlsx".into()),
            current_month: Some(Month::Desember),
            ..RunOptions::default()
        }
    }

    #[test]
    fn test_flags_alone_build_a_config() {
        let config = flags().into_config().unwrap();
        assert_eq!(config.previous_month, Month::November);
        assert_eq!(config.current_month, Month::Desember);
        assert_eq!(config.inputs.raw_export, PathBuf::from("r.xlsx"));
        assert_eq!(config.layout, DashboardLayout::default());
        assert_eq!(config.product_order.len(), 61);
    }

    #[test]
    fn test_missing_flag_is_config_error() {
        let options = RunOptions {
            opt_roster: None,
            ..flags()
        };
        match options.into_config() {
            Err(EtlError::Config(msg)) => assert!(msg.contains("--opt")),
            other => panic!("expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_january_needs_explicit_previous() {
        let options = RunOptions {
            current_month: Some(Month::Januari),
            ..flags()
        };
        assert!(matches!(options.into_config(), Err(EtlError::Config(_))));

        let options = RunOptions {
            current_month: Some(Month::Januari),
            previous_month: Some(Month::Desember),
            ..flags()
        };
        assert_eq!(options.into_config().unwrap().previous_month, Month::Desember);
    }

    #[test]
    fn test_flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("run.yaml");
        std::fs::write(
            &path,
            r#"
inputs:
  template: t.xlsx
  raw_export: r.xlsx
  product_master: m.xlsx
  customer_roster: c.xlsx
  opt_roster: o.xlsx
output: out.xlsx
previous_month: Oktober
current_month: November
"#,
        )
        .unwrap();

        let config = RunOptions {
            config: Some(path),
            output: Some("/tmp/other.xlsx".into()),
            current_month: Some(Month::Desember),
            previous_month: Some(Month::November),
            ..RunOptions::default()
        }
        .into_config()
        .unwrap();

        assert_eq!(config.output, PathBuf::from("/tmp/other.xlsx"));
        assert_eq!(config.inputs.template, dir.path().join("t.xlsx"));
        assert_eq!(config.current_month, Month::Desember);
        assert_eq!(config.previous_month, Month::November);
    }

    #[test]
    fn test_preview_list_truncates() {
        let items: Vec<String> = (1..=7).map(|i| format!("L{}", i)).collect();
        assert_eq!(preview_list(&items), "L1, L2, L3, L4, L5, ...");
        assert_eq!(preview_list(&items[..2]), "L1, L2");
    }
}
