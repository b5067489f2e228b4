use anyhow::Context;
use clap::{Parser, Subcommand};
use revenue_dashboard::cli::{self, RunOptions};
use revenue_dashboard::config::Month;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "revdash")]
#[command(about = "Monthly revenue ETL into the Dashboard workbook")]
#[command(long_about = "Revenue Dashboard - monthly revenue ETL
Raw pivot export + product master + rosters → this month's Dashboard workbook

COMMANDS:
  run         - Full Extract → Transform → Load run
  preview     - Extract + Transform only, nothing written
  dynamicize  - Replace fixed $A$1:$A$99 ranges with whole columns

EXAMPLES:
  revdash run --config desember.yaml
  revdash run --config desember.yaml --report desember.json
  revdash preview --raw \"12 Lampiran Pendapatan.xlsx\" --master \"01 Validasi.xlsx\"
  revdash dynamicize report.xlsx report_dynamic.xlsx

Set RUST_LOG=revenue_dashboard=debug for per-column mapping details.")]
#[command(version)]
struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(long_about = "Run the full monthly pipeline.

Reads the previous month's report as a template, refills the detail sheet,
rewrites the Dashboard formulas for the current month, refreshes the
'Data Pelanggan' and 'Data OPT' roster sheets and saves a new workbook.
The template itself is never modified.

CONFIG FILE (YAML):
  inputs:
    template: \"11 BANGER NOVEMBER.xlsx\"
    raw_export: \"12 Lampiran Pendapatan Desember 2025.xlsx\"
    product_master: \"01 Validasi Kode Produk Rekap.xlsx\"
    customer_roster: \"12. BANGER-PELANGGAN.xlsx\"
    opt_roster: \"12. BANGER-OPT.xlsx\"
  output: \"12 BANGER DESEMBER.xlsx\"
  previous_month: November
  current_month: Desember

Flags override the matching config value. Without --config every input,
--output and --current must be given; --previous defaults to the month
before --current.")]
    /// Run the full monthly pipeline
    Run {
        /// YAML config file (relative paths resolve against its directory)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Previous month's report, used as the template
        #[arg(long)]
        template: Option<PathBuf>,

        /// Raw revenue export with the "Konsol" sheet
        #[arg(long)]
        raw: Option<PathBuf>,

        /// Product master workbook
        #[arg(long)]
        master: Option<PathBuf>,

        /// Customer roster export ("Data Pelanggan")
        #[arg(long)]
        customers: Option<PathBuf>,

        /// OPT roster export ("Data OPT")
        #[arg(long)]
        opt: Option<PathBuf>,

        /// Output workbook (.xlsx)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Month the template covers (Januari..Desember, 1-12 or English names)
        #[arg(long)]
        previous: Option<Month>,

        /// Month being reported
        #[arg(long)]
        current: Option<Month>,

        /// Write a JSON run report to this file
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Extract and transform only; print the revenue lines
    Preview {
        /// YAML config file supplying the raw export and product master
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Raw revenue export
        #[arg(long)]
        raw: Option<PathBuf>,

        /// Product master workbook
        #[arg(long)]
        master: Option<PathBuf>,

        /// Number of lines to print
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },

    /// Replace fixed absolute ranges with whole-column ranges
    Dynamicize {
        /// Workbook to read
        input: PathBuf,

        /// Workbook to write (.xlsx)
        output: PathBuf,

        /// Sheet whose formulas are rewritten
        #[arg(short, long, default_value = "Dashboard")]
        sheet: String,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "revenue_dashboard=debug"
    } else {
        "revenue_dashboard=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            template,
            raw,
            master,
            customers,
            opt,
            output,
            previous,
            current,
            report,
        } => {
            let options = RunOptions {
                config,
                template,
                raw_export: raw,
                product_master: master,
                customer_roster: customers,
                opt_roster: opt,
                output,
                previous_month: previous,
                current_month: current,
            };
            cli::run(options, report).context("Monthly run failed")
        }

        Commands::Preview {
            config,
            raw,
            master,
            limit,
        } => cli::preview(config, raw, master, limit).context("Preview failed"),

        Commands::Dynamicize {
            input,
            output,
            sheet,
        } => cli::dynamicize(input, output, sheet).context("Range rewrite failed"),
    }
}
