mod calendar;
mod config;
mod error;
mod formula;
mod metrics;
mod reader;
mod report;
mod table;
mod writer;

use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "hybrid-report")]
#[command(version, about = "Generate the monthly hybrid-working attendance workbook")]
pub struct Args {
    /// TOML config file with holidays, supervisors and roster settings
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Report year
    #[arg(short, long)]
    pub year: Option<i32>,

    /// Report month (1-12)
    #[arg(short, long)]
    pub month: Option<u32>,

    /// Holiday date, e.g. 2022/12/26 (repeatable; replaces the config list)
    #[arg(long = "holiday")]
    pub holidays: Vec<String>,

    /// Supervisor name (repeatable; replaces the config list)
    #[arg(long = "supervisor")]
    pub supervisors: Vec<String>,

    /// Rows of last month's talk summary, for the cumulative analysis
    #[arg(long)]
    pub last_month_count: Option<u32>,

    /// Roster workbook (.xlsx, .xlsm or .xls)
    #[arg(short, long)]
    pub roster: Option<PathBuf>,

    /// Directory for output_<YYYY>_<MM>.xlsx
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// First day of a calendar week
    #[arg(long, value_enum)]
    pub week_start: Option<calendar::WeekStart>,

    /// Print detailed progress to stderr
    #[arg(short, long)]
    pub verbose: bool,
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

fn run(args: Args) -> error::Result<()> {
    let file = match &args.config {
        Some(path) => {
            info!("config: {}", path.display());
            config::FileConfig::load(path)?
        }
        None => config::FileConfig::default(),
    };

    let overrides = config::Overrides {
        year: args.year,
        month: args.month,
        holidays: args.holidays,
        supervisors: args.supervisors,
        last_month_count: args.last_month_count,
        roster: args.roster,
        output_dir: args.output_dir,
        week_start: args.week_start,
    };
    let config = config::ReportConfig::resolve(file, overrides)?;

    let output = config.output_path();
    info!("output: {}", output.display());

    let mut sink = writer::XlsxSink::new(output);
    let summary = report::generate(&config, &mut sink)?;

    info!(
        "{}: {} working days, {} employees, {} talk records",
        config.month.label(),
        summary.working_days,
        summary.roster_rows,
        summary.talk_rows
    );
    info!("sheets: {}", summary.sheets.join(", "));
    Ok(())
}
