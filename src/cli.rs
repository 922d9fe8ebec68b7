//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Mutex;
use tracing::{info, warn, Level};
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::FmtSubscriber;

use crate::adapters::csv_fundamentals_adapter::CsvFundamentalsAdapter;
use crate::adapters::csv_price_adapter::CsvPriceAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::csv_sector_adapter::CsvSectorAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::typst_report::TypstReportAdapter;
use crate::domain::backtest::{
    self as backtest_engine, BacktestConfig, DEFAULT_INITIAL_NAV, DEFAULT_MAX_PE,
    DEFAULT_MAX_PER_SECTOR, DEFAULT_TOP_N,
};
use crate::domain::config_validation::{
    parse_date, required_string, validate_backtest_config, validate_data_config,
    validate_report_config,
};
use crate::domain::error::ValueScreenError;
use crate::domain::fundamentals::FundamentalsTable;
use crate::domain::metrics::{align_benchmark, Metrics};
use crate::domain::schedule::RebalanceFrequency;
use crate::domain::sector::SectorCache;
use crate::domain::selection;
use crate::ports::config_port::ConfigPort;
use crate::ports::fundamentals_port::FundamentalsPort;
use crate::ports::price_port::PricePort;
use crate::ports::report_port::{ReportInput, ReportPort};

const DEFAULT_TYPST_OUTPUT: &str = "value_screen_report.typ";
const DEFAULT_CSV_OUTPUT: &str = "value_screen_report";

#[derive(Parser, Debug)]
#[command(
    name = "valuescreen",
    about = "Low-PE, sector-capped equity screen backtester"
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also write log output to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest and write a report
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long, value_enum)]
        format: Option<ReportFormat>,
        /// Validate config, build the schedule and load fundamentals only
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show the portfolio the screen would select at one date
    Screen {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        date: NaiveDate,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Typst,
    Csv,
}

impl ReportFormat {
    fn from_config(config: &dyn ConfigPort) -> Self {
        match config.get_string("report", "format").as_deref().map(str::trim) {
            Some("csv") => ReportFormat::Csv,
            _ => ReportFormat::Typst,
        }
    }

    fn default_output(self) -> PathBuf {
        match self {
            ReportFormat::Typst => PathBuf::from(DEFAULT_TYPST_OUTPUT),
            ReportFormat::Csv => PathBuf::from(DEFAULT_CSV_OUTPUT),
        }
    }
}

impl Cli {
    /// Initialize logging based on verbosity level.
    pub fn init_logging(&self) -> Result<(), ValueScreenError> {
        let level = match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        };

        let result = match &self.log_file {
            Some(path) => {
                let file = File::create(path)?;
                let subscriber = FmtSubscriber::builder()
                    .with_max_level(level)
                    .with_target(false)
                    .with_ansi(false)
                    .with_writer(std::io::stderr.and(Mutex::new(file)))
                    .finish();
                tracing::subscriber::set_global_default(subscriber)
            }
            None => {
                let subscriber = FmtSubscriber::builder()
                    .with_max_level(level)
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .finish();
                tracing::subscriber::set_global_default(subscriber)
            }
        };
        if let Err(e) = result {
            eprintln!("warning: logging already initialised: {e}");
        }
        Ok(())
    }
}

pub fn run(cli: Cli) -> ExitCode {
    if let Err(e) = cli.init_logging() {
        eprintln!("error: failed to open log file: {e}");
        return (&e).into();
    }

    match cli.command {
        Command::Backtest {
            config,
            output,
            format,
            dry_run,
        } => {
            if dry_run {
                run_dry_run(&config)
            } else {
                run_backtest(&config, output.as_deref(), format)
            }
        }
        Command::Validate { config } => run_validate(&config),
        Command::Screen { config, date } => run_screen(&config, date),
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        let err = ValueScreenError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

fn validate_all(config: &dyn ConfigPort) -> Result<(), ValueScreenError> {
    validate_data_config(config)?;
    validate_backtest_config(config)?;
    validate_report_config(config)
}

fn positive_usize(
    adapter: &dyn ConfigPort,
    key: &str,
    default: usize,
) -> Result<usize, ValueScreenError> {
    let value = adapter.get_int("backtest", key, default as i64);
    usize::try_from(value)
        .ok()
        .filter(|v| *v >= 1)
        .ok_or_else(|| {
            ValueScreenError::invalid("backtest", key, format!("{} must be at least 1", key))
        })
}

pub fn build_backtest_config(adapter: &dyn ConfigPort) -> Result<BacktestConfig, ValueScreenError> {
    let start_str = adapter.get_string("backtest", "start_date");
    let end_str = adapter.get_string("backtest", "end_date");
    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    let mut config = BacktestConfig::new(start_date, end_date);
    if let Some(freq) = adapter.get_string("backtest", "rebalance_frequency") {
        config.rebalance_frequency = freq.parse::<RebalanceFrequency>().map_err(|e| {
            ValueScreenError::invalid("backtest", "rebalance_frequency", e.to_string())
        })?;
    }
    config.top_n = positive_usize(adapter, "top_n", DEFAULT_TOP_N)?;
    config.max_per_sector = positive_usize(adapter, "max_per_sector", DEFAULT_MAX_PER_SECTOR)?;
    config.max_pe = adapter.get_double("backtest", "max_pe", DEFAULT_MAX_PE);
    config.initial_nav = adapter.get_double("backtest", "initial_nav", DEFAULT_INITIAL_NAV);
    Ok(config)
}

fn load_fundamentals(adapter: &dyn ConfigPort) -> Result<FundamentalsTable, ValueScreenError> {
    let path = required_string(adapter, "data", "fundamentals")?;
    CsvFundamentalsAdapter::new().load(Path::new(&path))
}

fn load_sectors(adapter: &dyn ConfigPort) -> Result<CsvSectorAdapter, ValueScreenError> {
    match adapter
        .get_string("data", "sectors")
        .filter(|s| !s.trim().is_empty())
    {
        Some(path) => CsvSectorAdapter::from_path(Path::new(path.trim())),
        None => {
            warn!("No [data] sectors file configured; every ticker is classified as Unknown");
            Ok(CsvSectorAdapter::empty())
        }
    }
}

fn print_summary(config: &BacktestConfig, metrics: &Metrics) {
    println!("\n=== Backtest Results ===");
    println!(
        "Period:            {} to {} ({})",
        config.start_date, config.end_date, config.rebalance_frequency
    );
    println!("Initial NAV:       {:.2}", metrics.initial_nav);
    println!("Final NAV:         {:.2}", metrics.final_nav);
    println!("Total Return:      {:.2}%", metrics.total_return * 100.0);
    println!("Annualized:        {:.2}%", metrics.annualized_return * 100.0);
    println!("Max Drawdown:      -{:.1}%", metrics.max_drawdown * 100.0);
    println!(
        "Periods:           {} rebalanced, {} carried forward, {} skipped",
        metrics.periods_rebalanced, metrics.periods_carried_forward, metrics.periods_skipped
    );
}

fn run_backtest(
    config_path: &Path,
    output_override: Option<&Path>,
    format_override: Option<ReportFormat>,
) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match run_backtest_pipeline(&adapter, output_override, format_override) {
        Ok(output) => {
            println!("\nReport written to: {}", output.display());
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

/// Load data, run the engine, print a summary and write the report.
/// Returns the path the report was written to.
pub fn run_backtest_pipeline(
    adapter: &dyn ConfigPort,
    output_override: Option<&Path>,
    format_override: Option<ReportFormat>,
) -> Result<PathBuf, ValueScreenError> {
    validate_all(adapter)?;
    let bt_config = build_backtest_config(adapter)?;

    let fundamentals = load_fundamentals(adapter)?;
    let sectors = load_sectors(adapter)?;
    let prices_dir = required_string(adapter, "data", "prices_dir")?;
    let prices = CsvPriceAdapter::new(PathBuf::from(prices_dir));

    let result = backtest_engine::run_backtest(&fundamentals, &bt_config, &prices, &sectors)?;
    let metrics = Metrics::compute(&result);
    print_summary(&bt_config, &metrics);

    let benchmark_ticker = adapter
        .get_string("report", "benchmark")
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let benchmark = match (&benchmark_ticker, result.nav.first(), result.nav.last()) {
        (Some(ticker), Some(first), Some(last)) => {
            let table = prices.fetch(std::slice::from_ref(ticker), first.date, last.date);
            let series = table.column(ticker).unwrap_or_default();
            let aligned = align_benchmark(&series, &result.nav);
            if aligned.is_empty() {
                warn!("Benchmark {} has no prices on NAV dates; omitting it", ticker);
            } else {
                info!("Benchmark {} aligned on {} dates", ticker, aligned.len());
            }
            aligned
        }
        _ => Vec::new(),
    };

    let input = ReportInput {
        config: &bt_config,
        result: &result,
        metrics: &metrics,
        benchmark: benchmark_ticker
            .as_deref()
            .filter(|_| !benchmark.is_empty())
            .map(|t| (t, benchmark.as_slice())),
    };

    let format = format_override.unwrap_or_else(|| ReportFormat::from_config(adapter));
    let output = output_override
        .map(Path::to_path_buf)
        .or_else(|| {
            adapter
                .get_string("report", "output")
                .filter(|s| !s.trim().is_empty())
                .map(|s| PathBuf::from(s.trim()))
        })
        .unwrap_or_else(|| format.default_output());

    let reporter: Box<dyn ReportPort> = match format {
        ReportFormat::Typst => Box::new(TypstReportAdapter::new(
            adapter
                .get_string("report", "template_path")
                .filter(|s| !s.trim().is_empty())
                .map(|s| PathBuf::from(s.trim())),
        )),
        ReportFormat::Csv => Box::new(CsvReportAdapter::new()),
    };
    reporter.export(&input, &output)?;
    Ok(output)
}

pub fn run_dry_run(config_path: &Path) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let outcome = validate_all(&adapter)
        .and_then(|()| build_backtest_config(&adapter))
        .and_then(|config| config.schedule().map(|schedule| (config, schedule)));
    let (bt_config, schedule) = match outcome {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    eprintln!("Config validated successfully");

    println!("\nSchedule:");
    println!("  frequency:       {}", bt_config.rebalance_frequency);
    println!("  rebalance dates: {}", schedule.len());
    if let (Some(first), Some(last)) = (schedule.first(), schedule.last()) {
        println!("  first / last:    {} / {}", first, last);
    }
    println!("\nScreen:");
    println!("  top_n:           {}", bt_config.top_n);
    println!("  max_pe:          {:.2}", bt_config.max_pe);
    println!("  max_per_sector:  {}", bt_config.max_per_sector);

    let fundamentals = match load_fundamentals(&adapter) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    println!("\nFundamentals:");
    println!(
        "  {} observations for {} tickers",
        fundamentals.observation_count(),
        fundamentals.ticker_count()
    );
    if let Some((first, last)) = fundamentals.date_range() {
        println!("  dates:           {} to {}", first, last);
    }
    let covered = schedule
        .iter()
        .filter(|date| fundamentals.candidates_at(**date, bt_config.max_pe).len() >= bt_config.top_n)
        .count();
    println!(
        "  {} of {} rebalance dates have at least {} candidates",
        covered,
        schedule.len(),
        bt_config.top_n
    );

    println!("\nDry run complete: configuration is valid");
    ExitCode::SUCCESS
}

fn run_validate(config_path: &Path) -> ExitCode {
    eprintln!("Validating config: {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    match validate_all(&adapter).and_then(|()| build_backtest_config(&adapter)) {
        Ok(config) => {
            println!("Configuration is valid.");
            println!(
                "  {} to {}, {}, top {} with PE <= {:.2}, at most {} per sector",
                config.start_date,
                config.end_date,
                config.rebalance_frequency,
                config.top_n,
                config.max_pe,
                config.max_per_sector
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_screen(config_path: &Path, date: NaiveDate) -> ExitCode {
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    let outcome = validate_data_config(&adapter)
        .and_then(|()| validate_backtest_config(&adapter))
        .and_then(|()| build_backtest_config(&adapter))
        .and_then(|config| {
            let fundamentals = load_fundamentals(&adapter)?;
            let sectors = load_sectors(&adapter)?;
            Ok((config, fundamentals, sectors))
        });
    let (config, fundamentals, sector_port) = match outcome {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    let candidates = fundamentals.candidates_at(date, config.max_pe);
    println!(
        "{}: {} candidates with PE <= {:.2}",
        date,
        candidates.len(),
        config.max_pe
    );
    if candidates.len() < config.top_n {
        println!(
            "Fewer than {} candidates; a backtest would carry the previous portfolio forward.",
            config.top_n
        );
        return ExitCode::SUCCESS;
    }

    let mut sectors = SectorCache::new(&sector_port);
    let selected = selection::select(&candidates, config.top_n, config.max_per_sector, &mut sectors);
    println!("\n  {:<4} {:<10} {:>8}  Sector", "#", "Ticker", "PE");
    for (i, ticker) in selected.iter().enumerate() {
        let pe = fundamentals.pe_at(ticker, date).unwrap_or(f64::NAN);
        let sector = sectors.resolve(ticker).to_string();
        println!("  {:<4} {:<10} {:>8.2}  {}", i + 1, ticker, pe, sector);
    }
    ExitCode::SUCCESS
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    #[test]
    fn build_config_applies_defaults() {
        let adapter = config("[backtest]\nstart_date = 2020-01-31\nend_date = 2024-12-31\n");
        let bt = build_backtest_config(&adapter).unwrap();
        assert_eq!(bt.top_n, DEFAULT_TOP_N);
        assert_eq!(bt.max_per_sector, DEFAULT_MAX_PER_SECTOR);
        assert_eq!(bt.max_pe, DEFAULT_MAX_PE);
        assert_eq!(bt.initial_nav, DEFAULT_INITIAL_NAV);
        assert_eq!(bt.rebalance_frequency, RebalanceFrequency::MonthEnds(6));
    }

    #[test]
    fn build_config_reads_overrides() {
        let adapter = config(
            "[backtest]\nstart_date = 2020-01-31\nend_date = 2024-12-31\n\
             rebalance_frequency = QE\ntop_n = 10\nmax_pe = 15\nmax_per_sector = 2\n",
        );
        let bt = build_backtest_config(&adapter).unwrap();
        assert_eq!(bt.rebalance_frequency, RebalanceFrequency::QuarterEnds(1));
        assert_eq!(bt.top_n, 10);
        assert_eq!(bt.max_pe, 15.0);
        assert_eq!(bt.max_per_sector, 2);
    }

    #[test]
    fn build_config_rejects_negative_top_n() {
        let adapter =
            config("[backtest]\nstart_date = 2020-01-31\nend_date = 2024-12-31\ntop_n = -3\n");
        let err = build_backtest_config(&adapter).unwrap_err();
        assert!(matches!(err, ValueScreenError::ConfigInvalid { key, .. } if key == "top_n"));
    }

    #[test]
    fn report_format_from_config() {
        assert_eq!(
            ReportFormat::from_config(&config("[report]\nformat = csv\n")),
            ReportFormat::Csv
        );
        assert_eq!(ReportFormat::from_config(&config("")), ReportFormat::Typst);
    }

    #[test]
    fn cli_parses_backtest_flags() {
        let cli = Cli::parse_from([
            "valuescreen",
            "-vv",
            "backtest",
            "--config",
            "run.ini",
            "--format",
            "csv",
            "--dry-run",
        ]);
        assert_eq!(cli.verbose, 2);
        match cli.command {
            Command::Backtest {
                config,
                format,
                dry_run,
                output,
            } => {
                assert_eq!(config, PathBuf::from("run.ini"));
                assert_eq!(format, Some(ReportFormat::Csv));
                assert!(dry_run);
                assert!(output.is_none());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn cli_parses_screen_date() {
        let cli = Cli::parse_from(["valuescreen", "screen", "-c", "run.ini", "--date", "2023-06-30"]);
        match cli.command {
            Command::Screen { date, .. } => {
                assert_eq!(date, NaiveDate::from_ymd_opt(2023, 6, 30).unwrap())
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
