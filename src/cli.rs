//! CLI definition and dispatch.

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::info;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use crate::adapters::column_alpha::ColumnAlpha;
use crate::adapters::csv_adapter::CsvAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::price_alpha::{MeanReversionAlpha, MomentumAlpha};
use crate::domain::alpha::{compute_alphas, AlphaKind, AlphaSpec};
use crate::domain::backtest::BacktestConfig;
use crate::domain::config_validation::{parse_date, validate_config};
use crate::domain::error::AlphatraderError;
use crate::domain::frame::build_unified_timeline;
use crate::domain::metrics::PnlStats;
use crate::domain::recommendation::Recommendation;
use crate::domain::strategy::{
    select_best_strategy, StrategyDefinition, StrategyReport, TradingSystem,
};
use crate::domain::universe::{load_universe, parse_tickers};
use crate::ports::alpha_port::AlphaPort;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 100_000.0;

#[derive(Parser, Debug)]
#[command(name = "alphatrader", about = "Cross-sectional long/short equity backtester")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest one strategy, or every configured strategy
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        strategy: Option<String>,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Recommend positions for a date (default today)
    Recommend {
        #[arg(short, long)]
        config: PathBuf,
        /// Strategy to use; the best backtested one when omitted
        #[arg(short, long)]
        strategy: Option<String>,
        #[arg(long)]
        date: Option<NaiveDate>,
        #[arg(long)]
        json: bool,
    },
    /// Validate a configuration file
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Show data range for ticker(s)
    Info {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        ticker: Option<String>,
    },
    /// List tickers that have a data file
    ListTickers {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            strategy,
            json,
        } => run_backtest(&config, strategy.as_deref(), json),
        Command::Recommend {
            config,
            strategy,
            date,
            json,
        } => run_recommend(&config, strategy.as_deref(), date, json),
        Command::Validate { config } => run_validate(&config),
        Command::Info { config, ticker } => run_info(&config, ticker.as_deref()),
        Command::ListTickers { config } => run_list_tickers(&config),
    }
}

fn fail(err: AlphatraderError) -> ExitCode {
    eprintln!("error: {err}");
    (&err).into()
}

fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|e| {
        fail(AlphatraderError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        })
    })
}

pub fn build_backtest_config(
    adapter: &dyn ConfigPort,
    today: NaiveDate,
) -> Result<BacktestConfig, AlphatraderError> {
    let start_str = adapter
        .get_string("backtest", "start_date")
        .ok_or_else(|| AlphatraderError::ConfigMissing {
            section: "backtest".into(),
            key: "start_date".into(),
        })?;
    let start_date = parse_date(&start_str, "start_date")?;
    let end_date = match adapter.get_string("backtest", "end_date") {
        Some(s) => parse_date(&s, "end_date")?,
        None => today,
    };

    Ok(BacktestConfig {
        start_date,
        end_date,
        initial_capital: adapter.get_double("backtest", "initial_capital", DEFAULT_INITIAL_CAPITAL),
    })
}

/// `[alphas]` entries, ordered by name.
pub fn build_alpha_specs(adapter: &dyn ConfigPort) -> Result<Vec<AlphaSpec>, AlphatraderError> {
    adapter
        .get_section("alphas")
        .iter()
        .map(|(name, spec)| AlphaSpec::parse(name, spec))
        .collect()
}

/// `[strategies]` entries, ordered by name.
pub fn build_strategies(
    adapter: &dyn ConfigPort,
) -> Result<Vec<StrategyDefinition>, AlphatraderError> {
    adapter
        .get_section("strategies")
        .iter()
        .map(|(name, list)| StrategyDefinition::parse(name, list))
        .collect()
}

pub fn alpha_source(spec: &AlphaSpec) -> Box<dyn AlphaPort> {
    match &spec.kind {
        AlphaKind::Column(column) => Box::new(ColumnAlpha::new(&spec.name, column)),
        AlphaKind::Momentum(n) => Box::new(MomentumAlpha::new(&spec.name, *n)),
        AlphaKind::MeanReversion(n) => Box::new(MeanReversionAlpha::new(&spec.name, *n)),
    }
}

pub fn resolve_tickers(
    ticker_override: Option<&str>,
    config: &dyn ConfigPort,
) -> Result<Vec<String>, AlphatraderError> {
    let (key, list) = match ticker_override {
        Some(t) => ("ticker", t.to_string()),
        None => (
            "tickers",
            config.get_string("backtest", "tickers").ok_or_else(|| {
                AlphatraderError::ConfigMissing {
                    section: "backtest".into(),
                    key: "tickers".into(),
                }
            })?,
        ),
    };
    parse_tickers(&list).map_err(|e| AlphatraderError::ConfigInvalid {
        section: "backtest".into(),
        key: key.into(),
        reason: e.to_string(),
    })
}

pub fn data_dir(config: &dyn ConfigPort) -> Result<PathBuf, AlphatraderError> {
    config
        .get_string("data", "dir")
        .filter(|s| !s.trim().is_empty())
        .map(|s| PathBuf::from(s.trim()))
        .ok_or_else(|| AlphatraderError::ConfigMissing {
            section: "data".into(),
            key: "dir".into(),
        })
}

/// Validates the config, loads the universe, computes every alpha once and
/// assembles the strategies around them.
pub fn build_trading_system(
    config: &dyn ConfigPort,
    data_port: &dyn DataPort,
    today: NaiveDate,
) -> Result<TradingSystem, AlphatraderError> {
    validate_config(config, today)?;
    let bt_config = build_backtest_config(config, today)?;
    let tickers = resolve_tickers(None, config)?;

    info!(
        "Loading {} tickers, {} to {}",
        tickers.len(),
        bt_config.start_date,
        bt_config.end_date
    );
    let universe = load_universe(data_port, &tickers, bt_config.start_date, bt_config.end_date)?;

    let sources: Vec<Box<dyn AlphaPort>> =
        build_alpha_specs(config)?.iter().map(alpha_source).collect();
    let timeline = build_unified_timeline(&universe.frames);
    let alphas = compute_alphas(&sources, &universe.frames, &timeline)?;

    TradingSystem::new(universe.frames, alphas, build_strategies(config)?, bt_config)
}

fn load_system(config_path: &Path) -> Result<TradingSystem, ExitCode> {
    let config = load_config(config_path)?;
    let dir = data_dir(&config).map_err(fail)?;
    let data_port = CsvAdapter::new(dir);
    build_trading_system(&config, &data_port, today()).map_err(fail)
}

fn print_json<T: Serialize>(value: &T) -> ExitCode {
    match serde_json::to_string_pretty(value) {
        Ok(s) => {
            println!("{s}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: failed to serialize output: {e}");
            ExitCode::from(1)
        }
    }
}

fn print_stats(name: &str, stats: &PnlStats) {
    println!("\n=== {} Results ===", name);
    println!("Final Portfolio Equity: ${:.2}", stats.final_equity);
    println!("Total Return:          {:.2}%", stats.total_return_pct);
    println!("Annualized Return:     {:.2}%", stats.annualized_return_pct);
    println!("Annualized Volatility: {:.2}%", stats.annualized_volatility_pct);
    println!("Sharpe Ratio:          {:.2}", stats.sharpe_ratio);
    println!("Max Drawdown:          {:.2}%", stats.max_drawdown_pct);
    println!("Max Drawdown Duration: {} days", stats.max_drawdown_duration);
}

fn print_reports(reports: &[StrategyReport]) {
    for report in reports {
        match (&report.stats, &report.error) {
            (Some(stats), _) => print_stats(&report.strategy, stats),
            (None, error) => {
                println!("\n=== {} Results ===", report.strategy);
                println!("{}", error.as_deref().unwrap_or("no result"));
            }
        }
    }
    if let Some(best) = select_best_strategy(reports) {
        println!("\nBest strategy: {}", reports[best].strategy);
    }
}

fn print_recommendation(rec: &Recommendation) {
    println!("Recommended strategy based on {} backtest", rec.best_period);
    println!("Strategy: {}", rec.strategy);
    println!("Date: {}", rec.date);
    println!("Reference Date (Last Active Trading Day): {}", rec.reference_date);
    println!("Sharpe Ratio: {:.4}", rec.sharpe_ratio);
    println!("Unpositioned Tickers: {:.1}%", rec.cash_position);

    for window in &rec.windows {
        match (window.sharpe_ratio, &window.error) {
            (Some(sharpe), _) => println!(
                "  {:<9} from {}: Sharpe {:.4}",
                window.label, window.start_date, sharpe
            ),
            (None, error) => println!(
                "  {:<9} from {}: {}",
                window.label,
                window.start_date,
                error.as_deref().unwrap_or("no result")
            ),
        }
    }

    if rec.positions.is_empty() {
        println!("\nNo positions recommended");
        return;
    }

    println!(
        "\n{:<8} {:<6} {:>8} {:>10} {:>14} {:>8} {:>9} {:>9} {:>8}",
        "Ticker", "Side", "Units", "Price", "Capital", "Alloc%", "Alpha", "Weight", "Vol"
    );
    for p in &rec.positions {
        println!(
            "{:<8} {:<6} {:>8} {:>10.2} {:>14.2} {:>7.2}% {:>9.3} {:>9.3} {:>8.4}",
            p.ticker,
            p.position.label(),
            p.units,
            p.price,
            p.capital_allocation,
            p.allocation_percentage,
            p.alpha_strength,
            p.strength_weight,
            p.volatility
        );
    }
}

fn run_backtest(config_path: &Path, strategy: Option<&str>, json: bool) -> ExitCode {
    let system = match load_system(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    match strategy {
        Some(name) => match system.run_backtest(name) {
            Ok(stats) if json => print_json(&stats),
            Ok(stats) => {
                print_stats(name, &stats);
                ExitCode::SUCCESS
            }
            Err(e) => fail(e),
        },
        None => {
            let reports = system.run_all_backtests();
            if json {
                return print_json(&reports);
            }
            print_reports(&reports);
            ExitCode::SUCCESS
        }
    }
}

fn run_recommend(
    config_path: &Path,
    strategy: Option<&str>,
    date: Option<NaiveDate>,
    json: bool,
) -> ExitCode {
    let system = match load_system(config_path) {
        Ok(s) => s,
        Err(code) => return code,
    };

    match system.recommend(strategy, date) {
        Ok(rec) if json => print_json(&rec),
        Ok(rec) => {
            print_recommendation(&rec);
            ExitCode::SUCCESS
        }
        Err(e) => fail(e),
    }
}

fn run_validate(config_path: &Path) -> ExitCode {
    info!("Validating config: {}", config_path.display());
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    if let Err(e) = validate_config(&config, today()) {
        return fail(e);
    }

    let specs = match build_alpha_specs(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };
    let strategies = match build_strategies(&config) {
        Ok(s) => s,
        Err(e) => return fail(e),
    };

    println!("Alphas:");
    for spec in &specs {
        println!("  {} = {}", spec.name, spec.kind);
    }
    println!("\nStrategies:");
    for strategy in &strategies {
        println!("  {} = {}", strategy.name, strategy.alphas.join(", "));
    }
    println!("\nConfiguration is valid.");
    ExitCode::SUCCESS
}

fn run_info(config_path: &Path, ticker: Option<&str>) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };

    let (dir, tickers) = match data_dir(&config).and_then(|dir| {
        resolve_tickers(ticker, &config).map(|tickers| (dir, tickers))
    }) {
        Ok(v) => v,
        Err(e) => return fail(e),
    };
    let adapter = CsvAdapter::new(dir);

    for t in &tickers {
        match adapter.get_data_range(t) {
            Ok(Some((min_date, max_date, count))) => {
                println!("{}: {} rows, {} to {}", t, count, min_date, max_date);
            }
            Ok(None) => {
                eprintln!("{}: no data found", t);
            }
            Err(e) => {
                eprintln!("error reading {}: {}", t, e);
            }
        }
    }
    ExitCode::SUCCESS
}

fn run_list_tickers(config_path: &Path) -> ExitCode {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let dir = match data_dir(&config) {
        Ok(d) => d,
        Err(e) => return fail(e),
    };

    let tickers = match CsvAdapter::new(dir).list_tickers() {
        Ok(t) => t,
        Err(e) => return fail(e),
    };

    if tickers.is_empty() {
        eprintln!("No tickers found");
    } else {
        for ticker in &tickers {
            println!("{}", ticker);
        }
        info!("{} tickers found", tickers.len());
    }
    ExitCode::SUCCESS
}
