//! CLI definition and dispatch.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{info, warn};

use crate::adapters::binance_adapter::BinanceAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::kline_cache::KlineCache;
use crate::adapters::svg_report::SvgReportAdapter;
use crate::domain::backtest::{self as engine, BacktestConfig, DataConfig};
use crate::domain::config_validation::validate_config;
use crate::domain::download::download_range;
use crate::domain::error::BacktestError;
use crate::domain::pairs::{parse_pairs, rank_top_pairs};
use crate::domain::strategy::Strategy;
use crate::logging::{LogFormat, init_logging};
use crate::ports::archive_port::ArchivePort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(
    name = "kline-backtester",
    version,
    about = "Backtest trading strategies on Binance spot klines"
)]
pub struct Cli {
    /// Log filter, e.g. `info` or `kline_backtester=debug`. RUST_LOG wins when set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Download daily kline archives into the local cache
    Download {
        #[arg(short, long)]
        config: PathBuf,
        /// Comma-separated pairs, overrides [data] pairs
        #[arg(long)]
        pairs: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
    },
    /// Print the most traded pairs for a quote asset
    TopPairs {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        quote: Option<String>,
        #[arg(long)]
        count: Option<usize>,
    },
    /// Run every configured strategy on every pair and write the report
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(long)]
        pairs: Option<String>,
        #[arg(long)]
        start: Option<NaiveDate>,
        #[arg(long)]
        end: Option<NaiveDate>,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Run only this strategy
        #[arg(long)]
        strategy: Option<String>,
    },
    /// Check a configuration file without doing any work
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    let format = if cli.json_logs {
        LogFormat::Json
    } else {
        LogFormat::Pretty
    };
    match init_logging(&cli.log_level, format) {
        Ok(()) => {}
        // A subscriber is already installed, e.g. when embedded in tests.
        Err(BacktestError::RunFailure { .. }) => {}
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    }

    let result = match cli.command {
        Command::Download {
            config,
            pairs,
            start,
            end,
        } => run_download(&config, pairs.as_deref(), start, end),
        Command::TopPairs {
            config,
            quote,
            count,
        } => run_top_pairs(&config, quote.as_deref(), count),
        Command::Backtest {
            config,
            pairs,
            start,
            end,
            output,
            strategy,
        } => run_backtest(
            &config,
            pairs.as_deref(),
            start,
            end,
            output,
            strategy.as_deref(),
        ),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, BacktestError> {
    info!(path = %path.display(), "loading config");
    let config = FileConfigAdapter::from_file(path)?;
    validate_config(&config)?;
    Ok(config)
}

/// Apply `--pairs`, `--start` and `--end` on top of `[data]`.
fn apply_overrides(
    mut data: DataConfig,
    pairs: Option<&str>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<DataConfig, BacktestError> {
    if let Some(raw) = pairs {
        data.pairs = parse_pairs(raw).map_err(|e| BacktestError::ConfigInvalid {
            section: "cli".into(),
            key: "pairs".into(),
            reason: e.to_string(),
        })?;
    }
    if let Some(start) = start {
        data.start_date = start;
    }
    if let Some(end) = end {
        data.end_date = end;
    }
    if data.start_date > data.end_date {
        return Err(BacktestError::ConfigInvalid {
            section: "cli".into(),
            key: "start".into(),
            reason: format!("{} is after end date {}", data.start_date, data.end_date),
        });
    }
    Ok(data)
}

fn archive_for(data: &DataConfig) -> Result<BinanceAdapter, BacktestError> {
    BinanceAdapter::new(&data.base_url, &data.api_url, data.timeout_secs)
}

fn top_pairs(
    archive: &dyn ArchivePort,
    quote: &str,
    count: usize,
) -> Result<Vec<String>, BacktestError> {
    let tickers = archive.fetch_tickers()?;
    let pairs = rank_top_pairs(&tickers, quote, count);
    info!(quote, count, found = pairs.len(), "ranked pairs by quote volume");
    Ok(pairs)
}

fn run_download(
    config_path: &Path,
    pairs: Option<&str>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;
    let data = apply_overrides(DataConfig::from_config(&config)?, pairs, start, end)?;
    let archive = archive_for(&data)?;

    let pairs = if data.pairs.is_empty() {
        top_pairs(&archive, &data.quote_asset, data.top_pairs)?
    } else {
        data.pairs.clone()
    };
    if pairs.is_empty() {
        return Err(BacktestError::ConfigInvalid {
            section: "data".into(),
            key: "pairs".into(),
            reason: "no pairs to download".into(),
        });
    }

    let cache = KlineCache::new(&data.cache_dir);
    let summary = download_range(
        &archive,
        &cache,
        &pairs,
        data.interval,
        data.start_date,
        data.end_date,
        data.max_concurrency,
        None,
    )?;

    println!(
        "{} day files: {} downloaded, {} cached, {} failed ({} bars)",
        summary.total,
        summary.downloaded,
        summary.cached,
        summary.failed.len(),
        summary.bars
    );
    for (pair, date, reason) in &summary.failed {
        println!("  {pair} {date}: {reason}");
    }
    Ok(())
}

fn run_top_pairs(
    config_path: &Path,
    quote: Option<&str>,
    count: Option<usize>,
) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;
    let data = DataConfig::from_config(&config)?;
    let quote = quote.map(str::to_ascii_uppercase).unwrap_or(data.quote_asset.clone());
    let count = count.unwrap_or(data.top_pairs);

    for pair in top_pairs(&archive_for(&data)?, &quote, count)? {
        println!("{pair}");
    }
    Ok(())
}

fn run_backtest(
    config_path: &Path,
    pairs: Option<&str>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    output: Option<PathBuf>,
    strategy: Option<&str>,
) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;
    let data = apply_overrides(DataConfig::from_config(&config)?, pairs, start, end)?;
    let mut backtest = BacktestConfig::from_config(&config)?;
    if let Some(output) = output {
        backtest.output_dir = output;
    }
    if let Some(name) = strategy {
        let name = name.trim().to_ascii_lowercase();
        if !Strategy::NAMES.contains(&name.as_str()) {
            return Err(BacktestError::ConfigInvalid {
                section: "cli".into(),
                key: "strategy".into(),
                reason: format!("unknown strategy '{name}'"),
            });
        }
        backtest.strategies = vec![name];
    }

    let runs = engine::build_strategy_runs(&config, &backtest, data.interval)?;
    let cache = KlineCache::new(&data.cache_dir);
    let pairs = if data.pairs.is_empty() {
        let cached = cache.list_pairs()?;
        warn!(found = cached.len(), "no pairs configured, using every cached pair");
        cached
    } else {
        data.pairs.clone()
    };
    if pairs.is_empty() {
        return Err(BacktestError::ConfigInvalid {
            section: "data".into(),
            key: "pairs".into(),
            reason: "no pairs configured and the cache is empty".into(),
        });
    }

    let table = engine::run_backtests(&cache, &runs, &pairs, &data, backtest.workers, None)?;
    let written = SvgReportAdapter::new().write_all(&table, &backtest.output_dir)?;

    println!(
        "{} runs: {} succeeded, {} failed",
        table.len(),
        table.succeeded_count(),
        table.failed_count()
    );
    for row in table.rows() {
        match (row.metrics(), row.error()) {
            (Some(m), _) => println!(
                "  {:<14} {:<10} return {:>8.2}%  sharpe {:>6.2}  drawdown {:>6.2}%  win {:>6.2}%  trades {}",
                row.strategy(),
                row.pair(),
                m.total_return,
                m.sharpe_ratio,
                m.max_drawdown,
                m.win_rate,
                m.trades
            ),
            (None, Some(error)) => {
                println!("  {:<14} {:<10} {}", row.strategy(), row.pair(), error)
            }
            (None, None) => {}
        }
    }
    info!(files = written.len(), dir = %backtest.output_dir.display(), "report written");
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), BacktestError> {
    let config = load_config(config_path)?;
    let data = DataConfig::from_config(&config)?;
    let backtest = BacktestConfig::from_config(&config)?;
    let runs = engine::build_strategy_runs(&config, &backtest, data.interval)?;

    println!("config OK: {}", config_path.display());
    println!(
        "  data: {} to {}, interval {}, pairs {}",
        data.start_date,
        data.end_date,
        data.interval,
        if data.pairs.is_empty() {
            format!("top {} by {} volume", data.top_pairs, data.quote_asset)
        } else {
            data.pairs.join(",")
        }
    );
    for run in &runs {
        println!(
            "  {}: fee {} slippage {} direction {}",
            run.strategy, run.params.fee_rate, run.params.slippage_rate, run.params.direction
        );
    }
    Ok(())
}
