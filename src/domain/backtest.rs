//! Backtest configuration and the load -> evaluate pipeline.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use chrono::NaiveDate;
use tracing::{info, warn};

use super::aggregator::{MetricsAggregator, RunJob};
use super::config_validation::{
    read_date, read_f64, read_interval, read_optional_fraction, read_strategy_names, read_usize,
    validate_backtest_config, validate_data_config, validate_strategy_config,
};
use super::error::BacktestError;
use super::interval::BarInterval;
use super::ohlcv::PriceSeries;
use super::pairs::parse_pairs;
use super::simulator::{Direction, SimulationParams};
use super::strategy::{MaKind, RsiBollingerParams, Strategy};
use super::table::MetricsTable;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;

pub const DEFAULT_ARCHIVE_URL: &str = "https://data.binance.vision/data/spot/daily/klines";
pub const DEFAULT_API_URL: &str = "https://api.binance.com";

/// `[data]`: where bars come from and which ones to fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct DataConfig {
    /// Empty means "use the top pairs by volume".
    pub pairs: Vec<String>,
    pub quote_asset: String,
    pub top_pairs: usize,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub interval: BarInterval,
    pub cache_dir: PathBuf,
    pub base_url: String,
    pub api_url: String,
    pub max_concurrency: usize,
    pub timeout_secs: u64,
}

impl DataConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, BacktestError> {
        validate_data_config(config)?;
        let text = |key: &str, default: &str| {
            config
                .get_string("data", key)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let pairs = match config.get_string("data", "pairs") {
            Some(raw) if !raw.trim().is_empty() => {
                parse_pairs(&raw).map_err(|e| BacktestError::ConfigInvalid {
                    section: "data".into(),
                    key: "pairs".into(),
                    reason: e.to_string(),
                })?
            }
            _ => Vec::new(),
        };

        Ok(DataConfig {
            pairs,
            quote_asset: text("quote_asset", "BTC").to_ascii_uppercase(),
            top_pairs: read_usize(config, "data", "top_pairs", 10)?,
            start_date: read_date(config, "data", "start_date")?,
            end_date: read_date(config, "data", "end_date")?,
            interval: read_interval(config)?,
            cache_dir: PathBuf::from(text("cache_dir", "data")),
            base_url: text("base_url", DEFAULT_ARCHIVE_URL),
            api_url: text("api_url", DEFAULT_API_URL),
            max_concurrency: read_usize(config, "data", "max_concurrency", 4)?,
            timeout_secs: read_usize(config, "data", "timeout_secs", 30)? as u64,
        })
    }
}

/// `[backtest]`: run-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub workers: usize,
    pub output_dir: PathBuf,
    pub strategies: Vec<String>,
    pub allow_same_bar_reentry: bool,
}

impl BacktestConfig {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, BacktestError> {
        validate_backtest_config(config)?;
        let output_dir = config
            .get_string("backtest", "output_dir")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "results".to_string());

        Ok(BacktestConfig {
            initial_capital: read_f64(config, "backtest", "initial_capital", 10_000.0)?,
            workers: read_usize(config, "backtest", "workers", 1)?,
            output_dir: PathBuf::from(output_dir),
            strategies: read_strategy_names(config)?,
            allow_same_bar_reentry: config.get_bool("backtest", "allow_same_bar_reentry", false),
        })
    }
}

/// A configured strategy and the simulation parameters it runs with.
#[derive(Debug, Clone, PartialEq)]
pub struct StrategyRun {
    pub strategy: Strategy,
    pub params: SimulationParams,
}

/// Build one strategy from its section, starting from the variant defaults.
pub fn build_strategy(
    config: &dyn ConfigPort,
    name: &str,
    interval: BarInterval,
    backtest: &BacktestConfig,
) -> Result<StrategyRun, BacktestError> {
    validate_strategy_config(config, name)?;

    let strategy = match name {
        "ma_crossover" => Strategy::MaCrossover {
            fast: read_usize(config, name, "fast_window", 25)?,
            slow: read_usize(config, name, "slow_window", 100)?,
            kind: match config.get_string(name, "ma_type") {
                Some(raw) => raw.parse::<MaKind>().unwrap_or_default(),
                None => MaKind::Exponential,
            },
        },
        "sma_crossover" => Strategy::SmaCrossover {
            fast: read_usize(config, name, "fast_window", 15)?,
            slow: read_usize(config, name, "slow_window", 40)?,
        },
        "rsi_bb" => {
            let d = RsiBollingerParams::default();
            let bb_std = read_f64(config, name, "bb_std", d.bb_std_x100 as f64 / 100.0)?;
            if !(bb_std > 0.0 && bb_std <= 10.0) {
                return Err(BacktestError::ConfigInvalid {
                    section: name.to_string(),
                    key: "bb_std".into(),
                    reason: format!("bb_std must be in (0, 10], got {bb_std}"),
                });
            }
            // stored in hundredths
            let bb_std_x100 = (bb_std * 100.0).round();
            if (bb_std_x100 - bb_std * 100.0).abs() > 1e-6 {
                return Err(BacktestError::ConfigInvalid {
                    section: name.to_string(),
                    key: "bb_std".into(),
                    reason: format!("bb_std supports at most two decimals, got {bb_std}"),
                });
            }
            Strategy::RsiBollinger(RsiBollingerParams {
                rsi_window: read_usize(config, name, "rsi_window", d.rsi_window)?,
                oversold: read_f64(config, name, "oversold", d.oversold)?,
                overbought: read_f64(config, name, "overbought", d.overbought)?,
                bb_window: read_usize(config, name, "bb_window", d.bb_window)?,
                bb_std_x100: bb_std_x100 as u32,
                band_tolerance: read_f64(config, name, "band_tolerance", d.band_tolerance)?,
                atr_window: read_usize(config, name, "atr_window", d.atr_window)?,
                atr_mean_window: read_usize(config, name, "atr_mean_window", d.atr_mean_window)?,
                atr_filter_mult: read_f64(config, name, "atr_filter_mult", d.atr_filter_mult)?,
                exit_level: read_f64(config, name, "exit_level", d.exit_level)?,
            })
        }
        other => {
            return Err(BacktestError::ConfigInvalid {
                section: "backtest".into(),
                key: "strategies".into(),
                reason: format!("unknown strategy '{other}'"),
            });
        }
    };
    strategy.validate()?;

    let defaults = strategy.default_simulation_params(interval);
    let direction = match config.get_string(name, "direction") {
        Some(raw) => raw.parse::<Direction>().unwrap_or(defaults.direction),
        None => defaults.direction,
    };
    let params = SimulationParams {
        initial_capital: backtest.initial_capital,
        fee_rate: read_f64(config, name, "fee_rate", defaults.fee_rate)?,
        slippage_rate: read_f64(config, name, "slippage_rate", defaults.slippage_rate)?,
        stop_loss: read_optional_fraction(config, name, "stop_loss", defaults.stop_loss)?,
        take_profit: read_optional_fraction(config, name, "take_profit", defaults.take_profit)?,
        direction,
        interval,
        allow_same_bar_reentry: backtest.allow_same_bar_reentry,
    };
    params.validate()?;

    Ok(StrategyRun { strategy, params })
}

/// Build every strategy selected in `[backtest] strategies`.
pub fn build_strategy_runs(
    config: &dyn ConfigPort,
    backtest: &BacktestConfig,
    interval: BarInterval,
) -> Result<Vec<StrategyRun>, BacktestError> {
    backtest
        .strategies
        .iter()
        .map(|name| build_strategy(config, name, interval, backtest))
        .collect()
}

/// Load one series per pair. A pair whose data cannot be read becomes an
/// empty series so it surfaces as an `InsufficientData` row later.
pub fn load_all_series(
    data_port: &dyn DataPort,
    pairs: &[String],
    interval: BarInterval,
    start: NaiveDate,
    end: NaiveDate,
) -> Vec<Arc<PriceSeries>> {
    pairs
        .iter()
        .map(|pair| {
            let series = match data_port.load_series(pair, interval, start, end) {
                Ok(series) => {
                    info!(pair = %pair, bars = series.len(), "loaded");
                    series
                }
                Err(e) => {
                    warn!(pair = %pair, error = %e, "failed to load price data");
                    PriceSeries::from_unsorted(pair.clone(), Vec::new())
                }
            };
            Arc::new(series)
        })
        .collect()
}

/// Every (strategy, pair) combination, strategies outermost.
pub fn build_jobs(runs: &[StrategyRun], series: &[Arc<PriceSeries>]) -> Vec<RunJob> {
    runs.iter()
        .flat_map(|run| {
            series
                .iter()
                .map(move |s| RunJob::new(run.strategy.clone(), Arc::clone(s), run.params.clone()))
        })
        .collect()
}

/// Load data for `pairs` and evaluate every configured strategy on it.
pub fn run_backtests(
    data_port: &dyn DataPort,
    runs: &[StrategyRun],
    pairs: &[String],
    data: &DataConfig,
    workers: usize,
    cancel: Option<Arc<AtomicBool>>,
) -> Result<MetricsTable, BacktestError> {
    let series = load_all_series(data_port, pairs, data.interval, data.start_date, data.end_date);
    let jobs = build_jobs(runs, &series);
    info!(strategies = runs.len(), pairs = pairs.len(), jobs = jobs.len(), workers, "running backtests");

    let mut aggregator = MetricsAggregator::new(workers);
    if let Some(cancel) = cancel {
        aggregator = aggregator.with_cancel(cancel);
    }
    aggregator.run(jobs)
}
