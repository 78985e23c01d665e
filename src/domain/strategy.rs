//! Strategy variants and signal generation.
//!
//! All indicators use trailing windows only; the value on bar i never looks
//! past bar i. Bars where a required indicator is still warming up carry no
//! signal.

use std::fmt;
use std::str::FromStr;

use super::error::BacktestError;
use super::indicator::bollinger::calculate_bollinger;
use super::indicator::ema::calculate_ema;
use super::indicator::rsi::calculate_rsi;
use super::indicator::sma::calculate_sma;
use super::indicator_helpers::{calc_atr, crossed_level_down, crossed_level_up, crossings, rolling_mean};
use super::interval::BarInterval;
use super::ohlcv::{PriceBar, PriceSeries};
use super::signal::SignalSeries;
use super::simulator::{self, Direction, Simulation, SimulationParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MaKind {
    #[default]
    Exponential,
    Simple,
}

impl MaKind {
    fn compute(self, bars: &[PriceBar], period: usize) -> Vec<Option<f64>> {
        match self {
            MaKind::Exponential => calculate_ema(bars, period).simple_values(),
            MaKind::Simple => calculate_sma(bars, period).simple_values(),
        }
    }
}

impl FromStr for MaKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "ema" | "exponential" => Ok(MaKind::Exponential),
            "sma" | "simple" => Ok(MaKind::Simple),
            other => Err(format!("unknown moving average '{other}' (expected ema or sma)")),
        }
    }
}

/// Parameters of the RSI + Bollinger Band mean-reversion strategy.
#[derive(Debug, Clone, PartialEq)]
pub struct RsiBollingerParams {
    pub rsi_window: usize,
    pub oversold: f64,
    pub overbought: f64,
    pub bb_window: usize,
    /// Band width in hundredths of a standard deviation.
    pub bb_std_x100: u32,
    /// How far outside the band a close may sit and still count as touching it.
    pub band_tolerance: f64,
    pub atr_window: usize,
    pub atr_mean_window: usize,
    pub atr_filter_mult: f64,
    pub exit_level: f64,
}

impl Default for RsiBollingerParams {
    fn default() -> Self {
        RsiBollingerParams {
            rsi_window: 14,
            oversold: 45.0,
            overbought: 55.0,
            bb_window: 20,
            bb_std_x100: 150,
            band_tolerance: 0.02,
            atr_window: 14,
            atr_mean_window: 50,
            atr_filter_mult: 0.5,
            exit_level: 50.0,
        }
    }
}

/// The closed set of strategies the backtester knows how to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Strategy {
    MaCrossover {
        fast: usize,
        slow: usize,
        kind: MaKind,
    },
    SmaCrossover {
        fast: usize,
        slow: usize,
    },
    RsiBollinger(RsiBollingerParams),
}

impl Strategy {
    pub const NAMES: [&'static str; 3] = ["ma_crossover", "sma_crossover", "rsi_bb"];

    pub fn ma_crossover() -> Self {
        Strategy::MaCrossover {
            fast: 25,
            slow: 100,
            kind: MaKind::Exponential,
        }
    }

    pub fn sma_crossover() -> Self {
        Strategy::SmaCrossover { fast: 15, slow: 40 }
    }

    pub fn rsi_bollinger() -> Self {
        Strategy::RsiBollinger(RsiBollingerParams::default())
    }

    /// Every variant with its default parameters.
    pub fn defaults() -> Vec<Strategy> {
        vec![
            Strategy::ma_crossover(),
            Strategy::sma_crossover(),
            Strategy::rsi_bollinger(),
        ]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Strategy::MaCrossover { .. } => "ma_crossover",
            Strategy::SmaCrossover { .. } => "sma_crossover",
            Strategy::RsiBollinger(_) => "rsi_bb",
        }
    }

    /// Cost model and risk settings each variant is tuned for.
    pub fn default_simulation_params(&self, interval: BarInterval) -> SimulationParams {
        match self {
            Strategy::MaCrossover { .. } | Strategy::SmaCrossover { .. } => SimulationParams {
                fee_rate: 0.001,
                slippage_rate: 0.005,
                interval,
                ..Default::default()
            },
            Strategy::RsiBollinger(_) => SimulationParams {
                fee_rate: 0.0005,
                slippage_rate: 0.001,
                stop_loss: Some(0.016),
                take_profit: Some(0.016),
                direction: Direction::Both,
                interval,
                ..Default::default()
            },
        }
    }

    /// Bars needed before the first signal can fire.
    pub fn warmup(&self) -> usize {
        match self {
            Strategy::MaCrossover { slow, .. } | Strategy::SmaCrossover { slow, .. } => *slow,
            Strategy::RsiBollinger(p) => (p.rsi_window + 1)
                .max(p.bb_window)
                .max(p.atr_window + p.atr_mean_window - 1),
        }
    }

    pub fn validate(&self) -> Result<(), BacktestError> {
        let section = self.name();
        let invalid = |key: &str, reason: String| {
            Err(BacktestError::ConfigInvalid {
                section: section.to_string(),
                key: key.to_string(),
                reason,
            })
        };

        match self {
            Strategy::MaCrossover { fast, slow, .. } | Strategy::SmaCrossover { fast, slow } => {
                if *fast == 0 {
                    return invalid("fast_window", "must be at least 1".into());
                }
                if fast >= slow {
                    return invalid(
                        "fast_window",
                        format!("must be less than slow_window ({fast} >= {slow})"),
                    );
                }
            }
            Strategy::RsiBollinger(p) => {
                for (key, window) in [
                    ("rsi_window", p.rsi_window),
                    ("bb_window", p.bb_window),
                    ("atr_window", p.atr_window),
                    ("atr_mean_window", p.atr_mean_window),
                ] {
                    if window == 0 {
                        return invalid(key, "must be at least 1".into());
                    }
                }
                if !(0.0 < p.oversold && p.oversold < p.overbought && p.overbought < 100.0) {
                    return invalid(
                        "oversold",
                        format!(
                            "need 0 < oversold < overbought < 100, got {} / {}",
                            p.oversold, p.overbought
                        ),
                    );
                }
                if !(0.0..100.0).contains(&p.exit_level) {
                    return invalid("exit_level", format!("must be in [0, 100), got {}", p.exit_level));
                }
                if p.bb_std_x100 == 0 {
                    return invalid("bb_std", "must be positive".into());
                }
                if !(0.0..1.0).contains(&p.band_tolerance) {
                    return invalid(
                        "band_tolerance",
                        format!("must be in [0, 1), got {}", p.band_tolerance),
                    );
                }
                if !(p.atr_filter_mult.is_finite() && p.atr_filter_mult >= 0.0) {
                    return invalid(
                        "atr_filter_mult",
                        format!("must be >= 0, got {}", p.atr_filter_mult),
                    );
                }
            }
        }
        Ok(())
    }

    /// Entry/exit flags aligned with `series`. A series shorter than
    /// [`Strategy::warmup`] is `InsufficientData`.
    pub fn generate_signals(&self, series: &PriceSeries) -> Result<SignalSeries, BacktestError> {
        series.require(self.warmup().max(1))?;
        let bars = series.bars();

        let signals = match self {
            Strategy::MaCrossover { fast, slow, kind } => {
                let (entries, exits) = crossings(&kind.compute(bars, *fast), &kind.compute(bars, *slow));
                SignalSeries::long_only(entries, exits)
            }
            Strategy::SmaCrossover { fast, slow } => {
                let (entries, exits) = crossings(
                    &MaKind::Simple.compute(bars, *fast),
                    &MaKind::Simple.compute(bars, *slow),
                );
                SignalSeries::long_only(entries, exits)
            }
            Strategy::RsiBollinger(params) => rsi_bollinger_signals(bars, params),
        };

        signals.ensure_aligned(series.len())?;
        Ok(signals)
    }

    /// Generate signals and simulate them.
    pub fn evaluate(
        &self,
        series: &PriceSeries,
        params: &SimulationParams,
    ) -> Result<Simulation, BacktestError> {
        let signals = self.generate_signals(series)?;
        simulator::simulate(series, &signals, params)
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::MaCrossover { fast, slow, kind } => {
                let kind = match kind {
                    MaKind::Exponential => "ema",
                    MaKind::Simple => "sma",
                };
                write!(f, "ma_crossover({kind} {fast}/{slow})")
            }
            Strategy::SmaCrossover { fast, slow } => write!(f, "sma_crossover({fast}/{slow})"),
            Strategy::RsiBollinger(p) => write!(
                f,
                "rsi_bb(rsi {} {}/{}, bb {} x{:.2})",
                p.rsi_window,
                p.oversold,
                p.overbought,
                p.bb_window,
                p.bb_std_x100 as f64 / 100.0
            ),
        }
    }
}

fn rsi_bollinger_signals(bars: &[PriceBar], params: &RsiBollingerParams) -> SignalSeries {
    let rsi = calculate_rsi(bars, params.rsi_window).simple_values();
    let bands = calculate_bollinger(bars, params.bb_window, params.bb_std_x100).band_values();
    let atr = calc_atr(bars, params.atr_window).simple_values();
    let atr_mean = rolling_mean(&atr, params.atr_mean_window);

    let len = bars.len();
    let mut entries = vec![false; len];
    let mut short_entries = vec![false; len];

    for (i, bar) in bars.iter().enumerate() {
        let (Some(strength), Some((upper, _, lower)), Some(range), Some(mean_range)) =
            (rsi[i], bands[i], atr[i], atr_mean[i])
        else {
            continue;
        };
        if range <= params.atr_filter_mult * mean_range {
            continue;
        }
        entries[i] =
            strength < params.oversold && bar.close <= lower * (1.0 + params.band_tolerance);
        short_entries[i] =
            strength > params.overbought && bar.close >= upper * (1.0 - params.band_tolerance);
    }

    SignalSeries {
        entries,
        exits: crossed_level_up(&rsi, params.exit_level),
        short_entries,
        short_exits: crossed_level_down(&rsi, params.exit_level),
    }
}
