//! Bar-by-bar portfolio simulation.
//!
//! Each bar is processed on its close, in order:
//! 1. stop-loss / take-profit check against the entry fill
//! 2. signal exit for the open side
//! 3. entry when flat (not on a bar that already closed a position, unless
//!    same-bar re-entry is enabled, and not when the bar also carries an exit
//!    for the same side)
//! 4. mark to market
//!
//! Positions still open after the last bar are left open and valued at the
//! final close.

use std::fmt;
use std::str::FromStr;

use tracing::{debug, trace};

use super::error::BacktestError;
use super::execution::{self, EntryResult, ExecutionConfig};
use super::interval::BarInterval;
use super::metrics::RunMetrics;
use super::ohlcv::PriceSeries;
use super::portfolio::{EquityPoint, Portfolio};
use super::position::{ClosedTrade, ExitReason, Position, Side};
use super::signal::SignalSeries;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    LongOnly,
    Both,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::LongOnly => "long_only",
            Direction::Both => "both",
        })
    }
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "long_only" | "longonly" | "long" => Ok(Direction::LongOnly),
            "both" => Ok(Direction::Both),
            other => Err(format!("unknown direction '{other}' (expected long_only or both)")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SimulationParams {
    pub initial_capital: f64,
    pub fee_rate: f64,
    pub slippage_rate: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub direction: Direction,
    pub interval: BarInterval,
    pub allow_same_bar_reentry: bool,
}

impl Default for SimulationParams {
    fn default() -> Self {
        SimulationParams {
            initial_capital: 10_000.0,
            fee_rate: 0.0,
            slippage_rate: 0.0,
            stop_loss: None,
            take_profit: None,
            direction: Direction::LongOnly,
            interval: BarInterval::Minute1,
            allow_same_bar_reentry: false,
        }
    }
}

impl SimulationParams {
    pub fn validate(&self) -> Result<(), BacktestError> {
        let fail = |reason: String| Err(BacktestError::SimulationFailure { reason });

        if !(self.initial_capital.is_finite() && self.initial_capital > 0.0) {
            return fail(format!(
                "initial capital must be positive, got {}",
                self.initial_capital
            ));
        }
        if !(self.fee_rate.is_finite() && self.fee_rate >= 0.0) {
            return fail(format!("fee rate must be >= 0, got {}", self.fee_rate));
        }
        if !(self.slippage_rate.is_finite() && (0.0..1.0).contains(&self.slippage_rate)) {
            return fail(format!(
                "slippage rate must be in [0, 1), got {}",
                self.slippage_rate
            ));
        }
        for (name, value) in [("stop loss", self.stop_loss), ("take profit", self.take_profit)] {
            match value {
                Some(v) if !(v.is_finite() && v > 0.0) => {
                    return fail(format!("{name} must be positive, got {v}"));
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            fee_rate: self.fee_rate,
            slippage_rate: self.slippage_rate,
            stop_loss: self.stop_loss,
            take_profit: self.take_profit,
        }
    }
}

/// Outcome of a completed simulation.
#[derive(Debug, Clone, PartialEq)]
pub struct Simulation {
    pub initial_capital: f64,
    pub equity_curve: Vec<EquityPoint>,
    pub closed_trades: Vec<ClosedTrade>,
    pub open_position: Option<Position>,
    pub metrics: RunMetrics,
}

impl Simulation {
    pub fn final_equity(&self) -> f64 {
        self.equity_curve
            .last()
            .map_or(self.initial_capital, |p| p.equity)
    }
}

fn validate_inputs(
    series: &PriceSeries,
    signals: &SignalSeries,
    params: &SimulationParams,
) -> Result<(), BacktestError> {
    series.require(1)?;
    params.validate()?;
    signals.ensure_aligned(series.len())?;

    if let Some((i, bar)) = series
        .bars()
        .iter()
        .enumerate()
        .find(|(_, b)| !(b.close.is_finite() && b.close > 0.0))
    {
        return Err(BacktestError::SimulationFailure {
            reason: format!(
                "{}: close {} at index {i} ({}) is not a positive price",
                series.pair(),
                bar.close,
                bar.timestamp
            ),
        });
    }
    Ok(())
}

/// Run `signals` against `series` under `params`.
pub fn simulate(
    series: &PriceSeries,
    signals: &SignalSeries,
    params: &SimulationParams,
) -> Result<Simulation, BacktestError> {
    validate_inputs(series, signals, params)?;

    let config = params.execution_config();
    let mut portfolio = Portfolio::new(params.initial_capital);

    for (i, bar) in series.bars().iter().enumerate() {
        let price = bar.close;
        let mut closed_this_bar = false;

        if let Some(exit) = execution::check_triggers(&mut portfolio, price, bar.timestamp, &config)
        {
            trace!(pair = series.pair(), bar = i, reason = ?exit.reason, pnl = exit.pnl, "protective exit");
            closed_this_bar = true;
        }

        let exit_signal = match portfolio.position.as_ref().map(|p| p.side) {
            Some(Side::Long) => signals.exits[i],
            Some(Side::Short) => signals.short_exits[i],
            None => false,
        };
        if exit_signal {
            if let Some(exit) = execution::exit_position(
                &mut portfolio,
                price,
                bar.timestamp,
                ExitReason::Signal,
                &config,
            ) {
                trace!(pair = series.pair(), bar = i, pnl = exit.pnl, "signal exit");
                closed_this_bar = true;
            }
        }

        if portfolio.is_flat() && (!closed_this_bar || params.allow_same_bar_reentry) {
            let long = signals.entries[i] && !signals.exits[i];
            let short = params.direction == Direction::Both
                && signals.short_entries[i]
                && !signals.short_exits[i];
            let side = match (long, short) {
                (true, false) => Some(Side::Long),
                (false, true) => Some(Side::Short),
                _ => None,
            };
            if let Some(side) = side {
                if let EntryResult::Entered {
                    units,
                    execution_price,
                    ..
                } = execution::enter(&mut portfolio, side, price, bar.timestamp, &config)
                {
                    trace!(pair = series.pair(), bar = i, ?side, units, execution_price, "entry");
                }
            }
        }

        // equity cannot go below zero: an unstopped short that loses more
        // than the account is closed and the deficit written off
        if portfolio.position.is_some() && portfolio.total_equity(price) <= 0.0 {
            if let Some(exit) = execution::exit_position(
                &mut portfolio,
                price,
                bar.timestamp,
                ExitReason::Liquidation,
                &config,
            ) {
                debug!(pair = series.pair(), bar = i, pnl = exit.pnl, "position liquidated");
            }
            portfolio.cash = portfolio.cash.max(0.0);
        }

        portfolio.mark(bar.timestamp, price);
    }

    let open_positions = usize::from(portfolio.position.is_some());
    let metrics = RunMetrics::compute(
        &portfolio.equity_curve,
        &portfolio.closed_trades,
        open_positions,
        params.initial_capital,
        params.interval,
    );

    Ok(Simulation {
        initial_capital: params.initial_capital,
        equity_curve: portfolio.equity_curve,
        closed_trades: portfolio.closed_trades,
        open_position: portfolio.position,
        metrics,
    })
}
