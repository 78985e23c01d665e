//! Fill simulation: slippage, fees, full-equity sizing and stop/target checks.

use chrono::NaiveDateTime;

use super::portfolio::Portfolio;
use super::position::{ClosedTrade, ExitReason, Position, Side};

/// Cost model and protective levels, all as fractions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionConfig {
    pub fee_rate: f64,
    pub slippage_rate: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

pub fn calculate_fee(notional: f64, fee_rate: f64) -> f64 {
    notional * fee_rate
}

/// Entry fills pay the spread: above the close for longs, below for shorts.
pub fn entry_fill(side: Side, market_price: f64, slippage_rate: f64) -> f64 {
    market_price * (1.0 + side.sign() * slippage_rate)
}

/// Exit fills also pay the spread: below the close for longs, above for shorts.
pub fn exit_fill(side: Side, market_price: f64, slippage_rate: f64) -> f64 {
    market_price * (1.0 - side.sign() * slippage_rate)
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryResult {
    Entered {
        units: f64,
        execution_price: f64,
        fee: f64,
    },
    InsufficientCapital,
}

/// Open a position on `side` with all available cash.
///
/// Units are sized so that notional plus fee equals the cash on hand. Stop
/// and target prices are fixed fractions away from the fill.
pub fn enter(
    portfolio: &mut Portfolio,
    side: Side,
    market_price: f64,
    time: NaiveDateTime,
    config: &ExecutionConfig,
) -> EntryResult {
    let execution_price = entry_fill(side, market_price, config.slippage_rate);
    let units = portfolio.cash / (execution_price * (1.0 + config.fee_rate));
    if !(units.is_finite() && units > 0.0) {
        return EntryResult::InsufficientCapital;
    }

    let notional = units * execution_price;
    let fee = calculate_fee(notional, config.fee_rate);
    portfolio.cash = (portfolio.cash - notional - fee).max(0.0);

    let sign = side.sign();
    let position = Position {
        side,
        units,
        entry_price: execution_price,
        entry_time: time,
        entry_fee: fee,
        stop_loss: config.stop_loss.map(|sl| execution_price * (1.0 - sign * sl)),
        take_profit: config.take_profit.map(|tp| execution_price * (1.0 + sign * tp)),
    };
    portfolio.open(position);

    EntryResult::Entered {
        units,
        execution_price,
        fee,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExitResult {
    pub exit_price: f64,
    pub fee: f64,
    pub pnl: f64,
    pub reason: ExitReason,
}

/// Close the open position, settle cash and record the trade. Returns `None`
/// when flat.
pub fn exit_position(
    portfolio: &mut Portfolio,
    market_price: f64,
    time: NaiveDateTime,
    reason: ExitReason,
    config: &ExecutionConfig,
) -> Option<ExitResult> {
    let position = portfolio.take_position()?;

    let exit_price = exit_fill(position.side, market_price, config.slippage_rate);
    let fee = calculate_fee(position.units * exit_price, config.fee_rate);
    let pnl = position.unrealized_pnl(exit_price) - position.entry_fee - fee;

    portfolio.cash += position.market_value(exit_price) - fee;
    portfolio.record_trade(ClosedTrade {
        side: position.side,
        units: position.units,
        entry_price: position.entry_price,
        exit_price,
        entry_time: position.entry_time,
        exit_time: time,
        pnl,
        exit_reason: reason,
    });

    Some(ExitResult {
        exit_price,
        fee,
        pnl,
        reason,
    })
}

/// Close the position if the close breaches its stop-loss or take-profit.
/// The stop wins when both are breached.
pub fn check_triggers(
    portfolio: &mut Portfolio,
    market_price: f64,
    time: NaiveDateTime,
    config: &ExecutionConfig,
) -> Option<ExitResult> {
    let reason = match portfolio.position.as_ref() {
        Some(pos) if pos.should_stop_loss(market_price) => ExitReason::StopLoss,
        Some(pos) if pos.should_take_profit(market_price) => ExitReason::TakeProfit,
        _ => return None,
    };
    exit_position(portfolio, market_price, time, reason, config)
}
