//! Single-pair portfolio state and equity tracking.

use chrono::NaiveDateTime;

use super::position::{ClosedTrade, Position};

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub timestamp: NaiveDateTime,
    pub equity: f64,
}

/// Cash plus at most one open position.
#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    pub initial_capital: f64,
    pub position: Option<Position>,
    pub closed_trades: Vec<ClosedTrade>,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_capital: f64) -> Self {
        Portfolio {
            cash: initial_capital,
            initial_capital,
            position: None,
            closed_trades: Vec::new(),
            equity_curve: Vec::new(),
        }
    }

    pub fn is_flat(&self) -> bool {
        self.position.is_none()
    }

    pub fn open(&mut self, position: Position) {
        self.position = Some(position);
    }

    pub fn take_position(&mut self) -> Option<Position> {
        self.position.take()
    }

    pub fn record_trade(&mut self, trade: ClosedTrade) {
        self.closed_trades.push(trade);
    }

    pub fn total_equity(&self, price: f64) -> f64 {
        self.cash
            + self
                .position
                .as_ref()
                .map_or(0.0, |pos| pos.market_value(price))
    }

    /// Mark to market at `price` and append to the equity curve.
    pub fn mark(&mut self, timestamp: NaiveDateTime, price: f64) {
        let equity = self.total_equity(price);
        self.equity_curve.push(EquityPoint { timestamp, equity });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::Side;
    use chrono::NaiveDate;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 1)
            .unwrap()
            .and_hms_opt(0, minute, 0)
            .unwrap()
    }

    fn long_position(units: f64, entry_price: f64) -> Position {
        Position {
            side: Side::Long,
            units,
            entry_price,
            entry_time: ts(0),
            entry_fee: 0.0,
            stop_loss: None,
            take_profit: None,
        }
    }

    #[test]
    fn new_portfolio_is_flat() {
        let portfolio = Portfolio::new(1000.0);
        assert!(portfolio.is_flat());
        assert!((portfolio.cash - 1000.0).abs() < f64::EPSILON);
        assert!(portfolio.closed_trades.is_empty());
        assert!(portfolio.equity_curve.is_empty());
    }

    #[test]
    fn open_and_take_position() {
        let mut portfolio = Portfolio::new(1000.0);
        portfolio.open(long_position(1.0, 10.0));
        assert!(!portfolio.is_flat());

        let taken = portfolio.take_position();
        assert_eq!(taken.map(|p| p.units), Some(1.0));
        assert!(portfolio.is_flat());
    }

    #[test]
    fn total_equity_uses_market_value() {
        let mut portfolio = Portfolio::new(1000.0);
        portfolio.cash = 0.0;
        portfolio.open(long_position(10.0, 100.0));
        assert!((portfolio.total_equity(120.0) - 1200.0).abs() < 1e-9);
    }

    #[test]
    fn mark_appends_equity_point() {
        let mut portfolio = Portfolio::new(500.0);
        portfolio.mark(ts(1), 42.0);
        portfolio.mark(ts(2), 43.0);

        assert_eq!(portfolio.equity_curve.len(), 2);
        assert_eq!(portfolio.equity_curve[1].timestamp, ts(2));
        assert!((portfolio.equity_curve[1].equity - 500.0).abs() < f64::EPSILON);
    }
}
