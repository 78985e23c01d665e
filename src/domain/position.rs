//! Open positions and closed trades.

use chrono::NaiveDateTime;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    /// +1 for long, -1 for short.
    pub fn sign(self) -> f64 {
        match self {
            Side::Long => 1.0,
            Side::Short => -1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub side: Side,
    pub units: f64,
    /// Fill price after slippage.
    pub entry_price: f64,
    pub entry_time: NaiveDateTime,
    pub entry_fee: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

impl Position {
    pub fn is_long(&self) -> bool {
        self.side == Side::Long
    }

    pub fn is_short(&self) -> bool {
        self.side == Side::Short
    }

    pub fn entry_notional(&self) -> f64 {
        self.units * self.entry_price
    }

    /// Value held against this position at `price`. A short escrows its entry
    /// notional and gains as the price falls.
    pub fn market_value(&self, price: f64) -> f64 {
        match self.side {
            Side::Long => self.units * price,
            Side::Short => self.entry_notional() + self.unrealized_pnl(price),
        }
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.side.sign() * self.units * (price - self.entry_price)
    }

    pub fn should_stop_loss(&self, price: f64) -> bool {
        match (self.stop_loss, self.side) {
            (Some(stop), Side::Long) => price <= stop,
            (Some(stop), Side::Short) => price >= stop,
            (None, _) => false,
        }
    }

    pub fn should_take_profit(&self, price: f64) -> bool {
        match (self.take_profit, self.side) {
            (Some(target), Side::Long) => price >= target,
            (Some(target), Side::Short) => price <= target,
            (None, _) => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    Signal,
    StopLoss,
    TakeProfit,
    /// Forced close once equity is wiped out.
    Liquidation,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClosedTrade {
    pub side: Side,
    pub units: f64,
    pub entry_price: f64,
    pub exit_price: f64,
    pub entry_time: NaiveDateTime,
    pub exit_time: NaiveDateTime,
    /// Net of entry and exit fees.
    pub pnl: f64,
    pub exit_reason: ExitReason,
}

impl ClosedTrade {
    pub fn is_win(&self) -> bool {
        self.pnl > 0.0
    }
}
