//! Summary statistics for a simulated run.

use super::interval::BarInterval;
use super::portfolio::EquityPoint;
use super::position::ClosedTrade;

/// Per-run summary. Percentages are expressed as 0..100.
#[derive(Debug, Clone, PartialEq)]
pub struct RunMetrics {
    pub total_return: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub win_rate: f64,
    pub trades: usize,
}

impl RunMetrics {
    pub const NAMES: [&'static str; 5] = [
        "total_return",
        "sharpe_ratio",
        "max_drawdown",
        "win_rate",
        "trades",
    ];

    /// `open_positions` counts toward `trades` but not toward the win rate.
    pub fn compute(
        equity_curve: &[EquityPoint],
        closed_trades: &[ClosedTrade],
        open_positions: usize,
        initial_capital: f64,
        interval: BarInterval,
    ) -> Self {
        let final_equity = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_capital);

        let total_return = if initial_capital > 0.0 {
            (final_equity - initial_capital) / initial_capital * 100.0
        } else {
            0.0
        };

        let won = closed_trades.iter().filter(|t| t.is_win()).count();
        let win_rate = if closed_trades.is_empty() {
            0.0
        } else {
            won as f64 / closed_trades.len() as f64 * 100.0
        };

        RunMetrics {
            total_return,
            sharpe_ratio: compute_sharpe(equity_curve, interval.bars_per_year()),
            max_drawdown: compute_drawdown(equity_curve) * 100.0,
            win_rate,
            trades: closed_trades.len() + open_positions,
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        match name {
            "total_return" => Some(self.total_return),
            "sharpe_ratio" => Some(self.sharpe_ratio),
            "max_drawdown" => Some(self.max_drawdown),
            "win_rate" => Some(self.win_rate),
            "trades" => Some(self.trades as f64),
            _ => None,
        }
    }
}

/// Largest peak-to-trough decline as a fraction of the peak.
fn compute_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    let Some(first) = equity_curve.first() else {
        return 0.0;
    };

    let mut peak = first.equity;
    let mut max_dd = 0.0_f64;
    for point in equity_curve {
        if point.equity > peak {
            peak = point.equity;
        } else if peak > 0.0 {
            max_dd = max_dd.max((peak - point.equity) / peak);
        }
    }
    max_dd.min(1.0)
}

/// Mean over population standard deviation of per-bar returns, scaled by
/// the square root of bars per year. Zero when returns do not vary.
fn compute_sharpe(equity_curve: &[EquityPoint], bars_per_year: f64) -> f64 {
    if equity_curve.len() < 2 {
        return 0.0;
    }

    let returns: Vec<f64> = equity_curve
        .windows(2)
        .map(|w| {
            let prev = w[0].equity;
            if prev > 0.0 {
                (w[1].equity - prev) / prev
            } else {
                0.0
            }
        })
        .collect();

    let n = returns.len() as f64;
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    let stddev = variance.sqrt();

    if stddev > 1e-12 {
        mean / stddev * bars_per_year.sqrt()
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::position::{ExitReason, Side};
    use chrono::{Duration, NaiveDate, NaiveDateTime};

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    fn make_equity_curve(values: &[f64]) -> Vec<EquityPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, &equity)| EquityPoint {
                timestamp: start() + Duration::minutes(i as i64),
                equity,
            })
            .collect()
    }

    fn make_trade(pnl: f64) -> ClosedTrade {
        ClosedTrade {
            side: Side::Long,
            units: 1.0,
            entry_price: 100.0,
            exit_price: 100.0 + pnl,
            entry_time: start(),
            exit_time: start() + Duration::minutes(5),
            pnl,
            exit_reason: ExitReason::Signal,
        }
    }

    fn compute(values: &[f64], trades: &[ClosedTrade], open: usize) -> RunMetrics {
        let curve = make_equity_curve(values);
        RunMetrics::compute(&curve, trades, open, values[0], BarInterval::Minute1)
    }

    #[test]
    fn total_return_is_percentage() {
        let m = compute(&[1000.0, 1100.0, 1200.0], &[], 0);
        assert!((m.total_return - 20.0).abs() < 1e-9);

        let m = compute(&[1000.0, 900.0], &[], 0);
        assert!((m.total_return + 10.0).abs() < 1e-9);
    }

    #[test]
    fn empty_curve_is_zero_return() {
        let m = RunMetrics::compute(&[], &[], 0, 1000.0, BarInterval::Day1);
        assert_eq!(m.total_return, 0.0);
        assert_eq!(m.sharpe_ratio, 0.0);
        assert_eq!(m.max_drawdown, 0.0);
    }

    #[test]
    fn max_drawdown_peak_to_trough() {
        let m = compute(&[100.0, 120.0, 90.0, 110.0, 80.0, 130.0], &[], 0);
        // peak 120 to trough 80
        assert!((m.max_drawdown - 100.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn drawdown_capped_at_total_loss() {
        let m = compute(&[100.0, 0.0, -100.0], &[], 0);
        assert_eq!(m.max_drawdown, 100.0);
    }

    #[test]
    fn win_rate_over_closed_trades_only() {
        let trades = vec![make_trade(10.0), make_trade(-5.0), make_trade(0.0), make_trade(3.0)];
        let m = compute(&[1000.0, 1000.0], &trades, 1);
        assert!((m.win_rate - 50.0).abs() < 1e-9);
        assert_eq!(m.trades, 5);
    }

    #[test]
    fn win_rate_zero_without_closed_trades() {
        let m = compute(&[1000.0, 1010.0], &[], 1);
        assert_eq!(m.win_rate, 0.0);
        assert_eq!(m.trades, 1);
    }

    #[test]
    fn sharpe_annualized_by_interval() {
        let values = [100.0, 101.0, 100.5, 102.0, 101.0];
        let curve = make_equity_curve(&values);
        let minute = RunMetrics::compute(&curve, &[], 0, 100.0, BarInterval::Minute1);
        let daily = RunMetrics::compute(&curve, &[], 0, 100.0, BarInterval::Day1);

        assert!(minute.sharpe_ratio > 0.0);
        let ratio = minute.sharpe_ratio / daily.sharpe_ratio;
        assert!((ratio - 1440.0_f64.sqrt()).abs() < 1e-6);
    }

    #[test]
    fn sharpe_zero_for_constant_equity() {
        let m = compute(&[100.0, 100.0, 100.0], &[], 0);
        assert_eq!(m.sharpe_ratio, 0.0);
    }

    #[test]
    fn get_by_name() {
        let m = compute(&[1000.0, 1100.0], &[make_trade(1.0)], 0);
        assert_eq!(m.get("trades"), Some(1.0));
        assert_eq!(m.get("win_rate"), Some(100.0));
        assert_eq!(m.get("sortino"), None);
        assert!(RunMetrics::NAMES.iter().all(|n| m.get(n).is_some()));
    }
}
