//! `metrics.csv`: one row per (strategy, pair) run.

use std::path::Path;

use serde::Serialize;

use crate::domain::error::BacktestError;
use crate::domain::table::{MetricsTable, RunResult};

/// Failed rows leave the metric columns empty and fill `error`.
#[derive(Debug, Serialize)]
struct MetricsRow<'a> {
    strategy: &'a str,
    pair: &'a str,
    status: &'static str,
    total_return: Option<f64>,
    sharpe_ratio: Option<f64>,
    max_drawdown: Option<f64>,
    win_rate: Option<f64>,
    trades: Option<usize>,
    error: String,
}

impl<'a> From<&'a RunResult> for MetricsRow<'a> {
    fn from(row: &'a RunResult) -> Self {
        let m = row.metrics();
        MetricsRow {
            strategy: row.strategy(),
            pair: row.pair(),
            status: if row.is_success() { "ok" } else { "failed" },
            total_return: m.map(|m| m.total_return),
            sharpe_ratio: m.map(|m| m.sharpe_ratio),
            max_drawdown: m.map(|m| m.max_drawdown),
            win_rate: m.map(|m| m.win_rate),
            trades: m.map(|m| m.trades),
            error: row.error().unwrap_or_default(),
        }
    }
}

pub fn write_metrics_csv(table: &MetricsTable, path: &Path) -> Result<(), BacktestError> {
    let report_err = |e: csv::Error| BacktestError::Report {
        reason: format!("failed to write {}: {e}", path.display()),
    };
    let mut writer = csv::Writer::from_path(path).map_err(report_err)?;
    if table.is_empty() {
        writer
            .write_record([
                "strategy",
                "pair",
                "status",
                "total_return",
                "sharpe_ratio",
                "max_drawdown",
                "win_rate",
                "trades",
                "error",
            ])
            .map_err(report_err)?;
    }
    for row in table.rows() {
        writer.serialize(MetricsRow::from(row)).map_err(report_err)?;
    }
    writer.flush()?;
    Ok(())
}
