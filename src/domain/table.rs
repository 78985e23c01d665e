//! Run results, the aggregate metrics table and its heatmap pivot.

use std::collections::{BTreeMap, BTreeSet};

use super::error::BacktestError;
use super::metrics::RunMetrics;
use super::portfolio::EquityPoint;
use super::simulator::Simulation;

#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Succeeded {
        metrics: RunMetrics,
        equity: Vec<EquityPoint>,
    },
    Failed {
        kind: String,
        message: String,
    },
}

/// One (strategy, pair) evaluation. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct RunResult {
    strategy: String,
    pair: String,
    outcome: RunOutcome,
}

impl RunResult {
    pub fn succeeded(strategy: impl Into<String>, pair: impl Into<String>, sim: Simulation) -> Self {
        RunResult {
            strategy: strategy.into(),
            pair: pair.into(),
            outcome: RunOutcome::Succeeded {
                metrics: sim.metrics,
                equity: sim.equity_curve,
            },
        }
    }

    pub fn failed(
        strategy: impl Into<String>,
        pair: impl Into<String>,
        kind: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        RunResult {
            strategy: strategy.into(),
            pair: pair.into(),
            outcome: RunOutcome::Failed {
                kind: kind.into(),
                message: message.into(),
            },
        }
    }

    pub fn from_error(
        strategy: impl Into<String>,
        pair: impl Into<String>,
        err: &BacktestError,
    ) -> Self {
        RunResult::failed(strategy, pair, err.kind(), err.to_string())
    }

    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    pub fn outcome(&self) -> &RunOutcome {
        &self.outcome
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, RunOutcome::Succeeded { .. })
    }

    pub fn metrics(&self) -> Option<&RunMetrics> {
        match &self.outcome {
            RunOutcome::Succeeded { metrics, .. } => Some(metrics),
            RunOutcome::Failed { .. } => None,
        }
    }

    pub fn equity(&self) -> Option<&[EquityPoint]> {
        match &self.outcome {
            RunOutcome::Succeeded { equity, .. } => Some(equity),
            RunOutcome::Failed { .. } => None,
        }
    }

    /// "Kind: message" for failed rows.
    pub fn error(&self) -> Option<String> {
        match &self.outcome {
            RunOutcome::Failed { kind, message } => Some(format!("{kind}: {message}")),
            RunOutcome::Succeeded { .. } => None,
        }
    }

    /// Metric name to value; empty for failed rows.
    pub fn metric_map(&self) -> BTreeMap<&'static str, f64> {
        self.metrics()
            .map(|m| {
                RunMetrics::NAMES
                    .iter()
                    .filter_map(|&name| m.get(name).map(|v| (name, v)))
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Rows unique by (strategy, pair), in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsTable {
    rows: Vec<RunResult>,
}

impl MetricsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a row. Returns false, leaving the table unchanged, when a row
    /// for the same (strategy, pair) is already present.
    pub fn push(&mut self, row: RunResult) -> bool {
        if self.get(&row.strategy, &row.pair).is_some() {
            return false;
        }
        self.rows.push(row);
        true
    }

    pub fn get(&self, strategy: &str, pair: &str) -> Option<&RunResult> {
        self.rows
            .iter()
            .find(|r| r.strategy == strategy && r.pair == pair)
    }

    pub fn rows(&self) -> &[RunResult] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn succeeded_count(&self) -> usize {
        self.rows.iter().filter(|r| r.is_success()).count()
    }

    pub fn failed_count(&self) -> usize {
        self.len() - self.succeeded_count()
    }

    /// Pivot succeeded rows into pair x strategy mean total return.
    pub fn heatmap(&self) -> Heatmap {
        let mut sums: BTreeMap<(String, String), (f64, usize)> = BTreeMap::new();
        for row in &self.rows {
            if let Some(metrics) = row.metrics() {
                let cell = sums
                    .entry((row.pair.clone(), row.strategy.clone()))
                    .or_insert((0.0, 0));
                cell.0 += metrics.total_return;
                cell.1 += 1;
            }
        }

        let cells: BTreeMap<(String, String), f64> = sums
            .into_iter()
            .map(|(key, (sum, n))| (key, sum / n as f64))
            .collect();
        let pairs: BTreeSet<String> = cells.keys().map(|(p, _)| p.clone()).collect();
        let strategies: BTreeSet<String> = cells.keys().map(|(_, s)| s.clone()).collect();

        Heatmap {
            pairs: pairs.into_iter().collect(),
            strategies: strategies.into_iter().collect(),
            cells,
        }
    }
}

impl FromIterator<RunResult> for MetricsTable {
    fn from_iter<I: IntoIterator<Item = RunResult>>(iter: I) -> Self {
        let mut table = MetricsTable::new();
        for row in iter {
            table.push(row);
        }
        table
    }
}

/// Mean total return per (pair, strategy). Missing combinations have no cell.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Heatmap {
    pairs: Vec<String>,
    strategies: Vec<String>,
    cells: BTreeMap<(String, String), f64>,
}

impl Heatmap {
    /// Row labels, sorted.
    pub fn pairs(&self) -> &[String] {
        &self.pairs
    }

    /// Column labels, sorted.
    pub fn strategies(&self) -> &[String] {
        &self.strategies
    }

    pub fn get(&self, pair: &str, strategy: &str) -> Option<f64> {
        self.cells
            .get(&(pair.to_string(), strategy.to_string()))
            .copied()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// (min, max) over all cells.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        let mut values = self.cells.values().copied();
        let first = values.next()?;
        Some(values.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v))))
    }
}
