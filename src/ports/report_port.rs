//! Report generation port.

use std::path::{Path, PathBuf};

use crate::domain::error::BacktestError;
use crate::domain::table::{Heatmap, MetricsTable, RunResult};

/// Port for persisting the metrics table and rendering its charts.
pub trait ReportPort {
    fn write_table(&self, table: &MetricsTable, output_dir: &Path) -> Result<PathBuf, BacktestError>;

    /// Equity chart for one run. Failed runs have nothing to draw and yield `None`.
    fn write_equity(
        &self,
        row: &RunResult,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>, BacktestError>;

    fn write_heatmap(&self, heatmap: &Heatmap, output_dir: &Path)
    -> Result<PathBuf, BacktestError>;

    /// Table, one chart per succeeded run, then the heatmap.
    fn write_all(
        &self,
        table: &MetricsTable,
        output_dir: &Path,
    ) -> Result<Vec<PathBuf>, BacktestError> {
        let mut written = vec![self.write_table(table, output_dir)?];
        for row in table.rows() {
            if let Some(path) = self.write_equity(row, output_dir)? {
                written.push(path);
            }
        }
        written.push(self.write_heatmap(&table.heatmap(), output_dir)?);
        Ok(written)
    }
}
