//! File report writer: `metrics.csv`, per-run equity charts and the heatmap.
//!
//! Output layout under the chosen directory:
//! `metrics.csv`, `equity/{strategy}_{pair}.svg` and `heatmap.svg`.

pub mod chart_svg;
pub mod heatmap_svg;
pub mod tables;

use std::fs;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::domain::error::BacktestError;
use crate::domain::table::{Heatmap, MetricsTable, RunResult};
use crate::ports::report_port::ReportPort;

pub struct SvgReportAdapter;

impl SvgReportAdapter {
    pub fn new() -> Self {
        Self
    }

    fn write_file(path: &Path, content: &str) -> Result<(), BacktestError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content).map_err(|e| BacktestError::Report {
            reason: format!("failed to write {}: {e}", path.display()),
        })
    }
}

impl Default for SvgReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for SvgReportAdapter {
    fn write_table(&self, table: &MetricsTable, output_dir: &Path) -> Result<PathBuf, BacktestError> {
        fs::create_dir_all(output_dir)?;
        let path = output_dir.join("metrics.csv");
        tables::write_metrics_csv(table, &path)?;
        info!(path = %path.display(), rows = table.len(), "wrote metrics table");
        Ok(path)
    }

    fn write_equity(
        &self,
        row: &RunResult,
        output_dir: &Path,
    ) -> Result<Option<PathBuf>, BacktestError> {
        let Some(equity) = row.equity().filter(|e| !e.is_empty()) else {
            return Ok(None);
        };
        let title = format!("{} {}", row.strategy(), row.pair());
        let path = output_dir
            .join("equity")
            .join(format!("{}_{}.svg", row.strategy(), row.pair()));
        Self::write_file(&path, &chart_svg::generate_equity_svg(&title, equity))?;
        Ok(Some(path))
    }

    fn write_heatmap(&self, heatmap: &Heatmap, output_dir: &Path) -> Result<PathBuf, BacktestError> {
        let path = output_dir.join("heatmap.svg");
        Self::write_file(&path, &heatmap_svg::generate_heatmap_svg(heatmap))?;
        info!(path = %path.display(), cells = heatmap.cell_count(), "wrote heatmap");
        Ok(path)
    }
}
