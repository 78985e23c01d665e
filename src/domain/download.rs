//! Download orchestration: fan (pair, date) fetches out over a bounded pool
//! and write each day to the cache.
//!
//! Days already cached are skipped without touching the archive. A failed
//! fetch is logged and that day is left out; there are no retries.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDate;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use super::error::BacktestError;
use super::interval::BarInterval;
use crate::ports::archive_port::ArchivePort;
use crate::ports::cache_port::CachePort;

/// Every calendar day from `start` to `end` inclusive.
pub fn dates_between(start: NaiveDate, end: NaiveDate) -> Vec<NaiveDate> {
    start.iter_days().take_while(|d| *d <= end).collect()
}

#[derive(Debug, Clone, PartialEq)]
enum DayOutcome {
    Cached,
    Downloaded { bars: usize },
    Failed { reason: String },
    Cancelled,
}

/// Totals for one download batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DownloadSummary {
    pub total: usize,
    pub downloaded: usize,
    pub cached: usize,
    pub bars: usize,
    pub failed: Vec<(String, NaiveDate, String)>,
    pub cancelled: usize,
}

impl DownloadSummary {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty() && self.cancelled == 0
    }
}

/// Fetch every (pair, day) in range that the cache does not already hold.
#[allow(clippy::too_many_arguments)]
pub fn download_range(
    archive: &dyn ArchivePort,
    cache: &dyn CachePort,
    pairs: &[String],
    interval: BarInterval,
    start: NaiveDate,
    end: NaiveDate,
    max_concurrency: usize,
    cancel: Option<&AtomicBool>,
) -> Result<DownloadSummary, BacktestError> {
    if start > end {
        return Err(BacktestError::ConfigInvalid {
            section: "data".into(),
            key: "start_date".into(),
            reason: format!("{start} is after end date {end}"),
        });
    }

    let days = dates_between(start, end);
    let units: Vec<(&str, NaiveDate)> = pairs
        .iter()
        .flat_map(|pair| days.iter().map(move |&d| (pair.as_str(), d)))
        .collect();
    info!(
        pairs = pairs.len(),
        days = days.len(),
        %interval,
        workers = max_concurrency,
        "starting download"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(max_concurrency.max(1))
        .thread_name(|i| format!("download-{i}"))
        .build()
        .map_err(|e| BacktestError::RunFailure {
            reason: format!("failed to build download pool: {e}"),
        })?;

    let outcomes: Vec<DayOutcome> = pool.install(|| {
        units
            .par_iter()
            .map(|&(pair, date)| {
                if cancel.is_some_and(|c| c.load(Ordering::Relaxed)) {
                    return DayOutcome::Cancelled;
                }
                fetch_day(archive, cache, pair, interval, date)
            })
            .collect()
    });

    let mut summary = DownloadSummary {
        total: units.len(),
        ..Default::default()
    };
    for (&(pair, date), outcome) in units.iter().zip(outcomes) {
        match outcome {
            DayOutcome::Cached => summary.cached += 1,
            DayOutcome::Downloaded { bars } => {
                summary.downloaded += 1;
                summary.bars += bars;
            }
            DayOutcome::Failed { reason } => summary.failed.push((pair.to_string(), date, reason)),
            DayOutcome::Cancelled => summary.cancelled += 1,
        }
    }

    info!(
        total = summary.total,
        downloaded = summary.downloaded,
        cached = summary.cached,
        failed = summary.failed.len(),
        cancelled = summary.cancelled,
        "download finished"
    );
    Ok(summary)
}

fn fetch_day(
    archive: &dyn ArchivePort,
    cache: &dyn CachePort,
    pair: &str,
    interval: BarInterval,
    date: NaiveDate,
) -> DayOutcome {
    if cache.has_day(pair, interval, date) {
        debug!(pair, %date, "already cached");
        return DayOutcome::Cached;
    }

    let result = archive
        .fetch_day(pair, interval, date)
        .and_then(|bars| {
            if bars.is_empty() {
                return Err(BacktestError::Fetch {
                    pair: pair.to_string(),
                    date,
                    reason: "archive holds no bars".into(),
                });
            }
            cache.write_day(pair, interval, date, &bars)?;
            Ok(bars.len())
        });

    match result {
        Ok(bars) => {
            debug!(pair, %date, bars, "downloaded");
            DayOutcome::Downloaded { bars }
        }
        Err(e) => {
            warn!(pair, %date, error = %e, "skipping day");
            DayOutcome::Failed {
                reason: e.to_string(),
            }
        }
    }
}
