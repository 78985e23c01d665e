//! On-disk kline cache: one CSV file per (pair, interval, day).
//!
//! Layout is `{root}/{PAIR}/{PAIR}-{interval}-{YYYY-MM-DD}.csv` with header
//! `timestamp,open,high,low,close,volume`. Files are written to a sibling
//! `.tmp` path and renamed into place, so a reader sees either the whole day
//! or nothing.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::domain::download::dates_between;
use crate::domain::error::BacktestError;
use crate::domain::interval::BarInterval;
use crate::domain::ohlcv::{PriceBar, PriceSeries};
use crate::ports::cache_port::CachePort;
use crate::ports::data_port::DataPort;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

#[derive(Debug, Serialize, Deserialize)]
struct CacheRow {
    timestamp: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
}

impl From<&PriceBar> for CacheRow {
    fn from(bar: &PriceBar) -> Self {
        CacheRow {
            timestamp: bar.timestamp.format(TIMESTAMP_FORMAT).to_string(),
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
            volume: bar.volume,
        }
    }
}

impl CacheRow {
    fn into_bar(self, path: &Path) -> Result<PriceBar, BacktestError> {
        let timestamp = NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| BacktestError::Cache {
                reason: format!("{}: bad timestamp '{}': {e}", path.display(), self.timestamp),
            })?;
        Ok(PriceBar {
            timestamp,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
        })
    }
}

pub struct KlineCache {
    root: PathBuf,
}

impl KlineCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_prefix(pair: &str, interval: BarInterval) -> String {
        format!("{pair}-{interval}-")
    }

    pub fn day_path(&self, pair: &str, interval: BarInterval, date: NaiveDate) -> PathBuf {
        self.root
            .join(pair)
            .join(format!("{}{}.csv", Self::file_prefix(pair, interval), date.format("%Y-%m-%d")))
    }

    fn read_day(&self, path: &Path) -> Result<Vec<PriceBar>, BacktestError> {
        let mut reader = csv::Reader::from_path(path).map_err(|e| BacktestError::Cache {
            reason: format!("failed to open {}: {e}", path.display()),
        })?;
        reader
            .deserialize::<CacheRow>()
            .map(|row| {
                let row = row.map_err(|e| BacktestError::Cache {
                    reason: format!("{}: {e}", path.display()),
                })?;
                row.into_bar(path)
            })
            .collect()
    }

    /// Cached days for one pair and interval, sorted.
    fn cached_days(&self, pair: &str, interval: BarInterval) -> Result<Vec<NaiveDate>, BacktestError> {
        let dir = self.root.join(pair);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let prefix = Self::file_prefix(pair, interval);
        let mut days = Vec::new();
        for entry in fs::read_dir(&dir)? {
            let name = entry?.file_name();
            let name = name.to_string_lossy();
            let date = name
                .strip_prefix(&prefix)
                .and_then(|rest| rest.strip_suffix(".csv"))
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok());
            if let Some(date) = date {
                days.push(date);
            }
        }
        days.sort();
        Ok(days)
    }
}

impl CachePort for KlineCache {
    fn has_day(&self, pair: &str, interval: BarInterval, date: NaiveDate) -> bool {
        self.day_path(pair, interval, date).is_file()
    }

    fn write_day(
        &self,
        pair: &str,
        interval: BarInterval,
        date: NaiveDate,
        bars: &[PriceBar],
    ) -> Result<(), BacktestError> {
        let path = self.day_path(pair, interval, date);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("csv.tmp");

        let written = (|| -> Result<(), BacktestError> {
            let mut writer = csv::Writer::from_path(&tmp).map_err(|e| BacktestError::Cache {
                reason: format!("failed to create {}: {e}", tmp.display()),
            })?;
            for bar in bars {
                writer
                    .serialize(CacheRow::from(bar))
                    .map_err(|e| BacktestError::Cache {
                        reason: format!("failed to write {}: {e}", tmp.display()),
                    })?;
            }
            writer.flush()?;
            Ok(())
        })();

        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, &path)?;
        debug!(path = %path.display(), bars = bars.len(), "cached day");
        Ok(())
    }
}

impl DataPort for KlineCache {
    fn load_series(
        &self,
        pair: &str,
        interval: BarInterval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, BacktestError> {
        let mut bars = Vec::new();
        for date in dates_between(start, end) {
            let path = self.day_path(pair, interval, date);
            if !path.is_file() {
                continue;
            }
            match self.read_day(&path) {
                Ok(day) => bars.extend(day),
                Err(e) => warn!(path = %path.display(), error = %e, "skipping unreadable cache day"),
            }
        }
        Ok(PriceSeries::from_unsorted(pair, bars))
    }

    fn list_pairs(&self) -> Result<Vec<String>, BacktestError> {
        if !self.root.is_dir() {
            return Ok(Vec::new());
        }
        let mut pairs = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if entry.file_type()?.is_dir() {
                pairs.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        pairs.sort();
        Ok(pairs)
    }

    fn get_data_range(
        &self,
        pair: &str,
        interval: BarInterval,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError> {
        let days = self.cached_days(pair, interval)?;
        Ok(match (days.first(), days.last()) {
            (Some(&first), Some(&last)) => Some((first, last, days.len())),
            _ => None,
        })
    }
}
