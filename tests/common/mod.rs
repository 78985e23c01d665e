#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use kline_backtester::domain::error::BacktestError;
use kline_backtester::domain::interval::BarInterval;
pub use kline_backtester::domain::ohlcv::{PriceBar, PriceSeries};
use kline_backtester::domain::pairs::Ticker;
use kline_backtester::ports::archive_port::ArchivePort;
use kline_backtester::ports::data_port::DataPort;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn start_time() -> NaiveDateTime {
    date(2025, 1, 1).and_hms_opt(0, 0, 0).unwrap()
}

/// Minute bars with open = high = low = close.
pub fn make_bars(closes: &[f64]) -> Vec<PriceBar> {
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PriceBar {
            timestamp: start_time() + Duration::minutes(i as i64),
            open: close,
            high: close,
            low: close,
            close,
            volume: 1.0,
        })
        .collect()
}

pub fn make_series(pair: &str, closes: &[f64]) -> PriceSeries {
    PriceSeries::new(pair, make_bars(closes)).unwrap()
}

/// `n` closes rising linearly from `from` to `to`.
pub fn linear(n: usize, from: f64, to: f64) -> Vec<f64> {
    let step = if n > 1 { (to - from) / (n - 1) as f64 } else { 0.0 };
    (0..n).map(|i| from + step * i as f64).collect()
}

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, pair: &str, closes: &[f64]) -> Self {
        self.data.insert(pair.to_string(), make_bars(closes));
        self
    }

    pub fn with_error(mut self, pair: &str, reason: &str) -> Self {
        self.errors.insert(pair.to_string(), reason.to_string());
        self
    }
}

impl DataPort for MockDataPort {
    fn load_series(
        &self,
        pair: &str,
        _interval: BarInterval,
        _start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<PriceSeries, BacktestError> {
        if let Some(reason) = self.errors.get(pair) {
            return Err(BacktestError::Cache {
                reason: reason.clone(),
            });
        }
        let bars = self.data.get(pair).cloned().unwrap_or_default();
        PriceSeries::new(pair, bars)
    }

    fn list_pairs(&self) -> Result<Vec<String>, BacktestError> {
        let mut pairs: Vec<String> = self.data.keys().cloned().collect();
        pairs.sort();
        Ok(pairs)
    }

    fn get_data_range(
        &self,
        pair: &str,
        _interval: BarInterval,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError> {
        Ok(self.data.get(pair).and_then(|bars| {
            let first = bars.first()?.timestamp.date();
            let last = bars.last()?.timestamp.date();
            Some((first, last, bars.len()))
        }))
    }
}

/// Archive that serves one flat bar per requested day and counts requests.
#[derive(Default)]
pub struct MockArchive {
    pub missing: HashSet<(String, NaiveDate)>,
    pub tickers: Vec<Ticker>,
    pub calls: Mutex<Vec<(String, NaiveDate)>>,
}

impl MockArchive {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ArchivePort for MockArchive {
    fn fetch_day(
        &self,
        pair: &str,
        _interval: BarInterval,
        date: NaiveDate,
    ) -> Result<Vec<PriceBar>, BacktestError> {
        self.calls.lock().unwrap().push((pair.to_string(), date));
        if self.missing.contains(&(pair.to_string(), date)) {
            return Err(BacktestError::Fetch {
                pair: pair.to_string(),
                date,
                reason: "HTTP 404".into(),
            });
        }
        Ok((0..3)
            .map(|m| PriceBar {
                timestamp: date.and_hms_opt(0, m, 0).unwrap(),
                open: 0.05,
                high: 0.05,
                low: 0.05,
                close: 0.05,
                volume: 10.0,
            })
            .collect())
    }

    fn fetch_tickers(&self) -> Result<Vec<Ticker>, BacktestError> {
        Ok(self.tickers.clone())
    }
}
