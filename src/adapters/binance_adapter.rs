//! Binance public data adapter: daily kline archives and the 24h ticker list.
//!
//! Archives live at `{base_url}/{PAIR}/{interval}/{PAIR}-{interval}-{date}.zip`
//! and hold a single headerless CSV whose first six columns are open time,
//! open, high, low, close and volume. Open times are epoch milliseconds in
//! older files and epoch microseconds in newer ones.

use std::io::{Cursor, Read};
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use tracing::debug;

use crate::domain::error::BacktestError;
use crate::domain::interval::BarInterval;
use crate::domain::ohlcv::PriceBar;
use crate::domain::pairs::Ticker;
use crate::ports::archive_port::ArchivePort;

/// Open times above this are microseconds.
const MICROS_THRESHOLD: i64 = 100_000_000_000_000;

#[derive(Debug, Deserialize)]
struct RawTicker {
    symbol: String,
    #[serde(rename = "quoteVolume")]
    quote_volume: String,
}

pub struct BinanceAdapter {
    client: reqwest::blocking::Client,
    base_url: String,
    api_url: String,
}

impl BinanceAdapter {
    pub fn new(base_url: &str, api_url: &str, timeout_secs: u64) -> Result<Self, BacktestError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs.max(1)))
            .user_agent(concat!("kline-backtester/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BacktestError::Archive {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn archive_url(&self, pair: &str, interval: BarInterval, date: NaiveDate) -> String {
        format!(
            "{base}/{pair}/{interval}/{pair}-{interval}-{date}.zip",
            base = self.base_url,
            date = date.format("%Y-%m-%d")
        )
    }

    pub fn ticker_url(&self) -> String {
        format!("{}/api/v3/ticker/24hr", self.api_url)
    }
}

impl ArchivePort for BinanceAdapter {
    fn fetch_day(
        &self,
        pair: &str,
        interval: BarInterval,
        date: NaiveDate,
    ) -> Result<Vec<PriceBar>, BacktestError> {
        let fetch_err = |reason: String| BacktestError::Fetch {
            pair: pair.to_string(),
            date,
            reason,
        };
        let url = self.archive_url(pair, interval, date);
        debug!(%url, "fetching archive");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {}", status.as_u16())));
        }
        let body = response.bytes().map_err(|e| fetch_err(e.to_string()))?;
        parse_archive(&body).map_err(|e| fetch_err(e.to_string()))
    }

    fn fetch_tickers(&self) -> Result<Vec<Ticker>, BacktestError> {
        let url = self.ticker_url();
        debug!(%url, "fetching tickers");
        let archive_err = |e: reqwest::Error| BacktestError::Archive {
            reason: format!("ticker request failed: {e}"),
        };

        let raw: Vec<RawTicker> = self
            .client
            .get(&url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(archive_err)?
            .json()
            .map_err(archive_err)?;

        Ok(raw
            .into_iter()
            .map(|t| Ticker {
                quote_volume: t.quote_volume.parse().unwrap_or(f64::NAN),
                symbol: t.symbol,
            })
            .collect())
    }
}

/// Decode the first CSV entry of a kline zip archive.
pub fn parse_archive(bytes: &[u8]) -> Result<Vec<PriceBar>, BacktestError> {
    let archive_err = |reason: String| BacktestError::Archive { reason };

    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| archive_err(e.to_string()))?;
    if archive.is_empty() {
        return Err(archive_err("zip archive has no entries".into()));
    }
    let mut content = String::new();
    archive
        .by_index(0)
        .map_err(|e| archive_err(e.to_string()))?
        .read_to_string(&mut content)?;

    parse_klines_csv(&content)
}

/// Parse Binance kline rows. A leading header row is tolerated.
pub fn parse_klines_csv(content: &str) -> Result<Vec<PriceBar>, BacktestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut bars = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| BacktestError::Archive {
            reason: format!("malformed kline row {}: {e}", line + 1),
        })?;
        let field = |i: usize| record.get(i).map(str::trim).unwrap_or("");

        let open_time: i64 = match field(0).parse() {
            Ok(t) => t,
            Err(_) if line == 0 => continue,
            Err(_) => {
                return Err(BacktestError::Archive {
                    reason: format!("bad open time '{}' on row {}", field(0), line + 1),
                });
            }
        };
        let number = |i: usize, name: &str| -> Result<f64, BacktestError> {
            field(i).parse().map_err(|_| BacktestError::Archive {
                reason: format!("bad {name} '{}' on row {}", field(i), line + 1),
            })
        };

        bars.push(PriceBar {
            timestamp: open_time_to_datetime(open_time)?,
            open: number(1, "open")?,
            high: number(2, "high")?,
            low: number(3, "low")?,
            close: number(4, "close")?,
            volume: number(5, "volume")?,
        });
    }
    Ok(bars)
}

fn open_time_to_datetime(open_time: i64) -> Result<NaiveDateTime, BacktestError> {
    let converted = if open_time > MICROS_THRESHOLD {
        DateTime::from_timestamp_micros(open_time)
    } else {
        DateTime::from_timestamp_millis(open_time)
    };
    converted
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| BacktestError::Archive {
            reason: format!("open time {open_time} out of range"),
        })
}
