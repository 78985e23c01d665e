//! Remote kline archive port.

use chrono::NaiveDate;

use crate::domain::error::BacktestError;
use crate::domain::interval::BarInterval;
use crate::domain::ohlcv::PriceBar;
use crate::domain::pairs::Ticker;

/// Provider of daily kline archives and the 24h ticker list. Shared across
/// download workers, hence `Sync`.
pub trait ArchivePort: Sync {
    fn fetch_day(
        &self,
        pair: &str,
        interval: BarInterval,
        date: NaiveDate,
    ) -> Result<Vec<PriceBar>, BacktestError>;

    fn fetch_tickers(&self) -> Result<Vec<Ticker>, BacktestError>;
}
