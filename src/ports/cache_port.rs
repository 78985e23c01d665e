//! Local per-day kline cache port.

use chrono::NaiveDate;

use crate::domain::error::BacktestError;
use crate::domain::interval::BarInterval;
use crate::domain::ohlcv::PriceBar;

pub trait CachePort: Sync {
    fn has_day(&self, pair: &str, interval: BarInterval, date: NaiveDate) -> bool;

    /// Persist one day of bars. Must leave either the complete file or no
    /// file behind.
    fn write_day(
        &self,
        pair: &str,
        interval: BarInterval,
        date: NaiveDate,
        bars: &[PriceBar],
    ) -> Result<(), BacktestError>;
}
