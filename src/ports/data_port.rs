//! Price data source port.

use chrono::NaiveDate;

use crate::domain::error::BacktestError;
use crate::domain::interval::BarInterval;
use crate::domain::ohlcv::PriceSeries;

pub trait DataPort {
    /// Bars for `pair` between `start` and `end` inclusive. Days with no data
    /// are simply absent; a pair with no data at all yields an empty series.
    fn load_series(
        &self,
        pair: &str,
        interval: BarInterval,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, BacktestError>;

    fn list_pairs(&self) -> Result<Vec<String>, BacktestError>;

    /// First day, last day and number of days held for `pair`, if any.
    fn get_data_range(
        &self,
        pair: &str,
        interval: BarInterval,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, BacktestError>;
}
