//! Price bar and per-pair price series.

use chrono::NaiveDateTime;

use super::error::BacktestError;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl PriceBar {
    /// max(high - low, |high - prev_close|, |low - prev_close|)
    pub fn true_range(&self, prev_close: f64) -> f64 {
        let hl = self.high - self.low;
        let hc = (self.high - prev_close).abs();
        let lc = (self.low - prev_close).abs();
        hl.max(hc).max(lc)
    }
}

/// Ordered bars for one trading pair. Timestamps are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pair: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series from bars that must already be strictly increasing in time.
    pub fn new(pair: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, BacktestError> {
        let pair = pair.into();
        if let Some(i) = bars
            .windows(2)
            .position(|w| w[1].timestamp <= w[0].timestamp)
        {
            return Err(BacktestError::InvalidSeries {
                reason: format!(
                    "timestamp {} at index {} does not follow {}",
                    bars[i + 1].timestamp,
                    i + 1,
                    bars[i].timestamp
                ),
                pair,
            });
        }
        Ok(Self { pair, bars })
    }

    /// Sort by timestamp and drop repeated timestamps, keeping the first bar seen.
    pub fn from_unsorted(pair: impl Into<String>, mut bars: Vec<PriceBar>) -> Self {
        bars.sort_by_key(|b| b.timestamp);
        bars.dedup_by_key(|b| b.timestamp);
        Self {
            pair: pair.into(),
            bars,
        }
    }

    pub fn pair(&self) -> &str {
        &self.pair
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.first().map(|b| b.timestamp)
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.bars.last().map(|b| b.timestamp)
    }

    /// Fail with `InsufficientData` unless the series holds at least `minimum` bars.
    pub fn require(&self, minimum: usize) -> Result<(), BacktestError> {
        if self.bars.len() < minimum {
            return Err(BacktestError::InsufficientData {
                pair: self.pair.clone(),
                bars: self.bars.len(),
                minimum,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn ts(minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 2, 1)
            .unwrap()
            .and_hms_opt(0, minute, 0)
            .unwrap()
    }

    fn bar(minute: u32, close: f64) -> PriceBar {
        PriceBar {
            timestamp: ts(minute),
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 10.0,
        }
    }

    fn sample_bar() -> PriceBar {
        PriceBar {
            timestamp: ts(0),
            open: 100.0,
            high: 110.0,
            low: 90.0,
            close: 105.0,
            volume: 50_000.0,
        }
    }

    #[test]
    fn true_range_hl_dominates() {
        let bar = sample_bar();
        // high-low=20, |high-100|=10, |low-100|=10 → 20
        assert!((bar.true_range(100.0) - 20.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_up() {
        let bar = sample_bar();
        // high-low=20, |110-70|=40, |90-70|=20 → 40
        assert!((bar.true_range(70.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn true_range_gap_down() {
        let bar = sample_bar();
        assert!((bar.true_range(130.0) - 40.0).abs() < f64::EPSILON);
    }

    #[test]
    fn new_accepts_increasing_timestamps() {
        let series = PriceSeries::new("ETHBTC", vec![bar(0, 1.0), bar(1, 2.0), bar(5, 3.0)]).unwrap();
        assert_eq!(series.len(), 3);
        assert_eq!(series.pair(), "ETHBTC");
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn new_rejects_duplicate_timestamp() {
        let err = PriceSeries::new("ETHBTC", vec![bar(0, 1.0), bar(0, 2.0)]).unwrap_err();
        assert!(matches!(err, BacktestError::InvalidSeries { .. }));
    }

    #[test]
    fn new_rejects_out_of_order() {
        let err = PriceSeries::new("ETHBTC", vec![bar(3, 1.0), bar(1, 2.0)]).unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn from_unsorted_sorts_and_dedups() {
        let series = PriceSeries::from_unsorted(
            "ETHBTC",
            vec![bar(2, 3.0), bar(0, 1.0), bar(2, 9.0), bar(1, 2.0)],
        );
        assert_eq!(series.closes(), vec![1.0, 2.0, 3.0]);
        assert_eq!(series.first_timestamp(), Some(ts(0)));
        assert_eq!(series.last_timestamp(), Some(ts(2)));
    }

    #[test]
    fn require_reports_bar_counts() {
        let series = PriceSeries::new("ETHBTC", vec![bar(0, 1.0)]).unwrap();
        assert!(series.require(1).is_ok());
        match series.require(5) {
            Err(BacktestError::InsufficientData { bars, minimum, .. }) => {
                assert_eq!(bars, 1);
                assert_eq!(minimum, 5);
            }
            other => panic!("expected InsufficientData, got {other:?}"),
        }
    }
}
