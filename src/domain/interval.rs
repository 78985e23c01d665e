//! Kline bar intervals.

use std::fmt;
use std::str::FromStr;

const SECONDS_PER_YEAR: f64 = 365.0 * 86_400.0;

/// Bar length of a kline archive. Crypto markets trade around the clock, so
/// annualization uses a 365-day year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BarInterval {
    #[default]
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour1,
    Hour4,
    Day1,
}

impl BarInterval {
    pub fn as_str(&self) -> &'static str {
        match self {
            BarInterval::Minute1 => "1m",
            BarInterval::Minute5 => "5m",
            BarInterval::Minute15 => "15m",
            BarInterval::Minute30 => "30m",
            BarInterval::Hour1 => "1h",
            BarInterval::Hour4 => "4h",
            BarInterval::Day1 => "1d",
        }
    }

    pub fn seconds(&self) -> u32 {
        match self {
            BarInterval::Minute1 => 60,
            BarInterval::Minute5 => 300,
            BarInterval::Minute15 => 900,
            BarInterval::Minute30 => 1_800,
            BarInterval::Hour1 => 3_600,
            BarInterval::Hour4 => 14_400,
            BarInterval::Day1 => 86_400,
        }
    }

    pub fn bars_per_year(&self) -> f64 {
        SECONDS_PER_YEAR / self.seconds() as f64
    }
}

impl fmt::Display for BarInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown bar interval '{0}' (expected one of 1m, 5m, 15m, 30m, 1h, 4h, 1d)")]
pub struct UnknownInterval(pub String);

impl FromStr for BarInterval {
    type Err = UnknownInterval;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1m" => Ok(BarInterval::Minute1),
            "5m" => Ok(BarInterval::Minute5),
            "15m" => Ok(BarInterval::Minute15),
            "30m" => Ok(BarInterval::Minute30),
            "1h" => Ok(BarInterval::Hour1),
            "4h" => Ok(BarInterval::Hour4),
            "1d" => Ok(BarInterval::Day1),
            other => Err(UnknownInterval(other.to_string())),
        }
    }
}
