//! Technical indicator implementations.
//!
//! This module provides types for representing indicator values and series:
//! - `IndicatorPoint`: A single point in an indicator time series
//! - `IndicatorValue`: Enum for different indicator output shapes
//! - `IndicatorType`: Enum for indicator identity + parameters
//! - `IndicatorSeries`: A time series of indicator values, aligned with its bars
//!
//! Every indicator uses a trailing window: the value at index `i` depends only
//! on bars `0..=i`.

pub mod bollinger;
pub mod ema;
pub mod rsi;
pub mod sma;

use chrono::NaiveDateTime;
use std::fmt;

#[derive(Debug, Clone)]
pub struct IndicatorPoint {
    pub timestamp: NaiveDateTime,
    pub valid: bool,
    pub value: IndicatorValue,
}

#[derive(Debug, Clone)]
pub enum IndicatorValue {
    Simple(f64),
    Bollinger { upper: f64, middle: f64, lower: f64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndicatorType {
    Sma(usize),
    Ema(usize),
    Rsi(usize),
    Atr(usize),
    Bollinger {
        period: usize,
        stddev_mult_x100: u32,
    },
}

#[derive(Debug, Clone)]
pub struct IndicatorSeries {
    pub indicator_type: IndicatorType,
    pub values: Vec<IndicatorPoint>,
}

impl IndicatorSeries {
    /// Valid simple values as `Some`, warm-up (or non-simple) points as `None`.
    pub fn simple_values(&self) -> Vec<Option<f64>> {
        self.values
            .iter()
            .map(|p| match p.value {
                IndicatorValue::Simple(v) if p.valid => Some(v),
                _ => None,
            })
            .collect()
    }

    /// Valid bands as `Some((upper, middle, lower))`.
    pub fn band_values(&self) -> Vec<Option<(f64, f64, f64)>> {
        self.values
            .iter()
            .map(|p| match p.value {
                IndicatorValue::Bollinger {
                    upper,
                    middle,
                    lower,
                } if p.valid => Some((upper, middle, lower)),
                _ => None,
            })
            .collect()
    }
}

impl fmt::Display for IndicatorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorType::Sma(period) => write!(f, "SMA({})", period),
            IndicatorType::Ema(period) => write!(f, "EMA({})", period),
            IndicatorType::Rsi(period) => write!(f, "RSI({})", period),
            IndicatorType::Atr(period) => write!(f, "ATR({})", period),
            IndicatorType::Bollinger {
                period,
                stddev_mult_x100,
            } => {
                let mult = *stddev_mult_x100 as f64 / 100.0;
                write!(f, "BOLLINGER({},{})", period, mult)
            }
        }
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

    #[test]
    fn indicator_type_display_sma() {
        assert_eq!(IndicatorType::Sma(20).to_string(), "SMA(20)");
    }

    #[test]
    fn indicator_type_display_bollinger() {
        let boll = IndicatorType::Bollinger {
            period: 20,
            stddev_mult_x100: 150,
        };
        assert_eq!(boll.to_string(), "BOLLINGER(20,1.5)");
    }

    #[test]
    fn simple_values_hide_warmup() {
        let series = IndicatorSeries {
            indicator_type: IndicatorType::Sma(2),
            values: vec![
                IndicatorPoint {
                    timestamp: ts(0),
                    valid: false,
                    value: IndicatorValue::Simple(0.0),
                },
                IndicatorPoint {
                    timestamp: ts(1),
                    valid: true,
                    value: IndicatorValue::Simple(1.5),
                },
            ],
        };
        assert_eq!(series.simple_values(), vec![None, Some(1.5)]);
        assert_eq!(series.band_values(), vec![None, None]);
    }

    #[test]
    fn band_values_unpack_bollinger() {
        let series = IndicatorSeries {
            indicator_type: IndicatorType::Bollinger {
                period: 1,
                stddev_mult_x100: 200,
            },
            values: vec![IndicatorPoint {
                timestamp: ts(0),
                valid: true,
                value: IndicatorValue::Bollinger {
                    upper: 3.0,
                    middle: 2.0,
                    lower: 1.0,
                },
            }],
        };
        assert_eq!(series.band_values(), vec![Some((3.0, 2.0, 1.0))]);
    }
}
