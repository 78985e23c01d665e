//! Shared helpers for indicator calculations and signal derivation.

use crate::domain::indicator::{IndicatorPoint, IndicatorSeries, IndicatorType, IndicatorValue};
use crate::domain::ohlcv::PriceBar;

/// Average True Range with Wilder smoothing. The first bar's true range is
/// high - low; the seed at index period-1 is the plain mean of the first
/// `period` true ranges.
pub fn calc_atr(bars: &[PriceBar], period: usize) -> IndicatorSeries {
    let mut values: Vec<IndicatorPoint> = Vec::with_capacity(bars.len());
    let mut atr = 0.0;
    let mut tr_sum = 0.0;

    for (i, bar) in bars.iter().enumerate() {
        let tr = if i == 0 {
            bar.high - bar.low
        } else {
            bar.true_range(bars[i - 1].close)
        };

        let valid = period > 0 && i + 1 >= period;
        if !valid {
            tr_sum += tr;
        } else if i + 1 == period {
            atr = (tr_sum + tr) / period as f64;
        } else {
            atr = (atr * (period - 1) as f64 + tr) / period as f64;
        }

        values.push(IndicatorPoint {
            timestamp: bar.timestamp,
            valid,
            value: IndicatorValue::Simple(if valid { atr } else { 0.0 }),
        });
    }

    IndicatorSeries {
        indicator_type: IndicatorType::Atr(period),
        values,
    }
}

/// Trailing mean over `window` values. A point is defined only when every
/// value in its window is defined.
pub fn rolling_mean(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(values.len());
    let mut sum = 0.0;
    let mut run = 0usize;

    for (i, value) in values.iter().enumerate() {
        match value {
            Some(v) => {
                sum += v;
                run += 1;
            }
            None => {
                sum = 0.0;
                run = 0;
            }
        }
        if window > 0 && run > window {
            if let Some(old) = values[i - window] {
                sum -= old;
            }
            run = window;
        }
        out.push(if window > 0 && run == window {
            Some(sum / window as f64)
        } else {
            None
        });
    }

    out
}

/// Crossing signals between a fast and a slow line.
///
/// The state on each bar is `fast > slow`, and counts as false while either
/// line is undefined. Entries fire when the state turns true, exits when it
/// turns false, so the two strictly alternate starting with an entry.
pub fn crossings(fast: &[Option<f64>], slow: &[Option<f64>]) -> (Vec<bool>, Vec<bool>) {
    let mut entries = vec![false; fast.len()];
    let mut exits = vec![false; fast.len()];
    let mut prev_above = false;

    for (i, (f, s)) in fast.iter().zip(slow).enumerate() {
        let above = matches!((f, s), (Some(f), Some(s)) if f > s);
        let defined = f.is_some() && s.is_some();
        if defined {
            entries[i] = above && !prev_above;
            exits[i] = !above && prev_above;
        }
        prev_above = above;
    }

    (entries, exits)
}

/// True where a series moves from below `level` to at-or-above it.
pub fn crossed_level_up(values: &[Option<f64>], level: f64) -> Vec<bool> {
    level_transitions(values, |prev, now| prev < level && now >= level)
}

/// True where a series moves from above `level` to at-or-below it.
pub fn crossed_level_down(values: &[Option<f64>], level: f64) -> Vec<bool> {
    level_transitions(values, |prev, now| prev > level && now <= level)
}

fn level_transitions(values: &[Option<f64>], crossed: impl Fn(f64, f64) -> bool) -> Vec<bool> {
    let mut out = vec![false; values.len()];
    for i in 1..values.len() {
        if let (Some(prev), Some(now)) = (values[i - 1], values[i]) {
            out[i] = crossed(prev, now);
        }
    }
    out
}
