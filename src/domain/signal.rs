//! Entry/exit signal series aligned with a price series.

use super::error::BacktestError;

/// Boolean signals, index-for-index with the bars they were derived from.
/// Crossover strategies leave the short side all-false.
#[derive(Debug, Clone, PartialEq)]
pub struct SignalSeries {
    pub entries: Vec<bool>,
    pub exits: Vec<bool>,
    pub short_entries: Vec<bool>,
    pub short_exits: Vec<bool>,
}

impl SignalSeries {
    pub fn long_only(entries: Vec<bool>, exits: Vec<bool>) -> Self {
        let len = entries.len();
        Self {
            entries,
            exits,
            short_entries: vec![false; len],
            short_exits: vec![false; len],
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.iter().filter(|&&e| e).count()
    }

    pub fn exit_count(&self) -> usize {
        self.exits.iter().filter(|&&e| e).count()
    }

    /// Check that all four vectors have `expected` elements.
    pub fn ensure_aligned(&self, expected: usize) -> Result<(), BacktestError> {
        let lens = [
            ("entries", self.entries.len()),
            ("exits", self.exits.len()),
            ("short_entries", self.short_entries.len()),
            ("short_exits", self.short_exits.len()),
        ];
        for (name, len) in lens {
            if len != expected {
                return Err(BacktestError::SimulationFailure {
                    reason: format!("{name} has {len} signals for {expected} bars"),
                });
            }
        }
        Ok(())
    }
}
