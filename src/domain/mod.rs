//! Core domain types and logic.

pub mod aggregator;
pub mod backtest;
pub mod config_validation;
pub mod download;
pub mod error;
pub mod execution;
pub mod indicator;
pub mod indicator_helpers;
pub mod interval;
pub mod metrics;
pub mod ohlcv;
pub mod pairs;
pub mod portfolio;
pub mod position;
pub mod signal;
pub mod simulator;
pub mod strategy;
pub mod table;
