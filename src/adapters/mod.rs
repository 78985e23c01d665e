//! Concrete adapter implementations for ports.

pub mod binance_adapter;
pub mod file_config_adapter;
pub mod kline_cache;
pub mod svg_report;
