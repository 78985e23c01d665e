//! Port traits between the domain and its adapters.

pub mod archive_port;
pub mod cache_port;
pub mod config_port;
pub mod data_port;
pub mod report_port;
