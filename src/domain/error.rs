//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for kline-backtester.
#[derive(Debug, thiserror::Error)]
pub enum BacktestError {
    #[error("insufficient data for {pair}: have {bars} bars, need {minimum}")]
    InsufficientData {
        pair: String,
        bars: usize,
        minimum: usize,
    },

    #[error("simulation failed: {reason}")]
    SimulationFailure { reason: String },

    #[error("run failed: {reason}")]
    RunFailure { reason: String },

    #[error("invalid price series for {pair}: {reason}")]
    InvalidSeries { pair: String, reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("failed to fetch {pair} for {date}: {reason}")]
    Fetch {
        pair: String,
        date: NaiveDate,
        reason: String,
    },

    #[error("archive error: {reason}")]
    Archive { reason: String },

    #[error("cache error: {reason}")]
    Cache { reason: String },

    #[error("report error: {reason}")]
    Report { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BacktestError {
    /// Short, stable name of the error kind, used in the metrics table.
    pub fn kind(&self) -> &'static str {
        match self {
            BacktestError::InsufficientData { .. } => "InsufficientData",
            BacktestError::SimulationFailure { .. } => "SimulationFailure",
            BacktestError::InvalidSeries { .. } => "InvalidSeries",
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => "Config",
            BacktestError::Fetch { .. } | BacktestError::Archive { .. } => "DataAcquisition",
            BacktestError::Cache { .. } => "Cache",
            BacktestError::Report { .. } => "Report",
            BacktestError::RunFailure { .. } | BacktestError::Io(_) => "RunFailure",
        }
    }
}

impl From<&BacktestError> for std::process::ExitCode {
    fn from(err: &BacktestError) -> Self {
        let code: u8 = match err {
            BacktestError::Io(_) | BacktestError::Report { .. } => 1,
            BacktestError::ConfigParse { .. }
            | BacktestError::ConfigMissing { .. }
            | BacktestError::ConfigInvalid { .. } => 2,
            BacktestError::Fetch { .. }
            | BacktestError::Archive { .. }
            | BacktestError::Cache { .. } => 3,
            BacktestError::InsufficientData { .. } | BacktestError::InvalidSeries { .. } => 5,
            BacktestError::SimulationFailure { .. } | BacktestError::RunFailure { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}
