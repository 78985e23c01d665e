//! Configuration validation.
//!
//! Checks every value in `[data]`, `[backtest]` and the strategy sections
//! before any download or backtest starts. The typed readers here are shared
//! with the config builders so a value is parsed the same way everywhere.

use chrono::NaiveDate;

use crate::domain::error::BacktestError;
use crate::domain::interval::BarInterval;
use crate::domain::pairs::parse_pairs;
use crate::domain::simulator::Direction;
use crate::domain::strategy::{MaKind, Strategy};
use crate::ports::config_port::ConfigPort;

pub(crate) fn invalid(section: &str, key: &str, reason: impl Into<String>) -> BacktestError {
    BacktestError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn present(config: &dyn ConfigPort, section: &str, key: &str) -> Option<String> {
    config
        .get_string(section, key)
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

pub fn read_date(config: &dyn ConfigPort, section: &str, key: &str) -> Result<NaiveDate, BacktestError> {
    let raw = present(config, section, key).ok_or_else(|| BacktestError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })?;
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map_err(|_| invalid(section, key, format!("invalid {key} '{raw}', expected YYYY-MM-DD")))
}

pub fn read_f64(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: f64,
) -> Result<f64, BacktestError> {
    match present(config, section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| invalid(section, key, format!("'{raw}' is not a number"))),
    }
}

pub fn read_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, BacktestError> {
    match present(config, section, key) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<usize>()
            .map_err(|_| invalid(section, key, format!("'{raw}' is not a non-negative integer"))),
    }
}

/// A fraction that may be switched off with `none`, `off` or `0`.
pub fn read_optional_fraction(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: Option<f64>,
) -> Result<Option<f64>, BacktestError> {
    let Some(raw) = present(config, section, key) else {
        return Ok(default);
    };
    if matches!(raw.to_ascii_lowercase().as_str(), "none" | "off") {
        return Ok(None);
    }
    let value = read_f64(config, section, key, 0.0)?;
    if value == 0.0 {
        Ok(None)
    } else if value < 0.0 || value >= 1.0 {
        Err(invalid(section, key, format!("{key} must be in (0, 1), got {value}")))
    } else {
        Ok(Some(value))
    }
}

pub fn read_interval(config: &dyn ConfigPort) -> Result<BarInterval, BacktestError> {
    match present(config, "data", "interval") {
        None => Ok(BarInterval::default()),
        Some(raw) => raw
            .parse::<BarInterval>()
            .map_err(|e| invalid("data", "interval", e.to_string())),
    }
}

/// Strategy names selected in `[backtest] strategies`, all variants when unset.
pub fn read_strategy_names(config: &dyn ConfigPort) -> Result<Vec<String>, BacktestError> {
    let Some(raw) = present(config, "backtest", "strategies") else {
        return Ok(Strategy::NAMES.iter().map(|s| s.to_string()).collect());
    };

    let mut names = Vec::new();
    for token in raw.split(',') {
        let name = token.trim().to_ascii_lowercase();
        if !Strategy::NAMES.contains(&name.as_str()) {
            return Err(invalid(
                "backtest",
                "strategies",
                format!("unknown strategy '{name}' (expected one of {})", Strategy::NAMES.join(", ")),
            ));
        }
        if !names.contains(&name) {
            names.push(name);
        }
    }
    Ok(names)
}

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_data_config(config)?;
    validate_backtest_config(config)?;
    for name in read_strategy_names(config)? {
        validate_strategy_config(config, &name)?;
    }
    Ok(())
}

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_dates(config)?;
    validate_pairs(config)?;
    read_interval(config)?;
    validate_concurrency(config)?;
    validate_urls(config)?;
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    validate_initial_capital(config)?;
    let workers = read_usize(config, "backtest", "workers", 1)?;
    if workers == 0 {
        return Err(invalid("backtest", "workers", "workers must be at least 1"));
    }
    read_strategy_names(config)?;
    Ok(())
}

/// Cost, risk and parameter checks for one strategy section.
pub fn validate_strategy_config(config: &dyn ConfigPort, name: &str) -> Result<(), BacktestError> {
    let fee = read_f64(config, name, "fee_rate", 0.0)?;
    if fee < 0.0 {
        return Err(invalid(name, "fee_rate", "fee_rate must be non-negative"));
    }
    let slippage = read_f64(config, name, "slippage_rate", 0.0)?;
    if !(0.0..1.0).contains(&slippage) {
        return Err(invalid(name, "slippage_rate", "slippage_rate must be in [0, 1)"));
    }
    read_optional_fraction(config, name, "stop_loss", None)?;
    read_optional_fraction(config, name, "take_profit", None)?;
    if let Some(raw) = present(config, name, "direction") {
        raw.parse::<Direction>()
            .map_err(|reason| invalid(name, "direction", reason))?;
    }
    if let Some(raw) = present(config, name, "ma_type") {
        raw.parse::<MaKind>()
            .map_err(|reason| invalid(name, "ma_type", reason))?;
    }
    Ok(())
}

fn validate_initial_capital(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let value = read_f64(config, "backtest", "initial_capital", 10_000.0)?;
    if value <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    let start_date = read_date(config, "data", "start_date")?;
    let end_date = read_date(config, "data", "end_date")?;
    if start_date > end_date {
        return Err(invalid(
            "data",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

fn validate_pairs(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if let Some(raw) = present(config, "data", "pairs") {
        parse_pairs(&raw).map_err(|e| invalid("data", "pairs", e.to_string()))?;
    }
    let top = read_usize(config, "data", "top_pairs", 10)?;
    if top == 0 {
        return Err(invalid("data", "top_pairs", "top_pairs must be at least 1"));
    }
    Ok(())
}

fn validate_concurrency(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    if read_usize(config, "data", "max_concurrency", 4)? == 0 {
        return Err(invalid(
            "data",
            "max_concurrency",
            "max_concurrency must be at least 1",
        ));
    }
    if read_usize(config, "data", "timeout_secs", 30)? == 0 {
        return Err(invalid("data", "timeout_secs", "timeout_secs must be at least 1"));
    }
    Ok(())
}

fn validate_urls(config: &dyn ConfigPort) -> Result<(), BacktestError> {
    for key in ["base_url", "api_url"] {
        if let Some(url) = present(config, "data", key) {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(invalid("data", key, format!("'{url}' is not an http(s) URL")));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    const VALID: &str = r#"
[data]
pairs = ETHBTC, BNBBTC
start_date = 2025-01-01
end_date = 2025-01-07
interval = 1m
max_concurrency = 4

[backtest]
initial_capital = 1000
workers = 2
strategies = ma_crossover, rsi_bb

[ma_crossover]
fee_rate = 0.001
slippage_rate = 0.005
ma_type = ema

[rsi_bb]
stop_loss = 0.016
direction = both
"#;

    #[test]
    fn valid_config_passes() {
        assert!(validate_config(&make_config(VALID)).is_ok());
    }

    #[test]
    fn missing_end_date_fails() {
        let config = make_config("[data]\nstart_date = 2025-01-01\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigMissing { key, .. } if key == "end_date"));
    }

    #[test]
    fn start_after_end_fails() {
        let config = make_config("[data]\nstart_date = 2025-02-01\nend_date = 2025-01-01\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn bad_date_format_fails() {
        let config = make_config("[data]\nstart_date = 2025/01/01\nend_date = 2025-01-02\n");
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn bad_interval_fails() {
        let config = make_config(
            "[data]\nstart_date = 2025-01-01\nend_date = 2025-01-02\ninterval = 2m\n",
        );
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "interval"));
    }

    #[test]
    fn duplicate_pairs_fail() {
        let config = make_config(
            "[data]\nstart_date = 2025-01-01\nend_date = 2025-01-02\npairs = ETHBTC,ethbtc\n",
        );
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "pairs"));
    }

    #[test]
    fn zero_workers_fail() {
        let config = make_config("[backtest]\nworkers = 0\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "workers"));
    }

    #[test]
    fn unknown_strategy_fails() {
        let config = make_config("[backtest]\nstrategies = ma_crossover, macd\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "strategies"));
    }

    #[test]
    fn strategy_names_default_to_all() {
        let config = make_config("[backtest]\n");
        assert_eq!(read_strategy_names(&config).unwrap(), Strategy::NAMES);
    }

    #[test]
    fn negative_fee_fails() {
        let config = make_config("[sma_crossover]\nfee_rate = -0.1\n");
        let err = validate_strategy_config(&config, "sma_crossover").unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "fee_rate"));
    }

    #[test]
    fn optional_fraction_forms() {
        let config = make_config("[rsi_bb]\nstop_loss = off\ntake_profit = 0.02\n");
        assert_eq!(
            read_optional_fraction(&config, "rsi_bb", "stop_loss", Some(0.016)).unwrap(),
            None
        );
        assert_eq!(
            read_optional_fraction(&config, "rsi_bb", "take_profit", None).unwrap(),
            Some(0.02)
        );
        assert_eq!(
            read_optional_fraction(&config, "rsi_bb", "missing", Some(0.5)).unwrap(),
            Some(0.5)
        );

        let config = make_config("[rsi_bb]\nstop_loss = 1.5\n");
        assert!(read_optional_fraction(&config, "rsi_bb", "stop_loss", None).is_err());
    }

    #[test]
    fn non_numeric_value_fails() {
        let config = make_config("[backtest]\ninitial_capital = lots\n");
        let err = validate_backtest_config(&config).unwrap_err();
        assert!(
            matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "initial_capital")
        );
    }

    #[test]
    fn non_http_url_fails() {
        let config = make_config(
            "[data]\nstart_date = 2025-01-01\nend_date = 2025-01-02\nbase_url = ftp://example\n",
        );
        let err = validate_data_config(&config).unwrap_err();
        assert!(matches!(err, BacktestError::ConfigInvalid { key, .. } if key == "base_url"));
    }
}
