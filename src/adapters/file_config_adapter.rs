//! INI file configuration adapter.
//!
//! Section and key names are case-insensitive. Values are returned trimmed;
//! numeric and boolean lookups fall back to the caller's default when the
//! value is missing or does not parse.

use std::path::Path;

use configparser::ini::Ini;

use crate::domain::error::BacktestError;
use crate::ports::config_port::ConfigPort;

#[derive(Debug)]
pub struct FileConfigAdapter {
    ini: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, BacktestError> {
        let path = path.as_ref();
        let mut ini = Ini::new();
        ini.load(path).map_err(|reason| BacktestError::ConfigParse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { ini })
    }

    pub fn from_string(content: &str) -> Result<Self, BacktestError> {
        let mut ini = Ini::new();
        ini.read(content.to_string())
            .map_err(|reason| BacktestError::ConfigParse {
                file: "<string>".into(),
                reason,
            })?;
        Ok(Self { ini })
    }

    /// Names of every section present, lower-cased.
    pub fn sections(&self) -> Vec<String> {
        let mut sections = self.ini.sections();
        sections.sort();
        sections
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.ini.get(section, key).map(|v| v.trim().to_string())
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> i64 {
        self.get_string(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> f64 {
        self.get_string(section, key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool {
        self.get_string(section, key)
            .and_then(|v| Self::parse_bool(&v))
            .unwrap_or(default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"
[data]
pairs = ETHBTC,BNBBTC
start_date = 2025-01-01
base_url = https://data.binance.vision/data/spot/daily/klines

[backtest]
initial_capital = 2500.5
workers = 4
allow_same_bar_reentry = yes

[RSI_BB]
rsi_window = 14
"#;

    #[test]
    fn reads_sections_and_values() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("data", "pairs"),
            Some("ETHBTC,BNBBTC".to_string())
        );
        assert_eq!(adapter.get_int("backtest", "workers", 1), 4);
        assert_eq!(adapter.get_double("backtest", "initial_capital", 0.0), 2500.5);
        assert!(adapter.get_bool("backtest", "allow_same_bar_reentry", false));
    }

    #[test]
    fn url_values_survive_intact() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(
            adapter.get_string("data", "base_url").as_deref(),
            Some("https://data.binance.vision/data/spot/daily/klines")
        );
    }

    #[test]
    fn section_names_are_case_insensitive() {
        let adapter = FileConfigAdapter::from_string(SAMPLE).unwrap();
        assert_eq!(adapter.get_int("rsi_bb", "rsi_window", 0), 14);
        assert!(adapter.sections().contains(&"rsi_bb".to_string()));
    }

    #[test]
    fn missing_values_fall_back() {
        let adapter = FileConfigAdapter::from_string("[backtest]\nworkers = many\n").unwrap();
        assert_eq!(adapter.get_string("backtest", "missing"), None);
        assert_eq!(adapter.get_string("nowhere", "key"), None);
        assert_eq!(adapter.get_int("backtest", "workers", 3), 3);
        assert_eq!(adapter.get_double("backtest", "missing", 9.5), 9.5);
        assert!(!adapter.has_key("backtest", "missing"));
    }

    #[test]
    fn bool_spellings() {
        let adapter =
            FileConfigAdapter::from_string("[x]\na = on\nb = No\nc = maybe\n").unwrap();
        assert!(adapter.get_bool("x", "a", false));
        assert!(!adapter.get_bool("x", "b", true));
        assert!(adapter.get_bool("x", "c", true));
    }

    #[test]
    fn from_file_reads_config() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "[backtest]\noutput_dir = /tmp/results\n").unwrap();
        let adapter = FileConfigAdapter::from_file(file.path()).unwrap();
        assert_eq!(
            adapter.get_string("backtest", "output_dir").as_deref(),
            Some("/tmp/results")
        );
    }

    #[test]
    fn missing_file_is_config_parse_error() {
        let err = FileConfigAdapter::from_file("/nonexistent/path/backtest.ini").unwrap_err();
        assert!(matches!(err, BacktestError::ConfigParse { .. }));
    }
}
