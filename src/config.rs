use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{LedgerError, LedgerResult};

pub const DEFAULT_DB_PATH: &str = "my_data.db";
pub const DEFAULT_CURRENCY_API_URL: &str = "https://api.freecurrencyapi.com/v1/latest";

/// Runtime settings, read from the environment.
///
/// | variable                    | default                     |
/// |-----------------------------|-----------------------------|
/// | `LEDGER_DB_PATH`            | `my_data.db`                |
/// | `LEDGER_BUSY_TIMEOUT_MS`    | `5000`                      |
/// | `CURRENCY_API_URL`          | freecurrencyapi `/v1/latest`|
/// | `CURRENCY_API_KEY`          | unset                       |
/// | `CURRENCY_API_TIMEOUT_SECS` | `10`                        |
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub busy_timeout: Duration,
    pub currency_api_url: String,
    pub currency_api_key: Option<String>,
    pub currency_api_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            busy_timeout: Duration::from_millis(5000),
            currency_api_url: DEFAULT_CURRENCY_API_URL.to_string(),
            currency_api_key: None,
            currency_api_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    pub fn from_env() -> LedgerResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from any key lookup; `from_env` passes `std::env::var`.
    pub fn from_lookup<F>(lookup: F) -> LedgerResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let busy_timeout_ms: u64 = parse_or(&lookup, "LEDGER_BUSY_TIMEOUT_MS", 5000)?;
        let api_timeout_secs: u64 = parse_or(&lookup, "CURRENCY_API_TIMEOUT_SECS", 10)?;

        Ok(Self {
            db_path: lookup("LEDGER_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            currency_api_url: lookup("CURRENCY_API_URL").unwrap_or(defaults.currency_api_url),
            currency_api_key: lookup("CURRENCY_API_KEY").filter(|key| !key.trim().is_empty()),
            currency_api_timeout: Duration::from_secs(api_timeout_secs),
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> LedgerResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| LedgerError::Config(format!("{key} must be a number, got '{raw}'"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_nothing_set() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("my_data.db"));
        assert_eq!(config.busy_timeout, Duration::from_millis(5000));
        assert_eq!(config.currency_api_url, DEFAULT_CURRENCY_API_URL);
        assert!(config.currency_api_key.is_none());
        assert_eq!(config.currency_api_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("LEDGER_DB_PATH", "/tmp/ledger.db"),
            ("LEDGER_BUSY_TIMEOUT_MS", "250"),
            ("CURRENCY_API_KEY", "secret"),
            ("CURRENCY_API_TIMEOUT_SECS", "3"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/tmp/ledger.db"));
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(config.currency_api_key.as_deref(), Some("secret"));
        assert_eq!(config.currency_api_timeout, Duration::from_secs(3));
    }

    #[test]
    fn test_blank_api_key_is_unset() {
        let config = Config::from_lookup(lookup_from(&[("CURRENCY_API_KEY", "  ")])).unwrap();
        assert!(config.currency_api_key.is_none());
    }

    #[test]
    fn test_bad_number_is_config_error() {
        let result = Config::from_lookup(lookup_from(&[("LEDGER_BUSY_TIMEOUT_MS", "soon")]));
        assert!(matches!(result, Err(LedgerError::Config(_))));
    }
}
