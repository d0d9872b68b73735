//! Configuration management

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8000/api/v1";

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Backend base URL including the `/api/v1` prefix
    pub api_url: String,

    /// Directory holding the persisted session state
    pub state_dir: PathBuf,

    /// Default request timeout
    pub timeout: Duration,

    /// Timeout for model-version and calculation-task creation
    pub long_timeout: Duration,

    /// Delay between the expired-login notice and the redirect to login
    pub redirect_delay: Duration,

    /// Where the rolling log files go
    pub logs_dir: PathBuf,

    /// Write the log file as JSON lines (`HVC_LOG_FORMAT=json`)
    pub log_json: bool,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_url = lookup("HVC_API_URL")
            .filter(|url| !url.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        if !api_url.starts_with("http://") && !api_url.starts_with("https://") {
            anyhow::bail!("HVC_API_URL must be an http(s) URL, got {}", api_url);
        }

        let state_dir = lookup("HVC_STATE_DIR").unwrap_or_else(|| ".hvc".to_string());
        let logs_dir = lookup("LOGS_DIR").unwrap_or_else(|| "./logs".to_string());
        let log_json = match lookup("HVC_LOG_FORMAT").as_deref().map(str::trim) {
            None | Some("") | Some("text") => false,
            Some("json") => true,
            Some(other) => anyhow::bail!("HVC_LOG_FORMAT must be text or json, got {}", other),
        };

        let timeout = Duration::from_secs(number(&lookup, "HVC_TIMEOUT_SECS", 30)?);
        let long_timeout = Duration::from_secs(number(&lookup, "HVC_LONG_TIMEOUT_SECS", 120)?);
        let redirect_delay = Duration::from_millis(number(&lookup, "HVC_REDIRECT_DELAY_MS", 1500)?);

        if timeout.is_zero() {
            anyhow::bail!("HVC_TIMEOUT_SECS must be greater than zero");
        }

        Ok(Self {
            api_url: api_url.trim_end_matches('/').to_string(),
            state_dir: PathBuf::from(state_dir),
            timeout,
            long_timeout,
            redirect_delay,
            logs_dir: PathBuf::from(logs_dir),
            log_json,
        })
    }
}

fn number(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: u64) -> Result<u64> {
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} must be a whole number, got '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio_test::{assert_err, assert_ok};

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn test_config_defaults() {
        let config = assert_ok!(config(&[]));
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.state_dir, PathBuf::from(".hvc"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.long_timeout, Duration::from_secs(120));
        assert_eq!(config.redirect_delay, Duration::from_millis(1500));
        assert_eq!(config.logs_dir, PathBuf::from("./logs"));
        assert!(!config.log_json);
    }

    #[test]
    fn test_config_overrides() {
        let config = config(&[
            ("HVC_API_URL", "https://value.example.org/api/v1/"),
            ("HVC_TIMEOUT_SECS", "10"),
            ("HVC_REDIRECT_DELAY_MS", "0"),
        ])
        .unwrap();
        assert_eq!(config.api_url, "https://value.example.org/api/v1");
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert!(config.redirect_delay.is_zero());
    }

    #[test]
    fn test_config_rejects_bad_numbers() {
        let err = config(&[("HVC_LONG_TIMEOUT_SECS", "two minutes")]).unwrap_err();
        assert!(err.to_string().contains("HVC_LONG_TIMEOUT_SECS"));

        assert_err!(config(&[("HVC_TIMEOUT_SECS", "0")]));
        assert_err!(config(&[("HVC_API_URL", "localhost:8000")]));
        assert_err!(config(&[("HVC_LOG_FORMAT", "xml")]));
        assert!(assert_ok!(config(&[("HVC_LOG_FORMAT", "json")])).log_json);
    }
}
