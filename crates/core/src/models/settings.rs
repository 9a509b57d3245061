use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

use super::marking::DEFAULT_ENTRY_SIZE;

/// Environment variable overriding `Settings::api_url`.
pub const ENV_API_URL: &str = "REPLAY_API_URL";

/// Environment variable overriding `Settings::auth_token`.
pub const ENV_API_TOKEN: &str = "REPLAY_API_TOKEN";

/// Bar sizes the journal backend serves.
pub const SUPPORTED_TIMEFRAMES: &[&str] = &["1min", "5min", "15min", "30min", "1h", "4h", "1d"];

/// User-configurable settings, stored inside the encrypted workspace snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Base URL of the journal backend (no trailing slash)
    pub api_url: String,

    /// Bearer token obtained from the backend's login endpoint
    pub auth_token: Option<String>,

    /// Ticker loaded when a session starts (e.g., "xauusd")
    pub default_ticker: String,

    /// Timeframe loaded when a session starts (e.g., "5min")
    pub default_timeframe: String,

    /// Size pre-filled in the entry prompt
    pub default_size: f64,

    /// Per-request timeout for the HTTP client
    pub request_timeout_secs: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8000".to_string(),
            auth_token: None,
            default_ticker: "xauusd".to_string(),
            default_timeframe: "5min".to_string(),
            default_size: DEFAULT_ENTRY_SIZE,
            request_timeout_secs: 30,
        }
    }
}

impl Settings {
    /// Defaults with `REPLAY_API_URL` / `REPLAY_API_TOKEN` applied.
    pub fn from_env() -> Result<Self, CoreError> {
        let mut settings = Self::default();
        settings.apply_env()?;
        Ok(settings)
    }

    /// Apply environment overrides on top of the current values.
    pub fn apply_env(&mut self) -> Result<(), CoreError> {
        if let Ok(url) = std::env::var(ENV_API_URL) {
            self.set_api_url(&url)?;
        }
        if let Ok(token) = std::env::var(ENV_API_TOKEN) {
            let token = token.trim();
            if !token.is_empty() {
                self.auth_token = Some(token.to_string());
            }
        }
        Ok(())
    }

    pub fn set_api_url(&mut self, url: &str) -> Result<(), CoreError> {
        let trimmed = url.trim().trim_end_matches('/');
        if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
            return Err(CoreError::Validation(format!(
                "Invalid API URL '{url}': must start with http:// or https://"
            )));
        }
        self.api_url = trimmed.to_string();
        Ok(())
    }

    pub fn set_default_timeframe(&mut self, timeframe: &str) -> Result<(), CoreError> {
        let tf = validate_timeframe(timeframe)?;
        self.default_timeframe = tf;
        Ok(())
    }

    pub fn set_default_ticker(&mut self, ticker: &str) -> Result<(), CoreError> {
        let t = ticker.trim().to_lowercase();
        if t.is_empty() || !t.chars().all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-') {
            return Err(CoreError::Validation(format!("Invalid ticker '{ticker}'")));
        }
        self.default_ticker = t;
        Ok(())
    }

    pub fn set_default_size(&mut self, size: f64) -> Result<(), CoreError> {
        validate_size(size)?;
        self.default_size = size;
        Ok(())
    }
}

/// Normalize and check a timeframe against `SUPPORTED_TIMEFRAMES`.
pub fn validate_timeframe(timeframe: &str) -> Result<String, CoreError> {
    let tf = timeframe.trim().to_lowercase();
    if SUPPORTED_TIMEFRAMES.contains(&tf.as_str()) {
        Ok(tf)
    } else {
        Err(CoreError::Validation(format!(
            "Unsupported timeframe '{timeframe}' (expected one of: {})",
            SUPPORTED_TIMEFRAMES.join(", ")
        )))
    }
}

/// A position size must be a finite, strictly positive number.
pub fn validate_size(size: f64) -> Result<(), CoreError> {
    if size.is_finite() && size > 0.0 {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Size must be a positive number, got {size}"
        )))
    }
}
