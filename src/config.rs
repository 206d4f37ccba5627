//! Application configuration parsed from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use crate::session::ProfilePolicy;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
pub const DEFAULT_OCR_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_STORAGE_PATH: &str = ".docvault/storage.json";
pub const DEFAULT_START_PATH: &str = "/dashboard";
pub const DEFAULT_TOKEN_CHECK_INTERVAL_SECS: u64 = 5 * 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config parse failed: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self { request_secs: DEFAULT_REQUEST_TIMEOUT_SECS, connect_secs: DEFAULT_CONNECT_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub api_url: String,
    pub ocr_api_url: String,
    pub storage_path: PathBuf,
    pub token_check_interval: Duration,
    pub profile_policy: ProfilePolicy,
    pub timeouts: HttpTimeouts,
    pub start_path: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_owned(),
            ocr_api_url: DEFAULT_OCR_API_URL.to_owned(),
            storage_path: PathBuf::from(DEFAULT_STORAGE_PATH),
            token_check_interval: Duration::from_secs(DEFAULT_TOKEN_CHECK_INTERVAL_SECS),
            profile_policy: ProfilePolicy::default(),
            timeouts: HttpTimeouts::default(),
            start_path: DEFAULT_START_PATH.to_owned(),
        }
    }
}

impl AppConfig {
    /// Build typed config from environment variables.
    ///
    /// Optional:
    /// - `DOCVAULT_API_URL`: primary backend base URL
    /// - `DOCVAULT_OCR_API_URL`: OCR backend base URL
    /// - `DOCVAULT_STORAGE_PATH`: durable session file
    /// - `DOCVAULT_TOKEN_CHECK_INTERVAL_SECS`: default 300
    /// - `DOCVAULT_PROFILE_POLICY`: `token` (default) or `server`
    /// - `DOCVAULT_REQUEST_TIMEOUT_SECS`: default 30
    /// - `DOCVAULT_CONNECT_TIMEOUT_SECS`: default 10
    /// - `DOCVAULT_START_PATH`: first navigation, default `/dashboard`
    ///
    /// # Errors
    ///
    /// Returns an error for an unknown profile policy or a zero check interval.
    pub fn from_env() -> Result<Self, ConfigError> {
        let profile_policy = match std::env::var("DOCVAULT_PROFILE_POLICY") {
            Ok(raw) => raw.parse::<ProfilePolicy>().map_err(ConfigError::Parse)?,
            Err(_) => ProfilePolicy::default(),
        };

        let interval_secs = env_parse("DOCVAULT_TOKEN_CHECK_INTERVAL_SECS", DEFAULT_TOKEN_CHECK_INTERVAL_SECS);
        if interval_secs == 0 {
            return Err(ConfigError::Parse("DOCVAULT_TOKEN_CHECK_INTERVAL_SECS must be positive".into()));
        }

        Ok(Self {
            api_url: env_url("DOCVAULT_API_URL", DEFAULT_API_URL),
            ocr_api_url: env_url("DOCVAULT_OCR_API_URL", DEFAULT_OCR_API_URL),
            storage_path: std::env::var("DOCVAULT_STORAGE_PATH")
                .map_or_else(|_| PathBuf::from(DEFAULT_STORAGE_PATH), PathBuf::from),
            token_check_interval: Duration::from_secs(interval_secs),
            profile_policy,
            timeouts: HttpTimeouts {
                request_secs: env_parse("DOCVAULT_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: env_parse("DOCVAULT_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            },
            start_path: std::env::var("DOCVAULT_START_PATH").unwrap_or_else(|_| DEFAULT_START_PATH.to_owned()),
        })
    }
}

fn env_url(key: &str, default: &str) -> String {
    std::env::var(key)
        .unwrap_or_else(|_| default.to_owned())
        .trim_end_matches('/')
        .to_owned()
}

pub(crate) fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
