use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Medmap";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Model used for every completion unless `MEDMAP_MODEL` overrides it.
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20241022";
pub const DEFAULT_ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_SEARCH_BASE_URL: &str = "https://www.googleapis.com";
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";
pub const DEFAULT_LLM_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_SEARCH_TIMEOUT_SECS: u64 = 15;
/// 20 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> &'static str {
    "medmap=info,tower_http=warn"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("{name} has an invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Credentials for the Google Custom Search API.
#[derive(Debug, Clone)]
pub struct SearchCredentials {
    pub api_key: String,
    pub engine_id: String,
}

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub anthropic_api_key: String,
    pub anthropic_base_url: String,
    pub model: String,
    pub llm_timeout: Duration,
    /// `None` when either Google variable is missing; evidence is then skipped.
    pub search: Option<SearchCredentials>,
    pub search_base_url: String,
    pub search_timeout: Duration,
    pub bind: SocketAddr,
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let anthropic_api_key =
            get("ANTHROPIC_API_KEY").ok_or(ConfigError::Missing("ANTHROPIC_API_KEY"))?;

        let search = match (get("GOOGLE_API_KEY"), get("GOOGLE_SEARCH_ENGINE_ID")) {
            (Some(api_key), Some(engine_id)) => Some(SearchCredentials { api_key, engine_id }),
            _ => None,
        };

        let bind_raw = get("MEDMAP_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            name: "MEDMAP_BIND",
            value: bind_raw.clone(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            anthropic_api_key,
            anthropic_base_url: get("ANTHROPIC_BASE_URL")
                .unwrap_or_else(|| DEFAULT_ANTHROPIC_BASE_URL.to_string()),
            model: get("MEDMAP_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            llm_timeout: Duration::from_secs(parse_number(
                "MEDMAP_LLM_TIMEOUT_SECS",
                get("MEDMAP_LLM_TIMEOUT_SECS"),
                DEFAULT_LLM_TIMEOUT_SECS,
            )?),
            search,
            search_base_url: get("GOOGLE_SEARCH_BASE_URL")
                .unwrap_or_else(|| DEFAULT_SEARCH_BASE_URL.to_string()),
            search_timeout: Duration::from_secs(parse_number(
                "MEDMAP_SEARCH_TIMEOUT_SECS",
                get("MEDMAP_SEARCH_TIMEOUT_SECS"),
                DEFAULT_SEARCH_TIMEOUT_SECS,
            )?),
            bind,
            max_upload_bytes: parse_number(
                "MEDMAP_MAX_UPLOAD_BYTES",
                get("MEDMAP_MAX_UPLOAD_BYTES"),
                DEFAULT_MAX_UPLOAD_BYTES,
            )?,
        })
    }
}

fn parse_number<T>(name: &'static str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match raw {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}
