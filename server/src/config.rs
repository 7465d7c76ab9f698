//! Gateway configuration parsed from environment variables.

use std::path::PathBuf;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 7002;
pub const DEFAULT_UPSTREAM_URL: &str = "https://dredition-api.aptoma.no";
pub const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid UPSTREAM_URL '{url}': {reason}")]
    InvalidUpstreamUrl { url: String, reason: String },
}

/// Upstream identity/config service settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub base_url: String,
    /// Credential used when a request carries none.
    pub default_apikey: Option<String>,
    pub timeout_secs: u64,
    /// Accept self-signed upstream certificates (local development only).
    pub accept_invalid_certs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    pub upstream: UpstreamConfig,
    /// Viewer id used when a request carries none.
    pub default_user_id: Option<String>,
    /// Directory served under `/js`.
    pub asset_dir: PathBuf,
}

impl GatewayConfig {
    /// Build typed gateway config from environment variables.
    ///
    /// Optional:
    /// - `HOST`, `PORT`: bind address (default `127.0.0.1:7002`)
    /// - `UPSTREAM_URL`: identity/config service base URL
    /// - `UPSTREAM_APIKEY`: fallback credential
    /// - `UPSTREAM_TIMEOUT_SECS`: default 30
    /// - `UPSTREAM_ACCEPT_INVALID_CERTS`: default false
    /// - `PREVIEW_USER_ID`: fallback viewer id
    /// - `PREVIEW_ASSET_DIR`: default `<crate>/assets`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUpstreamUrl`] if `UPSTREAM_URL` does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`GatewayConfig::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUpstreamUrl`] if `UPSTREAM_URL` does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());

        let base_url = non_empty("UPSTREAM_URL")
            .unwrap_or_else(|| DEFAULT_UPSTREAM_URL.to_owned())
            .trim_end_matches('/')
            .to_owned();
        if let Err(e) = reqwest::Url::parse(&base_url) {
            return Err(ConfigError::InvalidUpstreamUrl { url: base_url, reason: e.to_string() });
        }

        let upstream = UpstreamConfig {
            base_url,
            default_apikey: non_empty("UPSTREAM_APIKEY"),
            timeout_secs: parse_or(lookup("UPSTREAM_TIMEOUT_SECS"), DEFAULT_UPSTREAM_TIMEOUT_SECS),
            accept_invalid_certs: lookup("UPSTREAM_ACCEPT_INVALID_CERTS")
                .as_deref()
                .and_then(parse_bool)
                .unwrap_or(false),
        };

        Ok(Self {
            host: non_empty("HOST").unwrap_or_else(|| DEFAULT_HOST.to_owned()),
            port: parse_or(lookup("PORT"), DEFAULT_PORT),
            upstream,
            default_user_id: non_empty("PREVIEW_USER_ID"),
            asset_dir: non_empty("PREVIEW_ASSET_DIR")
                .map_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets"), PathBuf::from),
        })
    }

    #[must_use]
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

pub(crate) fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
