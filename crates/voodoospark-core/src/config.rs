//! Adaptor configuration and defaults.
//!
//! Defaults, environment variable names and helpers live here so the device
//! and CLI crates do not each redefine them.

use crate::error::{AdaptorError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Default endpoints
pub mod endpoints {
    /// Particle cloud API
    pub const PARTICLE_CLOUD: &str = "https://api.particle.io";
    /// Path prefix of every device resource
    pub const API_VERSION: &str = "v1";
}

/// Default tuning values
pub mod defaults {
    /// Interval between polled reads in milliseconds.
    pub const READ_INTERVAL_MS: u64 = 100;
    /// Timeout applied to each cloud request.
    pub const REQUEST_TIMEOUT_SECS: u64 = 10;
    /// Capacity of the adaptor event bus.
    pub const EVENT_CHANNEL_CAPACITY: usize = 256;
}

/// Environment variable names
pub mod env_vars {
    pub const DEVICE_ID: &str = "SPARK_DEVICE_ID";
    pub const ACCESS_TOKEN: &str = "SPARK_ACCESS_TOKEN";
    pub const API_URL: &str = "SPARK_API_URL";
    pub const READ_INTERVAL_MS: &str = "SPARK_READ_INTERVAL_MS";
    pub const REQUEST_TIMEOUT_SECS: &str = "SPARK_REQUEST_TIMEOUT_SECS";
}

/// Validated credentials addressing one physical device.
///
/// Both fields are guaranteed non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    device_id: String,
    access_token: String,
}

impl Credentials {
    /// Validate and build credentials.
    pub fn new(device_id: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let device_id = device_id.into();
        let access_token = access_token.into();
        if device_id.trim().is_empty() || access_token.trim().is_empty() {
            return Err(AdaptorError::missing_credentials());
        }
        Ok(Self {
            device_id,
            access_token,
        })
    }

    /// Device identifier.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Cloud access token.
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("device_id", &self.device_id)
            .field("access_token", &"<redacted>")
            .finish()
    }
}

/// Adaptor configuration as supplied by a host.
///
/// Credentials are optional here so a host can hand over whatever it has;
/// [`AdaptorConfig::credentials`] performs the validation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptorConfig {
    /// Device identifier
    #[serde(default, alias = "device_id")]
    pub device_id: Option<String>,
    /// Cloud access token
    #[serde(default, alias = "access_token")]
    pub access_token: Option<String>,
    /// Polling interval for reads in milliseconds
    #[serde(
        default = "default_read_interval",
        alias = "readInterval",
        alias = "read_interval_ms"
    )]
    pub read_interval_ms: u64,
    /// Base URL of the cloud relay
    #[serde(default = "default_api_base_url", alias = "api_base_url", alias = "apiUrl")]
    pub api_base_url: String,
    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout", alias = "request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_read_interval() -> u64 {
    defaults::READ_INTERVAL_MS
}

fn default_api_base_url() -> String {
    endpoints::PARTICLE_CLOUD.to_string()
}

fn default_request_timeout() -> u64 {
    defaults::REQUEST_TIMEOUT_SECS
}

impl Default for AdaptorConfig {
    fn default() -> Self {
        Self {
            device_id: None,
            access_token: None,
            read_interval_ms: default_read_interval(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl AdaptorConfig {
    /// Create a configuration for the given device.
    pub fn new(device_id: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            device_id: Some(device_id.into()),
            access_token: Some(access_token.into()),
            ..Self::default()
        }
    }

    /// Parse host-supplied connection params.
    ///
    /// Accepts the flat form `{"deviceId": .., "accessToken": ..}` as well as
    /// the nested `{"extraParams": {..}}` form some hosts produce.
    pub fn from_params(params: &serde_json::Value) -> Result<Self> {
        let source = params.get("extraParams").unwrap_or(params);
        serde_json::from_value(source.clone())
            .map_err(|e| AdaptorError::Configuration(format!("Invalid adaptor params: {}", e)))
    }

    /// Build a configuration from `SPARK_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self {
            device_id: std::env::var(env_vars::DEVICE_ID).ok(),
            access_token: std::env::var(env_vars::ACCESS_TOKEN).ok(),
            ..Self::default()
        };
        if let Ok(url) = std::env::var(env_vars::API_URL) {
            config.api_base_url = normalize_api_url(url);
        }
        if let Some(interval) = env_parse(env_vars::READ_INTERVAL_MS) {
            config.read_interval_ms = interval;
        }
        if let Some(timeout) = env_parse(env_vars::REQUEST_TIMEOUT_SECS) {
            config.request_timeout_secs = timeout;
        }
        config
    }

    /// Set the read interval.
    pub fn with_read_interval(mut self, read_interval_ms: u64) -> Self {
        self.read_interval_ms = read_interval_ms;
        self
    }

    /// Set the cloud relay base URL.
    pub fn with_api_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = normalize_api_url(url.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_request_timeout(mut self, timeout_secs: u64) -> Self {
        self.request_timeout_secs = timeout_secs;
        self
    }

    /// Validate and return the credentials.
    pub fn credentials(&self) -> Result<Credentials> {
        match (self.device_id.as_deref(), self.access_token.as_deref()) {
            (Some(device_id), Some(access_token)) => Credentials::new(device_id, access_token),
            _ => Err(AdaptorError::missing_credentials()),
        }
    }

    /// Read interval as a `Duration`.
    pub fn read_interval(&self) -> Duration {
        Duration::from_millis(self.read_interval_ms)
    }

    /// Request timeout as a `Duration`.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn env_parse(name: &str) -> Option<u64> {
    std::env::var(name).ok().and_then(|s| s.parse().ok())
}

/// Normalize a cloud relay URL (strip trailing slashes and a trailing `/v1`).
///
/// Device resource paths add the API version themselves.
pub fn normalize_api_url(url: String) -> String {
    let trimmed = url.trim_end_matches('/');
    trimmed
        .strip_suffix("/v1")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}
