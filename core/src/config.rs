//! Connection settings for the production transport.

use std::time::Duration;

use crate::error::ConfigError;

pub const BASE_URL_VAR: &str = "JSONAPI_BASE_URL";
pub const TIMEOUT_VAR: &str = "JSONAPI_TIMEOUT_SECS";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `JSONAPI_BASE_URL` (required) and `JSONAPI_TIMEOUT_SECS`
    /// (optional, whole seconds).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let base_url = lookup(BASE_URL_VAR)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(BASE_URL_VAR))?;
        let config = Self::new(base_url);
        match lookup(TIMEOUT_VAR) {
            None => Ok(config),
            Some(raw) => {
                let secs = raw.trim().parse::<u64>().map_err(|_| ConfigError::Invalid {
                    name: TIMEOUT_VAR,
                    value: raw.clone(),
                })?;
                Ok(config.with_timeout(Duration::from_secs(secs)))
            }
        }
    }
}
