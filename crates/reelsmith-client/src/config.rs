//! Connection settings for the backend.

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use reelsmith_core::defaults;
use reelsmith_core::{Error, Result};

/// Where the backend lives and how long a single request may take.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL without the `/api` prefix, e.g. `http://localhost:8000`.
    pub base_url: String,
    /// Per-request timeout. `None` waits indefinitely.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: defaults::BACKEND_URL.to_string(),
            request_timeout_secs: None,
        }
    }
}

impl ClientConfig {
    /// Create from environment variables.
    ///
    /// | Variable | Default |
    /// |----------|---------|
    /// | `REELSMITH_BACKEND_URL` | `http://localhost:8000` |
    /// | `REELSMITH_REQUEST_TIMEOUT_SECS` | unset (no timeout) |
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(url) = env::var(defaults::ENV_BACKEND_URL) {
            if !url.trim().is_empty() {
                config = config.with_base_url(url);
            }
        }

        if let Ok(raw) = env::var(defaults::ENV_REQUEST_TIMEOUT_SECS) {
            match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.request_timeout_secs = Some(secs),
                _ => tracing::warn!(
                    value = %raw,
                    "Ignoring invalid {}",
                    defaults::ENV_REQUEST_TIMEOUT_SECS
                ),
            }
        }

        config
    }

    /// Builder: set the base URL. A trailing slash is dropped.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim().trim_end_matches('/').to_string();
        self
    }

    /// Builder: set the per-request timeout.
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::Config("backend base_url cannot be empty".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(Error::Config(format!(
                "backend base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }

        if self.request_timeout_secs == Some(0) {
            return Err(Error::Config(
                "request timeout must be at least 1 second".to_string(),
            ));
        }

        Ok(())
    }
}
