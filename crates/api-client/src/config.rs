//! Client configuration
//!
//! Deserialized from the `[api]` table of the CLI config, or built in code
//! with `ClientConfig::new`. Validation happens when the client is built.

use std::time::Duration;

use serde::Deserialize;

/// Settings for `ApiClient`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientConfig {
    /// REST backend root, e.g. `https://api.example.com/api`
    pub base_url: String,
    /// Timeout applied to every request
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Timeout applied to the refresh call only
    #[serde(default = "default_refresh_timeout_secs")]
    pub refresh_timeout_secs: u64,
    /// How long a queued request waits for an in-flight refresh. Unset means
    /// it waits for the refresh to settle.
    #[serde(default)]
    pub queue_wait_timeout_secs: Option<u64>,
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Route the navigator is sent to when the session cannot be recovered
    #[serde(default = "default_login_route")]
    pub login_route: String,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_refresh_timeout_secs() -> u64 {
    session::REFRESH_TIMEOUT.as_secs()
}

fn default_refresh_path() -> String {
    session::REFRESH_TOKEN_PATH.to_string()
}

fn default_login_route() -> String {
    session::LOGIN_ROUTE.to_string()
}

impl ClientConfig {
    /// Config with defaults for everything but the base URL.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_secs: default_timeout_secs(),
            refresh_timeout_secs: default_refresh_timeout_secs(),
            queue_wait_timeout_secs: None,
            refresh_path: default_refresh_path(),
            login_route: default_login_route(),
        }
    }

    pub fn validate(&self) -> common::Result<()> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(common::Error::Config(format!(
                "base_url must start with http:// or https://, got: {}",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(common::Error::Config(
                "timeout_secs must be greater than 0".into(),
            ));
        }
        if self.refresh_timeout_secs == 0 {
            return Err(common::Error::Config(
                "refresh_timeout_secs must be greater than 0".into(),
            ));
        }
        if self.queue_wait_timeout_secs == Some(0) {
            return Err(common::Error::Config(
                "queue_wait_timeout_secs must be greater than 0 when set".into(),
            ));
        }
        if !self.refresh_path.starts_with('/') {
            return Err(common::Error::Config(format!(
                "refresh_path must start with '/', got: {}",
                self.refresh_path
            )));
        }
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs)
    }

    pub fn queue_wait_timeout(&self) -> Option<Duration> {
        self.queue_wait_timeout_secs.map(Duration::from_secs)
    }

    /// Join `path` onto the base URL.
    pub fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        if path.starts_with('/') {
            format!("{base}{path}")
        } else {
            format!("{base}/{path}")
        }
    }
}
