//! Client Configuration
//!
//! Connection settings for a Galaxy server.
//!
//! # Resolution Priority
//!
//! 1. Explicit values (CLI flags, builder calls)
//! 2. Environment: `GALAXY_URL`, `GALAXY_API_KEY`
//! 3. YAML file, by default `~/.galaxy-objects.yaml`
//!
//! ```yaml
//! url: http://localhost:8080
//! api_key: 0123456789abcdef
//! polling_interval_secs: 2
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Environment variable holding the server URL.
pub const URL_ENV: &str = "GALAXY_URL";

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "GALAXY_API_KEY";

/// Server used when nothing else is configured.
pub const DEFAULT_URL: &str = "http://localhost:8080";

/// Lazily-resolved path of the per-user configuration file.
pub static DEFAULT_CONFIG_PATH: Lazy<PathBuf> = Lazy::new(|| {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".galaxy-objects.yaml")
});

fn default_url() -> String {
    DEFAULT_URL.to_string()
}

fn default_polling_interval() -> u64 {
    2
}

fn default_request_timeout() -> u64 {
    60
}

/// Connection settings for a Galaxy server.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct GalaxyConfig {
    /// Base URL of the server, without the `/api` suffix
    #[serde(default = "default_url")]
    pub url: String,

    /// API key of the user the client acts as
    #[serde(default)]
    pub api_key: String,

    /// Seconds between state checks while waiting for datasets
    #[serde(default = "default_polling_interval")]
    pub polling_interval_secs: u64,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl GalaxyConfig {
    /// Creates a configuration for `url` authenticated by `api_key`.
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            polling_interval_secs: default_polling_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }

    /// Reads `GALAXY_URL` (optional) and `GALAXY_API_KEY` (required).
    pub fn from_env() -> Result<Self> {
        let url = std::env::var(URL_ENV).unwrap_or_else(|_| default_url());
        let api_key = std::env::var(API_KEY_ENV)
            .map_err(|_| Error::Config(format!("{} is not set", API_KEY_ENV)))?;
        debug!("Configuration from environment: {}", url);
        Self::new(url, api_key).validated()
    }

    /// Reads a YAML configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let config: Self = serde_yaml::from_str(&content)?;
        info!("Loaded configuration from {}", path.display());
        config.validated()
    }

    /// Environment first, then the default configuration file.
    pub fn discover() -> Result<Self> {
        match Self::from_env() {
            Ok(config) => Ok(config),
            Err(env_err) if DEFAULT_CONFIG_PATH.exists() => {
                debug!("{}; trying {}", env_err, DEFAULT_CONFIG_PATH.display());
                Self::load(&*DEFAULT_CONFIG_PATH)
            }
            Err(env_err) => Err(env_err),
        }
    }

    /// Writes the configuration as YAML.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path.as_ref(), serde_yaml::to_string(self)?)?;
        Ok(())
    }

    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval_secs = interval.as_secs().max(1);
        self
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_secs(self.polling_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Root of the REST API (`{url}/api`).
    pub fn api_url(&self) -> String {
        format!("{}/api", self.url.trim_end_matches('/'))
    }

    fn validated(self) -> Result<Self> {
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("API key is empty".to_string()));
        }
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(Error::Config(format!(
                "URL must start with http:// or https://, got '{}'",
                self.url
            )));
        }
        Ok(self)
    }
}
