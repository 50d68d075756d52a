//! Tabsync configuration
//!
//! Layered as defaults, then an optional JSON file, then `TABSYNC_*`
//! environment variables. Command-line flags are applied last by the binary.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tabsync_session::{MergePolicy, StoreOptions};

use crate::error::CoreError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the coordinator listens on
    pub listen_host: String,
    pub listen_port: u16,
    /// WebSocket URL clients connect to
    pub coordinator_url: String,
    /// Pending requests fail after this long. 0 disables the timeout.
    pub request_timeout_ms: u64,
    /// Delete a session once its last member disconnects
    pub reap_empty_sessions: bool,
    pub merge_policy: MergePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_host: "127.0.0.1".to_string(),
            listen_port: 8787,
            coordinator_url: "ws://127.0.0.1:8787/ws".to_string(),
            request_timeout_ms: 30_000,
            reap_empty_sessions: true,
            merge_policy: MergePolicy::default(),
        }
    }
}

impl Config {
    /// Load a JSON config file. Missing keys keep their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Override fields from `TABSYNC_*` environment variables
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Override fields from variables looked up through `var`
    pub fn apply_vars(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(host) = var("TABSYNC_HOST") {
            self.listen_host = host;
        }
        if let Some(port) = var("TABSYNC_PORT") {
            self.listen_port = parse("TABSYNC_PORT", &port)?;
        }
        if let Some(url) = var("TABSYNC_URL") {
            self.coordinator_url = url;
        }
        if let Some(timeout) = var("TABSYNC_REQUEST_TIMEOUT_MS") {
            self.request_timeout_ms = parse("TABSYNC_REQUEST_TIMEOUT_MS", &timeout)?;
        }
        if let Some(reap) = var("TABSYNC_REAP_EMPTY_SESSIONS") {
            self.reap_empty_sessions = parse("TABSYNC_REAP_EMPTY_SESSIONS", &reap)?;
        }
        if let Some(policy) = var("TABSYNC_MERGE_POLICY") {
            self.merge_policy = policy.parse().map_err(CoreError::Config)?;
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.listen_host, self.listen_port)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        (self.request_timeout_ms > 0).then(|| Duration::from_millis(self.request_timeout_ms))
    }

    pub fn store_options(&self) -> StoreOptions {
        StoreOptions {
            merge_policy: self.merge_policy,
            reap_empty_sessions: self.reap_empty_sessions,
        }
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| CoreError::Config(format!("{}={:?}: {}", key, value, e)))
}
