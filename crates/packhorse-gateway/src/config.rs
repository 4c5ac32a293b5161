//! Gateway configuration types.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;

/// Configuration for the Packhorse gateway.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP listen address.
    pub listen_addr: SocketAddr,
    /// Base URL of the authorization backend.
    pub upstream_url: String,
    /// Path to the git binary.
    pub git_binary: String,
    /// Log level.
    pub log_level: String,
    /// Emit JSON logs.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8181)),
            upstream_url: "http://localhost:8080".to_string(),
            git_binary: "git".to_string(),
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Loads configuration from a YAML file. A missing file yields the
    /// defaults so the gateway can run without one.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&raw)?)
    }
}
