//! Server configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Server configuration for the bundled HTTP front end
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server listening port
    /// Env: CACHET_PORT
    /// Default: 8080
    pub port: u16,

    /// Server listening address
    /// Env: CACHET_HOST
    /// Default: "127.0.0.1"
    pub host: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080, host: "127.0.0.1".to_string() }
    }
}

impl ServerConfig {
    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.port = other.port;
        self.host = other.host;
    }

    /// Apply environment variables
    pub fn apply_env_vars(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = var("CACHET_PORT") {
            if let Ok(p) = port.parse() {
                self.port = p;
            }
        }

        if let Some(host) = var("CACHET_HOST") {
            self.host = host;
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.port == 0 {
            bail!("Invalid port: port must be between 1 and 65535");
        }

        if self.host.is_empty() {
            bail!("Invalid host: host cannot be empty");
        }

        Ok(())
    }

    /// Listening address as `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
