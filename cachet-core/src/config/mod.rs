//! Configuration system for Cachet
//!
//! # Configuration Hierarchy
//!
//! Configuration values are resolved in the following order (highest priority wins):
//!
//! 1. **Code** (Builder pattern) - Highest priority
//! 2. **Environment Variables** (`CACHET_*`) - Override file config
//! 3. **Config File** (cachet.toml) - Override defaults
//! 4. **Defaults** - Lowest priority
//!
//! # Example
//!
//! ```no_run
//! use cachet_core::config::CachetConfig;
//!
//! // Load with full supersedence
//! let config = CachetConfig::load()?;
//!
//! // Or load from specific file
//! let config = CachetConfig::from_file("cachet.toml")?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod server;
pub mod sessions;

pub use server::ServerConfig;
pub use sessions::SessionsConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Complete Cachet configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachetConfig {
    pub server: ServerConfig,
    pub sessions: SessionsConfig,
}

impl CachetConfig {
    /// Load configuration with full supersedence chain
    pub fn load() -> Result<Self> {
        Self::load_from("cachet.toml")
    }

    /// Load configuration from a specific file, falling back to defaults if
    /// the file does not exist
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();
        config.validate()?;

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.server.merge(other.server);
        self.sessions.merge(other.sessions);
    }

    /// Apply environment variables to configuration
    pub fn apply_env_vars(&mut self) {
        self.server.apply_env_vars();
        self.sessions.apply_env_vars();
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.server.validate()?;
        self.sessions.validate()?;
        Ok(())
    }
}
