//! Sessions configuration

use crate::session::{SameSitePolicy, SessionManagerConfig, StoreWritePolicy};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Sessions configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Name of the session cookie
    /// Env: CACHET_SESSION_COOKIE_NAME
    /// Default: "session_id"
    pub cookie_name: String,

    /// Session lifetime in seconds, also the cookie Max-Age
    /// Env: CACHET_SESSION_MAX_LIFETIME
    /// Default: 3600 (1 hour)
    pub max_lifetime: u64,

    /// Set Secure flag on cookies (HTTPS only)
    /// Env: CACHET_SESSION_COOKIE_SECURE
    /// Default: false
    pub cookie_secure: bool,

    /// Set HttpOnly flag on cookies (XSS protection)
    /// Env: CACHET_SESSION_COOKIE_HTTPONLY
    /// Default: true
    pub cookie_httponly: bool,

    /// SameSite policy: "Strict", "Lax", "None", or "" to omit
    /// Env: CACHET_SESSION_COOKIE_SAMESITE
    /// Default: "Lax"
    pub cookie_samesite: String,

    /// Cookie domain
    /// Env: CACHET_SESSION_COOKIE_DOMAIN
    /// Default: None (host-only cookie)
    pub cookie_domain: Option<String>,

    /// Periodically sweep expired sessions out of the cache
    /// Env: CACHET_SESSION_AUTO_CLEANUP
    /// Default: true
    pub auto_cleanup: bool,

    /// Session cleanup interval in seconds
    /// Env: CACHET_SESSION_CLEANUP_INTERVAL
    /// Default: 300 (5 minutes)
    pub cleanup_interval: u64,

    /// Surface store write failures instead of logging them
    /// Env: CACHET_SESSION_STRICT_WRITES
    /// Default: false
    pub strict_writes: bool,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            cookie_name: "session_id".to_string(),
            max_lifetime: 3600,
            cookie_secure: false,
            cookie_httponly: true,
            cookie_samesite: "Lax".to_string(),
            cookie_domain: None,
            auto_cleanup: true,
            cleanup_interval: 300,
            strict_writes: false,
        }
    }
}

impl SessionsConfig {
    pub fn merge(&mut self, other: Self) {
        self.cookie_name = other.cookie_name;
        self.max_lifetime = other.max_lifetime;
        self.cookie_secure = other.cookie_secure;
        self.cookie_httponly = other.cookie_httponly;
        self.cookie_samesite = other.cookie_samesite;
        self.cookie_domain = other.cookie_domain;
        self.auto_cleanup = other.auto_cleanup;
        self.cleanup_interval = other.cleanup_interval;
        self.strict_writes = other.strict_writes;
    }

    pub fn apply_env_vars(&mut self) {
        self.apply_env(|key| std::env::var(key).ok());
    }

    /// Apply overrides from any variable source
    pub fn apply_env<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = var("CACHET_SESSION_COOKIE_NAME") {
            self.cookie_name = name;
        }

        if let Some(max_lifetime) = var("CACHET_SESSION_MAX_LIFETIME") {
            if let Ok(m) = max_lifetime.parse() {
                self.max_lifetime = m;
            }
        }

        if let Some(secure) = var("CACHET_SESSION_COOKIE_SECURE") {
            self.cookie_secure = secure.parse().unwrap_or(self.cookie_secure);
        }

        if let Some(httponly) = var("CACHET_SESSION_COOKIE_HTTPONLY") {
            self.cookie_httponly = httponly.parse().unwrap_or(true);
        }

        if let Some(samesite) = var("CACHET_SESSION_COOKIE_SAMESITE") {
            self.cookie_samesite = samesite;
        }

        if let Some(domain) = var("CACHET_SESSION_COOKIE_DOMAIN") {
            self.cookie_domain = if domain.is_empty() { None } else { Some(domain) };
        }

        if let Some(enabled) = var("CACHET_SESSION_AUTO_CLEANUP") {
            self.auto_cleanup = enabled.parse().unwrap_or(true);
        }

        if let Some(interval) = var("CACHET_SESSION_CLEANUP_INTERVAL") {
            if let Ok(i) = interval.parse() {
                self.cleanup_interval = i;
            }
        }

        if let Some(strict) = var("CACHET_SESSION_STRICT_WRITES") {
            self.strict_writes = strict.parse().unwrap_or(self.strict_writes);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cookie_name.is_empty() {
            bail!("Invalid cookie_name: must not be empty");
        }

        if !self.cookie_name.chars().all(is_cookie_name_char) {
            bail!("Invalid cookie_name {:?}: contains separator or control characters", self.cookie_name);
        }

        if self.max_lifetime == 0 {
            bail!("Invalid max_lifetime: must be greater than 0");
        }

        if self.max_lifetime > i64::MAX as u64 / 1000 {
            bail!("Invalid max_lifetime: {} seconds is out of range", self.max_lifetime);
        }

        if self.cleanup_interval == 0 {
            bail!("Invalid cleanup_interval: must be greater than 0");
        }

        if !["Strict", "Lax", "None", ""].contains(&self.cookie_samesite.as_str()) {
            bail!("Invalid cookie_samesite: must be Strict, Lax, None or empty");
        }

        if self.cookie_samesite == "None" && !self.cookie_secure {
            log::warn!("SameSite=None without Secure will be rejected by most browsers");
        }

        Ok(())
    }

    /// Build the session manager configuration
    pub fn to_manager_config(&self) -> Result<SessionManagerConfig> {
        self.validate()?;

        let same_site = match self.cookie_samesite.as_str() {
            "" => None,
            other => Some(other.parse::<SameSitePolicy>()?),
        };
        let write_policy =
            if self.strict_writes { StoreWritePolicy::Strict } else { StoreWritePolicy::BestEffort };

        let mut config = SessionManagerConfig::new()
            .with_cookie_name(self.cookie_name.clone())
            .with_max_lifetime(Duration::from_secs(self.max_lifetime))
            .with_secure(self.cookie_secure)
            .with_http_only(self.cookie_httponly)
            .with_same_site(same_site)
            .with_write_policy(write_policy)
            .with_auto_cleanup(self.auto_cleanup)
            .with_cleanup_interval(Duration::from_secs(self.cleanup_interval));
        if let Some(ref domain) = self.cookie_domain {
            config = config.with_domain(domain.clone());
        }
        Ok(config)
    }
}

// RFC 6265 token characters
fn is_cookie_name_char(c: char) -> bool {
    c.is_ascii_graphic() && !"()<>@,;:\\\"/[]?={}".contains(c)
}
