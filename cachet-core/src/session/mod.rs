//! Session management for Cachet
//!
//! Server-side sessions keyed by a cookie-carried identifier:
//! - Cryptographically random, URL-safe session identifiers
//! - Trait-based durable storage (Memory, SQL, key-value, etc.)
//! - Lock-free in-process cache in front of the store
//! - Cookie issuance and expiry
//!
//! # Example
//!
//! ```no_run
//! use cachet_core::session::{MemorySessionStore, SessionManager, SessionManagerConfig};
//!
//! # async fn example(req: http::Request<()>) -> anyhow::Result<()> {
//! let config = SessionManagerConfig::new()
//!     .with_cookie_name("app_sid")
//!     .with_max_lifetime(std::time::Duration::from_secs(3600));
//! let manager = SessionManager::with_config(MemorySessionStore::new(), config);
//!
//! let mut headers = http::HeaderMap::new();
//! let session = manager.start_session(&mut headers, &req, "alice").await?;
//! manager.destroy_session(&mut headers, &req).await?;
//! # Ok(())
//! # }
//! ```

mod cache;
mod cookie;
mod error;
mod id;
mod manager;
mod memory;
mod store;


pub use cache::{CacheLookup, SessionCache};
pub use cookie::{escape_cookie_value, unescape_cookie_value, CookieConfig, SessionCookie};
pub use error::{SessionError, SessionResult, StoreError};
pub use id::{generate_session_id, generate_session_id_from, SESSION_ID_BYTES};
pub use manager::{CleanupStats, SessionManager, SessionManagerConfig, StoreWritePolicy};
pub use memory::MemorySessionStore;
pub use store::{Session, SessionData, SessionStore};

/// SameSite cookie policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSitePolicy {
    /// Strict - cookie only sent to same site
    Strict,

    /// Lax - cookie sent on top-level navigation
    Lax,

    /// None - cookie sent on all requests (requires Secure)
    None,
}

impl SameSitePolicy {
    /// Attribute value as written in Set-Cookie
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSitePolicy::Strict => "Strict",
            SameSitePolicy::Lax => "Lax",
            SameSitePolicy::None => "None",
        }
    }
}

impl std::str::FromStr for SameSitePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Strict" => Ok(SameSitePolicy::Strict),
            "Lax" => Ok(SameSitePolicy::Lax),
            "None" => Ok(SameSitePolicy::None),
            other => anyhow::bail!("Invalid SameSite policy: {}", other),
        }
    }
}
