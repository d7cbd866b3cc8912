//! Prelude module for convenient imports.
//!
//! ```rust,ignore
//! use cachet_core::prelude::*;
//! ```

// === Configuration ===
pub use crate::config::{CachetConfig, ServerConfig, SessionsConfig};

// === Sessions ===
pub use crate::session::{
    CleanupStats, CookieConfig, MemorySessionStore, SameSitePolicy, Session, SessionCookie, SessionError,
    SessionManager, SessionManagerConfig, SessionResult, SessionStore, StoreError,
    StoreWritePolicy,
};

// === Common external types ===
pub use async_trait::async_trait;
