//! Cachet - Core
//!
//! Server-side user sessions keyed by a cookie-carried identifier.
//!
//! # Overview
//!
//! A session is looked up in two tiers: a lock-free in-process cache first,
//! then a pluggable durable store. New sessions are written through to the
//! store, cache misses are read through from it, and any corrupt record found
//! in either tier is purged so the next request starts clean.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use cachet_core::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = SessionManager::new("app_sid", 3600, MemorySessionStore::new());
//!
//!     let req = http::Request::new(());
//!     let mut headers = http::HeaderMap::new();
//!     let session = manager.start_session(&mut headers, &req, "alice").await?;
//!     assert_eq!(session.username, "alice");
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - [`session`] - Identifiers, cookies, the cache, the storage port and the manager
//! - [`config`] - TOML and environment driven configuration

pub mod config; // Configuration system with TOML support
pub mod session; // Cookie-keyed sessions over a cache and a durable store

// Prelude module for convenient imports
pub mod prelude;

// Re-exports of main types and traits
pub use config::CachetConfig;
pub use session::{
    MemorySessionStore, Session, SessionError, SessionManager, SessionManagerConfig,
    SessionResult, SessionStore, StoreError,
};
