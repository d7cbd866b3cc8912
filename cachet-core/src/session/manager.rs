//! Session manager: cookie handling over a cache and a durable store
//!
//! The SessionManager owns the session cache, wraps a [`SessionStore`] and
//! drives the per-request lifecycle:
//!
//! - `get_session`: cookie -> id -> cache -> store (read-through)
//! - `start_session`: reuse a live session or create one (write-through) and
//!   issue its cookie
//! - `destroy_session`: purge both tiers and expire the cookie
//!
//! Corrupt and expired entries are purged from both tiers as soon as they are
//! touched.

use super::cache::{CacheLookup, SessionCache};
use super::cookie::{unescape_cookie_value, CookieConfig, SessionCookie};
use super::error::{SessionError, SessionResult, StoreError};
use super::id::generate_session_id;
use super::{SameSitePolicy, Session, SessionStore};
use chrono::Utc;
use http::{HeaderMap, Request};
use std::sync::Arc;
use std::time::Duration;

/// Attempts at drawing a fresh id when the store reports a duplicate
const MAX_ID_ATTEMPTS: usize = 3;

/// What to do when the store fails while writing (create or delete)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreWritePolicy {
    /// Log the failure and carry on with the cache and cookie
    #[default]
    BestEffort,
    /// Surface the failure to the caller
    Strict,
}

/// Entries removed by one expiry sweep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CleanupStats {
    /// Expired entries dropped from the cache
    pub cached: usize,
    /// Expired records dropped from the store
    pub stored: usize,
}

/// Session manager configuration
#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    /// Cookie attributes
    pub cookie: CookieConfig,

    /// Lifetime of a new session, also used as the cookie Max-Age
    ///
    /// Truncated to whole seconds, with a floor of one second.
    pub max_lifetime: Duration,

    /// Store write failure handling
    pub write_policy: StoreWritePolicy,

    /// Enable automatic cleanup of expired cache entries
    pub auto_cleanup: bool,

    /// Interval between cleanup runs
    pub cleanup_interval: Duration,

    /// Log cleanup operations
    pub log_cleanup: bool,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            cookie: CookieConfig::default(),
            max_lifetime: Duration::from_secs(3600),
            write_policy: StoreWritePolicy::BestEffort,
            auto_cleanup: true,
            cleanup_interval: Duration::from_secs(300), // 5 minutes
            log_cleanup: true,
        }
    }
}

impl SessionManagerConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set cookie name
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie.name = name.into();
        self
    }

    /// Set session lifetime
    ///
    /// Cookies carry Max-Age in whole seconds, so the manager truncates the
    /// lifetime to seconds and never goes below one second. A zero or
    /// sub-second value therefore yields a one second session.
    pub fn with_max_lifetime(mut self, max_lifetime: Duration) -> Self {
        self.max_lifetime = max_lifetime;
        self
    }

    /// Set secure flag
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.cookie.secure = secure;
        self
    }

    /// Set HTTP only flag
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.cookie.http_only = http_only;
        self
    }

    /// Set SameSite policy (`None` omits the attribute)
    pub fn with_same_site(mut self, same_site: Option<SameSitePolicy>) -> Self {
        self.cookie.same_site = same_site;
        self
    }

    /// Set cookie domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie.domain = Some(domain.into());
        self
    }

    /// Set store write failure handling
    pub fn with_write_policy(mut self, policy: StoreWritePolicy) -> Self {
        self.write_policy = policy;
        self
    }

    /// Set auto cleanup enabled/disabled
    pub fn with_auto_cleanup(mut self, enabled: bool) -> Self {
        self.auto_cleanup = enabled;
        self
    }

    /// Set cleanup interval
    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

    /// Set whether to log cleanup operations
    pub fn with_log_cleanup(mut self, enabled: bool) -> Self {
        self.log_cleanup = enabled;
        self
    }
}

/// Session manager that handles the session lifecycle
///
/// # Example
///
/// ```no_run
/// use cachet_core::session::{SessionManager, MemorySessionStore};
///
/// # async fn example(req: http::Request<()>) -> anyhow::Result<()> {
/// let manager = SessionManager::new("app_sid", 3600, MemorySessionStore::new());
///
/// let mut response_headers = http::HeaderMap::new();
/// let session = manager.start_session(&mut response_headers, &req, "alice").await?;
/// # Ok(())
/// # }
/// ```
pub struct SessionManager<S: SessionStore> {
    store: Arc<S>,
    cache: Arc<SessionCache>,
    cookie: SessionCookie,
    cleanup_task: Option<tokio::task::JoinHandle<()>>,
    config: SessionManagerConfig,
}

impl<S: SessionStore + 'static> SessionManager<S> {
    /// Create a manager from the three construction parameters
    pub fn new(cookie_name: impl Into<String>, max_lifetime_secs: u64, store: S) -> Self {
        let config = SessionManagerConfig::new()
            .with_cookie_name(cookie_name)
            .with_max_lifetime(Duration::from_secs(max_lifetime_secs));
        Self::with_config(store, config)
    }

    /// Create a new session manager with custom configuration
    ///
    /// The cleanup task is only started when called inside a tokio runtime.
    pub fn with_config(store: S, config: SessionManagerConfig) -> Self {
        let store = Arc::new(store);
        let cache = Arc::new(SessionCache::new());

        let cleanup_task = if config.auto_cleanup {
            match tokio::runtime::Handle::try_current() {
                Ok(handle) => Some(handle.spawn(run_cleanup(
                    cache.clone(),
                    store.clone(),
                    config.cleanup_interval,
                    config.log_cleanup,
                ))),
                Err(_) => {
                    log::warn!("No tokio runtime, session cache auto-cleanup disabled");
                    None
                }
            }
        } else {
            None
        };

        Self {
            store,
            cache,
            cookie: SessionCookie::new(config.cookie.clone()),
            cleanup_task,
            config,
        }
    }

    /// Get a reference to the underlying session store
    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    /// Get a reference to the session cache
    pub fn cache(&self) -> Arc<SessionCache> {
        Arc::clone(&self.cache)
    }

    /// Get the manager configuration
    pub fn config(&self) -> &SessionManagerConfig {
        &self.config
    }

    pub fn cookie_name(&self) -> &str {
        self.cookie.name()
    }

    /// Session lifetime in whole seconds, at least one
    pub fn max_lifetime_secs(&self) -> i64 {
        i64::try_from(self.config.max_lifetime.as_secs()).unwrap_or(i64::MAX).max(1)
    }

    /// True iff the request carries a non-empty session cookie
    pub fn has_session<B>(&self, req: &Request<B>) -> bool {
        self.cookie_value(req).is_some()
    }

    /// Resolve the session attached to a request
    pub async fn get_session<B>(&self, req: &Request<B>) -> SessionResult<Session> {
        let raw = self.cookie_value(req).ok_or(SessionError::NoCookie)?;
        let id = unescape_cookie_value(&raw)?;
        self.load_session(&id).await
    }

    /// Resolve a session by id: cache first, then the store
    ///
    /// A store hit populates the cache. Corrupt or expired sessions are
    /// purged from both tiers.
    pub async fn load_session(&self, id: &str) -> SessionResult<Session> {
        let session = match self.cache.load(id).await {
            CacheLookup::Hit(session) => session,
            CacheLookup::Corrupt(_) => {
                self.purge_store(id).await;
                return Err(SessionError::CacheCorrupt(id.to_string()));
            }
            CacheLookup::Miss => {
                let session = match self.store.get(id).await {
                    Ok(session) => session,
                    Err(StoreError::NotFound(_)) => return Err(SessionError::NotFound),
                    Err(StoreError::Corrupt { reason, .. }) => {
                        log::warn!("Store holds corrupt session {}: {}", id, reason);
                        self.purge_store(id).await;
                        return Err(SessionError::CacheCorrupt(id.to_string()));
                    }
                    Err(e) => return Err(e.into()),
                };

                if session.id != id || !session.is_well_formed() {
                    log::warn!("Store returned a malformed session for {}", id);
                    self.purge_store(id).await;
                    return Err(SessionError::CacheCorrupt(id.to_string()));
                }

                if !session.is_expired() {
                    self.cache.store(id, session.clone()).await;
                }
                session
            }
        };

        if session.is_expired() {
            log::debug!("Session {} expired at {}", id, session.expires_at);
            self.cache.delete(id).await;
            self.purge_store(id).await;
            return Err(SessionError::SessionExpired);
        }

        Ok(session)
    }

    /// Return the request's live session, or create one and issue its cookie
    ///
    /// A cookie that no longer resolves to a usable session (unreadable,
    /// unknown, corrupt or expired) is replaced by a fresh session. Store
    /// failures while looking up the existing session are returned as is.
    pub async fn start_session<B>(
        &self,
        response_headers: &mut HeaderMap,
        req: &Request<B>,
        username: &str,
    ) -> SessionResult<Session> {
        if self.has_session(req) {
            match self.get_session(req).await {
                Ok(session) => return Ok(session),
                Err(e) if e.is_recoverable() => {
                    log::debug!("Replacing unusable session cookie: {}", e);
                }
                Err(e) => return Err(e),
            }
        }

        let session = self.create_session(username).await?;
        self.cookie.set_on(response_headers, &session.id, self.max_lifetime_secs())?;

        log::debug!("Started session {} for {}", session.id, session.username);
        Ok(session)
    }

    /// Destroy the request's session and expire its cookie
    ///
    /// Idempotent: a request without a session cookie is a no-op. Under
    /// [`StoreWritePolicy::Strict`] a store failure is returned after the
    /// expired cookie has been appended.
    pub async fn destroy_session<B>(
        &self,
        response_headers: &mut HeaderMap,
        req: &Request<B>,
    ) -> SessionResult<()> {
        let raw = match self.cookie_value(req) {
            Some(raw) => raw,
            None => return Ok(()),
        };

        let mut outcome: SessionResult<()> = Ok(());
        match unescape_cookie_value(&raw) {
            Ok(id) => {
                self.cache.delete(&id).await;
                if let Err(e) = self.store.delete(&id).await {
                    match self.config.write_policy {
                        StoreWritePolicy::BestEffort => {
                            log::warn!("Failed to delete session {} from store: {}", id, e);
                        }
                        StoreWritePolicy::Strict => outcome = Err(e.into()),
                    }
                }
            }
            Err(_) => log::debug!("Expiring unreadable session cookie"),
        }

        self.cookie.expire_on(response_headers)?;
        outcome
    }

    /// Manually sweep expired sessions out of the cache and the store
    ///
    /// The cache is swept even when the store sweep fails.
    pub async fn cleanup_now(&self) -> SessionResult<CleanupStats> {
        sweep_expired(&self.cache, self.store.as_ref()).await.map_err(SessionError::from)
    }

    /// Number of sessions currently cached
    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    async fn create_session(&self, username: &str) -> SessionResult<Session> {
        let lifetime = chrono::Duration::try_seconds(self.max_lifetime_secs())
            .unwrap_or(chrono::Duration::MAX);

        let mut last_error = None;
        for _ in 0..MAX_ID_ATTEMPTS {
            let session = Session::new(generate_session_id()?, username, lifetime);

            match self.store.insert(session.clone()).await {
                Ok(()) => {}
                Err(StoreError::DuplicateId(id)) => {
                    log::warn!("Generated session id collided with an existing one, retrying");
                    last_error = Some(StoreError::DuplicateId(id));
                    continue;
                }
                Err(e) => match self.config.write_policy {
                    StoreWritePolicy::BestEffort => {
                        log::warn!("Session {} not persisted, serving from cache only: {}", session.id, e);
                    }
                    StoreWritePolicy::Strict => return Err(e.into()),
                },
            }

            self.cache.store(&session.id, session.clone()).await;
            return Ok(session);
        }

        Err(last_error
            .map(SessionError::from)
            .unwrap_or_else(|| SessionError::RandomSourceUnavailable("no id generated".to_string())))
    }

    async fn purge_store(&self, id: &str) {
        if let Err(e) = self.store.delete(id).await {
            log::warn!("Failed to purge session {} from store: {}", id, e);
        }
    }

    fn cookie_value<B>(&self, req: &Request<B>) -> Option<String> {
        self.cookie.extract_from_headers(req.headers()).filter(|value| !value.is_empty())
    }
}

async fn sweep_expired<S: SessionStore + ?Sized>(
    cache: &SessionCache,
    store: &S,
) -> Result<CleanupStats, StoreError> {
    let cached = cache.purge_expired(Utc::now()).await;
    let stored = store.cleanup_expired().await?;
    Ok(CleanupStats { cached, stored })
}

async fn run_cleanup<S: SessionStore>(
    cache: Arc<SessionCache>,
    store: Arc<S>,
    interval: Duration,
    log_cleanup: bool,
) {
    let mut interval_timer = tokio::time::interval(interval);
    loop {
        interval_timer.tick().await;

        match sweep_expired(&cache, store.as_ref()).await {
            Ok(stats) if stats != CleanupStats::default() => {
                if log_cleanup {
                    log::info!(
                        "Auto-cleaned expired sessions: {} from cache, {} from store",
                        stats.cached,
                        stats.stored
                    );
                }
            }
            Ok(_) => {}
            Err(e) => {
                log::error!("Session store cleanup failed: {}", e);
            }
        }
    }
}

impl<S: SessionStore> Drop for SessionManager<S> {
    fn drop(&mut self) {
        // Abort the cleanup task when the manager is dropped
        if let Some(task) = self.cleanup_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::MemorySessionStore;
    use http::header::{COOKIE, SET_COOKIE};

    fn request_with_cookie(cookie: &str) -> Request<()> {
        Request::builder().header(COOKIE, cookie).body(()).unwrap()
    }

    fn anonymous_request() -> Request<()> {
        Request::builder().body(()).unwrap()
    }

    fn set_cookies(headers: &HeaderMap) -> Vec<String> {
        headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|v| v.to_str().unwrap().to_string())
            .collect()
    }

    fn test_manager() -> SessionManager<MemorySessionStore> {
        let config = SessionManagerConfig::new()
            .with_cookie_name("app_sid")
            .with_max_lifetime(Duration::from_secs(3600))
            .with_auto_cleanup(false);
        SessionManager::with_config(MemorySessionStore::new(), config)
    }

    #[tokio::test]
    async fn test_manager_creation() {
        let manager = SessionManager::new("app_sid", 3600, MemorySessionStore::new());
        assert_eq!(manager.cookie_name(), "app_sid");
        assert_eq!(manager.max_lifetime_secs(), 3600);
        assert!(manager.config().auto_cleanup);
        assert_eq!(manager.config().cleanup_interval, Duration::from_secs(300));
        assert_eq!(manager.config().write_policy, StoreWritePolicy::BestEffort);
    }

    #[test]
    fn test_manager_without_runtime_skips_cleanup() {
        let manager = SessionManager::new("app_sid", 60, MemorySessionStore::new());
        assert!(manager.cleanup_task.is_none());
    }

    #[tokio::test]
    async fn test_has_session() {
        let manager = test_manager();

        assert!(!manager.has_session(&anonymous_request()));
        assert!(!manager.has_session(&request_with_cookie("app_sid=")));
        assert!(!manager.has_session(&request_with_cookie("other=abc")));
        assert!(manager.has_session(&request_with_cookie("app_sid=abc")));
    }

    #[tokio::test]
    async fn test_get_session_without_cookie() {
        let manager = test_manager();
        let err = manager.get_session(&anonymous_request()).await.unwrap_err();
        assert!(matches!(err, SessionError::NoCookie));
    }

    #[tokio::test]
    async fn test_get_session_with_unescapable_cookie() {
        let manager = test_manager();
        let err = manager.get_session(&request_with_cookie("app_sid=%zz")).await.unwrap_err();
        assert!(matches!(err, SessionError::CorruptCookie));
    }

    #[tokio::test]
    async fn test_get_unknown_session() {
        let manager = test_manager();
        let err = manager.get_session(&request_with_cookie("app_sid=unknown")).await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound));
    }

    #[tokio::test]
    async fn test_start_issues_cookie() {
        let manager = test_manager();
        let mut headers = HeaderMap::new();

        let session = manager.start_session(&mut headers, &anonymous_request(), "alice").await.unwrap();

        let cookies = set_cookies(&headers);
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].starts_with(&format!("app_sid={};", session.id)));
        assert!(cookies[0].contains("Path=/"));
        assert!(cookies[0].contains("HttpOnly"));
        assert!(cookies[0].contains("Max-Age=3600"));

        assert_eq!(manager.cached_count(), 1);
        assert!(manager.store().contains(&session.id).unwrap());
    }

    #[tokio::test]
    async fn test_start_reuses_live_session() {
        let manager = test_manager();
        let mut headers = HeaderMap::new();
        let first = manager.start_session(&mut headers, &anonymous_request(), "alice").await.unwrap();

        let req = request_with_cookie(&format!("app_sid={}", first.id));
        let mut headers = HeaderMap::new();
        let second = manager.start_session(&mut headers, &req, "alice").await.unwrap();

        assert_eq!(first, second);
        assert!(set_cookies(&headers).is_empty());
    }

    #[tokio::test]
    async fn test_destroy_without_cookie_is_noop() {
        let manager = test_manager();
        let mut headers = HeaderMap::new();

        manager.destroy_session(&mut headers, &anonymous_request()).await.unwrap();
        assert!(set_cookies(&headers).is_empty());
    }

    #[tokio::test]
    async fn test_destroy_unreadable_cookie_still_expires_it() {
        let manager = test_manager();
        let mut headers = HeaderMap::new();

        manager.destroy_session(&mut headers, &request_with_cookie("app_sid=%zz")).await.unwrap();

        let cookies = set_cookies(&headers);
        assert_eq!(cookies.len(), 1);
        assert!(cookies[0].contains("Max-Age=-1"));
    }

    #[tokio::test]
    async fn test_manual_cleanup() {
        let manager = test_manager();
        let cache = manager.cache();

        cache.store("expired", Session::new("expired", "alice", chrono::Duration::seconds(-1))).await;
        cache.store("valid", Session::new("valid", "bob", chrono::Duration::hours(1))).await;
        assert_eq!(manager.cached_count(), 2);

        let stats = manager.cleanup_now().await.unwrap();
        assert_eq!(stats, CleanupStats { cached: 1, stored: 0 });
        assert_eq!(manager.cached_count(), 1);
    }

    #[tokio::test]
    async fn test_auto_cleanup_sweeps_cache() {
        let config = SessionManagerConfig::new()
            .with_cleanup_interval(Duration::from_millis(20))
            .with_log_cleanup(false);
        let manager = SessionManager::with_config(MemorySessionStore::new(), config);

        manager
            .cache()
            .store("expired", Session::new("expired", "alice", chrono::Duration::seconds(-1)))
            .await;

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(manager.cached_count(), 0);
    }

    #[tokio::test]
    async fn test_cleanup_sweeps_store() {
        let manager = test_manager();
        let store = manager.store();

        store.insert(Session::new("expired-a", "alice", chrono::Duration::seconds(-1))).await.unwrap();
        store.insert(Session::new("expired-b", "bob", chrono::Duration::seconds(-1))).await.unwrap();
        store.insert(Session::new("live", "carol", chrono::Duration::hours(1))).await.unwrap();

        let stats = manager.cleanup_now().await.unwrap();
        assert_eq!(stats.stored, 2);
        assert_eq!(store.count().unwrap(), 1);
        assert!(store.contains("live").unwrap());
    }

    #[tokio::test]
    async fn test_auto_cleanup_sweeps_untouched_store_records() {
        let config = SessionManagerConfig::new()
            .with_max_lifetime(Duration::from_secs(1))
            .with_cleanup_interval(Duration::from_millis(50))
            .with_log_cleanup(false);
        let manager = SessionManager::with_config(MemorySessionStore::new(), config);

        for i in 0..5 {
            let mut headers = HeaderMap::new();
            manager
                .start_session(&mut headers, &anonymous_request(), &format!("user-{}", i))
                .await
                .unwrap();
        }
        assert_eq!(manager.store().count().unwrap(), 5);

        // Never read again: only the background sweep can remove them
        tokio::time::sleep(Duration::from_millis(1300)).await;

        assert_eq!(manager.cached_count(), 0);
        assert_eq!(manager.store().count().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_sub_second_lifetime_is_raised_to_one_second() {
        for lifetime in [Duration::ZERO, Duration::from_millis(500)] {
            let config = SessionManagerConfig::new()
                .with_cookie_name("app_sid")
                .with_max_lifetime(lifetime)
                .with_auto_cleanup(false);
            let manager = SessionManager::with_config(MemorySessionStore::new(), config);
            assert_eq!(manager.max_lifetime_secs(), 1);

            let mut headers = HeaderMap::new();
            let session =
                manager.start_session(&mut headers, &anonymous_request(), "alice").await.unwrap();

            let cookies = set_cookies(&headers);
            assert!(cookies[0].contains("Max-Age=1;"), "{}", cookies[0]);
            assert_eq!(session.expires_at - session.created_at, chrono::Duration::seconds(1));
        }
    }

    #[tokio::test]
    async fn test_auto_cleanup_disabled() {
        let manager = test_manager();

        manager
            .cache()
            .store("expired", Session::new("expired", "alice", chrono::Duration::seconds(-1)))
            .await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(manager.cached_count(), 1);
    }
}
