//! Session error types

/// Session result type
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by a [`SessionStore`](super::SessionStore) backend
#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("Session id already exists: {0}")]
    DuplicateId(String),
    #[error("Session not found: {0}")]
    NotFound(String),
    /// The backend holds a record for this id that does not decode as a session
    #[error("Corrupt session record for id {id}: {reason}")]
    Corrupt { id: String, reason: String },
    #[error("Storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

impl StoreError {
    /// Wrap an arbitrary backend failure message
    pub fn backend(msg: impl std::fmt::Display) -> Self {
        StoreError::Backend(anyhow::anyhow!("{}", msg))
    }
}

/// Session lifecycle errors returned by the [`SessionManager`](super::SessionManager)
#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("No session cookie in request")]
    NoCookie,
    #[error("Session cookie value could not be unescaped")]
    CorruptCookie,
    #[error("Corrupt session entry purged for id {0}")]
    CacheCorrupt(String),
    #[error("Session not found")]
    NotFound,
    #[error("Session expired")]
    SessionExpired,
    #[error(transparent)]
    Storage(#[from] StoreError),
    #[error("Secure random source unavailable: {0}")]
    RandomSourceUnavailable(String),
    #[error("Invalid Set-Cookie header: {0}")]
    InvalidHeader(String),
}

impl SessionError {
    /// True when the caller can recover by treating the request as anonymous
    /// and starting a fresh session.
    ///
    /// Storage failures are not recoverable this way: the session may well be
    /// valid, the backend just could not confirm it.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            SessionError::Storage(_)
                | SessionError::RandomSourceUnavailable(_)
                | SessionError::InvalidHeader(_)
        )
    }
}
