//! Session cookie encoding
//!
//! The cookie carries nothing but the query-escaped session identifier.

use super::error::{SessionError, SessionResult};
use super::SameSitePolicy;
use http::header::{HeaderMap, HeaderValue, COOKIE, SET_COOKIE};

/// `Expires` attribute value used to make the client drop a cookie
pub const EPOCH_EXPIRES: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// Cookie configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieConfig {
    /// Cookie name
    pub name: String,

    /// Cookie domain
    pub domain: Option<String>,

    /// Cookie path
    pub path: String,

    /// Secure flag (HTTPS only)
    pub secure: bool,

    /// HttpOnly flag (no JavaScript access)
    pub http_only: bool,

    /// SameSite policy, omitted from the header when `None`
    pub same_site: Option<SameSitePolicy>,
}

impl Default for CookieConfig {
    fn default() -> Self {
        Self {
            name: "session_id".to_string(),
            domain: None,
            path: "/".to_string(),
            secure: false,
            http_only: true, // XSS protection
            same_site: Some(SameSitePolicy::Lax),
        }
    }
}

/// Session cookie builder and parser
#[derive(Debug, Clone)]
pub struct SessionCookie {
    config: CookieConfig,
}

impl SessionCookie {
    /// Create a new session cookie builder
    pub fn new(config: CookieConfig) -> Self {
        Self { config }
    }

    /// Cookie name this builder reads and writes
    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &CookieConfig {
        &self.config
    }

    /// Build a Set-Cookie header value issuing `session_id` for `max_age` seconds
    pub fn build_set_cookie(&self, session_id: &str, max_age: i64) -> String {
        let value = escape_cookie_value(session_id);
        self.build(&value, &[format!("Max-Age={}", max_age)])
    }

    /// Build a Set-Cookie header value telling the client to discard the cookie
    pub fn build_expired_cookie(&self) -> String {
        self.build("", &["Max-Age=-1".to_string(), format!("Expires={}", EPOCH_EXPIRES)])
    }

    fn build(&self, value: &str, lifetime: &[String]) -> String {
        let mut parts = vec![format!("{}={}", self.config.name, value)];

        if let Some(ref domain) = self.config.domain {
            parts.push(format!("Domain={}", domain));
        }

        parts.push(format!("Path={}", self.config.path));
        parts.extend(lifetime.iter().cloned());

        if self.config.secure {
            parts.push("Secure".to_string());
        }

        if self.config.http_only {
            parts.push("HttpOnly".to_string());
        }

        if let Some(same_site) = self.config.same_site {
            parts.push(format!("SameSite={}", same_site.as_str()));
        }

        parts.join("; ")
    }

    /// Extract the raw (still escaped) cookie value from a Cookie header
    pub fn extract_from_header(&self, cookie_header: &str) -> Option<String> {
        cookie_header.split(';').find_map(|cookie| {
            let (name, value) = cookie.trim().split_once('=')?;
            (name.trim() == self.config.name).then(|| value.trim().to_string())
        })
    }

    /// Extract the raw cookie value from request headers
    ///
    /// Browsers may split cookies over several `Cookie` headers; all of them
    /// are searched.
    pub fn extract_from_headers(&self, headers: &HeaderMap) -> Option<String> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find_map(|header| self.extract_from_header(header))
    }

    /// Append an issued cookie to the response headers
    pub fn set_on(&self, headers: &mut HeaderMap, session_id: &str, max_age: i64) -> SessionResult<()> {
        append_set_cookie(headers, self.build_set_cookie(session_id, max_age))
    }

    /// Append an expired cookie to the response headers
    pub fn expire_on(&self, headers: &mut HeaderMap) -> SessionResult<()> {
        append_set_cookie(headers, self.build_expired_cookie())
    }
}

fn append_set_cookie(headers: &mut HeaderMap, cookie: String) -> SessionResult<()> {
    // Escaped ids are plain ASCII; only a misconfigured name or domain lands here
    let value =
        HeaderValue::from_str(&cookie).map_err(|e| SessionError::InvalidHeader(e.to_string()))?;
    headers.append(SET_COOKIE, value);
    Ok(())
}

/// Query-escape a session identifier for use as a cookie value
pub fn escape_cookie_value(id: &str) -> String {
    urlencoding::encode(id).into_owned()
}

/// Reverse [`escape_cookie_value`]
///
/// Malformed percent sequences and escapes that do not decode to UTF-8 are
/// rejected as [`SessionError::CorruptCookie`].
pub fn unescape_cookie_value(value: &str) -> SessionResult<String> {
    let bytes = value.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let well_formed = bytes.len() > i + 2
                && bytes[i + 1].is_ascii_hexdigit()
                && bytes[i + 2].is_ascii_hexdigit();
            if !well_formed {
                return Err(SessionError::CorruptCookie);
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    let plus_as_space = value.replace('+', " ");
    urlencoding::decode(&plus_as_space)
        .map(|decoded| decoded.into_owned())
        .map_err(|_| SessionError::CorruptCookie)
}
