//! Login, whoami and logout handlers

use bytes::Bytes;
use cachet_core::session::{Session, SessionError, SessionManager, SessionStore};
use http::header::{HeaderValue, CONTENT_TYPE};
use http::{HeaderMap, Method, Request, Response, StatusCode};
use http_body_util::Full;
use std::convert::Infallible;

pub type Resp = Response<Full<Bytes>>;

/// Route a request to its handler
///
/// The manager writes Set-Cookie headers into a scratch map which is copied
/// onto the response, including on error paths.
pub async fn handle_request<S, B>(
    manager: &SessionManager<S>,
    req: Request<B>,
) -> Result<Resp, Infallible>
where
    S: SessionStore + 'static,
{
    // Handlers only look at the head
    let (parts, _) = req.into_parts();
    let req = Request::from_parts(parts, ());

    let response = match (req.method(), req.uri().path()) {
        (&Method::POST, "/login") => login(manager, &req).await,
        (&Method::GET, "/me") => me(manager, &req).await,
        (&Method::POST, "/logout") => logout(manager, &req).await,
        (_, "/login" | "/me" | "/logout") => {
            error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed")
        }
        _ => error_response(StatusCode::NOT_FOUND, "Not found"),
    };

    log::debug!("{} {} -> {}", req.method(), req.uri().path(), response.status());
    Ok(response)
}

async fn login<S: SessionStore + 'static, B>(manager: &SessionManager<S>, req: &Request<B>) -> Resp {
    let username = match query_param(req, "user") {
        Some(user) if !user.is_empty() => user,
        _ => return error_response(StatusCode::BAD_REQUEST, "Missing user parameter"),
    };

    let mut headers = HeaderMap::new();
    match manager.start_session(&mut headers, req, &username).await {
        Ok(session) => {
            log::info!("User logged in: {}", session.username);
            with_headers(json_response(StatusCode::OK, session_body(&session)), headers)
        }
        Err(e) => {
            log::error!("Login failed for {}: {}", username, e);
            with_headers(session_error_response(&e), headers)
        }
    }
}

async fn me<S: SessionStore + 'static, B>(manager: &SessionManager<S>, req: &Request<B>) -> Resp {
    match manager.get_session(req).await {
        Ok(session) => json_response(StatusCode::OK, session_body(&session)),
        Err(e) => session_error_response(&e),
    }
}

async fn logout<S: SessionStore + 'static, B>(manager: &SessionManager<S>, req: &Request<B>) -> Resp {
    let mut headers = HeaderMap::new();
    let response = match manager.destroy_session(&mut headers, req).await {
        Ok(()) => json_response(
            StatusCode::OK,
            serde_json::json!({ "message": "Logged out successfully" }),
        ),
        Err(e) => {
            log::error!("Logout failed: {}", e);
            session_error_response(&e)
        }
    };
    with_headers(response, headers)
}

fn session_body(session: &Session) -> serde_json::Value {
    serde_json::json!({
        "username": session.username,
        "created_at": session.created_at,
        "expires_at": session.expires_at,
    })
}

fn session_error_response(err: &SessionError) -> Resp {
    let status = if err.is_recoverable() {
        StatusCode::UNAUTHORIZED
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error_response(status, &err.to_string())
}

fn query_param<B>(req: &Request<B>, key: &str) -> Option<String> {
    req.uri().query()?.split('&').find_map(|pair| {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        if k != key {
            return None;
        }
        urlencoding::decode(&v.replace('+', " ")).ok().map(|v| v.into_owned())
    })
}

fn with_headers(mut response: Resp, headers: HeaderMap) -> Resp {
    response.headers_mut().extend(headers);
    response
}

fn error_response(status: StatusCode, message: &str) -> Resp {
    json_response(status, serde_json::json!({ "error": message }))
}

/// Helper to create JSON response
fn json_response(status: StatusCode, body: serde_json::Value) -> Resp {
    let mut response = Response::new(Full::new(Bytes::from(body.to_string())));
    *response.status_mut() = status;
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}
