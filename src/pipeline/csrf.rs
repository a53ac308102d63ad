//! Cross-Site Request Forgery protection via double-submit tokens.
//!
//! A session-bound secret travels in the `csrf_token` cookie; the client
//! echoes it in the `X-CSRF-Token` header on state-mutating requests.
//! The pair is valid iff both are present, non-empty and equal. Equality
//! proves the request originated from a context that can read the cookie.

use axum::http::HeaderMap;

pub const CSRF_HEADER: &str = "x-csrf-token";
pub const CSRF_COOKIE: &str = "csrf_token";

/// Validates a double-submit pair. Both tokens must be present, non-empty
/// and equal.
pub fn validate_pair(session_token: Option<&str>, request_token: Option<&str>) -> bool {
    match (session_token, request_token) {
        (Some(session), Some(request)) if !session.is_empty() && !request.is_empty() => {
            constant_time_eq(session.as_bytes(), request.as_bytes())
        }
        _ => false,
    }
}

/// Pulls the session and request tokens out of the headers and validates.
pub fn validate_headers(headers: &HeaderMap) -> bool {
    let request_token = headers.get(CSRF_HEADER).and_then(|v| v.to_str().ok());
    let session_token = cookie_value(headers, CSRF_COOKIE);
    validate_pair(session_token.as_deref(), request_token)
}

/// Constant-time byte comparison to avoid leaking the match position through
/// timing. Length is checked first; length itself is not secret here.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

/// Minimal cookie-header lookup. The pipeline needs exactly one value; a
/// full cookie-jar layer would be overkill.
fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    for pair in raw.split(';') {
        let mut parts = pair.trim().splitn(2, '=');
        if parts.next() == Some(name) {
            return parts.next().map(|v| v.to_string());
        }
    }
    None
}
