//! CORS origin policy and preflight handling.
//!
//! `OPTIONS` requests are answered directly with a 200, an empty body and
//! the `Access-Control-Allow-*` headers, bypassing every other stage. For
//! all other requests the decision's headers are appended to whatever
//! response the pipeline produced - success or failure - so browser
//! clients can always read the error envelope.

use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization, X-CSRF-Token";
const MAX_AGE: &str = "3600";

/// Exact-match origin allow-list. `"*"` in the configured list allows any
/// origin (the concrete origin is still echoed back, since responses may
/// carry credentials).
#[derive(Debug, Clone)]
pub struct CorsPolicy {
    allowed_origins: Vec<String>,
    allow_any: bool,
}

/// The outcome of an origin check: whether it is allowed, and which headers
/// to emit on the response.
#[derive(Debug, Clone)]
pub struct CorsDecision {
    pub allowed: bool,
    pub headers: Vec<(HeaderName, HeaderValue)>,
}

impl CorsPolicy {
    pub fn new(allowed_origins: Vec<String>) -> Self {
        let allow_any = allowed_origins.iter().any(|o| o == "*");
        Self { allowed_origins, allow_any }
    }

    fn origin_allowed(&self, origin: &str) -> bool {
        self.allow_any || self.allowed_origins.iter().any(|o| o == origin)
    }

    /// Decides for a request `Origin` header. No origin (same-origin or
    /// non-browser client) emits no CORS headers and is not a rejection.
    pub fn decide(&self, origin: Option<&str>) -> CorsDecision {
        let Some(origin) = origin else {
            return CorsDecision { allowed: true, headers: Vec::new() };
        };
        if !self.origin_allowed(origin) {
            // Disallowed origins simply get no Allow-Origin header; the
            // browser enforces the rest.
            return CorsDecision { allowed: false, headers: Vec::new() };
        }
        let mut headers = Vec::new();
        if let Ok(value) = HeaderValue::from_str(origin) {
            headers.push((header::ACCESS_CONTROL_ALLOW_ORIGIN, value));
            headers.push((header::ACCESS_CONTROL_ALLOW_CREDENTIALS, HeaderValue::from_static("true")));
            headers.push((header::VARY, HeaderValue::from_static("Origin")));
        }
        CorsDecision { allowed: true, headers }
    }

    /// Synthesizes the terminal preflight response: 200, empty body, CORS
    /// headers only.
    pub fn preflight(&self, origin: Option<&str>) -> Response {
        let decision = self.decide(origin);
        let mut res = Response::builder()
            .status(StatusCode::OK)
            .body(Body::empty())
            .unwrap_or_default();
        let headers = res.headers_mut();
        for (name, value) in decision.headers {
            headers.insert(name, value);
        }
        if decision.allowed && origin.is_some() {
            headers.insert(header::ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOW_METHODS));
            headers.insert(header::ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static(ALLOW_HEADERS));
            headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));
        }
        res
    }
}

/// Middleware wrapping the whole router: answers preflights terminally and
/// appends CORS headers to every other response.
pub async fn cors_middleware(
    State(policy): State<Arc<CorsPolicy>>,
    req: Request,
    next: Next,
) -> Response {
    let origin = req
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    if req.method() == Method::OPTIONS {
        return policy.preflight(origin.as_deref());
    }

    let decision = policy.decide(origin.as_deref());
    let mut res = next.run(req).await;
    let headers = res.headers_mut();
    for (name, value) in decision.headers {
        headers.insert(name, value);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> CorsPolicy {
        CorsPolicy::new(vec!["http://localhost:3000".to_string()])
    }

    #[test]
    fn allowed_origin_gets_echoed() {
        let decision = policy().decide(Some("http://localhost:3000"));
        assert!(decision.allowed);
        assert!(decision
            .headers
            .iter()
            .any(|(n, v)| n == header::ACCESS_CONTROL_ALLOW_ORIGIN
                && v == "http://localhost:3000"));
    }

    #[test]
    fn disallowed_origin_gets_no_headers() {
        let decision = policy().decide(Some("https://evil.example"));
        assert!(!decision.allowed);
        assert!(decision.headers.is_empty());
    }

    #[test]
    fn absent_origin_is_not_a_rejection() {
        let decision = policy().decide(None);
        assert!(decision.allowed);
        assert!(decision.headers.is_empty());
    }

    #[test]
    fn wildcard_allows_any_origin() {
        let policy = CorsPolicy::new(vec!["*".to_string()]);
        let decision = policy.decide(Some("https://anything.example"));
        assert!(decision.allowed);
        assert!(decision
            .headers
            .iter()
            .any(|(n, v)| n == header::ACCESS_CONTROL_ALLOW_ORIGIN
                && v == "https://anything.example"));
    }

    #[test]
    fn preflight_is_200_with_no_body_and_cors_headers() {
        let res = policy().preflight(Some("http://localhost:3000"));
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key(header::ACCESS_CONTROL_ALLOW_METHODS));
        assert!(res.headers().contains_key(header::ACCESS_CONTROL_ALLOW_ORIGIN));
    }
}
