//! Security headers middleware for HTTP responses.
//!
//! Applies a fixed set of security headers to every outgoing response,
//! success or failure, without touching status or body. The
//! `Content-Security-Policy` value comes from a named profile: route
//! policies pick one (e.g. `default`, `upload`) and the gate middleware tags
//! the response with the chosen name; everything else gets `default`.

use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::SecurityConfig;

/// Response-extension tag naming the CSP profile to apply.
#[derive(Debug, Clone, Copy)]
pub struct CspProfile(pub &'static str);

/// Named header profiles resolved once at startup.
#[derive(Debug, Clone)]
pub struct SecurityProfiles {
    csp_by_profile: HashMap<String, HeaderValue>,
    hsts: Option<HeaderValue>,
}

impl SecurityProfiles {
    pub fn from_config(cfg: &SecurityConfig) -> Self {
        let mut csp_by_profile = HashMap::new();
        for (name, value) in &cfg.csp_profiles {
            if value.trim().is_empty() {
                continue;
            }
            match HeaderValue::from_str(value) {
                Ok(v) => {
                    csp_by_profile.insert(name.clone(), v);
                }
                Err(_) => {
                    tracing::warn!("Ignoring unparseable CSP profile '{}'", name);
                }
            }
        }

        let hsts = if cfg.enable_hsts.unwrap_or(false) {
            let max_age = cfg.hsts_max_age.unwrap_or(31536000); // 1 year
            let include_sub =
                if cfg.hsts_include_subdomains.unwrap_or(false) { "; includeSubDomains" } else { "" };
            let value = format!("max-age={}{}", max_age, include_sub);
            Some(HeaderValue::from_str(&value).unwrap_or(HeaderValue::from_static("max-age=31536000")))
        } else {
            None
        };

        Self { csp_by_profile, hsts }
    }

    fn csp(&self, profile: &str) -> Option<&HeaderValue> {
        self.csp_by_profile.get(profile).or_else(|| self.csp_by_profile.get("default"))
    }
}

/// Adds standard security-related HTTP headers to all responses.
pub async fn security_headers_middleware(
    State(profiles): State<Arc<SecurityProfiles>>,
    req: Request,
    next: Next,
) -> Response {
    let mut res = next.run(req).await;

    let profile = res.extensions().get::<CspProfile>().map(|p| p.0).unwrap_or("default");
    let headers = res.headers_mut();

    // X-Content-Type-Options: nosniff
    headers.insert(HeaderName::from_static("x-content-type-options"), HeaderValue::from_static("nosniff"));

    // X-Frame-Options: DENY
    headers.insert(HeaderName::from_static("x-frame-options"), HeaderValue::from_static("DENY"));

    // Referrer-Policy: no-referrer
    headers.insert(HeaderName::from_static("referrer-policy"), HeaderValue::from_static("no-referrer"));

    // Permissions-Policy: disable sensitive APIs by default
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("geolocation=(), microphone=(), camera=()"),
    );

    if let Some(hsts) = profiles.hsts.clone() {
        headers.insert(HeaderName::from_static("strict-transport-security"), hsts);
    }

    if let Some(csp) = profiles.csp(profile).cloned() {
        headers.insert(HeaderName::from_static("content-security-policy"), csp);
    }

    res
}
