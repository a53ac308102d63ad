use axum::http::{header, HeaderMap};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::net::IpAddr;

/// Extract client IP from proxy headers and optional transport metadata.
pub fn extract_ip_from_headers(headers: &HeaderMap, fallback: Option<IpAddr>) -> IpAddr {
    if let Some(h) = headers.get("x-forwarded-for").and_then(|hv| hv.to_str().ok()) {
        if let Some(first) = h.split(',').next() {
            if let Ok(ip) = first.trim().parse::<IpAddr>() {
                return ip;
            }
        }
    }
    if let Some(h) = headers.get("x-real-ip").and_then(|hv| hv.to_str().ok()) {
        if let Ok(ip) = h.parse::<IpAddr>() {
            return ip;
        }
    }
    if let Some(ip) = fallback {
        return ip;
    }
    IpAddr::from([127, 0, 0, 1])
}

/// Derives the rate-limit client key for a request.
///
/// The key is the client IP, combined with a short fingerprint of the bearer
/// credential when one is present, so authenticated and anonymous traffic
/// from the same address are counted independently. Rate limiting runs
/// before authentication, so the fingerprint is taken from the raw
/// credential rather than a verified identity.
pub fn client_key(headers: &HeaderMap, fallback: Option<IpAddr>) -> String {
    let ip = extract_ip_from_headers(headers, fallback);
    match bearer_fingerprint(headers) {
        Some(fp) => format!("{}#{:016x}", ip, fp),
        None => ip.to_string(),
    }
}

fn bearer_fingerprint(headers: &HeaderMap) -> Option<u64> {
    let auth = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = auth.strip_prefix("Bearer ")?;
    if token.is_empty() {
        return None;
    }
    let mut hasher = DefaultHasher::new();
    token.hash(&mut hasher);
    Some(hasher.finish())
}
