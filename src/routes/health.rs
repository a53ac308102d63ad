use crate::state::AppState;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

// Health check endpoint - lightweight, no pipeline gate
pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// Readiness probe: the store lock must be acquirable within the timeout
pub async fn readyz(State(state): State<AppState>) -> impl IntoResponse {
    match tokio::time::timeout(std::time::Duration::from_secs(5), state.store.count()).await {
        Ok(count) => (StatusCode::OK, format!("ready ({} listings)", count)).into_response(),
        Err(_) => (StatusCode::SERVICE_UNAVAILABLE, "not ready: timeout").into_response(),
    }
}

// Metrics endpoint: returns JSON snapshot
pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    let snapshot = state.metrics.get_snapshot();
    Json(snapshot)
}

// Prometheus-compatible text exposition format
pub async fn metrics_prometheus(State(state): State<AppState>) -> impl IntoResponse {
    let m = state.metrics.get_snapshot();
    let body = format!(
        "# HELP propgate_requests_total Pipeline executions\n# TYPE propgate_requests_total counter\npropgate_requests_total {}\n\
# HELP propgate_rate_limited_total Requests denied by rate limiting\n# TYPE propgate_rate_limited_total counter\npropgate_rate_limited_total {}\n\
# HELP propgate_unauthenticated_total Requests rejected for missing/invalid credentials\n# TYPE propgate_unauthenticated_total counter\npropgate_unauthenticated_total {}\n\
# HELP propgate_forbidden_total Requests rejected by role authorization\n# TYPE propgate_forbidden_total counter\npropgate_forbidden_total {}\n\
# HELP propgate_csrf_rejected_total Requests rejected by CSRF validation\n# TYPE propgate_csrf_rejected_total counter\npropgate_csrf_rejected_total {}\n\
# HELP propgate_validation_failed_total Requests rejected by schema validation\n# TYPE propgate_validation_failed_total counter\npropgate_validation_failed_total {}\n\
# HELP propgate_uptime_seconds Uptime seconds\n# TYPE propgate_uptime_seconds gauge\npropgate_uptime_seconds {}\n",
        m.requests_total,
        m.rate_limited_total,
        m.unauthenticated_total,
        m.forbidden_total,
        m.csrf_rejected_total,
        m.validation_failed_total,
        m.uptime_seconds,
    );
    ([(header::CONTENT_TYPE, "text/plain; version=0.0.4")], body)
}

// Version/Build info endpoint (JSON)
pub async fn version() -> impl IntoResponse {
    let body = serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION"),
        "package": {
            "description": env!("CARGO_PKG_DESCRIPTION"),
            "authors": env!("CARGO_PKG_AUTHORS"),
            "license": env!("CARGO_PKG_LICENSE"),
        },
        "build": {
            "profile": if cfg!(debug_assertions) { "debug" } else { "release" },
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
        }
    });
    (StatusCode::OK, Json(body))
}
