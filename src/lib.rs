//! # Propgate Backend Library
//!
//! Propgate is a property-listing REST API built around a composable request
//! security pipeline. Every policed endpoint passes through the same
//! ordered, short-circuiting gate - rate limiting, authentication and role
//! authorization, CSRF validation and schema validation - before any
//! business logic runs, and every response is wrapped with CORS and
//! security-header stages on the way out.
//!
//! ## Architecture
//!
//! The application is built using:
//! - **Axum**: Modern web framework for HTTP server and routing
//! - **Tokio**: Async runtime for concurrent operations
//! - **jsonwebtoken**: Stateless bearer credential verification
//! - **Serde**: Serialization/deserialization for JSON APIs
//!
//! ## Core Components
//!
//! - [`config`]: Application configuration management
//! - [`error`]: Centralized error handling and the JSON error envelope
//! - [`metrics`]: Pipeline outcome counters
//! - [`pipeline`]: The security pipeline - stages, route policies and the
//!   orchestrator
//! - [`routes`]: HTTP API endpoint handlers
//! - [`store`]: In-memory property listing store
//! - [`state`]: Shared application state and route policy wiring
//! - [`types`]: Data transfer objects and shared type definitions

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::middleware::from_fn_with_state;
use axum::{
    routing::get,
    Router,
};
use tower_http::trace::TraceLayer;

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod routes;
pub mod state;
pub mod store;
pub mod types;

#[cfg(test)]
mod tests;

use pipeline::cors::CorsPolicy;
use pipeline::security_headers::SecurityProfiles;
use state::AppState;

/// Builds the full router with the pipeline layered around it.
///
/// Layer order, outermost first: security headers, trace, CORS (terminal
/// for preflights), policy gate, routes. CORS and security headers wrap
/// every response the gate or a handler produces.
pub fn build_router(state: AppState) -> Router {
    let profiles = Arc::new(SecurityProfiles::from_config(&state.config.security));
    let cors = Arc::new(CorsPolicy::new(state.config.cors.allowed_origins.clone()));

    Router::new()
        .route("/healthz", get(routes::health::healthz))
        .route("/readyz", get(routes::health::readyz))
        .route("/metrics", get(routes::health::metrics))
        .route("/metrics/prometheus", get(routes::health::metrics_prometheus))
        .route("/version", get(routes::health::version))
        .route(
            "/properties",
            get(routes::properties::list_properties).post(routes::properties::create_property),
        )
        .route(
            "/properties/{id}",
            get(routes::properties::get_property).delete(routes::properties::delete_property),
        )
        .with_state(state.clone())
        // Global body limit (10 MB) - protects against oversized requests
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(from_fn_with_state(state, pipeline::policy_gate))
        .layer(from_fn_with_state(cors, pipeline::cors::cors_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(from_fn_with_state(profiles, pipeline::security_headers::security_headers_middleware))
}
