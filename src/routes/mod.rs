//! HTTP route handlers.
//!
//! - `health`: liveness, readiness, metrics and version endpoints (no
//!   pipeline gate)
//! - `properties`: the property listing API, fully policed by the pipeline

pub mod health;
pub mod properties;
