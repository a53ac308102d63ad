use std::sync::Arc;

use axum::http::Method;

use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::pipeline::auth::Authenticator;
use crate::pipeline::rate_limit::{MemoryBucketStore, RateLimiter};
use crate::pipeline::{Orchestrator, PolicySet, RoutePolicy};
use crate::routes::properties;
use crate::store::PropertyStore;
use crate::types::Role;

/// The shared application state.
///
/// Holds everything handlers and middleware need: the immutable
/// configuration, the listing store, the pipeline orchestrator with its
/// injected bucket store, and the per-route policy set built once at
/// startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: Arc<PropertyStore>,
    pub orchestrator: Arc<Orchestrator>,
    pub policies: Arc<PolicySet>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: AppConfig, store: PropertyStore) -> Self {
        let metrics = Metrics::new();
        let limiter =
            RateLimiter::new(config.rate_limits.clone(), Arc::new(MemoryBucketStore::new()));
        let authenticator = Authenticator::new(&config.security.jwt_secret);
        let orchestrator = Orchestrator::new(limiter, authenticator, metrics.clone());
        let policies = build_policies(&config);

        Self {
            config: Arc::new(config),
            store: Arc::new(store),
            orchestrator: Arc::new(orchestrator),
            policies: Arc::new(policies),
            metrics,
        }
    }
}

/// Declares the immutable per-route policies. Routes not listed here carry
/// no pipeline gate (health, metrics, version).
fn build_policies(config: &AppConfig) -> PolicySet {
    let seller_roles = [Role::Seller, Role::Agent, Role::Admin];

    let mut policies = PolicySet::new();
    policies.insert(
        Method::GET,
        "/properties",
        RoutePolicy::new("browse").schema(properties::list_schema(config)),
    );
    policies.insert(Method::GET, "/properties/{id}", RoutePolicy::new("browse"));
    policies.insert(
        Method::POST,
        "/properties",
        RoutePolicy::new("mutate")
            .authenticated(&seller_roles)
            .csrf_protected()
            .schema(properties::create_schema())
            .csp_profile("upload"),
    );
    policies.insert(
        Method::DELETE,
        "/properties/{id}",
        RoutePolicy::new("mutate").authenticated(&seller_roles).csrf_protected(),
    );
    policies
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_set_covers_the_property_routes() {
        let state = AppState::new(AppConfig::default(), PropertyStore::new());
        assert!(state.policies.get(&Method::GET, "/properties").is_some());
        assert!(state.policies.get(&Method::POST, "/properties").is_some());
        assert!(state.policies.get(&Method::GET, "/properties/{id}").is_some());
        assert!(state.policies.get(&Method::DELETE, "/properties/{id}").is_some());
        assert!(state.policies.get(&Method::GET, "/healthz").is_none());
    }

    #[test]
    fn mutating_policies_require_auth_and_csrf() {
        let state = AppState::new(AppConfig::default(), PropertyStore::new());
        let policy = state.policies.get(&Method::POST, "/properties").unwrap();
        assert!(policy.auth_required);
        assert!(policy.csrf_required);
        assert!(policy.allowed_roles.contains(&Role::Seller));
        assert!(!policy.allowed_roles.contains(&Role::Buyer));
        assert_eq!(policy.csp_profile, "upload");
    }
}
