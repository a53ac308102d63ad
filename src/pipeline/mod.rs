//! The request security pipeline.
//!
//! Every policed route composes the same ordered, short-circuiting gate in
//! front of its business handler: rate limiting, then authentication and
//! role authorization, then CSRF validation, then schema validation. The
//! first failing stage produces the terminal error response; later stages
//! never run. CORS and security headers are applied by outer middleware to
//! every response, including pipeline rejections.
//!
//! The order is deliberate: rate limiting rejects abusive traffic before
//! the costlier credential verification, CSRF only matters once identity
//! context exists for a mutating route, and schema validation - the most
//! expensive stage - runs last.

pub mod auth;
pub mod cors;
pub mod csrf;
pub mod ip;
pub mod rate_limit;
pub mod schema;
pub mod security_headers;

use axum::{
    body::{Body, Bytes},
    extract::{connect_info::ConnectInfo, MatchedPath, Query, Request, State},
    http::{header, HeaderMap, Method, Uri},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use crate::error::{AppError, AppResult, FieldIssue};
use crate::metrics::Metrics;
use crate::state::AppState;
use crate::types::{Identity, Role};

use auth::Authenticator;
use rate_limit::{Decision, RateLimiter};
use schema::{Schema, ValidatedPayload};
use security_headers::CspProfile;

/// Upper bound for buffered JSON bodies; matches the router's body limit.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// The immutable security/validation configuration of one route.
///
/// Built once at startup via the builder methods and never mutated by a
/// request.
#[derive(Debug, Clone)]
pub struct RoutePolicy {
    pub rate_limit_policy: &'static str,
    pub auth_required: bool,
    pub allowed_roles: Vec<Role>,
    pub csrf_required: bool,
    pub schema: Schema,
    pub csp_profile: &'static str,
}

impl RoutePolicy {
    pub fn new(rate_limit_policy: &'static str) -> Self {
        Self {
            rate_limit_policy,
            auth_required: false,
            allowed_roles: Vec::new(),
            csrf_required: false,
            schema: Schema::empty(),
            csp_profile: "default",
        }
    }

    /// Requires a verified identity holding at least one of `roles`.
    pub fn authenticated(mut self, roles: &[Role]) -> Self {
        self.auth_required = true;
        self.allowed_roles = roles.to_vec();
        self
    }

    /// Requires a valid double-submit CSRF pair (state-mutating routes).
    pub fn csrf_protected(mut self) -> Self {
        self.csrf_required = true;
        self
    }

    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    pub fn csp_profile(mut self, profile: &'static str) -> Self {
        self.csp_profile = profile;
        self
    }
}

/// All route policies, keyed by (method, registered route pattern).
#[derive(Debug, Default)]
pub struct PolicySet {
    policies: HashMap<(Method, String), Arc<RoutePolicy>>,
}

impl PolicySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, method: Method, pattern: &str, policy: RoutePolicy) {
        self.policies.insert((method, pattern.to_string()), Arc::new(policy));
    }

    pub fn get(&self, method: &Method, pattern: &str) -> Option<Arc<RoutePolicy>> {
        self.policies.get(&(method.clone(), pattern.to_string())).cloned()
    }
}

/// What a successful pipeline run hands to the business handler.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub identity: Option<Identity>,
    pub payload: ValidatedPayload,
}

/// The raw validation input assembled from query string and JSON body.
///
/// An undecodable query string or an unparseable body does not fail the
/// request on its own: the defect is carried through the pipeline and
/// surfaced at the schema stage, so rate limiting, authentication and CSRF
/// still run first and a malformed body consumes rate-limit budget like any
/// other request.
#[derive(Debug, Clone)]
pub enum RawInput {
    Fields(Map<String, Value>),
    Invalid(FieldIssue),
}

/// Runs the ordered stages for one request against one route policy.
#[derive(Clone)]
pub struct Orchestrator {
    limiter: RateLimiter,
    authenticator: Authenticator,
    metrics: Metrics,
}

impl Orchestrator {
    pub fn new(limiter: RateLimiter, authenticator: Authenticator, metrics: Metrics) -> Self {
        Self { limiter, authenticator, metrics }
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Executes the pipeline: RateLimit -> Auth -> CSRF -> Schema.
    ///
    /// The first failing stage short-circuits with the terminal error;
    /// `raw` is the merged query/body input for schema validation.
    pub async fn execute(
        &self,
        policy: &RoutePolicy,
        headers: &HeaderMap,
        remote_ip: Option<IpAddr>,
        raw: &RawInput,
    ) -> AppResult<RequestContext> {
        self.metrics.inc_requests();

        // Stage 1: rate limit, keyed by client identity and policy name.
        let client = ip::client_key(headers, remote_ip);
        match self.limiter.check(&client, policy.rate_limit_policy).await {
            Some(Decision::Allow) => {}
            Some(Decision::Deny { retry_after_seconds }) => {
                self.metrics.inc_rate_limited();
                tracing::debug!("rate limited client {} under policy {}", client, policy.rate_limit_policy);
                return Err(AppError::RateLimited { retry_after_seconds });
            }
            None => {
                return Err(AppError::Internal(anyhow::anyhow!(
                    "route policy references unknown rate-limit policy '{}'",
                    policy.rate_limit_policy
                )));
            }
        }

        // Stage 2: authentication, then role authorization. Never conflated:
        // a bad credential is 401, a good credential with wrong roles is 403.
        let identity = if policy.auth_required {
            let authorization =
                headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok());
            let identity = self.authenticator.authenticate(authorization).map_err(|e| {
                self.metrics.inc_unauthenticated();
                e
            })?;
            auth::authorize(&identity, &policy.allowed_roles).map_err(|e| {
                self.metrics.inc_forbidden();
                e
            })?;
            Some(identity)
        } else {
            None
        };

        // Stage 3: CSRF double-submit check for mutating routes.
        if policy.csrf_required && !csrf::validate_headers(headers) {
            self.metrics.inc_csrf_rejected();
            return Err(AppError::CsrfRejected);
        }

        // Stage 4: schema validation, total over all declared fields. Input
        // assembly defects surface here, never earlier.
        let payload = match raw {
            RawInput::Fields(fields) => policy.schema.validate(fields).map_err(|issues| {
                self.metrics.inc_validation_failed();
                AppError::ValidationFailed(issues)
            })?,
            RawInput::Invalid(issue) => {
                self.metrics.inc_validation_failed();
                return Err(AppError::ValidationFailed(vec![issue.clone()]));
            }
        };

        Ok(RequestContext { identity, payload })
    }
}

/// Router-wide gate middleware.
///
/// Looks up the route policy for the matched pattern, merges query
/// parameters and JSON body into the raw validation input, runs the
/// orchestrator, and either stores the [`RequestContext`] in the request
/// extensions for the handler or returns the terminal error response.
/// Either way the response is tagged with the route's CSP profile.
pub async fn policy_gate(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let Some(matched) = req.extensions().get::<MatchedPath>().cloned() else {
        return next.run(req).await;
    };
    let Some(policy) = state.policies.get(&method, matched.as_str()) else {
        // Unpoliced route (health, metrics): no gate.
        return next.run(req).await;
    };

    let (mut parts, body) = req.into_parts();
    let remote_ip =
        parts.extensions.get::<ConnectInfo<SocketAddr>>().map(|info| info.0.ip());

    // Input assembly never short-circuits: a defect is carried into the
    // orchestrator and reported at the schema stage, after rate limiting,
    // auth and CSRF have run.
    let (body_bytes, raw) = match axum::body::to_bytes(body, MAX_BODY_BYTES).await {
        Ok(bytes) => {
            let raw = assemble_raw(&parts.uri, &parts.headers, &method, &bytes);
            (bytes, raw)
        }
        Err(_) => {
            (Bytes::new(), RawInput::Invalid(FieldIssue::new("body", "could not be read")))
        }
    };

    match state.orchestrator.execute(&policy, &parts.headers, remote_ip, &raw).await {
        Ok(ctx) => {
            parts.extensions.insert(ctx);
            let req = Request::from_parts(parts, Body::from(body_bytes));
            tagged(next.run(req).await, policy.csp_profile)
        }
        Err(err) => tagged(err.into_response(), policy.csp_profile),
    }
}

/// Merges decoded query parameters and a buffered JSON body into the raw
/// schema input, or records the first assembly defect.
fn assemble_raw(uri: &Uri, headers: &HeaderMap, method: &Method, body: &[u8]) -> RawInput {
    let mut fields: Map<String, Value> = Map::new();
    match Query::<HashMap<String, String>>::try_from_uri(uri) {
        Ok(Query(query)) => {
            for (k, v) in query {
                fields.insert(k, Value::String(v));
            }
        }
        Err(_) => return RawInput::Invalid(FieldIssue::new("query", "malformed query string")),
    }
    if !body.is_empty() && wants_json_body(headers, method) {
        match serde_json::from_slice::<Value>(body) {
            Ok(Value::Object(obj)) => fields.extend(obj),
            Ok(_) => return RawInput::Invalid(FieldIssue::new("body", "must be a JSON object")),
            Err(_) => return RawInput::Invalid(FieldIssue::new("body", "malformed JSON")),
        }
    }
    RawInput::Fields(fields)
}

fn wants_json_body(headers: &HeaderMap, method: &Method) -> bool {
    if !matches!(*method, Method::POST | Method::PUT | Method::PATCH | Method::DELETE) {
        return false;
    }
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|ct| ct.starts_with("application/json"))
        .unwrap_or(false)
}

fn tagged(mut res: Response, profile: &'static str) -> Response {
    res.extensions_mut().insert(CspProfile(profile));
    res
}
