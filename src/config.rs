use std::collections::HashMap;

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Security-related settings: credential verification plus the optional
/// HSTS/CSP knobs consumed by the security-header middleware.
#[derive(Debug, Clone, Deserialize)]
pub struct SecurityConfig {
    /// HS256 secret used to verify bearer credentials. Token issuance is the
    /// identity provider's job; this service only verifies.
    pub jwt_secret: String,
    pub enable_hsts: Option<bool>,
    pub hsts_max_age: Option<u64>,
    pub hsts_include_subdomains: Option<bool>,
    /// Named CSP profiles (`default`, `upload`, ...). A route policy picks
    /// one by name; unknown names fall back to `default`.
    #[serde(default)]
    pub csp_profiles: HashMap<String, String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct CorsConfig {
    /// Exact-match origin allow-list. The single entry `"*"` allows any
    /// origin (development only).
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

/// One named fixed-window rate-limit policy.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RateLimitPolicyConfig {
    pub window_seconds: u64,
    pub max_requests: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PaginationConfig {
    /// Declared upper bound on the `limit` query field. Requests above it
    /// fail validation rather than being silently clamped.
    pub max_limit: i64,
    pub default_limit: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    /// Named policies referenced by route policies (`browse`, `mutate`, ...).
    pub rate_limits: HashMap<String, RateLimitPolicyConfig>,
    pub pagination: PaginationConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        // Fallback: parse the embedded default TOML
        let defaults: &str = include_str!("../config/default.toml");
        match ::config::Config::builder()
            .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
            .build()
        {
            Ok(cfg) => match cfg.try_deserialize() {
                Ok(app_cfg) => app_cfg,
                Err(e) => {
                    eprintln!("FATAL: Failed to deserialize default config: {}", e);
                    panic!("Failed to deserialize default config: {}", e);
                }
            },
            Err(e) => {
                eprintln!("FATAL: Failed to parse default config: {}", e);
                panic!("Failed to parse default config: {}", e);
            }
        }
    }
}

pub fn load() -> anyhow::Result<AppConfig> {
    // Load .env first (optional)
    let _ = dotenvy::dotenv();

    let defaults: &str = include_str!("../config/default.toml");
    let mut builder = ::config::Config::builder()
        .add_source(::config::File::from_str(defaults, ::config::FileFormat::Toml))
        // Optional local file: propgate.toml (in CWD)
        .add_source(::config::File::with_name("propgate").required(false));

    if let Ok(custom_path) = std::env::var("PROPGATE_CONFIG") {
        builder = builder.add_source(::config::File::with_name(&custom_path).required(false));
    }
    // Environment variables last to have highest precedence
    builder = builder.add_source(::config::Environment::with_prefix("PROPGATE").separator("__"));

    let cfg = builder.build()?;
    let app_cfg: AppConfig = cfg.try_deserialize()?;
    validate(&app_cfg)?;
    Ok(app_cfg)
}

fn validate(cfg: &AppConfig) -> anyhow::Result<()> {
    // Server
    if cfg.server.port == 0 {
        return Err(anyhow::anyhow!("invalid server.port: {}", cfg.server.port));
    }
    // Warn for privileged ports on Unix-like systems
    #[cfg(unix)]
    if cfg.server.port < 1024 {
        tracing::warn!("Using privileged port {} - may require elevated permissions", cfg.server.port);
    }

    // Security
    if cfg.security.jwt_secret.trim().len() < 16 {
        return Err(anyhow::anyhow!("security.jwt_secret must be at least 16 characters"));
    }

    // Rate limits
    if !cfg.rate_limits.contains_key("browse") || !cfg.rate_limits.contains_key("mutate") {
        return Err(anyhow::anyhow!("rate_limits must define the 'browse' and 'mutate' policies"));
    }
    for (name, policy) in &cfg.rate_limits {
        if policy.window_seconds == 0 {
            return Err(anyhow::anyhow!("rate_limits.{}.window_seconds must be > 0", name));
        }
        if policy.max_requests == 0 {
            return Err(anyhow::anyhow!("rate_limits.{}.max_requests must be > 0", name));
        }
    }

    // Pagination
    if cfg.pagination.max_limit < 1 || cfg.pagination.max_limit > 500 {
        return Err(anyhow::anyhow!("pagination.max_limit must be in 1..=500"));
    }
    if cfg.pagination.default_limit < 1 || cfg.pagination.default_limit > cfg.pagination.max_limit {
        return Err(anyhow::anyhow!("pagination.default_limit must be in 1..=max_limit"));
    }

    Ok(())
}
