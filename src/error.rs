use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::error::Error;
use std::fmt;

/// One violated constraint on one field, as reported by schema validation.
///
/// Validation is total: a rejected request carries every violated field, not
/// just the first one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldIssue {
    pub field: String,
    pub issue: String,
}

impl FieldIssue {
    pub fn new(field: impl Into<String>, issue: impl Into<String>) -> Self {
        Self { field: field.into(), issue: issue.into() }
    }
}

/// The primary error type for the application.
///
/// Every pipeline stage failure maps onto exactly one variant; the variant
/// selects the HTTP status and the stable `kind` string of the error
/// envelope, so clients can branch on it programmatically.
#[derive(Debug)]
pub enum AppError {
    /// Too many requests within the client's fixed window.
    RateLimited {
        /// Seconds until the window resets.
        retry_after_seconds: u64,
    },
    /// Missing, malformed, expired or otherwise unverifiable credential.
    Unauthenticated(String),
    /// Valid credential, but no role intersection with the route's allow-list.
    Forbidden(String),
    /// Double-submit CSRF token pair missing or mismatched.
    CsrfRejected,
    /// One or more fields violated their declared constraints.
    ValidationFailed(Vec<FieldIssue>),
    /// For when a requested resource is not found.
    NotFound(String),
    /// Catch-all for unexpected failures. Logged server-side with an error id;
    /// the client only ever sees a generic message.
    Internal(anyhow::Error),
}

impl AppError {
    pub fn validation(field: impl Into<String>, issue: impl Into<String>) -> Self {
        AppError::ValidationFailed(vec![FieldIssue::new(field, issue)])
    }

    /// The stable `kind` string exposed in the error envelope.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::RateLimited { .. } => "RateLimited",
            AppError::Unauthenticated(_) => "Unauthenticated",
            AppError::Forbidden(_) => "Forbidden",
            AppError::CsrfRejected => "CSRFRejected",
            AppError::ValidationFailed(_) => "ValidationFailed",
            AppError::NotFound(_) => "NotFound",
            AppError::Internal(_) => "Internal",
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::RateLimited { retry_after_seconds } => {
                write!(f, "Rate limited. Retry after {} seconds", retry_after_seconds)
            }
            AppError::Unauthenticated(msg) => write!(f, "Unauthenticated: {}", msg),
            AppError::Forbidden(msg) => write!(f, "Forbidden: {}", msg),
            AppError::CsrfRejected => write!(f, "CSRF token missing or invalid"),
            AppError::ValidationFailed(issues) => {
                write!(f, "Validation failed for {} field(s)", issues.len())
            }
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Internal(e) => write!(f, "Internal error: {}", e),
        }
    }
}

impl Error for AppError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            AppError::Internal(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut retry_after: Option<u64> = None;

        let (status, kind, message, fields) = match self {
            AppError::RateLimited { retry_after_seconds } => {
                retry_after = Some(retry_after_seconds);
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    "RateLimited",
                    format!("Too many requests. Please retry after {} seconds", retry_after_seconds),
                    None,
                )
            }
            AppError::Unauthenticated(msg) => (StatusCode::UNAUTHORIZED, "Unauthenticated", msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, "Forbidden", msg, None),
            AppError::CsrfRejected => (
                StatusCode::FORBIDDEN,
                "CSRFRejected",
                "CSRF token missing or invalid".to_string(),
                None,
            ),
            AppError::ValidationFailed(issues) => (
                StatusCode::BAD_REQUEST,
                "ValidationFailed",
                "One or more fields failed validation".to_string(),
                Some(issues),
            ),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NotFound", msg, None),
            AppError::Internal(e) => {
                let error_id = uuid::Uuid::new_v4();
                tracing::error!("Internal error (id {}): {:?}", error_id, e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal",
                    "An internal server error occurred".to_string(),
                    None,
                )
            }
        };

        let mut error = json!({
            "kind": kind,
            "message": message,
        });
        if let Some(fields) = fields {
            error["fields"] = json!(fields);
        }
        let body = json!({
            "success": false,
            "error": error,
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let mut res = (status, Json(body)).into_response();
        if let Some(secs) = retry_after {
            if let Ok(val) = HeaderValue::from_str(&secs.to_string()) {
                res.headers_mut().insert(header::RETRY_AFTER, val);
            }
        }
        res
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

/// A type alias for `Result<T, AppError>`, used throughout the application.
pub type AppResult<T> = Result<T, AppError>;
