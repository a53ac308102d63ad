//! Bearer credential verification and role authorization.
//!
//! Authentication is stateless: the credential's signature and expiry are
//! verified locally (HS256), and `userId`/`roles` are extracted from the
//! claims. No session store is consulted. Authorization is a pure
//! set-membership check and never runs without a verified identity, so a
//! missing credential can never surface as `Forbidden`.

use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::types::{Identity, Role};

/// Claims carried by a bearer credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub roles: Vec<Role>,
    pub exp: usize,
}

/// Verifies bearer credentials against a shared HS256 secret.
#[derive(Clone)]
pub struct Authenticator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl Authenticator {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }

    /// Verifies the `Authorization` header value and derives the identity.
    ///
    /// Missing header, non-bearer scheme, bad signature and expired token all
    /// fail with `Unauthenticated`; the reasons differ only in the message.
    pub fn authenticate(&self, authorization: Option<&str>) -> Result<Identity, AppError> {
        let header = authorization
            .ok_or_else(|| AppError::Unauthenticated("Missing Authorization header".to_string()))?;

        let token = header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::Unauthenticated("Authorization header must use the Bearer scheme".to_string())
        })?;
        if token.is_empty() {
            return Err(AppError::Unauthenticated("Empty bearer token".to_string()));
        }

        let data = decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    AppError::Unauthenticated("Token expired".to_string())
                }
                _ => AppError::Unauthenticated("Invalid token".to_string()),
            })?;

        Ok(Identity { user_id: data.claims.sub, roles: data.claims.roles })
    }
}

/// Role-set membership check: the identity must hold at least one of the
/// route's allowed roles.
pub fn authorize(identity: &Identity, allowed_roles: &[Role]) -> Result<(), AppError> {
    if allowed_roles.is_empty() || identity.has_any_role(allowed_roles) {
        Ok(())
    } else {
        Err(AppError::Forbidden("Insufficient role for this operation".to_string()))
    }
}

#[cfg(test)]
pub fn mint_token(secret: &str, sub: &str, roles: &[Role], expires_in_secs: i64) -> String {
    use jsonwebtoken::{encode, EncodingKey, Header};
    let exp = (chrono::Utc::now().timestamp() + expires_in_secs) as usize;
    let claims = Claims { sub: sub.to_string(), roles: roles.to_vec(), exp };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
}
