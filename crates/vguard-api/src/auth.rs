//! Bearer token authentication.
//!
//! Access tokens are HS256 JWTs minted by the identity service. Claims carry
//! the user, the tenant the request is scoped to, and a coarse role.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use vguard_models::TenantId;

use crate::error::ApiError;
use crate::state::AppState;

/// Decoded access token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User ID
    pub sub: String,
    /// Tenant the token is scoped to
    pub tenant_id: String,
    /// Coarse role: "admin" or "member"
    #[serde(default = "default_role")]
    pub role: String,
    /// Expiration
    pub exp: i64,
    /// Issued at
    pub iat: i64,
}

fn default_role() -> String {
    "member".to_string()
}

/// Authenticated user extracted from the request.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub tenant_id: TenantId,
    pub role: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == "admin"
    }
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.sub,
            tenant_id: TenantId::from_string(claims.tenant_id),
            role: claims.role,
        }
    }
}

/// Verify a bearer token against the configured secret.
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, ApiError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    let token_data = decode::<Claims>(token, &key, &validation)
        .map_err(|e| ApiError::unauthorized(format!("Token validation failed: {e}")))?;

    Ok(token_data.claims)
}

#[axum::async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::unauthorized("Missing Authorization header"))?;

        let token = auth_header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Invalid Authorization header format"))?;

        let claims = verify_token(token, &state.config.jwt_secret)?;

        Ok(AuthUser::from(claims))
    }
}
