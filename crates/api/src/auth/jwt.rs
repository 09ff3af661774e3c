//! JWT access-token generation and validation.
//!
//! Tokens are HS256-signed and self-contained: the [`Claims`] payload holds
//! the whole [`Identity`], so no lookup is needed to authorize a request and
//! there is no server-side revocation list. Logging out is a client-side
//! concern.

use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use satscan_core::identity::Identity;
use satscan_core::types::DbId;
use uuid::Uuid;

/// JWT claims embedded in every access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// The user's internal database id.
    pub id: DbId,
    pub username: String,
    pub is_admin: bool,
    /// Expiration time (UTC Unix timestamp).
    pub exp: i64,
    /// Issued-at time (UTC Unix timestamp).
    pub iat: i64,
    /// Unique token identifier (UUID v4).
    pub jti: String,
}

impl Claims {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
            is_admin: self.is_admin,
        }
    }
}

/// Configuration for JWT token generation and validation.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// HMAC-SHA256 secret used to sign and verify tokens.
    pub secret: String,
    /// Access token lifetime in seconds (default: 3600).
    pub access_token_expiry_secs: i64,
}

/// Default access token lifetime in seconds.
const DEFAULT_ACCESS_EXPIRY_SECS: i64 = 3600;

impl JwtConfig {
    /// Load JWT configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default |
    /// |----------------------------|----------|---------|
    /// | `JWT_SECRET_KEY`           | **yes**  | --      |
    /// | `JWT_ACCESS_TOKEN_EXPIRES` | no       | `3600`  |
    ///
    /// # Panics
    ///
    /// Panics if `JWT_SECRET_KEY` is not set or is empty.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET_KEY")
            .expect("JWT_SECRET_KEY must be set in the environment");
        assert!(!secret.is_empty(), "JWT_SECRET_KEY must not be empty");

        let access_token_expiry_secs: i64 = std::env::var("JWT_ACCESS_TOKEN_EXPIRES")
            .unwrap_or_else(|_| DEFAULT_ACCESS_EXPIRY_SECS.to_string())
            .parse()
            .expect("JWT_ACCESS_TOKEN_EXPIRES must be a valid i64");

        Self {
            secret,
            access_token_expiry_secs,
        }
    }
}

/// Why a presented token was rejected.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("Token has expired")]
    Expired,
    #[error("Invalid token")]
    Invalid,
}

/// Issue an HS256 access token for `identity`.
pub fn generate_access_token(
    identity: &Identity,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();

    let claims = Claims {
        id: identity.id,
        username: identity.username.clone(),
        is_admin: identity.is_admin,
        exp: now + config.access_token_expiry_secs,
        iat: now,
        jti: Uuid::new_v4().to_string(),
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Validate a token's signature and expiry and return its claims.
pub fn validate_token(token: &str, config: &JwtConfig) -> Result<Claims, TokenError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &Validation::default(), // HS256, validates exp
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::Invalid,
    })
}
