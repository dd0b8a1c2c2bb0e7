//! Session tokens and credential extraction

use crate::state::UserSession;
use crate::{ApiError, ErrorCode};
use base64::{engine::general_purpose, Engine as _};
use burrow_core::{Config, User};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Lifetime of an issued session token
pub const TOKEN_TTL_HOURS: i64 = 24;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (username)
    pub sub: String,
    /// Expiration time
    pub exp: i64,
    /// Issued at
    pub iat: i64,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Email
    #[serde(default)]
    pub email: String,
}

/// Signing and verification keys derived from the persisted token secret
#[derive(Clone)]
pub struct TokenKeys {
    algorithm: Algorithm,
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl TokenKeys {
    /// Build keys for `config.token_secret` using `config.token_cipher_suite`
    pub fn from_config(config: &Config) -> Result<Self, String> {
        let algorithm = Algorithm::from_str(&config.token_cipher_suite)
            .map_err(|e| format!("unknown token cipher suite {:?}: {e}", config.token_cipher_suite))?;
        if !matches!(algorithm, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
            return Err(format!(
                "token cipher suite {:?} needs a key pair, not a shared secret",
                config.token_cipher_suite
            ));
        }

        let secret = config.token_secret.as_bytes();
        Ok(Self {
            algorithm,
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
        })
    }

    /// Issue a token for `user`, returning it with its expiry
    pub fn issue(&self, user: &User) -> Result<(String, DateTime<Utc>), ApiError> {
        let now = Utc::now();
        let expires_at = now + Duration::hours(TOKEN_TTL_HOURS);
        let claims = Claims {
            sub: user.username.clone(),
            exp: expires_at.timestamp(),
            iat: now.timestamp(),
            name: user.display_name.clone(),
            email: user.email.clone(),
        };

        let token = encode(&Header::new(self.algorithm), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))?;
        Ok((token, expires_at))
    }

    /// Validate a JWT token and extract claims
    pub fn validate(&self, token: &str) -> Result<Claims, ApiError> {
        let mut validation = Validation::new(self.algorithm);
        validation.validate_exp = true;

        decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("Token validation failed: {}", e);
                ApiError::new(ErrorCode::InvalidToken, "Invalid or expired token")
            })
    }
}

/// Convert claims to a user session
pub fn claims_to_session(claims: Claims) -> UserSession {
    UserSession {
        username: claims.sub,
        display_name: claims.name,
        email: claims.email,
        expires_at: Some(
            DateTime::from_timestamp(claims.exp, 0)
                .unwrap_or_else(|| Utc::now() + Duration::hours(1)),
        ),
    }
}

/// Extract bearer token from Authorization header
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

/// Extract `(username, password)` from a Basic Authorization header
pub fn extract_basic_credentials(auth_header: &str) -> Option<(String, String)> {
    let encoded = auth_header
        .strip_prefix("Basic ")
        .or_else(|| auth_header.strip_prefix("basic "))?;
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
