//! HTTP middleware for authentication and access logging

use crate::auth::{claims_to_session, extract_basic_credentials, extract_bearer_token, TokenKeys};
use crate::module::ModuleError;
use crate::state::{ModuleContext, UserSession};
use crate::{ApiError, ErrorCode};
use axum::{
    body::Body,
    extract::State,
    http::{header, Request},
    middleware::Next,
    response::Response,
};
use burrow_core::CredentialStore;
use std::sync::Arc;

/// State for `require_session`: how tokens and passwords are checked
#[derive(Clone)]
pub struct SessionGuard {
    pub tokens: Arc<TokenKeys>,
    pub credentials: Arc<CredentialStore>,
}

impl SessionGuard {
    /// Build a guard from the shared providers
    pub fn from_context(ctx: &ModuleContext) -> Result<Self, ModuleError> {
        Ok(Self {
            tokens: Arc::new(TokenKeys::from_config(&ctx.config).map_err(ModuleError::Config)?),
            credentials: Arc::clone(&ctx.credentials),
        })
    }

    /// Resolve an Authorization header value into a session
    pub fn authenticate(&self, auth_header: &str) -> Result<UserSession, ApiError> {
        if let Some(token) = extract_bearer_token(auth_header) {
            let session = claims_to_session(self.tokens.validate(token)?);
            if session.is_expired() {
                return Err(ApiError::new(ErrorCode::InvalidToken, "Token has expired"));
            }
            return Ok(session);
        }

        if let Some((username, password)) = extract_basic_credentials(auth_header) {
            return self
                .credentials
                .verify(&username, &password)
                .map(|user| UserSession::from_user(&user))
                .ok_or_else(|| ApiError::new(ErrorCode::InvalidCredentials, "Invalid username or password"));
        }

        Err(ApiError::new(
            ErrorCode::Unauthorized,
            "Invalid Authorization header format",
        ))
    }
}

/// Authentication middleware; inserts a `UserSession` extension on success
pub async fn require_session(
    State(guard): State<SessionGuard>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .ok_or_else(|| ApiError::new(ErrorCode::Unauthorized, "Authentication required"))?;

    // Basic credentials cost a bcrypt verification; keep it off the runtime threads.
    let session = tokio::task::spawn_blocking(move || guard.authenticate(&auth_header))
        .await
        .map_err(|e| ApiError::Internal(format!("authentication task failed: {e}")))??;
    request.extensions_mut().insert(session);

    Ok(next.run(request).await)
}

/// Access logging middleware
pub async fn access_log_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration = start.elapsed();
    let status = response.status();

    tracing::info!(
        target: "burrow_server::access",
        method = %method,
        uri = %uri,
        status = %status.as_u16(),
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    response
}
