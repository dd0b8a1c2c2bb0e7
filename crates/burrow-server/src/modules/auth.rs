//! Authentication/session API

use crate::auth::TokenKeys;
use crate::middleware::{require_session, SessionGuard};
use crate::module::{ApiModule, ModuleError};
use crate::state::{ModuleContext, UserSession};
use crate::{ApiError, ErrorCode};
use axum::{
    extract::{Extension, State},
    middleware as axum_middleware,
    routing::{get, post},
    Json, Router,
};
use burrow_core::CredentialStore;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// URL prefix of the auth API
pub const MOUNT_PATH: &str = "/auth";

/// Issues session tokens for valid credentials
pub struct AuthModule {
    state: AuthState,
    guard: SessionGuard,
}

#[derive(Clone)]
struct AuthState {
    tokens: Arc<TokenKeys>,
    credentials: Arc<CredentialStore>,
}

impl AuthModule {
    pub fn new(ctx: &ModuleContext) -> Result<Self, ModuleError> {
        let guard = SessionGuard::from_context(ctx)?;
        Ok(Self {
            state: AuthState {
                tokens: Arc::clone(&guard.tokens),
                credentials: Arc::clone(&ctx.credentials),
            },
            guard,
        })
    }
}

impl ApiModule for AuthModule {
    fn name(&self) -> &str {
        "auth"
    }

    fn mount_path(&self) -> &str {
        MOUNT_PATH
    }

    fn start(&self, router: Router) -> Result<Router, ModuleError> {
        let protected = Router::new()
            .route("/auth/session", get(current_session))
            .route_layer(axum_middleware::from_fn_with_state(
                self.guard.clone(),
                require_session,
            ));

        let routes = Router::new()
            .route("/auth/login", post(login))
            .merge(protected)
            .with_state(self.state.clone());

        Ok(router.merge(routes))
    }
}

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Public user fields
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    pub username: String,
    pub display_name: String,
    pub email: String,
}

/// Login response body
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub user: UserInfo,
}

/// POST /auth/login - Exchange credentials for a session token
async fn login(
    State(state): State<AuthState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let credentials = Arc::clone(&state.credentials);
    let username = request.username.clone();
    let user = tokio::task::spawn_blocking(move || {
        credentials.verify(&request.username, &request.password)
    })
    .await
    .map_err(|e| ApiError::Internal(format!("login task failed: {e}")))?
    .ok_or_else(|| {
        tracing::info!(username = %username, "login rejected");
        ApiError::new(ErrorCode::InvalidCredentials, "Invalid username or password")
    })?;

    let (token, expires_at) = state.tokens.issue(&user)?;
    tracing::info!(username = %user.username, "session issued");

    Ok(Json(LoginResponse {
        token,
        expires_at,
        user: UserInfo {
            username: user.username,
            display_name: user.display_name,
            email: user.email,
        },
    }))
}

/// GET /auth/session - Describe the authenticated user
async fn current_session(Extension(session): Extension<UserSession>) -> Json<UserInfo> {
    Json(UserInfo {
        username: session.username,
        display_name: session.display_name,
        email: session.email,
    })
}
