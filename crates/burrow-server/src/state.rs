//! Shared provider bundle and per-request session

use burrow_core::{Config, CredentialStore, User};
use burrow_storage::Storage;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Providers handed to every module at construction time
#[derive(Clone)]
pub struct ModuleContext {
    /// Server configuration (read-only after startup)
    pub config: Arc<Config>,
    /// Credential store
    pub credentials: Arc<CredentialStore>,
    /// Storage capability over the data and temp roots
    pub storage: Arc<dyn Storage>,
}

impl ModuleContext {
    pub fn new(
        config: Arc<Config>,
        credentials: Arc<CredentialStore>,
        storage: Arc<dyn Storage>,
    ) -> Self {
        Self {
            config,
            credentials,
            storage,
        }
    }
}

impl std::fmt::Debug for ModuleContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModuleContext")
            .field("port", &self.config.port)
            .field("root_data_dir", &self.config.root_data_dir)
            .field("users", &self.credentials.len())
            .finish_non_exhaustive()
    }
}

/// Authenticated user attached to a request
#[derive(Clone, Debug)]
pub struct UserSession {
    /// Username (token `sub` claim)
    pub username: String,
    /// Display name
    pub display_name: String,
    /// Email
    pub email: String,
    /// Token expiry; `None` for Basic-authenticated requests
    pub expires_at: Option<DateTime<Utc>>,
}

impl UserSession {
    /// Session for a user who just presented valid credentials
    pub fn from_user(user: &User) -> Self {
        Self {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            expires_at: None,
        }
    }

    /// Check if the session has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() > at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_session_expiry() {
        let user = User {
            username: "admin".to_string(),
            password: "$2b$10$hash".to_string(),
            display_name: "Admin".to_string(),
            email: "a@b.com".to_string(),
        };

        let mut session = UserSession::from_user(&user);
        assert!(!session.is_expired());

        session.expires_at = Some(Utc::now() - Duration::hours(1));
        assert!(session.is_expired());

        session.expires_at = Some(Utc::now() + Duration::hours(1));
        assert!(!session.is_expired());
    }
}
