//! Error types: request-level API errors and fatal startup errors

use crate::module::ModuleError;
use crate::setup::SetupError;
use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use burrow_core::{ConfigError, CredentialError};
use burrow_storage::StorageError;
use thiserror::Error;

/// API error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    AccessDenied,
    Conflict,
    InternalError,
    InvalidCredentials,
    InvalidRequest,
    InvalidToken,
    MethodNotAllowed,
    NotFound,
    Unauthorized,
}

impl ErrorCode {
    /// Get the error code string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AccessDenied => "AccessDenied",
            Self::Conflict => "Conflict",
            Self::InternalError => "InternalError",
            Self::InvalidCredentials => "InvalidCredentials",
            Self::InvalidRequest => "InvalidRequest",
            Self::InvalidToken => "InvalidToken",
            Self::MethodNotAllowed => "MethodNotAllowed",
            Self::NotFound => "NotFound",
            Self::Unauthorized => "Unauthorized",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AccessDenied => StatusCode::FORBIDDEN,
            Self::Conflict => StatusCode::CONFLICT,
            Self::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::InvalidCredentials | Self::InvalidToken | Self::Unauthorized => {
                StatusCode::UNAUTHORIZED
            }
            Self::InvalidRequest => StatusCode::BAD_REQUEST,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotFound => StatusCode::NOT_FOUND,
        }
    }
}

/// Request-level error returned by module handlers
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Api { code: ErrorCode, message: String },

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ApiError {
    /// Create a new API error
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Api {
            code,
            message: message.into(),
        }
    }

    /// Get the error code
    pub fn error_code(&self) -> ErrorCode {
        match self {
            Self::Api { code, .. } => *code,
            Self::Internal(_) => ErrorCode::InternalError,
            Self::Storage(e) => match e {
                StorageError::NotFound(_) => ErrorCode::NotFound,
                StorageError::AlreadyExists(_) | StorageError::ParentMissing(_) => {
                    ErrorCode::Conflict
                }
                StorageError::NotADirectory(_)
                | StorageError::IsADirectory(_)
                | StorageError::InvalidPath(_) => ErrorCode::InvalidRequest,
                StorageError::InvalidRoot { .. } | StorageError::Io(_) => ErrorCode::InternalError,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.error_code();
        let status = code.status_code();

        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }

        let body = Json(serde_json::json!({
            "error": code.as_str(),
            "message": self.to_string(),
        }));

        // WebDAV clients only send credentials after a Basic challenge
        if status == StatusCode::UNAUTHORIZED {
            return (
                status,
                [(header::WWW_AUTHENTICATE, r#"Basic realm="burrow""#)],
                body,
            )
                .into_response();
        }

        (status, body).into_response()
    }
}

/// Fatal startup error; any of these ends the process with status 1
#[derive(Error, Debug)]
pub enum BootstrapError {
    /// Reading or writing config, credentials, or interactive input failed
    #[error("I/O error: {0}")]
    Io(String),

    /// Malformed config content or a non-numeric port
    #[error("parse error: {0}")]
    Parse(String),

    /// The storage roots are unusable
    #[error("storage initialization failed: {0}")]
    ProviderInit(#[from] StorageError),

    /// A module failed to construct or start
    #[error("module initialization failed: {0}")]
    ModuleInit(#[from] ModuleError),

    /// Password hashing failed
    #[error("password hashing failed: {0}")]
    Hash(String),
}

impl From<ConfigError> for BootstrapError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Parse { .. } | ConfigError::Invalid(_) => Self::Parse(err.to_string()),
            ConfigError::NotFound(_) | ConfigError::AlreadyExists(_) | ConfigError::Io(_) => {
                Self::Io(err.to_string())
            }
        }
    }
}

impl From<CredentialError> for BootstrapError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Hash(_) | CredentialError::PasswordTooLong { .. } => {
                Self::Hash(err.to_string())
            }
            CredentialError::Parse { .. }
            | CredentialError::UserExists(_)
            | CredentialError::EmptyUsername => Self::Parse(err.to_string()),
            CredentialError::NotFound(_) | CredentialError::Io(_) => Self::Io(err.to_string()),
        }
    }
}

impl From<SetupError> for BootstrapError {
    fn from(err: SetupError) -> Self {
        match err {
            SetupError::Input(_) => Self::Io(err.to_string()),
            SetupError::InvalidPort { .. } => Self::Parse(err.to_string()),
            SetupError::Config(e) => e.into(),
            SetupError::Credential(e) => e.into(),
        }
    }
}

/// Failure of the network runtime after bootstrap completed
#[derive(Error, Debug)]
pub enum ServeError {
    /// The listener could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// The server loop terminated with an error
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_mapping() {
        let err = ApiError::from(StorageError::NotFound("/x".into()));
        assert_eq!(err.error_code(), ErrorCode::NotFound);
        assert_eq!(err.error_code().status_code(), StatusCode::NOT_FOUND);

        let err = ApiError::from(StorageError::ParentMissing("/a/b".into()));
        assert_eq!(err.error_code().status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_unauthorized_carries_challenge() {
        let response = ApiError::new(ErrorCode::Unauthorized, "Authentication required")
            .into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().contains_key(header::WWW_AUTHENTICATE));
    }

    #[test]
    fn test_bootstrap_classification() {
        let err: BootstrapError = SetupError::InvalidPort {
            input: "abc".into(),
            reason: "invalid digit found in string".into(),
        }
        .into();
        assert!(matches!(err, BootstrapError::Parse(_)));

        let err: BootstrapError =
            SetupError::Input(std::io::Error::from(std::io::ErrorKind::UnexpectedEof)).into();
        assert!(matches!(err, BootstrapError::Io(_)));

        let err: BootstrapError = ConfigError::Invalid("port".into()).into();
        assert!(matches!(err, BootstrapError::Parse(_)));

        let err: BootstrapError = CredentialError::PasswordTooLong { max: 72 }.into();
        assert!(matches!(err, BootstrapError::Hash(_)));
    }
}
