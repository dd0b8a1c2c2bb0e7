//! Error types for the burrow-core crate

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading or persisting the server configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// No configuration file at the given path
    #[error("config file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Refusing to replace an existing configuration file
    #[error("config file already exists: {}", .0.display())]
    AlreadyExists(PathBuf),

    /// The file exists but is not valid configuration JSON
    #[error("malformed config file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The file parsed but holds an unusable value
    #[error("invalid config: {0}")]
    Invalid(String),

    /// Underlying I/O failure
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised by the credential store
#[derive(Error, Debug)]
pub enum CredentialError {
    /// No credential file at the given path
    #[error("credential file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The file exists but is not valid credential JSON
    #[error("malformed credential file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A user with this name already exists
    #[error("user already exists: {0}")]
    UserExists(String),

    /// Username must not be empty
    #[error("username must not be empty")]
    EmptyUsername,

    /// bcrypt only reads the first 72 bytes of a password
    #[error("password is longer than {max} bytes")]
    PasswordTooLong { max: usize },

    /// Password hashing failed; nothing was persisted
    #[error("password hashing failed: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    /// Underlying I/O failure
    #[error("credential I/O error: {0}")]
    Io(#[from] std::io::Error),
}
