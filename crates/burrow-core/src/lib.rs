//! # Burrow Core
//!
//! Persistent providers shared by every Burrow module.
//!
//! This crate provides:
//! - **Config**: The singleton server configuration and its file-backed `ConfigStore`
//! - **Credentials**: User accounts with bcrypt-hashed passwords in a `CredentialStore`
//!
//! Both stores persist JSON through an atomic temp-file rename, so a crash
//! mid-write leaves either the old file or the new one, never a torn file.

pub mod config;
pub mod credentials;
pub mod error;
mod persist;

pub use config::{
    Config, ConfigStore, DEFAULT_TOKEN_CIPHER_SUITE, DEFAULT_WEB_DIR, DEFAULT_WEB_URL,
    SUPPORTED_CIPHER_SUITES,
};
pub use credentials::{CredentialStore, NewUser, User, BCRYPT_COST, MAX_PASSWORD_BYTES};
pub use error::{ConfigError, CredentialError};
