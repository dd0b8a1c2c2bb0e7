//! Server configuration and its file-backed store

use crate::error::ConfigError;
use crate::persist::{write_json_atomic, Overwrite};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Signing algorithm used when the file does not name one
pub const DEFAULT_TOKEN_CIPHER_SUITE: &str = "HS256";

/// URL prefix for static assets when the file does not name one
pub const DEFAULT_WEB_URL: &str = "/web/";

/// Static asset directory when the file does not name one
pub const DEFAULT_WEB_DIR: &str = ".";

/// HMAC suites usable with a shared `token_secret`
pub const SUPPORTED_CIPHER_SUITES: &[&str] = &["HS256", "HS384", "HS512"];

/// Persisted server configuration.
///
/// Created once by the setup wizard and read-only for the lifetime of the
/// process afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Root of user data
    pub root_data_dir: String,
    /// Staging area for uploads
    pub root_temp_dir: String,
    /// Secret for signing session tokens
    pub token_secret: String,
    /// Token signing algorithm
    #[serde(default = "default_cipher_suite")]
    pub token_cipher_suite: String,
    /// URL prefix for static assets
    #[serde(rename = "webURL", default = "default_web_url")]
    pub web_url: String,
    /// Directory holding static assets
    #[serde(default = "default_web_dir")]
    pub web_dir: String,
}

fn default_cipher_suite() -> String {
    DEFAULT_TOKEN_CIPHER_SUITE.to_string()
}

fn default_web_url() -> String {
    DEFAULT_WEB_URL.to_string()
}

fn default_web_dir() -> String {
    DEFAULT_WEB_DIR.to_string()
}

impl Config {
    /// Check the invariants a loaded or freshly built config must hold
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port == 0 {
            return Err(ConfigError::Invalid("port must be a positive integer".into()));
        }
        if self.token_secret.is_empty() {
            return Err(ConfigError::Invalid("tokenSecret must not be empty".into()));
        }
        if !SUPPORTED_CIPHER_SUITES.contains(&self.token_cipher_suite.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "unsupported tokenCipherSuite {:?}",
                self.token_cipher_suite
            )));
        }
        if self.root_data_dir.is_empty() || self.root_temp_dir.is_empty() {
            return Err(ConfigError::Invalid("storage directories must not be empty".into()));
        }
        Ok(())
    }
}

/// File-backed store for the singleton `Config`
#[derive(Clone, Debug)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Bind a store to `path`; nothing is read until `parse`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the config file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether a config file is present
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Load and validate the config file
    pub fn parse(&self) -> Result<Config, ConfigError> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ConfigError::NotFound(self.path.clone()));
            }
            Err(e) => return Err(e.into()),
        };

        let config: Config = serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        config.validate()?;

        debug!(path = %self.path.display(), port = config.port, "loaded config");
        Ok(config)
    }

    /// Persist a brand-new config.
    ///
    /// Fails with `ConfigError::AlreadyExists` when a file is already present;
    /// there is no merge or overwrite.
    pub fn create_new_config(&self, config: &Config) -> Result<(), ConfigError> {
        config.validate()?;

        write_json_atomic(&self.path, config, Overwrite::Deny).map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                ConfigError::AlreadyExists(self.path.clone())
            } else {
                ConfigError::Io(e)
            }
        })?;

        info!(path = %self.path.display(), "created config file");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample() -> Config {
        Config {
            port: 8080,
            root_data_dir: "/srv/data".to_string(),
            root_temp_dir: "/srv/tmp".to_string(),
            token_secret: "abcdefghijABCDEFGHIJ".to_string(),
            token_cipher_suite: "HS256".to_string(),
            web_url: "/site".to_string(),
            web_dir: "/srv/web".to_string(),
        }
    }

    #[test]
    fn test_parse_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));

        assert!(!store.exists());
        assert!(matches!(store.parse(), Err(ConfigError::NotFound(_))));
    }

    #[test]
    fn test_create_then_parse() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));

        store.create_new_config(&sample()).unwrap();
        assert_eq!(store.parse().unwrap(), sample());
    }

    #[test]
    fn test_json_field_names() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        store.create_new_config(&sample()).unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.path()).unwrap()).unwrap();
        assert_eq!(raw["port"], 8080);
        assert_eq!(raw["rootDataDir"], "/srv/data");
        assert_eq!(raw["rootTempDir"], "/srv/tmp");
        assert_eq!(raw["tokenSecret"], "abcdefghijABCDEFGHIJ");
        assert_eq!(raw["tokenCipherSuite"], "HS256");
        assert_eq!(raw["webURL"], "/site");
        assert_eq!(raw["webDir"], "/srv/web");
    }

    #[test]
    fn test_parse_applies_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"port": 9000, "rootDataDir": "data", "rootTempDir": "tmp", "tokenSecret": "s3cr3t"}"#,
        )
        .unwrap();

        let config = ConfigStore::new(&path).parse().unwrap();
        assert_eq!(config.token_cipher_suite, DEFAULT_TOKEN_CIPHER_SUITE);
        assert_eq!(config.web_url, DEFAULT_WEB_URL);
        assert_eq!(config.web_dir, DEFAULT_WEB_DIR);
    }

    #[test]
    fn test_parse_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, b"{ not json").unwrap();

        assert!(matches!(
            ConfigStore::new(&path).parse(),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_non_numeric_port() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"port": "eighty", "rootDataDir": "d", "rootTempDir": "t", "tokenSecret": "x"}"#,
        )
        .unwrap();

        assert!(matches!(
            ConfigStore::new(&path).parse(),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_parse_rejects_zero_port() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"port": 0, "rootDataDir": "d", "rootTempDir": "t", "tokenSecret": "x"}"#,
        )
        .unwrap();

        assert!(matches!(
            ConfigStore::new(&path).parse(),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_create_refuses_overwrite() {
        let dir = TempDir::new().unwrap();
        let store = ConfigStore::new(dir.path().join("config.json"));
        store.create_new_config(&sample()).unwrap();
        let before = std::fs::read(store.path()).unwrap();

        let mut other = sample();
        other.port = 1234;
        assert!(matches!(
            store.create_new_config(&other),
            Err(ConfigError::AlreadyExists(_))
        ));
        assert_eq!(std::fs::read(store.path()).unwrap(), before);
    }

    #[test]
    fn test_unknown_cipher_suite_rejected() {
        let mut config = sample();
        config.token_cipher_suite = "none".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
