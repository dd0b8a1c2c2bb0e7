//! User accounts and the file-backed credential store

use crate::error::CredentialError;
use crate::persist::{write_json_atomic, Overwrite};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

/// Fixed bcrypt work factor for stored passwords
pub const BCRYPT_COST: u32 = 10;

/// Longest password bcrypt hashes without truncation
pub const MAX_PASSWORD_BYTES: usize = 72;

/// A stored user account
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Unique login name
    pub username: String,
    /// bcrypt hash of the password
    pub password: String,
    /// Human-readable name
    pub display_name: String,
    /// Contact address
    pub email: String,
}

/// Account details as entered, before the password is hashed
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub display_name: String,
    pub email: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("display_name", &self.display_name)
            .field("email", &self.email)
            .finish()
    }
}

/// On-disk layout of the credential file
#[derive(Default, Serialize, Deserialize)]
struct CredentialFile {
    #[serde(default)]
    users: BTreeMap<String, User>,
}

/// Hash verified against when the username is unknown, so lookups of
/// missing and present users cost the same.
fn dummy_hash() -> &'static str {
    static DUMMY: OnceLock<String> = OnceLock::new();
    DUMMY.get_or_init(|| bcrypt::hash("burrow-dummy-password", BCRYPT_COST).unwrap_or_default())
}

/// File-backed repository of user accounts.
///
/// Reads and writes are synchronized internally, so the store can be shared
/// across request handlers behind an `Arc`.
#[derive(Debug)]
pub struct CredentialStore {
    path: PathBuf,
    users: RwLock<BTreeMap<String, User>>,
}

impl CredentialStore {
    /// Bind to `path`, loading existing users if the file is present
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CredentialError> {
        let path = path.into();
        let users = match std::fs::read(&path) {
            Ok(bytes) => {
                let file: CredentialFile =
                    serde_json::from_slice(&bytes).map_err(|source| CredentialError::Parse {
                        path: path.clone(),
                        source,
                    })?;
                debug!(path = %path.display(), users = file.users.len(), "loaded credentials");
                file.users
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            users: RwLock::new(users),
        })
    }

    /// Location of the credential file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the credential file is present, regardless of its user count
    pub fn exists_auth(&self) -> bool {
        self.path.exists()
    }

    /// Hash the password and persist a new account.
    ///
    /// Nothing is written if hashing fails or the username is taken.
    pub fn create_user(&self, new_user: NewUser) -> Result<User, CredentialError> {
        if new_user.username.is_empty() {
            return Err(CredentialError::EmptyUsername);
        }
        if new_user.password.len() > MAX_PASSWORD_BYTES {
            return Err(CredentialError::PasswordTooLong {
                max: MAX_PASSWORD_BYTES,
            });
        }
        if self.users.read().contains_key(&new_user.username) {
            return Err(CredentialError::UserExists(new_user.username));
        }

        let password = bcrypt::hash(&new_user.password, BCRYPT_COST)?;
        let user = User {
            username: new_user.username,
            password,
            display_name: new_user.display_name,
            email: new_user.email,
        };

        let mut users = self.users.write();
        if users.contains_key(&user.username) {
            return Err(CredentialError::UserExists(user.username));
        }

        let mut next = users.clone();
        next.insert(user.username.clone(), user.clone());
        write_json_atomic(&self.path, &CredentialFile { users: next.clone() }, Overwrite::Allow)?;
        *users = next;

        info!(username = %user.username, path = %self.path.display(), "created user");
        Ok(user)
    }

    /// Return the user when `password` matches the stored hash
    pub fn verify(&self, username: &str, password: &str) -> Option<User> {
        // bcrypt would compare only a 72-byte prefix of a longer input.
        let user = self
            .users
            .read()
            .get(username)
            .filter(|_| password.len() <= MAX_PASSWORD_BYTES)
            .cloned();
        match user {
            Some(user) => bcrypt::verify(password, &user.password)
                .unwrap_or(false)
                .then_some(user),
            None => {
                let _ = bcrypt::verify(password, dummy_hash());
                None
            }
        }
    }

    /// Look up a user by name
    pub fn get_user(&self, username: &str) -> Option<User> {
        self.users.read().get(username).cloned()
    }

    /// Number of stored users
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Whether the store holds no users
    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn admin() -> NewUser {
        NewUser {
            username: "admin".to_string(),
            password: "secret1".to_string(),
            display_name: "Admin".to_string(),
            email: "a@b.com".to_string(),
        }
    }

    #[test]
    fn test_open_missing_file() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::open(dir.path().join("auth.json")).unwrap();

        assert!(!store.exists_auth());
        assert!(store.is_empty());
    }

    #[test]
    fn test_exists_auth_with_no_users() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, b"{}").unwrap();

        let store = CredentialStore::open(&path).unwrap();
        assert!(store.exists_auth());
        assert!(store.is_empty());
    }

    #[test]
    fn test_create_user_hashes_password() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.json");
        let store = CredentialStore::open(&path).unwrap();

        let user = store.create_user(admin()).unwrap();
        assert_ne!(user.password, "secret1");
        assert!(user.password.starts_with("$2"));

        let text = std::fs::read_to_string(&path).unwrap();
        assert!(!text.contains("secret1"));
        assert!(store.exists_auth());
    }

    #[test]
    fn test_verify_after_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.json");
        CredentialStore::open(&path).unwrap().create_user(admin()).unwrap();

        let store = CredentialStore::open(&path).unwrap();
        let user = store.verify("admin", "secret1").unwrap();
        assert_eq!(user.display_name, "Admin");
        assert_eq!(user.email, "a@b.com");

        assert!(store.verify("admin", "wrong").is_none());
        assert!(store.verify("nobody", "secret1").is_none());
    }

    #[test]
    fn test_duplicate_user_rejected() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::open(dir.path().join("auth.json")).unwrap();
        store.create_user(admin()).unwrap();

        assert!(matches!(
            store.create_user(admin()),
            Err(CredentialError::UserExists(_))
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_empty_username_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.json");
        let store = CredentialStore::open(&path).unwrap();

        let mut user = admin();
        user.username.clear();
        assert!(matches!(store.create_user(user), Err(CredentialError::EmptyUsername)));
        assert!(!path.exists());
    }

    #[test]
    fn test_password_over_bcrypt_limit_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.json");
        let store = CredentialStore::open(&path).unwrap();

        let mut user = admin();
        user.password = format!("{}-original", "a".repeat(MAX_PASSWORD_BYTES));
        assert!(matches!(
            store.create_user(user),
            Err(CredentialError::PasswordTooLong { max: MAX_PASSWORD_BYTES })
        ));
        assert!(!path.exists());
    }

    #[test]
    fn test_verify_rejects_longer_input_sharing_prefix() {
        let dir = TempDir::new().unwrap();
        let store = CredentialStore::open(dir.path().join("auth.json")).unwrap();

        let exact = "a".repeat(MAX_PASSWORD_BYTES);
        let mut user = admin();
        user.password = exact.clone();
        store.create_user(user).unwrap();

        assert!(store.verify("admin", &exact).is_some());
        assert!(store
            .verify("admin", &format!("{exact}-something-else"))
            .is_none());
    }

    #[test]
    fn test_malformed_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("auth.json");
        std::fs::write(&path, b"[1, 2").unwrap();

        assert!(matches!(
            CredentialStore::open(&path),
            Err(CredentialError::Parse { .. })
        ));
    }

    #[test]
    fn test_new_user_debug_redacts_password() {
        let rendered = format!("{:?}", admin());
        assert!(!rendered.contains("secret1"));
        assert!(rendered.contains("<redacted>"));
    }
}
