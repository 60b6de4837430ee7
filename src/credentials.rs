//! Bearer token persistence
//!
//! The service issues an opaque bearer token at login. This module keeps it
//! across process runs behind the [`CredentialStore`] trait so the rest of the
//! crate never cares where it lives:
//!
//! - [`KeyringCredentialStore`] uses the operating system's credential store
//!   (Keychain on macOS, Secret Service on Linux, Windows Credential Manager).
//! - [`FileCredentialStore`] writes a small JSON file under the platform config
//!   directory with `0600` permissions on Unix.
//! - [`MemoryCredentialStore`] keeps the token for the lifetime of the process.
//!
//! None of these interpret the token.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::config::{CredentialBackend, CredentialsConfig};
use crate::error::{InsightHubError, Result};

/// Account name used for the single keyring entry.
const KEYRING_ACCOUNT: &str = "token";

/// File name of the file-backed store inside the config directory.
const CREDENTIALS_FILE: &str = "credentials.json";

/// Storage for the session bearer token.
///
/// Implementations hold at most one token. `clear` must be idempotent.
pub trait CredentialStore: Send + Sync {
    /// Returns the stored token, or `None` if nobody is logged in.
    ///
    /// # Errors
    ///
    /// Returns an error only when the backing store itself fails.
    fn load(&self) -> Result<Option<String>>;

    /// Replaces the stored token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the write.
    fn save(&self, token: &str) -> Result<()>;

    /// Removes the stored token. A no-op when nothing is stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store rejects the delete.
    fn clear(&self) -> Result<()>;
}

/// Builds the credential store selected by configuration.
///
/// # Errors
///
/// Returns [`InsightHubError::Credentials`] when the file backend is selected
/// but no config directory can be determined for this platform.
///
/// # Examples
///
/// ```
/// use insighthub::config::{CredentialBackend, CredentialsConfig};
/// use insighthub::credentials::create_credential_store;
///
/// let config = CredentialsConfig {
///     backend: CredentialBackend::Memory,
///     ..Default::default()
/// };
/// let store = create_credential_store(&config).unwrap();
/// assert!(store.load().unwrap().is_none());
/// ```
pub fn create_credential_store(config: &CredentialsConfig) -> Result<Arc<dyn CredentialStore>> {
    let store: Arc<dyn CredentialStore> = match config.backend {
        CredentialBackend::Keyring => Arc::new(KeyringCredentialStore::new(&config.service_name)),
        CredentialBackend::File => Arc::new(FileCredentialStore::default_location()?),
        CredentialBackend::Memory => Arc::new(MemoryCredentialStore::new()),
    };
    tracing::debug!(backend = ?config.backend, "Credential store initialized");
    Ok(store)
}

// ---------------------------------------------------------------------------
// Keyring
// ---------------------------------------------------------------------------

/// Token store backed by the OS native keyring.
///
/// The token is stored under `service_name` with a fixed account name, so a
/// second login simply overwrites the first.
#[derive(Debug, Clone)]
pub struct KeyringCredentialStore {
    service_name: String,
}

impl KeyringCredentialStore {
    /// Creates a store that reads and writes the keyring entry for
    /// `service_name`.
    pub fn new(service_name: &str) -> Self {
        Self {
            service_name: service_name.to_string(),
        }
    }

    fn entry(&self) -> Result<keyring::Entry> {
        keyring::Entry::new(&self.service_name, KEYRING_ACCOUNT)
            .map_err(|e| InsightHubError::Keyring(e).into())
    }
}

impl CredentialStore for KeyringCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        match self.entry()?.get_password() {
            Ok(token) => Ok(Some(token)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(InsightHubError::Keyring(e).into()),
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        self.entry()?
            .set_password(token)
            .map_err(InsightHubError::Keyring)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_password() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(InsightHubError::Keyring(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// File
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize, Deserialize)]
struct StoredCredentials {
    token: String,
}

/// Token store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    /// Creates a store at an explicit path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a store at `<config dir>/insighthub/credentials.json`.
    ///
    /// # Errors
    ///
    /// Returns [`InsightHubError::Credentials`] if the platform has no config
    /// directory (for example, no home directory is set).
    pub fn default_location() -> Result<Self> {
        let dirs = directories::ProjectDirs::from("", "", "insighthub").ok_or_else(|| {
            InsightHubError::Credentials("could not determine config directory".to_string())
        })?;
        Ok(Self::with_path(dirs.config_dir().join(CREDENTIALS_FILE)))
    }

    /// Path of the credentials file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Unreadable credentials file");
                return Ok(None);
            }
        };

        match serde_json::from_str::<StoredCredentials>(&contents) {
            Ok(stored) => Ok(Some(stored.token)),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Malformed credentials file");
                Ok(None)
            }
        }
    }

    fn save(&self, token: &str) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(&StoredCredentials {
            token: token.to_string(),
        })?;
        std::fs::write(&self.path, contents)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(InsightHubError::Io(e).into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Memory
// ---------------------------------------------------------------------------

/// Process-local token store.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that already holds `token`.
    pub fn with_token(token: &str) -> Self {
        Self {
            token: Mutex::new(Some(token.to_string())),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // A poisoned lock still holds a valid Option<String>.
        self.token.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<String>> {
        Ok(self.lock().clone())
    }

    fn save(&self, token: &str) -> Result<()> {
        *self.lock() = Some(token.to_string());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.lock() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_memory_store_starts_empty() {
        let store = MemoryCredentialStore::new();
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_memory_store_save_load_clear() {
        let store = MemoryCredentialStore::new();
        store.save("abc").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("abc"));

        store.save("def").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("def"));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_file_store_missing_file_is_none() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::with_path(dir.path().join("creds.json"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("creds.json");
        let store = FileCredentialStore::with_path(&path);

        store.save("token-123").unwrap();
        assert!(path.exists());
        assert_eq!(store.load().unwrap().as_deref(), Some("token-123"));
    }

    #[test]
    fn test_file_store_malformed_file_is_none() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("creds.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileCredentialStore::with_path(&path);
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn test_file_store_clear_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::with_path(dir.path().join("creds.json"));
        store.save("t").unwrap();
        store.clear().unwrap();
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_store_sets_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileCredentialStore::with_path(dir.path().join("creds.json"));
        store.save("t").unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_create_memory_store_from_config() {
        let config = CredentialsConfig {
            backend: CredentialBackend::Memory,
            ..Default::default()
        };
        let store = create_credential_store(&config).unwrap();
        store.save("x").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("x"));
    }

    #[test]
    #[ignore = "requires system keyring"]
    fn test_keyring_store_roundtrip() {
        let store = KeyringCredentialStore::new("insighthub-test");
        store.save("keyring-token").unwrap();
        assert_eq!(store.load().unwrap().as_deref(), Some("keyring-token"));
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }
}
