//! Session credential persistence
//!
//! The session token outlives the process so a later run starts logged in.
//! [`FileCredentialStore`] keeps it in a JSON file readable only by the
//! owner; [`MemoryCredentialStore`] is used by tests and ephemeral clients.

use crate::config::ConfigManager;
use crate::error::{LaunchpadError, LaunchpadResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tokio::fs;
use tracing::debug;

/// File name of the persisted token under the credentials directory
pub const TOKEN_FILE: &str = "token.json";

/// Persisted credential entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCredential {
    /// Opaque session token
    pub token: String,

    /// When the token was stored
    pub stored_at: DateTime<Utc>,
}

impl StoredCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            stored_at: Utc::now(),
        }
    }
}

/// Durable storage for the session credential
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current token, if one is stored
    async fn get(&self) -> LaunchpadResult<Option<String>>;

    /// Store `token`, replacing any previous one
    async fn set(&self, token: &str) -> LaunchpadResult<()>;

    /// Forget the stored token. Removing nothing is not an error.
    async fn remove(&self) -> LaunchpadResult<()>;
}

/// Token kept in a JSON file with owner-only permissions
pub struct FileCredentialStore {
    path: PathBuf,

    /// Parent is the crate's own credentials directory
    owns_dir: bool,
}

impl FileCredentialStore {
    /// Store under the default credentials directory
    pub fn new() -> Self {
        Self {
            path: ConfigManager::credentials_dir().join(TOKEN_FILE),
            owns_dir: true,
        }
    }

    /// Store at a caller-chosen path. Its directory keeps its permissions.
    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            owns_dir: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn ensure_parent(&self) -> LaunchpadResult<()> {
        let Some(dir) = self
            .path
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
        else {
            return Ok(());
        };
        fs::create_dir_all(dir)
            .await
            .map_err(|e| LaunchpadError::io(format!("creating {}", dir.display()), e))?;

        // Only the default credentials directory is locked down
        #[cfg(unix)]
        {
            if self.owns_dir {
                use std::os::unix::fs::PermissionsExt;
                let perms = std::fs::Permissions::from_mode(0o700);
                std::fs::set_permissions(dir, perms)
                    .map_err(|e| LaunchpadError::io("setting credentials dir permissions", e))?;
            }
        }

        Ok(())
    }
}

impl Default for FileCredentialStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CredentialStore for FileCredentialStore {
    async fn get(&self) -> LaunchpadResult<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            LaunchpadError::io(format!("reading credential file {}", self.path.display()), e)
        })?;

        let stored: StoredCredential = serde_json::from_str(&content)?;
        debug!("Using credential stored at {}", stored.stored_at);
        Ok(Some(stored.token))
    }

    async fn set(&self, token: &str) -> LaunchpadResult<()> {
        self.ensure_parent()
            .await
            .map_err(|e| LaunchpadError::CredentialPersist(e.to_string()))?;

        let content = serde_json::to_string_pretty(&StoredCredential::new(token))?;
        fs::write(&self.path, content).await.map_err(|e| {
            LaunchpadError::CredentialPersist(format!("writing {}: {}", self.path.display(), e))
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&self.path, perms)
                .map_err(|e| LaunchpadError::io("setting credential file permissions", e))?;
        }

        debug!("Stored credential in {}", self.path.display());
        Ok(())
    }

    async fn remove(&self) -> LaunchpadResult<()> {
        if self.path.exists() {
            fs::remove_file(&self.path).await.map_err(|e| {
                LaunchpadError::io(format!("removing credential file {}", self.path.display()), e)
            })?;
            debug!("Removed credential {}", self.path.display());
        }
        Ok(())
    }
}

/// Process-local credential store
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: Mutex::new(token),
        }
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        self.token.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl CredentialStore for MemoryCredentialStore {
    async fn get(&self) -> LaunchpadResult<Option<String>> {
        Ok(self.slot().clone())
    }

    async fn set(&self, token: &str) -> LaunchpadResult<()> {
        *self.slot() = Some(token.to_string());
        Ok(())
    }

    async fn remove(&self) -> LaunchpadResult<()> {
        *self.slot() = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn file_store() -> (FileCredentialStore, TempDir) {
        let temp = TempDir::new().unwrap();
        let store = FileCredentialStore::with_path(temp.path().join("creds").join(TOKEN_FILE));
        (store, temp)
    }

    #[tokio::test]
    async fn file_store_set_get_remove() {
        let (store, _temp) = file_store();
        assert!(store.get().await.unwrap().is_none());

        store.set("tok-1").await.unwrap();
        assert_eq!(store.get().await.unwrap().as_deref(), Some("tok-1"));

        store.set("tok-2").await.unwrap();
        assert_eq!(store.get().await.unwrap().as_deref(), Some("tok-2"));

        store.remove().await.unwrap();
        assert!(store.get().await.unwrap().is_none());
        store.remove().await.unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn file_store_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let (store, _temp) = file_store();
        store.set("secret").await.unwrap();

        let mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn own_credentials_dir_is_locked_down() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("credentials");
        let store = FileCredentialStore {
            path: dir.join(TOKEN_FILE),
            owns_dir: true,
        };
        store.set("secret").await.unwrap();

        let mode = std::fs::metadata(&dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn configured_path_keeps_parent_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let shared = temp.path().join("shared");
        std::fs::create_dir(&shared).unwrap();
        std::fs::set_permissions(&shared, std::fs::Permissions::from_mode(0o755)).unwrap();

        let store = FileCredentialStore::with_path(shared.join(TOKEN_FILE));
        store.set("secret").await.unwrap();

        let mode = std::fs::metadata(&shared).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
        let file_mode = std::fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(file_mode & 0o777, 0o600);
    }

    #[tokio::test]
    async fn relative_path_without_directory() {
        let name = format!("launchpad-token-{}.json", std::process::id());
        let store = FileCredentialStore::with_path(PathBuf::from(&name));

        store.set("tok").await.unwrap();
        assert_eq!(store.get().await.unwrap().as_deref(), Some("tok"));
        store.remove().await.unwrap();
        assert!(!Path::new(&name).exists());
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let (store, _temp) = file_store();
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();

        assert!(matches!(store.get().await, Err(LaunchpadError::Json(_))));
    }

    #[tokio::test]
    async fn memory_store() {
        let store = MemoryCredentialStore::new(Some("seed".into()));
        assert_eq!(store.get().await.unwrap().as_deref(), Some("seed"));
        store.remove().await.unwrap();
        assert!(store.get().await.unwrap().is_none());
    }
}
