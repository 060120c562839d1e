//! services/api/src/adapters/credentials.rs
//!
//! "Remember me" storage. `auth.json` keeps the identifier and a reference into
//! the secret vault; the password itself never touches the file.

use chrono::{DateTime, Utc};
use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use study_planner_core::ports::{PortError, PortResult, SecretVault};
use tokio::fs;
use tracing::{debug, warn};

pub const CREDENTIALS_FILE_NAME: &str = "auth.json";
pub const KEYRING_SERVICE: &str = "study-planner";

//=========================================================================================
// Vaults
//=========================================================================================

/// Secrets in the OS keyring (Credential Manager, Keychain, kernel keyutils).
#[derive(Clone, Debug)]
pub struct KeyringVault {
    service: String,
}

impl KeyringVault {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: &str) -> PortResult<Entry> {
        Entry::new(&self.service, key)
            .map_err(|e| PortError::Unexpected(format!("Failed to open keyring entry: {}", e)))
    }
}

impl Default for KeyringVault {
    fn default() -> Self {
        Self::new(KEYRING_SERVICE)
    }
}

impl SecretVault for KeyringVault {
    fn store(&self, key: &str, secret: &str) -> PortResult<()> {
        debug!("Storing secret in keyring for service {}", self.service);
        self.entry(key)?
            .set_password(secret)
            .map_err(|e| PortError::Unexpected(format!("Failed to store secret: {}", e)))
    }

    fn fetch(&self, key: &str) -> PortResult<String> {
        self.entry(key)?.get_password().map_err(|e| match e {
            keyring::Error::NoEntry => PortError::NotFound(format!("No secret stored for {}", key)),
            other => PortError::Unexpected(format!("Failed to read secret: {}", other)),
        })
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(PortError::Unexpected(format!("Failed to remove secret: {}", e))),
        }
    }
}

/// Process-local vault for hosts without a keyring service.
#[derive(Debug, Default)]
pub struct MemoryVault {
    secrets: Mutex<HashMap<String, String>>,
}

impl SecretVault for MemoryVault {
    fn store(&self, key: &str, secret: &str) -> PortResult<()> {
        self.secrets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key.to_string(), secret.to_string());
        Ok(())
    }

    fn fetch(&self, key: &str) -> PortResult<String> {
        self.secrets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(key)
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("No secret stored for {}", key)))
    }

    fn remove(&self, key: &str) -> PortResult<()> {
        self.secrets
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
        Ok(())
    }
}

//=========================================================================================
// Credential file
//=========================================================================================

#[derive(Serialize, Deserialize)]
struct StoredCredentials {
    identifier: String,
    vault_key: String,
    saved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RememberedLogin {
    pub identifier: String,
    pub password: String,
    pub saved_at: DateTime<Utc>,
}

pub struct CredentialStore {
    path: PathBuf,
    vault: Arc<dyn SecretVault>,
}

impl CredentialStore {
    pub fn new(path: impl Into<PathBuf>, vault: Arc<dyn SecretVault>) -> Self {
        Self {
            path: path.into(),
            vault,
        }
    }

    /// `{data_dir}/auth.json`
    pub fn in_dir(data_dir: &Path, vault: Arc<dyn SecretVault>) -> Self {
        Self::new(data_dir.join(CREDENTIALS_FILE_NAME), vault)
    }

    fn vault_key(identifier: &str) -> String {
        format!("login:{}", identifier.trim().to_lowercase())
    }

    /// Runs a vault call on the blocking pool; keyring backends block on IPC.
    async fn with_vault<T, F>(&self, op: F) -> PortResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&dyn SecretVault) -> PortResult<T> + Send + 'static,
    {
        let vault = Arc::clone(&self.vault);
        tokio::task::spawn_blocking(move || op(vault.as_ref()))
            .await
            .map_err(|e| PortError::Unexpected(format!("Vault task failed: {}", e)))?
    }

    pub async fn save(&self, identifier: &str, password: &str) -> PortResult<()> {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            return Err(PortError::Validation("Identifier is required".to_string()));
        }
        let vault_key = Self::vault_key(identifier);
        let (key, secret) = (vault_key.clone(), password.to_string());
        self.with_vault(move |vault| vault.store(&key, &secret)).await?;

        let payload = StoredCredentials {
            identifier: identifier.to_string(),
            vault_key,
            saved_at: Utc::now(),
        };
        let json = serde_json::to_string_pretty(&payload)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| PortError::Unexpected(format!("I/O error: {}", e)))?;
        }
        fs::write(&self.path, json)
            .await
            .map_err(|e| PortError::Unexpected(format!("I/O error: {}", e)))
    }

    /// Any missing piece or read failure yields `None`.
    pub async fn load(&self) -> Option<RememberedLogin> {
        let stored = self.read_file().await?;
        if stored.identifier.trim().is_empty() || stored.vault_key.trim().is_empty() {
            return None;
        }
        let key = stored.vault_key.clone();
        let password = self.with_vault(move |vault| vault.fetch(&key)).await.ok()?;
        if password.is_empty() {
            return None;
        }
        Some(RememberedLogin {
            identifier: stored.identifier,
            password,
            saved_at: stored.saved_at,
        })
    }

    /// Removes the file and its vault entry. Errors are ignored.
    pub async fn clear(&self) {
        if let Some(stored) = self.read_file().await {
            let key = stored.vault_key;
            let _ = self.with_vault(move |vault| vault.remove(&key)).await;
        }
        let _ = fs::remove_file(&self.path).await;
    }

    async fn read_file(&self) -> Option<StoredCredentials> {
        let raw = fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str(&raw) {
            Ok(stored) => Some(stored),
            Err(e) => {
                warn!("Ignoring unreadable credential file {:?}: {}", self.path, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &Path) -> CredentialStore {
        CredentialStore::in_dir(dir, Arc::new(MemoryVault::default()))
    }

    #[tokio::test]
    async fn save_then_load_returns_the_password() {
        let dir = tempfile::tempdir().unwrap();
        let creds = store(dir.path());
        creds.save("ada@example.com", "s3cret!").await.unwrap();

        let raw = std::fs::read_to_string(dir.path().join(CREDENTIALS_FILE_NAME)).unwrap();
        assert!(!raw.contains("s3cret!"));

        let loaded = creds.load().await.unwrap();
        assert_eq!(loaded.identifier, "ada@example.com");
        assert_eq!(loaded.password, "s3cret!");
    }

    #[tokio::test]
    async fn missing_or_corrupt_file_loads_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let creds = store(dir.path());
        assert!(creds.load().await.is_none());

        std::fs::write(dir.path().join(CREDENTIALS_FILE_NAME), "{not json").unwrap();
        assert!(creds.load().await.is_none());
    }

    #[tokio::test]
    async fn clear_forgets_everything() {
        let dir = tempfile::tempdir().unwrap();
        let creds = store(dir.path());
        creds.save("ada", "s3cret!").await.unwrap();
        creds.clear().await;
        assert!(creds.load().await.is_none());
        assert!(!dir.path().join(CREDENTIALS_FILE_NAME).exists());
        // A second clear on an empty store is harmless.
        creds.clear().await;
    }

    #[tokio::test]
    async fn keyring_failures_surface_from_save() {
        struct BrokenVault;
        impl SecretVault for BrokenVault {
            fn store(&self, _: &str, _: &str) -> PortResult<()> {
                Err(PortError::Unexpected("keyring offline".to_string()))
            }
            fn fetch(&self, key: &str) -> PortResult<String> {
                Err(PortError::NotFound(key.to_string()))
            }
            fn remove(&self, _: &str) -> PortResult<()> {
                Ok(())
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let creds = CredentialStore::in_dir(dir.path(), Arc::new(BrokenVault));
        match creds.save("ada", "s3cret!").await {
            Err(PortError::Unexpected(message)) => assert!(message.contains("keyring offline")),
            other => panic!("expected the vault error, got {:?}", other),
        }
        assert!(!dir.path().join(CREDENTIALS_FILE_NAME).exists());
        assert!(creds.load().await.is_none());
    }
}
