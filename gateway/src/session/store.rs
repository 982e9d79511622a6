use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::{GatewayError, Result};

/// Bearer token plus the role and user id issued with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    pub token: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            role: None,
            user_id: None,
        }
    }

    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Persistence for the credential. Token, role and user id are always read
/// and written together.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>>;
    fn save(&self, credential: &Credential) -> Result<()>;
    /// Removing an absent credential is not an error.
    fn clear(&self) -> Result<()>;
}

#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<Credential>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credential(credential: Credential) -> Self {
        Self {
            slot: Mutex::new(Some(credential)),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<Credential>> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(credential.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[derive(Serialize, Deserialize)]
struct PersistedCredential {
    #[serde(flatten)]
    credential: Credential,
    saved_at: DateTime<Utc>,
}

/// JSON file on disk. A missing file is an empty store.
///
/// Reads and writes are blocking `std::fs` calls made on the caller's task
/// while the session lock is held. Sized for one small file per process,
/// as the CLI uses it; a store shared by many concurrent sessions should
/// implement [`CredentialStore`] over something non-blocking.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Result<Option<Credential>> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(GatewayError::Storage(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let persisted: PersistedCredential = serde_json::from_str(&content).map_err(|e| {
            GatewayError::Storage(format!("failed to parse {}: {}", self.path.display(), e))
        })?;

        Ok(Some(persisted.credential))
    }

    fn save(&self, credential: &Credential) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                GatewayError::Storage(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let persisted = PersistedCredential {
            credential: credential.clone(),
            saved_at: Utc::now(),
        };
        let content = serde_json::to_vec_pretty(&persisted)
            .map_err(|e| GatewayError::Storage(format!("failed to encode credential: {}", e)))?;

        // replace atomically
        let temp = self.temp_path();
        fs::write(&temp, content).map_err(|e| {
            GatewayError::Storage(format!("failed to write {}: {}", temp.display(), e))
        })?;
        fs::rename(&temp, &self.path).map_err(|e| {
            GatewayError::Storage(format!("failed to replace {}: {}", self.path.display(), e))
        })?;

        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(GatewayError::Storage(format!(
                "failed to remove {}: {}",
                self.path.display(),
                e
            ))),
        }
    }
}
