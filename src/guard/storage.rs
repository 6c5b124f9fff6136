//! Last successfully authenticated email, kept only to pre-fill the form on
//! the next visit. This is the only client-side persisted state.

use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
    sync::Mutex,
};
use thiserror::Error;
use tracing::debug;

const LAST_EMAIL_FILE: &str = "last_email.json";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("storage encoding error: {0}")]
    Json(#[from] serde_json::Error),
}

pub trait EmailStore: Send + Sync {
    /// Stored email, `None` when absent or unreadable.
    fn load(&self) -> Option<String>;

    /// # Errors
    /// Returns an error if the email cannot be persisted.
    fn save(&self, email: &str) -> Result<(), StorageError>;
}

#[derive(Serialize, Deserialize)]
struct LastEmail {
    email: String,
}

/// JSON file inside a state directory.
#[derive(Clone, Debug)]
pub struct FileEmailStore {
    path: PathBuf,
}

impl FileEmailStore {
    #[must_use]
    pub fn in_dir(dir: &Path) -> Self {
        Self {
            path: dir.join(LAST_EMAIL_FILE),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl EmailStore for FileEmailStore {
    fn load(&self) -> Option<String> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) => {
                debug!(path = %self.path.display(), "no stored email: {err}");
                return None;
            }
        };

        serde_json::from_str::<LastEmail>(&raw)
            .ok()
            .map(|stored| stored.email)
            .filter(|email| !email.trim().is_empty())
    }

    fn save(&self, email: &str) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let payload = serde_json::to_vec(&LastEmail {
            email: email.to_string(),
        })?;

        // Write then rename so a crash never leaves a truncated file behind.
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, payload)?;
        fs::rename(&tmp, &self.path)?;

        Ok(())
    }
}

/// Process-local store, used when remembering the email is disabled.
#[derive(Debug, Default)]
pub struct MemoryEmailStore {
    email: Mutex<Option<String>>,
}

impl EmailStore for MemoryEmailStore {
    fn load(&self) -> Option<String> {
        self.email.lock().ok().and_then(|email| email.clone())
    }

    fn save(&self, email: &str) -> Result<(), StorageError> {
        if let Ok(mut stored) = self.email.lock() {
            *stored = Some(email.to_string());
        }
        Ok(())
    }
}

/// Per-user default state directory.
#[must_use]
pub fn default_state_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(env!("CARGO_PKG_NAME")))
}
