//! # storage
//!
//! The client-local persistence substrate: a plain string key/value store.
//!
//! ## Implementations
//! * [`SessionStore`]: in-memory, owned by exactly one dashboard session.
//!   Dies with the process and is never shared between sessions.
//! * [`LocalStore`]  : JSON file on disk.  Survives restarts; used for the
//!   user-owned portfolio list.
//!
//! Every mutation of a [`LocalStore`] rewrites the file through a temp file
//! + rename, so readers of the file never see a half-written document.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::StorageError;

// ─── Trait ────────────────────────────────────────────────────────────────────

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

// ─── SessionStore ─────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct SessionStore {
    session_id: Uuid,
    entries:    RwLock<HashMap<String, String>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
            entries:    RwLock::new(HashMap::new()),
        }
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for SessionStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        self.entries.write().insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.write().remove(key);
        Ok(())
    }
}

// ─── LocalStore ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct LocalStore {
    path:    PathBuf,
    entries: RwLock<HashMap<String, String>>,
}

impl LocalStore {
    /// Open (or lazily create) the store at `path`.
    ///
    /// A missing file is an empty store.  A corrupt file is logged and treated
    /// as empty; it is overwritten on the next mutation.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();

        let entries: HashMap<String, String> = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Local store is corrupt — starting empty");
                HashMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = entries.len(), "Local store opened");

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        let text = serde_json::to_string_pretty(entries)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, text)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for LocalStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) -> Result<(), StorageError> {
        let mut entries = self.entries.write();
        let mut next = entries.clone();
        next.insert(key.to_string(), value);

        // Memory only moves once the file does.
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.write();
        if !entries.contains_key(key) {
            return Ok(());
        }

        let mut next = entries.clone();
        next.remove(key);
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────
