//! Session persistence: the auth token and the selected dataset survive
//! between invocations.

use crate::domain::model::Session;
use crate::domain::ports::SessionStore;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Stores the session as a small JSON document, e.g. `{"token": "..."}`.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Session> {
        if !self.path.exists() {
            return Ok(Session::default());
        }

        let raw = fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(Session::default());
        }

        match serde_json::from_str(&raw) {
            Ok(session) => Ok(session),
            Err(e) => {
                tracing::warn!(
                    "Ignoring unreadable session file {}: {}",
                    self.path.display(),
                    e
                );
                Ok(Session::default())
            }
        }
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(session)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-process store, used by tests and one-shot runs.
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Session>,
}

impl MemorySessionStore {
    pub fn new(session: Session) -> Self {
        Self {
            session: Mutex::new(session),
        }
    }

    pub fn snapshot(&self) -> Session {
        self.session
            .lock()
            .map(|s| s.clone())
            .unwrap_or_default()
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Session> {
        Ok(self.snapshot())
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Ok(mut guard) = self.session.lock() {
            *guard = session.clone();
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.save(&Session::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_session() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("session.json"));
        assert_eq!(store.load().unwrap(), Session::default());
    }

    #[test]
    fn test_save_load_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileSessionStore::new(dir.path().join("nested").join("session.json"));

        let session = Session {
            token: Some("abc123".into()),
            selected_dataset: Some(7),
        };
        store.save(&session).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("\"token\""));
        assert_eq!(store.load().unwrap(), session);

        store.clear().unwrap();
        assert!(!store.path().exists());
        // Clearing twice is fine.
        store.clear().unwrap();
    }

    #[test]
    fn test_corrupt_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        let store = FileSessionStore::new(path);
        assert_eq!(store.load().unwrap(), Session::default());
    }

    #[test]
    fn test_memory_store() {
        let store = MemorySessionStore::default();
        store
            .save(&Session {
                token: Some("t".into()),
                selected_dataset: None,
            })
            .unwrap();
        assert_eq!(store.load().unwrap().token.as_deref(), Some("t"));
        store.clear().unwrap();
        assert!(store.load().unwrap().token.is_none());
    }
}
