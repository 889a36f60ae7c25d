use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use client_logging::{client_info, client_warn};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use thiserror::Error;

const SESSION_FILENAME: &str = ".listing_session.ron";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredSession {
    pub token: String,
    #[serde(default)]
    pub email: Option<String>,
    pub saved_at: DateTime<Utc>,
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("could not serialize session: {0}")]
    Serialize(#[from] ron::Error),
}

/// Session token kept next to the configuration file.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> PathBuf {
        self.dir.join(SESSION_FILENAME)
    }

    /// Returns `None` when nothing usable is stored.
    pub fn load(&self) -> Option<StoredSession> {
        let path = self.path();
        let content = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return None,
            Err(err) => {
                client_warn!("Failed to read session from {:?}: {}", path, err);
                return None;
            }
        };
        match ron::from_str::<StoredSession>(&content) {
            Ok(session) if !session.token.trim().is_empty() => Some(session),
            Ok(_) => None,
            Err(err) => {
                client_warn!("Failed to parse session from {:?}: {}", path, err);
                None
            }
        }
    }

    pub fn save(&self, session: &StoredSession) -> Result<PathBuf, PersistError> {
        let content = ron::ser::to_string_pretty(session, ron::ser::PrettyConfig::new())?;
        let target = write_atomically(&self.dir, &self.path(), &content)?;
        client_info!("Saved session to {:?}", target);
        Ok(target)
    }

    /// Returns `true` if a session file was removed.
    pub fn clear(&self) -> Result<bool, PersistError> {
        match fs::remove_file(self.path()) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }
}

fn write_atomically(dir: &Path, target: &Path, content: &str) -> Result<PathBuf, PersistError> {
    fs::create_dir_all(dir)?;
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(target).map_err(|err| PersistError::Io(err.error))?;
    Ok(target.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;

    fn session(token: &str) -> StoredSession {
        StoredSession {
            token: token.to_string(),
            email: Some("admin@example.com".to_string()),
            saved_at: Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn saved_session_loads_back() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        assert_eq!(store.load(), None);

        store.save(&session("tok-1")).unwrap();
        assert_eq!(store.load(), Some(session("tok-1")));

        store.save(&session("tok-2")).unwrap();
        assert_eq!(store.load().map(|stored| stored.token), Some("tok-2".to_string()));
    }

    #[test]
    fn clear_removes_the_file_once() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path());
        store.save(&session("tok-1")).unwrap();

        assert!(store.clear().unwrap());
        assert!(!store.clear().unwrap());
        assert_eq!(store.load(), None);
    }

    #[test]
    fn corrupt_or_blank_session_is_ignored() {
        let dir = tempdir().unwrap();
        let store = SessionStore::new(dir.path());

        fs::write(store.path(), "not ron at all").unwrap();
        assert_eq!(store.load(), None);

        store.save(&session("   ")).unwrap();
        assert_eq!(store.load(), None);
    }
}
