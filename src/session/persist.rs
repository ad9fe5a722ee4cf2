use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{PopoteError, PopoteResult};
use crate::session::store::User;

/// The single persisted record used for session rehydration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: Option<String>,
    pub user: Option<User>,
}

/// On-disk storage for the session record, one JSON file at a fixed path.
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Default location: `<storage_dir>/session.json`, or the platform data
    /// directory under `popote/` when no directory is configured.
    pub fn default_path(storage_dir: Option<&Path>) -> PopoteResult<Self> {
        let dir = match storage_dir {
            Some(dir) => dir.to_path_buf(),
            None => dirs::data_local_dir()
                .ok_or_else(|| PopoteError::Config("no platform data directory".into()))?
                .join("popote"),
        };
        Ok(Self::new(dir.join("session.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Absence and parse failure both read as "no session".
    pub fn load(&self) -> Option<SessionRecord> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        match serde_json::from_str(&content) {
            Ok(record) => Some(record),
            Err(err) => {
                tracing::warn!(error = %err, "persisted session unreadable, ignoring");
                None
            }
        }
    }

    pub fn save(&self, record: &SessionRecord) -> PopoteResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(record)?;
        std::fs::write(&self.path, content)?;
        tracing::debug!(path = %self.path.display(), "session persisted");
        Ok(())
    }

    pub fn clear(&self) -> PopoteResult<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
