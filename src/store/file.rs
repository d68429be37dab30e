use std::path::PathBuf;

use anyhow::{Context, Result};

use super::{SessionStore, STORAGE_KEY};
use crate::auth::SessionRecord;

/// Durable store: the session record as a JSON file under the
/// application data directory. Survives restarts; last writer wins if two
/// processes race, which the guard documents rather than arbitrates.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn record_path(&self) -> PathBuf {
        self.dir.join(format!("{}.json", STORAGE_KEY))
    }
}

impl SessionStore for FileStore {
    fn load(&self) -> Result<Option<SessionRecord>> {
        let path = self.record_path();
        if !path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read session file: {}", path.display()))?;
        let record: SessionRecord = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse session file: {}", path.display()))?;
        Ok(Some(record))
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        let path = self.record_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(record)?;
        std::fs::write(&path, contents)
            .with_context(|| format!("Failed to write session file: {}", path.display()))?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        let path = self.record_path();
        if path.exists() {
            std::fs::remove_file(&path)
                .with_context(|| format!("Failed to remove session file: {}", path.display()))?;
        }
        Ok(())
    }
}
