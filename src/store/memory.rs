use std::sync::Mutex;

use anyhow::Result;

use super::SessionStore;
use crate::auth::SessionRecord;

/// Volatile store: the session record lives only as long as this process.
/// This is the analogue of tab-scoped browser storage and backs short
/// (non-"remember me") logins.
#[derive(Default)]
pub struct MemoryStore {
    slot: Mutex<Option<SessionRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self) -> std::sync::MutexGuard<'_, Option<SessionRecord>> {
        // A poisoned lock only means a writer panicked mid-swap; the slot
        // content is still a whole record or None.
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl SessionStore for MemoryStore {
    fn load(&self) -> Result<Option<SessionRecord>> {
        Ok(self.slot().clone())
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        *self.slot() = Some(record.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot() = None;
        Ok(())
    }
}
