use anyhow::{Context, Result};
use keyring::Entry;

use super::{SessionStore, STORAGE_KEY};
use crate::auth::SessionRecord;

const SERVICE_NAME: &str = "tillvault";

/// Durable store backed by the OS keychain. The record JSON is kept as
/// the "password" of a single keychain entry, which keeps it out of
/// world-readable files on shared machines.
pub struct KeyringStore {
    service: String,
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Use a non-default service name, e.g. to isolate test entries.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self) -> Result<Entry> {
        Entry::new(&self.service, STORAGE_KEY).context("Failed to create keyring entry")
    }
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for KeyringStore {
    fn load(&self) -> Result<Option<SessionRecord>> {
        match self.entry()?.get_password() {
            Ok(contents) => {
                let record = serde_json::from_str(&contents)
                    .context("Failed to parse session record from keychain")?;
                Ok(Some(record))
            }
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e).context("Failed to read session record from keychain"),
        }
    }

    fn save(&self, record: &SessionRecord) -> Result<()> {
        let contents = serde_json::to_string(record)?;
        self.entry()?
            .set_password(&contents)
            .context("Failed to store session record in keychain")?;
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match self.entry()?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(e).context("Failed to delete session record from keychain"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    #[ignore = "requires an OS keychain"]
    fn test_save_load_clear() {
        let store = KeyringStore::with_service("tillvault-test");
        store.clear().unwrap();

        let record = SessionRecord::create("secret", Duration::minutes(30)).unwrap();
        store.save(&record).unwrap();
        assert_eq!(store.load().unwrap().unwrap().token, record.token);

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
