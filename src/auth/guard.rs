use chrono::Duration;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use super::session::{SessionRecord, LONG_SESSION_DAYS, SHORT_SESSION_MINUTES};
use crate::crypto::{cipher, kdf, DataKey, KdfSalt};
use crate::store::SessionStore;

/// Callback invoked after `logout()` has purged secrets and stores, so
/// the host application can drop whatever state it derived while
/// authenticated.
pub type ClearHook = Box<dyn Fn() + Send>;

/// Construction parameters for [`SessionGuard`].
///
/// The application secret is injected here by the application root; the
/// guard has no opinion on where it comes from.
pub struct GuardOptions {
    pub shared_secret: String,
    pub salt: KdfSalt,
    pub short_ttl: Duration,
    pub long_ttl: Duration,
}

impl GuardOptions {
    pub fn new(shared_secret: impl Into<String>, salt: KdfSalt) -> Self {
        Self {
            shared_secret: shared_secret.into(),
            salt,
            short_ttl: Duration::minutes(SHORT_SESSION_MINUTES),
            long_ttl: Duration::days(LONG_SESSION_DAYS),
        }
    }

    pub fn with_short_ttl(mut self, ttl: Duration) -> Self {
        self.short_ttl = ttl;
        self
    }

    pub fn with_long_ttl(mut self, ttl: Duration) -> Self {
        self.long_ttl = ttl;
        self
    }
}

/// Gatekeeper for the whole application: a shared passphrase unlocks it,
/// and everything sensitive that collaborators persist goes through the
/// `seal`/`open` facade so nothing sensitive ever reaches a store in
/// plaintext.
///
/// The guard is an ordinary owned value, constructed once by the
/// application root and passed by reference to whatever needs it.
pub struct SessionGuard {
    options: GuardOptions,
    durable: Box<dyn SessionStore>,
    volatile: Box<dyn SessionStore>,
    current_secret: Option<String>,
    data_key: Option<DataKey>,
    on_clear: Option<ClearHook>,
}

impl SessionGuard {
    pub fn new(
        options: GuardOptions,
        durable: Box<dyn SessionStore>,
        volatile: Box<dyn SessionStore>,
    ) -> Self {
        Self {
            options,
            durable,
            volatile,
            current_secret: None,
            data_key: None,
            on_clear: None,
        }
    }

    /// Register the host application's purge-derived-state routine,
    /// invoked at the end of every `logout()`.
    pub fn with_clear_hook(mut self, hook: ClearHook) -> Self {
        self.on_clear = Some(hook);
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_secret.is_some()
    }

    /// Try to restore a prior session from the stores, durable first.
    ///
    /// Returns true and becomes authenticated only for a record that is
    /// present, parseable, unexpired, and decryptable with its own token.
    /// Everything else is uniformly "no session". Restoring a valid
    /// record does not rewrite it, so calling this twice is harmless.
    pub fn initialize(&mut self) -> bool {
        match self.restore_secret() {
            Some(secret) => {
                self.authenticate(secret);
                true
            }
            None => false,
        }
    }

    fn restore_secret(&self) -> Option<String> {
        for (name, store) in [("durable", &self.durable), ("volatile", &self.volatile)] {
            let record = match store.load() {
                Ok(Some(record)) => record,
                Ok(None) => continue,
                Err(e) => {
                    debug!(store = name, error = %e, "Session store unreadable, treating as no session");
                    continue;
                }
            };

            if record.is_expired() {
                debug!(store = name, "Stored session is expired, discarding it");
                if let Err(e) = store.clear() {
                    warn!(store = name, error = %e, "Failed to discard expired session");
                }
                continue;
            }

            match record.recover_secret() {
                Ok(secret) => {
                    info!(store = name, "Restored session");
                    return Some(secret);
                }
                Err(e) => {
                    warn!(store = name, error = %e, "Stored session failed to decrypt, ignoring it");
                }
            }
        }
        None
    }

    /// Check `candidate` against the configured application secret.
    ///
    /// On a match the guard becomes authenticated and persists a fresh
    /// session record: to the durable store when `persist_long` is set
    /// (30 days), to the volatile store otherwise (30 minutes). On a
    /// mismatch nothing changes. Any number of attempts is allowed; there
    /// is deliberately no lockout for a single shared passphrase.
    pub fn login(&mut self, candidate: &str, persist_long: bool) -> bool {
        if candidate != self.options.shared_secret {
            debug!("Login rejected: secret mismatch");
            return false;
        }

        self.authenticate(candidate.to_string());
        if let Err(e) = self.persist_session(persist_long) {
            // Authentication is in-memory state; a failed write only
            // costs the ability to restore later.
            warn!(error = %e, "Failed to persist session record");
        }
        true
    }

    /// Drop the in-memory secret and data key, delete the session record
    /// from both stores, and run the registered clear hook.
    pub fn logout(&mut self) {
        if let Some(mut secret) = self.current_secret.take() {
            secret.zeroize();
        }
        self.data_key = None;

        for (name, store) in [("durable", &self.durable), ("volatile", &self.volatile)] {
            if let Err(e) = store.clear() {
                warn!(store = name, error = %e, "Failed to clear session store on logout");
            }
        }

        info!("Logged out");
        if let Some(hook) = &self.on_clear {
            hook();
        }
    }

    /// Serialize `data` to JSON and seal it with the data key.
    ///
    /// Returns None while unauthenticated: callers must not be able to
    /// produce sensitive ciphertext without an active session.
    pub fn encrypt<T: Serialize>(&self, data: &T) -> Option<String> {
        let key = self.data_key.as_ref()?;
        let json = match serde_json::to_vec(data) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Payload failed to serialize");
                return None;
            }
        };

        match cipher::seal(key.as_bytes(), &json) {
            Ok(blob) => Some(blob),
            Err(e) => {
                warn!(error = %e, "Payload failed to encrypt");
                None
            }
        }
    }

    /// Open a blob produced by [`Self::encrypt`] and parse it as JSON.
    ///
    /// Returns None while unauthenticated, for empty input, and for any
    /// decrypt or parse failure - a corrupted store degrades to "no
    /// data", never to a crash.
    pub fn decrypt(&self, ciphertext: &str) -> Option<Value> {
        if ciphertext.is_empty() {
            return None;
        }
        let key = self.data_key.as_ref()?;

        let plaintext = match cipher::open(key.as_bytes(), ciphertext) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                debug!(error = %e, "Stored payload failed to decrypt");
                return None;
            }
        };

        match serde_json::from_slice(&plaintext) {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(error = %e, "Decrypted payload is not valid JSON");
                None
            }
        }
    }

    /// Typed convenience over [`Self::decrypt`].
    pub fn decrypt_as<T: DeserializeOwned>(&self, ciphertext: &str) -> Option<T> {
        let value = self.decrypt(ciphertext)?;
        match serde_json::from_value(value) {
            Ok(data) => Some(data),
            Err(e) => {
                debug!(error = %e, "Decrypted payload has an unexpected shape");
                None
            }
        }
    }

    fn authenticate(&mut self, secret: String) {
        match kdf::derive_data_key(&secret, &self.options.salt) {
            Ok(key) => self.data_key = Some(key),
            Err(e) => {
                // Authenticated but unable to seal/open payloads; the
                // facade will answer None until the next login.
                warn!(error = %e, "Data key derivation failed");
                self.data_key = None;
            }
        }
        self.current_secret = Some(secret);
    }

    fn persist_session(&self, persist_long: bool) -> anyhow::Result<()> {
        let secret = self
            .current_secret
            .as_deref()
            .ok_or_else(|| anyhow::anyhow!("No active secret to persist"))?;

        let ttl = if persist_long {
            self.options.long_ttl
        } else {
            self.options.short_ttl
        };
        let record = SessionRecord::create(secret, ttl)?;

        // Exactly one store holds the authoritative record
        self.durable.clear()?;
        self.volatile.clear()?;
        if persist_long {
            self.durable.save(&record)
        } else {
            self.volatile.save(&record)
        }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        if let Some(secret) = self.current_secret.as_mut() {
            secret.zeroize();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::kdf::SALT_BYTES;
    use crate::store::{FileStore, MemoryStore};
    use chrono::Utc;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    const SECRET: &str = "till-secret";

    fn test_salt() -> KdfSalt {
        KdfSalt::from_bytes([42u8; SALT_BYTES])
    }

    fn memory_guard() -> SessionGuard {
        SessionGuard::new(
            GuardOptions::new(SECRET, test_salt()),
            Box::new(MemoryStore::new()),
            Box::new(MemoryStore::new()),
        )
    }

    fn file_guard(dir: &std::path::Path, secret: &str) -> SessionGuard {
        SessionGuard::new(
            GuardOptions::new(secret, test_salt()),
            Box::new(FileStore::new(dir.to_path_buf())),
            Box::new(MemoryStore::new()),
        )
    }

    #[test]
    fn test_login_rejects_wrong_secret() {
        let mut guard = memory_guard();
        assert!(!guard.login("wrong", false));
        assert!(!guard.is_authenticated());
        assert!(guard.durable.load().unwrap().is_none());
        assert!(guard.volatile.load().unwrap().is_none());
    }

    #[test]
    fn test_short_login_lands_in_volatile_store() {
        let mut guard = memory_guard();
        assert!(guard.login(SECRET, false));
        assert!(guard.is_authenticated());

        assert!(guard.durable.load().unwrap().is_none());
        let record = guard.volatile.load().unwrap().unwrap();
        let drift = record.expiry - (Utc::now() + Duration::minutes(30));
        assert!(drift.num_seconds().abs() <= 1);
    }

    #[test]
    fn test_long_login_lands_in_durable_store() {
        let mut guard = memory_guard();
        assert!(guard.login(SECRET, true));

        assert!(guard.volatile.load().unwrap().is_none());
        let record = guard.durable.load().unwrap().unwrap();
        let drift = record.expiry - (Utc::now() + Duration::days(30));
        assert!(drift.num_seconds().abs() <= 1);
    }

    #[test]
    fn test_relogin_moves_record_between_stores() {
        let mut guard = memory_guard();
        assert!(guard.login(SECRET, false));
        assert!(guard.login(SECRET, true));
        assert!(guard.volatile.load().unwrap().is_none());
        assert!(guard.durable.load().unwrap().is_some());
    }

    #[test]
    fn test_facade_round_trip() {
        let mut guard = memory_guard();
        guard.login(SECRET, false);

        let payload = serde_json::json!({
            "customer": "walk-in",
            "points": 120,
            "coupons": ["WELCOME10"],
        });
        let blob = guard.encrypt(&payload).unwrap();
        assert_eq!(guard.decrypt(&blob).unwrap(), payload);
    }

    #[test]
    fn test_facade_requires_authentication() {
        let guard = memory_guard();
        assert!(guard.encrypt(&serde_json::json!({"a": 1})).is_none());
        assert!(guard.decrypt("whatever").is_none());
    }

    #[test]
    fn test_decrypt_rejects_empty_and_garbage() {
        let mut guard = memory_guard();
        guard.login(SECRET, false);
        assert!(guard.decrypt("").is_none());
        assert!(guard.decrypt("not a blob").is_none());
    }

    #[test]
    fn test_key_sensitivity() {
        let dir_a = tempfile::tempdir().unwrap();
        let dir_b = tempfile::tempdir().unwrap();

        let mut guard_a = file_guard(dir_a.path(), SECRET);
        guard_a.login(SECRET, false);
        let blob = guard_a.encrypt(&serde_json::json!([1, 2, 3])).unwrap();

        // Same salt, different configured secret: None, not a wrong value
        let mut guard_b = file_guard(dir_b.path(), "other-secret");
        guard_b.login("other-secret", false);
        assert!(guard_b.decrypt(&blob).is_none());
    }

    #[test]
    fn test_initialize_restores_durable_session() {
        let dir = tempfile::tempdir().unwrap();
        let mut guard = file_guard(dir.path(), SECRET);
        guard.login(SECRET, true);
        let blob = guard.encrypt(&serde_json::json!({"points": 7})).unwrap();
        drop(guard);

        // A fresh process: volatile store is empty, durable survives
        let mut restored = file_guard(dir.path(), SECRET);
        assert!(restored.initialize());
        assert!(restored.is_authenticated());
        assert_eq!(restored.current_secret.as_deref(), Some(SECRET));
        assert_eq!(
            restored.decrypt(&blob).unwrap(),
            serde_json::json!({"points": 7})
        );
    }

    #[test]
    fn test_initialize_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut guard = file_guard(dir.path(), SECRET);
        guard.login(SECRET, true);
        drop(guard);

        let mut restored = file_guard(dir.path(), SECRET);
        assert!(restored.initialize());
        let first = restored.durable.load().unwrap().unwrap();
        assert!(restored.initialize());
        let second = restored.durable.load().unwrap().unwrap();

        assert_eq!(first.token, second.token);
        assert_eq!(first.expiry, second.expiry);
        assert_eq!(first.encrypted_secret, second.encrypted_secret);
    }

    #[test]
    fn test_initialize_without_session() {
        let mut guard = memory_guard();
        assert!(!guard.initialize());
        assert!(!guard.is_authenticated());
    }

    #[test]
    fn test_initialize_discards_expired_session() {
        let mut guard = memory_guard();
        let mut record = SessionRecord::create(SECRET, Duration::minutes(30)).unwrap();
        record.expiry = Utc::now() - Duration::seconds(1);
        guard.durable.save(&record).unwrap();

        assert!(!guard.initialize());
        assert!(!guard.is_authenticated());
        assert!(guard.durable.load().unwrap().is_none());
    }

    #[test]
    fn test_initialize_survives_tampered_record() {
        let dir = tempfile::tempdir().unwrap();
        let mut guard = file_guard(dir.path(), SECRET);
        guard.login(SECRET, true);

        let mut record = guard.durable.load().unwrap().unwrap();
        let flipped = if record.encrypted_secret.starts_with('A') { "B" } else { "A" };
        record.encrypted_secret.replace_range(0..1, flipped);
        guard.durable.save(&record).unwrap();
        drop(guard);

        let mut restored = file_guard(dir.path(), SECRET);
        assert!(!restored.initialize());
        assert!(!restored.is_authenticated());
    }

    #[test]
    fn test_initialize_survives_corrupt_store() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("appAuthSession.json"), "{ not json").unwrap();

        let mut guard = file_guard(dir.path(), SECRET);
        assert!(!guard.initialize());
    }

    #[test]
    fn test_durable_store_wins_over_volatile() {
        let mut guard = memory_guard();
        let durable = SessionRecord::create("from-durable", Duration::minutes(30)).unwrap();
        let volatile = SessionRecord::create("from-volatile", Duration::minutes(30)).unwrap();
        guard.durable.save(&durable).unwrap();
        guard.volatile.save(&volatile).unwrap();

        assert!(guard.initialize());
        assert_eq!(guard.current_secret.as_deref(), Some("from-durable"));
    }

    #[test]
    fn test_logout_clears_everything_and_runs_hook() {
        let cleared = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cleared);

        let mut guard = memory_guard().with_clear_hook(Box::new(move || {
            flag.store(true, Ordering::SeqCst);
        }));
        guard.login(SECRET, true);
        assert!(guard.is_authenticated());

        guard.logout();
        assert!(!guard.is_authenticated());
        assert!(guard.durable.load().unwrap().is_none());
        assert!(guard.volatile.load().unwrap().is_none());
        assert!(cleared.load(Ordering::SeqCst));
        assert!(guard.encrypt(&serde_json::json!(1)).is_none());
    }

    #[test]
    fn test_decrypt_as_typed() {
        #[derive(serde::Serialize, serde::Deserialize, PartialEq, Debug)]
        struct Coupon {
            code: String,
            percent: u8,
        }

        let mut guard = memory_guard();
        guard.login(SECRET, false);

        let coupon = Coupon {
            code: "WELCOME10".to_string(),
            percent: 10,
        };
        let blob = guard.encrypt(&coupon).unwrap();
        assert_eq!(guard.decrypt_as::<Coupon>(&blob).unwrap(), coupon);
        assert!(guard.decrypt_as::<Vec<u32>>(&blob).is_none());
    }
}
