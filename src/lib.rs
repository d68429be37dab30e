//! Shared-secret session guard with encrypted-at-rest persistence.
//!
//! tillvault gates a shop-counter application behind a single shared
//! passphrase. A successful login mints a random per-session token and
//! uses it to encrypt the passphrase for persistence, so the literal
//! passphrase is never stored at rest. While a session is active the
//! guard offers an encrypt/decrypt facade, keyed off the passphrase via
//! Argon2id, for any JSON value collaborators need to persist locally.
//!
//! This protects a shared machine against casual access, not against a
//! hostile user with code running in the same account.

pub mod auth;
pub mod config;
pub mod crypto;
pub mod store;

pub use auth::{GuardOptions, SessionGuard, SessionRecord};
pub use config::Config;
pub use crypto::{CryptoError, KdfSalt};
pub use store::{FileStore, KeyringStore, MemoryStore, SessionStore};
