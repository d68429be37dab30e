//! Session record persistence.
//!
//! Two stores back the guard: a durable one that survives restarts and a
//! volatile one scoped to the current process. Both hold the same record
//! schema under the same storage key; the durable store wins when both
//! hold a record. An OS-keychain store can stand in for the file store as
//! the durable backend.

pub mod file;
pub mod keyring;
pub mod memory;

pub use file::FileStore;
pub use keyring::KeyringStore;
pub use memory::MemoryStore;

use anyhow::Result;

use crate::auth::SessionRecord;

/// Storage key under which the session record lives in every store.
pub const STORAGE_KEY: &str = "appAuthSession";

/// A place a session record can be kept between logins.
///
/// Implementations report IO and parse problems as errors; the guard
/// treats every error uniformly as "no session".
pub trait SessionStore {
    /// Read the stored record, if any.
    fn load(&self) -> Result<Option<SessionRecord>>;

    /// Write `record`, replacing whatever was stored.
    fn save(&self, record: &SessionRecord) -> Result<()>;

    /// Remove the stored record. Removing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}
