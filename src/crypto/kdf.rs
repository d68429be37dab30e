//! Data-key derivation.
//!
//! The encrypt/decrypt façade never keys the cipher with the raw
//! passphrase. A 32-byte data key is derived from it with Argon2id and a
//! per-install salt, so ciphertexts at rest cost a real KDF pass to brute
//! force. The salt is not secret; losing it orphans previously sealed
//! payloads the same way a passphrase change does.

use std::path::Path;

use anyhow::{Context, Result};
use argon2::Argon2;
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use super::error::CryptoError;

/// Salt length in bytes. Hex-encoded on disk.
pub const SALT_BYTES: usize = 16;

/// A derived 32-byte cipher key. Zeroized when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DataKey([u8; 32]);

impl DataKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Per-install KDF salt, generated once and persisted beside the
/// durable session record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KdfSalt([u8; SALT_BYTES]);

impl KdfSalt {
    /// Generate a fresh random salt.
    pub fn generate() -> Self {
        let mut bytes = [0u8; SALT_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    pub fn from_bytes(bytes: [u8; SALT_BYTES]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SALT_BYTES] {
        &self.0
    }

    /// Load the salt from `path`, creating and persisting a new one if the
    /// file is missing. A malformed file is replaced with a fresh salt
    /// rather than failing: the payloads it protected are already
    /// unrecoverable at that point.
    pub fn load_or_create(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read salt file: {}", path.display()))?;
            match hex::decode(contents.trim()) {
                Ok(bytes) if bytes.len() == SALT_BYTES => {
                    let mut salt = [0u8; SALT_BYTES];
                    salt.copy_from_slice(&bytes);
                    debug!("Loaded existing KDF salt");
                    return Ok(Self(salt));
                }
                _ => {
                    warn!(
                        path = %path.display(),
                        "Salt file is malformed, replacing it; previously sealed payloads are lost"
                    );
                }
            }
        }

        let salt = Self::generate();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, hex::encode(salt.0))
            .with_context(|| format!("Failed to write salt file: {}", path.display()))?;
        Ok(salt)
    }
}

/// Derive the façade's data key from the application secret and the
/// per-install salt using Argon2id with default parameters.
pub fn derive_data_key(secret: &str, salt: &KdfSalt) -> Result<DataKey, CryptoError> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(secret.as_bytes(), salt.as_bytes(), &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(DataKey(key))
}
