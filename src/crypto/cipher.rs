//! Authenticated symmetric encryption with a textual ciphertext form.
//!
//! ChaCha20-Poly1305 with a random 12-byte nonce per sealing. The output
//! is `base64(nonce || ciphertext)`, suitable for storage as a plain
//! string. Authentication means a wrong key or a tampered blob fails
//! detectably instead of yielding garbage plaintext.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;

use super::error::CryptoError;

/// Nonce length for ChaCha20-Poly1305.
pub const NONCE_LEN: usize = 12;

/// Poly1305 authentication tag length.
const TAG_LEN: usize = 16;

/// Encrypt `plaintext` under `key`, returning the textual blob.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<String, CryptoError> {
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::Encrypt)?;

    let mut blob = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(BASE64.encode(blob))
}

/// Decrypt a blob produced by [`seal`] with the same key.
pub fn open(key: &[u8; 32], blob: &str) -> Result<Vec<u8>, CryptoError> {
    let raw = BASE64.decode(blob)?;
    if raw.len() < NONCE_LEN + TAG_LEN {
        return Err(CryptoError::Truncated);
    }

    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
    let cipher = ChaCha20Poly1305::new(Key::from_slice(key));
    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decrypt)
}
