//! Cryptographic primitives for the session guard.
//!
//! This module provides:
//! - `cipher`: ChaCha20-Poly1305 sealing with a textual ciphertext form
//! - `kdf`: Argon2id derivation of the data key from the application secret
//! - `token`: per-login session tokens (32 random bytes, lowercase hex)

pub mod cipher;
pub mod error;
pub mod kdf;
pub mod token;

pub use error::CryptoError;
pub use kdf::{DataKey, KdfSalt};
