//! Per-login session tokens.
//!
//! A token is minted fresh on every successful login and doubles as the
//! cipher key for the session record it belongs to. It is never reused
//! across logins and never stored anywhere except inside its own record.

use rand::rngs::OsRng;
use rand::RngCore;

use super::error::CryptoError;

/// Raw token length in bytes. Hex-encoded form is twice this.
pub const TOKEN_BYTES: usize = 32;

/// Generate a fresh session token: 32 bytes of OS randomness as
/// lowercase hex (64 characters).
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Decode a token back into the 32-byte cipher key it represents.
pub fn decode_key(token: &str) -> Result<[u8; TOKEN_BYTES], CryptoError> {
    let bytes = hex::decode(token).map_err(|_| CryptoError::InvalidToken {
        expected: TOKEN_BYTES,
    })?;
    bytes
        .try_into()
        .map_err(|_| CryptoError::InvalidToken {
            expected: TOKEN_BYTES,
        })
}
