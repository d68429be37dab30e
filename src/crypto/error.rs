use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("ciphertext encoding is invalid: {0}")]
    Encoding(#[from] base64::DecodeError),

    #[error("ciphertext is too short to contain a nonce")]
    Truncated,

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed - wrong key or corrupted ciphertext")]
    Decrypt,

    #[error("key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("session token is not a {expected}-byte hex string")]
    InvalidToken { expected: usize },
}
