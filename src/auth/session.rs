use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::crypto::{cipher, token, CryptoError};

/// Short session lifetime in minutes.
/// Covers a working stretch at the counter without leaving the till open.
pub const SHORT_SESSION_MINUTES: i64 = 30;

/// Long ("remember me") session lifetime in days.
pub const LONG_SESSION_DAYS: i64 = 30;

/// A remembered login, as persisted to a session store.
///
/// The record is self-contained: `token` is the cipher key that decrypts
/// `encrypted_secret`, so possession of the record is enough to restore
/// the session until `expiry`. The token exists nowhere else and is never
/// reused across logins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionRecord {
    pub token: String,
    #[serde(rename = "encryptedSecret")]
    pub encrypted_secret: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expiry: DateTime<Utc>,
}

impl SessionRecord {
    /// Mint a record for `secret` that stays valid for `ttl` from now.
    ///
    /// Expiry is fixed here and never extended afterwards; there is no
    /// sliding expiration.
    pub fn create(secret: &str, ttl: Duration) -> Result<Self, CryptoError> {
        let token = token::generate();
        let mut key = token::decode_key(&token)?;
        let sealed = cipher::seal(&key, secret.as_bytes());
        key.zeroize();

        Ok(Self {
            token,
            encrypted_secret: sealed?,
            expiry: Utc::now() + ttl,
        })
    }

    /// A record is expired strictly after its expiry instant; it is still
    /// valid at exactly that instant.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expiry
    }

    /// Decrypt the application secret out of this record using its own
    /// token as the key. Fails on a malformed token, a tampered
    /// ciphertext, or non-UTF-8 plaintext.
    pub fn recover_secret(&self) -> Result<String, CryptoError> {
        let mut key = token::decode_key(&self.token)?;
        let plaintext = cipher::open(&key, &self.encrypted_secret);
        key.zeroize();
        String::from_utf8(plaintext?).map_err(|_| CryptoError::Decrypt)
    }
}
