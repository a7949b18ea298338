//! Digests, nonces and the redacting [`SecretString`] wrapper.

use std::fmt;

use rand::Rng;
use serde::{Deserialize, Deserializer};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Number of bytes of the SHA-256 output kept for a session-token hash.
pub const INTEGRITY_DIGEST_BYTES: usize = 16;

/// Length in hex characters of a session-token hash.
pub const INTEGRITY_DIGEST_HEX_LEN: usize = INTEGRITY_DIGEST_BYTES * 2;

/// A wrapper for passwords and shared secrets that keeps them out of logs.
///
/// `Debug` prints `SecretString([REDACTED])` and `Display` prints
/// `[REDACTED]`. Equality is evaluated in constant time.
///
/// # Example
///
/// ```rust
/// use shuebox_auth::SecretString;
///
/// let secret = SecretString::new("hunter2");
/// assert_eq!(format!("{secret:?}"), "SecretString([REDACTED])");
/// assert_eq!(secret.expose_secret(), "hunter2");
/// ```
#[derive(Clone)]
pub struct SecretString(String);

impl SecretString {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    /// Use only where the raw value is needed, e.g. to digest or bind it.
    #[must_use]
    pub fn expose_secret(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Length in characters, not bytes.
    #[must_use]
    pub fn char_len(&self) -> usize {
        self.0.chars().count()
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretString([REDACTED])")
    }
}

impl fmt::Display for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl From<String> for SecretString {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for SecretString {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl PartialEq for SecretString {
    fn eq(&self, other: &Self) -> bool {
        constant_time_eq(self.0.as_bytes(), other.0.as_bytes())
    }
}

impl Eq for SecretString {}

// Deserialize only: configuration layers carry secrets in, nothing should
// serialize them back out.
impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(SecretString)
    }
}

/// One-way digest of an interactive secret: SHA-256, lowercase hex.
///
/// Guest accounts store this digest in the relational store, and the
/// credential cache keeps it instead of the raw password.
pub fn digest_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

/// Session-token integrity hash over the space-joined `fields`.
///
/// SHA-256 truncated to 128 bits, lowercase hex.
pub fn integrity_digest(fields: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            hasher.update(b" ");
        }
        hasher.update(field.as_bytes());
    }
    let digest = hasher.finalize();
    hex::encode(&digest[..INTEGRITY_DIGEST_BYTES])
}

/// Constant-time comparison; unequal lengths return `false` immediately.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}

/// Fresh per-issuance nonce for a session token.
pub fn generate_nonce() -> u64 {
    rand::thread_rng().r#gen()
}
