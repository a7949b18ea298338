//! Self-validating session cookies.
//!
//! A token carries everything needed to check it: the user, the client
//! address it was issued to, an expiry and a nonce, followed by a hash over
//! those fields plus the cookie name and the per-directory secret. No
//! server-side session state is kept.
//!
//! ```text
//! alice,10.0.0.5,20240101T010000,1234567890,0f1e2d3c4b5a69788796a5b4c3d2e1f0
//! ```

mod codec;
mod config;
mod cookie;

use std::fmt;

use chrono::{DateTime, Utc};
pub use codec::TokenCodec;
pub use config::{
    DirectoryConfig, DirectoryConfigLayer, HashComparison, RefreshTtl, SECRET_LENGTH,
    SESSION_LIFETIME_SECS, TokenLifetime,
};
pub use cookie::{expire_cookie_value, find_cookie, set_cookie_value};

/// `strftime` layout of the expiry field, always UTC.
pub const EXPIRY_FORMAT: &str = "%Y%m%dT%H%M%S";

/// A freshly issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    pub user_id: String,
    pub remote_address: String,
    /// Whole seconds, UTC.
    pub expires_at: DateTime<Utc>,
    pub nonce: u64,
    pub integrity_hash: String,
}

impl SessionToken {
    pub fn expiry_text(&self) -> String {
        self.expires_at.format(EXPIRY_FORMAT).to_string()
    }

    /// Wire form, before URL escaping.
    pub fn serialize(&self) -> String {
        format!(
            "{},{},{},{},{}",
            self.user_id,
            self.remote_address,
            self.expiry_text(),
            self.nonce,
            self.integrity_hash
        )
    }
}

/// Result of checking a presented token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// Carries the authenticated user id.
    Valid(String),
    Malformed,
    Expired,
    AddressMismatch,
    HashMismatch,
}

impl VerifyOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyOutcome::Valid(_))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VerifyOutcome::Valid(_) => "valid",
            VerifyOutcome::Malformed => "malformed",
            VerifyOutcome::Expired => "expired",
            VerifyOutcome::AddressMismatch => "address_mismatch",
            VerifyOutcome::HashMismatch => "hash_mismatch",
        }
    }
}

impl fmt::Display for VerifyOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
