use std::sync::LazyLock;

use chrono::{DateTime, NaiveDateTime, SubsecRound, Utc};
use regex::Regex;

use super::{EXPIRY_FORMAT, HashComparison, SessionToken, TokenLifetime, VerifyOutcome};
use crate::crypto::{constant_time_eq, generate_nonce, integrity_digest};
use crate::{AuthError, DirectoryConfig, SecretString};

// user,address,expiry,nonce,hash with an optional trailing ';'
#[allow(clippy::expect_used)]
static TOKEN_GRAMMAR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([^,;\s]+),([^,;\s]+),([0-9]{8}T[0-9]{6}),([0-9]+),([0-9A-Fa-f]{32});?$")
        .expect("token grammar is a valid regex")
});

/// Issues and verifies session tokens for one protected directory.
#[derive(Debug, Clone)]
pub struct TokenCodec {
    cookie_name: String,
    secret: SecretString,
    hash_comparison: HashComparison,
}

impl TokenCodec {
    /// Fails when the directory config is unusable (bad name or secret).
    pub fn new(config: &DirectoryConfig) -> Result<Self, AuthError> {
        config.validate()?;
        Ok(Self {
            cookie_name: config.cookie_name.clone(),
            secret: config.secret.clone(),
            hash_comparison: config.hash_comparison,
        })
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    pub fn issue(
        &self,
        user_id: &str,
        remote_address: &str,
        now: DateTime<Utc>,
        lifetime: TokenLifetime,
    ) -> Result<SessionToken, AuthError> {
        check_field("user id", user_id)?;
        check_field("remote address", remote_address)?;

        let ttl = lifetime.as_duration();
        if ttl <= chrono::Duration::zero() {
            return Err(AuthError::InvalidTokenField(
                "lifetime must be positive".to_owned(),
            ));
        }
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::Internal("token expiry out of range".to_owned()))?
            .trunc_subsecs(0);

        let nonce = generate_nonce();
        let expiry_text = expires_at.format(EXPIRY_FORMAT).to_string();
        let integrity_hash =
            self.digest(user_id, remote_address, &expiry_text, &nonce.to_string());

        Ok(SessionToken {
            user_id: user_id.to_owned(),
            remote_address: remote_address.to_owned(),
            expires_at,
            nonce,
            integrity_hash,
        })
    }

    /// Checks, in order: shape, expiry, client address, hash.
    pub fn verify(&self, raw: &str, observed_address: &str, now: DateTime<Utc>) -> VerifyOutcome {
        let Some(caps) = TOKEN_GRAMMAR.captures(raw) else {
            return VerifyOutcome::Malformed;
        };
        let (user_id, address, expiry_text, nonce_text, presented) =
            (&caps[1], &caps[2], &caps[3], &caps[4], &caps[5]);

        if nonce_text.parse::<u64>().is_err() {
            return VerifyOutcome::Malformed;
        }
        let Ok(expiry) = NaiveDateTime::parse_from_str(expiry_text, EXPIRY_FORMAT) else {
            return VerifyOutcome::Malformed;
        };

        if expiry.and_utc() <= now {
            return VerifyOutcome::Expired;
        }
        if !address.eq_ignore_ascii_case(observed_address) {
            return VerifyOutcome::AddressMismatch;
        }

        // The nonce is hashed as presented, so leading zeros must survive.
        let expected = self.digest(user_id, address, expiry_text, nonce_text);
        if self.hashes_match(&expected, presented) {
            VerifyOutcome::Valid(user_id.to_owned())
        } else {
            VerifyOutcome::HashMismatch
        }
    }

    fn digest(&self, user_id: &str, address: &str, expiry: &str, nonce: &str) -> String {
        integrity_digest(&[
            user_id,
            address,
            expiry,
            nonce,
            &self.cookie_name,
            self.secret.expose_secret(),
        ])
    }

    fn hashes_match(&self, expected: &str, presented: &str) -> bool {
        match self.hash_comparison {
            HashComparison::ConstantTime => constant_time_eq(
                expected.as_bytes(),
                presented.to_ascii_lowercase().as_bytes(),
            ),
            HashComparison::LegacyCaseInsensitive => expected.eq_ignore_ascii_case(presented),
        }
    }
}

fn check_field(label: &str, value: &str) -> Result<(), AuthError> {
    if value.is_empty() {
        return Err(AuthError::InvalidTokenField(format!("{label} is empty")));
    }
    if value.chars().any(|c| c == ',' || c == ';' || c.is_whitespace()) {
        return Err(AuthError::InvalidTokenField(format!(
            "{label} contains a reserved character"
        )));
    }
    Ok(())
}
