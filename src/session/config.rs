use chrono::Duration;
use serde::Deserialize;

use crate::{AuthError, SecretString};

/// Required length, in characters, of the shared cookie secret.
pub const SECRET_LENGTH: usize = 32;

/// Seconds added to "now" for a session-lifetime cookie (ten years).
pub const SESSION_LIFETIME_SECS: i64 = 315_360_000;

/// Lifetime of an issued token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenLifetime {
    /// Effectively non-expiring; the browser drops the cookie at session end.
    Session,
    Fixed(Duration),
}

impl TokenLifetime {
    pub fn as_duration(&self) -> Duration {
        match self {
            TokenLifetime::Session => Duration::seconds(SESSION_LIFETIME_SECS),
            TokenLifetime::Fixed(ttl) => *ttl,
        }
    }
}

/// Whether (and for how long) a validated request gets a refreshed cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "TtlSetting")]
pub enum RefreshTtl {
    #[default]
    Never,
    Session,
    After(Duration),
}

impl RefreshTtl {
    /// `"session"` or a negative count is a session cookie, `0` disables
    /// refresh, anything else is a number of seconds.
    pub fn parse(raw: &str) -> Result<Self, AuthError> {
        let raw = raw.trim();
        if raw.eq_ignore_ascii_case("session") {
            return Ok(RefreshTtl::Session);
        }
        raw.parse::<i64>()
            .map(Self::from_seconds)
            .map_err(|_| AuthError::ConfigurationError(format!("invalid refresh TTL `{raw}`")))
    }

    pub fn from_seconds(seconds: i64) -> Self {
        match seconds {
            s if s < 0 => RefreshTtl::Session,
            0 => RefreshTtl::Never,
            s => RefreshTtl::After(Duration::seconds(s)),
        }
    }

    pub fn lifetime(&self) -> Option<TokenLifetime> {
        match self {
            RefreshTtl::Never => None,
            RefreshTtl::Session => Some(TokenLifetime::Session),
            RefreshTtl::After(ttl) => Some(TokenLifetime::Fixed(*ttl)),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TtlSetting {
    Seconds(i64),
    Keyword(String),
}

impl TryFrom<TtlSetting> for RefreshTtl {
    type Error = AuthError;

    fn try_from(setting: TtlSetting) -> Result<Self, Self::Error> {
        match setting {
            TtlSetting::Seconds(seconds) => Ok(RefreshTtl::from_seconds(seconds)),
            TtlSetting::Keyword(keyword) => RefreshTtl::parse(&keyword),
        }
    }
}

/// How a presented token hash is compared with the recomputed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashComparison {
    #[default]
    ConstantTime,
    /// Short-circuiting case-insensitive comparison, matching deployed
    /// cookie validators. Leaks timing; use only for compatibility checks.
    LegacyCaseInsensitive,
}

/// Per-protected-directory cookie settings.
#[derive(Debug, Clone)]
pub struct DirectoryConfig {
    pub cookie_name: String,
    /// Exactly [`SECRET_LENGTH`] characters; never logged.
    pub secret: SecretString,
    /// Deny outright when no valid cookie is presented instead of letting
    /// interactive authentication run.
    pub authoritative: bool,
    /// Send an expiring `Set-Cookie` when an invalid cookie is seen.
    pub expire_on_invalid: bool,
    pub verbose: bool,
    pub refresh_ttl: RefreshTtl,
    pub cookie_path: Option<String>,
    pub cookie_domain: Option<String>,
    pub secure_only: bool,
    pub hash_comparison: HashComparison,
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            cookie_name: String::new(),
            secret: SecretString::new(""),
            authoritative: false,
            expire_on_invalid: false,
            verbose: false,
            refresh_ttl: RefreshTtl::Never,
            cookie_path: None,
            cookie_domain: None,
            secure_only: false,
            hash_comparison: HashComparison::ConstantTime,
        }
    }
}

impl DirectoryConfig {
    pub fn new(cookie_name: impl Into<String>, secret: impl Into<SecretString>) -> Self {
        Self {
            cookie_name: cookie_name.into(),
            secret: secret.into(),
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), AuthError> {
        if self.cookie_name.is_empty() {
            return Err(AuthError::ConfigurationError(
                "cookie name must not be empty".to_owned(),
            ));
        }
        if self
            .cookie_name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '=' | ';' | ','))
        {
            return Err(AuthError::ConfigurationError(format!(
                "cookie name `{}` contains reserved characters",
                self.cookie_name
            )));
        }
        if self.secret.char_len() != SECRET_LENGTH {
            return Err(AuthError::ConfigurationError(format!(
                "cookie secret must be {SECRET_LENGTH} characters long"
            )));
        }
        Ok(())
    }
}

/// Partially specified [`DirectoryConfig`] for one configuration scope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DirectoryConfigLayer {
    pub cookie_name: Option<String>,
    pub secret: Option<SecretString>,
    pub authoritative: Option<bool>,
    pub expire_on_invalid: Option<bool>,
    pub verbose: Option<bool>,
    pub refresh_ttl: Option<RefreshTtl>,
    pub cookie_path: Option<String>,
    pub cookie_domain: Option<String>,
    pub secure_only: Option<bool>,
    pub hash_comparison: Option<HashComparison>,
}

impl DirectoryConfigLayer {
    /// Field-wise override: whatever `child` sets wins.
    #[must_use]
    pub fn merge(&self, child: &Self) -> Self {
        Self {
            cookie_name: child.cookie_name.clone().or_else(|| self.cookie_name.clone()),
            secret: child.secret.clone().or_else(|| self.secret.clone()),
            authoritative: child.authoritative.or(self.authoritative),
            expire_on_invalid: child.expire_on_invalid.or(self.expire_on_invalid),
            verbose: child.verbose.or(self.verbose),
            refresh_ttl: child.refresh_ttl.or(self.refresh_ttl),
            cookie_path: child.cookie_path.clone().or_else(|| self.cookie_path.clone()),
            cookie_domain: child.cookie_domain.clone().or_else(|| self.cookie_domain.clone()),
            secure_only: child.secure_only.or(self.secure_only),
            hash_comparison: child.hash_comparison.or(self.hash_comparison),
        }
    }

    /// `Ok(None)` when no cookie name is configured (cookie auth disabled).
    pub fn resolve(&self) -> Result<Option<DirectoryConfig>, AuthError> {
        let Some(cookie_name) = self.cookie_name.clone() else {
            return Ok(None);
        };
        let secret = self.secret.clone().ok_or_else(|| {
            AuthError::ConfigurationError(format!("cookie `{cookie_name}` has no secret"))
        })?;

        let defaults = DirectoryConfig::default();
        let config = DirectoryConfig {
            cookie_name,
            secret,
            authoritative: self.authoritative.unwrap_or(defaults.authoritative),
            expire_on_invalid: self.expire_on_invalid.unwrap_or(defaults.expire_on_invalid),
            verbose: self.verbose.unwrap_or(defaults.verbose),
            refresh_ttl: self.refresh_ttl.unwrap_or(defaults.refresh_ttl),
            cookie_path: self.cookie_path.clone().filter(|p| !p.is_empty()),
            cookie_domain: self.cookie_domain.clone().filter(|d| !d.is_empty()),
            secure_only: self.secure_only.unwrap_or(defaults.secure_only),
            hash_comparison: self.hash_comparison.unwrap_or(defaults.hash_comparison),
        };
        config.validate()?;
        Ok(Some(config))
    }
}
