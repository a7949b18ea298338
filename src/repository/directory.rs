use std::fmt;

use async_trait::async_trait;

use crate::SecretString;
use crate::config::{DirectoryServiceConfig, SearchScope};

/// Result classes a directory bind can fail with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// Transient; the caller may retry.
    ServerDown,
    NoSuchObject,
    InvalidCredentials,
    InappropriateAuth,
    InsufficientAccess,
    Other(String),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::ServerDown => f.write_str("server down"),
            DirectoryError::NoSuchObject => f.write_str("no such object"),
            DirectoryError::InvalidCredentials => f.write_str("invalid credentials"),
            DirectoryError::InappropriateAuth => f.write_str("inappropriate authentication"),
            DirectoryError::InsufficientAccess => f.write_str("insufficient access"),
            DirectoryError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DirectoryError {}

/// A user search-then-bind request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectorySearch {
    pub url: String,
    pub base_dn: String,
    pub scope: SearchScope,
    /// Complete filter, identity already escaped.
    pub filter: String,
    pub attributes: Vec<String>,
}

impl DirectorySearch {
    pub fn for_user(config: &DirectoryServiceConfig, identity: &str) -> Self {
        Self {
            url: config.url.clone(),
            base_dn: config.base_dn.clone(),
            scope: config.scope,
            filter: build_user_filter(&config.filter, &config.user_match_attribute, identity),
            attributes: config.attributes.clone(),
        }
    }
}

/// The entry a successful bind resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub dn: String,
    /// One slot per requested attribute, in request order.
    pub attributes: Vec<Option<String>>,
}

/// Directory-service client boundary.
///
/// Implementations search for exactly one entry matching the request and
/// bind as it with `secret`.
#[async_trait]
pub trait DirectoryService: Send + Sync {
    async fn check_user(
        &self,
        search: &DirectorySearch,
        secret: &SecretString,
    ) -> Result<DirectoryEntry, DirectoryError>;
}

/// Backslash-escapes `*`, `(`, `)` and `\`.
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() * 2);
    for c in value.chars() {
        if matches!(c, '*' | '(' | ')' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `(&(<base>)(<attribute>=<escaped identity>))`
pub fn build_user_filter(base_filter: &str, attribute: &str, identity: &str) -> String {
    format!(
        "(&({base_filter})({attribute}={}))",
        escape_filter_value(identity)
    )
}
