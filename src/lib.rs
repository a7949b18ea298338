//! Authentication and authorization for SHUEBox collaborations.
//!
//! A request is identified either by a signed, self-expiring session cookie
//! ([`session::TokenCodec`]) or by interactive credentials checked against a
//! relational store (guest accounts) or a directory service (institutional
//! accounts) through [`actions::Authenticator`]. The authenticated principal
//! is then matched against per-resource role membership by
//! [`actions::AuthorizationEvaluator`]. [`gate::SessionGate`] ties the pieces
//! together behind the four web-server hooks.
//!
//! # Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `sqlx_sqlite` | [`RelationalStore`] backed by `SQLite` |
//! | `sqlx_postgres` | [`RelationalStore`] backed by Postgres |
//! | `axum_api` | axum middleware hosting the gate hooks |
//! | `mocks` | in-memory store and directory mocks |
//! | `tracing` | `tracing` spans on async entry points |

pub mod actions;
pub mod cache;
pub mod config;
pub mod crypto;
pub mod gate;
pub mod identity;
pub mod repository;
pub mod session;

#[cfg(feature = "axum_api")]
pub mod api;

#[cfg(feature = "sqlx_postgres")]
pub mod postgres;

#[cfg(feature = "sqlx_sqlite")]
pub mod sqlite;

use std::fmt;

pub use actions::{
    AccessRequirement, AuthnOutcome, AuthorizationEvaluator, Authenticator, AuthzDecision,
};
pub use cache::{CacheLookup, CredentialCache};
pub use config::{AuthBackendConfig, CacheConfig, DirectoryServiceConfig, QueryConfig};
pub use crypto::SecretString;
pub use gate::{AccessDecision, CredentialDecision, RequestNotes, SessionGate};
pub use identity::Identity;
pub use repository::{DirectoryEntry, DirectoryError, DirectorySearch, DirectoryService};
pub use repository::RelationalStore;
pub use session::{DirectoryConfig, RefreshTtl, SessionToken, TokenCodec, TokenLifetime, VerifyOutcome};

#[cfg(any(test, feature = "mocks"))]
pub use repository::{MockDirectoryService, MockRelationalStore};

/// Infrastructure and configuration failures.
///
/// Authentication and authorization *decisions* are never reported through
/// this type; see [`VerifyOutcome`], [`AuthnOutcome`] and [`AuthzDecision`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    ConfigurationError(String),
    InvalidTokenField(String),
    DatabaseError(String),
    DirectoryError(String),
    Internal(String),
}

impl std::error::Error for AuthError {}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::ConfigurationError(msg) => write!(f, "Configuration error: {msg}"),
            AuthError::InvalidTokenField(msg) => write!(f, "Invalid session token field: {msg}"),
            AuthError::DatabaseError(msg) => write!(f, "Database error: {msg}"),
            AuthError::DirectoryError(msg) => write!(f, "Directory service error: {msg}"),
            AuthError::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}
