//! Layered per-resource configuration.
//!
//! Each configuration scope (server, collaboration, repository directory)
//! contributes a [`ResourceLayer`] whose fields are all optional. Layers are
//! merged from the outermost scope inward, the inner scope overriding any
//! field it sets, and the result is resolved and validated exactly once.
//!
//! # Example
//!
//! ```rust
//! use shuebox_auth::config::{resolve_chain, ResourceLayer};
//!
//! let server: ResourceLayer = serde_json::from_str(r#"{
//!     "cookie": { "cookie_name": "shuebox", "secret": "0123456789abcdef0123456789abcdef" },
//!     "backend": { "directory_url": "ldaps://ldap.example.edu/dc=example,dc=edu" }
//! }"#).unwrap();
//! let repository: ResourceLayer = serde_json::from_str(r#"{
//!     "backend": { "collaboration_id": "17", "repository_id": "3" },
//!     "requirements": ["shuebox-repo-user", "shuebox-collab-admin"]
//! }"#).unwrap();
//!
//! let resolved = resolve_chain(&[server, repository]).unwrap();
//! assert!(resolved.cookie.is_some());
//! assert_eq!(resolved.requirements.len(), 2);
//! ```

mod backend;
mod directory;

use chrono::Duration;
use serde::Deserialize;

pub use backend::{AuthBackendConfig, BackendLayer, QueryConfig};
pub use directory::{
    DEFAULT_DIRECTORY_RETRIES, DEFAULT_FILTER, DEFAULT_USER_MATCH_ATTRIBUTE,
    DirectoryServiceConfig, INSTITUTIONAL_ID_ATTRIBUTE, LDAP_PORT, LDAPS_PORT, SearchScope,
    TransportSecurity,
};

use crate::AuthError;
use crate::actions::{AccessRequirement, parse_requirements};
use crate::session::{DirectoryConfig, DirectoryConfigLayer};

/// Credential cache tuning.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// How long a verified credential is trusted. Default: 5 minutes.
    pub ttl: Duration,

    /// Initial table size, and the most stale entries one sweep removes.
    /// Default: 50.
    pub capacity: usize,

    /// Lookups plus inserts between sweeps. Default: 80.
    pub sweep_interval: u32,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::seconds(300),
            capacity: 50,
            sweep_interval: 80,
        }
    }
}

/// One configuration scope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ResourceLayer {
    pub cookie: DirectoryConfigLayer,
    pub backend: BackendLayer,
    /// `require` words in declared order.
    pub requirements: Option<Vec<String>>,
}

impl ResourceLayer {
    #[must_use]
    pub fn merge(parent: &Self, child: &Self) -> Self {
        Self {
            cookie: parent.cookie.merge(&child.cookie),
            backend: parent.backend.merge(&child.backend),
            requirements: child
                .requirements
                .clone()
                .or_else(|| parent.requirements.clone()),
        }
    }
}

/// Fully resolved settings for one protected resource.
#[derive(Debug, Clone)]
pub struct ResolvedResource {
    /// `None` when cookie authentication is not configured here.
    pub cookie: Option<DirectoryConfig>,
    pub backend: AuthBackendConfig,
    pub requirements: Vec<AccessRequirement>,
}

/// Merges `layers` outermost first and validates the result.
pub fn resolve_chain(layers: &[ResourceLayer]) -> Result<ResolvedResource, AuthError> {
    let merged = layers
        .iter()
        .fold(ResourceLayer::default(), |acc, layer| ResourceLayer::merge(&acc, layer));

    let requirements = merged
        .requirements
        .as_deref()
        .map(|words| parse_requirements(words.iter().map(String::as_str)))
        .unwrap_or_default();

    Ok(ResolvedResource {
        cookie: merged.cookie.resolve()?,
        backend: merged.backend.resolve()?,
        requirements,
    })
}
