use serde::Deserialize;

use super::DirectoryServiceConfig;

/// SQL run by the [`RelationalStore`](crate::RelationalStore), one per check.
///
/// Parameter order is fixed per query:
///
/// | Query | Parameters |
/// |-------|------------|
/// | `guest_authn` | identity, password digest |
/// | `authn_log` | identity, institutional id |
/// | `authz_collab_user` | collaboration id, identity |
/// | `authz_repo_user` | collaboration id, repository id, identity |
/// | `authz_collab_admin` | collaboration id, identity |
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct QueryConfig {
    pub guest_authn: Option<String>,
    pub authn_log: Option<String>,
    pub authz_collab_user: Option<String>,
    pub authz_repo_user: Option<String>,
    pub authz_collab_admin: Option<String>,
}

impl QueryConfig {
    #[must_use]
    pub fn merge(&self, child: &Self) -> Self {
        Self {
            guest_authn: child.guest_authn.clone().or_else(|| self.guest_authn.clone()),
            authn_log: child.authn_log.clone().or_else(|| self.authn_log.clone()),
            authz_collab_user: child
                .authz_collab_user
                .clone()
                .or_else(|| self.authz_collab_user.clone()),
            authz_repo_user: child
                .authz_repo_user
                .clone()
                .or_else(|| self.authz_repo_user.clone()),
            authz_collab_admin: child
                .authz_collab_admin
                .clone()
                .or_else(|| self.authz_collab_admin.clone()),
        }
    }
}

/// Resolved backend settings for one protected resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthBackendConfig {
    pub collaboration_id: Option<String>,
    pub repository_id: Option<String>,
    pub queries: QueryConfig,
    /// `None` disables the institutional (directory) path.
    pub directory: Option<DirectoryServiceConfig>,
    /// When no requirement is satisfied, deny rather than defer. Default `true`.
    pub authoritative: bool,
}

impl Default for AuthBackendConfig {
    fn default() -> Self {
        Self {
            collaboration_id: None,
            repository_id: None,
            queries: QueryConfig::default(),
            directory: None,
            authoritative: true,
        }
    }
}

/// Partially specified [`AuthBackendConfig`] for one configuration scope.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BackendLayer {
    pub collaboration_id: Option<String>,
    pub repository_id: Option<String>,
    pub queries: QueryConfig,
    pub directory_url: Option<String>,
    /// `NONE`, `SSL` or `TLS`.
    pub directory_mode: Option<String>,
    pub authoritative: Option<bool>,
}

impl BackendLayer {
    #[must_use]
    pub fn merge(&self, child: &Self) -> Self {
        Self {
            collaboration_id: child
                .collaboration_id
                .clone()
                .or_else(|| self.collaboration_id.clone()),
            repository_id: child.repository_id.clone().or_else(|| self.repository_id.clone()),
            queries: self.queries.merge(&child.queries),
            directory_url: child.directory_url.clone().or_else(|| self.directory_url.clone()),
            directory_mode: child.directory_mode.clone().or_else(|| self.directory_mode.clone()),
            authoritative: child.authoritative.or(self.authoritative),
        }
    }

    pub fn resolve(&self) -> Result<AuthBackendConfig, crate::AuthError> {
        let directory = self
            .directory_url
            .as_deref()
            .map(|url| DirectoryServiceConfig::from_url(url, self.directory_mode.as_deref()))
            .transpose()?;

        Ok(AuthBackendConfig {
            collaboration_id: self.collaboration_id.clone(),
            repository_id: self.repository_id.clone(),
            queries: self.queries.clone(),
            directory,
            authoritative: self.authoritative.unwrap_or(true),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_authoritative() {
        let config = AuthBackendConfig::default();
        assert!(config.authoritative);
        assert!(config.directory.is_none());
    }

    #[test]
    fn test_query_merge() {
        let parent = QueryConfig {
            guest_authn: Some("parent guest".to_owned()),
            authz_collab_user: Some("parent collab".to_owned()),
            ..Default::default()
        };
        let child = QueryConfig {
            authz_collab_user: Some("child collab".to_owned()),
            ..Default::default()
        };

        let merged = parent.merge(&child);
        assert_eq!(merged.guest_authn.as_deref(), Some("parent guest"));
        assert_eq!(merged.authz_collab_user.as_deref(), Some("child collab"));
        assert!(merged.authz_repo_user.is_none());
    }

    #[test]
    fn test_layer_resolve_with_directory() {
        let layer = BackendLayer {
            collaboration_id: Some("42".to_owned()),
            directory_url: Some("ldaps://ldap.example.edu/dc=edu".to_owned()),
            authoritative: Some(false),
            ..Default::default()
        };

        let config = layer.resolve().unwrap();
        assert_eq!(config.collaboration_id.as_deref(), Some("42"));
        assert!(!config.authoritative);
        assert_eq!(config.directory.unwrap().host, "ldap.example.edu");
    }

    #[test]
    fn test_layer_resolve_bad_directory_url() {
        let layer = BackendLayer {
            directory_url: Some("ftp://nope".to_owned()),
            ..Default::default()
        };
        assert!(layer.resolve().is_err());
    }
}
