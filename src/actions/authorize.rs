use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::config::AuthBackendConfig;
use crate::repository::RelationalStore;
use crate::AuthError;

/// One `require` predicate for a protected resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessRequirement {
    CollaborationMember,
    RepositoryMember,
    CollaborationAdmin,
    AnyAuthenticatedUser,
}

impl AccessRequirement {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessRequirement::CollaborationMember => "shuebox-collab-user",
            AccessRequirement::RepositoryMember => "shuebox-repo-user",
            AccessRequirement::CollaborationAdmin => "shuebox-collab-admin",
            AccessRequirement::AnyAuthenticatedUser => "valid-user",
        }
    }
}

impl fmt::Display for AccessRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccessRequirement {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "shuebox-collab-user" => Ok(AccessRequirement::CollaborationMember),
            "shuebox-repo-user" => Ok(AccessRequirement::RepositoryMember),
            "shuebox-collab-admin" => Ok(AccessRequirement::CollaborationAdmin),
            "valid-user" => Ok(AccessRequirement::AnyAuthenticatedUser),
            other => Err(AuthError::ConfigurationError(format!(
                "unknown access requirement `{other}`"
            ))),
        }
    }
}

/// Parses `require` lines in order. Only the first word of each line counts;
/// lines naming something other modules handle are skipped.
pub fn parse_requirements<'a>(lines: impl IntoIterator<Item = &'a str>) -> Vec<AccessRequirement> {
    lines
        .into_iter()
        .filter_map(|line| line.split_whitespace().next())
        .filter_map(|word| word.parse().ok())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthzDecision {
    Granted,
    Denied,
    /// Not decided here; a downstream mechanism may still grant.
    Declined,
}

impl AuthzDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthzDecision::Granted => "granted",
            AuthzDecision::Denied => "denied",
            AuthzDecision::Declined => "declined",
        }
    }
}

/// Maps role membership in the configured collaboration/repository onto an
/// ordered requirement list.
pub struct AuthorizationEvaluator<S: RelationalStore> {
    store: Arc<S>,
    config: Arc<AuthBackendConfig>,
}

impl<S: RelationalStore> AuthorizationEvaluator<S> {
    pub fn new(store: Arc<S>, config: Arc<AuthBackendConfig>) -> Self {
        AuthorizationEvaluator { store, config }
    }

    /// The first satisfied requirement grants. A failing membership query
    /// only makes its own requirement unsatisfied.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "authorize", skip_all)
    )]
    pub async fn authorize(&self, identity: &str, requirements: &[AccessRequirement]) -> AuthzDecision {
        let Some(collaboration_id) = self.config.collaboration_id.as_deref() else {
            log::error!(target: "shuebox_auth::authz", "msg=\"no collaboration id configured\" identity=\"{identity}\"");
            return self.unsatisfied();
        };
        if requirements.is_empty() {
            return AuthzDecision::Declined;
        }

        for requirement in requirements {
            if self.is_satisfied(*requirement, collaboration_id, identity).await {
                log::debug!(target: "shuebox_auth::authz", "msg=\"requirement satisfied\" identity=\"{identity}\" requirement=\"{requirement}\"");
                return AuthzDecision::Granted;
            }
        }

        if self.config.authoritative {
            log::warn!(
                target: "shuebox_auth::authz",
                "msg=\"access denied\" identity=\"{identity}\" collaboration=\"{collaboration_id}\" reason=\"requirements not met\""
            );
        }
        self.unsatisfied()
    }

    fn unsatisfied(&self) -> AuthzDecision {
        if self.config.authoritative {
            AuthzDecision::Denied
        } else {
            AuthzDecision::Declined
        }
    }

    async fn is_satisfied(&self, requirement: AccessRequirement, collaboration_id: &str, identity: &str) -> bool {
        let queries = &self.config.queries;
        let result = match requirement {
            AccessRequirement::AnyAuthenticatedUser => return true,
            AccessRequirement::CollaborationMember => {
                self.membership(queries.authz_collab_user.as_deref(), requirement, &[collaboration_id, identity])
                    .await
            }
            AccessRequirement::CollaborationAdmin => {
                self.membership(queries.authz_collab_admin.as_deref(), requirement, &[collaboration_id, identity])
                    .await
            }
            AccessRequirement::RepositoryMember => {
                let Some(repository_id) = self.config.repository_id.as_deref() else {
                    log::error!(target: "shuebox_auth::authz", "msg=\"no repository id configured\" requirement=\"{requirement}\"");
                    return false;
                };
                self.membership(
                    queries.authz_repo_user.as_deref(),
                    requirement,
                    &[collaboration_id, repository_id, identity],
                )
                .await
            }
        };
        result.unwrap_or(false)
    }

    async fn membership(&self, sql: Option<&str>, requirement: AccessRequirement, params: &[&str]) -> Option<bool> {
        let Some(sql) = sql else {
            log::error!(target: "shuebox_auth::authz", "msg=\"no query configured\" requirement=\"{requirement}\"");
            return None;
        };
        match self.store.query_flag(sql, params).await {
            Ok(flag) => flag,
            Err(e) => {
                log::error!(target: "shuebox_auth::authz", "msg=\"membership query failed\" requirement=\"{requirement}\" error=\"{e}\"");
                None
            }
        }
    }
}
