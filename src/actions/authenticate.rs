use std::sync::Arc;

use crate::cache::{CacheLookup, CredentialCache};
use crate::config::AuthBackendConfig;
use crate::crypto::digest_secret;
use crate::identity::Identity;
use crate::repository::{DirectoryEntry, DirectoryError, DirectorySearch, DirectoryService, RelationalStore};
use crate::SecretString;

/// Result of an interactive credential check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthnOutcome {
    Granted,
    Denied,
    NotFound,
    /// Infrastructure failure; the identity may or may not be valid.
    BackendError,
}

impl AuthnOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthnOutcome::Granted => "granted",
            AuthnOutcome::Denied => "denied",
            AuthnOutcome::NotFound => "not_found",
            AuthnOutcome::BackendError => "backend_error",
        }
    }
}

/// Why a directory bind did not produce an entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindFailure {
    /// The server stayed down for every attempt.
    RetriesExhausted { attempts: u32 },
    Rejected(DirectoryError),
}

impl From<BindFailure> for AuthnOutcome {
    fn from(failure: BindFailure) -> Self {
        match failure {
            BindFailure::Rejected(DirectoryError::NoSuchObject) => AuthnOutcome::NotFound,
            BindFailure::Rejected(
                DirectoryError::InvalidCredentials
                | DirectoryError::InappropriateAuth
                | DirectoryError::InsufficientAccess,
            ) => AuthnOutcome::Denied,
            BindFailure::Rejected(_) | BindFailure::RetriesExhausted { .. } => {
                AuthnOutcome::BackendError
            }
        }
    }
}

/// Verifies identity + secret against the credential cache, then the
/// backend chosen by [`Identity::classify`].
pub struct Authenticator<S: RelationalStore, D: DirectoryService> {
    store: Arc<S>,
    directory: Arc<D>,
    cache: Arc<CredentialCache>,
    config: Arc<AuthBackendConfig>,
}

impl<S: RelationalStore, D: DirectoryService> Authenticator<S, D> {
    pub fn new(
        store: Arc<S>,
        directory: Arc<D>,
        cache: Arc<CredentialCache>,
        config: Arc<AuthBackendConfig>,
    ) -> Self {
        Authenticator {
            store,
            directory,
            cache,
            config,
        }
    }

    pub fn config(&self) -> &AuthBackendConfig {
        &self.config
    }

    /// Only backend grants are cached; denials and errors always go back to
    /// the backend on the next attempt.
    #[cfg_attr(
        feature = "tracing",
        tracing::instrument(name = "authenticate", skip_all)
    )]
    pub async fn authenticate(&self, identity: &str, secret: &SecretString) -> AuthnOutcome {
        if identity.is_empty() || secret.is_empty() {
            return AuthnOutcome::Denied;
        }

        let digest = digest_secret(secret.expose_secret());
        if self.cache.lookup(identity, &digest) == CacheLookup::Hit {
            log::debug!(target: "shuebox_auth::authn", "msg=\"cache hit\" identity=\"{identity}\"");
            return AuthnOutcome::Granted;
        }

        let identity = Identity::classify(identity);
        let outcome = match &identity {
            Identity::Guest(id) => self.authenticate_guest(id, &digest).await,
            Identity::Institutional(id) => self.authenticate_institutional(id, secret).await,
        };

        if outcome == AuthnOutcome::Granted {
            self.cache.insert(identity.as_str(), &digest);
            log::info!(
                target: "shuebox_auth::authn",
                "msg=\"authentication success\" identity=\"{}\" kind=\"{}\"",
                identity,
                identity.kind()
            );
        } else {
            log::warn!(
                target: "shuebox_auth::authn",
                "msg=\"authentication failed\" identity=\"{}\" kind=\"{}\" outcome=\"{}\"",
                identity,
                identity.kind(),
                outcome.as_str()
            );
        }
        outcome
    }

    async fn authenticate_guest(&self, identity: &str, digest: &str) -> AuthnOutcome {
        let Some(sql) = self.config.queries.guest_authn.as_deref() else {
            log::error!(target: "shuebox_auth::authn", "msg=\"no guest authentication query configured\"");
            return AuthnOutcome::BackendError;
        };

        match self.store.query_flag(sql, &[identity, digest]).await {
            Ok(None) => AuthnOutcome::NotFound,
            Ok(Some(false)) => AuthnOutcome::Denied,
            Ok(Some(true)) => AuthnOutcome::Granted,
            Err(e) => {
                log::error!(target: "shuebox_auth::authn", "msg=\"guest authentication query failed\" identity=\"{identity}\" error=\"{e}\"");
                AuthnOutcome::BackendError
            }
        }
    }

    async fn authenticate_institutional(&self, identity: &str, secret: &SecretString) -> AuthnOutcome {
        let Some(directory) = self.config.directory.as_ref() else {
            log::error!(target: "shuebox_auth::authn", "msg=\"no directory service configured\"");
            return AuthnOutcome::BackendError;
        };

        let search = DirectorySearch::for_user(directory, identity);
        match self.bind_with_retry(&search, secret, directory.max_retries).await {
            Ok(entry) => {
                self.record_directory_login(identity, &entry).await;
                AuthnOutcome::Granted
            }
            Err(failure) => {
                log::warn!(target: "shuebox_auth::authn", "msg=\"directory bind failed\" identity=\"{identity}\" reason=\"{failure:?}\"");
                failure.into()
            }
        }
    }

    /// One initial attempt plus up to `max_retries` more while the server is down.
    async fn bind_with_retry(
        &self,
        search: &DirectorySearch,
        secret: &SecretString,
        max_retries: u32,
    ) -> Result<DirectoryEntry, BindFailure> {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.directory.check_user(search, secret).await {
                Ok(entry) => return Ok(entry),
                Err(DirectoryError::ServerDown) if attempts <= max_retries => {
                    log::warn!(target: "shuebox_auth::authn", "msg=\"directory server down, retrying\" attempt=\"{attempts}\"");
                }
                Err(DirectoryError::ServerDown) => {
                    return Err(BindFailure::RetriesExhausted { attempts });
                }
                Err(other) => return Err(BindFailure::Rejected(other)),
            }
        }
    }

    async fn record_directory_login(&self, identity: &str, entry: &DirectoryEntry) {
        let Some(sql) = self.config.queries.authn_log.as_deref() else {
            return;
        };
        let Some(Some(institutional_id)) = entry.attributes.first() else {
            log::warn!(target: "shuebox_auth::authn", "msg=\"directory entry has no institutional id\" identity=\"{identity}\"");
            return;
        };
        if let Err(e) = self.store.execute(sql, &[identity, institutional_id.as_str()]).await {
            log::error!(target: "shuebox_auth::authn", "msg=\"failed to record directory login\" identity=\"{identity}\" error=\"{e}\"");
        }
    }
}
