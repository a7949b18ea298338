//! Request-level orchestration of cookie and credential authentication.
//!
//! [`SessionGate`] exposes the four points a web server calls into, in
//! request order:
//!
//! 1. [`check_access`](SessionGate::check_access) before routing: validate
//!    the session cookie, if any.
//! 2. [`check_credentials`](SessionGate::check_credentials) when interactive
//!    credentials are presented.
//! 3. [`check_authorization`](SessionGate::check_authorization) with the
//!    resource's requirement list.
//! 4. [`fixup_response`](SessionGate::fixup_response) before headers are
//!    sent: optionally issue a refreshed cookie.
//!
//! Per-request state lives in [`RequestNotes`], which the host shares between
//! a request and its sub-requests so work is not repeated.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::Level;

use crate::actions::{AccessRequirement, AuthnOutcome, AuthorizationEvaluator, Authenticator, AuthzDecision};
use crate::cache::CredentialCache;
use crate::config::ResolvedResource;
use crate::repository::{DirectoryService, RelationalStore};
use crate::session::{expire_cookie_value, find_cookie, set_cookie_value};
use crate::{AuthError, DirectoryConfig, SecretString, TokenCodec, VerifyOutcome};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    Allow,
    Deny,
    /// Let interactive authentication (or another mechanism) decide.
    DeferToNext,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialDecision {
    Granted,
    Denied,
    NotFound,
    /// Backend failure; surface as a server error.
    Error,
}

impl From<AuthnOutcome> for CredentialDecision {
    fn from(outcome: AuthnOutcome) -> Self {
        match outcome {
            AuthnOutcome::Granted => CredentialDecision::Granted,
            AuthnOutcome::Denied => CredentialDecision::Denied,
            AuthnOutcome::NotFound => CredentialDecision::NotFound,
            AuthnOutcome::BackendError => CredentialDecision::Error,
        }
    }
}

/// State shared by a request and its sub-requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestNotes {
    /// `Some(true)` once a cookie validated, `Some(false)` once one failed.
    pub cookie_check: Option<bool>,
    /// A refreshed cookie has already been issued.
    pub cookie_sent: bool,
    pub user: Option<String>,
    /// `user` was established by an interactive credential check.
    pub credentials_verified: bool,
    /// `Set-Cookie` values queued by the access check.
    pub set_cookies: Vec<String>,
}

struct CookieAuth {
    config: DirectoryConfig,
    codec: TokenCodec,
}

pub struct SessionGate<S: RelationalStore, D: DirectoryService> {
    cookie: Option<CookieAuth>,
    authenticator: Authenticator<S, D>,
    evaluator: AuthorizationEvaluator<S>,
    requirements: Vec<AccessRequirement>,
}

impl<S: RelationalStore, D: DirectoryService> SessionGate<S, D> {
    pub fn new(
        cookie: Option<DirectoryConfig>,
        authenticator: Authenticator<S, D>,
        evaluator: AuthorizationEvaluator<S>,
        requirements: Vec<AccessRequirement>,
    ) -> Result<Self, AuthError> {
        let cookie = cookie
            .map(|config| {
                TokenCodec::new(&config).map(|codec| CookieAuth { config, codec })
            })
            .transpose()?;
        Ok(Self {
            cookie,
            authenticator,
            evaluator,
            requirements,
        })
    }

    /// Builds a gate for one resolved resource over shared backends.
    pub fn from_resolved(
        resolved: ResolvedResource,
        store: Arc<S>,
        directory: Arc<D>,
        cache: Arc<CredentialCache>,
    ) -> Result<Self, AuthError> {
        let backend = Arc::new(resolved.backend);
        let authenticator = Authenticator::new(Arc::clone(&store), directory, cache, Arc::clone(&backend));
        let evaluator = AuthorizationEvaluator::new(store, backend);
        Self::new(resolved.cookie, authenticator, evaluator, resolved.requirements)
    }

    pub fn cookie_config(&self) -> Option<&DirectoryConfig> {
        self.cookie.as_ref().map(|c| &c.config)
    }

    pub fn requirements(&self) -> &[AccessRequirement] {
        &self.requirements
    }

    /// Hook 1. A missing cookie is not an invalid cookie: nothing is
    /// recorded and no expiring `Set-Cookie` is queued.
    pub fn check_access(
        &self,
        cookie_header: Option<&str>,
        remote_address: &str,
        now: DateTime<Utc>,
        notes: &mut RequestNotes,
    ) -> AccessDecision {
        let Some(cookie) = &self.cookie else {
            return AccessDecision::DeferToNext;
        };

        match notes.cookie_check {
            Some(true) => return AccessDecision::Allow,
            Some(false) => return self.fallback(cookie),
            None => {}
        }

        let Some(raw) = cookie_header.and_then(|h| find_cookie(h, &cookie.config.cookie_name)) else {
            return self.fallback(cookie);
        };

        match cookie.codec.verify(&raw, remote_address, now) {
            VerifyOutcome::Valid(user) => {
                log::log!(
                    target: "shuebox_auth::session",
                    verbosity(&cookie.config),
                    "msg=\"user set from cookie\" user=\"{user}\" cookie=\"{}\"",
                    cookie.config.cookie_name
                );
                notes.cookie_check = Some(true);
                notes.user = Some(user);
                AccessDecision::Allow
            }
            invalid => {
                log::log!(
                    target: "shuebox_auth::session",
                    verbosity(&cookie.config),
                    "msg=\"rejected session cookie\" reason=\"{invalid}\" remote=\"{remote_address}\" cookie=\"{}\"",
                    cookie.config.cookie_name
                );
                if cookie.config.expire_on_invalid {
                    notes.set_cookies.push(expire_cookie_value(&cookie.config));
                }
                notes.cookie_check = Some(false);
                self.fallback(cookie)
            }
        }
    }

    /// Hook 2. Identities already established for this logical request are
    /// granted without another backend round trip.
    pub async fn check_credentials(
        &self,
        identity: &str,
        secret: &SecretString,
        notes: &mut RequestNotes,
    ) -> CredentialDecision {
        let already_known = notes.user.as_deref() == Some(identity)
            && (notes.cookie_check == Some(true) || notes.credentials_verified);
        if already_known {
            return CredentialDecision::Granted;
        }

        let decision = CredentialDecision::from(self.authenticator.authenticate(identity, secret).await);
        if decision == CredentialDecision::Granted {
            notes.user = Some(identity.to_owned());
            notes.credentials_verified = true;
        }
        decision
    }

    /// Hook 3.
    pub async fn check_authorization(&self, notes: &RequestNotes) -> AuthzDecision {
        match notes.user.as_deref() {
            Some(user) => self.evaluator.authorize(user, &self.requirements).await,
            None => AuthzDecision::Denied,
        }
    }

    /// Hook 4. Returns a `Set-Cookie` value at most once per logical request.
    pub fn fixup_response(
        &self,
        remote_address: &str,
        now: DateTime<Utc>,
        notes: &mut RequestNotes,
    ) -> Option<String> {
        let cookie = self.cookie.as_ref()?;
        let lifetime = cookie.config.refresh_ttl.lifetime()?;
        if notes.cookie_sent || notes.cookie_check == Some(false) {
            return None;
        }
        let user = notes.user.as_deref()?;

        match cookie.codec.issue(user, remote_address, now, lifetime) {
            Ok(token) => {
                notes.cookie_sent = true;
                Some(set_cookie_value(&cookie.config, &token, lifetime))
            }
            Err(e) => {
                log::warn!(target: "shuebox_auth::session", "msg=\"could not issue refreshed cookie\" user=\"{user}\" error=\"{e}\"");
                None
            }
        }
    }

    fn fallback(&self, cookie: &CookieAuth) -> AccessDecision {
        if cookie.config.authoritative {
            AccessDecision::Deny
        } else {
            AccessDecision::DeferToNext
        }
    }
}

fn verbosity(config: &DirectoryConfig) -> Level {
    if config.verbose { Level::Info } else { Level::Debug }
}
