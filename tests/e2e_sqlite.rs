// these tests use #[serial] because each one builds a fresh in-memory
// database over a single shared connection.

//! End-to-end tests for the `SQLite` relational store.
//!
//! These tests use an in-memory `SQLite` database.
//! Run with: `cargo test --features "sqlx_sqlite mocks" --test e2e_sqlite`

#![cfg(all(feature = "sqlx_sqlite", feature = "mocks"))]
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use serial_test::serial;
use shuebox_auth::config::{QueryConfig, ResourceLayer, resolve_chain};
use shuebox_auth::crypto::digest_secret;
use shuebox_auth::sqlite::SqliteRelationalStore;
use shuebox_auth::{
    AccessRequirement, AuthBackendConfig, AuthnOutcome, AuthorizationEvaluator, Authenticator,
    AuthzDecision, CredentialCache, CredentialDecision, DirectoryServiceConfig,
    MockDirectoryService, RelationalStore, RequestNotes, SecretString, SessionGate,
};
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;

const GUEST_AUTHN: &str = "SELECT password_digest = ?2 FROM guests WHERE email = ?1";
const AUTHN_LOG: &str = "INSERT INTO authn_log (username, emplid) VALUES (?1, ?2)";
const COLLAB_USER: &str =
    "SELECT COUNT(*) FROM collaboration_members WHERE collaboration_id = ?1 AND username = ?2";
const COLLAB_ADMIN: &str = "SELECT COUNT(*) FROM collaboration_members \
     WHERE collaboration_id = ?1 AND username = ?2 AND is_admin = 1";
const REPO_USER: &str = "SELECT COUNT(*) FROM repository_members \
     WHERE collaboration_id = ?1 AND repository_id = ?2 AND username = ?3";

async fn setup_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory SQLite database");

    for ddl in [
        "CREATE TABLE guests (email TEXT PRIMARY KEY, password_digest TEXT NOT NULL)",
        "CREATE TABLE collaboration_members (collaboration_id INTEGER NOT NULL, username TEXT NOT NULL, is_admin INTEGER NOT NULL DEFAULT 0)",
        "CREATE TABLE repository_members (collaboration_id INTEGER NOT NULL, repository_id INTEGER NOT NULL, username TEXT NOT NULL)",
        "CREATE TABLE authn_log (username TEXT NOT NULL, emplid TEXT NOT NULL)",
    ] {
        sqlx::query(ddl).execute(&pool).await.expect("Failed to create schema");
    }

    sqlx::query("INSERT INTO guests (email, password_digest) VALUES (?1, ?2)")
        .bind("guest@example.com")
        .bind(digest_secret("guest-pw"))
        .execute(&pool)
        .await
        .unwrap();
    for (user, admin) in [("jdoe", 0), ("guest@example.com", 0), ("boss", 1)] {
        sqlx::query("INSERT INTO collaboration_members (collaboration_id, username, is_admin) VALUES (17, ?1, ?2)")
            .bind(user)
            .bind(admin)
            .execute(&pool)
            .await
            .unwrap();
    }
    sqlx::query("INSERT INTO repository_members (collaboration_id, repository_id, username) VALUES (17, 3, 'jdoe')")
        .execute(&pool)
        .await
        .unwrap();

    pool
}

fn backend_config() -> AuthBackendConfig {
    AuthBackendConfig {
        collaboration_id: Some("17".to_owned()),
        repository_id: Some("3".to_owned()),
        queries: QueryConfig {
            guest_authn: Some(GUEST_AUTHN.to_owned()),
            authn_log: Some(AUTHN_LOG.to_owned()),
            authz_collab_user: Some(COLLAB_USER.to_owned()),
            authz_repo_user: Some(REPO_USER.to_owned()),
            authz_collab_admin: Some(COLLAB_ADMIN.to_owned()),
        },
        directory: Some(
            DirectoryServiceConfig::from_url("ldap://ldap.example.edu/ou=People,dc=example,dc=edu", None)
                .unwrap(),
        ),
        ..Default::default()
    }
}

fn authenticator(
    store: Arc<SqliteRelationalStore>,
    directory: Arc<MockDirectoryService>,
) -> Authenticator<SqliteRelationalStore, MockDirectoryService> {
    Authenticator::new(
        store,
        directory,
        Arc::new(CredentialCache::default()),
        Arc::new(backend_config()),
    )
}

// ============================================================================
// Store
// ============================================================================

#[tokio::test]
#[serial]
async fn test_query_flag_reads_first_column() {
    let store = SqliteRelationalStore::new(setup_db().await);

    assert_eq!(store.query_flag("SELECT 1", &[]).await.unwrap(), Some(true));
    assert_eq!(store.query_flag("SELECT 0", &[]).await.unwrap(), Some(false));
    assert_eq!(store.query_flag("SELECT 't'", &[]).await.unwrap(), Some(true));
    assert_eq!(store.query_flag("SELECT NULL", &[]).await.unwrap(), None);
    assert_eq!(
        store
            .query_flag("SELECT 1 FROM guests WHERE email = ?1", &["nobody@example.com"])
            .await
            .unwrap(),
        None
    );
}

#[tokio::test]
#[serial]
async fn test_invalid_sql_is_a_database_error() {
    let store = SqliteRelationalStore::new(setup_db().await);
    let err = store.query_flag("SELEKT", &[]).await.unwrap_err();
    assert!(matches!(err, shuebox_auth::AuthError::DatabaseError(_)));
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
#[serial]
async fn test_guest_authentication_against_table() {
    let store = Arc::new(SqliteRelationalStore::new(setup_db().await));
    let auth = authenticator(store, Arc::new(MockDirectoryService::new()));

    let granted = auth.authenticate("guest@example.com", &SecretString::new("guest-pw")).await;
    assert_eq!(granted, AuthnOutcome::Granted);

    let denied = auth.authenticate("guest@example.com", &SecretString::new("nope")).await;
    assert_eq!(denied, AuthnOutcome::Denied);

    let missing = auth.authenticate("stranger@example.com", &SecretString::new("pw")).await;
    assert_eq!(missing, AuthnOutcome::NotFound);
}

#[tokio::test]
#[serial]
async fn test_directory_login_is_recorded() {
    let pool = setup_db().await;
    let store = Arc::new(SqliteRelationalStore::new(pool.clone()));
    let directory = Arc::new(MockDirectoryService::new());
    directory.add_account("jdoe", "pw", &[("udEmplid", "700123")]);
    let auth = authenticator(store, directory);

    assert_eq!(auth.authenticate("jdoe", &SecretString::new("pw")).await, AuthnOutcome::Granted);

    let (username, emplid): (String, String) =
        sqlx::query_as("SELECT username, emplid FROM authn_log")
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(username, "jdoe");
    assert_eq!(emplid, "700123");
}

#[tokio::test]
#[serial]
async fn test_guest_table_missing_is_backend_error() {
    let pool = setup_db().await;
    sqlx::query("DROP TABLE guests").execute(&pool).await.unwrap();
    let auth = authenticator(
        Arc::new(SqliteRelationalStore::new(pool)),
        Arc::new(MockDirectoryService::new()),
    );

    let outcome = auth.authenticate("guest@example.com", &SecretString::new("guest-pw")).await;
    assert_eq!(outcome, AuthnOutcome::BackendError);
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
#[serial]
async fn test_membership_requirements() {
    let store = Arc::new(SqliteRelationalStore::new(setup_db().await));
    let evaluator = AuthorizationEvaluator::new(store, Arc::new(backend_config()));

    use AccessRequirement::*;
    assert_eq!(evaluator.authorize("jdoe", &[CollaborationMember]).await, AuthzDecision::Granted);
    assert_eq!(evaluator.authorize("jdoe", &[RepositoryMember]).await, AuthzDecision::Granted);
    assert_eq!(evaluator.authorize("jdoe", &[CollaborationAdmin]).await, AuthzDecision::Denied);
    assert_eq!(evaluator.authorize("boss", &[CollaborationAdmin]).await, AuthzDecision::Granted);
    assert_eq!(
        evaluator.authorize("guest@example.com", &[RepositoryMember, CollaborationMember]).await,
        AuthzDecision::Granted
    );
    assert_eq!(evaluator.authorize("outsider", &[CollaborationMember]).await, AuthzDecision::Denied);
}

#[tokio::test]
#[serial]
async fn test_broken_membership_query_falls_through() {
    let store = Arc::new(SqliteRelationalStore::new(setup_db().await));
    let mut config = backend_config();
    config.queries.authz_collab_user = Some("SELECT nope FROM nowhere".to_owned());
    let evaluator = AuthorizationEvaluator::new(store, Arc::new(config));

    use AccessRequirement::*;
    assert_eq!(evaluator.authorize("jdoe", &[CollaborationMember]).await, AuthzDecision::Denied);
    assert_eq!(
        evaluator.authorize("jdoe", &[CollaborationMember, RepositoryMember]).await,
        AuthzDecision::Granted
    );
}

// ============================================================================
// Gate over resolved configuration
// ============================================================================

#[tokio::test]
#[serial]
async fn test_gate_issues_cookie_that_authenticates_next_request() {
    let layers: Vec<ResourceLayer> = vec![
        serde_json::from_value(serde_json::json!({
            "cookie": {
                "cookie_name": "shuebox",
                "secret": "0123456789abcdef0123456789abcdef",
                "refresh_ttl": 3600
            },
            "backend": {
                "queries": {
                    "guest_authn": GUEST_AUTHN,
                    "authz_collab_user": COLLAB_USER
                }
            }
        }))
        .unwrap(),
        serde_json::from_value(serde_json::json!({
            "backend": { "collaboration_id": "17" },
            "requirements": ["shuebox-collab-user"]
        }))
        .unwrap(),
    ];
    let resolved = resolve_chain(&layers).unwrap();
    let store = Arc::new(SqliteRelationalStore::new(setup_db().await));
    let gate = SessionGate::from_resolved(
        resolved,
        store,
        Arc::new(MockDirectoryService::new()),
        Arc::new(CredentialCache::default()),
    )
    .unwrap();
    let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

    // first request: basic credentials
    let mut notes = RequestNotes::default();
    assert_eq!(
        gate.check_credentials("guest@example.com", &SecretString::new("guest-pw"), &mut notes).await,
        CredentialDecision::Granted
    );
    assert_eq!(gate.check_authorization(&notes).await, AuthzDecision::Granted);
    let set_cookie = gate.fixup_response("10.0.0.5", now, &mut notes).unwrap();
    let pair = set_cookie.split(';').next().unwrap();

    // second request: the cookie alone
    let mut notes = RequestNotes::default();
    let decision = gate.check_access(Some(pair), "10.0.0.5", now, &mut notes);
    assert_eq!(decision, shuebox_auth::AccessDecision::Allow);
    assert_eq!(notes.user.as_deref(), Some("guest@example.com"));
    assert_eq!(gate.check_authorization(&notes).await, AuthzDecision::Granted);
}
