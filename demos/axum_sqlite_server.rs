#![allow(
    clippy::print_stdout,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::doc_markdown
)]

//! Axum SQLite Protected Repository Example
//!
//! Serves one protected route behind the session gate. Guests live in an
//! in-memory SQLite table; the institutional directory is the in-memory mock,
//! seeded with one account.
//!
//! Run with: `cargo run --example axum_sqlite_server --features "axum_api sqlx_sqlite mocks"`
//!
//! Test requests:
//!   curl -i -u guest@example.com:guest-pw http://localhost:8080/repo
//!   curl -i -u jdoe:directory-pw http://localhost:8080/repo
//!   curl -i -H "Cookie: shuebox=<value from Set-Cookie>" http://localhost:8080/repo

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::get;
use axum::{Extension, Router, middleware};
use shuebox_auth::api::axum::{AuthenticatedUser, enforce_session};
use shuebox_auth::config::{ResourceLayer, resolve_chain};
use shuebox_auth::crypto::digest_secret;
use shuebox_auth::sqlite::SqliteRelationalStore;
use shuebox_auth::{CredentialCache, MockDirectoryService, SessionGate};
use sqlx::sqlite::SqlitePoolOptions;
use tokio::net::TcpListener;

const SCHEMA: [&str; 4] = [
    "CREATE TABLE guests (email TEXT PRIMARY KEY, password_digest TEXT NOT NULL)",
    "CREATE TABLE collaboration_members (collaboration_id INTEGER NOT NULL, username TEXT NOT NULL)",
    "CREATE TABLE authn_log (username TEXT NOT NULL, emplid TEXT NOT NULL, at TEXT DEFAULT CURRENT_TIMESTAMP)",
    "INSERT INTO collaboration_members VALUES (17, 'guest@example.com'), (17, 'jdoe')",
];

async fn whoami(Extension(AuthenticatedUser(user)): Extension<AuthenticatedUser>) -> String {
    format!("hello, {user}\n")
}

#[tokio::main]
async fn main() {
    // One connection: every query must see the same in-memory database
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to create pool");

    for ddl in SCHEMA {
        sqlx::query(ddl).execute(&pool).await.expect("Failed to create schema");
    }
    sqlx::query("INSERT INTO guests VALUES (?1, ?2)")
        .bind("guest@example.com")
        .bind(digest_secret("guest-pw"))
        .execute(&pool)
        .await
        .expect("Failed to seed guest");

    let directory = MockDirectoryService::new();
    directory.add_account("jdoe", "directory-pw", &[("udEmplid", "700123")]);

    // Server-wide settings, then the per-repository scope
    let server: ResourceLayer = serde_json::from_value(serde_json::json!({
        "cookie": {
            "cookie_name": "shuebox",
            "secret": "0123456789abcdef0123456789abcdef",
            "expire_on_invalid": true,
            "refresh_ttl": 3600,
            "cookie_path": "/"
        },
        "backend": {
            "directory_url": "ldap://localhost/ou=People,dc=example,dc=edu",
            "queries": {
                "guest_authn": "SELECT password_digest = ?2 FROM guests WHERE email = ?1",
                "authn_log": "INSERT INTO authn_log (username, emplid) VALUES (?1, ?2)",
                "authz_collab_user": "SELECT COUNT(*) FROM collaboration_members WHERE collaboration_id = ?1 AND username = ?2"
            }
        }
    }))
    .expect("Invalid server layer");
    let repository: ResourceLayer = serde_json::from_value(serde_json::json!({
        "backend": { "collaboration_id": "17" },
        "requirements": ["shuebox-collab-user"]
    }))
    .expect("Invalid repository layer");

    let resolved = resolve_chain(&[server, repository]).expect("Invalid configuration");
    let gate = Arc::new(
        SessionGate::from_resolved(
            resolved,
            Arc::new(SqliteRelationalStore::new(pool)),
            Arc::new(directory),
            Arc::new(CredentialCache::default()),
        )
        .expect("Invalid cookie configuration"),
    );

    let app = Router::new().route("/repo", get(whoami)).layer(middleware::from_fn_with_state(
        gate,
        enforce_session::<SqliteRelationalStore, MockDirectoryService>,
    ));

    println!("Starting protected repository server on http://localhost:8080");

    let listener = TcpListener::bind("0.0.0.0:8080").await.expect("Failed to bind");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .await
        .expect("Server error");
}
