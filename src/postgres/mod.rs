//! Postgres backend for [`RelationalStore`](crate::RelationalStore).
//!
//! Enable the `sqlx_postgres` feature to use it.

mod relational;

pub use relational::PostgresRelationalStore;
