//! `SQLite` backend for [`RelationalStore`](crate::RelationalStore).
//!
//! Enable the `sqlx_sqlite` feature to use it.

mod relational;

pub use relational::SqliteRelationalStore;
