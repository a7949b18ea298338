use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, Sqlite, SqlitePool};

use crate::AuthError;
use crate::repository::{RelationalStore, flag_from_text};

/// [`RelationalStore`] over a `SQLite` pool.
///
/// Parameters bind as text, in order, to `?1`, `?2`, ... (or plain `?`).
#[derive(Clone)]
pub struct SqliteRelationalStore {
    pool: SqlitePool,
}

impl SqliteRelationalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn first_column_flag(row: &SqliteRow) -> Option<bool> {
    if let Ok(value) = row.try_get::<Option<i64>, _>(0) {
        return value.map(|n| n != 0);
    }
    if let Ok(value) = row.try_get::<Option<bool>, _>(0) {
        return value;
    }
    row.try_get::<Option<String>, _>(0)
        .ok()
        .flatten()
        .and_then(|text| flag_from_text(&text))
}

#[async_trait]
impl RelationalStore for SqliteRelationalStore {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, params), err))]
    async fn query_flag(&self, sql: &str, params: &[&str]) -> Result<Option<bool>, AuthError> {
        let mut query = sqlx::query::<Sqlite>(sql);
        for param in params {
            query = query.bind((*param).to_owned());
        }

        let row = query.fetch_optional(&self.pool).await.map_err(|e| {
            log::error!(target: "shuebox_auth::db", "msg=\"database error\", operation=\"query_flag\", error=\"{e}\"");
            AuthError::DatabaseError(e.to_string())
        })?;

        Ok(row.as_ref().and_then(first_column_flag))
    }

    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, params), err))]
    async fn execute(&self, sql: &str, params: &[&str]) -> Result<(), AuthError> {
        let mut query = sqlx::query::<Sqlite>(sql);
        for param in params {
            query = query.bind((*param).to_owned());
        }

        query.execute(&self.pool).await.map_err(|e| {
            log::error!(target: "shuebox_auth::db", "msg=\"database error\", operation=\"execute\", error=\"{e}\"");
            AuthError::DatabaseError(e.to_string())
        })?;
        Ok(())
    }
}
