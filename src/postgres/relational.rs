use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, Row};

use crate::AuthError;
use crate::repository::{RelationalStore, flag_from_text};

/// [`RelationalStore`] over a Postgres pool.
///
/// Parameters bind as `text` to `$1`, `$2`, ...; cast in the query where a
/// column has another type (`collaboration_id = $1::int`).
#[derive(Clone)]
pub struct PostgresRelationalStore {
    pool: PgPool,
}

impl PostgresRelationalStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn first_column_flag(row: &PgRow) -> Option<bool> {
    if let Ok(value) = row.try_get::<Option<bool>, _>(0) {
        return value;
    }
    if let Ok(value) = row.try_get::<Option<i64>, _>(0) {
        return value.map(|n| n != 0);
    }
    if let Ok(value) = row.try_get::<Option<i32>, _>(0) {
        return value.map(|n| n != 0);
    }
    row.try_get::<Option<String>, _>(0)
        .ok()
        .flatten()
        .and_then(|text| flag_from_text(&text))
}

#[async_trait]
impl RelationalStore for PostgresRelationalStore {
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, params), err))]
    async fn query_flag(&self, sql: &str, params: &[&str]) -> Result<Option<bool>, AuthError> {
        let mut query = sqlx::query::<Postgres>(sql);
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
        let mut query = sqlx::query::<Postgres>(sql);
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
