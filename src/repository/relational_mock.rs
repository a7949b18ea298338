#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::AuthError;

use super::relational::RelationalStore;

type QueryKey = (String, Vec<String>);

/// In-memory [`RelationalStore`]: canned flags per `(sql, params)`.
///
/// Anything not programmed yields no row. Every call is recorded.
#[derive(Clone, Default)]
pub struct MockRelationalStore {
    pub flags: Arc<Mutex<HashMap<QueryKey, bool>>>,
    pub failing: Arc<Mutex<HashSet<String>>>,
    pub calls: Arc<Mutex<Vec<QueryKey>>>,
}

impl MockRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Programs `sql` with exactly `params` to return `flag`.
    pub fn set_flag(&self, sql: &str, params: &[&str], flag: bool) {
        self.flags.lock().unwrap().insert(key(sql, params), flag);
    }

    /// Makes every call to `sql` fail with a database error.
    pub fn fail_query(&self, sql: &str) {
        self.failing.lock().unwrap().insert(sql.to_owned());
    }

    pub fn calls(&self) -> Vec<(String, Vec<String>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_to(&self, sql: &str) -> usize {
        self.calls.lock().unwrap().iter().filter(|(s, _)| s == sql).count()
    }

    fn record(&self, sql: &str, params: &[&str]) -> Result<(), AuthError> {
        self.calls.lock().unwrap().push(key(sql, params));
        if self.failing.lock().unwrap().contains(sql) {
            return Err(AuthError::DatabaseError(format!("mock failure for `{sql}`")));
        }
        Ok(())
    }
}

fn key(sql: &str, params: &[&str]) -> QueryKey {
    (
        sql.to_owned(),
        params.iter().map(|p| (*p).to_owned()).collect(),
    )
}

#[async_trait]
impl RelationalStore for MockRelationalStore {
    async fn query_flag(&self, sql: &str, params: &[&str]) -> Result<Option<bool>, AuthError> {
        self.record(sql, params)?;
        Ok(self.flags.lock().unwrap().get(&key(sql, params)).copied())
    }

    async fn execute(&self, sql: &str, params: &[&str]) -> Result<(), AuthError> {
        self.record(sql, params)
    }
}
