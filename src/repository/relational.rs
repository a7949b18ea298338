use async_trait::async_trait;

use crate::AuthError;

/// Minimal query surface over the SHUEBox database.
///
/// Queries come from [`QueryConfig`](crate::QueryConfig); parameters are bound
/// positionally as text.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    /// First column of the first row interpreted with [`flag_from_text`]
    /// semantics. `Ok(None)` when the query yields no row, or a value that
    /// isn't boolean-ish.
    async fn query_flag(&self, sql: &str, params: &[&str]) -> Result<Option<bool>, AuthError>;

    /// Runs `sql` and discards any rows.
    async fn execute(&self, sql: &str, params: &[&str]) -> Result<(), AuthError>;
}

/// `"0"` is false, any other integer is true; `t`/`true`/`f`/`false` are
/// accepted for drivers that render booleans as text.
pub fn flag_from_text(value: &str) -> Option<bool> {
    let value = value.trim();
    if let Ok(n) = value.parse::<i64>() {
        return Some(n != 0);
    }
    match value.to_ascii_lowercase().as_str() {
        "t" | "true" => Some(true),
        "f" | "false" => Some(false),
        _ => None,
    }
}
