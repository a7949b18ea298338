//! Web-framework adapters hosting the [`SessionGate`](crate::SessionGate) hooks.

#[cfg(feature = "axum_api")]
pub mod axum;
