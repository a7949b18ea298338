//! axum middleware running the gate hooks in front of protected routes.
//!
//! ```rust,ignore
//! let gate = Arc::new(SessionGate::from_resolved(resolved, store, directory, cache)?);
//! let app = Router::new()
//!     .route("/repo/{*path}", get(serve))
//!     .layer(middleware::from_fn_with_state(gate, enforce_session));
//! axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
//! ```

mod error;
mod middleware;

pub use error::{REALM, Rejection};
pub use middleware::{AuthenticatedUser, basic_credentials, enforce_session, joined_cookie_header};
