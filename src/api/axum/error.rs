use axum::Json;
use axum::http::StatusCode;
use axum::http::header::WWW_AUTHENTICATE;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Realm advertised in `WWW-Authenticate` challenges.
pub const REALM: &str = "SHUEBox";

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
}

/// Why the gate refused to forward a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// No usable cookie or credentials; the client is challenged.
    Unauthorized,
    Forbidden,
    /// A backend failed or the connection address is unknown.
    ServerError,
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::Unauthorized => StatusCode::UNAUTHORIZED,
            Rejection::Forbidden => StatusCode::FORBIDDEN,
            Rejection::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message(&self) -> &'static str {
        match self {
            Rejection::Unauthorized => "authentication required",
            Rejection::Forbidden => "access denied",
            Rejection::ServerError => "authentication backend unavailable",
        }
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = Json(ErrorBody {
            error: self.message(),
        });
        match self {
            Rejection::Unauthorized => (
                self.status(),
                [(WWW_AUTHENTICATE, format!("Basic realm=\"{REALM}\""))],
                body,
            )
                .into_response(),
            _ => (self.status(), body).into_response(),
        }
    }
}
