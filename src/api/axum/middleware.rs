use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, Request, State};
use axum::http::header::{AUTHORIZATION, COOKIE, SET_COOKIE};
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use chrono::{DateTime, Utc};

use super::error::Rejection;
use crate::gate::{AccessDecision, CredentialDecision, RequestNotes, SessionGate};
use crate::repository::{DirectoryService, RelationalStore};
use crate::{AuthzDecision, SecretString};

/// The principal a forwarded request was admitted as.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

/// All `Cookie` headers of a request joined into one list.
pub fn joined_cookie_header(headers: &HeaderMap) -> Option<String> {
    let values: Vec<&str> = headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(values.join("; "))
    }
}

/// Decodes `Authorization: Basic` into identity and secret.
pub fn basic_credentials(headers: &HeaderMap) -> Option<(String, SecretString)> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, encoded) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded.trim()).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (identity, secret) = decoded.split_once(':')?;
    Some((identity.to_owned(), SecretString::new(secret)))
}

/// Use with `axum::middleware::from_fn_with_state`. The router must be served
/// with `into_make_service_with_connect_info::<SocketAddr>()` since tokens are
/// bound to the client address.
///
/// Expiring cookies queued by the access check are attached to every
/// response, rejections included. A refreshed session cookie is only attached
/// to forwarded responses.
pub async fn enforce_session<S, D>(
    State(gate): State<Arc<SessionGate<S, D>>>,
    mut request: Request,
    next: Next,
) -> Response
where
    S: RelationalStore + 'static,
    D: DirectoryService + 'static,
{
    let Some(remote) = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
    else {
        log::error!(target: "shuebox_auth::api", "msg=\"no connection info on request\" path=\"{}\"", request.uri().path());
        return Rejection::ServerError.into_response();
    };

    let now = Utc::now();
    let mut notes = RequestNotes::default();
    let admitted = admit(&gate, request.headers(), &remote, now, &mut notes).await;

    let mut response = match admitted {
        Ok(()) => {
            if let Some(user) = notes.user.clone() {
                request.extensions_mut().insert(AuthenticatedUser(user));
            }
            let mut response = next.run(request).await;
            if let Some(refreshed) = gate.fixup_response(&remote, now, &mut notes) {
                append_set_cookie(&mut response, &refreshed);
            }
            response
        }
        Err(rejection) => {
            log::debug!(
                target: "shuebox_auth::api",
                "msg=\"request rejected\" status=\"{}\" remote=\"{remote}\"",
                rejection.status().as_u16()
            );
            rejection.into_response()
        }
    };

    for value in &notes.set_cookies {
        append_set_cookie(&mut response, value);
    }
    response
}

async fn admit<S, D>(
    gate: &SessionGate<S, D>,
    headers: &HeaderMap,
    remote: &str,
    now: DateTime<Utc>,
    notes: &mut RequestNotes,
) -> Result<(), Rejection>
where
    S: RelationalStore,
    D: DirectoryService,
{
    let cookie_header = joined_cookie_header(headers);
    match gate.check_access(cookie_header.as_deref(), remote, now, notes) {
        AccessDecision::Allow => {}
        AccessDecision::Deny => return Err(Rejection::Unauthorized),
        AccessDecision::DeferToNext => {
            let (identity, secret) = basic_credentials(headers).ok_or(Rejection::Unauthorized)?;
            match gate.check_credentials(&identity, &secret, notes).await {
                CredentialDecision::Granted => {}
                CredentialDecision::Denied | CredentialDecision::NotFound => {
                    return Err(Rejection::Unauthorized);
                }
                CredentialDecision::Error => return Err(Rejection::ServerError),
            }
        }
    }

    match gate.check_authorization(notes).await {
        AuthzDecision::Granted => Ok(()),
        AuthzDecision::Denied | AuthzDecision::Declined => Err(Rejection::Forbidden),
    }
}

fn append_set_cookie(response: &mut Response, value: &str) {
    match HeaderValue::from_str(value) {
        Ok(header) => {
            response.headers_mut().append(SET_COOKIE, header);
        }
        Err(e) => {
            log::error!(target: "shuebox_auth::api", "msg=\"unencodable Set-Cookie value\" error=\"{e}\"");
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_joined_cookie_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(joined_cookie_header(&headers), None);

        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("sess=tok"));
        assert_eq!(joined_cookie_header(&headers).as_deref(), Some("a=1; sess=tok"));
    }

    #[test]
    fn test_basic_credentials() {
        let mut headers = HeaderMap::new();
        let encoded = STANDARD.encode("jdoe:pa:ss");
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Basic {encoded}")).unwrap());

        let (identity, secret) = basic_credentials(&headers).unwrap();
        assert_eq!(identity, "jdoe");
        assert_eq!(secret.expose_secret(), "pa:ss");
    }

    #[test]
    fn test_basic_credentials_rejects_other_schemes() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(basic_credentials(&headers).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic !!!"));
        assert!(basic_credentials(&headers).is_none());

        let no_colon = STANDARD.encode("jdoe");
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Basic {no_colon}")).unwrap());
        assert!(basic_credentials(&headers).is_none());
    }
}
