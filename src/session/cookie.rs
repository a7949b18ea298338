//! `Cookie` / `Set-Cookie` header helpers.

use std::borrow::Cow;

use super::{DirectoryConfig, SessionToken, TokenLifetime};

const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// A date well in the past, used to make the browser discard a cookie.
const EXPIRED_DATE: &str = "Fri, 25 Mar 1977 00:00:00 GMT";

/// Finds `name` in a `Cookie` request header and URL-decodes its value.
///
/// Names match exactly; the first occurrence wins.
pub fn find_cookie(header: &str, name: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == name)
        .and_then(|(_, value)| urlencoding::decode(value.trim()).ok())
        .map(Cow::into_owned)
}

/// `Set-Cookie` value carrying `token`. Session lifetimes omit `expires`.
pub fn set_cookie_value(
    config: &DirectoryConfig,
    token: &SessionToken,
    lifetime: TokenLifetime,
) -> String {
    let mut value = format!(
        "{}={}",
        config.cookie_name,
        urlencoding::encode(&token.serialize())
    );
    if let TokenLifetime::Fixed(_) = lifetime {
        value.push_str("; expires=");
        value.push_str(&token.expires_at.format(HTTP_DATE_FORMAT).to_string());
    }
    push_attributes(&mut value, config);
    value
}

/// `Set-Cookie` value that clears the directory's cookie.
pub fn expire_cookie_value(config: &DirectoryConfig) -> String {
    let mut value = format!("{}=; expires={EXPIRED_DATE}", config.cookie_name);
    push_attributes(&mut value, config);
    value
}

fn push_attributes(value: &mut String, config: &DirectoryConfig) {
    if let Some(path) = &config.cookie_path {
        value.push_str("; path=");
        value.push_str(path);
    }
    if let Some(domain) = &config.cookie_domain {
        value.push_str("; domain=");
        value.push_str(domain);
    }
    if config.secure_only {
        value.push_str("; secure");
    }
}
