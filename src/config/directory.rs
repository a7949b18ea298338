use url::Url;

use crate::AuthError;

/// Attribute carrying the institutional (employee) id; always searched first.
pub const INSTITUTIONAL_ID_ATTRIBUTE: &str = "udEmplid";

/// Attribute the login name is matched against.
pub const DEFAULT_USER_MATCH_ATTRIBUTE: &str = "uid";

pub const DEFAULT_FILTER: &str = "objectclass=*";

/// Extra attempts made after a "server down" bind failure.
pub const DEFAULT_DIRECTORY_RETRIES: u32 = 5;

pub const LDAP_PORT: u16 = 389;
pub const LDAPS_PORT: u16 = 636;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportSecurity {
    #[default]
    None,
    Ssl,
    StartTls,
}

impl TransportSecurity {
    /// `NONE`, `SSL`, `TLS` or `STARTTLS`, any case.
    pub fn parse(mode: &str) -> Result<Self, AuthError> {
        match mode.trim().to_ascii_uppercase().as_str() {
            "NONE" => Ok(TransportSecurity::None),
            "SSL" => Ok(TransportSecurity::Ssl),
            "TLS" | "STARTTLS" => Ok(TransportSecurity::StartTls),
            other => Err(AuthError::ConfigurationError(format!(
                "invalid directory connection mode `{other}`: must be one of NONE, SSL, TLS/STARTTLS"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchScope {
    OneLevel,
    #[default]
    Subtree,
}

/// Directory-service endpoint and search parameters, parsed from an
/// `ldap[s]://host[:port]/baseDN[?attrs[?scope[?filter]]]` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryServiceConfig {
    pub url: String,
    pub host: String,
    pub port: u16,
    pub security: TransportSecurity,
    pub base_dn: String,
    pub scope: SearchScope,
    /// Base filter without its enclosing parentheses.
    pub filter: String,
    pub user_match_attribute: String,
    /// Starts with [`INSTITUTIONAL_ID_ATTRIBUTE`], which appears exactly once.
    pub attributes: Vec<String>,
    pub max_retries: u32,
}

impl DirectoryServiceConfig {
    pub fn from_url(raw: &str, mode: Option<&str>) -> Result<Self, AuthError> {
        let parsed = Url::parse(raw).map_err(|e| {
            AuthError::ConfigurationError(format!("invalid directory URL `{raw}`: {e}"))
        })?;

        let ldaps = match parsed.scheme() {
            "ldap" => false,
            "ldaps" => true,
            other => {
                return Err(AuthError::ConfigurationError(format!(
                    "unsupported directory URL scheme `{other}`"
                )));
            }
        };

        let mut security = match mode {
            Some(mode) => TransportSecurity::parse(mode)?,
            None => TransportSecurity::None,
        };
        if ldaps {
            security = TransportSecurity::Ssl;
        }

        let host = match parsed.host_str() {
            Some(host) if !host.is_empty() => host.to_owned(),
            _ => "localhost".to_owned(),
        };
        let port = parsed
            .port()
            .unwrap_or(if ldaps { LDAPS_PORT } else { LDAP_PORT });

        let base_dn = decode(parsed.path().trim_start_matches('/'))?;

        let mut parts = parsed.query().unwrap_or("").splitn(3, '?');
        let attrs = decode(parts.next().unwrap_or(""))?;
        let scope = match decode(parts.next().unwrap_or(""))?.to_ascii_lowercase().as_str() {
            "one" => SearchScope::OneLevel,
            _ => SearchScope::Subtree,
        };
        let filter = normalize_filter(&decode(parts.next().unwrap_or(""))?);

        let mut attributes = vec![INSTITUTIONAL_ID_ATTRIBUTE.to_owned()];
        attributes.extend(
            attrs
                .split(',')
                .map(str::trim)
                .filter(|a| !a.is_empty() && !a.eq_ignore_ascii_case(INSTITUTIONAL_ID_ATTRIBUTE))
                .map(str::to_owned),
        );

        Ok(Self {
            url: raw.to_owned(),
            host,
            port,
            security,
            base_dn,
            scope,
            filter,
            user_match_attribute: DEFAULT_USER_MATCH_ATTRIBUTE.to_owned(),
            attributes,
            max_retries: DEFAULT_DIRECTORY_RETRIES,
        })
    }
}

fn decode(component: &str) -> Result<String, AuthError> {
    urlencoding::decode(component)
        .map(|c| c.into_owned())
        .map_err(|e| AuthError::ConfigurationError(format!("invalid directory URL escape: {e}")))
}

fn normalize_filter(filter: &str) -> String {
    let filter = filter.trim();
    let inner = match filter.strip_prefix('(').and_then(|f| f.strip_suffix(')')) {
        Some(inner) => inner,
        None => filter,
    };
    if inner.is_empty() {
        DEFAULT_FILTER.to_owned()
    } else {
        inner.to_owned()
    }
}
