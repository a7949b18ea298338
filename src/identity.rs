//! Classification of a claimed principal by its shape.

use std::fmt;

/// Marker that distinguishes externally-sponsored guest accounts.
pub const GUEST_DOMAIN_SEPARATOR: char = '@';

/// The claimed principal of a request.
///
/// Guest accounts (`someone@example.org`) live in the relational store with a
/// digested password; institutional accounts are verified by a directory
/// bind. The split is decided once, here, so backend selection is a `match`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Identity {
    Guest(String),
    Institutional(String),
}

impl Identity {
    /// Total: every string is one or the other.
    pub fn classify(raw: &str) -> Self {
        if raw.contains(GUEST_DOMAIN_SEPARATOR) {
            Identity::Guest(raw.to_owned())
        } else {
            Identity::Institutional(raw.to_owned())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Identity::Guest(id) | Identity::Institutional(id) => id,
        }
    }

    pub fn is_guest(&self) -> bool {
        matches!(self, Identity::Guest(_))
    }

    /// Short label used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Identity::Guest(_) => "guest",
            Identity::Institutional(_) => "institutional",
        }
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_guest() {
        let identity = Identity::classify("visitor@example.org");
        assert_eq!(identity, Identity::Guest("visitor@example.org".to_owned()));
        assert!(identity.is_guest());
        assert_eq!(identity.kind(), "guest");
    }

    #[test]
    fn test_classify_institutional() {
        let identity = Identity::classify("jdoe");
        assert_eq!(identity, Identity::Institutional("jdoe".to_owned()));
        assert!(!identity.is_guest());
    }

    #[test]
    fn test_classify_edge_cases() {
        assert!(Identity::classify("@").is_guest());
        assert!(Identity::classify("trailing@").is_guest());
        assert!(!Identity::classify("").is_guest());
        assert!(!Identity::classify("no-at-sign.example.org").is_guest());
    }

    #[test]
    fn test_as_str_round_trips_input() {
        for raw in ["a@b", "plain", "", "(weird*)"] {
            assert_eq!(Identity::classify(raw).as_str(), raw);
        }
    }
}
