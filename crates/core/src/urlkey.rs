//! Origin URL validation and key normalization.
//!
//! Normalization steps:
//! 1. Default scheme to https:// if missing
//! 2. Drop query and fragment; keep scheme, host[:port] and path
//! 3. The artifact key is the normalized URL with any trailing slash trimmed

use std::collections::HashSet;

use url::Url;

/// Error type for origin URL validation failures.
///
/// Display strings double as client-facing response bodies.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UrlError {
    #[error("no url supplied")]
    Missing,

    #[error("invalid url")]
    Invalid,

    #[error("domain {0} not allowed")]
    DomainNotAllowed(String),
}

/// A validated, normalized origin URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl {
    target: String,
}

impl ValidatedUrl {
    /// Validate a raw `url` parameter against the allowed-domain set.
    ///
    /// An empty `allowed` set permits every host.
    pub fn parse(raw: &str, allowed: &HashSet<String>) -> Result<Self, UrlError> {
        if raw.is_empty() {
            return Err(UrlError::Missing);
        }

        let with_scheme = if raw.starts_with("https://") || raw.starts_with("http://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };

        let url = Url::parse(&with_scheme).map_err(|_| UrlError::Invalid)?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(UrlError::Invalid),
        };

        if !allowed.is_empty() && !allowed.contains(&host) {
            return Err(UrlError::DomainNotAllowed(host));
        }

        Ok(Self { target: format!("{}://{}{}", url.scheme(), host, url.path()) })
    }

    /// The normalized URL used as the navigation and probe target.
    pub fn target(&self) -> &str {
        &self.target
    }

    /// The artifact and mutex key: the normalized URL with the trailing
    /// slash trimmed.
    pub fn key(&self) -> &str {
        self.target.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_allowlist() -> HashSet<String> {
        HashSet::new()
    }

    #[test]
    fn test_parse_basic() {
        let url = ValidatedUrl::parse("https://example.com/blog/post", &no_allowlist()).unwrap();
        assert_eq!(url.target(), "https://example.com/blog/post");
        assert_eq!(url.key(), "https://example.com/blog/post");
    }

    #[test]
    fn test_parse_default_scheme() {
        let url = ValidatedUrl::parse("example.com", &no_allowlist()).unwrap();
        assert_eq!(url.target(), "https://example.com/");
    }

    #[test]
    fn test_key_trims_trailing_slash() {
        let url = ValidatedUrl::parse("https://example.com/", &no_allowlist()).unwrap();
        assert_eq!(url.key(), "https://example.com");
    }

    #[test]
    fn test_parse_drops_query_and_fragment() {
        let url = ValidatedUrl::parse("https://example.com/p?a=1#frag", &no_allowlist()).unwrap();
        assert_eq!(url.target(), "https://example.com/p");
    }

    #[test]
    fn test_parse_keeps_port() {
        let url = ValidatedUrl::parse("http://127.0.0.1:8080/page", &no_allowlist()).unwrap();
        assert_eq!(url.target(), "http://127.0.0.1:8080/page");
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(ValidatedUrl::parse("", &no_allowlist()), Err(UrlError::Missing));
    }

    #[test]
    fn test_parse_invalid() {
        assert_eq!(ValidatedUrl::parse("lkj laskd", &no_allowlist()), Err(UrlError::Invalid));
    }

    #[test]
    fn test_domain_allowed() {
        let allowed: HashSet<String> = ["example.com".to_string()].into();
        assert!(ValidatedUrl::parse("https://example.com/x", &allowed).is_ok());
    }

    #[test]
    fn test_domain_not_allowed() {
        let allowed: HashSet<String> = ["example.com".to_string()].into();
        let err = ValidatedUrl::parse("nytimes.com", &allowed).unwrap_err();
        assert_eq!(err, UrlError::DomainNotAllowed("nytimes.com".to_string()));
        assert_eq!(err.to_string(), "domain nytimes.com not allowed");
    }

    #[test]
    fn test_domain_check_includes_port() {
        let allowed: HashSet<String> = ["127.0.0.1:8080".to_string()].into();
        assert!(ValidatedUrl::parse("http://127.0.0.1:8080/", &allowed).is_ok());
        assert!(ValidatedUrl::parse("http://127.0.0.1:9090/", &allowed).is_err());
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(UrlError::Missing.to_string(), "no url supplied");
        assert_eq!(UrlError::Invalid.to_string(), "invalid url");
    }
}
