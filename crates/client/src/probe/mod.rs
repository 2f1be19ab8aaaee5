//! Origin probe: reachability check plus og:image extraction.
//!
//! Before burning a browser tab on a render, the origin is fetched once. A
//! page is reachable iff it answers 200 within the 10 second budget; its
//! declared `og:image` URL (if any) feeds the cache-key comparison. Every
//! failure mode (DNS, timeout, non-200, undecodable body) collapses to
//! "unreachable".

use std::time::Duration;

use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};

use ogserver_core::Error;

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Result of probing an origin URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The origin did not answer 200 in time.
    Unreachable,
    /// The origin answered 200; `og_image` is the content of its
    /// `og:image` meta tag, empty when absent.
    Reachable { og_image: String },
}

/// HTTP client for origin probes.
pub struct Probe {
    http: Client,
}

impl Probe {
    /// Create a probe client with the 10 second overall timeout applied.
    pub fn new() -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(concat!("ogserver/", env!("CARGO_PKG_VERSION")))
            .timeout(PROBE_TIMEOUT)
            .use_rustls_tls()
            .gzip(true)
            .build()
            .map_err(|e| Error::HttpClient(e.to_string()))?;

        Ok(Self { http })
    }

    /// Probe an origin URL.
    pub async fn check(&self, url: &str) -> ProbeOutcome {
        let response = match self.http.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!(url, error = %e, "origin probe failed");
                return ProbeOutcome::Unreachable;
            }
        };

        if response.status() != StatusCode::OK {
            tracing::debug!(url, status = %response.status(), "origin probe non-200");
            return ProbeOutcome::Unreachable;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!(url, error = %e, "origin probe body read failed");
                return ProbeOutcome::Unreachable;
            }
        };

        ProbeOutcome::Reachable { og_image: find_og_image(&body).unwrap_or_default() }
    }
}

/// Extract the `content` of the first `<meta property="og:image">` tag.
pub fn find_og_image(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(r#"meta[property="og:image"]"#).expect("invalid selector");

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn test_find_og_image_present() {
        let html = r#"
            <html><head><title>valid</title>
            <meta property="og:image" content="https://example.com/capture?url=https://example.com" />
            </head><body>valid</body></html>
        "#;
        assert_eq!(
            find_og_image(html),
            Some("https://example.com/capture?url=https://example.com".to_string())
        );
    }

    #[test]
    fn test_find_og_image_absent() {
        let html = "<html><head><title>no og</title></head><body></body></html>";
        assert_eq!(find_og_image(html), None);
    }

    #[test]
    fn test_find_og_image_first_wins() {
        let html = r#"
            <html><head>
            <meta property="og:image" content="first" />
            <meta property="og:image" content="second" />
            </head></html>
        "#;
        assert_eq!(find_og_image(html), Some("first".to_string()));
    }

    #[test]
    fn test_find_og_image_not_fooled_by_other_meta() {
        let html = r#"<html><head><meta property="og:title" content="nope" /></head></html>"#;
        assert_eq!(find_og_image(html), None);
    }

    #[tokio::test]
    async fn test_check_reachable_with_og_image() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200)
                    .header("content-type", "text/html")
                    .body(r#"<html><head><meta property="og:image" content="https://x.example/og.png" /></head></html>"#);
            })
            .await;

        let probe = Probe::new().unwrap();
        let outcome = probe.check(&server.url("/")).await;
        assert_eq!(outcome, ProbeOutcome::Reachable { og_image: "https://x.example/og.png".to_string() });
    }

    #[tokio::test]
    async fn test_check_reachable_without_og_image() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/plain");
                then.status(200).body("<html><body>hi</body></html>");
            })
            .await;

        let probe = Probe::new().unwrap();
        let outcome = probe.check(&server.url("/plain")).await;
        assert_eq!(outcome, ProbeOutcome::Reachable { og_image: String::new() });
    }

    #[tokio::test]
    async fn test_check_non_200_is_unreachable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/missing");
                then.status(404).body("not here");
            })
            .await;

        let probe = Probe::new().unwrap();
        assert_eq!(probe.check(&server.url("/missing")).await, ProbeOutcome::Unreachable);
    }

    #[tokio::test]
    async fn test_check_connection_refused_is_unreachable() {
        let probe = Probe::new().unwrap();
        // nothing listens on this port
        assert_eq!(probe.check("http://127.0.0.1:9").await, ProbeOutcome::Unreachable);
    }
}
