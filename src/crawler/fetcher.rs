//! Static HTTP page fetcher
//!
//! The default `PageFetcher`, backed by a shared `reqwest` client:
//! - one client per run, identified by the configured user agent
//! - GET requests with a per-request timeout
//! - Error classification into per-URL fetch failures

use crate::config::UserAgentConfig;
use crate::crawler::traits::{FetchOptions, PageContent, PageFetcher};
use crate::{PartcrawlError, Result};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;

/// Builds the shared client every site's fetcher clones
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use partcrawl::config::UserAgentConfig;
/// use partcrawl::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "partcrawl".to_string(),
///     crawler_version: "0.3".to_string(),
///     contact_url: "https://example.fi/bot".to_string(),
///     contact_email: "bot@example.fi".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> std::result::Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.header_value())
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Static HTTP page fetcher
///
/// Pages are taken as served; the wait strategy only matters to rendering
/// fetchers and is ignored here. Redirects are followed by the client and
/// the final URL is reported back.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, options: &FetchOptions) -> Result<PageContent> {
        let response = self
            .client
            .get(url)
            .timeout(options.timeout)
            .send()
            .await
            .map_err(|e| classify_error(url, e))?;

        let status = response.status();
        let final_url = response.url().to_string();

        if !status.is_success() {
            return Err(PartcrawlError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        // A missing Content-Type is given the benefit of the doubt
        if let Some(content_type) = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
        {
            if !is_html(content_type) {
                return Err(PartcrawlError::ContentMismatch {
                    url: url.to_string(),
                    content_type: content_type.to_string(),
                });
            }
        }

        let body = response.text().await.map_err(|e| classify_error(url, e))?;

        Ok(PageContent {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            body,
        })
    }
}

fn is_html(content_type: &str) -> bool {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();
    mime == "text/html" || mime == "application/xhtml+xml"
}

fn classify_error(url: &str, error: reqwest::Error) -> PartcrawlError {
    if error.is_timeout() {
        PartcrawlError::Timeout {
            url: url.to_string(),
        }
    } else {
        PartcrawlError::Http {
            url: url.to_string(),
            source: error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WaitStrategy;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_config() -> UserAgentConfig {
        UserAgentConfig {
            crawler_name: "TestCrawler".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://example.com/about".to_string(),
            contact_email: "admin@example.com".to_string(),
        }
    }

    fn fetcher() -> HttpFetcher {
        HttpFetcher::new(build_http_client(&create_test_config()).unwrap())
    }

    fn options(timeout: Duration) -> FetchOptions {
        FetchOptions {
            timeout,
            wait: WaitStrategy::Load,
        }
    }

    #[test]
    fn test_build_http_client() {
        let config = create_test_config();
        let client = build_http_client(&config);
        assert!(client.is_ok());
    }

    #[test]
    fn test_is_html() {
        assert!(is_html("text/html"));
        assert!(is_html("text/html; charset=utf-8"));
        assert!(is_html("TEXT/HTML"));
        assert!(!is_html("application/json"));
        assert!(!is_html("image/png"));
    }

    #[tokio::test]
    async fn test_fetch_html_page_sends_user_agent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/tuote"))
            .and(header(
                "user-agent",
                "TestCrawler/1.0 (+https://example.com/about; admin@example.com)",
            ))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string("<h1>Bolt</h1>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let url = format!("{}/tuote", server.uri());
        let page = fetcher()
            .fetch(&url, &options(Duration::from_secs(5)))
            .await
            .unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.url, url);
        assert_eq!(page.final_url, url);
        assert_eq!(page.body, "<h1>Bolt</h1>");
    }

    #[tokio::test]
    async fn test_non_success_status_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = fetcher()
            .fetch(&format!("{}/missing", server.uri()), &options(Duration::from_secs(5)))
            .await;

        assert!(matches!(
            result,
            Err(PartcrawlError::HttpStatus { status: 404, .. })
        ));
    }

    #[tokio::test]
    async fn test_non_html_is_content_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_string("%PDF"),
            )
            .mount(&server)
            .await;

        let result = fetcher()
            .fetch(&format!("{}/esite.pdf", server.uri()), &options(Duration::from_secs(5)))
            .await;

        assert!(matches!(result, Err(PartcrawlError::ContentMismatch { .. })));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let result = fetcher()
            .fetch(&format!("{}/slow", server.uri()), &options(Duration::from_millis(200)))
            .await;

        assert!(matches!(result, Err(PartcrawlError::Timeout { .. })));
    }
}
