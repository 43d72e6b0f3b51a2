use crate::error::{FetchError, Result};
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, HeaderMap, HeaderValue};
use scraper::Html;
use std::cell::RefCell;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
    (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Turns a URL into a parsed HTML document.
///
/// Implementations never panic on bad input; every failure is classified
/// into a [`FetchError`] and handed back as data.
pub trait PageFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Html, FetchError>;
}

impl<F: PageFetcher + ?Sized> PageFetcher for &F {
    fn fetch(&self, url: &str) -> std::result::Result<Html, FetchError> {
        (**self).fetch(url)
    }
}

/// Blocking HTTP fetcher with browser-like headers.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        Self::with_timeout(Duration::from_secs(10))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8"),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert("dnt", HeaderValue::from_static("1"));
        headers.insert("upgrade-insecure-requests", HeaderValue::from_static("1"));

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(timeout)
            .gzip(true)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Html, FetchError> {
        debug!("Fetching {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .and_then(|r| r.error_for_status())
            .map_err(classify_reqwest_error)?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_lowercase();
        if !content_type.contains("text/html") {
            return Err(FetchError::NonHtml);
        }

        let body = response.text().map_err(classify_reqwest_error)?;
        Ok(Html::parse_document(&body))
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.is_decode() {
        FetchError::parse(err)
    } else {
        FetchError::request(err)
    }
}

/// Serves pages from memory. Used for offline replays and tests.
#[derive(Debug, Default)]
pub struct MemoryFetcher {
    pages: HashMap<String, (String, String)>,
    hits: RefCell<HashMap<String, usize>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, html: impl Into<String>) -> Self {
        self.insert(url, "text/html; charset=utf-8", html);
        self
    }

    pub fn insert(
        &mut self,
        url: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<String>,
    ) {
        self.pages.insert(url.into(), (content_type.into(), body.into()));
    }

    /// How many times `url` was requested.
    pub fn hits(&self, url: &str) -> usize {
        self.hits.borrow().get(url).copied().unwrap_or(0)
    }

    pub fn total_hits(&self) -> usize {
        self.hits.borrow().values().sum()
    }
}

impl PageFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> std::result::Result<Html, FetchError> {
        *self.hits.borrow_mut().entry(url.to_string()).or_insert(0) += 1;

        match self.pages.get(url) {
            Some((content_type, body)) if content_type.to_lowercase().contains("text/html") => {
                Ok(Html::parse_document(body))
            }
            Some(_) => Err(FetchError::NonHtml),
            None => Err(FetchError::request(format!("404 Not Found for url ({})", url))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::extract_metadata;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    async fn fetch_blocking(url: String, timeout: Duration) -> std::result::Result<Option<String>, FetchError> {
        tokio::task::spawn_blocking(move || {
            let fetcher = HttpFetcher::with_timeout(timeout).unwrap();
            fetcher.fetch(&url).map(|doc| extract_metadata(&doc).0)
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetches_html_document() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(
                        "<html><head><title>Root</title></head><body></body></html>",
                        "text/html; charset=utf-8",
                    ),
            )
            .mount(&mock_server)
            .await;

        let title = fetch_blocking(mock_server.uri(), Duration::from_secs(5)).await;
        assert_eq!(title, Ok(Some("Root".to_string())));
    }

    #[tokio::test]
    async fn test_non_html_content_type() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data.json"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("{}", "application/json"),
            )
            .mount(&mock_server)
            .await;

        let result = fetch_blocking(format!("{}/data.json", mock_server.uri()), Duration::from_secs(5)).await;
        assert_eq!(result, Err(FetchError::NonHtml));
    }

    #[tokio::test]
    async fn test_error_status_is_request_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let result = fetch_blocking(format!("{}/missing", mock_server.uri()), Duration::from_secs(5)).await;
        assert!(matches!(result, Err(FetchError::Request(_))));
    }

    #[tokio::test]
    async fn test_slow_response_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw("<html></html>", "text/html")
                    .set_delay(Duration::from_millis(1500)),
            )
            .mount(&mock_server)
            .await;

        let result = fetch_blocking(format!("{}/slow", mock_server.uri()), Duration::from_millis(200)).await;
        assert_eq!(result, Err(FetchError::Timeout));
    }

    #[test]
    fn test_unreachable_host_is_request_error() {
        let fetcher = HttpFetcher::with_timeout(Duration::from_secs(2)).unwrap();
        let result = fetcher.fetch("http://127.0.0.1:9/");
        assert!(matches!(result, Err(FetchError::Request(_)) | Err(FetchError::Timeout)));
    }

    #[test]
    fn test_memory_fetcher_counts_hits() {
        let fetcher = MemoryFetcher::new().with_page("https://e.com/", "<html></html>");
        assert!(fetcher.fetch("https://e.com/").is_ok());
        assert!(fetcher.fetch("https://e.com/").is_ok());
        assert!(matches!(fetcher.fetch("https://e.com/x"), Err(FetchError::Request(_))));
        assert_eq!(fetcher.hits("https://e.com/"), 2);
        assert_eq!(fetcher.total_hits(), 3);
    }

    #[test]
    fn test_memory_fetcher_non_html() {
        let mut fetcher = MemoryFetcher::new();
        fetcher.insert("https://e.com/a.pdf", "application/pdf", "%PDF");
        assert_eq!(fetcher.fetch("https://e.com/a.pdf").err(), Some(FetchError::NonHtml));
    }
}
