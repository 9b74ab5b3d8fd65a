use crate::config::HttpConfig;
use crate::fetcher::{
    errors::FetchError,
    pipeline::process_response,
    types::{ContentClass, PageResponse},
};
use crate::rate_limit::HostRateLimiter;
use reqwest::{Client, ClientBuilder, header};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const MAX_BODY_SIZE: u64 = 5 * 1024 * 1024; // 5MB
const USER_AGENT: &str = "GathererBot/0.1 (+https://gatherer.example.com/bot)";

/// Shared HTTP client for feeds, pages and classification probes.
///
/// Built once at startup and handed to the components that need network
/// access; cloning the inner `reqwest::Client` is cheap but the rate limiter
/// state lives here, so callers share the `HttpClient` itself behind an `Arc`.
pub struct HttpClient {
    inner: Client,
    limiter: HostRateLimiter,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self, FetchError> {
        let inner = ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Unknown(format!("failed to build HTTP client: {e}")))?;

        let limiter = HostRateLimiter::new(
            config.rate_limit_per_host,
            config.rate_limit_window,
            config.rate_limit_max_hosts,
        );

        Ok(Self {
            inner,
            limiter,
            config,
        })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    pub fn rate_limiter(&self) -> &HostRateLimiter {
        &self.limiter
    }

    /// Fetch an HTML page for extraction.
    pub async fn fetch_page(&self, url: &str) -> Result<PageResponse, FetchError> {
        self.fetch(url, ContentClass::Html, self.config.page_timeout)
            .await
    }

    /// Fetch a syndication document.
    pub async fn fetch_feed_document(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<PageResponse, FetchError> {
        self.fetch(url, ContentClass::Feed, timeout).await
    }

    /// Fetch whatever the URL serves, for content sniffing.
    pub async fn probe(&self, url: &str) -> Result<PageResponse, FetchError> {
        self.fetch(url, ContentClass::Any, self.config.probe_timeout)
            .await
    }

    #[instrument(skip_all, fields(url = %url, class = ?class))]
    pub async fn fetch(
        &self,
        url: &str,
        class: ContentClass,
        timeout: Duration,
    ) -> Result<PageResponse, FetchError> {
        let parsed_url = Url::parse(url)?;
        if !matches!(parsed_url.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(parsed_url.scheme().to_string()));
        }

        let host = parsed_url.host_str().unwrap_or_default().to_string();
        if !self.limiter.check(&host) {
            return Err(FetchError::RateLimited(host));
        }

        let response = self
            .inner
            .get(parsed_url)
            .header(header::ACCEPT, class.accept_header())
            .timeout(timeout)
            .send()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        // Check content length before downloading
        if let Some(content_length) = response.content_length()
            && content_length > MAX_BODY_SIZE
        {
            return Err(FetchError::BodyTooLarge(content_length));
        }

        let final_url = response.url().clone();
        let status = response.status();

        if !status.is_success() {
            return Err(FetchError::from_status(status));
        }

        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("text/html")
            .to_string();

        if !class.allows(&content_type) {
            return Err(FetchError::UnsupportedContentType(content_type));
        }

        let body_bytes = response
            .bytes()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        // Content-Length may be absent or wrong
        if body_bytes.len() as u64 > MAX_BODY_SIZE {
            return Err(FetchError::BodyTooLarge(body_bytes.len() as u64));
        }

        debug!(
            final_url = %final_url,
            bytes = body_bytes.len(),
            content_type = %content_type,
            "fetched"
        );

        process_response(final_url, status, body_bytes, &content_type)
    }
}
