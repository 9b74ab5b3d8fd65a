pub mod cleaner;
pub mod language;
pub mod metrics;
pub mod model;
pub mod reader;
pub mod reject;

#[cfg(test)]
mod tests;

pub use model::ExtractedContent;
pub use reject::RejectReason;

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::fetcher::{FetchError, HttpClient, PageResponse};
use crate::retry::{Backoff, RetryPolicy, retry_with_policy};

const EXCERPT_MAX_CHARS: usize = 200;

#[derive(Error, Debug)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("extraction unavailable: {0}")]
    Empty(RejectReason),
}

impl ExtractError {
    /// Only network-level transient failures are retried; an empty
    /// extraction will not improve on a second attempt.
    pub fn should_retry(&self) -> bool {
        match self {
            Self::Fetch(err) => err.should_retry(),
            Self::Empty(_) => false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Image already shown as the entry's hero; inline copies are removed.
    pub featured_image_url: Option<Url>,
}

/// Three attempts, exponential backoff from 500ms with 30% jitter.
pub fn default_policy() -> RetryPolicy<ExtractError> {
    RetryPolicy::new(
        3,
        Backoff::Exponential {
            base: Duration::from_millis(500),
            max: Duration::from_secs(5),
            jitter: 0.3,
        },
        ExtractError::should_retry,
    )
}

/// Fetches article pages and recovers their readable body.
#[derive(Clone)]
pub struct ContentExtractor {
    client: Arc<HttpClient>,
    policy: RetryPolicy<ExtractError>,
}

impl ContentExtractor {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self::with_policy(client, default_policy())
    }

    pub fn with_policy(client: Arc<HttpClient>, policy: RetryPolicy<ExtractError>) -> Self {
        Self { client, policy }
    }

    #[instrument(skip(self, options), fields(url = %url))]
    pub async fn extract(
        &self,
        url: &str,
        options: &ExtractOptions,
    ) -> Result<ExtractedContent, ExtractError> {
        let outcome = retry_with_policy(&self.policy, |attempt| async move {
            debug!(attempt, "extraction attempt");
            let page = self.client.fetch_page(url).await?;
            extract_document(&page, options)
        })
        .await;

        debug!(attempts = outcome.attempts, ok = outcome.result.is_ok(), "extraction finished");
        outcome.result
    }
}

/// Extraction over an already fetched page; no network access.
pub fn extract_document(
    page: &PageResponse,
    options: &ExtractOptions,
) -> Result<ExtractedContent, ExtractError> {
    let mut result = reader::extract(&page.body_utf8, &page.url_final)
        .ok_or(ExtractError::Empty(RejectReason::Empty))?;

    cleaner::sanitize_and_resolve_links(
        &mut result,
        &page.url_final,
        options.featured_image_url.as_ref(),
    );

    if let Some(reason) = reject::check(&result.title, &result.text) {
        return Err(ExtractError::Empty(reason));
    }

    let language = language::detect_language(&result.text);
    let excerpt = result
        .description
        .clone()
        .or_else(|| model::excerpt_from_text(&result.text, EXCERPT_MAX_CHARS));
    let word_count = metrics::word_count(&result.text);

    Ok(ExtractedContent {
        url: page.url_final.clone(),
        title: result.title,
        site_name: result.site_name,
        byline: result.byline,
        excerpt,
        language,
        content: result.html,
        text_content: result.text,
        word_count,
        fetched_at: page.fetched_at,
    })
}
