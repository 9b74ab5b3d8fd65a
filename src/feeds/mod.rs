//! Syndication feed retrieval and normalization into [`RawEntry`] values.

pub mod parser;

pub use parser::parse_feed;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::fetcher::{FetchError, HttpClient};

#[derive(Error, Debug)]
pub enum FeedError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("unparseable feed: {0}")]
    Parse(#[from] feed_rs::parser::ParseFeedError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

/// The most specific media attached to an entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MediaRef {
    pub url: Url,
    pub mime_type: Option<String>,
    pub kind: MediaKind,
}

impl MediaRef {
    pub fn image_url(&self) -> Option<&Url> {
        (self.kind == MediaKind::Image).then_some(&self.url)
    }
}

/// One feed item as published, before extraction or reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawEntry {
    pub title: String,
    /// Absolute; the dedup key downstream.
    pub link: Url,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub media: Option<MediaRef>,
}

impl RawEntry {
    /// Full content when the feed carries it, otherwise the summary.
    pub fn body(&self) -> Option<&str> {
        self.content.as_deref().or(self.summary.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedDocument {
    /// Final URL after redirects.
    pub url: Url,
    pub title: Option<String>,
    pub site_url: Option<Url>,
    pub entries: Vec<RawEntry>,
}

#[derive(Clone)]
pub struct FeedFetcher {
    client: Arc<HttpClient>,
}

impl FeedFetcher {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_feed(&self, url: &str, timeout: Duration) -> Result<FeedDocument, FeedError> {
        let response = self.client.fetch_feed_document(url, timeout).await?;
        let document = parse_feed(&response.body_raw, &response.url_final)?;
        debug!(entries = document.entries.len(), "feed parsed");
        Ok(document)
    }
}
