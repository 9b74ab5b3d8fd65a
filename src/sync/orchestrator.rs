use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{Instrument, debug, error, info, info_span, warn};
use url::Url;
use uuid::Uuid;

use crate::classifier::social_handle;
use crate::config::SyncConfig;
use crate::entities::{Source, SourceHealth, SourceKind};
use crate::extractor::{
    ContentExtractor, ExtractError, ExtractOptions, ExtractedContent, language, metrics,
    model::{excerpt_from_text, text_from_html},
};
use crate::feeds::{FeedError, FeedFetcher, RawEntry};
use crate::fetcher::HttpClient;
use crate::repositories::{Store, StoreError};

use super::reconcile::{NormalizedEntry, ReconcileOutcome, Reconciler, SyncWindow};

const EXCERPT_MAX_CHARS: usize = 200;
/// Concurrent page extractions within one source.
const EXTRACT_CONCURRENCY: usize = 2;

/// Outcome of one source's sync attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SyncResult {
    pub source_id: Uuid,
    pub success: bool,
    pub entries_added: usize,
    pub entries_updated: usize,
    pub entries_skipped: usize,
    pub error: Option<String>,
}

/// Aggregate over a user's sources, merged from per-source results after
/// every task has finished.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchSyncResult {
    pub total_sources: usize,
    pub successful_syncs: usize,
    pub failed_syncs: usize,
    pub total_entries_added: usize,
    pub total_entries_updated: usize,
    /// Sources past the per-batch cap, left for a later invocation.
    pub deferred: usize,
}

impl BatchSyncResult {
    pub fn from_results(results: &[SyncResult], deferred: usize) -> Self {
        results.iter().fold(
            Self {
                deferred,
                ..Self::default()
            },
            |mut acc, r| {
                acc.total_sources += 1;
                if r.success {
                    acc.successful_syncs += 1;
                } else {
                    acc.failed_syncs += 1;
                }
                acc.total_entries_added += r.entries_added;
                acc.total_entries_updated += r.entries_updated;
                acc
            },
        )
    }
}

/// Errors that abort a whole invocation. Per-source failures never end up
/// here; they are reported inside [`SyncResult`].
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("storage unavailable: {0}")]
    Storage(#[from] StoreError),

    #[error("source {0} not found")]
    SourceNotFound(Uuid),
}

/// Why a single source failed. Rendered into `Source::fetch_error`.
#[derive(Error, Debug)]
enum SourceError {
    #[error("feed: {0}")]
    Feed(#[from] FeedError),

    #[error("extraction: {0}")]
    Extract(#[from] ExtractError),

    #[error("storage: {0}")]
    Storage(#[from] StoreError),

    #[error("unsupported: {0}")]
    Unsupported(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// How a source's content is retrieved, from its declared kind.
#[derive(Debug, Clone, PartialEq)]
enum FetchStrategy {
    Feed(String),
    /// One entry extracted from the page itself.
    Page(String),
    Unsupported(String),
}

fn fetch_strategy(source: &Source, bridge: Option<&str>) -> FetchStrategy {
    match source.kind {
        SourceKind::Feed => FetchStrategy::Feed(source.feed_url.clone().unwrap_or_else(|| source.url.clone())),
        SourceKind::Podcast | SourceKind::YoutubeChannel => match &source.feed_url {
            Some(feed) => FetchStrategy::Feed(feed.clone()),
            None => FetchStrategy::Unsupported("no feed url resolved for this source".into()),
        },
        SourceKind::Website => match &source.feed_url {
            Some(feed) => FetchStrategy::Feed(feed.clone()),
            None => FetchStrategy::Page(source.url.clone()),
        },
        SourceKind::YoutubeVideo => FetchStrategy::Page(source.url.clone()),
        SourceKind::Twitter | SourceKind::Instagram | SourceKind::Tiktok => {
            let Some(bridge) = bridge else {
                return FetchStrategy::Unsupported("no social bridge configured".into());
            };
            let Some(handle) = social_handle(source.kind, &source.url) else {
                return FetchStrategy::Unsupported(format!("no account handle in {}", source.url));
            };
            let platform = match source.kind {
                SourceKind::Twitter => "twitter",
                SourceKind::Instagram => "instagram",
                _ => "tiktok",
            };
            FetchStrategy::Feed(format!("{}/{platform}/user/{handle}", bridge.trim_end_matches('/')))
        }
    }
}

/// Drives per-source and per-user syncs.
///
/// Every source is processed in isolation: a failure or timeout is recorded
/// on that source and in its [`SyncResult`], never propagated to siblings.
///
/// `source_timeout` bounds the feed fetch and reconciliation separately.
/// Inline extraction never fails a source: each page gets
/// `extract_timeout`, and once `source_timeout` has passed since the feed
/// arrived the remaining entries keep their feed fields.
pub struct SyncOrchestrator {
    store: Arc<dyn Store>,
    feeds: FeedFetcher,
    extractor: ContentExtractor,
    reconciler: Reconciler,
    feed_timeout: Duration,
    config: SyncConfig,
}

impl SyncOrchestrator {
    pub fn new(store: Arc<dyn Store>, client: Arc<HttpClient>, config: SyncConfig) -> Self {
        let extractor = ContentExtractor::new(client.clone());
        Self::with_extractor(store, client, extractor, config)
    }

    pub fn with_extractor(
        store: Arc<dyn Store>,
        client: Arc<HttpClient>,
        extractor: ContentExtractor,
        config: SyncConfig,
    ) -> Self {
        Self {
            reconciler: Reconciler::new(store.clone()),
            feeds: FeedFetcher::new(client.clone()),
            feed_timeout: client.config().feed_timeout,
            store,
            extractor,
            config,
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The routine window from configuration.
    pub fn recent_window(&self) -> SyncWindow {
        SyncWindow::Recent(self.config.recent_window)
    }

    /// Sync every active source of `user_id`, at most `batch_limit` of them,
    /// least recently fetched first.
    pub async fn sync_user(
        &self,
        user_id: Uuid,
        window: SyncWindow,
    ) -> Result<BatchSyncResult, SyncError> {
        let mut sources = self.store.get_sources_for_user(user_id, true).await?;
        // Never-fetched sources sort first.
        sources.sort_by_key(|s| s.last_fetched_at);

        let deferred = sources.len().saturating_sub(self.config.batch_limit);
        sources.truncate(self.config.batch_limit);

        info!(%user_id, sources = sources.len(), deferred, "user sync started");

        let pending: Vec<_> = sources.iter().map(|source| self.sync_source(source, window)).collect();
        let results: Vec<SyncResult> = stream::iter(pending)
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await;

        let batch = BatchSyncResult::from_results(&results, deferred);
        info!(
            %user_id,
            successful = batch.successful_syncs,
            failed = batch.failed_syncs,
            added = batch.total_entries_added,
            updated = batch.total_entries_updated,
            "user sync finished"
        );
        Ok(batch)
    }

    /// Sync one source the user subscribes to.
    pub async fn sync_user_source(
        &self,
        user_id: Uuid,
        source_id: Uuid,
        window: SyncWindow,
    ) -> Result<SyncResult, SyncError> {
        let source = self
            .store
            .get_source_for_user(user_id, source_id)
            .await?
            .ok_or(SyncError::SourceNotFound(source_id))?;
        Ok(self.sync_source(&source, window).await)
    }

    /// Run one source through fetch, extraction and reconciliation, then
    /// record its health. Never fails: errors land in the result.
    pub async fn sync_source(&self, source: &Source, window: SyncWindow) -> SyncResult {
        let span = info_span!("sync_source", source_id = %source.id, kind = ?source.kind);

        async {
            debug!(stage = "pending");
            let outcome = self.run(source, window).await;

            let fetch_error = outcome.as_ref().err().map(ToString::to_string);
            let health = SourceHealth {
                last_fetched_at: Utc::now(),
                fetch_error: fetch_error.clone(),
            };
            if let Err(err) = self.store.update_source_health(source.id, health).await {
                error!(error = %err, "failed to record source health");
            }

            match outcome {
                Ok(counts) => {
                    info!(
                        stage = "succeeded",
                        added = counts.added,
                        updated = counts.updated,
                        skipped = counts.skipped,
                        "source synced"
                    );
                    SyncResult {
                        source_id: source.id,
                        success: true,
                        entries_added: counts.added,
                        entries_updated: counts.updated,
                        entries_skipped: counts.skipped,
                        error: None,
                    }
                }
                Err(err) => {
                    warn!(stage = "failed", error = %err, "source sync failed");
                    SyncResult {
                        source_id: source.id,
                        success: false,
                        entries_added: 0,
                        entries_updated: 0,
                        entries_skipped: 0,
                        error: fetch_error,
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn run(&self, source: &Source, window: SyncWindow) -> Result<ReconcileOutcome, SourceError> {
        let strategy = fetch_strategy(source, self.config.social_bridge_url.as_deref());
        debug!(stage = "fetching", strategy = ?strategy);

        let budget = self.config.source_timeout;
        let (entries, pre_skipped) = match strategy {
            FetchStrategy::Unsupported(reason) => return Err(SourceError::Unsupported(reason)),
            FetchStrategy::Feed(feed_url) => self.entries_from_feed(&feed_url, window).await?,
            FetchStrategy::Page(page_url) => {
                (vec![within(budget, self.entry_from_page(source, &page_url)).await?], 0)
            }
        };

        debug!(stage = "reconciling", entries = entries.len());
        let mut outcome = within(budget, self.reconciler.reconcile(source, entries, window)).await?;
        outcome.skipped += pre_skipped;
        Ok(outcome)
    }

    /// Feed entries inside the window, enriched where the feed body is thin.
    async fn entries_from_feed(
        &self,
        feed_url: &str,
        window: SyncWindow,
    ) -> Result<(Vec<NormalizedEntry>, usize), SourceError> {
        let budget = self.config.source_timeout;
        let document = within(budget, self.feeds.fetch_feed(feed_url, self.feed_timeout)).await?;
        let deadline = Instant::now() + budget;

        let now = Utc::now();
        let total = document.entries.len();
        let admitted: Vec<RawEntry> = document
            .entries
            .into_iter()
            .filter(|e| window.admits(e.published_at, now))
            .collect();
        let skipped = total - admitted.len();

        let entries: Vec<NormalizedEntry> = stream::iter(admitted)
            .map(|raw| self.enrich(raw, deadline))
            .buffered(EXTRACT_CONCURRENCY)
            .collect()
            .await;
        Ok((entries, skipped))
    }

    async fn enrich(&self, raw: RawEntry, deadline: Instant) -> NormalizedEntry {
        let wpm = self.config.words_per_minute;
        let body_text = raw.body().map(text_from_html).unwrap_or_default();
        if body_text.chars().count() >= self.config.min_feed_body_chars {
            return normalize(raw, Body::Feed, wpm);
        }

        let now = Instant::now();
        if now >= deadline {
            debug!(url = %raw.link, "source budget spent, keeping feed fields");
            return normalize(raw, Body::Unavailable, wpm);
        }

        debug!(stage = "extracting", url = %raw.link);
        let options = ExtractOptions {
            featured_image_url: raw.media.as_ref().and_then(|m| m.image_url()).cloned(),
        };
        let until = deadline.min(now + self.config.extract_timeout);
        match tokio::time::timeout_at(until, self.extractor.extract(raw.link.as_str(), &options)).await {
            Ok(Ok(extracted)) => normalize(raw, Body::Extracted(extracted), wpm),
            Ok(Err(err)) => {
                debug!(url = %raw.link, error = %err, "extraction unavailable, keeping feed fields");
                normalize(raw, Body::Unavailable, wpm)
            }
            Err(_) => {
                debug!(url = %raw.link, "extraction timed out, keeping feed fields");
                normalize(raw, Body::Unavailable, wpm)
            }
        }
    }

    /// A page-only source yields a single entry. An empty extraction still
    /// produces the entry from the source's own fields; a failed fetch fails
    /// the source.
    async fn entry_from_page(&self, source: &Source, page_url: &str) -> Result<NormalizedEntry, SourceError> {
        let link = Url::parse(page_url).map_err(|e| SourceError::Unsupported(format!("invalid url: {e}")))?;
        let raw = RawEntry {
            title: source.title.clone(),
            link,
            content: None,
            summary: None,
            author: None,
            published_at: None,
            media: None,
        };

        debug!(stage = "extracting", url = page_url);
        match self.extractor.extract(page_url, &ExtractOptions::default()).await {
            Ok(extracted) => Ok(normalize(raw, Body::Extracted(extracted), self.config.words_per_minute)),
            Err(ExtractError::Empty(reason)) => {
                debug!(%reason, "page has no readable body");
                Ok(normalize(raw, Body::Unavailable, self.config.words_per_minute))
            }
            Err(err) => Err(err.into()),
        }
    }
}

/// Run one step of a source sync under `budget`.
async fn within<T, E>(
    budget: Duration,
    step: impl Future<Output = Result<T, E>>,
) -> Result<T, SourceError>
where
    SourceError: From<E>,
{
    match tokio::time::timeout(budget, step).await {
        Ok(result) => result.map_err(SourceError::from),
        Err(_) => Err(SourceError::Timeout(budget)),
    }
}

/// Where an entry's body comes from.
pub(crate) enum Body {
    /// The feed's own content or summary is rich enough to keep.
    Feed,
    Extracted(ExtractedContent),
    /// Extraction was needed but failed or ran out of time. The body stays
    /// null; the summary still feeds the excerpt.
    Unavailable,
}

/// Merge feed fields with the chosen body. The feed keeps authority over
/// title, link, date and media.
pub(crate) fn normalize(raw: RawEntry, body: Body, words_per_minute: u32) -> NormalizedEntry {
    let summary_text = raw
        .summary
        .as_deref()
        .map(text_from_html)
        .filter(|s| !s.is_empty());

    let (content, text_content, excerpt, byline, language) = match body {
        Body::Extracted(ex) => {
            let excerpt = summary_text
                .as_deref()
                .and_then(|s| excerpt_from_text(s, EXCERPT_MAX_CHARS))
                .or(ex.excerpt);
            (Some(ex.content), Some(ex.text_content), excerpt, ex.byline, ex.language)
        }
        Body::Unavailable => {
            let excerpt = summary_text
                .as_deref()
                .and_then(|s| excerpt_from_text(s, EXCERPT_MAX_CHARS));
            (None, None, excerpt, None, None)
        }
        Body::Feed => {
            let content = raw.body().map(ammonia::clean).filter(|c| !c.trim().is_empty());
            let text = content.as_deref().map(text_from_html).filter(|t| !t.is_empty());
            let excerpt = summary_text
                .as_deref()
                .or(text.as_deref())
                .and_then(|t| excerpt_from_text(t, EXCERPT_MAX_CHARS));
            let language = text.as_deref().and_then(language::detect_language);
            (content, text, excerpt, None, language)
        }
    };

    let metrics = metrics::derive(text_content.as_deref(), words_per_minute);
    let title = if raw.title.trim().is_empty() {
        raw.link.to_string()
    } else {
        raw.title
    };

    NormalizedEntry {
        url: raw.link.to_string(),
        title,
        content,
        text_content,
        excerpt,
        author: raw.author.or(byline),
        published_at: raw.published_at,
        image_url: raw.media.as_ref().and_then(|m| m.image_url()).map(Url::to_string),
        word_count: metrics.map(|(words, _)| i32::try_from(words).unwrap_or(i32::MAX)),
        reading_time_minutes: metrics.map(|(_, minutes)| i32::try_from(minutes).unwrap_or(i32::MAX)),
        language,
    }
}
