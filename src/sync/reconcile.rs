use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::entities::{NewEntry, Source};
use crate::repositories::{Store, StoreError};

/// Which entries a sync pass considers, chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncWindow {
    /// Entries published within this span of now. Undated entries are kept
    /// since they cannot be shown to be old.
    Recent(Duration),
    /// Everything the upstream still lists.
    Full,
}

impl SyncWindow {
    pub fn admits(&self, published_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match (self, published_at) {
            (Self::Full, _) | (Self::Recent(_), None) => true,
            (Self::Recent(span), Some(published)) => published >= now - *span,
        }
    }
}

/// An entry ready for storage: feed fields, extraction results and derived
/// metrics already merged.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NormalizedEntry {
    pub url: String,
    pub title: String,
    pub content: Option<String>,
    pub text_content: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub word_count: Option<i32>,
    pub reading_time_minutes: Option<i32>,
    pub language: Option<String>,
}

impl NormalizedEntry {
    pub fn into_new_entry(self, source: &Source) -> NewEntry {
        NewEntry {
            source_id: source.id,
            url: self.url,
            kind: source.kind.content_kind(),
            title: self.title,
            content: self.content,
            text_content: self.text_content,
            excerpt: self.excerpt,
            author: self.author,
            published_at: self.published_at,
            image_url: self.image_url,
            word_count: self.word_count,
            reading_time_minutes: self.reading_time_minutes,
            language: self.language,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileOutcome {
    pub added: usize,
    pub updated: usize,
    /// Outside the window; not written.
    pub skipped: usize,
}

/// Insert-or-overwrite of fresh entries against what a source already has.
///
/// Entries are never deleted here: an item falling off the upstream feed is
/// not evidence the content is gone. Concurrent passes over the same source
/// are last-write-wins; the storage upsert on `(source_id, url)` is the only
/// duplicate guard.
#[derive(Clone)]
pub struct Reconciler {
    store: Arc<dyn Store>,
}

impl Reconciler {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    #[instrument(skip(self, source, fresh), fields(source_id = %source.id, fresh = fresh.len()))]
    pub async fn reconcile(
        &self,
        source: &Source,
        fresh: Vec<NormalizedEntry>,
        window: SyncWindow,
    ) -> Result<ReconcileOutcome, StoreError> {
        self.reconcile_at(source, fresh, window, Utc::now()).await
    }

    pub(crate) async fn reconcile_at(
        &self,
        source: &Source,
        fresh: Vec<NormalizedEntry>,
        window: SyncWindow,
        now: DateTime<Utc>,
    ) -> Result<ReconcileOutcome, StoreError> {
        let mut outcome = ReconcileOutcome::default();

        for entry in fresh {
            if !window.admits(entry.published_at, now) {
                outcome.skipped += 1;
                continue;
            }

            let upserted = self.store.upsert_entry(entry.into_new_entry(source)).await?;
            if upserted.inserted {
                outcome.added += 1;
            } else {
                outcome.updated += 1;
            }
        }

        debug!(
            added = outcome.added,
            updated = outcome.updated,
            skipped = outcome.skipped,
            "reconciled"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Entry, NewSource, SourceKind, UpsertedEntry};
    use crate::repositories::{MemoryStore, MockStore};
    use uuid::Uuid;

    async fn source(store: &MemoryStore) -> Source {
        store
            .insert_source(NewSource {
                url: "https://blog.example.com/feed/".into(),
                feed_url: Some("https://blog.example.com/feed/".into()),
                kind: SourceKind::Feed,
                title: "Example".into(),
            })
            .await
            .unwrap()
    }

    fn fresh(url: &str, title: &str, published_at: Option<DateTime<Utc>>) -> NormalizedEntry {
        NormalizedEntry {
            url: url.into(),
            title: title.into(),
            published_at,
            ..Default::default()
        }
    }

    #[test]
    fn window_admission() {
        let now = Utc::now();
        let recent = SyncWindow::Recent(Duration::hours(24));
        assert!(recent.admits(Some(now - Duration::hours(1)), now));
        assert!(!recent.admits(Some(now - Duration::hours(25)), now));
        assert!(recent.admits(None, now));
        assert!(SyncWindow::Full.admits(Some(now - Duration::days(3650)), now));
    }

    #[tokio::test]
    async fn inserts_then_overwrites() {
        let store = Arc::new(MemoryStore::new());
        let source = source(&store).await;
        let reconciler = Reconciler::new(store.clone());
        let now = Utc::now();

        let first = reconciler
            .reconcile(&source, vec![fresh("https://blog.example.com/a", "Old title", Some(now))], SyncWindow::Full)
            .await
            .unwrap();
        assert_eq!(first, ReconcileOutcome { added: 1, updated: 0, skipped: 0 });

        let second = reconciler
            .reconcile(&source, vec![fresh("https://blog.example.com/a", "New title", Some(now))], SyncWindow::Full)
            .await
            .unwrap();
        assert_eq!(second, ReconcileOutcome { added: 0, updated: 1, skipped: 0 });

        let stored = store
            .get_entry_by_url(source.id, "https://blog.example.com/a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.title, "New title");
        assert_eq!(store.entry_count(), 1);
    }

    #[tokio::test]
    async fn recent_window_skips_old_but_keeps_undated() {
        let store = Arc::new(MemoryStore::new());
        let source = source(&store).await;
        let reconciler = Reconciler::new(store.clone());
        let now = Utc::now();

        let outcome = reconciler
            .reconcile_at(
                &source,
                vec![
                    fresh("https://blog.example.com/new", "New", Some(now - Duration::hours(2))),
                    fresh("https://blog.example.com/old", "Old", Some(now - Duration::days(30))),
                    fresh("https://blog.example.com/undated", "Undated", None),
                ],
                SyncWindow::Recent(Duration::hours(24)),
                now,
            )
            .await
            .unwrap();

        assert_eq!(outcome, ReconcileOutcome { added: 2, updated: 0, skipped: 1 });
        assert!(
            store
                .get_entry_by_url(source.id, "https://blog.example.com/undated")
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn storage_failure_propagates() {
        let mut mock = MockStore::new();
        mock.expect_upsert_entry()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("connection refused".into())));
        mock.expect_get_entry_by_url().never();

        let store = Arc::new(MemoryStore::new());
        let source = source(&store).await;
        let reconciler = Reconciler::new(Arc::new(mock));

        let err = reconciler
            .reconcile(&source, vec![fresh("https://blog.example.com/a", "A", None)], SyncWindow::Full)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Unavailable(_)));
    }

    #[tokio::test]
    async fn counts_come_from_the_upsert() {
        let mut mock = MockStore::new();
        let mut calls = 0;
        mock.expect_upsert_entry().times(2).returning(move |entry| {
            calls += 1;
            let now = Utc::now();
            Ok(UpsertedEntry {
                entry: Entry {
                    id: Uuid::new_v4(),
                    source_id: entry.source_id,
                    url: entry.url,
                    kind: entry.kind,
                    title: entry.title,
                    content: None,
                    text_content: None,
                    excerpt: None,
                    author: None,
                    published_at: entry.published_at,
                    image_url: None,
                    word_count: None,
                    reading_time_minutes: None,
                    language: None,
                    created_at: now,
                    updated_at: now,
                },
                // A concurrent pass got there first on the second URL.
                inserted: calls == 1,
            })
        });
        mock.expect_get_entry_by_url().never();

        let store = Arc::new(MemoryStore::new());
        let source = source(&store).await;
        let reconciler = Reconciler::new(Arc::new(mock));

        let outcome = reconciler
            .reconcile(
                &source,
                vec![
                    fresh("https://blog.example.com/a", "A", None),
                    fresh("https://blog.example.com/b", "B", None),
                ],
                SyncWindow::Full,
            )
            .await
            .unwrap();
        assert_eq!(outcome, ReconcileOutcome { added: 1, updated: 1, skipped: 0 });
    }
}
