use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, instrument};
use url::Url;
use uuid::Uuid;

use crate::classifier::{Redirect, classify_with_probe};
use crate::entities::{NewSource, Source};
use crate::fetcher::HttpClient;
use crate::repositories::{Store, StoreError};

#[derive(Error, Debug)]
pub enum SubscribeError {
    #[error("not a subscribable url: {0}")]
    NotDetected(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

#[derive(Debug, Clone, Serialize)]
pub struct Subscribed {
    pub source: Source,
    /// False when the user joined a source another user already had.
    pub created: bool,
    /// Set when the platform resolved the URL to a different account than
    /// the one typed.
    pub redirect: Option<Redirect>,
}

#[derive(Clone)]
pub struct SubscriptionService {
    store: Arc<dyn Store>,
    client: Arc<HttpClient>,
}

impl SubscriptionService {
    pub fn new(store: Arc<dyn Store>, client: Arc<HttpClient>) -> Self {
        Self { store, client }
    }

    #[instrument(skip(self))]
    pub async fn subscribe(&self, user_id: Uuid, raw_url: &str) -> Result<Subscribed, SubscribeError> {
        let classification = classify_with_probe(&self.client, raw_url).await;
        let kind = classification
            .kind
            .ok_or_else(|| SubscribeError::NotDetected(raw_url.to_string()))?;

        // The parsed form is the canonical spelling.
        let url = Url::parse(raw_url.trim())
            .map(|u| u.to_string())
            .map_err(|_| SubscribeError::NotDetected(raw_url.to_string()))?;

        let (source, created) = match self.store.find_source_by_url(&url).await? {
            Some(existing) => (existing, false),
            None => {
                let source = self
                    .store
                    .insert_source(NewSource {
                        url,
                        feed_url: classification.suggested_feed_url.map(|u| u.to_string()),
                        kind,
                        title: classification.suggested_title,
                    })
                    .await?;
                (source, true)
            }
        };

        self.store.add_subscription(user_id, source.id).await?;
        info!(source_id = %source.id, kind = ?source.kind, created, "subscribed");

        Ok(Subscribed {
            source,
            created,
            redirect: classification.redirect,
        })
    }

    /// Returns true when this was the last subscriber and the source was
    /// soft-deleted.
    #[instrument(skip(self))]
    pub async fn unsubscribe(&self, user_id: Uuid, source_id: Uuid) -> Result<bool, StoreError> {
        let remaining = self.store.remove_subscription(user_id, source_id).await?;
        if remaining > 0 {
            return Ok(false);
        }
        self.store.soft_delete_source(source_id).await?;
        info!(%source_id, "last subscriber left, source soft-deleted");
        Ok(true)
    }

    /// Hard-delete sources soft-deleted more than `grace` ago.
    pub async fn sweep(&self, grace: Duration) -> Result<u64, StoreError> {
        let purged = self.store.purge_deleted_sources(Utc::now() - grace).await?;
        if purged > 0 {
            info!(purged, "deleted sources purged");
        }
        Ok(purged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ContentKind, ContentRef, NewEntry, SourceKind};
    use crate::interactions::InteractionService;
    use crate::repositories::MemoryStore;

    fn service(store: Arc<MemoryStore>) -> SubscriptionService {
        let client = Arc::new(HttpClient::new(Default::default()).unwrap());
        SubscriptionService::new(store, client)
    }

    #[tokio::test]
    async fn second_subscriber_shares_the_source() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        let a = svc.subscribe(alice, "https://blog.example.com/feed/").await.unwrap();
        let b = svc.subscribe(bob, "https://blog.example.com/feed/").await.unwrap();

        assert!(a.created);
        assert!(!b.created);
        assert_eq!(a.source.id, b.source.id);
        assert_eq!(a.source.kind, SourceKind::Feed);
        assert_eq!(a.source.feed_url.as_deref(), Some("https://blog.example.com/feed/"));
    }

    #[tokio::test]
    async fn last_unsubscribe_soft_deletes_and_sweep_purges() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());
        let (alice, bob) = (Uuid::new_v4(), Uuid::new_v4());

        let source = svc.subscribe(alice, "https://blog.example.com/feed/").await.unwrap().source;
        svc.subscribe(bob, "https://blog.example.com/feed/").await.unwrap();

        assert!(!svc.unsubscribe(alice, source.id).await.unwrap());
        assert!(store.source(source.id).unwrap().deleted_at.is_none());

        assert!(svc.unsubscribe(bob, source.id).await.unwrap());
        assert!(store.source(source.id).unwrap().deleted_at.is_some());

        // Inside the grace period nothing is purged.
        assert_eq!(svc.sweep(Duration::hours(1)).await.unwrap(), 0);
        assert_eq!(svc.sweep(Duration::seconds(-1)).await.unwrap(), 1);
        assert!(store.source(source.id).is_none());
    }

    #[tokio::test]
    async fn sweep_removes_interactions_on_purged_entries() {
        let store = Arc::new(MemoryStore::new());
        let svc = service(store.clone());
        let interactions = InteractionService::new(store.clone());
        let user = Uuid::new_v4();

        let source = svc.subscribe(user, "https://blog.example.com/feed/").await.unwrap().source;
        let entry = store
            .upsert_entry(NewEntry {
                source_id: source.id,
                url: "https://blog.example.com/post".into(),
                kind: ContentKind::Article,
                title: "Post".into(),
                content: None,
                text_content: None,
                excerpt: None,
                author: None,
                published_at: None,
                image_url: None,
                word_count: None,
                reading_time_minutes: None,
                language: None,
            })
            .await
            .unwrap()
            .entry;
        let elsewhere = ContentRef {
            id: Uuid::new_v4(),
            kind: ContentKind::Article,
        };
        interactions.toggle_favorite(user, entry.content_ref()).await.unwrap();
        interactions.mark_read(user, elsewhere, true).await.unwrap();

        svc.unsubscribe(user, source.id).await.unwrap();
        assert_eq!(svc.sweep(Duration::seconds(-1)).await.unwrap(), 1);

        assert!(store.get_interaction(user, entry.content_ref()).await.unwrap().is_none());
        assert!(store.get_interaction(user, elsewhere).await.unwrap().is_some());
        assert!(store.entries_for_source(source.id).is_empty());
    }

    #[tokio::test]
    async fn malformed_url_is_rejected() {
        let svc = service(Arc::new(MemoryStore::new()));
        let err = svc.subscribe(Uuid::new_v4(), "not a url").await.unwrap_err();
        assert!(matches!(err, SubscribeError::NotDetected(_)));
    }
}
