use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry as MapEntry;
use std::collections::HashSet;
use uuid::Uuid;

use crate::entities::{
    ContentRef, Entry, InteractionState, NewEntry, NewSource, Source, SourceHealth,
    UpsertedEntry, sort_newest_first,
};
use crate::repositories::{Store, StoreError};

/// In-process store with the same conflict semantics as [`super::PgStore`].
///
/// Used by the integration tests and for running the pipeline without a
/// database.
#[derive(Default)]
pub struct MemoryStore {
    sources: DashMap<Uuid, Source>,
    subscriptions: DashMap<Uuid, HashSet<Uuid>>,
    entries: DashMap<(Uuid, String), Entry>,
    interactions: DashMap<(Uuid, Uuid), InteractionState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries_for_source(&self, source_id: Uuid) -> Vec<Entry> {
        self.entries
            .iter()
            .filter(|e| e.key().0 == source_id)
            .map(|e| e.value().clone())
            .collect()
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    pub fn source(&self, source_id: Uuid) -> Option<Source> {
        self.sources.get(&source_id).map(|s| s.clone())
    }

    fn subscribers_of(&self, source_id: Uuid) -> u64 {
        self.subscriptions
            .iter()
            .filter(|subs| subs.value().contains(&source_id))
            .count() as u64
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get_sources_for_user(
        &self,
        user_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<Source>, StoreError> {
        let Some(ids) = self.subscriptions.get(&user_id).map(|s| s.clone()) else {
            return Ok(Vec::new());
        };
        let mut sources: Vec<Source> = ids
            .iter()
            .filter_map(|id| self.sources.get(id).map(|s| s.clone()))
            .filter(|s| s.deleted_at.is_none() && (s.active || !active_only))
            .collect();
        sources.sort_by_key(|s| (s.last_fetched_at, s.created_at));
        Ok(sources)
    }

    async fn get_source_for_user(
        &self,
        user_id: Uuid,
        source_id: Uuid,
    ) -> Result<Option<Source>, StoreError> {
        let subscribed = self
            .subscriptions
            .get(&user_id)
            .is_some_and(|subs| subs.contains(&source_id));
        if !subscribed {
            return Ok(None);
        }
        Ok(self
            .sources
            .get(&source_id)
            .map(|s| s.clone())
            .filter(|s| s.deleted_at.is_none()))
    }

    async fn find_source_by_url(&self, url: &str) -> Result<Option<Source>, StoreError> {
        Ok(self
            .sources
            .iter()
            .find(|s| s.url == url && s.deleted_at.is_none())
            .map(|s| s.value().clone()))
    }

    async fn insert_source(&self, source: NewSource) -> Result<Source, StoreError> {
        let existing = self
            .sources
            .iter()
            .find(|s| s.url == source.url)
            .map(|s| *s.key());
        if let Some(id) = existing
            && let Some(mut stored) = self.sources.get_mut(&id)
        {
            stored.deleted_at = None;
            stored.active = true;
            if source.feed_url.is_some() {
                stored.feed_url = source.feed_url;
            }
            return Ok(stored.clone());
        }

        let created = Source {
            id: Uuid::new_v4(),
            url: source.url,
            feed_url: source.feed_url,
            kind: source.kind,
            title: source.title,
            active: true,
            last_fetched_at: None,
            fetch_error: None,
            deleted_at: None,
            created_at: Utc::now(),
        };
        self.sources.insert(created.id, created.clone());
        Ok(created)
    }

    async fn add_subscription(&self, user_id: Uuid, source_id: Uuid) -> Result<(), StoreError> {
        if !self.sources.contains_key(&source_id) {
            return Err(StoreError::NotFound(format!("source {source_id}")));
        }
        self.subscriptions
            .entry(user_id)
            .or_default()
            .insert(source_id);
        Ok(())
    }

    async fn remove_subscription(
        &self,
        user_id: Uuid,
        source_id: Uuid,
    ) -> Result<u64, StoreError> {
        if let Some(mut subs) = self.subscriptions.get_mut(&user_id) {
            subs.remove(&source_id);
        }
        Ok(self.subscribers_of(source_id))
    }

    async fn soft_delete_source(&self, source_id: Uuid) -> Result<(), StoreError> {
        if let Some(mut source) = self.sources.get_mut(&source_id)
            && source.deleted_at.is_none()
        {
            source.deleted_at = Some(Utc::now());
            source.active = false;
        }
        Ok(())
    }

    async fn purge_deleted_sources(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        let doomed: Vec<Uuid> = self
            .sources
            .iter()
            .filter(|s| s.deleted_at.is_some_and(|at| at < before))
            .map(|s| *s.key())
            .filter(|id| self.subscribers_of(*id) == 0)
            .collect();
        for id in &doomed {
            self.sources.remove(id);
            let mut purged_entries = HashSet::new();
            self.entries.retain(|key, entry| {
                if key.0 == *id {
                    purged_entries.insert(entry.id);
                    return false;
                }
                true
            });
            self.interactions
                .retain(|key, _| !purged_entries.contains(&key.1));
        }
        Ok(doomed.len() as u64)
    }

    async fn users_with_active_sources(&self) -> Result<Vec<Uuid>, StoreError> {
        Ok(self
            .subscriptions
            .iter()
            .filter(|subs| {
                subs.value().iter().any(|id| {
                    self.sources
                        .get(id)
                        .is_some_and(|s| s.active && s.deleted_at.is_none())
                })
            })
            .map(|subs| *subs.key())
            .collect())
    }

    async fn get_entry_by_url(
        &self,
        source_id: Uuid,
        url: &str,
    ) -> Result<Option<Entry>, StoreError> {
        Ok(self
            .entries
            .get(&(source_id, url.to_string()))
            .map(|e| e.clone()))
    }

    async fn get_entry(&self, entry_id: Uuid) -> Result<Option<Entry>, StoreError> {
        Ok(self
            .entries
            .iter()
            .find(|e| e.value().id == entry_id)
            .map(|e| e.value().clone()))
    }

    async fn list_entries(&self, source_id: Uuid, limit: i64) -> Result<Vec<Entry>, StoreError> {
        let mut entries = self.entries_for_source(source_id);
        sort_newest_first(&mut entries);
        entries.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(entries)
    }

    async fn upsert_entry(&self, entry: NewEntry) -> Result<UpsertedEntry, StoreError> {
        let now = Utc::now();
        let key = (entry.source_id, entry.url.clone());
        // The shard lock is held across the check and the write.
        let upserted = match self.entries.entry(key) {
            MapEntry::Occupied(mut slot) => {
                let existing = slot.get_mut();
                existing.title = entry.title;
                existing.content = entry.content;
                existing.text_content = entry.text_content;
                existing.excerpt = entry.excerpt;
                existing.author = entry.author;
                existing.published_at = entry.published_at;
                existing.image_url = entry.image_url;
                existing.word_count = entry.word_count;
                existing.reading_time_minutes = entry.reading_time_minutes;
                existing.language = entry.language;
                existing.updated_at = now;
                UpsertedEntry {
                    entry: existing.clone(),
                    inserted: false,
                }
            }
            MapEntry::Vacant(slot) => {
                let stored = slot.insert(Entry {
                    id: Uuid::new_v4(),
                    source_id: entry.source_id,
                    url: entry.url,
                    kind: entry.kind,
                    title: entry.title,
                    content: entry.content,
                    text_content: entry.text_content,
                    excerpt: entry.excerpt,
                    author: entry.author,
                    published_at: entry.published_at,
                    image_url: entry.image_url,
                    word_count: entry.word_count,
                    reading_time_minutes: entry.reading_time_minutes,
                    language: entry.language,
                    created_at: now,
                    updated_at: now,
                });
                UpsertedEntry {
                    entry: stored.value().clone(),
                    inserted: true,
                }
            }
        };
        Ok(upserted)
    }

    async fn update_source_health(
        &self,
        source_id: Uuid,
        health: SourceHealth,
    ) -> Result<(), StoreError> {
        let mut source = self
            .sources
            .get_mut(&source_id)
            .ok_or_else(|| StoreError::NotFound(format!("source {source_id}")))?;
        source.last_fetched_at = Some(health.last_fetched_at);
        source.fetch_error = health.fetch_error;
        Ok(())
    }

    async fn get_interaction(
        &self,
        user_id: Uuid,
        content: ContentRef,
    ) -> Result<Option<InteractionState>, StoreError> {
        Ok(self
            .interactions
            .get(&(user_id, content.id))
            .map(|s| s.clone())
            .filter(|s| s.content_kind == content.kind))
    }

    async fn upsert_interaction(
        &self,
        mut state: InteractionState,
    ) -> Result<InteractionState, StoreError> {
        state.updated_at = Utc::now();
        self.interactions
            .insert((state.user_id, state.content_id), state.clone());
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ContentKind, SourceKind};

    fn new_source(url: &str) -> NewSource {
        NewSource {
            url: url.to_string(),
            feed_url: None,
            kind: SourceKind::Feed,
            title: "Example".to_string(),
        }
    }

    #[tokio::test]
    async fn upsert_keeps_id_and_overwrites_fields() {
        let store = MemoryStore::new();
        let source = store.insert_source(new_source("https://a.example/feed")).await.unwrap();
        let mut entry = NewEntry {
            source_id: source.id,
            url: "https://a.example/post".to_string(),
            kind: ContentKind::Article,
            title: "First".to_string(),
            content: None,
            text_content: None,
            excerpt: Some("teaser".to_string()),
            author: None,
            published_at: None,
            image_url: None,
            word_count: None,
            reading_time_minutes: None,
            language: None,
        };
        let first = store.upsert_entry(entry.clone()).await.unwrap();
        entry.title = "Second".to_string();
        entry.excerpt = None;
        let second = store.upsert_entry(entry).await.unwrap();

        assert!(first.inserted);
        assert!(!second.inserted);
        let (first, second) = (first.entry, second.entry);
        assert_eq!(first.id, second.id);
        assert_eq!(second.title, "Second");
        assert_eq!(second.excerpt, None);
        assert_eq!(store.entry_count(), 1);
    }

    #[tokio::test]
    async fn insert_source_revives_soft_deleted_url() {
        let store = MemoryStore::new();
        let source = store.insert_source(new_source("https://b.example/feed")).await.unwrap();
        store.soft_delete_source(source.id).await.unwrap();
        assert!(store.find_source_by_url("https://b.example/feed").await.unwrap().is_none());

        let revived = store.insert_source(new_source("https://b.example/feed")).await.unwrap();
        assert_eq!(revived.id, source.id);
        assert!(revived.active);
        assert!(revived.deleted_at.is_none());
    }

    #[tokio::test]
    async fn purge_only_removes_unsubscribed_deleted_sources() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let kept = store.insert_source(new_source("https://c.example/feed")).await.unwrap();
        let gone = store.insert_source(new_source("https://d.example/feed")).await.unwrap();
        store.add_subscription(user, kept.id).await.unwrap();
        store.soft_delete_source(kept.id).await.unwrap();
        store.soft_delete_source(gone.id).await.unwrap();

        let purged = store
            .purge_deleted_sources(Utc::now() + chrono::Duration::seconds(1))
            .await
            .unwrap();
        assert_eq!(purged, 1);
        assert!(store.source(kept.id).is_some());
        assert!(store.source(gone.id).is_none());
    }
}
