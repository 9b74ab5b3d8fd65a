use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{ContentRef, InteractionState};
use crate::repositories::{Store, StoreError};

#[derive(Clone)]
pub struct InteractionService {
    store: Arc<dyn Store>,
}

impl InteractionService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Current state, or the untouched default without creating a row.
    pub async fn get(&self, user_id: Uuid, content: ContentRef) -> Result<InteractionState, StoreError> {
        Ok(self
            .store
            .get_interaction(user_id, content)
            .await?
            .unwrap_or_else(|| InteractionState::new(user_id, content)))
    }

    async fn update(
        &self,
        user_id: Uuid,
        content: ContentRef,
        apply: impl FnOnce(&mut InteractionState),
    ) -> Result<InteractionState, StoreError> {
        let mut state = self.get(user_id, content).await?;
        apply(&mut state);
        self.store.upsert_interaction(state).await
    }

    #[instrument(skip(self))]
    pub async fn mark_read(
        &self,
        user_id: Uuid,
        content: ContentRef,
        read: bool,
    ) -> Result<InteractionState, StoreError> {
        self.update(user_id, content, |s| s.read = read).await
    }

    #[instrument(skip(self))]
    pub async fn toggle_favorite(
        &self,
        user_id: Uuid,
        content: ContentRef,
    ) -> Result<InteractionState, StoreError> {
        self.update(user_id, content, |s| s.favorite = !s.favorite).await
    }

    #[instrument(skip(self))]
    pub async fn set_archived(
        &self,
        user_id: Uuid,
        content: ContentRef,
        archived: bool,
    ) -> Result<InteractionState, StoreError> {
        self.update(user_id, content, |s| s.archived = archived).await
    }

    /// Progress is clamped to 0..=100 and time spent accumulates. Reaching
    /// 100% marks the content read.
    #[instrument(skip(self))]
    pub async fn record_progress(
        &self,
        user_id: Uuid,
        content: ContentRef,
        percent: i32,
        seconds_spent: u32,
    ) -> Result<InteractionState, StoreError> {
        self.update(user_id, content, |s| {
            s.progress_percent = percent.clamp(0, 100) as i16;
            s.time_spent_secs = s.time_spent_secs.saturating_add(i64::from(seconds_spent));
            if s.progress_percent == 100 {
                s.read = true;
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::ContentKind;
    use crate::repositories::MemoryStore;

    fn article() -> ContentRef {
        ContentRef {
            id: Uuid::new_v4(),
            kind: ContentKind::Article,
        }
    }

    #[tokio::test]
    async fn state_is_created_lazily() {
        let store = Arc::new(MemoryStore::new());
        let svc = InteractionService::new(store.clone());
        let (user, content) = (Uuid::new_v4(), article());

        let untouched = svc.get(user, content).await.unwrap();
        assert!(!untouched.favorite);
        assert!(store.get_interaction(user, content).await.unwrap().is_none());

        svc.toggle_favorite(user, content).await.unwrap();
        let stored = store.get_interaction(user, content).await.unwrap().unwrap();
        assert!(stored.favorite);

        let toggled = svc.toggle_favorite(user, content).await.unwrap();
        assert!(!toggled.favorite);
    }

    #[tokio::test]
    async fn progress_is_clamped_and_time_accumulates() {
        let svc = InteractionService::new(Arc::new(MemoryStore::new()));
        let (user, content) = (Uuid::new_v4(), article());

        let s = svc.record_progress(user, content, -20, 30).await.unwrap();
        assert_eq!(s.progress_percent, 0);
        assert_eq!(s.time_spent_secs, 30);

        let s = svc.record_progress(user, content, 150, 45).await.unwrap();
        assert_eq!(s.progress_percent, 100);
        assert_eq!(s.time_spent_secs, 75);
        assert!(s.read);
    }

    #[tokio::test]
    async fn content_kind_is_part_of_the_key() {
        let svc = InteractionService::new(Arc::new(MemoryStore::new()));
        let user = Uuid::new_v4();
        let content = article();
        svc.set_archived(user, content, true).await.unwrap();

        let as_video = ContentRef {
            kind: ContentKind::Video,
            ..content
        };
        assert!(!svc.get(user, as_video).await.unwrap().archived);
        assert!(svc.get(user, content).await.unwrap().archived);
    }
}
