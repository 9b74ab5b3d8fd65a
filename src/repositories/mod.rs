pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{
    ContentRef, Entry, InteractionState, NewEntry, NewSource, Source, SourceHealth,
    UpsertedEntry,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("{0} not found")]
    NotFound(String),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Everything the pipeline needs from persistent storage.
///
/// Implementations must make `upsert_entry` atomic on `(source_id, url)`;
/// the pipeline takes no locks of its own.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Store: Send + Sync {
    /// Cheap round trip used by health checks.
    async fn ping(&self) -> Result<(), StoreError>;

    /// Sources the user subscribes to, excluding soft-deleted ones.
    async fn get_sources_for_user(
        &self,
        user_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<Source>, StoreError>;

    async fn get_source_for_user(
        &self,
        user_id: Uuid,
        source_id: Uuid,
    ) -> Result<Option<Source>, StoreError>;

    async fn find_source_by_url(&self, url: &str) -> Result<Option<Source>, StoreError>;

    /// Insert a source, or revive the soft-deleted source with the same URL.
    async fn insert_source(&self, source: NewSource) -> Result<Source, StoreError>;

    async fn add_subscription(&self, user_id: Uuid, source_id: Uuid) -> Result<(), StoreError>;

    /// Returns the number of subscribers left on the source.
    async fn remove_subscription(&self, user_id: Uuid, source_id: Uuid)
    -> Result<u64, StoreError>;

    async fn soft_delete_source(&self, source_id: Uuid) -> Result<(), StoreError>;

    /// Hard-delete sources soft-deleted before `before` that still have no
    /// subscribers, along with their entries and every interaction on those
    /// entries. Returns the number of sources removed.
    async fn purge_deleted_sources(&self, before: DateTime<Utc>) -> Result<u64, StoreError>;

    async fn users_with_active_sources(&self) -> Result<Vec<Uuid>, StoreError>;

    async fn get_entry_by_url(
        &self,
        source_id: Uuid,
        url: &str,
    ) -> Result<Option<Entry>, StoreError>;

    async fn get_entry(&self, entry_id: Uuid) -> Result<Option<Entry>, StoreError>;

    /// Newest first, undated entries last.
    async fn list_entries(&self, source_id: Uuid, limit: i64) -> Result<Vec<Entry>, StoreError>;

    /// Insert, or overwrite every mutable field of the entry with the same
    /// `(source_id, url)`. `inserted` is decided by the same atomic write.
    async fn upsert_entry(&self, entry: NewEntry) -> Result<UpsertedEntry, StoreError>;

    async fn update_source_health(
        &self,
        source_id: Uuid,
        health: SourceHealth,
    ) -> Result<(), StoreError>;

    async fn get_interaction(
        &self,
        user_id: Uuid,
        content: ContentRef,
    ) -> Result<Option<InteractionState>, StoreError>;

    async fn upsert_interaction(
        &self,
        state: InteractionState,
    ) -> Result<InteractionState, StoreError>;
}
