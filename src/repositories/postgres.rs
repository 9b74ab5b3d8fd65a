use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use crate::entities::{
    ContentRef, Entry, InteractionState, NewEntry, NewSource, Source, SourceHealth,
    UpsertedEntry,
};
use crate::repositories::{Store, StoreError};

const SOURCE_COLUMNS: &str = "s.id, s.url, s.feed_url, s.kind, s.title, s.active, \
     s.last_fetched_at, s.fetch_error, s.deleted_at, s.created_at";

const ENTRY_COLUMNS: &str = "id, source_id, url, kind, title, content, text_content, excerpt, \
     author, published_at, image_url, word_count, reading_time_minutes, language, \
     created_at, updated_at";

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_sources_for_user(
        &self,
        user_id: Uuid,
        active_only: bool,
    ) -> Result<Vec<Source>, StoreError> {
        let sql = format!(
            r#"
            SELECT {SOURCE_COLUMNS}
            FROM sources s
            JOIN user_sources us ON us.source_id = s.id
            WHERE us.user_id = $1
              AND s.deleted_at IS NULL
              AND (s.active OR NOT $2)
            ORDER BY s.last_fetched_at ASC NULLS FIRST, s.created_at ASC
            "#
        );
        let sources = sqlx::query_as::<_, Source>(&sql)
            .bind(user_id)
            .bind(active_only)
            .fetch_all(&self.pool)
            .await?;
        Ok(sources)
    }

    async fn get_source_for_user(
        &self,
        user_id: Uuid,
        source_id: Uuid,
    ) -> Result<Option<Source>, StoreError> {
        let sql = format!(
            r#"
            SELECT {SOURCE_COLUMNS}
            FROM sources s
            JOIN user_sources us ON us.source_id = s.id
            WHERE us.user_id = $1 AND s.id = $2 AND s.deleted_at IS NULL
            "#
        );
        let source = sqlx::query_as::<_, Source>(&sql)
            .bind(user_id)
            .bind(source_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(source)
    }

    async fn find_source_by_url(&self, url: &str) -> Result<Option<Source>, StoreError> {
        let sql = format!(
            "SELECT {SOURCE_COLUMNS} FROM sources s WHERE s.url = $1 AND s.deleted_at IS NULL"
        );
        let source = sqlx::query_as::<_, Source>(&sql)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(source)
    }

    async fn insert_source(&self, source: NewSource) -> Result<Source, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO sources AS s (id, url, feed_url, kind, title)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (url) DO UPDATE
              SET deleted_at = NULL,
                  active     = TRUE,
                  feed_url   = COALESCE(EXCLUDED.feed_url, s.feed_url)
            RETURNING {SOURCE_COLUMNS}
            "#
        );
        let inserted = sqlx::query_as::<_, Source>(&sql)
            .bind(Uuid::new_v4())
            .bind(&source.url)
            .bind(&source.feed_url)
            .bind(source.kind)
            .bind(&source.title)
            .fetch_one(&self.pool)
            .await?;
        Ok(inserted)
    }

    async fn add_subscription(&self, user_id: Uuid, source_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO user_sources (user_id, source_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(source_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_subscription(
        &self,
        user_id: Uuid,
        source_id: Uuid,
    ) -> Result<u64, StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_sources WHERE user_id = $1 AND source_id = $2")
            .bind(user_id)
            .bind(source_id)
            .execute(&mut *tx)
            .await?;
        let remaining: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM user_sources WHERE source_id = $1")
                .bind(source_id)
                .fetch_one(&mut *tx)
                .await?;
        tx.commit().await?;
        Ok(remaining.max(0) as u64)
    }

    async fn soft_delete_source(&self, source_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "UPDATE sources SET deleted_at = now(), active = FALSE WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(source_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn purge_deleted_sources(&self, before: DateTime<Utc>) -> Result<u64, StoreError> {
        // Entries go with their source through ON DELETE CASCADE; interactions
        // reference content without a foreign key and are removed here.
        let result = sqlx::query(
            r#"
            WITH doomed AS (
                SELECT s.id
                FROM sources s
                WHERE s.deleted_at IS NOT NULL
                  AND s.deleted_at < $1
                  AND NOT EXISTS (SELECT 1 FROM user_sources us WHERE us.source_id = s.id)
            ),
            orphaned AS (
                DELETE FROM interactions i
                USING entries e, doomed d
                WHERE e.source_id = d.id AND i.content_id = e.id
            )
            DELETE FROM sources s
            USING doomed d
            WHERE s.id = d.id
            "#,
        )
        .bind(before)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn users_with_active_sources(&self) -> Result<Vec<Uuid>, StoreError> {
        let users = sqlx::query_scalar::<_, Uuid>(
            r#"
            SELECT DISTINCT us.user_id
            FROM user_sources us
            JOIN sources s ON s.id = us.source_id
            WHERE s.active AND s.deleted_at IS NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(users)
    }

    async fn get_entry_by_url(
        &self,
        source_id: Uuid,
        url: &str,
    ) -> Result<Option<Entry>, StoreError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE source_id = $1 AND url = $2");
        let entry = sqlx::query_as::<_, Entry>(&sql)
            .bind(source_id)
            .bind(url)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn get_entry(&self, entry_id: Uuid) -> Result<Option<Entry>, StoreError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = $1");
        let entry = sqlx::query_as::<_, Entry>(&sql)
            .bind(entry_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn list_entries(&self, source_id: Uuid, limit: i64) -> Result<Vec<Entry>, StoreError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE source_id = $1 \
             ORDER BY published_at DESC NULLS LAST, created_at DESC LIMIT $2"
        );
        let entries = sqlx::query_as::<_, Entry>(&sql)
            .bind(source_id)
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(entries)
    }

    async fn upsert_entry(&self, entry: NewEntry) -> Result<UpsertedEntry, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO entries
                  (id, source_id, url, kind, title, content, text_content, excerpt, author,
                   published_at, image_url, word_count, reading_time_minutes, language)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            ON CONFLICT (source_id, url) DO UPDATE
              SET title                = EXCLUDED.title,
                  content              = EXCLUDED.content,
                  text_content         = EXCLUDED.text_content,
                  excerpt              = EXCLUDED.excerpt,
                  author               = EXCLUDED.author,
                  published_at         = EXCLUDED.published_at,
                  image_url            = EXCLUDED.image_url,
                  word_count           = EXCLUDED.word_count,
                  reading_time_minutes = EXCLUDED.reading_time_minutes,
                  language             = EXCLUDED.language,
                  updated_at           = now()
            RETURNING {ENTRY_COLUMNS}, (xmax = 0) AS inserted
            "#
        );
        let stored = sqlx::query_as::<_, UpsertedEntry>(&sql)
            .bind(Uuid::new_v4())
            .bind(entry.source_id)
            .bind(&entry.url)
            .bind(entry.kind)
            .bind(&entry.title)
            .bind(&entry.content)
            .bind(&entry.text_content)
            .bind(&entry.excerpt)
            .bind(&entry.author)
            .bind(entry.published_at)
            .bind(&entry.image_url)
            .bind(entry.word_count)
            .bind(entry.reading_time_minutes)
            .bind(&entry.language)
            .fetch_one(&self.pool)
            .await?;
        Ok(stored)
    }

    async fn update_source_health(
        &self,
        source_id: Uuid,
        health: SourceHealth,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE sources SET last_fetched_at = $2, fetch_error = $3 WHERE id = $1")
                .bind(source_id)
                .bind(health.last_fetched_at)
                .bind(&health.fetch_error)
                .execute(&self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(format!("source {source_id}")));
        }
        Ok(())
    }

    async fn get_interaction(
        &self,
        user_id: Uuid,
        content: ContentRef,
    ) -> Result<Option<InteractionState>, StoreError> {
        let state = sqlx::query_as::<_, InteractionState>(
            r#"
            SELECT user_id, content_id, content_kind, read, favorite, archived,
                   progress_percent, time_spent_secs, updated_at
            FROM interactions
            WHERE user_id = $1 AND content_id = $2 AND content_kind = $3
            "#,
        )
        .bind(user_id)
        .bind(content.id)
        .bind(content.kind)
        .fetch_optional(&self.pool)
        .await?;
        Ok(state)
    }

    async fn upsert_interaction(
        &self,
        state: InteractionState,
    ) -> Result<InteractionState, StoreError> {
        let stored = sqlx::query_as::<_, InteractionState>(
            r#"
            INSERT INTO interactions
                  (user_id, content_id, content_kind, read, favorite, archived,
                   progress_percent, time_spent_secs, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
            ON CONFLICT (user_id, content_id) DO UPDATE
              SET read             = EXCLUDED.read,
                  favorite         = EXCLUDED.favorite,
                  archived         = EXCLUDED.archived,
                  progress_percent = EXCLUDED.progress_percent,
                  time_spent_secs  = EXCLUDED.time_spent_secs,
                  updated_at       = now()
            RETURNING user_id, content_id, content_kind, read, favorite, archived,
                      progress_percent, time_spent_secs, updated_at
            "#,
        )
        .bind(state.user_id)
        .bind(state.content_id)
        .bind(state.content_kind)
        .bind(state.read)
        .bind(state.favorite)
        .bind(state.archived)
        .bind(state.progress_percent)
        .bind(state.time_spent_secs)
        .fetch_one(&self.pool)
        .await?;
        Ok(stored)
    }
}
