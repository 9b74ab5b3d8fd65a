use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::cmp::Ordering;
use uuid::Uuid;

/// --- PostgreSQL Enums ---

/// Declared type of a subscribed source.
#[derive(
    sqlx::Type, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[sqlx(type_name = "source_kind", rename_all = "snake_case")]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    Feed,
    YoutubeChannel,
    YoutubeVideo,
    Podcast,
    Twitter,
    Instagram,
    Tiktok,
    Website,
}

impl SourceKind {
    pub fn is_social(self) -> bool {
        matches!(self, Self::Twitter | Self::Instagram | Self::Tiktok)
    }

    /// Kind of content entries from this source carry.
    pub fn content_kind(self) -> ContentKind {
        match self {
            Self::YoutubeChannel | Self::YoutubeVideo => ContentKind::Video,
            Self::Podcast => ContentKind::PodcastEpisode,
            Self::Twitter | Self::Instagram | Self::Tiktok => ContentKind::SocialPost,
            Self::Feed | Self::Website => ContentKind::Article,
        }
    }
}

/// Discriminant stored next to every entry id, so an id plus its kind is a
/// complete reference.
#[derive(
    sqlx::Type, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[sqlx(type_name = "content_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Article,
    Video,
    PodcastEpisode,
    SocialPost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentRef {
    pub id: Uuid,
    pub kind: ContentKind,
}

/// --- Tables ---

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Source {
    pub id: Uuid,
    pub url: String,
    pub feed_url: Option<String>,
    pub kind: SourceKind,
    pub title: String,
    pub active: bool,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub fetch_error: Option<String>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSource {
    pub url: String,
    pub feed_url: Option<String>,
    pub kind: SourceKind,
    pub title: String,
}

/// Fields the orchestrator writes after every sync attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceHealth {
    pub last_fetched_at: DateTime<Utc>,
    pub fetch_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Entry {
    pub id: Uuid,
    pub source_id: Uuid,
    pub url: String,
    pub kind: ContentKind,
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
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Result of an entry upsert; `inserted` is false when an existing row with
/// the same `(source_id, url)` was overwritten.
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UpsertedEntry {
    #[sqlx(flatten)]
    pub entry: Entry,
    pub inserted: bool,
}

impl Entry {
    pub fn content_ref(&self) -> ContentRef {
        ContentRef {
            id: self.id,
            kind: self.kind,
        }
    }
}

/// Everything the reconciler writes for one entry; `(source_id, url)` is the
/// conflict key.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    pub source_id: Uuid,
    pub url: String,
    pub kind: ContentKind,
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

#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct InteractionState {
    pub user_id: Uuid,
    pub content_id: Uuid,
    pub content_kind: ContentKind,
    pub read: bool,
    pub favorite: bool,
    pub archived: bool,
    pub progress_percent: i16,
    pub time_spent_secs: i64,
    pub updated_at: DateTime<Utc>,
}

impl InteractionState {
    pub fn new(user_id: Uuid, content: ContentRef) -> Self {
        Self {
            user_id,
            content_id: content.id,
            content_kind: content.kind,
            read: false,
            favorite: false,
            archived: false,
            progress_percent: 0,
            time_spent_secs: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn content_ref(&self) -> ContentRef {
        ContentRef {
            id: self.content_id,
            kind: self.content_kind,
        }
    }
}

/// Newest first; entries without a publish date go last, ties broken by
/// creation time.
pub fn sort_newest_first(entries: &mut [Entry]) {
    entries.sort_by(|a, b| match (a.published_at, b.published_at) {
        (Some(a_at), Some(b_at)) => b_at.cmp(&a_at),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => b.created_at.cmp(&a.created_at),
    });
}
