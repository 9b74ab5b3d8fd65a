use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::entities::{ContentKind, Entry};
use crate::slug::entry_slug;

pub const DEFAULT_PAGE_SIZE: i64 = 50;
pub const MAX_PAGE_SIZE: i64 = 200;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EntryListQuery {
    /// At most 200; defaults to 50.
    pub limit: Option<i64>,
}

impl EntryListQuery {
    pub fn page_size(&self) -> i64 {
        self.limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EntryResponse {
    pub id: Uuid,
    pub slug: String,
    pub source_id: Uuid,
    pub url: String,
    #[schema(value_type = String, example = "article")]
    pub kind: ContentKind,
    pub title: String,
    pub content: Option<String>,
    pub excerpt: Option<String>,
    pub author: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub image_url: Option<String>,
    pub word_count: Option<i32>,
    pub reading_time_minutes: Option<i32>,
    pub language: Option<String>,
}

impl From<Entry> for EntryResponse {
    fn from(entry: Entry) -> Self {
        Self {
            slug: entry_slug(&entry.id.to_string(), &entry.title),
            id: entry.id,
            source_id: entry.source_id,
            url: entry.url,
            kind: entry.kind,
            title: entry.title,
            content: entry.content,
            excerpt: entry.excerpt,
            author: entry.author,
            published_at: entry.published_at,
            image_url: entry.image_url,
            word_count: entry.word_count,
            reading_time_minutes: entry.reading_time_minutes,
            language: entry.language,
        }
    }
}
