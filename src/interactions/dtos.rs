use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entities::{ContentKind, InteractionState};

#[derive(Debug, Deserialize, ToSchema)]
pub struct ReadRequest {
    pub read: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ArchiveRequest {
    pub archived: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRequest {
    /// Clamped to 0..=100; 100 marks the content read.
    pub percent: i32,
    /// Added to the time already recorded.
    #[serde(default)]
    pub seconds_spent: u32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResponse {
    pub content_id: Uuid,
    #[schema(value_type = String, example = "article")]
    pub content_kind: ContentKind,
    pub read: bool,
    pub favorite: bool,
    pub archived: bool,
    pub progress_percent: i16,
    pub time_spent_secs: i64,
    pub updated_at: DateTime<Utc>,
}

impl From<InteractionState> for InteractionResponse {
    fn from(state: InteractionState) -> Self {
        Self {
            content_id: state.content_id,
            content_kind: state.content_kind,
            read: state.read,
            favorite: state.favorite,
            archived: state.archived,
            progress_percent: state.progress_percent,
            time_spent_secs: state.time_spent_secs,
            updated_at: state.updated_at,
        }
    }
}
