use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::classifier::Redirect;
use crate::entities::{Source, SourceKind};

use super::Subscribed;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SubscribeRequest {
    /// Website, feed, channel, podcast or profile URL as the user typed it.
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceResponse {
    pub id: Uuid,
    pub url: String,
    pub feed_url: Option<String>,
    #[schema(value_type = String, example = "youtube-channel")]
    pub kind: SourceKind,
    pub title: String,
    pub last_fetched_at: Option<DateTime<Utc>>,
    pub fetch_error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RedirectNotice {
    pub from: String,
    pub to: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeResponse {
    pub source: SourceResponse,
    /// False when the caller joined a source that already existed.
    pub created: bool,
    /// Present when the platform resolved the URL to a different channel
    /// than the one typed; clients should tell the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redirect: Option<RedirectNotice>,
}

impl From<Source> for SourceResponse {
    fn from(source: Source) -> Self {
        Self {
            id: source.id,
            url: source.url,
            feed_url: source.feed_url,
            kind: source.kind,
            title: source.title,
            last_fetched_at: source.last_fetched_at,
            fetch_error: source.fetch_error,
        }
    }
}

impl From<Redirect> for RedirectNotice {
    fn from(redirect: Redirect) -> Self {
        Self {
            from: redirect.from.to_string(),
            to: redirect.to.to_string(),
        }
    }
}

impl From<Subscribed> for SubscribeResponse {
    fn from(subscribed: Subscribed) -> Self {
        Self {
            source: subscribed.source.into(),
            created: subscribed.created,
            redirect: subscribed.redirect.map(Into::into),
        }
    }
}
