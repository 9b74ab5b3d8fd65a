use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::{BatchSyncResult, SyncResult};

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncRequest {
    /// Sync only this source; omit to sync every active source.
    pub source_id: Option<Uuid>,
    /// Ignore the recent-entries window and reconcile everything the
    /// upstream lists.
    #[serde(default)]
    pub backfill: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SourceSyncResponse {
    pub success: bool,
    pub articles_added: usize,
    pub articles_updated: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchSyncResponse {
    pub success: bool,
    pub total_sources: usize,
    pub successful_syncs: usize,
    pub failed_syncs: usize,
    pub total_articles_added: usize,
    pub total_articles_updated: usize,
}

impl From<SyncResult> for SourceSyncResponse {
    fn from(result: SyncResult) -> Self {
        Self {
            success: result.success,
            articles_added: result.entries_added,
            articles_updated: result.entries_updated,
            error: result.error,
        }
    }
}

impl From<BatchSyncResult> for BatchSyncResponse {
    fn from(batch: BatchSyncResult) -> Self {
        Self {
            // The invocation itself went through; per-source failures are
            // counted, not escalated.
            success: true,
            total_sources: batch.total_sources,
            successful_syncs: batch.successful_syncs,
            failed_syncs: batch.failed_syncs,
            total_articles_added: batch.total_entries_added,
            total_articles_updated: batch.total_entries_updated,
        }
    }
}
