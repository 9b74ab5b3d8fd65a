use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, info};

use crate::{
    app_state::AppState,
    auth::{CallerIdentity, dtos::ErrorResponse},
};

use super::{
    SyncError, SyncWindow,
    dtos::{BatchSyncResponse, SourceSyncResponse, SyncRequest},
};

#[utoipa::path(
    post,
    path = "/v1/sync",
    tag = "sync",
    request_body = SyncRequest,
    responses(
        (status = 200, description = "Sync ran; per-source failures are reported in the body", body = BatchSyncResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Source unknown or not subscribed", body = ErrorResponse),
        (status = 500, description = "Storage unreachable", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn trigger_sync(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Json(request): Json<SyncRequest>,
) -> Response {
    let window = if request.backfill {
        SyncWindow::Full
    } else {
        state.orchestrator.recent_window()
    };
    info!(user_id = %caller.user_id, source_id = ?request.source_id, backfill = request.backfill, "sync requested");

    let outcome = match request.source_id {
        Some(source_id) => state
            .orchestrator
            .sync_user_source(caller.user_id, source_id, window)
            .await
            .map(|result| Json(SourceSyncResponse::from(result)).into_response()),
        None => state
            .orchestrator
            .sync_user(caller.user_id, window)
            .await
            .map(|batch| Json(BatchSyncResponse::from(batch)).into_response()),
    };

    outcome.unwrap_or_else(|err| sync_error_response(&err))
}

fn sync_error_response(err: &SyncError) -> Response {
    let status = match err {
        SyncError::SourceNotFound(_) => StatusCode::NOT_FOUND,
        SyncError::Storage(_) => {
            error!(error = %err, "sync aborted");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorResponse::new(err.to_string()))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::Config,
        fetcher::HttpClient,
        repositories::{MockStore, StoreError},
    };
    use std::sync::Arc;
    use uuid::Uuid;

    fn state(store: MockStore) -> AppState {
        let client = Arc::new(HttpClient::new(Default::default()).unwrap());
        AppState::new(Arc::new(store), client, &Config::default())
    }

    #[tokio::test]
    async fn unknown_source_is_not_found() {
        let mut store = MockStore::new();
        store.expect_get_source_for_user().returning(|_, _| Ok(None));

        let response = trigger_sync(
            CallerIdentity { user_id: Uuid::new_v4() },
            State(state(store)),
            Json(SyncRequest {
                source_id: Some(Uuid::new_v4()),
                backfill: false,
            }),
        )
        .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unreachable_storage_is_server_error() {
        let mut store = MockStore::new();
        store
            .expect_get_sources_for_user()
            .returning(|_, _| Err(StoreError::Unavailable("connection refused".into())));

        let response = trigger_sync(
            CallerIdentity { user_id: Uuid::new_v4() },
            State(state(store)),
            Json(SyncRequest::default()),
        )
        .await;

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
