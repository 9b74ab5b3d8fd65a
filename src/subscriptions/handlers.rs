use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    app_state::AppState,
    auth::{CallerIdentity, dtos::ErrorResponse},
    repositories::StoreError,
};

use super::{
    SubscribeError,
    dtos::{SourceResponse, SubscribeRequest, SubscribeResponse},
};

#[utoipa::path(
    get,
    path = "/v1/sources",
    tag = "sources",
    responses(
        (status = 200, description = "Sources the caller subscribes to", body = [SourceResponse]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 500, description = "Storage unreachable", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list_sources(caller: CallerIdentity, State(state): State<AppState>) -> Response {
    match state.store.get_sources_for_user(caller.user_id, false).await {
        Ok(sources) => {
            let body: Vec<SourceResponse> = sources.into_iter().map(Into::into).collect();
            Json(body).into_response()
        }
        Err(err) => storage_failure(&err),
    }
}

#[utoipa::path(
    post,
    path = "/v1/sources",
    tag = "sources",
    request_body = SubscribeRequest,
    responses(
        (status = 201, description = "New source created and subscribed", body = SubscribeResponse),
        (status = 200, description = "Subscribed to an existing source", body = SubscribeResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 422, description = "URL is not a recognizable source", body = ErrorResponse),
        (status = 500, description = "Storage unreachable", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn subscribe(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Json(request): Json<SubscribeRequest>,
) -> Response {
    match state.subscriptions.subscribe(caller.user_id, &request.url).await {
        Ok(subscribed) => {
            let status = if subscribed.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (status, Json(SubscribeResponse::from(subscribed))).into_response()
        }
        Err(err @ SubscribeError::NotDetected(_)) => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new(err.to_string())),
        )
            .into_response(),
        Err(SubscribeError::Storage(err)) => storage_failure(&err),
    }
}

#[utoipa::path(
    delete,
    path = "/v1/sources/{id}",
    tag = "sources",
    params(("id" = Uuid, Path, description = "Source id")),
    responses(
        (status = 204, description = "Unsubscribed"),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Caller does not subscribe to this source", body = ErrorResponse),
        (status = 500, description = "Storage unreachable", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn unsubscribe(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(source_id): Path<Uuid>,
) -> Response {
    match state.store.get_source_for_user(caller.user_id, source_id).await {
        Ok(Some(_)) => {}
        Ok(None) => {
            return (
                StatusCode::NOT_FOUND,
                Json(ErrorResponse::new(format!("source {source_id} not found"))),
            )
                .into_response();
        }
        Err(err) => return storage_failure(&err),
    }

    match state.subscriptions.unsubscribe(caller.user_id, source_id).await {
        Ok(soft_deleted) => {
            info!(user_id = %caller.user_id, %source_id, soft_deleted, "unsubscribed");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => storage_failure(&err),
    }
}

fn storage_failure(err: &StoreError) -> Response {
    error!(error = %err, "source request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(err.to_string())),
    )
        .into_response()
}
