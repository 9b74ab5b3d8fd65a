use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    auth::{CallerIdentity, dtos::ErrorResponse},
    entities::{ContentKind, ContentRef, InteractionState},
    repositories::StoreError,
};

use super::dtos::{ArchiveRequest, InteractionResponse, ProgressRequest, ReadRequest};

fn content_ref((kind, id): (ContentKind, Uuid)) -> ContentRef {
    ContentRef { id, kind }
}

fn respond(outcome: Result<InteractionState, StoreError>) -> Response {
    match outcome {
        Ok(state) => Json(InteractionResponse::from(state)).into_response(),
        Err(err) => {
            error!(error = %err, "interaction request failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(err.to_string())),
            )
                .into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/interactions/{kind}/{id}",
    tag = "interactions",
    params(
        ("kind" = String, Path, description = "article, video, podcast_episode or social_post"),
        ("id" = Uuid, Path, description = "Content id")
    ),
    responses(
        (status = 200, description = "Current state; defaults when never touched", body = InteractionResponse),
        (status = 400, description = "Unknown content kind or malformed id"),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn get_interaction(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(content): Path<(ContentKind, Uuid)>,
) -> Response {
    respond(state.interactions.get(caller.user_id, content_ref(content)).await)
}

#[utoipa::path(
    put,
    path = "/v1/interactions/{kind}/{id}/read",
    tag = "interactions",
    params(
        ("kind" = String, Path, description = "article, video, podcast_episode or social_post"),
        ("id" = Uuid, Path, description = "Content id")
    ),
    request_body = ReadRequest,
    responses(
        (status = 200, description = "Updated state", body = InteractionResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn mark_read(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(content): Path<(ContentKind, Uuid)>,
    Json(request): Json<ReadRequest>,
) -> Response {
    respond(
        state
            .interactions
            .mark_read(caller.user_id, content_ref(content), request.read)
            .await,
    )
}

#[utoipa::path(
    post,
    path = "/v1/interactions/{kind}/{id}/favorite",
    tag = "interactions",
    params(
        ("kind" = String, Path, description = "article, video, podcast_episode or social_post"),
        ("id" = Uuid, Path, description = "Content id")
    ),
    responses(
        (status = 200, description = "Favorite flag flipped", body = InteractionResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn toggle_favorite(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(content): Path<(ContentKind, Uuid)>,
) -> Response {
    respond(
        state
            .interactions
            .toggle_favorite(caller.user_id, content_ref(content))
            .await,
    )
}

#[utoipa::path(
    put,
    path = "/v1/interactions/{kind}/{id}/archive",
    tag = "interactions",
    params(
        ("kind" = String, Path, description = "article, video, podcast_episode or social_post"),
        ("id" = Uuid, Path, description = "Content id")
    ),
    request_body = ArchiveRequest,
    responses(
        (status = 200, description = "Updated state", body = InteractionResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn set_archived(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(content): Path<(ContentKind, Uuid)>,
    Json(request): Json<ArchiveRequest>,
) -> Response {
    respond(
        state
            .interactions
            .set_archived(caller.user_id, content_ref(content), request.archived)
            .await,
    )
}

#[utoipa::path(
    put,
    path = "/v1/interactions/{kind}/{id}/progress",
    tag = "interactions",
    params(
        ("kind" = String, Path, description = "article, video, podcast_episode or social_post"),
        ("id" = Uuid, Path, description = "Content id")
    ),
    request_body = ProgressRequest,
    responses(
        (status = 200, description = "Updated state", body = InteractionResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn record_progress(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(content): Path<(ContentKind, Uuid)>,
    Json(request): Json<ProgressRequest>,
) -> Response {
    respond(
        state
            .interactions
            .record_progress(
                caller.user_id,
                content_ref(content),
                request.percent,
                request.seconds_spent,
            )
            .await,
    )
}
