use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use tracing::error;
use uuid::Uuid;

use crate::{
    app_state::AppState,
    auth::{CallerIdentity, dtos::ErrorResponse},
    repositories::StoreError,
    slug::id_from_slug,
};

use super::dtos::{EntryListQuery, EntryResponse};

#[utoipa::path(
    get,
    path = "/v1/sources/{id}/entries",
    tag = "entries",
    params(("id" = Uuid, Path, description = "Source id"), EntryListQuery),
    responses(
        (status = 200, description = "Entries newest first, undated last", body = [EntryResponse]),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Caller does not subscribe to this source", body = ErrorResponse),
        (status = 500, description = "Storage unreachable", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn list_entries(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(source_id): Path<Uuid>,
    Query(query): Query<EntryListQuery>,
) -> Response {
    match state.store.get_source_for_user(caller.user_id, source_id).await {
        Ok(Some(_)) => {}
        Ok(None) => return not_found(format!("source {source_id} not found")),
        Err(err) => return storage_failure(&err),
    }

    match state.store.list_entries(source_id, query.page_size()).await {
        Ok(entries) => {
            let body: Vec<EntryResponse> = entries.into_iter().map(Into::into).collect();
            Json(body).into_response()
        }
        Err(err) => storage_failure(&err),
    }
}

#[utoipa::path(
    get,
    path = "/v1/entries/{slug}",
    tag = "entries",
    params(("slug" = String, Path, description = "`{id}--{title}` slug or a bare id")),
    responses(
        (status = 200, description = "The entry", body = EntryResponse),
        (status = 401, description = "Missing or invalid token", body = ErrorResponse),
        (status = 404, description = "Unknown slug, or the entry's source is not subscribed", body = ErrorResponse),
        (status = 500, description = "Storage unreachable", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn get_entry(
    caller: CallerIdentity,
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Response {
    let Some(entry_id) = id_from_slug(&slug) else {
        return not_found(format!("entry {slug} not found"));
    };

    let entry = match state.store.get_entry(entry_id).await {
        Ok(Some(entry)) => entry,
        Ok(None) => return not_found(format!("entry {slug} not found")),
        Err(err) => return storage_failure(&err),
    };

    // Entries are only visible through a subscription to their source.
    match state.store.get_source_for_user(caller.user_id, entry.source_id).await {
        Ok(Some(_)) => Json(EntryResponse::from(entry)).into_response(),
        Ok(None) => not_found(format!("entry {slug} not found")),
        Err(err) => storage_failure(&err),
    }
}

fn not_found(message: String) -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new(message))).into_response()
}

fn storage_failure(err: &StoreError) -> Response {
    error!(error = %err, "entry request failed");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(err.to_string())),
    )
        .into_response()
}
