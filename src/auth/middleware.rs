use axum::{
    Json,
    extract::FromRequestParts,
    http::{StatusCode, header::AUTHORIZATION, request::Parts},
    response::{IntoResponse, Response},
};
use tracing::debug;
use uuid::Uuid;

use crate::{app_state::AppState, auth::dtos::ErrorResponse};

/// The user a request acts for, taken from a verified bearer token.
#[derive(Debug, Clone, Copy)]
pub struct CallerIdentity {
    pub user_id: Uuid,
}

impl FromRequestParts<AppState> for CallerIdentity {
    type Rejection = AuthError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let auth_header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());
        let jwt = state.jwt.clone();

        async move {
            let auth_header = auth_header.ok_or(AuthError::MissingToken)?;

            let token = auth_header
                .strip_prefix("Bearer ")
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or(AuthError::InvalidTokenFormat)?;

            let claims = jwt.verify_token(token).map_err(|err| {
                debug!(error = %err, "token rejected");
                AuthError::InvalidToken
            })?;

            let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AuthError::InvalidToken)?;

            Ok(CallerIdentity { user_id })
        }
    }
}

#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidTokenFormat,
    InvalidToken,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "Missing authorization token",
            AuthError::InvalidTokenFormat => "Invalid token format",
            AuthError::InvalidToken => "Invalid or expired token",
        };

        (StatusCode::UNAUTHORIZED, Json(ErrorResponse::new(message))).into_response()
    }
}
