//! Public share link handlers.

use axum::{
    body::Body,
    extract::{Path, Query, State},
    response::Response,
    Json,
};
use std::sync::Arc;

use super::{download_response, AppState};
use crate::share::token::redact_token;
use crate::web::dto::{
    ApiResponse, ShareDownloadQuery, ShareDownloadRequest, ShareInfoResponse, ValidatedJson,
};
use crate::web::error::ApiError;

/// GET /api/share/:token - Public metadata of a share link.
pub async fn get_share_info(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
) -> Result<Json<ApiResponse<ShareInfoResponse>>, ApiError> {
    let info = state.service.get_share_info(&token).await?;
    Ok(Json(ApiResponse::new(info.into())))
}

/// GET /api/share/:token/download - Download through a share link.
pub async fn download_shared(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Query(query): Query<ShareDownloadQuery>,
) -> Result<Response<Body>, ApiError> {
    serve_share(&state, &token, query.password).await
}

/// POST /api/share/:token/download - Download with the password in the body.
pub async fn download_shared_with_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    ValidatedJson(req): ValidatedJson<ShareDownloadRequest>,
) -> Result<Response<Body>, ApiError> {
    serve_share(&state, &token, req.password).await
}

async fn serve_share(
    state: &AppState,
    token: &str,
    password: Option<String>,
) -> Result<Response<Body>, ApiError> {
    let password = password.filter(|p| !p.is_empty());

    if password.is_some() && !state.rate_limit.check_password_attempt(token) {
        tracing::warn!(token = %redact_token(token), "Password attempt rate limit exceeded");
        return Err(ApiError::too_many_requests(
            "Too many password attempts. Please try again later.",
        ));
    }

    let download = state
        .service
        .download_via_share(token, password.as_deref())
        .await?;
    download_response(download)
}
