//! Owner file handlers.

use axum::{
    body::Body,
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Response,
    Json,
};
use chrono::Utc;
use std::sync::Arc;

use super::{download_response, AppState};
use crate::share::{CreateShareRequest, SweepReport};
use crate::web::dto::{
    ApiResponse, FileResponse, ListFilesQuery, RevokeResponse, UploadForm,
};
use crate::web::error::ApiError;
use crate::web::middleware::AuthUser;

/// Parse an optional numeric form field; blank means absent.
fn parse_optional<T: std::str::FromStr>(value: &str, field: &str) -> Result<Option<T>, ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| ApiError::bad_request(format!("Invalid {field}")))
}

async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, ApiError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        let name = field.name().unwrap_or("").to_string();

        match name.as_str() {
            "file" => {
                form.filename = field.file_name().map(|s| s.to_string());
                form.content_type = field.content_type().map(|s| s.to_string());
                form.content = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| {
                            tracing::warn!("Failed to read file content: {}", e);
                            ApiError::bad_request("Failed to read file")
                        })?
                        .to_vec(),
                );
            }
            "expiration_hours" | "password" | "download_limit" => {
                let text = field
                    .text()
                    .await
                    .map_err(|_| ApiError::bad_request(format!("Invalid {name}")))?;
                match name.as_str() {
                    "expiration_hours" => {
                        form.expiration_hours = parse_optional(&text, "expiration_hours")?
                    }
                    "download_limit" => {
                        form.download_limit = parse_optional(&text, "download_limit")?
                    }
                    _ => form.password = Some(text),
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

/// POST /api/files - Upload a file and create its share link.
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponse>>), ApiError> {
    let form = read_upload_form(multipart).await?;

    let filename = form
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| ApiError::bad_request("No file provided"))?;
    let content = form
        .content
        .ok_or_else(|| ApiError::bad_request("No file content"))?;

    let request = CreateShareRequest {
        owner_id: user.owner_id().to_string(),
        original_name: filename,
        content,
        // Browsers label unknown types as octet-stream; guess from the name instead.
        content_type: form
            .content_type
            .filter(|ct| ct != "application/octet-stream"),
        expiration_hours: form.expiration_hours,
        password: form.password,
        download_limit: form.download_limit,
    };

    let record = state.service.create_share(request).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(FileResponse::from_record(&record, Utc::now()))),
    ))
}

/// GET /api/files - List the caller's files.
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<ListFilesQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponse>>>, ApiError> {
    let records = state
        .service
        .list_owned_files(user.owner_id(), query.include_inactive)
        .await?;

    let now = Utc::now();
    let files = records
        .iter()
        .map(|r| FileResponse::from_record(r, now))
        .collect();

    Ok(Json(ApiResponse::new(files)))
}

/// GET /api/files/:id - Get one of the caller's files.
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<FileResponse>>, ApiError> {
    let record = state.service.get_owned_file(user.owner_id(), file_id).await?;
    Ok(Json(ApiResponse::new(FileResponse::from_record(
        &record,
        Utc::now(),
    ))))
}

/// DELETE /api/files/:id - Revoke a file's share link.
pub async fn revoke_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Json<ApiResponse<RevokeResponse>>, ApiError> {
    let outcome = state.service.revoke_file(user.owner_id(), file_id).await?;
    Ok(Json(ApiResponse::new(RevokeResponse::new(file_id, outcome))))
}

/// GET /api/files/:id/download - Download one of the caller's files.
///
/// Not counted against the download limit.
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(file_id): Path<i64>,
) -> Result<Response<Body>, ApiError> {
    let download = state
        .service
        .download_owned_file(user.owner_id(), file_id)
        .await?;
    download_response(download)
}

/// POST /api/files/cleanup - Run a sweeper pass now.
pub async fn cleanup_files(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<ApiResponse<SweepReport>>, ApiError> {
    let report = state.service.sweep_now().await;
    tracing::info!(
        owner_id = user.owner_id(),
        deactivated = report.deactivated,
        reclaimed = report.reclaimed,
        "Manual cleanup finished"
    );
    Ok(Json(ApiResponse::new(report)))
}
