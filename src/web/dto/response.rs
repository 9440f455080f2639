//! Response DTOs for Web API.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;

use crate::share::{FileRecord, InactiveReason, RevokeOutcome, ShareInfo};

fn to_rfc3339(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Generic API response wrapper.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    /// Response data.
    pub data: T,
}

impl<T: Serialize> ApiResponse<T> {
    /// Create a new API response.
    pub fn new(data: T) -> Self {
        Self { data }
    }
}

/// A file as seen by its owner.
#[derive(Debug, Serialize)]
pub struct FileResponse {
    /// File ID.
    pub id: i64,
    /// Original file name.
    pub original_name: String,
    /// Size in bytes.
    pub size: i64,
    /// MIME type.
    pub content_type: String,
    /// Upload time (RFC 3339).
    pub uploaded_at: String,
    /// Expiry time (RFC 3339).
    pub expires_at: String,
    /// Share token.
    pub share_token: String,
    /// Relative share URL.
    pub share_url: String,
    /// Whether a password protects the share.
    pub has_password: bool,
    /// Admitted share downloads.
    pub download_count: i64,
    /// Maximum share downloads.
    pub download_limit: Option<i64>,
    /// Whether the share is still active.
    pub is_active: bool,
    /// Whether the share has expired.
    pub is_expired: bool,
    /// Why the share was deactivated.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive_reason: Option<InactiveReason>,
}

impl FileResponse {
    /// Build the owner view of a record at `now`.
    pub fn from_record(record: &FileRecord, now: DateTime<Utc>) -> Self {
        Self {
            id: record.id,
            original_name: record.original_name.clone(),
            size: record.size,
            content_type: record.content_type.clone(),
            uploaded_at: to_rfc3339(&record.uploaded_at),
            expires_at: to_rfc3339(&record.expires_at),
            share_token: record.share_token.clone(),
            share_url: format!("/api/share/{}", record.share_token),
            has_password: record.has_password(),
            download_count: record.download_count,
            download_limit: record.download_limit,
            is_active: record.is_active,
            is_expired: record.is_expired(now),
            inactive_reason: record.inactive_reason,
        }
    }
}

/// Public metadata of a share link.
#[derive(Debug, Serialize)]
pub struct ShareInfoResponse {
    /// Original file name.
    pub original_name: String,
    /// Size in bytes.
    pub size: i64,
    /// MIME type.
    pub content_type: String,
    /// Upload time (RFC 3339).
    pub uploaded_at: String,
    /// Expiry time (RFC 3339).
    pub expires_at: String,
    /// Whether a password is required.
    pub has_password: bool,
    /// Admitted downloads.
    pub download_count: i64,
    /// Maximum downloads.
    pub download_limit: Option<i64>,
}

impl From<ShareInfo> for ShareInfoResponse {
    fn from(info: ShareInfo) -> Self {
        Self {
            uploaded_at: to_rfc3339(&info.uploaded_at),
            expires_at: to_rfc3339(&info.expires_at),
            original_name: info.original_name,
            size: info.size,
            content_type: info.content_type,
            has_password: info.has_password,
            download_count: info.download_count,
            download_limit: info.download_limit,
        }
    }
}

/// Result of a revoke request.
#[derive(Debug, Serialize)]
pub struct RevokeResponse {
    /// File ID.
    pub id: i64,
    /// `revoked` or `already_revoked`.
    pub status: &'static str,
}

impl RevokeResponse {
    /// Build a response for a revoke outcome.
    pub fn new(id: i64, outcome: RevokeOutcome) -> Self {
        let status = match outcome {
            RevokeOutcome::Revoked => "revoked",
            RevokeOutcome::AlreadyRevoked => "already_revoked",
        };
        Self { id, status }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_revoke_response_status() {
        assert_eq!(RevokeResponse::new(1, RevokeOutcome::Revoked).status, "revoked");
        assert_eq!(
            RevokeResponse::new(1, RevokeOutcome::AlreadyRevoked).status,
            "already_revoked"
        );
    }

    #[test]
    fn test_api_response_wraps_data() {
        let json = serde_json::to_value(ApiResponse::new(vec![1, 2])).unwrap();
        assert_eq!(json["data"], serde_json::json!([1, 2]));
    }
}
