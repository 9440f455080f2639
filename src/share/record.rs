//! Share record entities.

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use sqlx::sqlite::SqliteRow;
use sqlx::{FromRow, Row};

/// Why a record stopped being servable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InactiveReason {
    /// The owner revoked the share.
    Revoked,
    /// The sweeper retired the record after its expiry.
    Expired,
    /// The sweeper retired the record after expiry with its download limit reached.
    Exhausted,
}

impl InactiveReason {
    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            InactiveReason::Revoked => "revoked",
            InactiveReason::Expired => "expired",
            InactiveReason::Exhausted => "exhausted",
        }
    }

    /// Parse from string.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "revoked" => Some(InactiveReason::Revoked),
            "expired" => Some(InactiveReason::Expired),
            "exhausted" => Some(InactiveReason::Exhausted),
            _ => None,
        }
    }
}

/// A shared file and the constraints on its share link.
#[derive(Debug, Clone, PartialEq)]
pub struct FileRecord {
    /// Record ID.
    pub id: i64,
    /// Owning principal.
    pub owner_id: String,
    /// Name of the stored blob.
    pub blob_ref: String,
    /// Original file name.
    pub original_name: String,
    /// Size in bytes.
    pub size: i64,
    /// MIME type.
    pub content_type: String,
    /// Hex SHA-256 of the content.
    pub checksum: String,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
    /// Time after which the link no longer serves.
    pub expires_at: DateTime<Utc>,
    /// Share token.
    pub share_token: String,
    /// Argon2 PHC hash of the share password.
    pub password_hash: Option<String>,
    /// Maximum number of share downloads.
    pub download_limit: Option<i64>,
    /// Admitted share downloads so far.
    pub download_count: i64,
    /// Whether the record is still live.
    pub is_active: bool,
    /// Why the record was deactivated.
    pub inactive_reason: Option<InactiveReason>,
    /// When the record was deactivated.
    pub deactivated_at: Option<DateTime<Utc>>,
    /// When the blob was deleted.
    pub blob_reclaimed_at: Option<DateTime<Utc>>,
}

impl FileRecord {
    /// Check if the record is expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Check if the download limit has been reached.
    pub fn limit_reached(&self) -> bool {
        matches!(self.download_limit, Some(limit) if self.download_count >= limit)
    }

    /// Check if a password protects the share.
    pub fn has_password(&self) -> bool {
        self.password_hash.is_some()
    }

    /// Check if the owner revoked the share.
    pub fn is_revoked(&self) -> bool {
        self.inactive_reason == Some(InactiveReason::Revoked)
    }

    /// Remaining share downloads, if limited.
    pub fn remaining_downloads(&self) -> Option<i64> {
        self.download_limit
            .map(|limit| (limit - self.download_count).max(0))
    }

    /// Build the public view of this record.
    pub fn share_info(&self) -> ShareInfo {
        ShareInfo {
            original_name: self.original_name.clone(),
            size: self.size,
            content_type: self.content_type.clone(),
            uploaded_at: self.uploaded_at,
            expires_at: self.expires_at,
            has_password: self.has_password(),
            download_count: self.download_count,
            download_limit: self.download_limit,
        }
    }
}

/// Convert stored unix milliseconds to a UTC timestamp.
pub(crate) fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Convert a UTC timestamp to stored unix milliseconds.
pub(crate) fn to_millis(t: DateTime<Utc>) -> i64 {
    t.timestamp_millis()
}

impl<'r> FromRow<'r, SqliteRow> for FileRecord {
    fn from_row(row: &'r SqliteRow) -> Result<Self, sqlx::Error> {
        let reason: Option<String> = row.try_get("inactive_reason")?;
        let deactivated_at: Option<i64> = row.try_get("deactivated_at")?;
        let blob_reclaimed_at: Option<i64> = row.try_get("blob_reclaimed_at")?;

        Ok(Self {
            id: row.try_get("id")?,
            owner_id: row.try_get("owner_id")?,
            blob_ref: row.try_get("blob_ref")?,
            original_name: row.try_get("original_name")?,
            size: row.try_get("size")?,
            content_type: row.try_get("content_type")?,
            checksum: row.try_get("checksum")?,
            uploaded_at: from_millis(row.try_get("uploaded_at")?),
            expires_at: from_millis(row.try_get("expires_at")?),
            share_token: row.try_get("share_token")?,
            password_hash: row.try_get("password_hash")?,
            download_limit: row.try_get("download_limit")?,
            download_count: row.try_get("download_count")?,
            is_active: row.try_get("is_active")?,
            inactive_reason: reason.as_deref().and_then(InactiveReason::parse),
            deactivated_at: deactivated_at.map(from_millis),
            blob_reclaimed_at: blob_reclaimed_at.map(from_millis),
        })
    }
}

/// New share record for creation.
#[derive(Debug, Clone)]
pub struct NewFileRecord {
    /// Owning principal.
    pub owner_id: String,
    /// Name of the stored blob.
    pub blob_ref: String,
    /// Original file name.
    pub original_name: String,
    /// Size in bytes.
    pub size: i64,
    /// MIME type.
    pub content_type: String,
    /// Hex SHA-256 of the content.
    pub checksum: String,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
    /// Share token.
    pub share_token: String,
    /// Argon2 PHC hash of the share password.
    pub password_hash: Option<String>,
    /// Maximum number of share downloads.
    pub download_limit: Option<i64>,
}

/// Public metadata of a share link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareInfo {
    /// Original file name.
    pub original_name: String,
    /// Size in bytes.
    pub size: i64,
    /// MIME type.
    pub content_type: String,
    /// Upload time.
    pub uploaded_at: DateTime<Utc>,
    /// Expiry time.
    pub expires_at: DateTime<Utc>,
    /// Whether a password is required.
    pub has_password: bool,
    /// Admitted share downloads so far.
    pub download_count: i64,
    /// Maximum number of share downloads.
    pub download_limit: Option<i64>,
}
