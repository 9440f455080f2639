//! Share record repository.

use chrono::{DateTime, Utc};

use super::record::{to_millis, FileRecord, InactiveReason, NewFileRecord};
use crate::db::DbPool;
use crate::{Result, SharegateError};

const SELECT_COLUMNS: &str = "SELECT id, owner_id, blob_ref, original_name, size, content_type,
        checksum, uploaded_at, expires_at, share_token, password_hash, download_limit,
        download_count, is_active, inactive_reason, deactivated_at, blob_reclaimed_at
     FROM share_files";

/// Map an insert error, detecting share token collisions.
fn map_insert_error(e: sqlx::Error) -> SharegateError {
    if let sqlx::Error::Database(ref db_err) = e {
        if db_err.is_unique_violation() && db_err.message().contains("share_token") {
            return SharegateError::TokenConflict;
        }
    }
    SharegateError::Database(e.to_string())
}

/// Repository for share record operations.
pub struct FileRecordRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> FileRecordRepository<'a> {
    /// Create a new repository instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Create a new record.
    ///
    /// Fails with [`SharegateError::TokenConflict`] if the share token is
    /// already taken.
    pub async fn create(&self, record: &NewFileRecord) -> Result<FileRecord> {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO share_files (owner_id, blob_ref, original_name, size, content_type,
                 checksum, uploaded_at, expires_at, share_token, password_hash, download_limit)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING id",
        )
        .bind(&record.owner_id)
        .bind(&record.blob_ref)
        .bind(&record.original_name)
        .bind(record.size)
        .bind(&record.content_type)
        .bind(&record.checksum)
        .bind(to_millis(record.uploaded_at))
        .bind(to_millis(record.expires_at))
        .bind(&record.share_token)
        .bind(&record.password_hash)
        .bind(record.download_limit)
        .fetch_one(self.pool)
        .await
        .map_err(map_insert_error)?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| SharegateError::NotFound("file".into()))
    }

    /// Get a record by ID.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<FileRecord>> {
        let record = sqlx::query_as::<_, FileRecord>(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .map_err(|e| SharegateError::Database(e.to_string()))?;

        Ok(record)
    }

    /// Get a record by share token.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<FileRecord>> {
        let record =
            sqlx::query_as::<_, FileRecord>(&format!("{SELECT_COLUMNS} WHERE share_token = ?"))
                .bind(token)
                .fetch_optional(self.pool)
                .await
                .map_err(|e| SharegateError::Database(e.to_string()))?;

        Ok(record)
    }

    /// List an owner's records, newest first.
    ///
    /// Unless `include_inactive` is set, only active records that have not
    /// expired at `now` are returned.
    pub async fn list_by_owner(
        &self,
        owner_id: &str,
        include_inactive: bool,
        now: DateTime<Utc>,
    ) -> Result<Vec<FileRecord>> {
        let records = if include_inactive {
            sqlx::query_as::<_, FileRecord>(&format!(
                "{SELECT_COLUMNS} WHERE owner_id = ? ORDER BY uploaded_at DESC, id DESC"
            ))
            .bind(owner_id)
            .fetch_all(self.pool)
            .await
        } else {
            sqlx::query_as::<_, FileRecord>(&format!(
                "{SELECT_COLUMNS} WHERE owner_id = ? AND is_active = 1 AND expires_at > ?
                 ORDER BY uploaded_at DESC, id DESC"
            ))
            .bind(owner_id)
            .bind(to_millis(now))
            .fetch_all(self.pool)
            .await
        }
        .map_err(|e| SharegateError::Database(e.to_string()))?;

        Ok(records)
    }

    /// Revoke a record.
    ///
    /// Returns `false` if the record was already revoked. A record retired
    /// by the sweeper is upgraded to revoked, keeping its original
    /// deactivation time.
    pub async fn revoke(&self, id: i64, now: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE share_files
             SET is_active = 0,
                 inactive_reason = 'revoked',
                 deactivated_at = COALESCE(deactivated_at, ?)
             WHERE id = ? AND (inactive_reason IS NULL OR inactive_reason != 'revoked')",
        )
        .bind(to_millis(now))
        .bind(id)
        .execute(self.pool)
        .await
        .map_err(|e| SharegateError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// List active records that are expired at `now`.
    ///
    /// Exhausted but unexpired records stay active: the live limit check
    /// already denies them, and their owner can still reach them.
    pub async fn list_sweep_candidates(
        &self,
        now: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(&format!(
            "{SELECT_COLUMNS}
             WHERE is_active = 1 AND expires_at <= ?
             ORDER BY id
             LIMIT ?"
        ))
        .bind(to_millis(now))
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .map_err(|e| SharegateError::Database(e.to_string()))?;

        Ok(records)
    }

    /// Deactivate a record if it is expired at `now`.
    ///
    /// Returns the recorded reason, or `None` if the record was already
    /// inactive or is still live. A record that had also used up its
    /// download limit is recorded as exhausted.
    pub async fn deactivate_if_expired(
        &self,
        id: i64,
        now: DateTime<Utc>,
    ) -> Result<Option<InactiveReason>> {
        let now_ms = to_millis(now);
        let reason: Option<String> = sqlx::query_scalar(
            "UPDATE share_files
             SET is_active = 0,
                 inactive_reason = CASE
                     WHEN download_limit IS NOT NULL AND download_count >= download_limit
                         THEN 'exhausted'
                     ELSE 'expired'
                 END,
                 deactivated_at = ?
             WHERE id = ? AND is_active = 1 AND expires_at <= ?
             RETURNING inactive_reason",
        )
        .bind(now_ms)
        .bind(id)
        .bind(now_ms)
        .fetch_optional(self.pool)
        .await
        .map_err(|e| SharegateError::Database(e.to_string()))?;

        Ok(reason.as_deref().and_then(InactiveReason::parse))
    }

    /// List inactive records, deactivated at or before `deactivated_before`,
    /// whose blob has not been reclaimed.
    pub async fn list_reclaimable(
        &self,
        deactivated_before: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<FileRecord>> {
        let records = sqlx::query_as::<_, FileRecord>(&format!(
            "{SELECT_COLUMNS}
             WHERE is_active = 0
               AND blob_reclaimed_at IS NULL
               AND deactivated_at <= ?
             ORDER BY id
             LIMIT ?"
        ))
        .bind(to_millis(deactivated_before))
        .bind(limit)
        .fetch_all(self.pool)
        .await
        .map_err(|e| SharegateError::Database(e.to_string()))?;

        Ok(records)
    }

    /// Record that a record's blob was deleted at `now`.
    ///
    /// Only records deactivated at or before `deactivated_before` qualify.
    pub async fn mark_reclaimed(
        &self,
        id: i64,
        deactivated_before: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE share_files SET blob_reclaimed_at = ?
             WHERE id = ?
               AND is_active = 0
               AND blob_reclaimed_at IS NULL
               AND deactivated_at <= ?",
        )
        .bind(to_millis(now))
        .bind(id)
        .bind(to_millis(deactivated_before))
        .execute(self.pool)
        .await
        .map_err(|e| SharegateError::Database(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    /// Count all records.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM share_files")
            .fetch_one(self.pool)
            .await
            .map_err(|e| SharegateError::Database(e.to_string()))?;

        Ok(count)
    }
}
