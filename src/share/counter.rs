//! Atomic download admission.

use chrono::{DateTime, Utc};
use tracing::debug;

use super::record::to_millis;
use crate::db::DbPool;
use crate::{Result, SharegateError};

/// Result of an admission attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The download was counted.
    Admitted {
        /// Count after this download.
        download_count: i64,
    },
    /// The record is no longer admissible.
    Rejected,
}

impl Admission {
    /// Check if the download was admitted.
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted { .. })
    }
}

/// Counts share downloads with an "increment if still admissible" update.
pub struct DownloadCounter<'a> {
    pool: &'a DbPool,
}

impl<'a> DownloadCounter<'a> {
    /// Create a new counter instance.
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Try to admit one download of the record.
    ///
    /// The increment happens in a single statement that re-checks activity,
    /// expiry and the limit, so concurrent callers can never push the count
    /// past the limit. Not retried on error: the caller cannot tell whether
    /// the increment landed.
    pub async fn try_admit(&self, record_id: i64, now: DateTime<Utc>) -> Result<Admission> {
        let count: Option<i64> = sqlx::query_scalar(
            "UPDATE share_files
             SET download_count = download_count + 1
             WHERE id = ?
               AND is_active = 1
               AND expires_at > ?
               AND (download_limit IS NULL OR download_count < download_limit)
             RETURNING download_count",
        )
        .bind(record_id)
        .bind(to_millis(now))
        .fetch_optional(self.pool)
        .await
        .map_err(|e| SharegateError::Database(e.to_string()))?;

        let admission = match count {
            Some(download_count) => Admission::Admitted { download_count },
            None => Admission::Rejected,
        };
        debug!(file_id = record_id, ?admission, "download admission");
        Ok(admission)
    }
}
