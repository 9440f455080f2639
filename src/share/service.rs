//! Share service.
//!
//! Orchestrates uploads, owner operations and share downloads on top of the
//! record store, blob storage, access evaluator and download counter.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::{debug, error, info, warn};

use super::access::{evaluate, AccessDecision, DenyReason};
use super::counter::{Admission, DownloadCounter};
use super::password::hash_share_password;
use super::record::{FileRecord, NewFileRecord, ShareInfo};
use super::repository::FileRecordRepository;
use super::sweeper::{LifecycleSweeper, SweepReport};
use super::token::{redact_token, TokenIssuer, MAX_TOKEN_ATTEMPTS};
use crate::config::Config;
use crate::db::Database;
use crate::storage::{checksum, FileStorage};
use crate::{Result, SharegateError};

/// Maximum original file name length (characters).
pub const MAX_FILENAME_LENGTH: usize = 255;

/// Upload constraints.
#[derive(Debug, Clone)]
pub struct ShareLimits {
    /// Maximum content size in bytes.
    pub max_upload_bytes: u64,
    /// Allowed lowercase extensions; empty allows all.
    pub allowed_extensions: Vec<String>,
    /// Expiration used when none is requested.
    pub default_expiration_hours: u32,
    /// Longest allowed expiration.
    pub max_expiration_hours: u32,
    /// Largest allowed download limit.
    pub max_download_limit: i64,
}

impl ShareLimits {
    /// Build limits from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_upload_bytes: config.files.max_upload_bytes(),
            allowed_extensions: config
                .files
                .allowed_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            default_expiration_hours: config.files.default_expiration_hours,
            max_expiration_hours: config.files.max_expiration_hours,
            max_download_limit: config.files.max_download_limit,
        }
    }
}

impl Default for ShareLimits {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Request to create a share.
#[derive(Debug, Clone, Default)]
pub struct CreateShareRequest {
    /// Uploading principal.
    pub owner_id: String,
    /// Original file name.
    pub original_name: String,
    /// File content.
    pub content: Vec<u8>,
    /// MIME type; guessed from the name when absent.
    pub content_type: Option<String>,
    /// Hours until expiry; the configured default when absent.
    pub expiration_hours: Option<u32>,
    /// Share password; empty means none.
    pub password: Option<String>,
    /// Maximum number of share downloads.
    pub download_limit: Option<i64>,
}

impl CreateShareRequest {
    /// Create a request with default constraints.
    pub fn new(
        owner_id: impl Into<String>,
        original_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            original_name: original_name.into(),
            content: content.into(),
            ..Default::default()
        }
    }

    /// Set the expiration in hours.
    pub fn with_expiration_hours(mut self, hours: u32) -> Self {
        self.expiration_hours = Some(hours);
        self
    }

    /// Set the share password.
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the download limit.
    pub fn with_download_limit(mut self, limit: i64) -> Self {
        self.download_limit = Some(limit);
        self
    }

    /// Set the content type.
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Result of a revoke request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevokeOutcome {
    /// The share was revoked by this request.
    Revoked,
    /// The share had already been revoked.
    AlreadyRevoked,
}

/// A served download.
#[derive(Debug, Clone)]
pub struct ShareDownload {
    /// Record state after admission.
    pub record: FileRecord,
    /// File content.
    pub content: Vec<u8>,
}

/// Strip any directory components and surrounding whitespace from a name.
pub fn sanitize_filename(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or("")
        .trim()
        .chars()
        .filter(|c| !c.is_control())
        .collect()
}

/// Share service.
#[derive(Clone)]
pub struct ShareService {
    db: Arc<Database>,
    storage: Arc<FileStorage>,
    issuer: TokenIssuer,
    limits: Arc<ShareLimits>,
    sweeper: Arc<LifecycleSweeper>,
}

impl ShareService {
    /// Create a new service from configuration.
    pub fn new(db: Arc<Database>, storage: Arc<FileStorage>, config: &Config) -> Self {
        let sweeper = LifecycleSweeper::from_config(db.clone(), storage.clone(), &config.sweeper);
        Self {
            db,
            storage,
            issuer: TokenIssuer::new(config.share.token_bytes),
            limits: Arc::new(ShareLimits::from_config(config)),
            sweeper: Arc::new(sweeper),
        }
    }

    /// Replace the token issuer.
    pub fn with_token_issuer(mut self, issuer: TokenIssuer) -> Self {
        self.issuer = issuer;
        self
    }

    /// Replace the upload limits.
    pub fn with_limits(mut self, limits: ShareLimits) -> Self {
        self.limits = Arc::new(limits);
        self
    }

    /// Get the database.
    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    /// Get the blob storage.
    pub fn storage(&self) -> &Arc<FileStorage> {
        &self.storage
    }

    /// Get the upload limits.
    pub fn limits(&self) -> &ShareLimits {
        &self.limits
    }

    fn validate_request(&self, req: &CreateShareRequest) -> Result<String> {
        if req.owner_id.trim().is_empty() {
            return Err(SharegateError::Auth("missing owner".to_string()));
        }

        let name = sanitize_filename(&req.original_name);
        if name.is_empty() {
            return Err(SharegateError::Validation("file name is required".to_string()));
        }
        if name.chars().count() > MAX_FILENAME_LENGTH {
            return Err(SharegateError::Validation(format!(
                "file name must be at most {MAX_FILENAME_LENGTH} characters"
            )));
        }

        if !self.limits.allowed_extensions.is_empty() {
            let ext = std::path::Path::new(&name)
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| e.to_lowercase());
            let allowed = ext
                .as_ref()
                .is_some_and(|e| self.limits.allowed_extensions.contains(e));
            if !allowed {
                return Err(SharegateError::Validation(
                    "file type not allowed".to_string(),
                ));
            }
        }

        if req.content.len() as u64 > self.limits.max_upload_bytes {
            return Err(SharegateError::Validation(format!(
                "file too large (max {} bytes)",
                self.limits.max_upload_bytes
            )));
        }

        if let Some(hours) = req.expiration_hours {
            if hours > self.limits.max_expiration_hours {
                return Err(SharegateError::Validation(format!(
                    "expiration must be at most {} hours",
                    self.limits.max_expiration_hours
                )));
            }
        }

        if let Some(limit) = req.download_limit {
            if limit < 1 || limit > self.limits.max_download_limit {
                return Err(SharegateError::Validation(format!(
                    "download limit must be between 1 and {}",
                    self.limits.max_download_limit
                )));
            }
        }

        Ok(name)
    }

    /// Create a share for an uploaded file.
    ///
    /// All validation happens before the blob is written. If the record
    /// cannot be persisted the blob is removed again.
    pub async fn create_share(&self, req: CreateShareRequest) -> Result<FileRecord> {
        let original_name = self.validate_request(&req)?;

        let password_hash = match req.password.as_deref() {
            None | Some("") => None,
            Some(password) => Some(hash_share_password(password)?),
        };

        let content_type = req
            .content_type
            .filter(|ct| !ct.trim().is_empty())
            .unwrap_or_else(|| {
                mime_guess::from_path(&original_name)
                    .first_or_octet_stream()
                    .to_string()
            });

        let hours = req
            .expiration_hours
            .unwrap_or(self.limits.default_expiration_hours);
        let uploaded_at = Utc::now();
        let expires_at = uploaded_at + Duration::hours(i64::from(hours));

        let blob_ref = self.storage.save(&req.content, &original_name).await?;

        let mut new_record = NewFileRecord {
            owner_id: req.owner_id.clone(),
            blob_ref: blob_ref.clone(),
            original_name,
            size: req.content.len() as i64,
            content_type,
            checksum: checksum(&req.content),
            uploaded_at,
            expires_at,
            share_token: String::new(),
            password_hash,
            download_limit: req.download_limit,
        };

        let repo = FileRecordRepository::new(self.db.pool());
        let mut last_err = SharegateError::TokenConflict;
        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            new_record.share_token = self.issuer.issue();
            match repo.create(&new_record).await {
                Ok(record) => {
                    info!(
                        file_id = record.id,
                        owner_id = %record.owner_id,
                        size = record.size,
                        token = %redact_token(&record.share_token),
                        "share created"
                    );
                    return Ok(record);
                }
                Err(SharegateError::TokenConflict) => {
                    warn!(attempt, "share token collision, retrying");
                    last_err = SharegateError::TokenConflict;
                }
                Err(e) => {
                    last_err = e;
                    break;
                }
            }
        }

        if let Err(e) = self.storage.delete(&blob_ref).await {
            error!("Failed to remove orphaned blob {}: {}", blob_ref, e);
        }
        Err(last_err)
    }

    /// Get a file owned by `owner_id`.
    ///
    /// Revoked records read as not found and expired ones as
    /// [`DenyReason::Expired`]. The download limit does not apply, so the
    /// answer does not depend on whether the sweeper has run.
    pub async fn get_owned_file(&self, owner_id: &str, file_id: i64) -> Result<FileRecord> {
        let record = self.load_owned(owner_id, file_id).await?;

        if record.is_revoked() {
            return Err(SharegateError::NotFound("file".to_string()));
        }
        if record.is_expired(Utc::now()) {
            return Err(DenyReason::Expired.into());
        }

        Ok(record)
    }

    async fn load_owned(&self, owner_id: &str, file_id: i64) -> Result<FileRecord> {
        let record = FileRecordRepository::new(self.db.pool())
            .get_by_id(file_id)
            .await?
            .ok_or_else(|| SharegateError::NotFound("file".to_string()))?;

        if record.owner_id != owner_id {
            return Err(SharegateError::Permission(
                "file belongs to another user".to_string(),
            ));
        }

        Ok(record)
    }

    /// List files owned by `owner_id`, newest first.
    pub async fn list_owned_files(
        &self,
        owner_id: &str,
        include_inactive: bool,
    ) -> Result<Vec<FileRecord>> {
        FileRecordRepository::new(self.db.pool())
            .list_by_owner(owner_id, include_inactive, Utc::now())
            .await
    }

    /// Revoke a share. Revoking twice is not an error.
    pub async fn revoke_file(&self, owner_id: &str, file_id: i64) -> Result<RevokeOutcome> {
        let record = self.load_owned(owner_id, file_id).await?;

        let changed = FileRecordRepository::new(self.db.pool())
            .revoke(record.id, Utc::now())
            .await?;

        if changed {
            info!(file_id, owner_id, "share revoked");
            Ok(RevokeOutcome::Revoked)
        } else {
            debug!(file_id, owner_id, "share already revoked");
            Ok(RevokeOutcome::AlreadyRevoked)
        }
    }

    /// Get the public metadata of a share.
    ///
    /// Exhausted and password-protected shares still report their metadata.
    pub async fn get_share_info(&self, token: &str) -> Result<ShareInfo> {
        let record = self.read_by_token(token).await?;

        match evaluate(record.as_ref(), None, Utc::now()) {
            AccessDecision::Deny(
                reason @ (DenyReason::NotFound | DenyReason::Revoked | DenyReason::Expired),
            ) => Err(reason.into()),
            _ => record
                .map(|r| r.share_info())
                .ok_or(SharegateError::Denied(DenyReason::NotFound)),
        }
    }

    /// Download a file through its share link.
    pub async fn download_via_share(
        &self,
        token: &str,
        password: Option<&str>,
    ) -> Result<ShareDownload> {
        let record = self.read_by_token(token).await?;

        if let AccessDecision::Deny(reason) = evaluate(record.as_ref(), password, Utc::now()) {
            info!(
                token = %redact_token(token),
                reason = reason.as_str(),
                "share download denied"
            );
            return Err(reason.into());
        }
        let Some(mut record) = record else {
            return Err(DenyReason::NotFound.into());
        };

        let admission = DownloadCounter::new(self.db.pool())
            .try_admit(record.id, Utc::now())
            .await?;

        let download_count = match admission {
            Admission::Admitted { download_count } => download_count,
            Admission::Rejected => {
                let reason = self.rejection_reason(token).await;
                info!(
                    file_id = record.id,
                    reason = reason.as_str(),
                    "share download rejected at admission"
                );
                return Err(reason.into());
            }
        };
        record.download_count = download_count;

        let content = self.load_verified(&record).await?;
        info!(
            file_id = record.id,
            download_count,
            "share download served"
        );
        Ok(ShareDownload { record, content })
    }

    /// Download a file as its owner.
    ///
    /// Ignores the download limit and password and does not count.
    pub async fn download_owned_file(&self, owner_id: &str, file_id: i64) -> Result<ShareDownload> {
        let record = self.get_owned_file(owner_id, file_id).await?;
        let content = self.load_verified(&record).await?;
        Ok(ShareDownload { record, content })
    }

    /// Run one sweeper pass now.
    pub async fn sweep_now(&self) -> SweepReport {
        self.sweeper.sweep_once(Utc::now()).await
    }

    /// Read a record by token, retrying once on a database error.
    async fn read_by_token(&self, token: &str) -> Result<Option<FileRecord>> {
        let repo = FileRecordRepository::new(self.db.pool());
        match repo.get_by_token(token).await {
            Err(SharegateError::Database(e)) => {
                warn!("Share lookup failed, retrying: {}", e);
                repo.get_by_token(token).await
            }
            other => other,
        }
    }

    /// Work out why admission rejected a request that passed evaluation.
    async fn rejection_reason(&self, token: &str) -> DenyReason {
        let record = match self.read_by_token(token).await {
            Ok(record) => record,
            Err(_) => return DenyReason::LimitReached,
        };
        // The password was already verified; skip it here.
        match evaluate(record.as_ref(), None, Utc::now()) {
            AccessDecision::Deny(
                reason @ (DenyReason::NotFound
                | DenyReason::Revoked
                | DenyReason::Expired
                | DenyReason::LimitReached),
            ) => reason,
            _ => DenyReason::LimitReached,
        }
    }

    /// Load a record's blob and check it against the stored checksum.
    async fn load_verified(&self, record: &FileRecord) -> Result<Vec<u8>> {
        let content = match self.storage.load(&record.blob_ref).await {
            Ok(content) => content,
            Err(SharegateError::NotFound(_)) => {
                error!(file_id = record.id, "blob missing for active share");
                return Err(SharegateError::StorageCorruption(format!(
                    "blob missing for file {}",
                    record.id
                )));
            }
            Err(e) => return Err(e),
        };

        if checksum(&content) != record.checksum {
            error!(file_id = record.id, "blob checksum mismatch");
            return Err(SharegateError::StorageCorruption(format!(
                "checksum mismatch for file {}",
                record.id
            )));
        }

        Ok(content)
    }
}

impl std::fmt::Debug for ShareService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShareService")
            .field("limits", &self.limits)
            .finish_non_exhaustive()
    }
}
