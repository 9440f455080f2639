//! Database schema and migrations for sharegate.
//!
//! Migrations are applied in order when the database is opened. The
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: Share records
    r#"
-- One row per shared file. Rows are never deleted: after blob reclamation
-- the row stays behind as a tombstone.
CREATE TABLE share_files (
    id                  INTEGER PRIMARY KEY AUTOINCREMENT,
    owner_id            TEXT NOT NULL,
    blob_ref            TEXT NOT NULL UNIQUE,
    original_name       TEXT NOT NULL,
    size                INTEGER NOT NULL CHECK (size >= 0),
    content_type        TEXT NOT NULL,
    checksum            TEXT NOT NULL,
    uploaded_at         INTEGER NOT NULL,           -- unix millis
    expires_at          INTEGER NOT NULL,           -- unix millis
    share_token         TEXT NOT NULL UNIQUE,
    password_hash       TEXT,                       -- Argon2 PHC string
    download_limit      INTEGER CHECK (download_limit IS NULL OR download_limit > 0),
    download_count      INTEGER NOT NULL DEFAULT 0,
    is_active           INTEGER NOT NULL DEFAULT 1,
    CHECK (expires_at >= uploaded_at),
    CHECK (download_count >= 0),
    CHECK (download_limit IS NULL OR download_count <= download_limit)
);

CREATE INDEX idx_share_files_owner ON share_files(owner_id, uploaded_at);
CREATE INDEX idx_share_files_active_expiry ON share_files(is_active, expires_at);
"#,
    // v2: Deactivation audit trail and blob reclamation tombstones
    r#"
ALTER TABLE share_files ADD COLUMN inactive_reason TEXT;      -- 'revoked', 'expired', 'exhausted'
ALTER TABLE share_files ADD COLUMN deactivated_at INTEGER;    -- unix millis
ALTER TABLE share_files ADD COLUMN blob_reclaimed_at INTEGER; -- unix millis

CREATE INDEX idx_share_files_reclaim ON share_files(is_active, blob_reclaimed_at);
"#,
];
