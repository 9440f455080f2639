//! Share links for uploaded files.
//!
//! A share link is a random token bound to a [`FileRecord`]. Each link may
//! expire, require a password, and cap the number of downloads:
//! - [`token`]: token issuance
//! - [`access`]: access evaluation
//! - [`counter`]: atomic download admission
//! - [`sweeper`]: background retirement of dead links
//! - [`service`]: the operations exposed to the web layer

pub mod access;
pub mod counter;
pub mod password;
pub mod record;
pub mod repository;
pub mod service;
pub mod sweeper;
pub mod token;

pub use access::{evaluate, AccessDecision, DenyReason};
pub use counter::{Admission, DownloadCounter};
pub use password::{
    hash_share_password, validate_share_password, verify_share_password, PasswordError,
    MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH,
};
pub use record::{FileRecord, InactiveReason, NewFileRecord, ShareInfo};
pub use repository::FileRecordRepository;
pub use service::{
    sanitize_filename, CreateShareRequest, RevokeOutcome, ShareDownload, ShareLimits,
    ShareService,
};
pub use sweeper::{start_sweeper, LifecycleSweeper, SweepReport};
pub use token::{RandomTokenGenerator, TokenGenerator, TokenIssuer, MAX_TOKEN_ATTEMPTS};
