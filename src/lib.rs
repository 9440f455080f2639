//! sharegate - expiring share links for uploaded files
//!
//! Issues time-boxed, optionally password-protected, optionally
//! download-capped links for uploaded files and enforces those constraints
//! under concurrent access.

pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod share;
pub mod storage;
pub mod web;

pub use config::Config;
pub use db::Database;
pub use error::{Result, SharegateError};
pub use share::{
    evaluate, AccessDecision, CreateShareRequest, DenyReason, FileRecord, RevokeOutcome,
    ShareDownload, ShareInfo, ShareService, SweepReport,
};
pub use storage::FileStorage;
pub use web::WebServer;
