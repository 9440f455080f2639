//! Access control for share links.
//!
//! [`evaluate`] decides whether a share download may proceed. It checks, in
//! order: existence, revocation, expiry, download limit, password. The first
//! failing check decides the outcome, so a caller never learns more than the
//! earliest reason. Evaluation never mutates state; an `Allow` must still pass
//! the download counter before any bytes are released.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::password::verify_share_password;
use super::record::FileRecord;

/// Reason a share request was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    /// No record for the token.
    NotFound,
    /// The owner revoked the share.
    Revoked,
    /// The share has expired.
    Expired,
    /// The download limit was reached.
    LimitReached,
    /// A password is required but none was given.
    PasswordRequired,
    /// The given password does not match.
    PasswordIncorrect,
}

impl DenyReason {
    /// External error code.
    ///
    /// Revoked shares report the same code as unknown tokens.
    pub fn public_code(&self) -> &'static str {
        match self {
            DenyReason::NotFound | DenyReason::Revoked => "NOT_FOUND",
            DenyReason::Expired => "EXPIRED",
            DenyReason::LimitReached => "LIMIT_REACHED",
            DenyReason::PasswordRequired => "PASSWORD_REQUIRED",
            DenyReason::PasswordIncorrect => "PASSWORD_INCORRECT",
        }
    }

    /// Whether this reason is reported as "not found" to callers.
    pub fn is_existence_hiding(&self) -> bool {
        matches!(self, DenyReason::NotFound | DenyReason::Revoked)
    }

    /// Internal label used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::NotFound => "not_found",
            DenyReason::Revoked => "revoked",
            DenyReason::Expired => "expired",
            DenyReason::LimitReached => "limit_reached",
            DenyReason::PasswordRequired => "password_required",
            DenyReason::PasswordIncorrect => "password_incorrect",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            DenyReason::NotFound => "share not found",
            DenyReason::Revoked => "share revoked",
            DenyReason::Expired => "share expired",
            DenyReason::LimitReached => "download limit reached",
            DenyReason::PasswordRequired => "password required",
            DenyReason::PasswordIncorrect => "password incorrect",
        };
        f.write_str(msg)
    }
}

/// Outcome of access evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessDecision {
    /// The request may proceed to admission.
    Allow,
    /// The request is denied.
    Deny(DenyReason),
}

impl AccessDecision {
    /// Check if access is allowed.
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allow)
    }

    /// Convert into a `Result`, mapping denial to its reason.
    pub fn into_result(self) -> Result<(), DenyReason> {
        match self {
            AccessDecision::Allow => Ok(()),
            AccessDecision::Deny(reason) => Err(reason),
        }
    }
}

/// Evaluate a share request against a record.
pub fn evaluate(
    record: Option<&FileRecord>,
    supplied_password: Option<&str>,
    now: DateTime<Utc>,
) -> AccessDecision {
    let record = match record {
        Some(record) => record,
        None => return AccessDecision::Deny(DenyReason::NotFound),
    };

    if !record.is_active && record.is_revoked() {
        return AccessDecision::Deny(DenyReason::Revoked);
    }

    if record.is_expired(now) {
        return AccessDecision::Deny(DenyReason::Expired);
    }

    if record.limit_reached() {
        return AccessDecision::Deny(DenyReason::LimitReached);
    }

    // Retired for a reason the live checks no longer see.
    if !record.is_active {
        return AccessDecision::Deny(DenyReason::Revoked);
    }

    if let Some(hash) = record.password_hash.as_deref() {
        let password = match supplied_password {
            Some(p) => p,
            None => return AccessDecision::Deny(DenyReason::PasswordRequired),
        };
        // A malformed stored hash can never be satisfied.
        if !verify_share_password(password, hash).unwrap_or(false) {
            return AccessDecision::Deny(DenyReason::PasswordIncorrect);
        }
    }

    AccessDecision::Allow
}
