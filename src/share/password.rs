//! Share link password hashing.
//!
//! Passwords are hashed with Argon2id and stored as PHC strings carrying the
//! salt and parameters. Verification goes through `password-hash`, which
//! compares the derived output in constant time.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Algorithm, Argon2, Params, Version,
};
use rand_core::OsRng;
use thiserror::Error;

/// Minimum share password length (characters).
pub const MIN_PASSWORD_LENGTH: usize = 1;

/// Maximum share password length (characters).
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Argon2 memory cost in KiB.
const M_COST: u32 = 19456;
/// Argon2 iterations.
const T_COST: u32 = 2;
/// Argon2 lanes.
const P_COST: u32 = 1;

/// Password-related errors.
#[derive(Error, Debug)]
pub enum PasswordError {
    /// Password is empty.
    #[error("password must be at least {MIN_PASSWORD_LENGTH} character")]
    TooShort,

    /// Password is too long.
    #[error("password must be at most {MAX_PASSWORD_LENGTH} characters")]
    TooLong,

    /// Password contains control characters.
    #[error("password must not contain control characters")]
    ControlCharacters,

    /// Hashing failed.
    #[error("password hashing failed: {0}")]
    HashError(String),

    /// Stored hash could not be parsed.
    #[error("invalid password hash format")]
    InvalidHash,
}

fn hasher() -> Result<Argon2<'static>, PasswordError> {
    let params = Params::new(M_COST, T_COST, P_COST, None)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

/// Check share password length limits and character set.
///
/// Control characters are refused so that any accepted password can also be
/// sent in a JSON download request.
pub fn validate_share_password(password: &str) -> Result<(), PasswordError> {
    let len = password.chars().count();
    if len < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort);
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::TooLong);
    }
    if password.chars().any(|c| c.is_control()) {
        return Err(PasswordError::ControlCharacters);
    }
    Ok(())
}

/// Hash a share password with a fresh random salt.
///
/// # Examples
///
/// ```
/// use sharegate::share::hash_share_password;
///
/// let hash = hash_share_password("abc123").unwrap();
/// assert!(hash.starts_with("$argon2id$"));
/// ```
pub fn hash_share_password(password: &str) -> Result<String, PasswordError> {
    validate_share_password(password)?;

    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher()?
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| PasswordError::HashError(e.to_string()))?;

    Ok(hash.to_string())
}

/// Verify a supplied password against a stored PHC hash.
///
/// Returns `Ok(false)` on mismatch; only a malformed stored hash is an error.
pub fn verify_share_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHash)?;

    // Parameters come from the parsed hash.
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::HashError(e.to_string())),
    }
}
