//! Share token issuance.
//!
//! Tokens are random bytes from the thread-local CSPRNG encoded as
//! URL-safe base64 without padding. Uniqueness across the store is enforced
//! by the `UNIQUE(share_token)` constraint; callers retry on conflict.

use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::RngCore;

use crate::config::MIN_TOKEN_BYTES;

/// Number of fresh tokens tried before record creation gives up.
pub const MAX_TOKEN_ATTEMPTS: usize = 5;

/// Source of share token candidates.
pub trait TokenGenerator: Send + Sync {
    /// Produce a new token candidate.
    fn generate(&self) -> String;
}

/// Cryptographically random token generator.
#[derive(Debug, Clone)]
pub struct RandomTokenGenerator {
    byte_len: usize,
}

impl RandomTokenGenerator {
    /// Create a generator producing `byte_len` random bytes per token.
    ///
    /// Lengths below 16 bytes are raised to 16.
    pub fn new(byte_len: usize) -> Self {
        Self {
            byte_len: byte_len.max(MIN_TOKEN_BYTES),
        }
    }

    /// Number of random bytes per token.
    pub fn byte_len(&self) -> usize {
        self.byte_len
    }
}

impl Default for RandomTokenGenerator {
    fn default() -> Self {
        Self::new(32)
    }
}

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> String {
        let mut bytes = vec![0u8; self.byte_len];
        rand::rng().fill_bytes(&mut bytes);
        URL_SAFE_NO_PAD.encode(&bytes)
    }
}

/// Mints share tokens for new records.
#[derive(Clone)]
pub struct TokenIssuer {
    generator: Arc<dyn TokenGenerator>,
}

impl TokenIssuer {
    /// Create an issuer backed by [`RandomTokenGenerator`].
    pub fn new(byte_len: usize) -> Self {
        Self::with_generator(Arc::new(RandomTokenGenerator::new(byte_len)))
    }

    /// Create an issuer backed by a custom generator.
    pub fn with_generator(generator: Arc<dyn TokenGenerator>) -> Self {
        Self { generator }
    }

    /// Issue a token candidate.
    pub fn issue(&self) -> String {
        self.generator.generate()
    }
}

impl Default for TokenIssuer {
    fn default() -> Self {
        Self::new(32)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer").finish_non_exhaustive()
    }
}

/// Shorten a token for log output.
pub fn redact_token(token: &str) -> String {
    let prefix: String = token.chars().take(6).collect();
    format!("{prefix}…")
}
