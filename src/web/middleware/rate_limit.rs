//! Password attempt throttling.
//!
//! Each share token gets its own limiter, so guessing a link's password is
//! slowed down regardless of how many client addresses are used.

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::{num::NonZeroU32, sync::Arc, time::Duration};

/// Rate limiter keyed by share token.
pub type TokenRateLimiter = DefaultKeyedRateLimiter<String>;

/// Interval between limiter cleanups.
const CLEANUP_INTERVAL_SECS: u64 = 300;

/// State for rate limiting.
#[derive(Clone)]
pub struct RateLimitState {
    /// Password attempt limiter, one budget per share token.
    password_limiter: Arc<TokenRateLimiter>,
    /// Password attempts per token per minute.
    password_attempts_per_minute: u32,
}

impl RateLimitState {
    /// Create a new rate limit state.
    pub fn new(password_attempts_per_minute: u32) -> Self {
        let quota = Quota::per_minute(
            NonZeroU32::new(password_attempts_per_minute).unwrap_or(NonZeroU32::MIN),
        );
        Self {
            password_limiter: Arc::new(RateLimiter::keyed(quota)),
            password_attempts_per_minute,
        }
    }

    /// Check if another password attempt is allowed for a share token.
    pub fn check_password_attempt(&self, token: &str) -> bool {
        self.password_limiter
            .check_key(&token.to_string())
            .is_ok()
    }

    /// Number of tracked tokens.
    pub fn tracked(&self) -> usize {
        self.password_limiter.len()
    }

    /// Forget tokens whose budget has fully refilled.
    pub fn cleanup(&self) {
        self.password_limiter.retain_recent();
        self.password_limiter.shrink_to_fit();
    }

    /// Start a background task to periodically clean up old entries.
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(Duration::from_secs(CLEANUP_INTERVAL_SECS)).await;
                self.cleanup();
            }
        });
    }
}
