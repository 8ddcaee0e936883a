//! Governor-based rate limiting for the login endpoints.
//!
//! Limits are keyed by normalized email address, so one address being
//! hammered does not lock out everyone else.

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use synedrius_common::Error;
use synedrius_db::queries::users::normalize_email;

/// A shared per-key rate limiter.
pub type KeyedLimiter = Arc<DefaultKeyedRateLimiter<String>>;

/// Create a keyed limiter with the given requests-per-minute quota.
pub fn create_limiter(requests_per_minute: u32) -> KeyedLimiter {
    let quota = Quota::per_minute(NonZeroU32::new(requests_per_minute).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::keyed(quota))
}

/// Limiters for `/login/getCode` and `/login/verify`.
#[derive(Clone)]
pub struct LoginLimits {
    pub code_requests: KeyedLimiter,
    pub verify_requests: KeyedLimiter,
}

impl LoginLimits {
    pub fn new(code_requests_per_minute: u32, verify_requests_per_minute: u32) -> Self {
        Self {
            code_requests: create_limiter(code_requests_per_minute),
            verify_requests: create_limiter(verify_requests_per_minute),
        }
    }

    pub fn check_code_request(&self, email: &str) -> Result<(), Error> {
        check(&self.code_requests, email)
    }

    pub fn check_verify(&self, email: &str) -> Result<(), Error> {
        check(&self.verify_requests, email)
    }

    /// Forget keys whose quota has fully replenished.
    pub fn shrink(&self) {
        self.code_requests.retain_recent();
        self.verify_requests.retain_recent();
    }
}

fn check(limiter: &KeyedLimiter, email: &str) -> Result<(), Error> {
    let key = normalize_email(email);
    limiter.check_key(&key).map_err(|_| {
        tracing::warn!(email = %key, "Login rate limit exceeded");
        Error::RateLimited("Too many attempts, try again in a minute".to_string())
    })
}
