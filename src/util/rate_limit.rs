//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified requests per second
pub fn create_limiter(requests_per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Outbound directory requests per second (all calls from one client)
pub const DIRECTORY_RATE_LIMIT: u32 = 20;

/// Outbound request budget shared by every clone of a directory client
#[derive(Clone)]
pub struct OutboundLimiter {
    limiter: Arc<Limiter>,
}

impl OutboundLimiter {
    pub fn new(requests_per_second: u32) -> Self {
        Self {
            limiter: create_limiter(requests_per_second),
        }
    }

    /// Check if another request may go out now (returns true if allowed)
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl Default for OutboundLimiter {
    fn default() -> Self {
        Self::new(DIRECTORY_RATE_LIMIT)
    }
}
