//! Rate limiting utilities

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified messages per second
pub fn create_limiter(per_second: u32, burst: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN))
        .allow_burst(NonZeroU32::new(burst).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Create a limiter that admits one event per `period`
pub fn create_cooldown(period: Duration) -> Arc<Limiter> {
    let quota = Quota::with_period(period.max(Duration::from_millis(1)))
        .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// State sync rate for one connection (the peer sends at ~30 Hz)
pub const STATE_SYNC_RATE_LIMIT: u32 = 30;

/// Extra headroom for bursty Wi-Fi delivery
pub const STATE_SYNC_BURST: u32 = 45;

/// Per-connection rate limiter state
#[derive(Clone)]
pub struct ConnectionRateLimiter {
    sync_limiter: Arc<Limiter>,
    forge_limiter: Arc<Limiter>,
}

impl ConnectionRateLimiter {
    pub fn new(forge_cooldown: Duration) -> Self {
        Self {
            sync_limiter: create_limiter(STATE_SYNC_RATE_LIMIT, STATE_SYNC_BURST),
            forge_limiter: create_cooldown(forge_cooldown),
        }
    }

    /// Check if a state update is allowed (returns true if allowed)
    pub fn check_sync(&self) -> bool {
        self.sync_limiter.check().is_ok()
    }

    /// Check if a forge request is allowed (returns true if allowed)
    pub fn check_forge(&self) -> bool {
        self.forge_limiter.check().is_ok()
    }
}
