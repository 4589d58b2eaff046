//! Rate limiting for inbound peer traffic

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;

/// Rate limiter type alias
pub type Limiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Create a rate limiter with the specified packets per second
pub fn create_limiter(per_second: u32) -> Arc<Limiter> {
    let quota = Quota::per_second(NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// Max datagrams accepted from the peer per second (two ticks' worth of headroom)
pub const PACKET_RATE_LIMIT: u32 = 120;

/// Rate limiter for the opponent's datagrams
#[derive(Clone)]
pub struct PeerRateLimiter {
    packet_limiter: Arc<Limiter>,
}

impl PeerRateLimiter {
    pub fn new() -> Self {
        Self::with_rate(PACKET_RATE_LIMIT)
    }

    pub fn with_rate(per_second: u32) -> Self {
        Self {
            packet_limiter: create_limiter(per_second),
        }
    }

    /// Check if a datagram is allowed (returns true if allowed)
    pub fn check_packet(&self) -> bool {
        self.packet_limiter.check().is_ok()
    }
}

impl Default for PeerRateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
