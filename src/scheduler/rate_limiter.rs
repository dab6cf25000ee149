use governor::{
    clock::QuantaClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::time::Duration;

/// Delivery happens against a single chat, so one unkeyed limiter is enough
pub type UnscopedLimiter = RateLimiter<NotKeyed, InMemoryState, QuantaClock>;

/// Spaces consecutive sends at least `interval` apart. A zero interval disables pacing
pub struct SendPacer(Option<UnscopedLimiter>);

pub fn send_pacer(interval: Duration) -> SendPacer {
    SendPacer(Quota::with_period(interval).map(RateLimiter::direct))
}

/// Waits until the next send is allowed. The first send never waits
pub async fn wait_send_turn(pacer: &SendPacer) {
    if let Some(limiter) = &pacer.0 {
        limiter.until_ready().await;
    }
}
