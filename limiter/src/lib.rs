use std::time::Duration;

use middleware::ip::IpRateLimiter;

pub mod middleware {
    pub mod ip;
}

/// Allows `max_requests` per client IP within each `window`.
pub fn ip_middleware(max_requests: u32, window: Duration) -> IpRateLimiter {
    IpRateLimiter::new(max_requests, window)
}
