use dashmap::DashMap;
use std::time::{Duration, Instant};

/// Per-route request rate guard: at most `rate` requests per `per` window,
/// counted per client key (IP).
///
/// Uses a fixed window per key backed by an internally synchronized map, so
/// concurrent requests need no external locking. Each compiled route owns
/// its own limiter instance.
pub struct RateLimiter {
    rate: u64,
    per: Duration,
    windows: DashMap<String, Window>,
}

struct Window {
    started: Instant,
    count: u64,
}

impl RateLimiter {
    #[must_use]
    pub fn new(rate: u64, per: Duration) -> Self {
        RateLimiter {
            rate,
            per,
            windows: DashMap::new(),
        }
    }

    /// Record one request for `key` and report whether it is within the
    /// configured rate.
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut window = self.windows.entry(key.to_string()).or_insert(Window {
            started: now,
            count: 0,
        });
        if now.duration_since(window.started) >= self.per {
            window.started = now;
            window.count = 0;
        }
        if window.count >= self.rate {
            false
        } else {
            window.count += 1;
            true
        }
    }
}
