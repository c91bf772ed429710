use dashmap::DashMap;
use std::time::{Duration, Instant};

/// A fully materialized response ready to be replayed from cache.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: u16,
    pub content_type: String,
    /// Content-Disposition value for file responses.
    pub disposition: Option<String>,
    pub body: Vec<u8>,
}

struct Entry {
    stored: Instant,
    response: CachedResponse,
}

/// Per-route full-response cache with a fixed time-to-live, keyed by the
/// request target (method + path + query).
///
/// Backed by an internally synchronized map; concurrent readers and writers
/// need no external locking. Expired entries are dropped lazily on lookup.
pub struct ResponseCache {
    ttl: Duration,
    entries: DashMap<String, Entry>,
}

impl ResponseCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        ResponseCache {
            ttl,
            entries: DashMap::new(),
        }
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<CachedResponse> {
        let expired = match self.entries.get(key) {
            Some(entry) => {
                if entry.stored.elapsed() < self.ttl {
                    return Some(entry.response.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    pub fn put(&self, key: &str, response: CachedResponse) {
        self.entries.insert(
            key.to_string(),
            Entry {
                stored: Instant::now(),
                response,
            },
        );
    }
}
