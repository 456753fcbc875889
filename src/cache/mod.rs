//! Response caching for repeated reads.
//!
//! The pipeline consults a [`ResponseCache`] before doing any work and
//! stores successful GET responses after the status check. Keys combine the
//! HTTP method and the full request address, so the same address fetched
//! with different methods never collides.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::Method;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::pipeline::HttpResponse;

/// Cache key for a request: method and address.
pub fn cache_key(method: &Method, url: &str) -> String {
    format!("{method} {url}")
}

/// Store for buffered response snapshots.
///
/// Implementations return snapshots by value; the pipeline decodes a stored
/// response exactly as it would a fresh one.
pub trait ResponseCache: Send + Sync {
    fn get(&self, key: &str) -> Option<HttpResponse>;
    fn set(&self, key: &str, response: HttpResponse);
}

struct Entry {
    response: HttpResponse,
    stored_at: Instant,
}

/// In-memory [`ResponseCache`] with an optional time-to-live.
///
/// Without a TTL entries live until replaced or [`clear`](MemoryCache::clear)
/// is called. Expired entries are evicted lazily on read.
pub struct MemoryCache {
    entries: Mutex<HashMap<String, Entry>>,
    ttl: Option<Duration>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: None,
        }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Some(ttl),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
        debug!("response cache cleared");
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ResponseCache for MemoryCache {
    fn get(&self, key: &str) -> Option<HttpResponse> {
        let mut entries = self.lock();
        let expired = match (&self.ttl, entries.get(key)) {
            (Some(ttl), Some(entry)) => entry.stored_at.elapsed() >= *ttl,
            _ => false,
        };
        if expired {
            entries.remove(key);
            trace!(key = %key, "evicted expired cache entry");
            return None;
        }
        entries.get(key).map(|entry| entry.response.clone())
    }

    fn set(&self, key: &str, response: HttpResponse) {
        debug!(key = %key, status = %response.status, "caching response");
        self.lock().insert(
            key.to_string(),
            Entry {
                response,
                stored_at: Instant::now(),
            },
        );
    }
}
