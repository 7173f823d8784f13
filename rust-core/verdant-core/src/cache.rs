//! # Response Cache
//!
//! Memoizes finished responses by exact `(method, path)`. A hit is replayed
//! without routing or running any handler.
//!
//! The query string is not part of the key: once `/search?q=a` is cached,
//! `/search?q=b` replays the same response until the entry is swept. Routes
//! whose output depends on the query should not be served behind the cache.
//!
//! Entries are dropped by a periodic sweep:
//!
//! - no item limit configured: every sweep clears the whole cache
//! - item limit reached: the whole cache is cleared
//! - otherwise: entries older than the reset duration are removed
//!
//! The sweep interval is never shorter than [`MIN_TICK`].

use crate::response::Response;
use crate::router::Method;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::debug;

/// Lower bound for the sweep interval
pub const MIN_TICK: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
struct CacheEntry {
    response: Response,
    inserted_at: Instant,
}

/// Cache of rendered responses keyed by method and path
///
/// The path excludes the query string; see the module docs.
#[derive(Debug)]
pub struct ResponseCache {
    items: Mutex<HashMap<Method, HashMap<String, CacheEntry>>>,
    max_items: Option<usize>,
    reset_duration: Duration,
}

impl ResponseCache {
    /// Create a cache
    ///
    /// `max_items` of `None` means unbounded, with every sweep clearing all
    /// entries.
    #[must_use]
    pub fn new(max_items: Option<usize>, reset_duration: Duration) -> Self {
        Self {
            items: Mutex::new(HashMap::new()),
            max_items,
            reset_duration,
        }
    }

    /// Stored response for `(method, path)`
    #[must_use]
    pub fn get(&self, method: Method, path: &str) -> Option<Response> {
        self.items
            .lock()
            .get(&method)
            .and_then(|bucket| bucket.get(path))
            .map(|entry| entry.response.clone())
    }

    /// Store a response, replacing any previous entry
    ///
    /// Skipped when the cache is full; the next sweep makes room.
    pub fn insert(&self, method: Method, path: &str, response: Response) {
        let mut items = self.items.lock();
        if let Some(max) = self.max_items {
            let len: usize = items.values().map(HashMap::len).sum();
            let replacing = items.get(&method).is_some_and(|b| b.contains_key(path));
            if len >= max && !replacing {
                debug!(%method, path, max, "Response cache full, skipping insert");
                return;
            }
        }
        items.entry(method).or_default().insert(
            path.to_string(),
            CacheEntry {
                response,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Run one eviction pass now
    pub fn sweep(&self) {
        self.sweep_at(Instant::now());
    }

    /// Run one eviction pass as if the current time were `now`
    pub fn sweep_at(&self, now: Instant) {
        let mut items = self.items.lock();
        let len: usize = items.values().map(HashMap::len).sum();

        match self.max_items {
            Some(max) if len < max => {
                let reset = self.reset_duration;
                for bucket in items.values_mut() {
                    bucket.retain(|_, entry| now.saturating_duration_since(entry.inserted_at) < reset);
                }
                items.retain(|_, bucket| !bucket.is_empty());
            }
            _ => items.clear(),
        }

        let remaining: usize = items.values().map(HashMap::len).sum();
        debug!(before = len, after = remaining, "Response cache swept");
    }

    /// Number of cached responses
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.lock().values().map(HashMap::len).sum()
    }

    /// Whether the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.items.lock().clear();
    }

    /// Sweep interval: the reset duration, at least [`MIN_TICK`]
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        self.reset_duration.max(MIN_TICK)
    }

    /// Start the periodic sweep on the current Tokio runtime
    pub fn spawn_ticker(self: Arc<Self>) -> JoinHandle<()> {
        let period = self.tick_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            // the first tick completes immediately
            interval.tick().await;
            loop {
                interval.tick().await;
                self.sweep();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ok(body: &str) -> Response {
        Response::text(body)
    }

    #[test]
    fn test_get_exact_key() {
        let cache = ResponseCache::new(Some(10), Duration::from_secs(60));
        cache.insert(Method::Get, "/a", ok("a"));

        assert_eq!(cache.get(Method::Get, "/a"), Some(ok("a")));
        assert!(cache.get(Method::Post, "/a").is_none());
        assert!(cache.get(Method::Get, "/a/").is_none());
    }

    #[test]
    fn test_insert_skipped_when_full() {
        let cache = ResponseCache::new(Some(1), Duration::from_secs(60));
        cache.insert(Method::Get, "/a", ok("a"));
        cache.insert(Method::Get, "/b", ok("b"));
        assert_eq!(cache.len(), 1);

        cache.insert(Method::Get, "/a", ok("a2"));
        assert_eq!(cache.get(Method::Get, "/a"), Some(ok("a2")));
    }

    #[test]
    fn test_sweep_without_limit_clears_all() {
        let cache = ResponseCache::new(None, Duration::from_secs(3600));
        cache.insert(Method::Get, "/a", ok("a"));
        cache.sweep();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_at_limit_clears_all() {
        let cache = ResponseCache::new(Some(2), Duration::from_secs(3600));
        cache.insert(Method::Get, "/a", ok("a"));
        cache.insert(Method::Post, "/a", ok("a"));
        cache.sweep();
        assert!(cache.is_empty());
    }

    #[test]
    fn test_sweep_removes_expired_only() {
        let cache = ResponseCache::new(Some(100), Duration::from_secs(60));
        cache.insert(Method::Get, "/a", ok("a"));

        cache.sweep();
        assert_eq!(cache.len(), 1);

        cache.sweep_at(Instant::now() + Duration::from_secs(61));
        assert!(cache.is_empty());
    }

    #[test]
    fn test_tick_interval_minimum() {
        let short = ResponseCache::new(None, Duration::from_secs(1));
        assert_eq!(short.tick_interval(), MIN_TICK);

        let long = ResponseCache::new(None, Duration::from_secs(120));
        assert_eq!(long.tick_interval(), Duration::from_secs(120));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_sweeps() {
        let cache = Arc::new(ResponseCache::new(None, Duration::from_secs(30)));
        cache.insert(Method::Get, "/a", ok("a"));
        let ticker = cache.clone().spawn_ticker();

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert!(cache.is_empty());
        ticker.abort();
    }
}
