use std::future::Future;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

struct Entry<T> {
    value: T,
    stored_at: Instant,
}

/// Time-boxed single-value cache.
///
/// Owns {value, timestamp, ttl}; the refresh function is passed in by the
/// caller. A refresh that yields nothing keeps the previous value, so a
/// failing upstream degrades to stale data instead of an empty cache. The
/// slot lock is held across the refresh, which also single-flights
/// concurrent refreshes.
pub struct TtlCache<T> {
    slot: Mutex<Option<Entry<T>>>,
    ttl: Duration,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            slot: Mutex::new(None),
            ttl,
        }
    }

    /// Return the cached value if fresh, otherwise run `refresh` and store
    /// its result. Returns None only when the cache is empty and the
    /// refresh produced nothing.
    pub async fn get_or_refresh<F, Fut>(&self, refresh: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Option<T>>,
    {
        let mut slot = self.slot.lock().await;
        if let Some(entry) = slot.as_ref() {
            if entry.stored_at.elapsed() < self.ttl {
                return Some(entry.value.clone());
            }
        }

        match refresh().await {
            Some(value) => {
                *slot = Some(Entry {
                    value: value.clone(),
                    stored_at: Instant::now(),
                });
                Some(value)
            }
            None => slot.as_ref().map(|e| e.value.clone()),
        }
    }

    /// Store a value produced outside the cache (e.g. by the scheduled
    /// fetch), resetting the TTL clock.
    pub async fn put(&self, value: T) {
        let mut slot = self.slot.lock().await;
        *slot = Some(Entry {
            value,
            stored_at: Instant::now(),
        });
    }
}
