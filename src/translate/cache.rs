//! L1 in-memory LRU translation cache with per-entry TTL.
//! Keyed by the string cache key (see `key.rs`). Expired entries are dropped on read.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;

use super::store::{CacheBackend, CacheResult};

struct CacheEntry {
    translated_text: String,
    /// `None` when the TTL reaches past what `Instant` can represent.
    expires_at: Option<Instant>,
}

pub struct MemoryCache {
    inner: Mutex<LruCache<String, CacheEntry>>,
}

impl MemoryCache {
    /// A zero capacity is bumped to one entry.
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Look up a cached translation. Returns None if absent or expired.
    pub fn get(&self, key: &str) -> Option<String> {
        let mut cache = self.inner.lock();
        if let Some(entry) = cache.get(key) {
            let live = match entry.expires_at {
                Some(at) => at > Instant::now(),
                None => true,
            };
            if live {
                return Some(entry.translated_text.clone());
            }
            // Expired — remove it
            cache.pop(key);
        }
        None
    }

    /// Insert a translation result into the cache.
    pub fn insert(&self, key: String, translated_text: String, ttl: Duration) {
        let mut cache = self.inner.lock();
        cache.put(
            key,
            CacheEntry {
                translated_text,
                expires_at: Instant::now().checked_add(ttl),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CacheBackend for MemoryCache {
    async fn get_many(&self, keys: &[String]) -> CacheResult<Vec<Option<String>>> {
        Ok(keys.iter().map(|k| self.get(k)).collect())
    }

    async fn set_many(&self, entries: &[(String, String)], ttl: Duration) -> CacheResult<usize> {
        for (key, value) in entries {
            self.insert(key.clone(), value.clone(), ttl);
        }
        Ok(entries.len())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_then_get() {
        let cache = MemoryCache::new(4);
        cache.insert("k".into(), "v".into(), Duration::from_secs(60));
        assert_eq!(cache.get("k").as_deref(), Some("v"));
        assert!(cache.get("missing").is_none());
    }

    #[test]
    fn expired_entries_are_dropped() {
        let cache = MemoryCache::new(4);
        cache.insert("k".into(), "v".into(), Duration::from_millis(0));
        assert!(cache.get("k").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn oversized_ttl_never_expires() {
        let cache = MemoryCache::new(4);
        cache.insert("k".into(), "v".into(), Duration::from_secs(u64::MAX));
        assert_eq!(cache.get("k").as_deref(), Some("v"));
    }

    #[test]
    fn least_recently_used_is_evicted() {
        let cache = MemoryCache::new(2);
        let ttl = Duration::from_secs(60);
        cache.insert("a".into(), "1".into(), ttl);
        cache.insert("b".into(), "2".into(), ttl);
        assert!(cache.get("a").is_some());
        cache.insert("c".into(), "3".into(), ttl);
        assert!(cache.get("b").is_none());
        assert!(cache.get("a").is_some());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn zero_capacity_still_holds_one_entry() {
        let cache = MemoryCache::new(0);
        cache.insert("a".into(), "1".into(), Duration::from_secs(60));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn batch_get_preserves_key_order() {
        let cache = MemoryCache::new(8);
        let entries = vec![("a".to_string(), "1".to_string()), ("c".to_string(), "3".to_string())];
        assert_eq!(cache.set_many(&entries, Duration::from_secs(60)).await.unwrap(), 2);
        let got = cache
            .get_many(&["c".to_string(), "b".to_string(), "a".to_string()])
            .await
            .unwrap();
        assert_eq!(got, vec![Some("3".to_string()), None, Some("1".to_string())]);
    }
}
