//! LRU cache for query embeddings.
//!
//! Repeated search queries skip re-embedding. Entries expire after a TTL
//! so a long-lived server does not pin stale vectors forever.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ndarray::Array1;
use parking_lot::Mutex;

struct CacheEntry {
    embedding: Array1<f32>,
    inserted_at: Instant,
}

/// Thread-safe LRU + TTL cache keyed by query text.
pub struct EmbedCache {
    inner: Mutex<CacheInner>,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    order: VecDeque<String>,
    max_size: usize,
    ttl: Duration,
}

impl EmbedCache {
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        Self {
            inner: Mutex::new(CacheInner {
                entries: HashMap::with_capacity(max_size),
                order: VecDeque::with_capacity(max_size),
                max_size,
                ttl,
            }),
        }
    }

    /// Default sizing: 1000 entries, 1-hour TTL.
    pub fn default_cache() -> Self {
        Self::new(1000, Duration::from_secs(3600))
    }

    /// Look up a cached embedding. Misses and expired entries return None.
    pub fn get(&self, query: &str) -> Option<Array1<f32>> {
        let mut inner = self.inner.lock();

        // Resolve the lookup before touching the recency order so the
        // entry borrow does not overlap the mutations below.
        let fresh = match inner.entries.get(query) {
            Some(entry) if entry.inserted_at.elapsed() < inner.ttl => {
                Some(entry.embedding.clone())
            }
            Some(_) => None,
            None => return None,
        };

        match fresh {
            Some(embedding) => {
                // Refresh recency.
                if let Some(pos) = inner.order.iter().position(|k| k == query) {
                    inner.order.remove(pos);
                    inner.order.push_back(query.to_string());
                }
                Some(embedding)
            }
            None => {
                inner.entries.remove(query);
                if let Some(pos) = inner.order.iter().position(|k| k == query) {
                    inner.order.remove(pos);
                }
                None
            }
        }
    }

    pub fn put(&self, query: String, embedding: Array1<f32>) {
        let mut inner = self.inner.lock();

        while inner.entries.len() >= inner.max_size {
            match inner.order.pop_front() {
                Some(oldest) => {
                    inner.entries.remove(&oldest);
                }
                None => break,
            }
        }

        if let Some(pos) = inner.order.iter().position(|k| *k == query) {
            inner.order.remove(pos);
        }
        inner.order.push_back(query.clone());
        inner.entries.insert(
            query,
            CacheEntry {
                embedding,
                inserted_at: Instant::now(),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vec_of(v: f32) -> Array1<f32> {
        Array1::from_vec(vec![v, v])
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = EmbedCache::new(4, Duration::from_secs(60));
        cache.put("anaphase".into(), vec_of(1.0));
        assert_eq!(cache.get("anaphase"), Some(vec_of(1.0)));
        assert_eq!(cache.get("prophase"), None);
    }

    #[test]
    fn test_lru_eviction() {
        let cache = EmbedCache::new(2, Duration::from_secs(60));
        cache.put("a".into(), vec_of(1.0));
        cache.put("b".into(), vec_of(2.0));
        // Touch "a" so "b" is the eviction candidate.
        cache.get("a");
        cache.put("c".into(), vec_of(3.0));
        assert!(cache.get("a").is_some());
        assert!(cache.get("b").is_none());
        assert!(cache.get("c").is_some());
    }

    #[test]
    fn test_ttl_expiry() {
        let cache = EmbedCache::new(4, Duration::from_millis(0));
        cache.put("a".into(), vec_of(1.0));
        std::thread::sleep(Duration::from_millis(2));
        assert!(cache.get("a").is_none());
        assert!(cache.is_empty());
    }
}
