//! Concurrency-safe keyed store shared by the session and response caches.
//!
//! The lookup/store contract (`get`, `insert`) is independent of the
//! [`CachePolicy`]. With the default policy the store is an unbounded,
//! never-expiring map that lives as long as the process. Setting
//! `ttl_secs` makes stale entries invisible to `get`; setting `max_entries`
//! turns it into an LRU-bounded store.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Retention policy for a [`CacheStore`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CachePolicy {
    /// Maximum number of live entries. `None` means unbounded.
    pub max_entries: Option<usize>,
    /// Entry lifetime in seconds. `None` means entries never expire.
    pub ttl_secs: Option<u64>,
}

impl CachePolicy {
    /// Unbounded, never-expiring policy.
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// LRU-bounded policy. `max_entries` is clamped to at least 1.
    pub fn bounded(max_entries: usize) -> Self {
        Self {
            max_entries: Some(max_entries.max(1)),
            ttl_secs: None,
        }
    }

    /// Same policy with a time-to-live.
    pub fn with_ttl(mut self, ttl_secs: u64) -> Self {
        self.ttl_secs = Some(ttl_secs);
        self
    }

    fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

/// Aggregate statistics for one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Entries currently stored.
    pub entries: usize,
    /// Lookups that found a live entry.
    pub hits: u64,
    /// Lookups that found nothing (or only an expired entry).
    pub misses: u64,
    /// Entries removed by the policy (expiry or LRU).
    pub evictions: u64,
}

struct Slot<V> {
    value: V,
    created_at: Instant,
    accessed_at: Instant,
}

/// Keyed store with per-operation atomicity.
///
/// A read-then-write sequence across `get` and `insert` is not atomic: two
/// callers may both miss and both insert. The last write wins.
pub struct CacheStore<V> {
    entries: DashMap<String, Slot<V>>,
    policy: CachePolicy,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl<V: Clone> CacheStore<V> {
    pub fn new(policy: CachePolicy) -> Self {
        let policy = CachePolicy {
            max_entries: policy.max_entries.map(|m| m.max(1)),
            ..policy
        };
        Self {
            entries: DashMap::new(),
            policy,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Look up `key`, returning a clone of the stored value.
    ///
    /// An entry past its TTL is removed and reported as absent.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        let expired = match self.entries.get_mut(key) {
            Some(mut slot) => {
                if self.is_expired(&slot, now) {
                    true
                } else {
                    slot.accessed_at = now;
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(slot.value.clone());
                }
            }
            None => false,
        };
        if expired {
            // Re-check under the shard lock so a concurrent fresh insert survives.
            if self
                .entries
                .remove_if(key, |_, slot| self.is_expired(slot, now))
                .is_some()
            {
                debug!(key = %short(key), "Cache entry expired, removing");
                self.evictions.fetch_add(1, Ordering::Relaxed);
            }
        }
        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Look up `key` without touching statistics or recency.
    pub fn peek(&self, key: &str) -> Option<V> {
        let now = Instant::now();
        self.entries
            .get(key)
            .filter(|slot| !self.is_expired(slot, now))
            .map(|slot| slot.value.clone())
    }

    /// Store `value` under `key`, unconditionally replacing any prior entry.
    ///
    /// Inserting a new key into a full bounded store evicts expired entries
    /// first, then least-recently-accessed ones.
    pub fn insert(&self, key: String, value: V) {
        let now = Instant::now();
        if let Some(max) = self.policy.max_entries {
            if !self.entries.contains_key(&key) {
                self.evict_expired(now);
                while self.entries.len() >= max {
                    if !self.evict_lru() {
                        break;
                    }
                }
            }
        }
        self.entries.insert(
            key,
            Slot {
                value,
                created_at: now,
                accessed_at: now,
            },
        );
    }

    pub fn contains(&self, key: &str) -> bool {
        self.peek(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.entries.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
        }
    }

    // -- private helpers ---------------------------------------------------

    fn is_expired(&self, slot: &Slot<V>, now: Instant) -> bool {
        self.policy
            .ttl()
            .is_some_and(|ttl| now.saturating_duration_since(slot.created_at) > ttl)
    }

    fn evict_expired(&self, now: Instant) {
        if self.policy.ttl_secs.is_none() {
            return;
        }
        let before = self.entries.len();
        self.entries.retain(|_, slot| !self.is_expired(slot, now));
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            self.evictions.fetch_add(removed as u64, Ordering::Relaxed);
        }
    }

    fn evict_lru(&self) -> bool {
        let lru_key = self
            .entries
            .iter()
            .min_by_key(|entry| entry.value().accessed_at)
            .map(|entry| entry.key().clone());
        match lru_key {
            Some(key) => {
                debug!(key = %short(&key), "Evicting LRU cache entry");
                if self.entries.remove(&key).is_some() {
                    self.evictions.fetch_add(1, Ordering::Relaxed);
                }
                true
            }
            None => false,
        }
    }
}

/// First 8 characters of a key, for log lines.
pub(crate) fn short(key: &str) -> &str {
    key.char_indices()
        .nth(8)
        .map(|(idx, _)| &key[..idx])
        .unwrap_or(key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backdate(store: &CacheStore<String>, key: &str, by: Duration) {
        let mut slot = store.entries.get_mut(key).unwrap();
        slot.created_at -= by;
        slot.accessed_at -= by;
    }

    #[test]
    fn test_get_absent_key() {
        let store: CacheStore<String> = CacheStore::new(CachePolicy::unbounded());
        assert!(store.get("missing").is_none());
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_insert_then_get() {
        let store = CacheStore::new(CachePolicy::unbounded());
        store.insert("k".into(), "v".to_string());
        assert_eq!(store.get("k"), Some("v".to_string()));
        assert_eq!(store.stats().hits, 1);
    }

    #[test]
    fn test_insert_overwrites() {
        let store = CacheStore::new(CachePolicy::unbounded());
        store.insert("k".into(), "first".to_string());
        store.insert("k".into(), "second".to_string());
        assert_eq!(store.get("k"), Some("second".to_string()));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unbounded_store_keeps_everything() {
        let store = CacheStore::new(CachePolicy::unbounded());
        for i in 0..1000 {
            store.insert(format!("k{i}"), format!("v{i}"));
        }
        assert_eq!(store.len(), 1000);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_ttl_expiry_hides_entry() {
        let store = CacheStore::new(CachePolicy::unbounded().with_ttl(60));
        store.insert("k".into(), "v".to_string());
        backdate(&store, "k", Duration::from_secs(61));
        assert!(store.get("k").is_none());
        assert!(store.is_empty());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_ttl_fresh_entry_survives() {
        let store = CacheStore::new(CachePolicy::unbounded().with_ttl(60));
        store.insert("k".into(), "v".to_string());
        backdate(&store, "k", Duration::from_secs(30));
        assert_eq!(store.get("k"), Some("v".to_string()));
    }

    #[test]
    fn test_lru_eviction_removes_least_recently_accessed() {
        let store = CacheStore::new(CachePolicy::bounded(3));
        for i in 0..3 {
            store.insert(format!("k{i}"), format!("v{i}"));
        }
        // k1 oldest, k0 newest.
        backdate(&store, "k1", Duration::from_secs(30));
        backdate(&store, "k2", Duration::from_secs(20));
        backdate(&store, "k0", Duration::from_secs(10));

        store.insert("k3".into(), "v3".to_string());
        assert_eq!(store.len(), 3);
        assert!(store.peek("k1").is_none(), "k1 should be evicted");
        assert!(store.peek("k0").is_some());
        assert!(store.peek("k3").is_some());
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_lru_hit_refreshes_recency() {
        let store = CacheStore::new(CachePolicy::bounded(2));
        store.insert("a".into(), "1".to_string());
        store.insert("b".into(), "2".to_string());
        backdate(&store, "a", Duration::from_secs(20));
        backdate(&store, "b", Duration::from_secs(10));
        // Touch "a" so "b" becomes the LRU entry.
        assert!(store.get("a").is_some());
        store.insert("c".into(), "3".to_string());
        assert!(store.peek("a").is_some());
        assert!(store.peek("b").is_none());
    }

    #[test]
    fn test_overwrite_in_full_store_does_not_evict() {
        let store = CacheStore::new(CachePolicy::bounded(2));
        store.insert("a".into(), "1".to_string());
        store.insert("b".into(), "2".to_string());
        store.insert("a".into(), "1b".to_string());
        assert_eq!(store.len(), 2);
        assert_eq!(store.stats().evictions, 0);
    }

    #[test]
    fn test_bounded_zero_is_clamped() {
        let store = CacheStore::new(CachePolicy {
            max_entries: Some(0),
            ttl_secs: None,
        });
        store.insert("a".into(), "1".to_string());
        store.insert("b".into(), "2".to_string());
        assert_eq!(store.len(), 1);
        assert_eq!(store.policy().max_entries, Some(1));
    }

    #[test]
    fn test_peek_does_not_count() {
        let store = CacheStore::new(CachePolicy::unbounded());
        store.insert("k".into(), "v".to_string());
        assert!(store.peek("k").is_some());
        assert!(store.peek("x").is_none());
        let stats = store.stats();
        assert_eq!(stats.hits, 0);
        assert_eq!(stats.misses, 0);
    }

    #[test]
    fn test_short_key() {
        assert_eq!(short("0123456789abcdef"), "01234567");
        assert_eq!(short("abc"), "abc");
    }

    #[test]
    fn test_policy_deserialize_partial() {
        let policy: CachePolicy = serde_json::from_str(r#"{"max_entries": 10}"#).unwrap();
        assert_eq!(policy.max_entries, Some(10));
        assert_eq!(policy.ttl_secs, None);
    }

    #[test]
    fn test_concurrent_inserts_are_safe() {
        use std::sync::Arc;
        let store = Arc::new(CacheStore::new(CachePolicy::unbounded()));
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        store.insert(format!("k{}", i % 50), format!("t{t}"));
                        let _ = store.get(&format!("k{i}"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(store.len(), 50);
    }
}
