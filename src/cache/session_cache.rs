//! Tracker session cache.
//!
//! Maps `(endpoint, principal)` to an authenticated [`SessionHandle`] so that
//! repeated operations under the same identity skip the credential handshake.
//! Keys are not normalized: `https://x.net` and `https://x.net/` are distinct.
//!
//! A stored handle is never liveness-checked. If the credential behind it is
//! revoked upstream, later operations fail with the tracker's error while the
//! handle stays cached.

use tracing::{debug, warn};

use crate::error::Result;
use crate::tracker::{IssueTracker, SessionHandle};

use super::store::{CachePolicy, CacheStats, CacheStore};

/// Process-wide cache of authenticated tracker sessions.
pub struct SessionCache {
    store: CacheStore<SessionHandle>,
}

impl SessionCache {
    pub fn new(policy: CachePolicy) -> Self {
        Self {
            store: CacheStore::new(policy),
        }
    }

    /// Composite key `"{endpoint}:{principal}"`.
    pub fn session_key(endpoint: &str, principal: &str) -> String {
        format!("{endpoint}:{principal}")
    }

    /// Stored handle for `(endpoint, principal)`, if any.
    pub fn get(&self, endpoint: &str, principal: &str) -> Option<SessionHandle> {
        self.store.get(&Self::session_key(endpoint, principal))
    }

    /// Return the stored handle, or connect and store a new one.
    ///
    /// On a hit the tracker is not contacted and `secret` is ignored. On a
    /// failed connect nothing is stored and the error is returned as-is.
    pub async fn get_or_create(
        &self,
        tracker: &dyn IssueTracker,
        endpoint: &str,
        principal: &str,
        secret: &str,
    ) -> Result<SessionHandle> {
        let key = Self::session_key(endpoint, principal);
        if let Some(handle) = self.store.get(&key) {
            debug!(endpoint, principal, "Reusing cached tracker session");
            return Ok(handle);
        }
        debug!(endpoint, principal, "No cached tracker session, connecting");
        self.connect_and_store(tracker, key, endpoint, principal, secret)
            .await
    }

    /// Perform a fresh handshake and overwrite whatever is stored for the key.
    pub async fn authenticate(
        &self,
        tracker: &dyn IssueTracker,
        endpoint: &str,
        principal: &str,
        secret: &str,
    ) -> Result<SessionHandle> {
        let key = Self::session_key(endpoint, principal);
        self.connect_and_store(tracker, key, endpoint, principal, secret)
            .await
    }

    pub fn contains(&self, endpoint: &str, principal: &str) -> bool {
        self.store.contains(&Self::session_key(endpoint, principal))
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.stats()
    }

    async fn connect_and_store(
        &self,
        tracker: &dyn IssueTracker,
        key: String,
        endpoint: &str,
        principal: &str,
        secret: &str,
    ) -> Result<SessionHandle> {
        match tracker.connect(endpoint, principal, secret).await {
            Ok(handle) => {
                self.store.insert(key, handle.clone());
                debug!(endpoint, principal, "Stored tracker session");
                Ok(handle)
            }
            Err(e) => {
                warn!(endpoint, principal, error = %e, "Tracker handshake failed");
                Err(e)
            }
        }
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new(CachePolicy::unbounded())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GatewayError;
    use crate::tracker::{Issue, TrackerSession, UserProfile};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FakeSession {
        profile: UserProfile,
    }

    #[async_trait]
    impl TrackerSession for FakeSession {
        fn profile(&self) -> &UserProfile {
            &self.profile
        }

        async fn issue(&self, key: &str) -> Result<Issue> {
            Ok(Issue {
                key: key.to_string(),
                ..Default::default()
            })
        }

        async fn search_issues(&self, _jql: &str, _max_results: u32) -> Result<Vec<Issue>> {
            Ok(Vec::new())
        }
    }

    /// Accepts only the secret "good"; counts every connect.
    #[derive(Default)]
    struct CountingTracker {
        connects: AtomicUsize,
    }

    #[async_trait]
    impl IssueTracker for CountingTracker {
        async fn connect(
            &self,
            _endpoint: &str,
            principal: &str,
            secret: &str,
        ) -> Result<SessionHandle> {
            self.connects.fetch_add(1, Ordering::SeqCst);
            if secret != "good" {
                return Err(GatewayError::Auth);
            }
            Ok(Arc::new(FakeSession {
                profile: UserProfile {
                    display_name: Some(principal.to_string()),
                    ..Default::default()
                },
            }))
        }
    }

    #[test]
    fn test_session_key_format() {
        assert_eq!(
            SessionCache::session_key("https://x.atlassian.net", "a@b.com"),
            "https://x.atlassian.net:a@b.com"
        );
    }

    #[test]
    fn test_session_key_not_normalized() {
        assert_ne!(
            SessionCache::session_key("https://x.net", "a@b.com"),
            SessionCache::session_key("https://x.net/", "a@b.com")
        );
        assert_ne!(
            SessionCache::session_key("https://x.net", "A@b.com"),
            SessionCache::session_key("https://x.net", "a@b.com")
        );
    }

    #[tokio::test]
    async fn test_get_or_create_connects_once() {
        let cache = SessionCache::default();
        let tracker = CountingTracker::default();

        let first = cache
            .get_or_create(&tracker, "https://x.net", "a@b.com", "good")
            .await
            .unwrap();
        let second = cache
            .get_or_create(&tracker, "https://x.net", "a@b.com", "good")
            .await
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(tracker.connects.load(Ordering::SeqCst), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_get_or_create_stores_one_entry() {
        let cache = Arc::new(SessionCache::default());
        let tracker = Arc::new(CountingTracker::default());

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let cache = Arc::clone(&cache);
            let tracker = Arc::clone(&tracker);
            tasks.push(tokio::spawn(async move {
                cache
                    .get_or_create(tracker.as_ref(), "https://x.net", "a@b.com", "good")
                    .await
            }));
        }
        for task in tasks {
            let handle = task.await.unwrap().unwrap();
            assert_eq!(handle.profile().display_name.as_deref(), Some("a@b.com"));
        }

        // Racing misses may each connect; the last write wins the single slot.
        assert_eq!(cache.len(), 1);
        assert!(tracker.connects.load(Ordering::SeqCst) >= 1);
        let stored = cache.get("https://x.net", "a@b.com").unwrap();
        assert_eq!(stored.profile().display_name.as_deref(), Some("a@b.com"));
    }

    #[tokio::test]
    async fn test_hit_ignores_secret() {
        let cache = SessionCache::default();
        let tracker = CountingTracker::default();
        cache
            .get_or_create(&tracker, "https://x.net", "a@b.com", "good")
            .await
            .unwrap();
        // Stale-credential gap: a cached handle is reused whatever secret is sent.
        let reused = cache
            .get_or_create(&tracker, "https://x.net", "a@b.com", "revoked")
            .await;
        assert!(reused.is_ok());
        assert_eq!(tracker.connects.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_connect_stores_nothing() {
        let cache = SessionCache::default();
        let tracker = CountingTracker::default();
        let result = cache
            .get_or_create(&tracker, "https://x.atlassian.net", "a@b.com", "badtoken")
            .await;
        assert!(matches!(result, Err(GatewayError::Auth)));
        assert!(!cache.contains("https://x.atlassian.net", "a@b.com"));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_distinct_principals_get_distinct_handles() {
        let cache = SessionCache::default();
        let tracker = CountingTracker::default();
        let a = cache
            .get_or_create(&tracker, "https://x.net", "a@b.com", "good")
            .await
            .unwrap();
        let b = cache
            .get_or_create(&tracker, "https://x.net", "c@d.com", "good")
            .await
            .unwrap();
        let other_endpoint = cache
            .get_or_create(&tracker, "https://y.net", "a@b.com", "good")
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert!(!Arc::ptr_eq(&a, &other_endpoint));
        assert_eq!(b.profile().display_name.as_deref(), Some("c@d.com"));
        assert_eq!(tracker.connects.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_authenticate_overwrites_handle() {
        let cache = SessionCache::default();
        let tracker = CountingTracker::default();
        let first = cache
            .authenticate(&tracker, "https://x.net", "a@b.com", "good")
            .await
            .unwrap();
        let second = cache
            .authenticate(&tracker, "https://x.net", "a@b.com", "good")
            .await
            .unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        let stored = cache.get("https://x.net", "a@b.com").unwrap();
        assert!(Arc::ptr_eq(&stored, &second));
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_reauthentication_keeps_prior_handle() {
        let cache = SessionCache::default();
        let tracker = CountingTracker::default();
        let first = cache
            .authenticate(&tracker, "https://x.net", "a@b.com", "good")
            .await
            .unwrap();
        let err = cache
            .authenticate(&tracker, "https://x.net", "a@b.com", "bad")
            .await;
        assert!(err.is_err());
        let stored = cache.get("https://x.net", "a@b.com").unwrap();
        assert!(Arc::ptr_eq(&stored, &first));
    }

    #[tokio::test]
    async fn test_bounded_session_cache_evicts() {
        let cache = SessionCache::new(CachePolicy::bounded(1));
        let tracker = CountingTracker::default();
        cache
            .get_or_create(&tracker, "https://x.net", "a@b.com", "good")
            .await
            .unwrap();
        cache
            .get_or_create(&tracker, "https://x.net", "c@d.com", "good")
            .await
            .unwrap();
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("https://x.net", "c@d.com"));
        assert_eq!(cache.stats().evictions, 1);
    }
}
