//! Fixed-window rate limiting per (client key, policy name).
//!
//! Buckets live behind a [`BucketStore`] abstraction injected at
//! construction: an in-process concurrent map for single-instance
//! deployments, replaceable by an external atomic-counter service for
//! multi-instance ones. A bucket's read/reset/increment/compare happens
//! under one write-lock acquisition, so a count never exceeds the policy
//! maximum without the offending request being denied.

use async_trait::async_trait;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::RwLock;

use crate::config::RateLimitPolicyConfig;

/// The outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny { retry_after_seconds: u64 },
}

/// Identifies one bucket: which client, under which named policy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BucketKey {
    pub client: String,
    pub policy: String,
}

#[derive(Debug, Clone, Copy)]
struct Bucket {
    window_start: Instant,
    count: u32,
    /// Window length, kept on the bucket so the sweeper can judge staleness
    /// without a policy lookup.
    window: Duration,
}

/// Storage for rate-limit buckets.
///
/// `check` must be atomic per key with respect to concurrent callers.
#[async_trait]
pub trait BucketStore: Send + Sync {
    async fn check(&self, key: BucketKey, policy: RateLimitPolicyConfig) -> Decision;
    /// Drops buckets whose window has fully elapsed. Needed only for the
    /// memory bound, not for correctness.
    async fn sweep(&self);
}

/// In-process bucket store backed by a locked map.
#[derive(Clone, Default)]
pub struct MemoryBucketStore {
    buckets: Arc<RwLock<HashMap<BucketKey, Bucket>>>,
}

impl MemoryBucketStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BucketStore for MemoryBucketStore {
    async fn check(&self, key: BucketKey, policy: RateLimitPolicyConfig) -> Decision {
        let now = Instant::now();
        let window = Duration::from_secs(policy.window_seconds);
        let mut buckets = self.buckets.write().await;

        let bucket = buckets
            .entry(key)
            .or_insert(Bucket { window_start: now, count: 0, window });

        // Lazy reset once the fixed window has elapsed. checked_duration_since
        // keeps the bucket intact if the clock source misbehaves.
        let elapsed = now.checked_duration_since(bucket.window_start).unwrap_or(Duration::ZERO);
        if elapsed >= window {
            bucket.window_start = now;
            bucket.count = 0;
        }

        bucket.count += 1;
        if bucket.count > policy.max_requests {
            let elapsed =
                now.checked_duration_since(bucket.window_start).unwrap_or(Duration::ZERO);
            let retry_after = window.saturating_sub(elapsed);
            return Decision::Deny { retry_after_seconds: retry_after.as_secs().max(1) };
        }
        Decision::Allow
    }

    async fn sweep(&self) {
        let now = Instant::now();
        let mut buckets = self.buckets.write().await;
        buckets.retain(|_, bucket| {
            now.checked_duration_since(bucket.window_start)
                .map(|elapsed| elapsed < bucket.window)
                .unwrap_or(true)
        });
    }
}

/// Named-policy rate limiter used by the orchestrator.
#[derive(Clone)]
pub struct RateLimiter {
    policies: Arc<HashMap<String, RateLimitPolicyConfig>>,
    store: Arc<dyn BucketStore>,
}

impl RateLimiter {
    pub fn new(policies: HashMap<String, RateLimitPolicyConfig>, store: Arc<dyn BucketStore>) -> Self {
        Self { policies: Arc::new(policies), store }
    }

    /// Checks the client against the named policy.
    ///
    /// Returns `None` when the policy name is unknown - a malformed route
    /// policy the orchestrator reports as an internal error.
    pub async fn check(&self, client: &str, policy_name: &str) -> Option<Decision> {
        let policy = *self.policies.get(policy_name)?;
        let key = BucketKey { client: client.to_string(), policy: policy_name.to_string() };
        Some(self.store.check(key, policy).await)
    }

    pub async fn sweep(&self) {
        self.store.sweep().await;
    }
}

/// A background task that periodically drops elapsed buckets.
pub async fn sweep_task(limiter: RateLimiter, interval_seconds: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_seconds));
    loop {
        interval.tick().await;
        limiter.sweep().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(window_seconds: u64, max_requests: u32) -> RateLimiter {
        let mut policies = HashMap::new();
        policies.insert("test".to_string(), RateLimitPolicyConfig { window_seconds, max_requests });
        RateLimiter::new(policies, Arc::new(MemoryBucketStore::new()))
    }

    #[tokio::test]
    async fn denies_request_beyond_maximum() {
        let rl = limiter(60, 3);

        for _ in 0..3 {
            assert_eq!(rl.check("10.0.0.1", "test").await, Some(Decision::Allow));
        }
        match rl.check("10.0.0.1", "test").await {
            Some(Decision::Deny { retry_after_seconds }) => {
                assert!(retry_after_seconds >= 1 && retry_after_seconds <= 60);
            }
            other => panic!("expected Deny, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn window_elapse_resets_the_count() {
        let rl = limiter(1, 1);

        assert_eq!(rl.check("10.0.0.1", "test").await, Some(Decision::Allow));
        assert!(matches!(rl.check("10.0.0.1", "test").await, Some(Decision::Deny { .. })));

        tokio::time::sleep(Duration::from_millis(1100)).await;

        // First request of the fresh window counts as 1 again.
        assert_eq!(rl.check("10.0.0.1", "test").await, Some(Decision::Allow));
    }

    #[tokio::test]
    async fn distinct_clients_never_interfere() {
        let rl = limiter(60, 1);

        assert_eq!(rl.check("10.0.0.1", "test").await, Some(Decision::Allow));
        assert_eq!(rl.check("10.0.0.2", "test").await, Some(Decision::Allow));

        assert!(matches!(rl.check("10.0.0.1", "test").await, Some(Decision::Deny { .. })));
        assert!(matches!(rl.check("10.0.0.2", "test").await, Some(Decision::Deny { .. })));
    }

    #[tokio::test]
    async fn same_client_different_policies_tracked_separately() {
        let mut policies = HashMap::new();
        policies.insert("a".to_string(), RateLimitPolicyConfig { window_seconds: 60, max_requests: 1 });
        policies.insert("b".to_string(), RateLimitPolicyConfig { window_seconds: 60, max_requests: 1 });
        let rl = RateLimiter::new(policies, Arc::new(MemoryBucketStore::new()));

        assert_eq!(rl.check("10.0.0.1", "a").await, Some(Decision::Allow));
        assert_eq!(rl.check("10.0.0.1", "b").await, Some(Decision::Allow));
        assert!(matches!(rl.check("10.0.0.1", "a").await, Some(Decision::Deny { .. })));
    }

    #[tokio::test]
    async fn unknown_policy_reports_none() {
        let rl = limiter(60, 1);
        assert_eq!(rl.check("10.0.0.1", "nope").await, None);
    }

    #[tokio::test]
    async fn sweep_drops_only_elapsed_buckets() {
        let store = Arc::new(MemoryBucketStore::new());
        let mut policies = HashMap::new();
        policies.insert("short".to_string(), RateLimitPolicyConfig { window_seconds: 1, max_requests: 5 });
        policies.insert("long".to_string(), RateLimitPolicyConfig { window_seconds: 60, max_requests: 5 });
        let rl = RateLimiter::new(policies, store.clone());

        rl.check("c", "short").await;
        rl.check("c", "long").await;
        tokio::time::sleep(Duration::from_millis(1100)).await;
        rl.sweep().await;

        let buckets = store.buckets.read().await;
        assert_eq!(buckets.len(), 1);
        assert!(buckets.keys().all(|k| k.policy == "long"));
    }
}
