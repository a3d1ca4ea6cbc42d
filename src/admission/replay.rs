//! Anti-replay checks.
//!
//! # Responsibilities
//! - Bound the nonce value
//! - Reject stale timestamps and timestamps too far in the future
//! - Track consumed (access key, nonce) pairs for the lifetime of a timestamp
//!
//! All checks take `now` as an argument; nothing here reads the wall clock.

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use thiserror::Error;

use crate::config::AdmissionConfig;

/// Why a request failed the replay policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ReplayViolation {
    #[error("nonce exceeds the configured maximum")]
    NonceOutOfRange,
    #[error("nonce was already used")]
    NonceReused,
    #[error("timestamp is outside the replay window")]
    Stale,
    #[error("timestamp is too far in the future")]
    FromFuture,
}

/// Stateless nonce and timestamp policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplayGuard {
    pub max_nonce: u64,
    pub window_secs: u64,
    pub max_future_skew_secs: u64,
}

impl Default for ReplayGuard {
    fn default() -> Self {
        Self::from_config(&AdmissionConfig::default())
    }
}

impl ReplayGuard {
    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self {
            max_nonce: config.max_nonce,
            window_secs: config.replay_window_secs,
            max_future_skew_secs: config.max_future_skew_secs,
        }
    }

    /// True unless the nonce exceeds `max_nonce`.
    pub fn check_nonce(&self, nonce: u64) -> bool {
        nonce <= self.max_nonce
    }

    /// True iff `now - timestamp < window` and the timestamp is at most
    /// `max_future_skew_secs` ahead of `now`.
    pub fn check_timestamp(&self, timestamp: u64, now: u64) -> bool {
        self.timestamp_violation(timestamp, now).is_none()
    }

    pub fn timestamp_violation(&self, timestamp: u64, now: u64) -> Option<ReplayViolation> {
        if timestamp <= now {
            if now - timestamp >= self.window_secs {
                return Some(ReplayViolation::Stale);
            }
        } else if timestamp - now > self.max_future_skew_secs {
            return Some(ReplayViolation::FromFuture);
        }
        None
    }

    /// How long a consumed nonce must be remembered: any request carrying it
    /// is stale once this has elapsed.
    pub fn nonce_ttl_secs(&self) -> u64 {
        self.window_secs.saturating_add(self.max_future_skew_secs)
    }
}

/// Consumed (access key, nonce) pairs with expiry in unix seconds.
#[derive(Debug, Default)]
pub struct NonceCache {
    seen: DashMap<(String, u64), u64>,
}

impl NonceCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// True if the pair was consumed and has not yet expired. No side effects.
    pub fn contains(&self, access_key: &str, nonce: u64, now: u64) -> bool {
        self.seen
            .get(&(access_key.to_string(), nonce))
            .map(|expiry| *expiry > now)
            .unwrap_or(false)
    }

    /// Record the pair as consumed until `now + ttl_secs`.
    ///
    /// Returns `false` if a live entry already exists; the check and the insert are a
    /// single operation on the shard, so only one of two racing requests wins.
    pub fn consume(&self, access_key: &str, nonce: u64, now: u64, ttl_secs: u64) -> bool {
        let expiry = now.saturating_add(ttl_secs);
        match self.seen.entry((access_key.to_string(), nonce)) {
            Entry::Occupied(mut entry) => {
                if *entry.get() > now {
                    return false;
                }
                entry.insert(expiry);
                true
            }
            Entry::Vacant(entry) => {
                entry.insert(expiry);
                true
            }
        }
    }

    /// Drop every expired entry.
    pub fn evict_expired(&self, now: u64) -> usize {
        let before = self.seen.len();
        self.seen.retain(|_, expiry| *expiry > now);
        before.saturating_sub(self.seen.len())
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    /// Periodically evict expired entries until the task is aborted.
    pub fn start_eviction_task<F>(self: &Arc<Self>, interval: Duration, now: F) -> tokio::task::JoinHandle<()>
    where
        F: Fn() -> u64 + Send + 'static,
    {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let evicted = cache.evict_expired(now());
                if evicted > 0 {
                    tracing::debug!(evicted, remaining = cache.len(), "Evicted expired nonces");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guard() -> ReplayGuard {
        ReplayGuard {
            max_nonce: 10_000,
            window_secs: 300,
            max_future_skew_secs: 60,
        }
    }

    #[test]
    fn test_nonce_bound() {
        let g = guard();
        assert!(g.check_nonce(0));
        assert!(g.check_nonce(5));
        assert!(g.check_nonce(10_000));
        assert!(!g.check_nonce(10_001));
    }

    #[test]
    fn test_timestamp_window_boundary() {
        let g = guard();
        // 1000 - 699 = 301 >= 300
        assert!(!g.check_timestamp(699, 1000));
        // exactly at now - window
        assert!(!g.check_timestamp(700, 1000));
        // 1000 - 701 = 299 < 300
        assert!(g.check_timestamp(701, 1000));
        assert!(g.check_timestamp(1000, 1000));
        assert_eq!(g.timestamp_violation(699, 1000), Some(ReplayViolation::Stale));
    }

    #[test]
    fn test_future_timestamp_tolerance() {
        let g = guard();
        assert!(g.check_timestamp(1060, 1000));
        assert!(!g.check_timestamp(1061, 1000));
        assert_eq!(g.timestamp_violation(5000, 1000), Some(ReplayViolation::FromFuture));
    }

    #[test]
    fn test_timestamp_near_zero_does_not_underflow() {
        let g = guard();
        assert!(g.check_timestamp(0, 10));
        assert!(!g.check_timestamp(0, 300));
    }

    #[test]
    fn test_guard_from_config_defaults() {
        let g = ReplayGuard::default();
        assert_eq!(g.max_nonce, 10_000);
        assert_eq!(g.window_secs, 300);
        assert_eq!(g.nonce_ttl_secs(), 360);
    }

    #[test]
    fn test_nonce_cache_rejects_reuse_within_ttl() {
        let cache = NonceCache::new();
        assert!(!cache.contains("zlx", 5, 1000));
        assert!(cache.consume("zlx", 5, 1000, 360));
        assert!(cache.contains("zlx", 5, 1100));
        assert!(!cache.consume("zlx", 5, 1100, 360));
    }

    #[test]
    fn test_nonce_cache_scoped_per_access_key() {
        let cache = NonceCache::new();
        assert!(cache.consume("zlx", 5, 1000, 360));
        assert!(cache.consume("svc", 5, 1000, 360));
        assert!(cache.consume("zlx", 6, 1000, 360));
        assert_eq!(cache.len(), 3);
    }

    #[test]
    fn test_nonce_cache_reusable_after_expiry() {
        let cache = NonceCache::new();
        assert!(cache.consume("zlx", 5, 1000, 360));
        assert!(!cache.contains("zlx", 5, 1360));
        assert!(cache.consume("zlx", 5, 1360, 360));
    }

    #[test]
    fn test_evict_expired() {
        let cache = NonceCache::new();
        cache.consume("zlx", 1, 1000, 10);
        cache.consume("zlx", 2, 1000, 100);
        assert_eq!(cache.evict_expired(1050), 1);
        assert_eq!(cache.len(), 1);
        assert!(cache.contains("zlx", 2, 1050));
    }

    #[tokio::test]
    async fn test_eviction_task_runs() {
        let cache = Arc::new(NonceCache::new());
        cache.consume("zlx", 1, 0, 1);
        let handle = cache.start_eviction_task(Duration::from_millis(10), || 100);
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();
        assert!(cache.is_empty());
    }
}
