//! Per-key (or per-IP) token-bucket rate limiting.
//!
//! The bucket map is guarded by a single mutex with short critical
//! sections rather than a lock-per-key
//! structure, so a single key's update is always serialized against
//! itself and against the cleanup sweep.

use parking_lot::Mutex;
use std::collections::HashMap;
use std::time::{Duration, Instant};

pub const DEFAULT_RATE_LIMIT_RPM: u32 = 60;
const IDLE_EVICTION: Duration = Duration::from_secs(180);

struct Bucket {
    tokens: f64,
    capacity: f64,
    refill_per_sec: f64,
    last_refill: Instant,
}

impl Bucket {
    fn new(rpm: u32) -> Self {
        let capacity = rpm.max(1) as f64;
        Self {
            tokens: capacity,
            capacity,
            refill_per_sec: capacity / 60.0,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_per_sec).min(self.capacity);
        self.last_refill = now;
    }

    fn try_take(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

pub struct RateLimiter {
    buckets: Mutex<HashMap<String, (Bucket, Instant)>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        Self { buckets: Mutex::new(HashMap::new()) }
    }

    /// Burst capacity equals the RPM. Returns `true` if the
    /// request is admitted; `false` means the caller should see 429 with
    /// `Retry-After: 60`.
    pub fn check(&self, key: &str, rpm: u32) -> bool {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        let entry = buckets
            .entry(key.to_string())
            .or_insert_with(|| (Bucket::new(rpm), now));
        entry.1 = now;
        entry.0.try_take(now)
    }

    /// Evicts buckets idle for more than 3 minutes. Intended to
    /// run on a periodic background task.
    pub fn evict_idle(&self) {
        let now = Instant::now();
        let mut buckets = self.buckets.lock();
        buckets.retain(|_, (_, last_seen)| now.saturating_duration_since(*last_seen) < IDLE_EVICTION);
    }

    pub fn len(&self) -> usize {
        self.buckets.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_equals_rpm_then_refuses() {
        let limiter = RateLimiter::new();
        for _ in 0..5 {
            assert!(limiter.check("key", 5));
        }
        assert!(!limiter.check("key", 5));
    }

    #[test]
    fn distinct_keys_have_independent_buckets() {
        let limiter = RateLimiter::new();
        assert!(limiter.check("a", 1));
        assert!(limiter.check("b", 1));
        assert!(!limiter.check("a", 1));
    }

    #[test]
    fn eviction_removes_idle_buckets_only() {
        let limiter = RateLimiter::new();
        limiter.check("stale", 60);
        limiter.evict_idle();
        assert_eq!(limiter.len(), 1);
    }
}
