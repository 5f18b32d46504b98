// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;

use crate::config::RateLimitConfig;

const SWEEP_EVERY: Duration = Duration::from_secs(30);
/// Past this many keys a sweep may run every second instead.
const SWEEP_PRESSURE_KEYS: usize = 10_000;

#[derive(Debug, Clone)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

#[derive(Default)]
struct Buckets {
    by_key: HashMap<String, Bucket>,
    last_sweep: Option<Instant>,
}

impl Buckets {
    fn sweep_due(&self, now: Instant) -> bool {
        let Some(last) = self.last_sweep else {
            return true;
        };
        let since = now.saturating_duration_since(last);
        since >= SWEEP_EVERY
            || (self.by_key.len() >= SWEEP_PRESSURE_KEYS && since >= Duration::from_secs(1))
    }

    /// Drops buckets idle long enough to be full again; a full bucket is the
    /// same as a missing one.
    fn sweep(&mut self, now: Instant, refill_window: Duration) {
        self.by_key
            .retain(|_, b| now.saturating_duration_since(b.last_refill) < refill_window);
        self.last_sweep = Some(now);
    }
}

fn refill_window(cfg: &RateLimitConfig) -> Duration {
    if cfg.refill_per_sec <= 0.0 {
        return Duration::MAX;
    }
    Duration::try_from_secs_f64(cfg.capacity / cfg.refill_per_sec).unwrap_or(Duration::MAX)
}

/// In-process token buckets keyed by client address.
#[derive(Default)]
pub(crate) struct RateLimiter {
    buckets: Mutex<Buckets>,
}

impl RateLimiter {
    pub(crate) async fn allow(&self, key: &str, cfg: &RateLimitConfig) -> bool {
        self.allow_at(key, cfg, Instant::now()).await
    }

    pub(crate) async fn allow_at(&self, key: &str, cfg: &RateLimitConfig, now: Instant) -> bool {
        let mut lock = self.buckets.lock().await;
        if lock.sweep_due(now) {
            lock.sweep(now, refill_window(cfg));
        }
        let bucket = lock.by_key.entry(key.to_string()).or_insert_with(|| Bucket {
            tokens: cfg.capacity,
            last_refill: now,
        });
        let elapsed = now.saturating_duration_since(bucket.last_refill).as_secs_f64();
        bucket.last_refill = now;
        bucket.tokens = (bucket.tokens + (elapsed * cfg.refill_per_sec)).min(cfg.capacity);
        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    pub(crate) async fn tracked_keys(&self) -> usize {
        self.buckets.lock().await.by_key.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bucket_drains_then_refills() {
        let limiter = RateLimiter::default();
        let cfg = RateLimitConfig {
            capacity: 2.0,
            refill_per_sec: 1.0,
        };
        let t0 = Instant::now();
        assert!(limiter.allow_at("1.2.3.4", &cfg, t0).await);
        assert!(limiter.allow_at("1.2.3.4", &cfg, t0).await);
        assert!(!limiter.allow_at("1.2.3.4", &cfg, t0).await);
        assert!(limiter.allow_at("5.6.7.8", &cfg, t0).await);
        assert!(
            limiter
                .allow_at("1.2.3.4", &cfg, t0 + Duration::from_millis(1100))
                .await
        );
        assert_eq!(limiter.tracked_keys().await, 2);
    }

    #[tokio::test]
    async fn idle_buckets_are_forgotten_once_refilled() {
        let limiter = RateLimiter::default();
        let cfg = RateLimitConfig {
            capacity: 2.0,
            refill_per_sec: 1.0,
        };
        let t0 = Instant::now();
        for n in 0..1_000 {
            limiter.allow_at(&format!("10.0.{}.{}", n / 256, n % 256), &cfg, t0).await;
        }
        assert_eq!(limiter.tracked_keys().await, 1_000);

        let later = t0 + Duration::from_secs(3600);
        assert!(limiter.allow_at("192.0.2.1", &cfg, later).await);
        assert_eq!(limiter.tracked_keys().await, 1);
    }

    #[tokio::test]
    async fn sweeping_does_not_forgive_a_drained_client() {
        let limiter = RateLimiter::default();
        let cfg = RateLimitConfig {
            capacity: 2.0,
            refill_per_sec: 0.01,
        };
        let t0 = Instant::now();
        assert!(limiter.allow_at("greedy", &cfg, t0).await);
        assert!(limiter.allow_at("greedy", &cfg, t0).await);
        assert!(!limiter.allow_at("greedy", &cfg, t0).await);

        let sweep_time = t0 + Duration::from_secs(40);
        assert!(limiter.allow_at("polite", &cfg, sweep_time).await);
        assert_eq!(limiter.tracked_keys().await, 2);
        assert!(!limiter.allow_at("greedy", &cfg, sweep_time).await);

        let much_later = t0 + Duration::from_secs(1_000);
        assert!(limiter.allow_at("newcomer", &cfg, much_later).await);
        assert_eq!(limiter.tracked_keys().await, 1);
    }
}
