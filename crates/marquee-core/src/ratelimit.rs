use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::ids::ClientId;

const DEFAULT_RATE_PER_SEC: f64 = 0.8;
const DEFAULT_BURST: f64 = 2.0;

/// Token-bucket admission control keyed by connection identity.
///
/// Steady state admits `rate_per_sec` actions per second with short bursts
/// up to `burst`. A refused call does not consume tokens. Purely a local
/// check: never blocks, no side effects beyond the caller's own bucket.
#[derive(Debug)]
pub struct RateLimiter {
    rate_per_sec: f64,
    burst: f64,
    buckets: DashMap<ClientId, Bucket>,
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    last_refill: Instant,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_RATE_PER_SEC, DEFAULT_BURST)
    }
}

impl RateLimiter {
    pub fn new(rate_per_sec: f64, burst: f64) -> Self {
        Self {
            rate_per_sec,
            burst,
            buckets: DashMap::new(),
        }
    }

    /// Admit or refuse one action for `id`.
    pub fn allow(&self, id: &ClientId) -> bool {
        self.allow_at(id, Instant::now())
    }

    /// Clock-explicit variant of [`allow`](Self::allow); tests drive it
    /// with synthetic instants instead of sleeping.
    pub fn allow_at(&self, id: &ClientId, now: Instant) -> bool {
        let mut bucket = self.buckets.entry(id.clone()).or_insert_with(|| Bucket {
            tokens: self.burst,
            last_refill: now,
        });

        let elapsed = now
            .saturating_duration_since(bucket.last_refill)
            .as_secs_f64();
        bucket.tokens = (bucket.tokens + elapsed * self.rate_per_sec).min(self.burst);
        bucket.last_refill = now;

        if bucket.tokens < 1.0 {
            return false;
        }
        bucket.tokens -= 1.0;
        true
    }

    /// Drop the bucket for a departed connection. Buckets are keyed by live
    /// connection identity, so this bounds memory over long uptimes.
    pub fn forget(&self, id: &ClientId) {
        self.buckets.remove(id);
    }

    /// Number of identities currently holding a bucket.
    pub fn tracked(&self) -> usize {
        self.buckets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_admits_two_then_refuses() {
        let limiter = RateLimiter::default();
        let id = ClientId::new();
        let now = Instant::now();

        assert!(limiter.allow_at(&id, now));
        assert!(limiter.allow_at(&id, now));
        assert!(!limiter.allow_at(&id, now));
    }

    #[test]
    fn refill_admits_after_wait() {
        let limiter = RateLimiter::default();
        let id = ClientId::new();
        let now = Instant::now();

        for _ in 0..3 {
            limiter.allow_at(&id, now);
        }

        // 1.25s * 0.8/s = 1 token
        let later = now + Duration::from_millis(1250);
        assert!(limiter.allow_at(&id, later));
    }

    #[test]
    fn refusal_does_not_consume() {
        let limiter = RateLimiter::default();
        let id = ClientId::new();
        let now = Instant::now();

        limiter.allow_at(&id, now);
        limiter.allow_at(&id, now);

        // Hammering while empty must not push the balance negative; one
        // refill interval later a single token is available again.
        for _ in 0..10 {
            assert!(!limiter.allow_at(&id, now));
        }
        let later = now + Duration::from_millis(1250);
        assert!(limiter.allow_at(&id, later));
    }

    #[test]
    fn refill_caps_at_burst() {
        let limiter = RateLimiter::default();
        let id = ClientId::new();
        let now = Instant::now();

        limiter.allow_at(&id, now);

        // A long idle period refills to the cap, not beyond it.
        let much_later = now + Duration::from_secs(3600);
        assert!(limiter.allow_at(&id, much_later));
        assert!(limiter.allow_at(&id, much_later));
        assert!(!limiter.allow_at(&id, much_later));
    }

    #[test]
    fn identities_do_not_share_buckets() {
        let limiter = RateLimiter::default();
        let a = ClientId::new();
        let b = ClientId::new();
        let now = Instant::now();

        limiter.allow_at(&a, now);
        limiter.allow_at(&a, now);
        assert!(!limiter.allow_at(&a, now));

        assert!(limiter.allow_at(&b, now));
    }

    #[test]
    fn forget_evicts_bucket() {
        let limiter = RateLimiter::default();
        let id = ClientId::new();

        limiter.allow(&id);
        assert_eq!(limiter.tracked(), 1);

        limiter.forget(&id);
        assert_eq!(limiter.tracked(), 0);
    }

    #[test]
    fn forgotten_identity_starts_fresh() {
        let limiter = RateLimiter::default();
        let id = ClientId::new();
        let now = Instant::now();

        limiter.allow_at(&id, now);
        limiter.allow_at(&id, now);
        assert!(!limiter.allow_at(&id, now));

        limiter.forget(&id);
        assert!(limiter.allow_at(&id, now));
        assert!(limiter.allow_at(&id, now));
    }

    #[test]
    fn custom_rate_and_burst() {
        let limiter = RateLimiter::new(2.0, 1.0);
        let id = ClientId::new();
        let now = Instant::now();

        assert!(limiter.allow_at(&id, now));
        assert!(!limiter.allow_at(&id, now));

        // 0.5s * 2/s = 1 token
        assert!(limiter.allow_at(&id, now + Duration::from_millis(500)));
    }
}
