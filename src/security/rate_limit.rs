//! Per-client token bucket admission control.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::RateLimitConfig;
use crate::observability::metrics;

const NANOS_PER_SEC: u128 = 1_000_000_000;

/// A token bucket with whole-token refill.
///
/// Partial tokens are never credited: `last_refill` only moves forward when
/// at least one whole token has accrued, so fractional time carries over.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: u32,
    tokens: u32,
    refill_rate: u32,
    last_refill: Instant,
    last_seen: Instant,
}

impl TokenBucket {
    /// A full bucket.
    pub fn new(capacity: u32, refill_rate: u32, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity,
            refill_rate,
            last_refill: now,
            last_seen: now,
        }
    }

    /// Refill for the time elapsed until `now`, then take one token if any.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.last_seen = self.last_seen.max(now);

        let earned = self.earned_since_refill(now);
        if earned > 0 {
            self.tokens = self.tokens.saturating_add(earned).min(self.capacity);
            self.last_refill = now;
        }

        if self.tokens > 0 {
            self.tokens -= 1;
            true
        } else {
            false
        }
    }

    fn earned_since_refill(&self, now: Instant) -> u32 {
        let elapsed = now.saturating_duration_since(self.last_refill);
        let earned = elapsed.as_nanos() * u128::from(self.refill_rate) / NANOS_PER_SEC;
        u32::try_from(earned).unwrap_or(u32::MAX)
    }

    /// Whether a refill at `now` would leave the bucket at capacity.
    ///
    /// A bucket that never refills is never full again once drawn from, so
    /// only an untouched one qualifies.
    pub fn is_full_at(&self, now: Instant) -> bool {
        self.tokens.saturating_add(self.earned_since_refill(now)) >= self.capacity
    }

    pub fn tokens(&self) -> u32 {
        self.tokens
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Instant of the most recent admission check.
    pub fn last_seen(&self) -> Instant {
        self.last_seen
    }
}

/// One token bucket per client key, created on first use.
///
/// The map is only locked (per shard) to find or create a bucket; refill and
/// consume happen under that bucket's own mutex.
#[derive(Debug)]
pub struct RateLimiterRegistry {
    buckets: DashMap<String, Arc<Mutex<TokenBucket>>>,
    capacity: u32,
    refill_rate: u32,
}

impl RateLimiterRegistry {
    pub fn new(capacity: u32, refill_rate: u32) -> Self {
        Self {
            buckets: DashMap::new(),
            capacity,
            refill_rate,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.capacity, config.rate)
    }

    fn bucket(&self, key: &str) -> Arc<Mutex<TokenBucket>> {
        if let Some(bucket) = self.buckets.get(key) {
            return bucket.value().clone();
        }
        self.buckets
            .entry(key.to_string())
            .or_insert_with(|| {
                Arc::new(Mutex::new(TokenBucket::new(
                    self.capacity,
                    self.refill_rate,
                    Instant::now(),
                )))
            })
            .value()
            .clone()
    }

    /// Admission decision for one client key.
    pub fn allow(&self, key: &str) -> bool {
        let bucket = self.bucket(key);
        let mut bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
        bucket.try_acquire(Instant::now())
    }

    /// Tokens currently held for `key`, without refilling.
    pub fn tokens(&self, key: &str) -> Option<u32> {
        self.buckets.get(key).map(|bucket| {
            bucket
                .value()
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .tokens()
        })
    }

    /// Drop buckets not consulted within `max_idle` whose refill has already
    /// brought them back to capacity. Returns how many were removed.
    ///
    /// Evicting a bucket that is not yet full would hand its client a fresh
    /// full bucket early, and with a zero refill rate a new quota on every
    /// sweep. Such buckets are kept however long they sit idle.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let now = Instant::now();
        let before = self.buckets.len();
        self.buckets.retain(|_, bucket| {
            let bucket = bucket.lock().unwrap_or_else(PoisonError::into_inner);
            let idle = now.saturating_duration_since(bucket.last_seen()) >= max_idle;
            !(idle && bucket.refill_rate > 0 && bucket.is_full_at(now))
        });
        before.saturating_sub(self.buckets.len())
    }

    /// Periodically evict idle buckets until shutdown.
    pub async fn run_sweeper(
        self: Arc<Self>,
        interval: Duration,
        max_idle: Duration,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        if max_idle.is_zero() || interval.is_zero() {
            tracing::info!("Rate limiter bucket eviction disabled");
            return;
        }

        tracing::info!(
            interval = ?interval,
            max_idle = ?max_idle,
            "Rate limiter sweeper starting"
        );

        let mut ticker = time::interval_at(Instant::now() + interval, interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = self.sweep_idle(max_idle);
                    if removed > 0 {
                        tracing::debug!(removed, remaining = self.len(), "Evicted idle rate limit buckets");
                    }
                    metrics::record_bucket_count(self.len());
                }
                _ = shutdown.recv() => {
                    tracing::info!("Rate limiter sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
