//! Pacing policies that space out calls to the exchange provider.

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep};

/// Gate awaited between two consecutive provider calls.
#[async_trait]
pub trait Pacer: Send + Sync {
    async fn pace(&self);
}

/// No waiting at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPacing;

#[async_trait]
impl Pacer for NoPacing {
    async fn pace(&self) {}
}

/// Waits the same delay every time.
#[derive(Debug, Clone, Copy)]
pub struct FixedDelay {
    delay: Duration,
}

impl FixedDelay {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

#[async_trait]
impl Pacer for FixedDelay {
    async fn pace(&self) {
        sleep(self.delay).await;
    }
}

struct Bucket {
    tokens: u32,
    last_refill: Instant,
}

/// Allows bursts of up to `capacity` calls, refilling one token every `refill_every`.
pub struct TokenBucket {
    capacity: u32,
    refill_every: Duration,
    bucket: Mutex<Bucket>,
}

impl TokenBucket {
    pub fn new(capacity: u32, refill_every: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            refill_every: refill_every.max(Duration::from_millis(1)),
            bucket: Mutex::new(Bucket {
                tokens: capacity,
                last_refill: Instant::now(),
            }),
        }
    }

    fn refill(&self, bucket: &mut Bucket, now: Instant) {
        let elapsed = now.saturating_duration_since(bucket.last_refill);
        let earned = elapsed.as_nanos() / self.refill_every.as_nanos();
        if earned == 0 {
            return;
        }

        let earned = earned.min(u128::from(self.capacity)) as u32;
        bucket.tokens = (bucket.tokens + earned).min(self.capacity);
        if bucket.tokens == self.capacity {
            bucket.last_refill = now;
        } else {
            bucket.last_refill += self.refill_every * earned;
        }
    }
}

#[async_trait]
impl Pacer for TokenBucket {
    async fn pace(&self) {
        loop {
            let wait = {
                let mut bucket = self.bucket.lock().await;
                let now = Instant::now();
                self.refill(&mut bucket, now);
                if bucket.tokens > 0 {
                    bucket.tokens -= 1;
                    return;
                }
                match bucket.last_refill.checked_add(self.refill_every) {
                    Some(next) => next.saturating_duration_since(now),
                    None => self.refill_every,
                }
            };
            sleep(wait).await;
        }
    }
}
