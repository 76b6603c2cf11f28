// src/queue/reservoir.rs
//! Token-bucket reservoir shared by every outbound call in the process.
//!
//! The observable count never goes negative; internal accounting may dip
//! below zero while a failed borrow is being returned, but `available()`
//! clamps at zero. Refill is lazy: the bucket tops up to capacity whenever a
//! full refill interval has elapsed, with no background task to manage.

use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

struct ReservoirInner {
    available: i64,
    last_refill: Instant,
}

pub struct Reservoir {
    capacity: u32,
    refill_interval: Duration,
    unlimited: bool,
    inner: Mutex<ReservoirInner>,
}

impl Reservoir {
    pub fn new(capacity: u32, refill_interval: Duration) -> Self {
        Self {
            capacity,
            refill_interval,
            unlimited: false,
            inner: Mutex::new(ReservoirInner {
                available: capacity as i64,
                last_refill: Instant::now(),
            }),
        }
    }

    /// A reservoir that never blocks. Used when rate limiting is disabled.
    pub fn unlimited() -> Self {
        Self {
            capacity: u32::MAX,
            refill_interval: Duration::from_secs(u64::MAX / 4),
            unlimited: true,
            inner: Mutex::new(ReservoirInner {
                available: i64::MAX,
                last_refill: Instant::now(),
            }),
        }
    }

    fn top_up(&self, inner: &mut ReservoirInner) {
        if self.unlimited {
            return;
        }
        if inner.last_refill.elapsed() >= self.refill_interval {
            inner.available = self.capacity as i64;
            inner.last_refill = Instant::now();
        }
    }

    /// Take one unit, suspending cooperatively until the next refill tick
    /// when the bucket is empty. Never busy-waits.
    pub async fn acquire(&self) {
        if self.unlimited {
            return;
        }
        loop {
            let wait = {
                let mut inner = self.inner.lock().expect("reservoir lock poisoned");
                self.top_up(&mut inner);
                if inner.available > 0 {
                    inner.available -= 1;
                    return;
                }
                self.refill_interval
                    .saturating_sub(inner.last_refill.elapsed())
            };
            // Empty bucket: sleep until the refill tick and re-check.
            tokio::time::sleep(wait.max(Duration::from_millis(10))).await;
        }
    }

    /// Return a unit after a call that never reached the wire (the borrow is
    /// handed back so a failed attempt does not burn budget).
    pub fn release_on_failure(&self) {
        if self.unlimited {
            return;
        }
        let mut inner = self.inner.lock().expect("reservoir lock poisoned");
        inner.available = (inner.available + 1).min(self.capacity as i64);
    }

    /// Externally observable remaining budget. Clamped at zero.
    pub fn available(&self) -> u32 {
        if self.unlimited {
            return u32::MAX;
        }
        let mut inner = self.inner.lock().expect("reservoir lock poisoned");
        self.top_up(&mut inner);
        inner.available.max(0).min(self.capacity as i64) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn consumes_down_to_zero_and_never_reports_negative() {
        let r = Reservoir::new(3, Duration::from_secs(300));
        for _ in 0..3 {
            r.acquire().await;
        }
        assert_eq!(r.available(), 0);
        r.release_on_failure();
        assert_eq!(r.available(), 1);
        // Releasing beyond capacity clamps.
        for _ in 0..10 {
            r.release_on_failure();
        }
        assert_eq!(r.available(), 3);
    }

    #[tokio::test]
    async fn empty_reservoir_suspends_instead_of_proceeding() {
        let r = Reservoir::new(1, Duration::from_secs(300));
        r.acquire().await;

        let pending = r.acquire();
        tokio::pin!(pending);
        tokio::select! {
            _ = &mut pending => panic!("acquire completed on an empty reservoir"),
            _ = tokio::time::sleep(Duration::from_millis(50)) => {}
        }
    }

    #[tokio::test]
    async fn refill_unblocks_a_waiter() {
        let r = Reservoir::new(1, Duration::from_millis(80));
        r.acquire().await;
        let t0 = std::time::Instant::now();
        r.acquire().await;
        assert!(t0.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn unlimited_never_blocks() {
        let r = Reservoir::unlimited();
        for _ in 0..1000 {
            r.acquire().await;
        }
        assert_eq!(r.available(), u32::MAX);
    }
}
