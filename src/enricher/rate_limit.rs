//! Sliding-window rate limiting for enrichment requests.
//!
//! The limiter is an explicit object scoped to one pipeline invocation, not a
//! process-wide singleton, so concurrent pipeline runs cannot interfere with
//! each other and tests can drive it deterministically.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Trait for request admission control.
#[async_trait]
pub trait RequestLimiter: Send + Sync {
    /// Wait until a request may be issued, then record the admission.
    async fn acquire(&self);
}

/// Sliding-window limiter admitting at most `max_requests` per `window`.
///
/// Admission bookkeeping happens under a single async mutex: no two tasks can
/// update the window accounting concurrently. Waiting happens outside the
/// lock and re-checks the window on wake.
pub struct SlidingWindowLimiter {
    admissions: Mutex<VecDeque<Instant>>,
    max_requests: usize,
    window: Duration,
}

impl SlidingWindowLimiter {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            admissions: Mutex::new(VecDeque::new()),
            // A zero budget would never admit anything.
            max_requests: max_requests.max(1),
            window,
        }
    }

    /// Drop admissions that have left the window.
    fn prune(admissions: &mut VecDeque<Instant>, now: Instant, window: Duration) {
        while let Some(front) = admissions.front() {
            if now.duration_since(*front) >= window {
                admissions.pop_front();
            } else {
                break;
            }
        }
    }
}

#[async_trait]
impl RequestLimiter for SlidingWindowLimiter {
    async fn acquire(&self) {
        loop {
            let wait = {
                let mut admissions = self.admissions.lock().await;
                let now = Instant::now();
                Self::prune(&mut admissions, now, self.window);

                if admissions.len() < self.max_requests {
                    admissions.push_back(now);
                    return;
                }

                // Window is full; the next slot frees when the oldest
                // admission expires.
                match admissions.front() {
                    Some(oldest) => (*oldest + self.window).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };
            tokio::time::sleep(wait).await;
        }
    }
}

/// Limiter that admits everything immediately.
pub struct NoOpLimiter;

#[async_trait]
impl RequestLimiter for NoOpLimiter {
    async fn acquire(&self) {}
}
