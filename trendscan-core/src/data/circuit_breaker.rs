//! Circuit breaker for vendor bans and sustained rate limiting.
//!
//! HTTP 403 trips the breaker immediately; repeated 429/5xx responses trip it
//! after `failure_threshold` consecutive failures. While open, every request
//! is refused until the cooldown expires. A sync run keeps walking the
//! universe; each refused instrument simply counts as failed and is retried
//! on the next invocation.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    /// Requests are allowed.
    Closed,
    /// Requests are refused until cooldown expires.
    Open { tripped_at: Instant },
}

#[derive(Debug)]
struct Inner {
    state: BreakerState,
    consecutive_failures: u32,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    inner: Mutex<Inner>,
    cooldown: Duration,
    failure_threshold: u32,
}

impl CircuitBreaker {
    pub fn new(cooldown: Duration, failure_threshold: u32) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
            }),
            cooldown,
            failure_threshold: failure_threshold.max(1),
        }
    }

    /// 30-minute cooldown, trips after 3 consecutive failures.
    pub fn default_provider() -> Self {
        Self::new(Duration::from_secs(30 * 60), 3)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // The guarded state is two plain values; a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Check if requests are currently allowed, closing the breaker once the cooldown has passed.
    pub fn is_allowed(&self) -> bool {
        let mut inner = self.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open { tripped_at } => {
                if tripped_at.elapsed() >= self.cooldown {
                    inner.state = BreakerState::Closed;
                    inner.consecutive_failures = 0;
                    tracing::info!("circuit breaker cooldown expired, accepting requests");
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self) {
        self.lock().consecutive_failures = 0;
    }

    pub fn record_failure(&self) {
        let mut inner = self.lock();
        inner.consecutive_failures += 1;
        if inner.consecutive_failures >= self.failure_threshold
            && inner.state == BreakerState::Closed
        {
            inner.state = BreakerState::Open {
                tripped_at: Instant::now(),
            };
            tracing::warn!(
                failures = inner.consecutive_failures,
                cooldown_secs = self.cooldown.as_secs(),
                "circuit breaker tripped after consecutive failures"
            );
        }
    }

    /// Immediately trip the breaker (403 Forbidden / IP ban).
    pub fn trip(&self) {
        self.lock().state = BreakerState::Open {
            tripped_at: Instant::now(),
        };
        tracing::warn!(
            cooldown_secs = self.cooldown.as_secs(),
            "circuit breaker tripped: provider refused access"
        );
    }

    /// Remaining cooldown time (zero if not tripped).
    pub fn remaining_cooldown(&self) -> Duration {
        match self.lock().state {
            BreakerState::Closed => Duration::ZERO,
            BreakerState::Open { tripped_at } => self.cooldown.saturating_sub(tripped_at.elapsed()),
        }
    }
}
