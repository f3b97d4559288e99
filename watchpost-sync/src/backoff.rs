//! Capped exponential backoff for server contact.
//!
//! The original retry semantics are "never give up": every cycle retries.
//! Backoff keeps that promise but stops hammering an unreachable server —
//! after consecutive failures the client skips server contact until the
//! window elapses, doubling up to a cap. Local sampling and ledger writes
//! are never gated by backoff state.

use std::time::{Duration, Instant};

/// Default cap on the backoff window.
pub const DEFAULT_CAP: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    cap: Duration,
    consecutive_failures: u32,
    last_attempt: Option<Instant>,
}

impl Backoff {
    /// `base` is the delay after the first failure; each further failure
    /// doubles it up to `cap`.
    pub fn new(base: Duration, cap: Duration) -> Self {
        Self {
            base,
            cap,
            consecutive_failures: 0,
            last_attempt: None,
        }
    }

    /// Current window: zero while healthy, `min(cap, base * 2^(n-1))` after
    /// `n` consecutive failures.
    pub fn delay(&self) -> Duration {
        if self.consecutive_failures == 0 {
            return Duration::ZERO;
        }
        let exp = self.consecutive_failures.saturating_sub(1).min(16);
        self.base
            .saturating_mul(1u32 << exp)
            .min(self.cap)
    }

    /// Whether the server may be contacted at `now`.
    pub fn ready(&self, now: Instant) -> bool {
        match self.last_attempt {
            None => true,
            Some(last) => now.saturating_duration_since(last) >= self.delay(),
        }
    }

    /// Record a failed contact attempt made at `now`.
    pub fn record_failure(&mut self, now: Instant) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.last_attempt = Some(now);
    }

    /// Record a successful contact; the window resets to zero.
    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.last_attempt = None;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}
