//! [`RateLimiter`] – pull-based minimum-interval guard.
//!
//! Plane refinements arrive many times per second.  Re-ranking every pooled
//! candidate on each one is wasted work, so the best-of-many tracker routes
//! its steady-state sweep through a [`RateLimiter`]: the guarded action runs
//! only when more than `min_interval` has passed since the last time it ran.
//!
//! There is no timer.  The clock is read inline at call time, which matches
//! the single-threaded, event-driven delivery of perception batches.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use dragcare_tracking::rate_limiter::{ManualClock, RateLimiter};
//!
//! let clock = ManualClock::new();
//! let mut limiter = RateLimiter::with_clock(Duration::from_millis(500), Arc::new(clock.clone()));
//!
//! let mut runs = 0;
//! limiter.attempt(|| runs += 1);
//! limiter.attempt(|| runs += 1); // inside the window → suppressed
//! assert_eq!(runs, 1);
//!
//! clock.advance(Duration::from_millis(501));
//! limiter.attempt(|| runs += 1);
//! assert_eq!(runs, 2);
//! ```

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

// ────────────────────────────────────────────────────────────────────────────
// Clocks
// ────────────────────────────────────────────────────────────────────────────

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// The monotonic system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.  Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Instant>>,
}

impl ManualClock {
    /// Start at the current instant.
    pub fn new() -> Self {
        Self {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// RateLimiter
// ────────────────────────────────────────────────────────────────────────────

/// Suppresses an action unless `min_interval` has elapsed since its last
/// successful run.
///
/// The first attempt after construction always runs.  A zero interval disables limiting.  Not meant to be shared across
/// threads; one event-processing context owns it.
pub struct RateLimiter {
    min_interval: Duration,
    last_success: Option<Instant>,
    clock: Arc<dyn Clock>,
}

impl RateLimiter {
    /// Create a limiter backed by the [`SystemClock`].
    pub fn new(min_interval: Duration) -> Self {
        Self::with_clock(min_interval, Arc::new(SystemClock))
    }

    pub fn with_clock(min_interval: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            min_interval,
            last_success: None,
            clock,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Run `action` if the window has elapsed, recording the time on success.
    ///
    /// Returns the action's result, or `None` when it was suppressed.
    pub fn attempt<T>(&mut self, action: impl FnOnce() -> T) -> Option<T> {
        let now = self.clock.now();
        if !self.is_open_at(now) {
            return None;
        }
        let out = action();
        self.last_success = Some(now);
        Some(out)
    }

    /// Run `action` unconditionally and restart the window.
    pub fn force<T>(&mut self, action: impl FnOnce() -> T) -> T {
        let now = self.clock.now();
        let out = action();
        self.last_success = Some(now);
        out
    }

    fn is_open_at(&self, now: Instant) -> bool {
        match self.last_success {
            None => true,
            Some(_) if self.min_interval.is_zero() => true,
            Some(last) => now.saturating_duration_since(last) > self.min_interval,
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("min_interval", &self.min_interval)
            .field("last_success", &self.last_success)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn limiter(ms: u64) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new();
        let limiter = RateLimiter::with_clock(Duration::from_millis(ms), Arc::new(clock.clone()));
        (limiter, clock)
    }

    fn fires(limiter: &mut RateLimiter) -> bool {
        limiter.attempt(|| ()).is_some()
    }

    #[test]
    fn two_attempts_within_window_run_once() {
        let (mut limiter, clock) = limiter(100);
        let mut runs = 0;
        limiter.attempt(|| runs += 1);
        clock.advance(Duration::from_millis(50));
        limiter.attempt(|| runs += 1);
        assert_eq!(runs, 1);
    }

    #[test]
    fn attempt_after_window_runs_again() {
        let (mut limiter, clock) = limiter(100);
        let mut runs = 0;
        limiter.attempt(|| runs += 1);
        clock.advance(Duration::from_millis(101));
        limiter.attempt(|| runs += 1);
        assert_eq!(runs, 2);
    }

    #[test]
    fn elapsed_must_strictly_exceed_interval() {
        let (mut limiter, clock) = limiter(100);
        assert!(fires(&mut limiter));
        clock.advance(Duration::from_millis(100));
        assert!(!fires(&mut limiter));
        clock.advance(Duration::from_millis(1));
        assert!(fires(&mut limiter));
    }

    #[test]
    fn suppressed_attempt_does_not_restart_window() {
        let (mut limiter, clock) = limiter(100);
        assert!(fires(&mut limiter));
        clock.advance(Duration::from_millis(60));
        assert!(!fires(&mut limiter));
        clock.advance(Duration::from_millis(60));
        // 120 ms since the last *successful* attempt.
        assert!(fires(&mut limiter));
    }

    #[test]
    fn attempt_returns_action_result() {
        let (mut limiter, _clock) = limiter(100);
        assert_eq!(limiter.attempt(|| 42), Some(42));
        assert_eq!(limiter.attempt(|| 43), None);
    }

    #[test]
    fn force_runs_and_restarts_window() {
        let (mut limiter, clock) = limiter(100);
        assert!(fires(&mut limiter));
        clock.advance(Duration::from_millis(90));
        assert_eq!(limiter.force(|| "forced"), "forced");
        clock.advance(Duration::from_millis(20));
        // 110 ms since the first success but only 20 ms since the forced one.
        assert!(!fires(&mut limiter));
    }

    #[test]
    fn zero_interval_never_suppresses() {
        let (mut limiter, _clock) = limiter(0);
        assert!(fires(&mut limiter));
        assert!(fires(&mut limiter));
    }

    #[test]
    fn system_clock_window_elapses() {
        let mut limiter = RateLimiter::new(Duration::from_millis(10));
        let mut runs = 0;
        limiter.attempt(|| runs += 1);
        limiter.attempt(|| runs += 1);
        thread::sleep(Duration::from_millis(20));
        limiter.attempt(|| runs += 1);
        assert_eq!(runs, 2);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let a = ManualClock::new();
        let b = a.clone();
        let before = b.now();
        a.advance(Duration::from_secs(1));
        assert_eq!(b.now() - before, Duration::from_secs(1));
    }
}
