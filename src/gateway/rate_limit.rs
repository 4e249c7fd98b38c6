//! Client-side admission control
//!
//! Three layers, checked in this order:
//! 1. Escalating backoff after upstream rate-limit violations (30s doubling to 300s)
//! 2. Sliding 60s window capped at the configured requests per minute
//! 3. Sliding 10s burst window capped at the burst limit
//!
//! Upstream 429s cost money and escalate penalties, so the limiter refuses early
//! instead of letting requests bounce.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

/// Length of the per-minute window.
pub const WINDOW_MS: u64 = 60_000;

/// Length of the burst window.
pub const BURST_WINDOW_MS: u64 = 10_000;

/// Default number of admissions allowed inside the burst window.
pub const DEFAULT_BURST_MAX: u32 = 10;

/// First backoff after a violation. Each consecutive violation doubles it.
pub const BASE_BACKOFF_MS: u64 = 30_000;

/// Backoff ceiling.
pub const MAX_BACKOFF_MS: u64 = 300_000;

/// Millisecond clock
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since an arbitrary fixed origin
    fn now_ms(&self) -> u64;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    /// Clock starting at `start_ms`
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    /// Move time forward
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    /// Jump to an absolute time
    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Proceed; the admission has been recorded
    Allowed,
    /// Refused; try again after the given delay
    Blocked {
        /// Milliseconds until the blocking condition clears
        retry_after_ms: u64,
    },
}

impl Admission {
    /// Whether the request may proceed
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed)
    }

    /// Delay for blocked admissions
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            Admission::Allowed => None,
            Admission::Blocked { retry_after_ms } => Some(*retry_after_ms),
        }
    }
}

/// Point-in-time view of limiter state, for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiterSnapshot {
    /// Admissions inside the 60s window
    pub in_window: usize,
    /// Admissions inside the burst window
    pub in_burst_window: usize,
    /// Violations since the last success
    pub consecutive_violations: u32,
    /// Remaining backoff, 0 when none
    pub backoff_remaining_ms: u64,
}

#[derive(Debug, Default)]
struct LimiterState {
    timestamps: VecDeque<u64>,
    consecutive_violations: u32,
    backoff_until: u64,
}

/// Sliding-window rate limiter with burst control and escalating backoff
pub struct RateLimiter {
    max_per_minute: usize,
    burst_max: usize,
    clock: Arc<dyn Clock>,
    state: Mutex<LimiterState>,
}

impl RateLimiter {
    /// Limiter allowing `max_per_minute` admissions per minute and the default burst
    pub fn new(max_per_minute: u32) -> Self {
        Self::with_burst(max_per_minute, DEFAULT_BURST_MAX)
    }

    /// Limiter with an explicit burst cap
    ///
    /// Both limits are raised to at least 1.
    pub fn with_burst(max_per_minute: u32, burst_max: u32) -> Self {
        Self {
            max_per_minute: max_per_minute.max(1) as usize,
            burst_max: burst_max.max(1) as usize,
            clock: Arc::new(SystemClock),
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Replace the clock, mainly for tests
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Admissions per minute
    pub fn max_per_minute(&self) -> usize {
        self.max_per_minute
    }

    /// Admissions per burst window
    pub fn burst_max(&self) -> usize {
        self.burst_max
    }

    fn lock(&self) -> MutexGuard<'_, LimiterState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Check admission and record it when granted.
    ///
    /// Trimming, checking and recording happen under one lock, so concurrent callers
    /// cannot overshoot the window.
    pub fn can_proceed(&self) -> Admission {
        let now = self.clock.now_ms();
        let mut state = self.lock();

        if now < state.backoff_until {
            let retry_after_ms = state.backoff_until - now;
            debug!(retry_after_ms, "Admission refused: backoff in effect");
            return Admission::Blocked { retry_after_ms };
        }

        while let Some(&oldest) = state.timestamps.front() {
            if now.saturating_sub(oldest) < WINDOW_MS {
                break;
            }
            state.timestamps.pop_front();
        }

        if state.timestamps.len() >= self.max_per_minute {
            let oldest = state.timestamps.front().copied().unwrap_or(now);
            let retry_after_ms = WINDOW_MS - now.saturating_sub(oldest);
            debug!(
                retry_after_ms,
                limit = self.max_per_minute,
                "Admission refused: per-minute window full"
            );
            return Admission::Blocked { retry_after_ms };
        }

        let burst: Vec<u64> = state
            .timestamps
            .iter()
            .copied()
            .filter(|t| now.saturating_sub(*t) < BURST_WINDOW_MS)
            .collect();
        if burst.len() >= self.burst_max {
            let oldest_burst = burst.first().copied().unwrap_or(now);
            let retry_after_ms = BURST_WINDOW_MS - now.saturating_sub(oldest_burst);
            debug!(
                retry_after_ms,
                burst = self.burst_max,
                "Admission refused: burst window full"
            );
            return Admission::Blocked { retry_after_ms };
        }

        state.timestamps.push_back(now);
        Admission::Allowed
    }

    /// Signal a rate-limit violation and start (or extend) the backoff.
    ///
    /// Returns the backoff that was applied.
    pub fn record_violation(&self) -> Duration {
        let now = self.clock.now_ms();
        let mut state = self.lock();

        state.consecutive_violations = state.consecutive_violations.saturating_add(1);
        let backoff_ms = backoff_for(state.consecutive_violations);
        state.backoff_until = now + backoff_ms;

        warn!(
            consecutive_violations = state.consecutive_violations,
            backoff_ms, "Rate limit violation, backing off"
        );
        Duration::from_millis(backoff_ms)
    }

    /// Signal a successful request; the next violation starts from the base backoff again
    pub fn record_success(&self) {
        self.lock().consecutive_violations = 0;
    }

    /// Current state without mutating it
    pub fn snapshot(&self) -> RateLimiterSnapshot {
        let now = self.clock.now_ms();
        let state = self.lock();
        let age = |t: &&u64| now.saturating_sub(**t);

        RateLimiterSnapshot {
            in_window: state.timestamps.iter().filter(|t| age(t) < WINDOW_MS).count(),
            in_burst_window: state
                .timestamps
                .iter()
                .filter(|t| age(t) < BURST_WINDOW_MS)
                .count(),
            consecutive_violations: state.consecutive_violations,
            backoff_remaining_ms: state.backoff_until.saturating_sub(now),
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("max_per_minute", &self.max_per_minute)
            .field("burst_max", &self.burst_max)
            .finish()
    }
}

/// Backoff for the n-th consecutive violation (1-based)
pub fn backoff_for(consecutive_violations: u32) -> u64 {
    let exponent = consecutive_violations.saturating_sub(1).min(16);
    (BASE_BACKOFF_MS << exponent).min(MAX_BACKOFF_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(per_minute: u32, burst: u32) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let limiter = RateLimiter::with_burst(per_minute, burst).with_clock(Arc::new(clock.clone()));
        (limiter, clock)
    }

    #[test]
    fn test_backoff_schedule() {
        assert_eq!(backoff_for(1), 30_000);
        assert_eq!(backoff_for(2), 60_000);
        assert_eq!(backoff_for(3), 120_000);
        assert_eq!(backoff_for(4), 240_000);
        assert_eq!(backoff_for(5), 300_000);
        assert_eq!(backoff_for(40), 300_000);
    }

    #[test]
    fn test_per_minute_cap() {
        let (limiter, clock) = limiter(5, 100);
        for _ in 0..5 {
            assert!(limiter.can_proceed().is_allowed());
            clock.advance(Duration::from_millis(10));
        }
        let blocked = limiter.can_proceed();
        assert!(!blocked.is_allowed());
        assert_eq!(blocked.retry_after_ms(), Some(60_000 - 50));
    }

    #[test]
    fn test_window_slides() {
        let (limiter, clock) = limiter(2, 10);
        assert!(limiter.can_proceed().is_allowed());
        assert!(limiter.can_proceed().is_allowed());
        assert!(!limiter.can_proceed().is_allowed());

        clock.advance(Duration::from_millis(WINDOW_MS));
        assert!(limiter.can_proceed().is_allowed());
    }

    #[test]
    fn test_burst_cap() {
        let (limiter, clock) = limiter(100, 3);
        for _ in 0..3 {
            assert!(limiter.can_proceed().is_allowed());
        }
        clock.advance(Duration::from_millis(4_000));
        assert_eq!(
            limiter.can_proceed(),
            Admission::Blocked {
                retry_after_ms: 6_000
            }
        );

        clock.advance(Duration::from_millis(6_000));
        assert!(limiter.can_proceed().is_allowed());
    }

    #[test]
    fn test_blocked_checks_are_not_recorded() {
        let (limiter, _clock) = limiter(1, 1);
        assert!(limiter.can_proceed().is_allowed());
        for _ in 0..5 {
            assert!(!limiter.can_proceed().is_allowed());
        }
        assert_eq!(limiter.snapshot().in_window, 1);
    }

    #[test]
    fn test_escalating_backoff() {
        let (limiter, clock) = limiter(100, 100);

        assert_eq!(limiter.record_violation(), Duration::from_secs(30));
        assert_eq!(limiter.can_proceed().retry_after_ms(), Some(30_000));
        clock.advance(Duration::from_secs(30));
        assert!(limiter.can_proceed().is_allowed());

        assert_eq!(limiter.record_violation(), Duration::from_secs(60));
        clock.advance(Duration::from_secs(30));
        assert!(!limiter.can_proceed().is_allowed());
        clock.advance(Duration::from_secs(30));
        assert!(limiter.can_proceed().is_allowed());
    }

    #[test]
    fn test_success_resets_escalation() {
        let (limiter, clock) = limiter(100, 100);
        limiter.record_violation();
        limiter.record_violation();
        limiter.record_success();
        assert_eq!(limiter.snapshot().consecutive_violations, 0);

        clock.advance(Duration::from_secs(120));
        assert_eq!(limiter.record_violation(), Duration::from_secs(30));
        clock.advance(Duration::from_secs(30));
        assert!(limiter.can_proceed().is_allowed());
    }

    #[test]
    fn test_limits_clamped_to_one() {
        let limiter = RateLimiter::with_burst(0, 0);
        assert_eq!(limiter.max_per_minute(), 1);
        assert_eq!(limiter.burst_max(), 1);
    }
}
