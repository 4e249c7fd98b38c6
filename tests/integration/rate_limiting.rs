//! Integration tests for admission control

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use keyword_data_gateway::gateway::rate_limit::{
    backoff_for, Admission, ManualClock, RateLimiter, BURST_WINDOW_MS, MAX_BACKOFF_MS,
};

fn limiter(per_minute: u32, burst: u32) -> (Arc<RateLimiter>, ManualClock) {
    let clock = ManualClock::new(5_000_000);
    let limiter = RateLimiter::with_burst(per_minute, burst).with_clock(Arc::new(clock.clone()));
    (Arc::new(limiter), clock)
}

#[test]
fn test_steady_traffic_under_the_limit() {
    let (limiter, clock) = limiter(30, 10);

    // one request every 2s stays under both windows indefinitely
    for _ in 0..120 {
        assert!(limiter.can_proceed().is_allowed());
        clock.advance(Duration::from_secs(2));
    }
}

#[test]
fn test_minute_window_slides() {
    let (limiter, clock) = limiter(12, 12);

    for _ in 0..12 {
        assert!(limiter.can_proceed().is_allowed());
        clock.advance(Duration::from_secs(5));
    }
    // first admission was 60s ago and has just aged out
    assert!(limiter.can_proceed().is_allowed());
    assert!(matches!(limiter.can_proceed(), Admission::Blocked { .. }));
}

#[test]
fn test_burst_refusal_reports_remaining_wait() {
    let (limiter, clock) = limiter(100, 3);

    for _ in 0..3 {
        assert!(limiter.can_proceed().is_allowed());
        clock.advance(Duration::from_secs(1));
    }
    // oldest burst entry is 3s old
    assert_eq!(limiter.can_proceed().retry_after_ms(), Some(BURST_WINDOW_MS - 3_000));

    clock.advance(Duration::from_millis(BURST_WINDOW_MS - 3_000));
    assert!(limiter.can_proceed().is_allowed());
}

#[test]
fn test_backoff_escalates_and_resets() {
    let (limiter, clock) = limiter(30, 10);

    let mut applied = Vec::new();
    for _ in 0..6 {
        applied.push(limiter.record_violation().as_millis() as u64);
    }
    assert_eq!(applied, vec![30_000, 60_000, 120_000, 240_000, MAX_BACKOFF_MS, MAX_BACKOFF_MS]);
    assert_eq!(limiter.can_proceed().retry_after_ms(), Some(MAX_BACKOFF_MS));

    clock.advance(Duration::from_millis(MAX_BACKOFF_MS));
    assert!(limiter.can_proceed().is_allowed());

    limiter.record_success();
    assert_eq!(limiter.record_violation(), Duration::from_millis(backoff_for(1)));
}

#[test]
fn test_concurrent_callers_never_overshoot() {
    let (limiter, _clock) = limiter(25, 10);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let limiter = Arc::clone(&limiter);
            thread::spawn(move || (0..10).filter(|_| limiter.can_proceed().is_allowed()).count())
        })
        .collect();

    let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    // the clock is frozen, so only the burst cap applies
    assert_eq!(admitted, 10);
    assert_eq!(limiter.snapshot().in_window, 10);
}
