#![forbid(unsafe_code)]

//! Update cadence for the tick orchestrator.

use std::time::{Duration, Instant};

pub const MIN_INTERVAL_MS: u64 = 100;
pub const MAX_INTERVAL_MS: u64 = 86_399_900;

/// Deadline of the next sample cycle: last stamp plus the interval.
#[derive(Debug, Clone)]
pub struct Timer {
    stamp: Instant,
    interval: Duration,
    /// One-shot: the next [`not_zero`](Self::not_zero) reports expiry.
    forced: bool,
}

impl Timer {
    #[must_use]
    pub fn new(interval_ms: u64) -> Self {
        Self {
            stamp: Instant::now(),
            interval: Duration::from_millis(clamp_interval(interval_ms)),
            forced: false,
        }
    }

    /// Start a new interval from now.
    pub fn stamp(&mut self) {
        self.stamp = Instant::now();
    }

    /// Whether time remains before the deadline. Consumes a pending
    /// [`finish`](Self::finish).
    pub fn not_zero(&mut self) -> bool {
        if std::mem::take(&mut self.forced) {
            return false;
        }
        !self.left().is_zero()
    }

    /// Time until the deadline, zero once it has passed.
    #[must_use]
    pub fn left(&self) -> Duration {
        (self.stamp + self.interval).saturating_duration_since(Instant::now())
    }

    /// Move the deadline to now.
    pub fn finish(&mut self) {
        self.forced = true;
        self.stamp = Instant::now()
            .checked_sub(self.interval)
            .unwrap_or_else(Instant::now);
    }

    #[must_use]
    pub fn interval(&self) -> Duration {
        self.interval
    }

    #[must_use]
    pub fn interval_ms(&self) -> u64 {
        self.interval.as_millis() as u64
    }

    /// Change the interval, clamped to the supported range. The current
    /// stamp is kept.
    pub fn set_interval(&mut self, interval_ms: u64) {
        self.interval = Duration::from_millis(clamp_interval(interval_ms));
    }
}

#[must_use]
pub fn clamp_interval(interval_ms: u64) -> u64 {
    interval_ms.clamp(MIN_INTERVAL_MS, MAX_INTERVAL_MS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_timer_has_time_left() {
        let mut timer = Timer::new(10_000);
        assert!(timer.not_zero());
        assert!(timer.left() > Duration::from_secs(9));
    }

    #[test]
    fn interval_is_clamped() {
        assert_eq!(Timer::new(5).interval_ms(), MIN_INTERVAL_MS);
        assert_eq!(Timer::new(u64::MAX).interval_ms(), MAX_INTERVAL_MS);
        let mut timer = Timer::new(2000);
        timer.set_interval(50);
        assert_eq!(timer.interval(), Duration::from_millis(100));
    }

    #[test]
    fn finish_expires_once() {
        let mut timer = Timer::new(10_000);
        timer.finish();
        assert_eq!(timer.left(), Duration::ZERO);
        assert!(!timer.not_zero());
        timer.stamp();
        assert!(timer.not_zero());
    }

    #[test]
    fn short_interval_runs_out() {
        let mut timer = Timer::new(100);
        std::thread::sleep(Duration::from_millis(120));
        assert!(!timer.not_zero());
        assert_eq!(timer.left(), Duration::ZERO);
    }
}
