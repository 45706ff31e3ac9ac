//! Default timer: debounce between a first breach and a permanent default.
//!
//! A breach has to persist for `delay_until_default` seconds before the asset
//! is disabled. The timer only remembers when the current streak began, so
//! refreshing several times within the same instant never adds time.

use chrono::{DateTime, Duration, Utc};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DefaultTimer {
    iffy_since: Option<DateTime<Utc>>,
}

impl DefaultTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start the streak at `now` unless one is already running.
    pub fn start(&mut self, now: DateTime<Utc>) {
        self.iffy_since.get_or_insert(now);
    }

    /// Drop the streak; the breach resolved before defaulting.
    pub fn clear(&mut self) {
        self.iffy_since = None;
    }

    pub fn iffy_since(&self) -> Option<DateTime<Utc>> {
        self.iffy_since
    }

    /// Whether the running streak has lasted at least `delay_secs` at `now`.
    pub fn has_elapsed(&self, now: DateTime<Utc>, delay_secs: u64) -> bool {
        match self.iffy_since {
            Some(since) => {
                let elapsed = now.signed_duration_since(since).num_seconds().max(0) as u64;
                elapsed >= delay_secs
            }
            None => false,
        }
    }

    /// Instant at which the running streak turns into a default.
    pub fn when_default(&self, delay_secs: u64) -> Option<DateTime<Utc>> {
        let delay = Duration::try_seconds(delay_secs as i64)?;
        self.iffy_since?.checked_add_signed(delay)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_idle_timer_never_elapses() {
        let timer = DefaultTimer::new();
        assert!(!timer.has_elapsed(t0(), 0));
        assert_eq!(timer.when_default(60), None);
    }

    #[test]
    fn test_elapses_at_delay() {
        let mut timer = DefaultTimer::new();
        timer.start(t0());
        assert!(!timer.has_elapsed(t0() + Duration::seconds(59), 60));
        assert!(timer.has_elapsed(t0() + Duration::seconds(60), 60));
        assert_eq!(timer.when_default(60), Some(t0() + Duration::seconds(60)));
    }

    #[test]
    fn test_restart_does_not_move_streak() {
        let mut timer = DefaultTimer::new();
        timer.start(t0());
        timer.start(t0() + Duration::seconds(30));
        timer.start(t0() + Duration::seconds(30));
        assert_eq!(timer.iffy_since(), Some(t0()));
    }

    #[test]
    fn test_clear_resets_streak() {
        let mut timer = DefaultTimer::new();
        timer.start(t0());
        timer.clear();
        timer.start(t0() + Duration::seconds(100));
        assert!(!timer.has_elapsed(t0() + Duration::seconds(150), 60));
        assert!(timer.has_elapsed(t0() + Duration::seconds(160), 60));
    }

    #[test]
    fn test_clock_going_backwards_counts_as_zero() {
        let mut timer = DefaultTimer::new();
        timer.start(t0());
        assert!(!timer.has_elapsed(t0() - Duration::seconds(500), 60));
        assert!(timer.has_elapsed(t0() - Duration::seconds(500), 0));
    }
}
