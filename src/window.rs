use chrono::{Duration, Utc};

use crate::models::QueryOptions;

/// How far back a read reaches when no start is given.
pub const DEFAULT_LOOKBACK_HOURS: i64 = 8;

/// Source of "now" for default read windows, in epoch milliseconds.
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// A clock frozen at one instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub i64);

impl Clock for FixedClock {
    fn now_millis(&self) -> i64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: i64,
    pub end: i64,
}

/// `[now - 8h, now]`.
pub fn default_window(now: i64) -> TimeWindow {
    TimeWindow {
        start: now - Duration::hours(DEFAULT_LOOKBACK_HOURS).num_milliseconds(),
        end: now,
    }
}

/// Fills in whichever bound the options leave open.
pub fn resolve_window(options: &QueryOptions, now: i64) -> TimeWindow {
    let fallback = default_window(now);
    TimeWindow {
        start: options.start.unwrap_or(fallback.start),
        end: options.end.unwrap_or(fallback.end),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;
    const EIGHT_HOURS_MS: i64 = 8 * 60 * 60 * 1000;

    #[test]
    fn test_default_window_is_eight_hours() {
        let window = default_window(NOW);
        assert_eq!(window.end, NOW);
        assert_eq!(window.start, NOW - EIGHT_HOURS_MS);
    }

    #[test]
    fn test_explicit_bounds_win() {
        let opts = QueryOptions::new().start(5).end(10);
        assert_eq!(resolve_window(&opts, NOW), TimeWindow { start: 5, end: 10 });

        let only_start = QueryOptions::new().start(5);
        assert_eq!(
            resolve_window(&only_start, NOW),
            TimeWindow { start: 5, end: NOW }
        );
    }

    #[test]
    fn test_system_clock_moves_forward() {
        let clock = SystemClock;
        let first = clock.now_millis();
        let second = clock.now_millis();
        assert!(second >= first);
        assert!(first > NOW);
    }
}
