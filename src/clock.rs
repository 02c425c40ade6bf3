//! Wall-clock access and the compensated-second calculation.
use chrono::{DateTime, Local, Timelike};

/// Source of wall-clock readings, swappable in tests.
pub trait WallClock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Local system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Always returns the same instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Local>);

impl WallClock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        self.0
    }
}

/// Seconds within the minute plus the sub-second fraction, e.g. `12.75`.
pub fn second_of_minute(t: &DateTime<Local>) -> f64 {
    // timestamp_subsec_micros can exceed 999_999 during a leap second; left as-is.
    t.second() as f64 + t.timestamp_subsec_micros() as f64 / 1_000_000.0
}

/// `second_of_minute + offset` rounded half to even. The result is not wrapped at 60.
pub fn compensated_second(t: &DateTime<Local>, offset_secs: f64) -> i64 {
    (second_of_minute(t) + offset_secs).round_ties_even() as i64
}
