//! Julian day numbers and the wall-clock seam.
//!
//! Simulated time is carried as a Julian day number (`f64` days), the same
//! axis the tracking views consume. Conversions go through Unix epoch
//! milliseconds, which is plenty of resolution for tick intervals in the
//! hundreds of milliseconds.

use chrono::{DateTime, Utc};

/// Seconds per solar day.
pub const SECONDS_PER_DAY: f64 = 86_400.0;

/// Julian day number of the Unix epoch (1970-01-01 00:00:00 UTC).
pub const JDN_UNIX_EPOCH: f64 = 2_440_587.5;

/// Julian day number for a point in time.
pub fn julian_date(t: DateTime<Utc>) -> f64 {
    JDN_UNIX_EPOCH + t.timestamp_millis() as f64 / (1000.0 * SECONDS_PER_DAY)
}

/// Inverse of [`julian_date`], at millisecond resolution.
///
/// Returns `None` for day numbers outside the range `chrono` can represent.
pub fn daynum_to_datetime(daynum: f64) -> Option<DateTime<Utc>> {
    let millis = (daynum - JDN_UNIX_EPOCH) * SECONDS_PER_DAY * 1000.0;
    if !millis.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis(millis.round() as i64)
}

/// Wall-clock source.
///
/// The module samples real time through this seam once per tick, so tests
/// can drive ticks with known elapsed time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
