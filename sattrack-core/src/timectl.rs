//! Simulation-time controller.
//!
//! Owns the mapping from elapsed wall-clock time to simulated Julian day
//! numbers. Simulated time advances by `elapsed × throttle`; a throttle of
//! zero freezes it, negative throttles run it backwards. A manual jump is
//! one-shot: it is consumed by the next [`TimeController::advance`] and the
//! previous samples are resynchronized so the discontinuity is not mistaken
//! for elapsed time.

use chrono::{DateTime, Utc};

use crate::time::{SECONDS_PER_DAY, julian_date};

/// Smallest accepted throttle factor (reverse time).
pub const THROTTLE_MIN: i32 = -10;
/// Largest accepted throttle factor.
pub const THROTTLE_MAX: i32 = 10;

/// Time-mode sub-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeMode {
    /// Simulated time tracks real time scaled by the throttle.
    Running,
    /// Throttle is zero; simulated time is frozen.
    Stopped,
    /// A manual jump is pending and will be consumed by the next tick.
    ManualJump,
}

pub struct TimeController {
    throttle: i32,
    /// Real time at the previous advance, `None` until the first one.
    rt_prev: Option<DateTime<Utc>>,
    /// Day number at the previous advance.
    pdnum: f64,
    /// Day number at the current advance.
    cdnum: f64,
    /// Requested simulated time, consumed exactly once.
    pending_jump: Option<f64>,
}

impl TimeController {
    pub fn new(start: DateTime<Utc>, throttle: i32) -> Self {
        let dnum = julian_date(start);
        Self {
            throttle: throttle.clamp(THROTTLE_MIN, THROTTLE_MAX),
            rt_prev: None,
            pdnum: dnum,
            cdnum: dnum,
            pending_jump: None,
        }
    }

    /// Advance to wall-clock `now` and return the new simulated day number.
    ///
    /// A pending manual jump wins over normal advancement and is cleared
    /// here; the real-time sample is resynchronized in the same step. The
    /// first advance after construction or a jump sees zero elapsed time.
    pub fn advance(&mut self, now: DateTime<Utc>) -> f64 {
        if let Some(target) = self.pending_jump.take() {
            self.pdnum = target;
            self.cdnum = target;
            self.rt_prev = Some(now);
            return self.cdnum;
        }

        let elapsed_days = match self.rt_prev {
            Some(prev) => (now - prev).num_milliseconds() as f64 / (1000.0 * SECONDS_PER_DAY),
            None => 0.0,
        };
        self.pdnum = self.cdnum;
        self.cdnum = self.pdnum + elapsed_days * f64::from(self.throttle);
        self.rt_prev = Some(now);
        self.cdnum
    }

    /// Set the throttle, clamped to [`THROTTLE_MIN`]..=[`THROTTLE_MAX`].
    ///
    /// Takes effect on the next advance; does not itself advance time.
    pub fn set_throttle(&mut self, factor: i32) {
        self.throttle = factor.clamp(THROTTLE_MIN, THROTTLE_MAX);
    }

    pub fn throttle(&self) -> i32 {
        self.throttle
    }

    /// Request a one-shot jump to the given simulated day number.
    pub fn set_manual_daynum(&mut self, daynum: f64) {
        self.pending_jump = Some(daynum);
    }

    /// Request a one-shot jump to the given simulated instant.
    pub fn set_manual_time(&mut self, t: DateTime<Utc>) {
        self.set_manual_daynum(julian_date(t));
    }

    pub fn current_daynum(&self) -> f64 {
        self.cdnum
    }

    pub fn previous_daynum(&self) -> f64 {
        self.pdnum
    }

    pub fn mode(&self) -> TimeMode {
        if self.pending_jump.is_some() {
            TimeMode::ManualJump
        } else if self.throttle == 0 {
            TimeMode::Stopped
        } else {
            TimeMode::Running
        }
    }

    /// Status label in the tracker convention: `RT` for real time, `SRT`
    /// for simulated real time (running at a non-unit rate), `MAN` for
    /// stopped or manually controlled time.
    pub fn state_label(&self) -> &'static str {
        match self.mode() {
            TimeMode::Running if self.throttle == 1 => "RT",
            TimeMode::Running => "SRT",
            TimeMode::Stopped | TimeMode::ManualJump => "MAN",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    const EPS: f64 = 1e-9;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 8, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_first_advance_has_no_elapsed_time() {
        let t0 = start();
        let mut tc = TimeController::new(t0, 5);
        let before = tc.current_daynum();
        assert!((tc.advance(t0) - before).abs() < EPS);
    }

    #[test]
    fn test_advance_scales_elapsed_by_throttle() {
        let t0 = start();
        let mut tc = TimeController::new(t0, 5);
        tc.advance(t0);
        let d1 = tc.current_daynum();
        let d2 = tc.advance(t0 + Duration::seconds(10));
        // 10 s of real time at 5x is 50 simulated seconds.
        assert!((d2 - d1 - 50.0 / SECONDS_PER_DAY).abs() < EPS);
        assert!((tc.previous_daynum() - d1).abs() < EPS);
    }

    #[test]
    fn test_negative_throttle_runs_backwards() {
        let t0 = start();
        let mut tc = TimeController::new(t0, -3);
        tc.advance(t0);
        let d1 = tc.current_daynum();
        let d2 = tc.advance(t0 + Duration::seconds(20));
        assert!((d1 - d2 - 60.0 / SECONDS_PER_DAY).abs() < EPS);
    }

    #[test]
    fn test_zero_throttle_freezes_time() {
        let t0 = start();
        let mut tc = TimeController::new(t0, 0);
        let before = tc.current_daynum();
        for i in 1..=10 {
            tc.advance(t0 + Duration::seconds(i * 60));
        }
        assert_eq!(tc.current_daynum(), before);
        assert_eq!(tc.mode(), TimeMode::Stopped);
    }

    #[test]
    fn test_throttle_is_clamped() {
        let mut tc = TimeController::new(start(), 99);
        assert_eq!(tc.throttle(), THROTTLE_MAX);
        tc.set_throttle(-99);
        assert_eq!(tc.throttle(), THROTTLE_MIN);
    }

    #[test]
    fn test_manual_jump_is_consumed_exactly_once() {
        let t0 = start();
        let mut tc = TimeController::new(t0, 2);
        tc.advance(t0);

        let target = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        tc.set_manual_time(target);
        assert_eq!(tc.mode(), TimeMode::ManualJump);

        let jumped = tc.advance(t0 + Duration::seconds(30));
        assert!((jumped - julian_date(target)).abs() < EPS);
        assert_eq!(tc.mode(), TimeMode::Running);

        // The next advance resumes normal advancement from the jump target;
        // the 30 s gap before the jump must not leak in.
        let resumed = tc.advance(t0 + Duration::seconds(40));
        assert!((resumed - jumped - 20.0 / SECONDS_PER_DAY).abs() < EPS);
    }

    #[test]
    fn test_manual_jump_returns_to_stopped_when_throttle_zero() {
        let t0 = start();
        let mut tc = TimeController::new(t0, 0);
        tc.advance(t0);
        tc.set_manual_daynum(2_451_545.0);
        tc.advance(t0 + Duration::seconds(5));
        assert_eq!(tc.mode(), TimeMode::Stopped);
        let frozen = tc.advance(t0 + Duration::seconds(90));
        assert!((frozen - 2_451_545.0).abs() < EPS);
    }

    #[test]
    fn test_state_labels() {
        let mut tc = TimeController::new(start(), 1);
        assert_eq!(tc.state_label(), "RT");
        tc.set_throttle(7);
        assert_eq!(tc.state_label(), "SRT");
        tc.set_throttle(0);
        assert_eq!(tc.state_label(), "MAN");
        tc.set_manual_daynum(2_451_545.0);
        assert_eq!(tc.state_label(), "MAN");
    }
}
