//! Daily trigger for the expiry sweep.

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ScheduleError;

/// Fires once per calendar date (UTC), at or after `hour_utc`.
///
/// A daemon that was down at the configured hour fires on its first poll
/// after the hour on the same date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailySchedule {
    hour_utc: u32,
    last_run: Option<NaiveDate>,
}

impl DailySchedule {
    /// A schedule firing at `hour_utc` (0..=23).
    pub fn new(hour_utc: u32) -> Result<Self, ScheduleError> {
        if hour_utc > 23 {
            return Err(ScheduleError::InvalidHour { hour: hour_utc });
        }
        Ok(Self {
            hour_utc,
            last_run: None,
        })
    }

    /// The configured hour.
    pub fn hour_utc(&self) -> u32 {
        self.hour_utc
    }

    /// The date of the last run, if any.
    pub fn last_run(&self) -> Option<NaiveDate> {
        self.last_run
    }

    /// Whether a run is due at `now`.
    pub fn should_fire(&self, now: DateTime<Utc>) -> bool {
        if now.hour() < self.hour_utc {
            return false;
        }
        // Don't fire twice for the same date.
        self.last_run.map_or(true, |last| last < now.date_naive())
    }

    /// Record a run on `date`.
    pub fn mark_fired(&mut self, date: NaiveDate) {
        self.last_run = Some(date);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, d, h, m, 0).unwrap()
    }

    #[test]
    fn test_invalid_hour() {
        assert_eq!(
            DailySchedule::new(24),
            Err(ScheduleError::InvalidHour { hour: 24 })
        );
    }

    #[test]
    fn test_fires_once_per_date() {
        let mut s = DailySchedule::new(2).unwrap();
        assert!(!s.should_fire(at(1, 1, 59)));
        assert!(s.should_fire(at(1, 2, 0)));
        s.mark_fired(at(1, 2, 0).date_naive());
        assert!(!s.should_fire(at(1, 2, 1)));
        assert!(!s.should_fire(at(1, 23, 59)));
        assert!(!s.should_fire(at(2, 1, 0)));
        assert!(s.should_fire(at(2, 2, 0)));
    }

    #[test]
    fn test_catches_up_after_missed_hour() {
        let mut s = DailySchedule::new(0).unwrap();
        s.mark_fired(at(1, 0, 0).date_naive());
        // Down for all of March 2nd until mid-afternoon.
        assert!(s.should_fire(at(2, 15, 30)));
    }
}
