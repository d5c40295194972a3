//! # Temporal Types: Validity Periods and the Calendar Clock
//!
//! Document validity is calendar arithmetic on dates, never on instants.
//! This module defines:
//!
//! - [`ValidityPeriod`]: a typed duration, either a number of days or a
//!   number of months. Both units are supported so each Document Type can
//!   express its rule naturally (a 90-day permit, a 12-month license).
//! - [`Clock`]: the single source of "today". Production code uses
//!   [`SystemClock`]; tests and replay runs use [`FixedClock`].
//!
//! ## Month Arithmetic
//!
//! Adding months keeps the day of month and clamps to the last day of the
//! target month when that day does not exist: `2024-01-31 + 1 month`
//! is `2024-02-29`, `2023-01-31 + 1 month` is `2023-02-28`.

use chrono::{DateTime, Days, Months, NaiveDate, NaiveTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// How long a document stays valid after its reference date.
///
/// Serialized as `{ "unit": "days", "count": 30 }` or
/// `{ "unit": "months", "count": 12 }`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "unit", content = "count")]
pub enum ValidityPeriod {
    /// A number of calendar days.
    Days(u32),
    /// A number of calendar months (clamped to month end).
    Months(u32),
}

impl ValidityPeriod {
    /// Whether the period has a non-zero length.
    ///
    /// A zero-length period is treated the same as an unset one.
    pub fn is_defined(&self) -> bool {
        match self {
            Self::Days(n) | Self::Months(n) => *n > 0,
        }
    }

    /// Add this period to `date`.
    ///
    /// Returns `None` only when the result falls outside the representable
    /// date range.
    pub fn add_to(&self, date: NaiveDate) -> Option<NaiveDate> {
        match self {
            Self::Days(n) => date.checked_add_days(Days::new(u64::from(*n))),
            Self::Months(n) => date.checked_add_months(Months::new(*n)),
        }
    }
}

impl std::fmt::Display for ValidityPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Days(1) => f.write_str("1 day"),
            Self::Days(n) => write!(f, "{n} days"),
            Self::Months(1) => f.write_str("1 month"),
            Self::Months(n) => write!(f, "{n} months"),
        }
    }
}

/// Source of the current date.
///
/// Injected into the sweep and the service so that date-dependent behavior
/// is reproducible in tests.
pub trait Clock: Send + Sync {
    /// The current calendar date.
    fn today(&self) -> NaiveDate;

    /// The current instant, used for creation timestamps and audit records.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock pinned to a settable date.
///
/// `now()` reports midnight UTC of the pinned date.
#[derive(Debug)]
pub struct FixedClock {
    date: Mutex<NaiveDate>,
}

impl FixedClock {
    /// Create a clock pinned to `date`.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date: Mutex::new(date),
        }
    }

    /// Move the clock to `date`.
    pub fn set(&self, date: NaiveDate) {
        *self.date.lock() = date;
    }

    /// Move the clock forward by `days`.
    pub fn advance_days(&self, days: u64) {
        let mut guard = self.date.lock();
        if let Some(next) = guard.checked_add_days(Days::new(days)) {
            *guard = next;
        }
    }
}

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        *self.date.lock()
    }

    fn now(&self) -> DateTime<Utc> {
        self.today().and_time(NaiveTime::default()).and_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_days_boundary() {
        let p = ValidityPeriod::Days(30);
        assert_eq!(p.add_to(date(2024, 1, 1)), Some(date(2024, 1, 31)));
    }

    #[test]
    fn test_days_cross_leap_february() {
        let p = ValidityPeriod::Days(30);
        assert_eq!(p.add_to(date(2024, 1, 31)), Some(date(2024, 3, 1)));
    }

    #[test]
    fn test_months_clamp_to_month_end() {
        let p = ValidityPeriod::Months(1);
        assert_eq!(p.add_to(date(2024, 1, 31)), Some(date(2024, 2, 29)));
        assert_eq!(p.add_to(date(2023, 1, 31)), Some(date(2023, 2, 28)));
    }

    #[test]
    fn test_months_across_year() {
        let p = ValidityPeriod::Months(12);
        assert_eq!(p.add_to(date(2024, 3, 15)), Some(date(2025, 3, 15)));
    }

    #[test]
    fn test_zero_is_undefined() {
        assert!(!ValidityPeriod::Days(0).is_defined());
        assert!(!ValidityPeriod::Months(0).is_defined());
        assert!(ValidityPeriod::Days(1).is_defined());
    }

    #[test]
    fn test_display() {
        assert_eq!(ValidityPeriod::Days(1).to_string(), "1 day");
        assert_eq!(ValidityPeriod::Days(90).to_string(), "90 days");
        assert_eq!(ValidityPeriod::Months(12).to_string(), "12 months");
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_string(&ValidityPeriod::Days(30)).unwrap();
        assert_eq!(json, r#"{"unit":"days","count":30}"#);
        let parsed: ValidityPeriod = serde_yaml::from_str("unit: months\ncount: 6").unwrap();
        assert_eq!(parsed, ValidityPeriod::Months(6));
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(date(2024, 2, 28));
        assert_eq!(clock.today(), date(2024, 2, 28));
        clock.advance_days(2);
        assert_eq!(clock.today(), date(2024, 3, 1));
        clock.set(date(2025, 1, 1));
        assert_eq!(clock.now().date_naive(), date(2025, 1, 1));
    }
}
