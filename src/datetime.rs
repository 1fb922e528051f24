//! Conversion between W2 fractional day-of-year and calendar timestamps.
//!
//! Day 1.0 is midnight on January 1 of the reference year; the fractional
//! part is the time of day. Values beyond the length of the year roll into
//! the following years, so multi-year simulations need no special handling.
//! Conversion works in whole milliseconds, which makes
//! `to_calendar(to_julian(to_calendar(x)))` exact.

use crate::constants::MILLIS_PER_DAY;
use crate::error::{Result, W2Error};
use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Converts between fractional day-of-year and calendar time for one year
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayOfYearConverter {
    reference_year: i32,
    epoch: NaiveDateTime,
    round_millis: Option<i64>,
}

impl DayOfYearConverter {
    /// Create a converter; fails when no reference year is available
    pub fn new(reference_year: Option<i32>) -> Result<Self> {
        let year = reference_year
            .ok_or_else(|| {
                W2Error::date("reference year is required to convert day-of-year values")
            })?;
        let epoch = NaiveDate::from_ymd_opt(year, 1, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .ok_or_else(|| W2Error::date(format!("reference year {year} is out of range")))?;
        Ok(Self {
            reference_year: year,
            epoch,
            round_millis: None,
        })
    }

    /// Snap converted timestamps to a multiple of `seconds`
    pub fn with_rounding(mut self, seconds: u32) -> Self {
        self.round_millis = (seconds > 0).then(|| i64::from(seconds) * 1000);
        self
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    /// Calendar timestamp for a fractional day-of-year
    pub fn to_calendar(&self, day: f64) -> Result<NaiveDateTime> {
        if !day.is_finite() {
            return Err(W2Error::date(format!("day-of-year {day} is not a finite number")));
        }
        if day < 0.0 {
            return Err(W2Error::date(format!("day-of-year {day} is negative")));
        }

        let millis = ((day - 1.0) * MILLIS_PER_DAY).round();
        if millis.abs() > i64::MAX as f64 / 2.0 {
            return Err(W2Error::date(format!("day-of-year {day} is out of range")));
        }
        let mut millis = millis as i64;
        if let Some(step) = self.round_millis {
            millis = (millis as f64 / step as f64).round() as i64 * step;
        }

        Duration::try_milliseconds(millis)
            .and_then(|offset| self.epoch.checked_add_signed(offset))
            .ok_or_else(|| {
                W2Error::date(format!(
                    "day-of-year {day} is outside the calendar range from {}",
                    self.reference_year
                ))
            })
    }

    /// Fractional day-of-year for a calendar timestamp
    pub fn to_julian(&self, timestamp: NaiveDateTime) -> f64 {
        let offset = timestamp.signed_duration_since(self.epoch);
        offset.num_milliseconds() as f64 / MILLIS_PER_DAY + 1.0
    }

    /// Convert a column of day-of-year values
    pub fn days_to_calendar(&self, days: &[f64]) -> Result<Vec<NaiveDateTime>> {
        days.iter().map(|&day| self.to_calendar(day)).collect()
    }
}

/// Milliseconds since the Unix epoch, as stored in binary exports
pub fn to_epoch_millis(timestamp: NaiveDateTime) -> i64 {
    timestamp.and_utc().timestamp_millis()
}

/// Inverse of [`to_epoch_millis`]
pub fn from_epoch_millis(millis: i64) -> Option<NaiveDateTime> {
    chrono::DateTime::from_timestamp_millis(millis).map(|dt| dt.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::{Datelike, Timelike};
    use proptest::prelude::*;

    fn ts(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_day_one_is_new_year() {
        let conv = DayOfYearConverter::new(Some(2010)).unwrap();
        assert_eq!(conv.to_calendar(1.0).unwrap(), ts(2010, 1, 1, 0, 0, 0));
        assert_eq!(conv.to_calendar(1.5).unwrap(), ts(2010, 1, 1, 12, 0, 0));
        assert_eq!(conv.to_calendar(32.25).unwrap(), ts(2010, 2, 1, 6, 0, 0));
    }

    #[test]
    fn test_leap_year_day_60() {
        let leap = DayOfYearConverter::new(Some(2008)).unwrap();
        assert_eq!(leap.to_calendar(60.0).unwrap(), ts(2008, 2, 29, 0, 0, 0));
        let common = DayOfYearConverter::new(Some(2009)).unwrap();
        assert_eq!(common.to_calendar(60.0).unwrap(), ts(2009, 3, 1, 0, 0, 0));
    }

    #[test]
    fn test_days_roll_into_next_year() {
        let conv = DayOfYearConverter::new(Some(2010)).unwrap();
        assert_eq!(conv.to_calendar(366.0).unwrap(), ts(2011, 1, 1, 0, 0, 0));
        let leap = DayOfYearConverter::new(Some(2012)).unwrap();
        assert_eq!(leap.to_calendar(367.0).unwrap(), ts(2013, 1, 1, 0, 0, 0));
        let later = conv.to_calendar(731.5).unwrap();
        assert_eq!(later.year(), 2012);
        assert_eq!(later.hour(), 12);
    }

    #[test]
    fn test_day_zero_is_previous_year() {
        let conv = DayOfYearConverter::new(Some(2010)).unwrap();
        assert_eq!(conv.to_calendar(0.0).unwrap(), ts(2009, 12, 31, 0, 0, 0));
    }

    #[test]
    fn test_rejects_negative_and_non_finite() {
        let conv = DayOfYearConverter::new(Some(2010)).unwrap();
        assert!(matches!(conv.to_calendar(-0.5), Err(W2Error::DateConversion { .. })));
        assert!(conv.to_calendar(f64::NAN).is_err());
        assert!(conv.to_calendar(f64::INFINITY).is_err());
        assert!(conv.to_calendar(1e300).is_err());
    }

    #[test]
    fn test_missing_reference_year() {
        let err = DayOfYearConverter::new(None).unwrap_err();
        assert!(matches!(err, W2Error::DateConversion { line: None, .. }));
        assert!(DayOfYearConverter::new(Some(i32::MAX)).is_err());
    }

    #[test]
    fn test_hour_rounding() {
        let conv = DayOfYearConverter::new(Some(2010)).unwrap().with_rounding(3600);
        // 1.52 days = 12:28:48, nearest hour is 12:00
        assert_eq!(conv.to_calendar(1.52).unwrap(), ts(2010, 1, 1, 12, 0, 0));
        assert_eq!(conv.to_calendar(1.53).unwrap(), ts(2010, 1, 1, 13, 0, 0));
    }

    #[test]
    fn test_to_julian_inverse() {
        let conv = DayOfYearConverter::new(Some(2010)).unwrap();
        assert_relative_eq!(conv.to_julian(ts(2010, 1, 1, 0, 0, 0)), 1.0);
        assert_relative_eq!(conv.to_julian(ts(2010, 2, 1, 6, 0, 0)), 32.25);
        assert_relative_eq!(conv.to_julian(ts(2011, 1, 1, 0, 0, 0)), 366.0);
    }

    #[test]
    fn test_epoch_millis() {
        let t = ts(2010, 6, 15, 8, 30, 0);
        assert_eq!(from_epoch_millis(to_epoch_millis(t)), Some(t));
        assert_eq!(to_epoch_millis(ts(1970, 1, 1, 0, 0, 0)), 0);
    }

    proptest! {
        #[test]
        fn prop_calendar_round_trip(day in 0.0f64..3000.0, year in 1900i32..2100) {
            let conv = DayOfYearConverter::new(Some(year)).unwrap();
            let t = conv.to_calendar(day).unwrap();
            let back = conv.to_calendar(conv.to_julian(t)).unwrap();
            prop_assert_eq!(back, t);
        }

        #[test]
        fn prop_monotonic(a in 0.0f64..1000.0, b in 0.0f64..1000.0) {
            let conv = DayOfYearConverter::new(Some(2000)).unwrap();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(conv.to_calendar(lo).unwrap() <= conv.to_calendar(hi).unwrap());
        }
    }
}
