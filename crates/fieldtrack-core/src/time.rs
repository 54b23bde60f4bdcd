//! Time helpers shared by the store and the query layer.
//!
//! Every instant the service persists is truncated to microseconds, the
//! precision of the storage encoding, so a value read back compares equal to
//! the value that was written.

use chrono::{DateTime, Days, NaiveDate, SubsecRound as _, Utc};

use crate::{Error, Result};

/// The current instant at storage precision.
pub fn now() -> DateTime<Utc> { truncate(Utc::now()) }

/// Drop sub-microsecond precision.
pub fn truncate(at: DateTime<Utc>) -> DateTime<Utc> { at.trunc_subsecs(6) }

/// A half-open UTC calendar day, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
  pub date:  NaiveDate,
  pub start: DateTime<Utc>,
  pub end:   DateTime<Utc>,
}

impl DayWindow {
  pub fn for_date(date: NaiveDate) -> Self {
    let start = date.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
    let end = next.and_hms_opt(0, 0, 0).unwrap_or_default().and_utc();
    Self { date, start, end }
  }

  /// The UTC day containing `at`.
  pub fn containing(at: DateTime<Utc>) -> Self { Self::for_date(at.date_naive()) }

  /// Parse an optional `YYYY-MM-DD` parameter; `None` means today (UTC).
  pub fn parse_or_today(raw: Option<&str>) -> Result<Self> {
    match raw {
      Some(s) => parse_date(s).map(Self::for_date),
      None => Ok(Self::containing(Utc::now())),
    }
  }

  pub fn contains(&self, at: DateTime<Utc>) -> bool { self.start <= at && at < self.end }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
    .map_err(|_| Error::InvalidDate(raw.to_owned()))
}

/// Parse an instant given either as RFC 3339 or as a bare `YYYY-MM-DD`
/// (midnight UTC).
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>> {
  let trimmed = raw.trim();
  if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
    return Ok(truncate(dt.with_timezone(&Utc)));
  }
  parse_date(trimmed).map(|d| DayWindow::for_date(d).start)
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Timelike};

  use super::*;

  #[test]
  fn day_window_is_half_open() {
    let w = DayWindow::for_date(NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
    let last_ms = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 59).unwrap()
      + chrono::Duration::milliseconds(999);
    let next_midnight = Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap();

    assert!(w.contains(w.start));
    assert!(w.contains(last_ms));
    assert!(!w.contains(next_midnight));
    assert_eq!(w.end, next_midnight);
  }

  #[test]
  fn day_window_handles_month_end() {
    let w = DayWindow::for_date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
    assert_eq!(w.end, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
  }

  #[test]
  fn parse_date_rejects_garbage() {
    assert!(matches!(parse_date("09/03/2024"), Err(Error::InvalidDate(_))));
    assert!(parse_date("2024-13-01").is_err());
    assert!(DayWindow::parse_or_today(Some("yesterday")).is_err());
  }

  #[test]
  fn parse_instant_accepts_both_forms() {
    let a = parse_instant("2024-03-09T10:15:00+02:00").unwrap();
    assert_eq!(a, Utc.with_ymd_and_hms(2024, 3, 9, 8, 15, 0).unwrap());

    let b = parse_instant("2024-03-09").unwrap();
    assert_eq!(b, Utc.with_ymd_and_hms(2024, 3, 9, 0, 0, 0).unwrap());
  }

  #[test]
  fn truncate_keeps_microseconds() {
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
      + chrono::Duration::nanoseconds(1_234_567);
    assert_eq!(truncate(at).nanosecond(), 1_234_000);
  }
}
