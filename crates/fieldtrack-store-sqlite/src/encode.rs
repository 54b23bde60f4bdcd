//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings with microsecond
//! precision and a `Z` suffix, so lexical order equals chronological order
//! and range predicates can compare strings directly. UUIDs are stored as
//! hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use fieldtrack_core::{
  identity::{Identity, IdentityKind},
  job::Job,
  location::LocationPoint,
  summary::CalendarDay,
  user::{PendingCredential, User},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(format!("timestamp {s:?}: {e}")))
}

fn decode_opt_dt(s: Option<String>) -> Result<Option<DateTime<Utc>>> {
  s.as_deref().map(decode_dt).transpose()
}

// ─── IdentityKind ─────────────────────────────────────────────────────────────

pub fn encode_identity_kind(k: IdentityKind) -> &'static str {
  match k {
    IdentityKind::Email => "email",
    IdentityKind::Phone => "phone",
  }
}

pub fn decode_identity_kind(s: &str) -> Result<IdentityKind> {
  match s {
    "email" => Ok(IdentityKind::Email),
    "phone" => Ok(IdentityKind::Phone),
    other => Err(Error::Decode(format!("unknown identity kind: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const USER_COLUMNS: &str = "user_id, identity_kind, identity, verified, is_active,
  credential_digest, credential_expires_at, last_login_at, created_at, current_job_id";

/// Raw values read directly from a `users` row.
pub struct RawUser {
  pub user_id:               String,
  pub identity_kind:         String,
  pub identity:              String,
  pub verified:              bool,
  pub is_active:             bool,
  pub credential_digest:     Option<String>,
  pub credential_expires_at: Option<String>,
  pub last_login_at:         Option<String>,
  pub created_at:            String,
  pub current_job_id:        Option<String>,
}

impl RawUser {
  /// Map a row selected with [`USER_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:               row.get(0)?,
      identity_kind:         row.get(1)?,
      identity:              row.get(2)?,
      verified:              row.get(3)?,
      is_active:             row.get(4)?,
      credential_digest:     row.get(5)?,
      credential_expires_at: row.get(6)?,
      last_login_at:         row.get(7)?,
      created_at:            row.get(8)?,
      current_job_id:        row.get(9)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    let kind = decode_identity_kind(&self.identity_kind)?;

    // Digest and expiry are written and cleared together.
    let pending = match (self.credential_digest, self.credential_expires_at) {
      (Some(digest), Some(expires)) => Some(PendingCredential {
        digest,
        expires_at: decode_dt(&expires)?,
      }),
      _ => None,
    };

    Ok(User {
      user_id: decode_uuid(&self.user_id)?,
      identity: Identity::from_parts(kind, self.identity),
      verified: self.verified,
      is_active: self.is_active,
      pending,
      last_login_at: decode_opt_dt(self.last_login_at)?,
      created_at: decode_dt(&self.created_at)?,
      current_job_id: decode_opt_uuid(self.current_job_id)?,
    })
  }
}

pub const JOB_COLUMNS: &str = "job_id, user_id, device_id, started_at, ended_at,
  login_photo, logout_photo, is_active";

/// Raw values read from a `jobs` row plus the ids of its locations.
pub struct RawJob {
  pub job_id:       String,
  pub user_id:      String,
  pub device_id:    String,
  pub started_at:   String,
  pub ended_at:     Option<String>,
  pub login_photo:  Option<String>,
  pub logout_photo: Option<String>,
  pub is_active:    bool,
  pub location_ids: Vec<String>,
}

impl RawJob {
  /// Map a row selected with [`JOB_COLUMNS`]; `location_ids` is filled in by
  /// the caller.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      job_id:       row.get(0)?,
      user_id:      row.get(1)?,
      device_id:    row.get(2)?,
      started_at:   row.get(3)?,
      ended_at:     row.get(4)?,
      login_photo:  row.get(5)?,
      logout_photo: row.get(6)?,
      is_active:    row.get(7)?,
      location_ids: vec![],
    })
  }

  pub fn into_job(self) -> Result<Job> {
    Ok(Job {
      job_id:       decode_uuid(&self.job_id)?,
      user_id:      decode_uuid(&self.user_id)?,
      device_id:    self.device_id,
      started_at:   decode_dt(&self.started_at)?,
      ended_at:     decode_opt_dt(self.ended_at)?,
      login_photo:  self.login_photo,
      logout_photo: self.logout_photo,
      is_active:    self.is_active,
      location_ids: self
        .location_ids
        .iter()
        .map(|s| decode_uuid(s))
        .collect::<Result<_>>()?,
    })
  }
}

pub const LOCATION_COLUMNS: &str = "location_id, user_id, job_id, latitude, longitude,
  recorded_at, place_name, address, accuracy, is_stationary, stationary_duration";

/// Raw values read directly from a `locations` row.
pub struct RawLocation {
  pub location_id:         String,
  pub user_id:             String,
  pub job_id:              Option<String>,
  pub latitude:            f64,
  pub longitude:           f64,
  pub recorded_at:         String,
  pub place_name:          Option<String>,
  pub address:             Option<String>,
  pub accuracy:            Option<f64>,
  pub is_stationary:       bool,
  pub stationary_duration: Option<f64>,
}

impl RawLocation {
  /// Map a row selected with [`LOCATION_COLUMNS`].
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      location_id:         row.get(0)?,
      user_id:             row.get(1)?,
      job_id:              row.get(2)?,
      latitude:            row.get(3)?,
      longitude:           row.get(4)?,
      recorded_at:         row.get(5)?,
      place_name:          row.get(6)?,
      address:             row.get(7)?,
      accuracy:            row.get(8)?,
      is_stationary:       row.get(9)?,
      stationary_duration: row.get(10)?,
    })
  }

  pub fn into_point(self) -> Result<LocationPoint> {
    Ok(LocationPoint {
      location_id:         decode_uuid(&self.location_id)?,
      user_id:             decode_uuid(&self.user_id)?,
      job_id:              decode_opt_uuid(self.job_id)?,
      latitude:            self.latitude,
      longitude:           self.longitude,
      timestamp:           decode_dt(&self.recorded_at)?,
      place_name:          self.place_name,
      address:             self.address,
      accuracy:            self.accuracy,
      is_stationary:       self.is_stationary,
      stationary_duration: self.stationary_duration,
    })
  }
}

/// One aggregated `GROUP BY` day of the calendar query.
pub struct RawCalendarDay {
  pub day:      String,
  pub count:    i64,
  pub earliest: String,
}

impl RawCalendarDay {
  pub fn into_day(self) -> Result<CalendarDay> {
    Ok(CalendarDay {
      date:      NaiveDate::parse_from_str(&self.day, "%Y-%m-%d")
        .map_err(|e| Error::Decode(format!("calendar day {:?}: {e}", self.day)))?,
      count:     u64::try_from(self.count).unwrap_or_default(),
      timestamp: decode_dt(&self.earliest)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;

  #[test]
  fn encoded_timestamps_sort_lexically() {
    let a = Utc.with_ymd_and_hms(2024, 1, 1, 23, 59, 59).unwrap()
      + chrono::Duration::milliseconds(999);
    let b = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();

    let (ea, eb) = (encode_dt(a), encode_dt(b));
    assert_eq!(ea, "2024-01-01T23:59:59.999000Z");
    assert_eq!(eb, "2024-01-02T00:00:00.000000Z");
    assert!(ea < eb);
    assert_eq!(decode_dt(&ea).unwrap(), a);
  }

  #[test]
  fn unknown_identity_kind_is_a_decode_error() {
    assert!(matches!(decode_identity_kind("fax"), Err(Error::Decode(_))));
  }
}
