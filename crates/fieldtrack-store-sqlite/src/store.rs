//! [`SqliteStore`], the SQLite implementation of [`TrackerStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use fieldtrack_core::{
  identity::Identity,
  job::{Job, NewJob},
  location::{LocationPoint, NewLocation},
  store::{JobQuery, LocationQuery, TrackerStore},
  summary::CalendarDay,
  time,
  user::{PendingCredential, User},
};

use crate::{
  encode::{
    JOB_COLUMNS, LOCATION_COLUMNS, RawCalendarDay, RawJob, RawLocation, RawUser,
    USER_COLUMNS, encode_dt, encode_identity_kind, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A fieldtrack store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// Outcome of a write guarded by a job precondition, decided inside the
/// transaction and translated to an error outside it.
enum Guarded<T> {
  Done(T),
  Missing,
  Inactive,
}

/// Outcome of redeeming a one-time credential.
enum Redeemed {
  Done(RawUser),
  Missing,
  Mismatch,
  Expired,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn select_user(&self, sql: String, key: Vec<String>) -> Result<Option<User>> {
    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(&sql, rusqlite::params_from_iter(key), RawUser::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }
}

// ─── Connection-level helpers ────────────────────────────────────────────────

fn job_location_ids(
  conn: &rusqlite::Connection,
  job_id: &str,
) -> rusqlite::Result<Vec<String>> {
  let mut stmt = conn
    .prepare_cached("SELECT location_id FROM locations WHERE job_id = ?1 ORDER BY seq")?;
  stmt
    .query_map(rusqlite::params![job_id], |row| row.get(0))?
    .collect()
}

fn select_job(conn: &rusqlite::Connection, job_id: &str) -> rusqlite::Result<Option<RawJob>> {
  let raw = conn
    .query_row(
      &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE job_id = ?1"),
      rusqlite::params![job_id],
      RawJob::from_row,
    )
    .optional()?;

  match raw {
    Some(mut raw) => {
      raw.location_ids = job_location_ids(conn, job_id)?;
      Ok(Some(raw))
    }
    None => Ok(None),
  }
}

// ─── TrackerStore impl ───────────────────────────────────────────────────────

impl TrackerStore for SqliteStore {
  type Error = Error;

  // ── Users / credentials ───────────────────────────────────────────────────

  async fn upsert_identity(&self, identity: Identity) -> Result<User> {
    let id_str     = encode_uuid(Uuid::new_v4());
    let kind_str   = encode_identity_kind(identity.kind()).to_owned();
    let value      = identity.as_str().to_owned();
    let created_at = encode_dt(time::now());

    let raw: RawUser = self
      .conn
      .call(move |conn| {
        // The UNIQUE constraint arbitrates concurrent first registrations;
        // the loser's insert becomes a no-op and both read the same row.
        conn.execute(
          "INSERT INTO users (user_id, identity_kind, identity, created_at)
           VALUES (?1, ?2, ?3, ?4)
           ON CONFLICT (identity_kind, identity) DO NOTHING",
          rusqlite::params![id_str, kind_str, value, created_at],
        )?;
        Ok(conn.query_row(
          &format!(
            "SELECT {USER_COLUMNS} FROM users WHERE identity_kind = ?1 AND identity = ?2"
          ),
          rusqlite::params![kind_str, value],
          RawUser::from_row,
        )?)
      })
      .await?;

    raw.into_user()
  }

  async fn find_user_by_identity(&self, identity: &Identity) -> Result<Option<User>> {
    self
      .select_user(
        format!("SELECT {USER_COLUMNS} FROM users WHERE identity_kind = ?1 AND identity = ?2"),
        vec![
          encode_identity_kind(identity.kind()).to_owned(),
          identity.as_str().to_owned(),
        ],
      )
      .await
  }

  async fn find_user_by_credential(&self, digest: String) -> Result<Option<User>> {
    self
      .select_user(
        format!("SELECT {USER_COLUMNS} FROM users WHERE credential_digest = ?1"),
        vec![digest],
      )
      .await
  }

  async fn get_user(&self, user_id: Uuid) -> Result<Option<User>> {
    self
      .select_user(
        format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
        vec![encode_uuid(user_id)],
      )
      .await
  }

  async fn set_one_time_credential(
    &self,
    user_id: Uuid,
    pending: PendingCredential,
  ) -> Result<()> {
    let id_str      = encode_uuid(user_id);
    let expires_str = encode_dt(pending.expires_at);

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE users SET credential_digest = ?2, credential_expires_at = ?3
           WHERE user_id = ?1",
          rusqlite::params![id_str, pending.digest, expires_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(fieldtrack_core::Error::UserNotFound(user_id).into());
    }
    Ok(())
  }

  async fn consume_one_time_credential(
    &self,
    user_id: Uuid,
    digest: String,
    at: DateTime<Utc>,
  ) -> Result<User> {
    let id_str = encode_uuid(user_id);
    let at_str = encode_dt(time::truncate(at));

    let outcome: Redeemed = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let updated = tx.execute(
          "UPDATE users
           SET credential_digest = NULL, credential_expires_at = NULL,
               verified = 1, last_login_at = ?2
           WHERE user_id = ?1
             AND credential_digest = ?3
             AND credential_expires_at > ?2",
          rusqlite::params![id_str, at_str, digest],
        )?;

        if updated == 0 {
          let pending: Option<(Option<String>, Option<String>)> = tx
            .query_row(
              "SELECT credential_digest, credential_expires_at FROM users
               WHERE user_id = ?1",
              rusqlite::params![id_str],
              |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
          return Ok(match pending {
            None => Redeemed::Missing,
            Some((Some(d), Some(exp))) if d == digest && exp <= at_str => Redeemed::Expired,
            Some(_) => Redeemed::Mismatch,
          });
        }

        let raw = tx
          .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
            rusqlite::params![id_str],
            RawUser::from_row,
          )
          .optional()?;
        tx.commit()?;
        Ok(raw.map_or(Redeemed::Missing, Redeemed::Done))
      })
      .await?;

    match outcome {
      Redeemed::Done(raw) => raw.into_user(),
      Redeemed::Missing => Err(fieldtrack_core::Error::UserNotFound(user_id).into()),
      Redeemed::Mismatch => Err(fieldtrack_core::Error::CredentialMismatch(user_id).into()),
      Redeemed::Expired => Err(fieldtrack_core::Error::CredentialExpired(user_id).into()),
    }
  }

  // ── Jobs ──────────────────────────────────────────────────────────────────

  async fn open_job(&self, input: NewJob) -> Result<Job> {
    let user_id  = input.user_id;
    let job_str  = encode_uuid(Uuid::new_v4());
    let user_str = encode_uuid(user_id);
    let now_str  = encode_dt(time::now());

    let raw: Option<RawJob> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists = tx
          .query_row(
            "SELECT 1 FROM users WHERE user_id = ?1",
            rusqlite::params![user_str],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if !exists {
          return Ok(None);
        }

        // Last login wins: a job left open by an earlier login is closed
        // before the new one starts.
        tx.execute(
          "UPDATE jobs SET is_active = 0, ended_at = ?2
           WHERE user_id = ?1 AND is_active = 1",
          rusqlite::params![user_str, now_str],
        )?;
        tx.execute(
          "INSERT INTO jobs (job_id, user_id, device_id, started_at, login_photo, is_active)
           VALUES (?1, ?2, ?3, ?4, ?5, 1)",
          rusqlite::params![job_str, user_str, input.device_id, now_str, input.login_photo],
        )?;
        tx.execute(
          "UPDATE users SET current_job_id = ?2, last_login_at = ?3 WHERE user_id = ?1",
          rusqlite::params![user_str, job_str, now_str],
        )?;

        let raw = select_job(&tx, &job_str)?;
        tx.commit()?;
        Ok(raw)
      })
      .await?;

    raw
      .ok_or(fieldtrack_core::Error::UserNotFound(user_id))?
      .into_job()
  }

  async fn get_job(&self, job_id: Uuid) -> Result<Option<Job>> {
    let id_str = encode_uuid(job_id);

    let raw: Option<RawJob> = self
      .conn
      .call(move |conn| Ok(select_job(conn, &id_str)?))
      .await?;

    raw.map(RawJob::into_job).transpose()
  }

  async fn close_job(&self, job_id: Uuid, logout_photo: Option<String>) -> Result<Job> {
    let job_str = encode_uuid(job_id);
    let now_str = encode_dt(time::now());

    let outcome: Guarded<RawJob> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let state: Option<(String, bool)> = tx
          .query_row(
            "SELECT user_id, is_active FROM jobs WHERE job_id = ?1",
            rusqlite::params![job_str],
            |row| Ok((row.get(0)?, row.get(1)?)),
          )
          .optional()?;
        let Some((user_str, active)) = state else {
          return Ok(Guarded::Missing);
        };
        if !active {
          return Ok(Guarded::Inactive);
        }

        tx.execute(
          "UPDATE jobs SET is_active = 0, ended_at = ?2, logout_photo = ?3
           WHERE job_id = ?1",
          rusqlite::params![job_str, now_str, logout_photo],
        )?;
        tx.execute(
          "UPDATE users SET current_job_id = NULL
           WHERE user_id = ?1 AND current_job_id = ?2",
          rusqlite::params![user_str, job_str],
        )?;

        let raw = select_job(&tx, &job_str)?;
        tx.commit()?;
        Ok(raw.map_or(Guarded::Missing, Guarded::Done))
      })
      .await?;

    match outcome {
      Guarded::Done(raw) => raw.into_job(),
      Guarded::Missing => Err(fieldtrack_core::Error::JobNotFound(job_id).into()),
      Guarded::Inactive => Err(fieldtrack_core::Error::JobInactive(job_id).into()),
    }
  }

  async fn list_jobs(&self, query: &JobQuery) -> Result<Vec<Job>> {
    let user_str  = encode_uuid(query.user_id);
    let from_str  = query.started_from.map(encode_dt);
    let until_str = query.started_until.map(encode_dt);

    let raws: Vec<RawJob> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {JOB_COLUMNS} FROM jobs
           WHERE user_id = ?1
             AND (?2 IS NULL OR started_at >= ?2)
             AND (?3 IS NULL OR started_at < ?3)
           ORDER BY started_at ASC"
        ))?;
        let mut rows = stmt
          .query_map(
            rusqlite::params![user_str, from_str, until_str],
            RawJob::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        for raw in &mut rows {
          raw.location_ids = job_location_ids(conn, &raw.job_id)?;
        }
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawJob::into_job).collect()
  }

  // ── Locations (append-only) ────────────────────────────────────────────

  async fn record_location(&self, input: NewLocation) -> Result<LocationPoint> {
    let point = LocationPoint {
      location_id:         Uuid::new_v4(),
      user_id:             input.user_id,
      job_id:              input.job_id,
      latitude:            input.latitude,
      longitude:           input.longitude,
      timestamp:           input.timestamp.map_or_else(time::now, time::truncate),
      place_name:          input.place_name,
      address:             input.address,
      accuracy:            input.accuracy,
      is_stationary:       input.is_stationary,
      stationary_duration: input.stationary_duration,
    };

    let location_str = encode_uuid(point.location_id);
    let user_str     = encode_uuid(point.user_id);
    let job_str      = point.job_id.map(encode_uuid);
    let at_str       = encode_dt(point.timestamp);
    let row          = point.clone();

    let outcome: Guarded<()> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Some(job) = &job_str {
          let active: Option<bool> = tx
            .query_row(
              "SELECT is_active FROM jobs WHERE job_id = ?1 AND user_id = ?2",
              rusqlite::params![job, user_str],
              |r| r.get(0),
            )
            .optional()?;
          match active {
            None => return Ok(Guarded::Missing),
            Some(false) => return Ok(Guarded::Inactive),
            Some(true) => {}
          }
        }

        tx.execute(
          "INSERT INTO locations (
             location_id, user_id, job_id, latitude, longitude, recorded_at,
             place_name, address, accuracy, is_stationary, stationary_duration
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
          rusqlite::params![
            location_str,
            user_str,
            job_str,
            row.latitude,
            row.longitude,
            at_str,
            row.place_name,
            row.address,
            row.accuracy,
            row.is_stationary,
            row.stationary_duration,
          ],
        )?;
        tx.commit()?;
        Ok(Guarded::Done(()))
      })
      .await?;

    // The guard only trips when a job was given.
    let job_id = point.job_id.unwrap_or_default();
    match outcome {
      Guarded::Done(()) => Ok(point),
      Guarded::Missing => Err(fieldtrack_core::Error::JobNotFound(job_id).into()),
      Guarded::Inactive => Err(fieldtrack_core::Error::JobInactive(job_id).into()),
    }
  }

  async fn list_locations(&self, query: &LocationQuery) -> Result<Vec<LocationPoint>> {
    let user_str   = encode_uuid(query.user_id);
    let job_str    = query.job_id.map(encode_uuid);
    let from_str   = query.from.map(encode_dt);
    let until_str  = query.until.map(encode_dt);
    let stationary = query.stationary_only;

    let raws: Vec<RawLocation> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {LOCATION_COLUMNS} FROM locations
           WHERE user_id = ?1
             AND (?2 IS NULL OR job_id = ?2)
             AND (?3 IS NULL OR recorded_at >= ?3)
             AND (?4 IS NULL OR recorded_at < ?4)
             AND (?5 = 0 OR is_stationary = 1)
           ORDER BY recorded_at ASC, seq ASC"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![user_str, job_str, from_str, until_str, stationary],
            RawLocation::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawLocation::into_point).collect()
  }

  async fn calendar(&self, user_id: Uuid) -> Result<Vec<CalendarDay>> {
    let user_str = encode_uuid(user_id);

    let raws: Vec<RawCalendarDay> = self
      .conn
      .call(move |conn| {
        // Stored timestamps are UTC with a `Z` suffix, so the first ten
        // characters are the UTC calendar date.
        let mut stmt = conn.prepare(
          "SELECT substr(recorded_at, 1, 10) AS day, COUNT(*), MIN(recorded_at)
           FROM locations
           WHERE user_id = ?1
           GROUP BY day
           ORDER BY day DESC",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![user_str], |row| {
            Ok(RawCalendarDay {
              day:      row.get(0)?,
              count:    row.get(1)?,
              earliest: row.get(2)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCalendarDay::into_day).collect()
  }
}
