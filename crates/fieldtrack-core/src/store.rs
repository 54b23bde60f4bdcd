//! The `TrackerStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `fieldtrack-store-sqlite`). Higher layers (`fieldtrack-auth`,
//! `fieldtrack-api`) depend on this abstraction, not on any concrete backend.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  identity::Identity,
  job::{Job, NewJob},
  location::{LocationPoint, NewLocation},
  summary::CalendarDay,
  user::{PendingCredential, User},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`TrackerStore::list_locations`]. Results are always
/// ascending by timestamp.
#[derive(Debug, Clone)]
pub struct LocationQuery {
  pub user_id:         Uuid,
  /// Restrict to one job's points.
  pub job_id:          Option<Uuid>,
  /// Inclusive lower bound on `timestamp`.
  pub from:            Option<DateTime<Utc>>,
  /// Exclusive upper bound on `timestamp`.
  pub until:           Option<DateTime<Utc>>,
  pub stationary_only: bool,
}

impl LocationQuery {
  pub fn for_user(user_id: Uuid) -> Self {
    Self { user_id, job_id: None, from: None, until: None, stationary_only: false }
  }

  pub fn for_job(user_id: Uuid, job_id: Uuid) -> Self {
    Self { job_id: Some(job_id), ..Self::for_user(user_id) }
  }

  /// Half-open window `[from, until)`.
  pub fn between(mut self, from: DateTime<Utc>, until: DateTime<Utc>) -> Self {
    self.from = Some(from);
    self.until = Some(until);
    self
  }

  pub fn stationary(mut self) -> Self {
    self.stationary_only = true;
    self
  }
}

/// Parameters for [`TrackerStore::list_jobs`]. Results are ascending by
/// start time.
#[derive(Debug, Clone)]
pub struct JobQuery {
  pub user_id:       Uuid,
  /// Inclusive lower bound on `started_at`.
  pub started_from:  Option<DateTime<Utc>>,
  /// Exclusive upper bound on `started_at`.
  pub started_until: Option<DateTime<Utc>>,
}

// ─── Errors ──────────────────────────────────────────────────────────────────

/// Implemented by backend error types so callers can tell a rejected
/// precondition (a [`crate::Error`]) apart from an I/O or encoding fault
/// without knowing the backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  fn domain(&self) -> Option<&crate::Error>;
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a fieldtrack storage backend.
///
/// Location points are append-only. Users and jobs are mutated only through
/// the credential and job lifecycle methods below.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait TrackerStore: Send + Sync {
  type Error: StoreError;

  // ── Users / credentials ───────────────────────────────────────────────

  /// Return the user owning `identity`, creating it if absent. Concurrent
  /// calls for the same identity converge on a single record.
  fn upsert_identity(
    &self,
    identity: Identity,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  fn find_user_by_identity<'a>(
    &'a self,
    identity: &'a Identity,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Look up the user whose pending one-time credential has this digest.
  fn find_user_by_credential(
    &self,
    digest: String,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn get_user(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  /// Overwrite the user's pending one-time credential.
  fn set_one_time_credential(
    &self,
    user_id: Uuid,
    pending: PendingCredential,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Redeem the pending credential whose digest is `digest`: clear it, mark
  /// the user verified and stamp `last_login_at = at`.
  ///
  /// The check and the clear are one atomic step, so of several concurrent
  /// calls with the same digest exactly one succeeds. Fails with
  /// [`crate::Error::CredentialMismatch`] when nothing matching is pending
  /// and [`crate::Error::CredentialExpired`] when it expired at or before
  /// `at`.
  fn consume_one_time_credential(
    &self,
    user_id: Uuid,
    digest: String,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  // ── Jobs ──────────────────────────────────────────────────────────────

  /// Open a job and make it the user's current job, stamping
  /// `last_login_at`. Any job of the same user that is still active is closed
  /// first.
  fn open_job(
    &self,
    input: NewJob,
  ) -> impl Future<Output = Result<Job, Self::Error>> + Send + '_;

  fn get_job(
    &self,
    job_id: Uuid,
  ) -> impl Future<Output = Result<Option<Job>, Self::Error>> + Send + '_;

  /// Close an active job: stamp `ended_at`, store the logout photo, clear the
  /// active flag and detach it from its user's current-job pointer.
  fn close_job(
    &self,
    job_id: Uuid,
    logout_photo: Option<String>,
  ) -> impl Future<Output = Result<Job, Self::Error>> + Send + '_;

  fn list_jobs<'a>(
    &'a self,
    query: &'a JobQuery,
  ) -> impl Future<Output = Result<Vec<Job>, Self::Error>> + Send + 'a;

  // ── Locations, append-only ───────────────────────────────────────────

  /// Persist a point. When `input.job_id` is set the job must be active at
  /// write time and the point is appended to its location list.
  fn record_location(
    &self,
    input: NewLocation,
  ) -> impl Future<Output = Result<LocationPoint, Self::Error>> + Send + '_;

  fn list_locations<'a>(
    &'a self,
    query: &'a LocationQuery,
  ) -> impl Future<Output = Result<Vec<LocationPoint>, Self::Error>> + Send + 'a;

  /// Group every point of a user by UTC calendar day, newest day first.
  fn calendar(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Vec<CalendarDay>, Self::Error>> + Send + '_;
}
