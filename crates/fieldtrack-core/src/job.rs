//! Jobs: bounded work sessions bracketed by login and logout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A work session. At most one job per user is active at any time; opening a
/// new one closes the previous one.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
  #[serde(rename = "id")]
  pub job_id:       Uuid,
  pub user_id:      Uuid,
  /// IMEI or another stable device identifier.
  pub device_id:    String,
  #[serde(rename = "startTime")]
  pub started_at:   DateTime<Utc>,
  #[serde(rename = "endTime")]
  pub ended_at:     Option<DateTime<Utc>>,
  /// URL or base64-encoded image captured at login.
  pub login_photo:  Option<String>,
  pub logout_photo: Option<String>,
  pub is_active:    bool,
  /// Location point ids in the order they were recorded.
  #[serde(rename = "locations")]
  pub location_ids: Vec<Uuid>,
}

/// Input for [`TrackerStore::open_job`](crate::store::TrackerStore::open_job).
#[derive(Debug, Clone)]
pub struct NewJob {
  pub user_id:     Uuid,
  pub device_id:   String,
  pub login_photo: Option<String>,
}
