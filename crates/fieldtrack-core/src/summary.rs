//! Read models produced by the query engine. Never stored, always derived.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{job::Job, location::LocationPoint, time::DayWindow};

/// All of a user's points for one UTC day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailySummary {
  pub date:            NaiveDate,
  pub total_locations: usize,
  pub first_location:  Option<LocationPoint>,
  pub last_location:   Option<LocationPoint>,
  /// Ascending by timestamp.
  pub locations:       Vec<LocationPoint>,
}

impl DailySummary {
  /// `points` must already be sorted ascending by timestamp.
  pub fn new(window: DayWindow, points: Vec<LocationPoint>) -> Self {
    Self {
      date:            window.date,
      total_locations: points.len(),
      first_location:  points.first().cloned(),
      last_location:   points.last().cloned(),
      locations:       points,
    }
  }
}

/// One bucket of the calendar aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarDay {
  pub date:      NaiveDate,
  pub count:     u64,
  /// Earliest point recorded on `date`.
  pub timestamp: DateTime<Utc>,
}

/// A job started on a given day, with its points.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDay {
  pub id:              Uuid,
  pub start_time:      DateTime<Utc>,
  pub end_time:        Option<DateTime<Utc>>,
  pub device_id:       String,
  pub total_locations: usize,
  pub first_location:  Option<LocationPoint>,
  pub last_location:   Option<LocationPoint>,
  pub locations:       Vec<LocationPoint>,
}

impl JobDay {
  /// `points` must already be sorted ascending by timestamp.
  pub fn new(job: Job, points: Vec<LocationPoint>) -> Self {
    Self {
      id:              job.job_id,
      start_time:      job.started_at,
      end_time:        job.ended_at,
      device_id:       job.device_id,
      total_locations: points.len(),
      first_location:  points.first().cloned(),
      last_location:   points.last().cloned(),
      locations:       points,
    }
  }
}

/// Jobs started during one UTC day.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDaySummary {
  pub date:       NaiveDate,
  pub total_jobs: usize,
  pub jobs:       Vec<JobDay>,
}
