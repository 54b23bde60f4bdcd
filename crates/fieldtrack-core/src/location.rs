//! Location points: immutable GPS samples.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A stored coordinate sample. Never updated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPoint {
  #[serde(rename = "id")]
  pub location_id:         Uuid,
  pub user_id:             Uuid,
  pub job_id:              Option<Uuid>,
  pub latitude:            f64,
  pub longitude:           f64,
  pub timestamp:           DateTime<Utc>,
  pub place_name:          Option<String>,
  pub address:             Option<String>,
  /// Horizontal accuracy in metres as reported by the device.
  pub accuracy:            Option<f64>,
  pub is_stationary:       bool,
  /// Dwell time in seconds; only meaningful when `is_stationary`.
  pub stationary_duration: Option<f64>,
}

/// Input for [`TrackerStore::record_location`](crate::store::TrackerStore::record_location).
#[derive(Debug, Clone)]
pub struct NewLocation {
  pub user_id:             Uuid,
  pub job_id:              Option<Uuid>,
  pub latitude:            f64,
  pub longitude:           f64,
  /// Caller-supplied sample time; the store stamps receipt time when absent.
  pub timestamp:           Option<DateTime<Utc>>,
  pub place_name:          Option<String>,
  pub address:             Option<String>,
  pub accuracy:            Option<f64>,
  pub is_stationary:       bool,
  pub stationary_duration: Option<f64>,
}

impl NewLocation {
  /// Build a sample from possibly-missing coordinates.
  ///
  /// Both values must be present, finite, and within ±90° latitude and ±180°
  /// longitude.
  pub fn new(
    user_id: Uuid,
    job_id: Option<Uuid>,
    latitude: Option<f64>,
    longitude: Option<f64>,
  ) -> Result<Self> {
    let (latitude, longitude) = match (latitude, longitude) {
      (Some(lat), Some(lon)) => (lat, lon),
      _ => return Err(Error::InvalidCoordinates),
    };
    if !latitude.is_finite()
      || !longitude.is_finite()
      || !(-90.0..=90.0).contains(&latitude)
      || !(-180.0..=180.0).contains(&longitude)
    {
      return Err(Error::InvalidCoordinates);
    }

    Ok(Self {
      user_id,
      job_id,
      latitude,
      longitude,
      timestamp: None,
      place_name: None,
      address: None,
      accuracy: None,
      is_stationary: false,
      stationary_duration: None,
    })
  }
}
