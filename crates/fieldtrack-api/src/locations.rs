//! Handlers for `/locations` endpoints. All require a bearer token and are
//! scoped to the session's user.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/locations`, `/locations/track` | Records a point; 201 |
//! | `GET`  | `/locations/daily` | `?date=YYYY-MM-DD`, default today (UTC) |
//! | `GET`  | `/locations/daily-summary[/{date}]` | Totals plus first/last point |
//! | `GET`  | `/locations/date-range` | `?start=&end=`, inclusive |
//! | `GET`  | `/locations/calendar` | Per-day counts, newest first |
//! | `GET`  | `/locations/stationary` | Job tokens only |
//! | `GET`  | `/locations/job` | Job tokens only |
//! | `GET`  | `/locations/jobs/daily` | `?date=`; jobs started that day |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::Duration;
use fieldtrack_auth::{NotificationChannel, Session};
use fieldtrack_core::{
  location::{LocationPoint, NewLocation},
  store::{JobQuery, LocationQuery, TrackerStore},
  summary::{CalendarDay, DailySummary, JobDay, JobDaySummary},
  time::{self, DayWindow},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{ApiJson, AppState, AuthSession, error::ApiError};

fn require_job(session: &Session) -> Result<Uuid, ApiError> {
  session
    .job
    .as_ref()
    .map(|j| j.job_id)
    .ok_or_else(|| ApiError::bad_request("This endpoint requires a job session"))
}

// ─── Record ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordBody {
  pub latitude:            Option<f64>,
  pub longitude:           Option<f64>,
  pub place_name:          Option<String>,
  pub address:             Option<String>,
  pub accuracy:            Option<f64>,
  pub is_stationary:       Option<bool>,
  pub stationary_duration: Option<f64>,
  /// RFC 3339; defaults to receipt time.
  pub timestamp:           Option<String>,
}

/// `POST /locations` and `POST /locations/track`
pub async fn record<S, N>(
  State(state): State<AppState<S, N>>,
  AuthSession(session): AuthSession,
  ApiJson(body): ApiJson<RecordBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let job_id = session.job.as_ref().map(|j| j.job_id);
  let mut input =
    NewLocation::new(session.user.user_id, job_id, body.latitude, body.longitude)?;

  input.timestamp = body
    .timestamp
    .as_deref()
    .map(time::parse_instant)
    .transpose()
    .map_err(|_| ApiError::bad_request("Invalid timestamp. Use RFC 3339."))?;
  input.place_name = body.place_name;
  input.address = body.address;
  input.accuracy = body.accuracy;
  input.is_stationary = body.is_stationary.unwrap_or(false);
  input.stationary_duration = body.stationary_duration;

  let location = state
    .store
    .record_location(input)
    .await
    .map_err(ApiError::from_store)?;

  Ok((
    StatusCode::CREATED,
    Json(json!({ "message": "Location saved successfully", "location": location })),
  ))
}

// ─── Daily ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DateParams {
  pub date: Option<String>,
}

impl DateParams {
  fn window(&self) -> Result<DayWindow, ApiError> {
    let raw = self.date.as_deref().filter(|d| !d.trim().is_empty());
    Ok(DayWindow::parse_or_today(raw)?)
  }
}

async fn points_in<S, N>(
  state: &AppState<S, N>,
  session: &Session,
  window: DayWindow,
) -> Result<Vec<LocationPoint>, ApiError>
where
  S: TrackerStore + 'static,
{
  let query = LocationQuery::for_user(session.user.user_id).between(window.start, window.end);
  state
    .store
    .list_locations(&query)
    .await
    .map_err(ApiError::from_store)
}

/// `GET /locations/daily[?date=]`
pub async fn daily<S, N>(
  State(state): State<AppState<S, N>>,
  AuthSession(session): AuthSession,
  Query(params): Query<DateParams>,
) -> Result<Json<Vec<LocationPoint>>, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let window = params.window()?;
  Ok(Json(points_in(&state, &session, window).await?))
}

/// `GET /locations/daily-summary[?date=]`
pub async fn daily_summary<S, N>(
  State(state): State<AppState<S, N>>,
  AuthSession(session): AuthSession,
  Query(params): Query<DateParams>,
) -> Result<Json<DailySummary>, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let window = params.window()?;
  let points = points_in(&state, &session, window).await?;
  Ok(Json(DailySummary::new(window, points)))
}

/// `GET /locations/daily-summary/{date}`
pub async fn daily_summary_for<S, N>(
  State(state): State<AppState<S, N>>,
  AuthSession(session): AuthSession,
  Path(date): Path<String>,
) -> Result<Json<DailySummary>, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let window = DateParams { date: Some(date) }.window()?;
  let points = points_in(&state, &session, window).await?;
  Ok(Json(DailySummary::new(window, points)))
}

// ─── Date range ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RangeParams {
  pub start: Option<String>,
  pub end:   Option<String>,
}

/// `GET /locations/date-range?start=&end=`
///
/// Both bounds are inclusive. A bare date as `end` means midnight at the
/// start of that day.
pub async fn date_range<S, N>(
  State(state): State<AppState<S, N>>,
  AuthSession(session): AuthSession,
  Query(params): Query<RangeParams>,
) -> Result<Json<Vec<LocationPoint>>, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let (Some(start), Some(end)) = (params.start, params.end) else {
    return Err(ApiError::bad_request("Start date and end date are required"));
  };
  let invalid = |_| ApiError::bad_request("Invalid date format. Use RFC 3339 or YYYY-MM-DD.");
  let start = time::parse_instant(&start).map_err(invalid)?;
  let end = time::parse_instant(&end).map_err(invalid)?;
  if start > end {
    return Err(ApiError::bad_request("Start date must not be after end date"));
  }

  // Stored instants have microsecond precision, so one microsecond past `end`
  // is the exclusive bound matching an inclusive `end`.
  let query = LocationQuery::for_user(session.user.user_id)
    .between(start, end + Duration::microseconds(1));
  let points = state
    .store
    .list_locations(&query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(points))
}

// ─── Calendar ─────────────────────────────────────────────────────────────────

/// `GET /locations/calendar`
pub async fn calendar<S, N>(
  State(state): State<AppState<S, N>>,
  AuthSession(session): AuthSession,
) -> Result<Json<Vec<CalendarDay>>, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let days = state
    .store
    .calendar(session.user.user_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(days))
}

// ─── Job-scoped ───────────────────────────────────────────────────────────────

/// `GET /locations/stationary`
pub async fn stationary<S, N>(
  State(state): State<AppState<S, N>>,
  AuthSession(session): AuthSession,
) -> Result<Json<Vec<LocationPoint>>, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let job_id = require_job(&session)?;
  let query = LocationQuery::for_job(session.user.user_id, job_id).stationary();
  let points = state
    .store
    .list_locations(&query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(points))
}

/// `GET /locations/job`
pub async fn job_points<S, N>(
  State(state): State<AppState<S, N>>,
  AuthSession(session): AuthSession,
) -> Result<Json<Vec<LocationPoint>>, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let job_id = require_job(&session)?;
  let query = LocationQuery::for_job(session.user.user_id, job_id);
  let points = state
    .store
    .list_locations(&query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(points))
}

/// `GET /locations/jobs/daily[?date=]`: every job the user started that day,
/// with its points.
pub async fn jobs_daily<S, N>(
  State(state): State<AppState<S, N>>,
  AuthSession(session): AuthSession,
  Query(params): Query<DateParams>,
) -> Result<Json<JobDaySummary>, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let window = params.window()?;
  let user_id = session.user.user_id;
  let jobs = state
    .store
    .list_jobs(&JobQuery {
      user_id,
      started_from: Some(window.start),
      started_until: Some(window.end),
    })
    .await
    .map_err(ApiError::from_store)?;

  let mut days = Vec::with_capacity(jobs.len());
  for job in jobs {
    let points = state
      .store
      .list_locations(&LocationQuery::for_job(user_id, job.job_id))
      .await
      .map_err(ApiError::from_store)?;
    days.push(JobDay::new(job, points));
  }

  Ok(Json(JobDaySummary { date: window.date, total_jobs: days.len(), jobs: days }))
}
