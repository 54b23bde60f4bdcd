//! JSON HTTP API for fieldtrack.
//!
//! Exposes an axum [`Router`] backed by any
//! [`fieldtrack_core::store::TrackerStore`] and any
//! [`fieldtrack_auth::NotificationChannel`]. TLS and process concerns are the
//! caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let app = fieldtrack_api::api_router(AppState::new(store, auth));
//! ```

pub mod auth;
pub mod error;
pub mod extract;
pub mod guard;
pub mod locations;
pub mod pages;

use std::sync::Arc;

use axum::{
  Json, Router,
  routing::{get, post},
};
use fieldtrack_auth::{AuthService, NotificationChannel};
use fieldtrack_core::store::TrackerStore;
use serde_json::{Value, json};
use tower_http::{cors::{Any, CorsLayer}, trace::TraceLayer};

pub use error::ApiError;
pub use extract::ApiJson;
pub use guard::AuthSession;

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all handlers.
pub struct AppState<S, N> {
  pub store: Arc<S>,
  pub auth:  Arc<AuthService<S, N>>,
}

impl<S, N> AppState<S, N> {
  pub fn new(store: Arc<S>, auth: AuthService<S, N>) -> Self {
    Self { store, auth: Arc::new(auth) }
  }
}

impl<S, N> Clone for AppState<S, N> {
  fn clone(&self) -> Self {
    Self { store: Arc::clone(&self.store), auth: Arc::clone(&self.auth) }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build the full API router for `state`.
///
/// The returned `Router<()>` can be served directly or nested into a parent
/// router regardless of its own state type.
pub fn api_router<S, N>(state: AppState<S, N>) -> Router<()>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let cors = CorsLayer::new()
    .allow_origin(Any)
    .allow_methods(Any)
    .allow_headers(Any);

  Router::new()
    .route("/health", get(health))
    // Email + job flow
    .route("/auth/register",       post(auth::register::<S, N>))
    .route("/auth/verify-email",   get(auth::verify_email::<S, N>))
    .route("/auth/login",          post(auth::login::<S, N>))
    .route("/auth/logout",         post(auth::logout::<S, N>))
    // Phone + OTP flow
    .route("/auth/send-otp",       post(auth::send_otp::<S, N>))
    .route("/auth/verify-otp",     post(auth::verify_otp::<S, N>))
    .route("/auth/resend-otp",     post(auth::resend_otp::<S, N>))
    .route("/auth/validate-token", post(auth::validate_token::<S, N>))
    // Locations
    .route("/locations",                     post(locations::record::<S, N>))
    .route("/locations/track",               post(locations::record::<S, N>))
    .route("/locations/daily",               get(locations::daily::<S, N>))
    .route("/locations/daily-summary",       get(locations::daily_summary::<S, N>))
    .route("/locations/daily-summary/{date}", get(locations::daily_summary_for::<S, N>))
    .route("/locations/date-range",          get(locations::date_range::<S, N>))
    .route("/locations/calendar",            get(locations::calendar::<S, N>))
    .route("/locations/stationary",          get(locations::stationary::<S, N>))
    .route("/locations/job",                 get(locations::job_points::<S, N>))
    .route("/locations/jobs/daily",          get(locations::jobs_daily::<S, N>))
    .layer(TraceLayer::new_for_http())
    .layer(cors)
    .with_state(state)
}

/// `GET /health`
async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

#[cfg(test)]
mod tests;
