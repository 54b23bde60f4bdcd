//! Handlers for `/auth` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | Body: `{"email"}` |
//! | `GET`  | `/auth/verify-email` | `?token=`; answers with an HTML page |
//! | `POST` | `/auth/login` | Body: `{"email"\|"phoneNumber", "deviceId", "loginPhoto"?}` |
//! | `POST` | `/auth/logout` | Bearer; body: `{"logoutPhoto"?}` |
//! | `POST` | `/auth/send-otp` | Body: `{"phoneNumber"}`; 201 |
//! | `POST` | `/auth/verify-otp` | Body: `{"phoneNumber", "otp"}` |
//! | `POST` | `/auth/resend-otp` | Body: `{"phoneNumber"}` |
//! | `POST` | `/auth/validate-token` | Bearer |

use axum::{
  Json,
  body::Bytes,
  extract::{Query, State},
  http::StatusCode,
  response::{Html, IntoResponse},
};
use chrono::{DateTime, Utc};
use fieldtrack_auth::{AuthError, LoginInput, NotificationChannel};
use fieldtrack_core::{identity::Identity, store::TrackerStore, user::User};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::{ApiJson, AppState, AuthSession, error::ApiError, pages};

// ─── Views ────────────────────────────────────────────────────────────────────

/// Public projection of a user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
  pub id:           Uuid,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub email:        Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub phone_number: Option<String>,
  pub is_verified:  bool,
}

impl From<&User> for UserView {
  fn from(user: &User) -> Self {
    Self {
      id:           user.user_id,
      email:        user.identity.as_email().map(str::to_owned),
      phone_number: user.identity.as_phone().map(str::to_owned),
      is_verified:  user.verified,
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobView {
  pub id:         Uuid,
  pub start_time: DateTime<Utc>,
}

fn required(value: Option<String>) -> Option<String> {
  value.filter(|v| !v.trim().is_empty())
}

// ─── Register / verify ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub email: Option<String>,
}

/// `POST /auth/register`
pub async fn register<S, N>(
  State(state): State<AppState<S, N>>,
  ApiJson(body): ApiJson<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let email = required(body.email).ok_or_else(|| ApiError::bad_request("Email is required"))?;
  let outcome = state.auth.register(&email).await.map_err(|e| match e {
    AuthError::InvalidIdentity(_) => ApiError::bad_request("Invalid email format"),
    other => other.into(),
  })?;

  let message = if outcome.delivered {
    "Verification email sent. Please check your inbox."
  } else {
    "User registered, but the verification email could not be sent."
  };
  Ok(Json(json!({
    "message":   message,
    "email":     outcome.user.identity.as_str(),
    "emailSent": outcome.delivered,
  })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyParams {
  pub token: Option<String>,
}

/// `GET /auth/verify-email?token=`
pub async fn verify_email<S, N>(
  State(state): State<AppState<S, N>>,
  Query(params): Query<VerifyParams>,
) -> (StatusCode, Html<String>)
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let token = params.token.unwrap_or_default();
  match state.auth.verify_email(&token).await {
    Ok(_) => (StatusCode::OK, Html(pages::verified())),
    Err(AuthError::Mismatch | AuthError::Expired | AuthError::InvalidRequest(_)) => {
      (StatusCode::BAD_REQUEST, Html(pages::invalid_link()))
    }
    Err(e) => {
      tracing::error!(error = %e, "email verification failed");
      (StatusCode::INTERNAL_SERVER_ERROR, Html(pages::server_error()))
    }
  }
}

// ─── Login / logout ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody {
  pub email:        Option<String>,
  pub phone_number: Option<String>,
  pub device_id:    Option<String>,
  pub login_photo:  Option<String>,
}

/// `POST /auth/login`: opens a job and returns a token bound to it.
pub async fn login<S, N>(
  State(state): State<AppState<S, N>>,
  ApiJson(body): ApiJson<LoginBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let identity = match (required(body.email), required(body.phone_number)) {
    (Some(email), _) => {
      Identity::email(&email).map_err(|_| ApiError::bad_request("Invalid email format"))?
    }
    (None, Some(phone)) => Identity::phone(&phone)
      .map_err(|_| ApiError::bad_request("Invalid phone number format or country code."))?,
    (None, None) => return Err(ApiError::bad_request("Email or phone number is required")),
  };

  let out = state
    .auth
    .login(LoginInput {
      identity,
      device_id: body.device_id.unwrap_or_default(),
      login_photo: body.login_photo,
    })
    .await
    .map_err(|e| match e {
      AuthError::NotFound => ApiError::bad_request("User not found. Please register first."),
      other => other.into(),
    })?;

  Ok(Json(json!({
    "message": "Login successful and job started",
    "token":   out.token,
    "user":    UserView::from(&out.user),
    "job":     JobView { id: out.job.job_id, start_time: out.job.started_at },
  })))
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogoutBody {
  pub logout_photo: Option<String>,
}

/// `POST /auth/logout`: ends the session's job, if it has one. The body is
/// optional.
pub async fn logout<S, N>(
  State(state): State<AppState<S, N>>,
  AuthSession(session): AuthSession,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let body: LogoutBody = if body.iter().all(u8::is_ascii_whitespace) {
    LogoutBody::default()
  } else {
    serde_json::from_slice(&body)
      .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {e}")))?
  };

  let message = match state.auth.logout(&session, body.logout_photo).await? {
    Some(_) => "Logout successful and job ended",
    None => "Logout successful",
  };
  Ok(Json(json!({ "message": message })))
}

// ─── OTP ──────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneBody {
  pub phone_number: Option<String>,
}

fn invalid_phone(err: AuthError, not_found: &str) -> ApiError {
  match err {
    AuthError::InvalidIdentity(_) => {
      ApiError::bad_request("Invalid phone number format or country code.")
    }
    other => ApiError::otp_flow(other, not_found),
  }
}

/// `POST /auth/send-otp`
pub async fn send_otp<S, N>(
  State(state): State<AppState<S, N>>,
  ApiJson(body): ApiJson<PhoneBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let phone = required(body.phone_number)
    .ok_or_else(|| ApiError::bad_request("Phone number is required."))?;
  let outcome = state
    .auth
    .send_otp(&phone)
    .await
    .map_err(|e| invalid_phone(e, "User not found."))?;

  Ok((
    StatusCode::CREATED,
    Json(json!({ "message": "OTP sent successfully.", "smsSent": outcome.delivered })),
  ))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyOtpBody {
  pub phone_number: Option<String>,
  pub otp:          Option<String>,
}

/// `POST /auth/verify-otp`
pub async fn verify_otp<S, N>(
  State(state): State<AppState<S, N>>,
  ApiJson(body): ApiJson<VerifyOtpBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let (Some(phone), Some(otp)) = (required(body.phone_number), required(body.otp)) else {
    return Err(ApiError::bad_request("Phone number and OTP are required."));
  };
  let login = state
    .auth
    .verify_otp(&phone, &otp)
    .await
    .map_err(|e| invalid_phone(e, "User not found."))?;

  Ok(Json(json!({
    "message": "OTP verified successfully.",
    "token":   login.token,
    "user":    UserView::from(&login.user),
  })))
}

/// `POST /auth/resend-otp`
pub async fn resend_otp<S, N>(
  State(state): State<AppState<S, N>>,
  ApiJson(body): ApiJson<PhoneBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  let phone = required(body.phone_number)
    .ok_or_else(|| ApiError::bad_request("Phone number is required."))?;
  let outcome = state
    .auth
    .resend_otp(&phone)
    .await
    .map_err(|e| invalid_phone(e, "User not found. Please register first."))?;

  Ok(Json(json!({ "message": "OTP resent successfully.", "smsSent": outcome.delivered })))
}

/// `POST /auth/validate-token`
pub async fn validate_token<S, N>(
  State(_state): State<AppState<S, N>>,
  AuthSession(session): AuthSession,
) -> Json<serde_json::Value>
where
  S: TrackerStore + 'static,
  N: NotificationChannel + 'static,
{
  Json(json!({
    "message": "Token is valid.",
    "user":    UserView::from(&session.user),
  }))
}
