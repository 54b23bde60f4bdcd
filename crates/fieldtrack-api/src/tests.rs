//! Router-level tests driving the real axum router over an in-memory store.

use std::sync::Arc;

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::Duration;
use fieldtrack_auth::{AuthConfig, AuthService, MemoryChannel, credential};
use fieldtrack_core::{identity::Identity, store::TrackerStore as _, time, user::PendingCredential};
use fieldtrack_store_sqlite::SqliteStore;
use serde_json::{Value, json};
use tower::ServiceExt as _;

use crate::{AppState, api_router};

const PHONE: &str = "+14155550123";

struct Harness {
  state:   AppState<SqliteStore, MemoryChannel>,
  channel: MemoryChannel,
}

async fn harness_with(channel: MemoryChannel) -> Harness {
  let store = Arc::new(SqliteStore::open_in_memory().await.expect("in-memory store"));
  let config = AuthConfig { jwt_secret: "test-secret".into(), ..AuthConfig::default() };
  let auth = AuthService::new(Arc::clone(&store), channel.clone(), config);
  Harness { state: AppState::new(store, auth), channel }
}

async fn harness() -> Harness { harness_with(MemoryChannel::new()).await }

impl Harness {
  async fn send_raw(
    &self,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Vec<u8>) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
      builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let req = match body {
      Some(body) => builder
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap(),
      None => builder.body(Body::empty()).unwrap(),
    };

    let resp = api_router(self.state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
  }

  async fn send(
    &self,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let (status, bytes) = self.send_raw(method, uri, token, body).await;
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
  }

  /// Register, follow the mailed link and log in; returns the job token.
  async fn email_login(&self, email: &str, device: &str) -> String {
    let (status, _) = self
      .send("POST", "/auth/register", None, Some(json!({ "email": email })))
      .await;
    assert_eq!(status, StatusCode::OK);

    let token = self
      .channel
      .last_token_for(&email.to_lowercase())
      .expect("verification link sent");
    let (status, _) = self
      .send_raw("GET", &format!("/auth/verify-email?token={token}"), None, None)
      .await;
    assert_eq!(status, StatusCode::OK);

    self.login(email, device).await
  }

  async fn login(&self, email: &str, device: &str) -> String {
    let (status, body) = self
      .send(
        "POST",
        "/auth/login",
        None,
        Some(json!({ "email": email, "deviceId": device, "loginPhoto": "in.jpg" })),
      )
      .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["token"].as_str().unwrap().to_owned()
  }

  /// Send a code, read it back from the channel and verify it; returns the
  /// user token.
  async fn otp_login(&self) -> String {
    self
      .send("POST", "/auth/send-otp", None, Some(json!({ "phoneNumber": PHONE })))
      .await;
    let code = self.channel.last_code_for(PHONE).unwrap();
    let (status, body) = self
      .send(
        "POST",
        "/auth/verify-otp",
        None,
        Some(json!({ "phoneNumber": PHONE, "otp": code })),
      )
      .await;
    assert_eq!(status, StatusCode::OK);
    body["token"].as_str().unwrap().to_owned()
  }

  async fn track(&self, token: &str, body: Value) -> (StatusCode, Value) {
    self.send("POST", "/locations", Some(token), Some(body)).await
  }
}

// ─── Health ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_ok() {
  let h = harness().await;
  let (status, body) = h.send("GET", "/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}

// ─── Email flow ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn email_flow_end_to_end() {
  let h = harness().await;
  let token = h.email_login("Field.Worker@Example.com", "device-1").await;

  // Recorded out of order on one day.
  for ts in ["2024-03-09T15:00:00Z", "2024-03-09T09:00:00Z", "2024-03-09T12:30:00Z"] {
    let (status, body) = h
      .track(&token, json!({ "latitude": 51.5, "longitude": -0.12, "timestamp": ts }))
      .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Location saved successfully");
  }

  let (status, body) = h
    .send("GET", "/locations/daily-summary/2024-03-09", Some(&token), None)
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["date"], "2024-03-09");
  assert_eq!(body["totalLocations"], 3);
  assert_eq!(body["firstLocation"]["timestamp"], "2024-03-09T09:00:00Z");
  assert_eq!(body["lastLocation"]["timestamp"], "2024-03-09T15:00:00Z");
  let stamps: Vec<&str> = body["locations"]
    .as_array()
    .unwrap()
    .iter()
    .map(|p| p["timestamp"].as_str().unwrap())
    .collect();
  assert_eq!(
    stamps,
    ["2024-03-09T09:00:00Z", "2024-03-09T12:30:00Z", "2024-03-09T15:00:00Z"]
  );

  // The same day through the query form.
  let (status, body) = h
    .send("GET", "/locations/daily?date=2024-03-09", Some(&token), None)
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn register_validates_and_rejects_verified_email() {
  let h = harness().await;

  let (status, body) = h
    .send("POST", "/auth/register", None, Some(json!({ "email": "nope" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Invalid email format");

  h.email_login("a@example.com", "dev").await;
  let (status, _) = h
    .send("POST", "/auth/register", None, Some(json!({ "email": "a@example.com" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn verification_link_is_single_use() {
  let h = harness().await;
  h.send("POST", "/auth/register", None, Some(json!({ "email": "a@example.com" })))
    .await;
  let token = h.channel.last_token_for("a@example.com").unwrap();
  let uri = format!("/auth/verify-email?token={token}");

  let (status, html) = h.send_raw("GET", &uri, None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert!(String::from_utf8(html).unwrap().contains("Verified"));

  let (status, _) = h.send_raw("GET", &uri, None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = h.send_raw("GET", "/auth/verify-email", None, None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn failed_email_delivery_is_degraded_success() {
  let h = harness_with(MemoryChannel::failing()).await;
  let (status, body) = h
    .send("POST", "/auth/register", None, Some(json!({ "email": "a@example.com" })))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["emailSent"], false);
  assert_eq!(body["email"], "a@example.com");

  let token = h.channel.last_token_for("a@example.com").unwrap();
  let (status, _) = h
    .send_raw("GET", &format!("/auth/verify-email?token={token}"), None, None)
    .await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn login_errors() {
  let h = harness().await;
  let body = json!({ "email": "ghost@example.com", "deviceId": "d" });
  let (status, resp) = h.send("POST", "/auth/login", None, Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(resp["message"], "User not found. Please register first.");

  h.send("POST", "/auth/register", None, Some(json!({ "email": "new@example.com" })))
    .await;
  let body = json!({ "email": "new@example.com", "deviceId": "d" });
  let (status, resp) = h.send("POST", "/auth/login", None, Some(body)).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(
    resp["message"],
    "Email not verified. Please check your email and click the verification link."
  );

  let body = json!({ "email": "not-an-email", "deviceId": "d" });
  let (status, resp) = h.send("POST", "/auth/login", None, Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(resp["message"], "Invalid email format");

  let body = json!({ "phoneNumber": "555-0123", "deviceId": "d" });
  let (status, resp) = h.send("POST", "/auth/login", None, Some(body)).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(resp["message"], "Invalid phone number format or country code.");
}

#[tokio::test]
async fn login_response_shape() {
  let h = harness().await;
  h.email_login("a@example.com", "dev").await;
  let (status, body) = h
    .send(
      "POST",
      "/auth/login",
      None,
      Some(json!({ "email": "a@example.com", "deviceId": "dev" })),
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Login successful and job started");
  assert_eq!(body["user"]["email"], "a@example.com");
  assert!(body["user"].get("phoneNumber").is_none());
  assert!(body["job"]["id"].is_string());
  assert!(body["job"]["startTime"].is_string());
}

// ─── Job lifecycle ───────────────────────────────────────────────────────────

#[tokio::test]
async fn second_login_rejects_first_token() {
  let h = harness().await;
  let first = h.email_login("a@example.com", "phone-a").await;
  let second = h.login("a@example.com", "phone-b").await;

  let point = json!({ "latitude": 1.0, "longitude": 2.0 });
  let (status, body) = h.track(&first, point.clone()).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["message"], "Job not found or inactive");

  let (status, _) = h.track(&second, point).await;
  assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn logout_ends_job_and_token() {
  let h = harness().await;
  let token = h.email_login("a@example.com", "dev").await;

  let (status, body) = h
    .send("POST", "/auth/logout", Some(&token), Some(json!({ "logoutPhoto": "out.jpg" })))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Logout successful and job ended");

  let (status, _) = h.send("GET", "/locations/job", Some(&token), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_accepts_empty_body() {
  let h = harness().await;
  let token = h.email_login("a@example.com", "dev").await;
  let (status, _) = h.send("POST", "/auth/logout", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn job_scoped_reads() {
  let h = harness().await;
  let token = h.email_login("a@example.com", "dev").await;

  h.track(&token, json!({ "latitude": 1.0, "longitude": 1.0 })).await;
  h.track(
    &token,
    json!({ "latitude": 1.0, "longitude": 1.0, "isStationary": true, "stationaryDuration": 600.0 }),
  )
  .await;

  let (status, body) = h.send("GET", "/locations/job", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 2);

  let (status, body) = h.send("GET", "/locations/stationary", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  let points = body.as_array().unwrap();
  assert_eq!(points.len(), 1);
  assert_eq!(points[0]["isStationary"], true);
  assert_eq!(points[0]["stationaryDuration"], 600.0);

  let (status, body) = h.send("GET", "/locations/jobs/daily", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["totalJobs"], 1);
  assert_eq!(body["jobs"][0]["deviceId"], "dev");
  assert_eq!(body["jobs"][0]["totalLocations"], 2);
}

// ─── OTP flow ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn otp_flow_end_to_end() {
  let h = harness().await;

  let (status, body) = h
    .send("POST", "/auth/send-otp", None, Some(json!({ "phoneNumber": PHONE })))
    .await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(body["smsSent"], true);

  let code = h.channel.last_code_for(PHONE).unwrap();
  let wrong = if code == "000000" { "111111" } else { "000000" };
  let (status, body) = h
    .send("POST", "/auth/verify-otp", None, Some(json!({ "phoneNumber": PHONE, "otp": wrong })))
    .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["message"], "Invalid OTP or OTP expired.");

  let (status, body) = h
    .send("POST", "/auth/verify-otp", None, Some(json!({ "phoneNumber": PHONE, "otp": code })))
    .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["user"]["phoneNumber"], PHONE);
  assert_eq!(body["user"]["isVerified"], true);
  let token = body["token"].as_str().unwrap();

  let (status, body) = h.send("POST", "/auth/validate-token", Some(token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Token is valid.");

  // Points without a job are accepted and show up in the user's day.
  let (status, body) = h
    .track(token, json!({ "latitude": -33.86, "longitude": 151.2 }))
    .await;
  assert_eq!(status, StatusCode::CREATED);
  assert!(body["location"]["jobId"].is_null());

  let (status, body) = h.send("GET", "/locations/daily", Some(token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn resend_invalidates_previous_code() {
  let h = harness().await;
  h.send("POST", "/auth/send-otp", None, Some(json!({ "phoneNumber": PHONE })))
    .await;

  // Replace the mailed code with one no generator can produce, so the resent
  // code is guaranteed to differ from it.
  let user = h
    .state
    .store
    .find_user_by_identity(&Identity::phone(PHONE).unwrap())
    .await
    .unwrap()
    .unwrap();
  h.state
    .store
    .set_one_time_credential(user.user_id, PendingCredential {
      digest:     credential::digest("1234567"),
      expires_at: time::now() + Duration::minutes(5),
    })
    .await
    .unwrap();

  let (status, _) = h
    .send("POST", "/auth/resend-otp", None, Some(json!({ "phoneNumber": PHONE })))
    .await;
  assert_eq!(status, StatusCode::OK);
  let new = h.channel.last_code_for(PHONE).unwrap();

  let (status, _) = h
    .send(
      "POST",
      "/auth/verify-otp",
      None,
      Some(json!({ "phoneNumber": PHONE, "otp": "1234567" })),
    )
    .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);

  let (status, _) = h
    .send("POST", "/auth/verify-otp", None, Some(json!({ "phoneNumber": PHONE, "otp": new })))
    .await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn otp_errors() {
  let h = harness().await;

  let (status, _) = h
    .send("POST", "/auth/send-otp", None, Some(json!({ "phoneNumber": "555-0123" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = h.send("POST", "/auth/send-otp", None, Some(json!({}))).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = h
    .send("POST", "/auth/resend-otp", None, Some(json!({ "phoneNumber": PHONE })))
    .await;
  assert_eq!(status, StatusCode::NOT_FOUND);

  let (status, _) = h
    .send(
      "POST",
      "/auth/verify-otp",
      None,
      Some(json!({ "phoneNumber": PHONE, "otp": "123456" })),
    )
    .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn job_endpoints_need_a_job_token() {
  let h = harness().await;
  let token = h.otp_login().await;

  let (status, _) = h.send("GET", "/locations/stationary", Some(&token), None).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, body) = h.send("POST", "/auth/logout", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["message"], "Logout successful");
}

// ─── Guard ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn guard_rejections() {
  let h = harness().await;

  let (status, body) = h.send("GET", "/locations/daily", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["message"], "No token, authorization denied");

  let (status, body) = h.send("GET", "/locations/daily", Some("garbage"), None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
  assert_eq!(body["message"], "Token is not valid");
}

// ─── Locations ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn coordinates_are_validated() {
  let h = harness().await;
  let token = h.otp_login().await;

  let (status, body) = h.track(&token, json!({ "latitude": 10.0 })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Latitude and longitude are required.");

  let (status, _) = h.track(&token, json!({ "latitude": 91.0, "longitude": 0.0 })).await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = h
    .track(&token, json!({ "latitude": 0.0, "longitude": 0.0, "timestamp": "yesterday" }))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn malformed_bodies_get_a_message() {
  let h = harness().await;
  let token = h.otp_login().await;

  let (status, body) = h
    .track(&token, json!({ "latitude": "12.5", "longitude": 1 }))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()), "{body}");

  let (status, body) = h
    .send("POST", "/auth/login", None, Some(json!({ "email": 5, "deviceId": "d" })))
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["message"].is_string());

  // No content type at all.
  let req = Request::builder()
    .method("POST")
    .uri("/auth/register")
    .body(Body::from(r#"{"email":"a@example.com"}"#))
    .unwrap();
  let resp = api_router(h.state.clone()).oneshot(req).await.unwrap();
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
  let body: Value = serde_json::from_slice(&bytes).unwrap();
  assert!(body["message"].is_string());
}

#[tokio::test]
async fn bad_dates_are_rejected() {
  let h = harness().await;
  let token = h.otp_login().await;

  let (status, body) = h
    .send("GET", "/locations/daily?date=2024-13-01", Some(&token), None)
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert_eq!(body["message"], "Invalid date format. Use YYYY-MM-DD.");

  let (status, _) = h
    .send("GET", "/locations/daily-summary/not-a-date", Some(&token), None)
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = h
    .send(
      "GET",
      "/locations/date-range?start=2024-03-10&end=2024-03-09",
      Some(&token),
      None,
    )
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let (status, _) = h
    .send("GET", "/locations/date-range?start=2024-03-10", Some(&token), None)
    .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn date_range_is_inclusive() {
  let h = harness().await;
  let token = h.otp_login().await;
  for ts in ["2024-03-08T23:59:59Z", "2024-03-09T00:00:00Z", "2024-03-10T00:00:00Z", "2024-03-10T00:00:01Z"] {
    h.track(&token, json!({ "latitude": 0.0, "longitude": 0.0, "timestamp": ts }))
      .await;
  }

  let (status, body) = h
    .send(
      "GET",
      "/locations/date-range?start=2024-03-09&end=2024-03-10T00:00:00Z",
      Some(&token),
      None,
    )
    .await;
  assert_eq!(status, StatusCode::OK);
  let stamps: Vec<&str> = body
    .as_array()
    .unwrap()
    .iter()
    .map(|p| p["timestamp"].as_str().unwrap())
    .collect();
  assert_eq!(stamps, ["2024-03-09T00:00:00Z", "2024-03-10T00:00:00Z"]);
}

#[tokio::test]
async fn calendar_splits_at_utc_midnight() {
  let h = harness().await;
  let token = h.otp_login().await;
  for ts in ["2024-03-09T23:59:59.999Z", "2024-03-10T00:00:00Z", "2024-03-09T06:00:00Z"] {
    h.track(&token, json!({ "latitude": 0.0, "longitude": 0.0, "timestamp": ts }))
      .await;
  }

  let (status, body) = h.send("GET", "/locations/calendar", Some(&token), None).await;
  assert_eq!(status, StatusCode::OK);
  let days = body.as_array().unwrap();
  assert_eq!(days.len(), 2);
  assert_eq!(days[0]["date"], "2024-03-10");
  assert_eq!(days[0]["count"], 1);
  assert_eq!(days[1]["date"], "2024-03-09");
  assert_eq!(days[1]["count"], 2);
  assert_eq!(days[1]["timestamp"], "2024-03-09T06:00:00Z");
}
