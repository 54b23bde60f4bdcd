//! Authentication service: credential issuance, verification, job sessions
//! and bearer-token resolution.

use std::sync::Arc;

use chrono::Duration;
use fieldtrack_core::{
  identity::Identity,
  job::{Job, NewJob},
  store::TrackerStore,
  time,
  user::{PendingCredential, User},
};
use tracing::{info, warn};

use crate::{
  AuthConfig, AuthError, Result,
  credential,
  notify::{Notification, NotificationChannel},
  token,
};

/// Result of issuing a one-time credential. The credential is persisted even
/// when `delivered` is false.
#[derive(Debug, Clone)]
pub struct IssueOutcome {
  pub user:      User,
  pub delivered: bool,
}

/// Input for the job-flow login.
#[derive(Debug, Clone)]
pub struct LoginInput {
  pub identity:    Identity,
  pub device_id:   String,
  pub login_photo: Option<String>,
}

/// Successful login: a job-scoped token and the job it opened.
#[derive(Debug, Clone)]
pub struct LoginOutput {
  pub token: String,
  pub user:  User,
  pub job:   Job,
}

/// Successful OTP verification: a user-scoped token.
#[derive(Debug, Clone)]
pub struct OtpLogin {
  pub token: String,
  pub user:  User,
}

/// An authenticated request context.
#[derive(Debug, Clone)]
pub struct Session {
  pub user: User,
  /// Present, and active at resolution time, for job-scoped tokens.
  pub job:  Option<Job>,
}

/// Authentication service.
///
/// Generic over the storage backend and the notification channel so that the
/// auth layer has no dependency on a database or a mail provider.
pub struct AuthService<S, N> {
  store:   Arc<S>,
  channel: N,
  config:  AuthConfig,
}

impl<S, N> AuthService<S, N>
where
  S: TrackerStore,
  N: NotificationChannel,
{
  pub fn new(store: Arc<S>, channel: N, config: AuthConfig) -> Self {
    Self { store, channel, config }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn config(&self) -> &AuthConfig { &self.config }

  // ─── Email flow ─────────────────────────────────────────────────────────────

  /// Create (or reuse) an unverified email user and mail a verification
  /// link. Each call replaces any earlier link.
  pub async fn register(&self, email: &str) -> Result<IssueOutcome> {
    let identity = Identity::email(email)?;
    let user = self
      .store
      .upsert_identity(identity)
      .await
      .map_err(AuthError::from_store)?;

    if user.verified {
      return Err(AuthError::AlreadyVerified);
    }

    let raw = credential::generate_email_token();
    let ttl = self.config.email_token_ttl_secs;
    self.store_credential(&user, &raw, ttl).await?;

    let notification = Notification::VerificationLink {
      email: user.identity.to_string(),
      link:  self.config.verification_link(&raw),
    };
    let delivered = self.dispatch(notification).await;

    info!(user_id = %user.user_id, delivered, "verification link issued");
    Ok(IssueOutcome { user, delivered })
  }

  /// Consume the token carried by a verification link.
  pub async fn verify_email(&self, raw_token: &str) -> Result<User> {
    let raw_token = raw_token.trim();
    if raw_token.is_empty() {
      return Err(AuthError::InvalidRequest("Verification token is required".into()));
    }

    let digest = credential::digest(raw_token);
    let user = self
      .store
      .find_user_by_credential(digest.clone())
      .await
      .map_err(AuthError::from_store)?
      .ok_or(AuthError::Mismatch)?;

    let now = time::now();
    match &user.pending {
      None => return Err(AuthError::Mismatch),
      Some(pending) if pending.is_expired(now) => return Err(AuthError::Expired),
      Some(_) => {}
    }

    let user = self
      .store
      .consume_one_time_credential(user.user_id, digest, now)
      .await
      .map_err(AuthError::from_store)?;

    info!(user_id = %user.user_id, "email verified");
    Ok(user)
  }

  // ─── Job sessions ───────────────────────────────────────────────────────────

  /// Open a job for a verified user and mint a token bound to it. A job the
  /// user left open on another login is closed.
  pub async fn login(&self, input: LoginInput) -> Result<LoginOutput> {
    let device_id = input.device_id.trim();
    if device_id.is_empty() {
      return Err(AuthError::InvalidRequest("Device ID is required".into()));
    }

    let mut user = self
      .store
      .find_user_by_identity(&input.identity)
      .await
      .map_err(AuthError::from_store)?
      .ok_or(AuthError::NotFound)?;

    if !user.verified {
      return Err(AuthError::Unverified);
    }

    let job = self
      .store
      .open_job(NewJob {
        user_id:     user.user_id,
        device_id:   device_id.to_owned(),
        login_photo: input.login_photo,
      })
      .await
      .map_err(AuthError::from_store)?;

    let token = token::issue_session_token(
      user.user_id,
      Some(job.job_id),
      self.config.job_session_ttl_secs,
      &self.config,
    )?;

    user.current_job_id = Some(job.job_id);
    user.last_login_at = Some(job.started_at);

    info!(user_id = %user.user_id, job_id = %job.job_id, "job opened");
    Ok(LoginOutput { token, user, job })
  }

  /// End the session's job. Returns `None` for sessions without a job, which
  /// are acknowledged without any state change.
  pub async fn logout(
    &self,
    session: &Session,
    logout_photo: Option<String>,
  ) -> Result<Option<Job>> {
    let Some(job) = &session.job else {
      info!(user_id = %session.user.user_id, "logout without job");
      return Ok(None);
    };

    let job = self
      .store
      .close_job(job.job_id, logout_photo)
      .await
      .map_err(AuthError::from_store)?;

    info!(user_id = %session.user.user_id, job_id = %job.job_id, "job closed");
    Ok(Some(job))
  }

  // ─── OTP flow ───────────────────────────────────────────────────────────────

  /// Create (or reuse) a phone user and text it a fresh code.
  pub async fn send_otp(&self, phone: &str) -> Result<IssueOutcome> {
    let identity = Identity::phone(phone)?;
    let user = self
      .store
      .upsert_identity(identity)
      .await
      .map_err(AuthError::from_store)?;
    self.issue_otp(user).await
  }

  /// Text a fresh code to an existing phone user, invalidating the last one.
  pub async fn resend_otp(&self, phone: &str) -> Result<IssueOutcome> {
    let identity = Identity::phone(phone)?;
    let user = self
      .store
      .find_user_by_identity(&identity)
      .await
      .map_err(AuthError::from_store)?
      .ok_or(AuthError::NotFound)?;
    self.issue_otp(user).await
  }

  /// Check a code and, on success, mint a user-scoped token.
  pub async fn verify_otp(&self, phone: &str, code: &str) -> Result<OtpLogin> {
    let identity = Identity::phone(phone)?;
    let code = code.trim();
    if code.is_empty() {
      return Err(AuthError::InvalidRequest("OTP is required".into()));
    }

    let user = self
      .store
      .find_user_by_identity(&identity)
      .await
      .map_err(AuthError::from_store)?
      .ok_or(AuthError::NotFound)?;

    let now = time::now();
    let pending = user.pending.as_ref().ok_or(AuthError::Mismatch)?;
    if pending.is_expired(now) {
      return Err(AuthError::Expired);
    }
    let digest = credential::digest(code);
    if digest != pending.digest {
      return Err(AuthError::Mismatch);
    }

    // A concurrent verify or resend may have replaced the code since the
    // read above; the store re-checks the digest when redeeming it.
    let user = self
      .store
      .consume_one_time_credential(user.user_id, digest, now)
      .await
      .map_err(AuthError::from_store)?;

    let token = token::issue_session_token(
      user.user_id,
      None,
      self.config.otp_session_ttl_secs,
      &self.config,
    )?;

    info!(user_id = %user.user_id, "phone verified");
    Ok(OtpLogin { token, user })
  }

  // ─── Guard ──────────────────────────────────────────────────────────────────

  /// Resolve a bearer token to a [`Session`].
  ///
  /// The user must exist and be active. A job-scoped token additionally
  /// requires its job to still be active.
  pub async fn authenticate(&self, bearer: Option<&str>) -> Result<Session> {
    let raw = bearer
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .ok_or(AuthError::Unauthenticated)?;

    let claims = token::decode_session_token(raw, &self.config)?;
    let user_id = claims.user_id()?;

    let user = self
      .store
      .get_user(user_id)
      .await
      .map_err(AuthError::from_store)?
      .filter(|u| u.is_active)
      .ok_or(AuthError::InvalidToken)?;

    let job = match claims.job_id()? {
      None => None,
      Some(job_id) => {
        let job = self
          .store
          .get_job(job_id)
          .await
          .map_err(AuthError::from_store)?
          .filter(|j| j.is_active && j.user_id == user.user_id)
          .ok_or(AuthError::JobInactive)?;
        Some(job)
      }
    };

    Ok(Session { user, job })
  }

  // ─── Internals ──────────────────────────────────────────────────────────────

  async fn issue_otp(&self, user: User) -> Result<IssueOutcome> {
    let code = credential::generate_otp();
    self
      .store_credential(&user, &code, self.config.otp_ttl_secs)
      .await?;

    let notification = Notification::OneTimeCode {
      phone: user.identity.to_string(),
      code,
    };
    let delivered = self.dispatch(notification).await;

    info!(user_id = %user.user_id, delivered, "one-time code issued");
    Ok(IssueOutcome { user, delivered })
  }

  async fn store_credential(&self, user: &User, raw: &str, ttl_secs: u64) -> Result<()> {
    let ttl = Duration::seconds(i64::try_from(ttl_secs).unwrap_or(i64::MAX / 1_000));
    let pending = PendingCredential {
      digest:     credential::digest(raw),
      expires_at: time::now() + ttl,
    };
    self
      .store
      .set_one_time_credential(user.user_id, pending)
      .await
      .map_err(AuthError::from_store)
  }

  /// Persist first, notify second: a failed delivery is logged and reported,
  /// never rolled back.
  async fn dispatch(&self, notification: Notification) -> bool {
    let recipient = notification.recipient().to_owned();
    match self.channel.deliver(notification).await {
      Ok(()) => true,
      Err(e) => {
        warn!(recipient = %recipient, error = %e, "notification delivery failed");
        false
      }
    }
  }
}
