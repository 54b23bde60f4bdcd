//! Authentication settings.

/// Signing material, public URL and lifetimes used by [`crate::AuthService`].
#[derive(Debug, Clone)]
pub struct AuthConfig {
  /// HMAC secret for HS256 session tokens.
  pub jwt_secret:           String,
  /// `iss` claim written into and required of every session token.
  pub jwt_issuer:           String,
  /// Base URL that verification links point at, without a trailing slash.
  pub public_url:           String,
  /// Email verification link lifetime (default: 86_400 = 24 hours).
  pub email_token_ttl_secs: u64,
  /// SMS code lifetime (default: 300 = 5 minutes).
  pub otp_ttl_secs:         u64,
  /// Lifetime of job-scoped tokens issued at login (default: 24 hours).
  pub job_session_ttl_secs: u64,
  /// Lifetime of user-scoped tokens issued after OTP verification
  /// (default: 2_592_000 = 30 days).
  pub otp_session_ttl_secs: u64,
}

impl Default for AuthConfig {
  fn default() -> Self {
    Self {
      jwt_secret:           String::new(),
      jwt_issuer:           "fieldtrack".into(),
      public_url:           "http://localhost:3000".into(),
      email_token_ttl_secs: 86_400,
      otp_ttl_secs:         300,
      job_session_ttl_secs: 86_400,
      otp_session_ttl_secs: 2_592_000,
    }
  }
}

impl AuthConfig {
  /// The link mailed to a registering user.
  pub fn verification_link(&self, token: &str) -> String {
    format!(
      "{}/auth/verify-email?token={token}",
      self.public_url.trim_end_matches('/')
    )
  }
}
