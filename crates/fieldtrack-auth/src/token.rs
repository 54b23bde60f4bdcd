//! HS256 session token issuance and verification.

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{AuthConfig, AuthError, Result};

/// Claims carried by every session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
  /// Subject: the user id.
  pub sub: String,
  /// The job this token is bound to; absent for OTP-flow tokens.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub job: Option<String>,
  pub iss: String,
  pub iat: i64,
  pub exp: i64,
  pub jti: String,
}

impl SessionClaims {
  pub fn user_id(&self) -> Result<Uuid> {
    Uuid::parse_str(&self.sub).map_err(|_| AuthError::InvalidToken)
  }

  pub fn job_id(&self) -> Result<Option<Uuid>> {
    self
      .job
      .as_deref()
      .map(Uuid::parse_str)
      .transpose()
      .map_err(|_| AuthError::InvalidToken)
  }
}

/// Mint a token for `user_id`, optionally bound to `job_id`, valid for
/// `ttl_secs` from now.
pub fn issue_session_token(
  user_id: Uuid,
  job_id: Option<Uuid>,
  ttl_secs: u64,
  config: &AuthConfig,
) -> Result<String> {
  let now = Utc::now().timestamp();
  let claims = SessionClaims {
    sub: user_id.to_string(),
    job: job_id.map(|id| id.to_string()),
    iss: config.jwt_issuer.clone(),
    iat: now,
    exp: now.saturating_add(i64::try_from(ttl_secs).unwrap_or(i64::MAX)),
    jti: Uuid::new_v4().to_string(),
  };
  encode_claims(&claims, config)
}

fn encode_claims(claims: &SessionClaims, config: &AuthConfig) -> Result<String> {
  let key = EncodingKey::from_secret(config.jwt_secret.as_bytes());
  jsonwebtoken::encode(&Header::new(Algorithm::HS256), claims, &key)
    .map_err(|e| AuthError::Token(format!("JWT encode: {e}")))
}

/// Verify signature, issuer and expiry (no leeway) and return the claims.
///
/// Every failure collapses to [`AuthError::InvalidToken`]; the cause is only
/// logged at debug level.
pub fn decode_session_token(token: &str, config: &AuthConfig) -> Result<SessionClaims> {
  let key = DecodingKey::from_secret(config.jwt_secret.as_bytes());

  let mut validation = Validation::new(Algorithm::HS256);
  validation.leeway = 0;
  validation.set_issuer(&[&config.jwt_issuer]);
  validation.set_required_spec_claims(&["sub", "exp", "iat", "iss"]);

  jsonwebtoken::decode::<SessionClaims>(token, &key, &validation)
    .map(|data| data.claims)
    .map_err(|e| {
      match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
          tracing::debug!("session token expired");
        }
        _ => tracing::debug!(error = %e, "session token rejected"),
      }
      AuthError::InvalidToken
    })
}

#[cfg(test)]
mod tests {
  use super::*;

  fn config() -> AuthConfig {
    AuthConfig {
      jwt_secret: "test-secret".into(),
      jwt_issuer: "fieldtrack-test".into(),
      ..AuthConfig::default()
    }
  }

  #[test]
  fn job_token_roundtrip() {
    let config = config();
    let user_id = Uuid::new_v4();
    let job_id = Uuid::new_v4();

    let token = issue_session_token(user_id, Some(job_id), 3600, &config).unwrap();
    let claims = decode_session_token(&token, &config).unwrap();

    assert_eq!(claims.user_id().unwrap(), user_id);
    assert_eq!(claims.job_id().unwrap(), Some(job_id));
    assert_eq!(claims.iss, "fieldtrack-test");
    assert_eq!(claims.exp - claims.iat, 3600);
  }

  #[test]
  fn user_token_has_no_job() {
    let config = config();
    let token = issue_session_token(Uuid::new_v4(), None, 60, &config).unwrap();
    let claims = decode_session_token(&token, &config).unwrap();
    assert_eq!(claims.job_id().unwrap(), None);
  }

  #[test]
  fn jti_is_unique() {
    let config = config();
    let uid = Uuid::new_v4();
    let a = decode_session_token(&issue_session_token(uid, None, 60, &config).unwrap(), &config)
      .unwrap();
    let b = decode_session_token(&issue_session_token(uid, None, 60, &config).unwrap(), &config)
      .unwrap();
    assert_ne!(a.jti, b.jti);
  }

  #[test]
  fn expired_token_is_rejected() {
    let config = config();
    let now = Utc::now().timestamp();
    let claims = SessionClaims {
      sub: Uuid::new_v4().to_string(),
      job: None,
      iss: config.jwt_issuer.clone(),
      iat: now - 120,
      exp: now - 1,
      jti: Uuid::new_v4().to_string(),
    };
    let token = encode_claims(&claims, &config).unwrap();
    assert!(matches!(
      decode_session_token(&token, &config),
      Err(AuthError::InvalidToken)
    ));
  }

  #[test]
  fn wrong_secret_or_issuer_is_rejected() {
    let config = config();
    let token = issue_session_token(Uuid::new_v4(), None, 60, &config).unwrap();

    let other_secret = AuthConfig { jwt_secret: "other".into(), ..config.clone() };
    assert!(decode_session_token(&token, &other_secret).is_err());

    let other_issuer = AuthConfig { jwt_issuer: "someone-else".into(), ..config };
    assert!(decode_session_token(&token, &other_issuer).is_err());
  }

  #[test]
  fn garbage_is_rejected() {
    assert!(matches!(
      decode_session_token("not.a.jwt", &config()),
      Err(AuthError::InvalidToken)
    ));
  }
}
