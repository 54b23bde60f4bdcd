//! Runtime configuration, deserialised from `config.toml` layered with
//! `FIELDTRACK_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use fieldtrack_auth::AuthConfig;
use serde::Deserialize;

/// Printed by `--print-default-config`. Kept in sync with
/// [`ServerConfig::default`] by a test.
pub const DEFAULT_CONFIG: &str = r#"# fieldtrack server configuration

host       = "127.0.0.1"
port       = 3000
store_path = "~/.local/share/fieldtrack/fieldtrack.db"
# Base URL used in emailed verification links.
public_url = "http://localhost:3000"

# Required. Prefer FIELDTRACK_JWT_SECRET over writing it here.
jwt_secret = ""
jwt_issuer = "fieldtrack"

email_token_ttl_secs = 86400
otp_ttl_secs         = 300
job_session_ttl_secs = 86400
otp_session_ttl_secs = 2592000

# Without a [mail] section verification links are written to the log.
# [mail]
# api_url = "https://api.mailgun.net/v3/mg.example.com"
# api_key = "key-..."
# from    = "Fieldtrack <no-reply@example.com>"

# Without an [sms] section one-time codes are written to the log.
# [sms]
# account_sid = "AC..."
# auth_token  = "..."
# from        = "+15005550006"
"#;

/// HTTP mail API settings (Mailgun-compatible `POST {api_url}/messages`).
#[derive(Debug, Clone, Deserialize)]
pub struct MailConfig {
  pub api_url: String,
  pub api_key: String,
  pub from:    String,
}

/// Twilio Messages API settings.
#[derive(Debug, Clone, Deserialize)]
pub struct SmsConfig {
  pub account_sid: String,
  pub auth_token:  String,
  pub from:        String,
  #[serde(default = "default_sms_api_url")]
  pub api_url:     String,
}

fn default_sms_api_url() -> String { "https://api.twilio.com".into() }

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub store_path:           PathBuf,
  pub public_url:           String,
  pub jwt_secret:           String,
  pub jwt_issuer:           String,
  pub email_token_ttl_secs: u64,
  pub otp_ttl_secs:         u64,
  pub job_session_ttl_secs: u64,
  pub otp_session_ttl_secs: u64,
  pub mail:                 Option<MailConfig>,
  pub sms:                  Option<SmsConfig>,
}

impl Default for ServerConfig {
  fn default() -> Self {
    let auth = AuthConfig::default();
    Self {
      host:                 "127.0.0.1".into(),
      port:                 3000,
      store_path:           PathBuf::from("~/.local/share/fieldtrack/fieldtrack.db"),
      public_url:           auth.public_url,
      jwt_secret:           auth.jwt_secret,
      jwt_issuer:           auth.jwt_issuer,
      email_token_ttl_secs: auth.email_token_ttl_secs,
      otp_ttl_secs:         auth.otp_ttl_secs,
      job_session_ttl_secs: auth.job_session_ttl_secs,
      otp_session_ttl_secs: auth.otp_session_ttl_secs,
      mail:                 None,
      sms:                  None,
    }
  }
}

impl ServerConfig {
  /// Read `path` (optional) and the environment, then validate.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(
        // FIELDTRACK_JWT_SECRET, FIELDTRACK_SMS__AUTH_TOKEN
        config::Environment::with_prefix("FIELDTRACK")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()
      .context("failed to read config file")?;

    let cfg: ServerConfig = settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn validate(&self) -> anyhow::Result<()> {
    anyhow::ensure!(
      !self.jwt_secret.trim().is_empty(),
      "jwt_secret must be set (config file or FIELDTRACK_JWT_SECRET)"
    );
    anyhow::ensure!(self.otp_ttl_secs > 0, "otp_ttl_secs must be positive");
    anyhow::ensure!(self.email_token_ttl_secs > 0, "email_token_ttl_secs must be positive");
    Ok(())
  }

  pub fn auth_config(&self) -> AuthConfig {
    AuthConfig {
      jwt_secret:           self.jwt_secret.clone(),
      jwt_issuer:           self.jwt_issuer.clone(),
      public_url:           self.public_url.clone(),
      email_token_ttl_secs: self.email_token_ttl_secs,
      otp_ttl_secs:         self.otp_ttl_secs,
      job_session_ttl_secs: self.job_session_ttl_secs,
      otp_session_ttl_secs: self.otp_session_ttl_secs,
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
