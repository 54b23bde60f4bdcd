//! HTTP delivery of verification links and one-time codes.
//!
//! [`Dispatcher`] routes each [`Notification`] to the matching provider.
//! A kind whose provider is not configured is written to the log instead,
//! which keeps development setups usable without credentials.

use std::time::Duration;

use anyhow::Context as _;
use fieldtrack_auth::{DeliveryError, LogChannel, Notification, NotificationChannel};
use reqwest::Client;

use crate::config::{MailConfig, ServerConfig, SmsConfig};

fn http_client() -> anyhow::Result<Client> {
  Client::builder()
    .timeout(Duration::from_secs(10))
    .build()
    .context("failed to build HTTP client")
}

fn failed(provider: &str) -> impl Fn(reqwest::Error) -> DeliveryError + '_ {
  move |e| DeliveryError(format!("{provider}: {e}"))
}

// ─── Mail ─────────────────────────────────────────────────────────────────────

/// Mailgun-compatible `POST {api_url}/messages`.
#[derive(Clone)]
pub struct MailTransport {
  client: Client,
  config: MailConfig,
}

impl MailTransport {
  pub fn new(client: Client, config: MailConfig) -> Self { Self { client, config } }

  fn url(&self) -> String {
    format!("{}/messages", self.config.api_url.trim_end_matches('/'))
  }

  pub async fn send(&self, to: &str, subject: &str, text: &str) -> Result<(), DeliveryError> {
    self
      .client
      .post(self.url())
      .basic_auth("api", Some(&self.config.api_key))
      .form(&[
        ("from", self.config.from.as_str()),
        ("to", to),
        ("subject", subject),
        ("text", text),
      ])
      .send()
      .await
      .and_then(reqwest::Response::error_for_status)
      .map_err(failed("mail"))?;
    Ok(())
  }
}

// ─── SMS ──────────────────────────────────────────────────────────────────────

/// Twilio Messages API.
#[derive(Clone)]
pub struct SmsTransport {
  client: Client,
  config: SmsConfig,
}

impl SmsTransport {
  pub fn new(client: Client, config: SmsConfig) -> Self { Self { client, config } }

  fn url(&self) -> String {
    format!(
      "{}/2010-04-01/Accounts/{}/Messages.json",
      self.config.api_url.trim_end_matches('/'),
      self.config.account_sid
    )
  }

  pub async fn send(&self, to: &str, body: &str) -> Result<(), DeliveryError> {
    self
      .client
      .post(self.url())
      .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
      .form(&[("To", to), ("From", self.config.from.as_str()), ("Body", body)])
      .send()
      .await
      .and_then(reqwest::Response::error_for_status)
      .map_err(failed("sms"))?;
    Ok(())
  }
}

// ─── Dispatcher ───────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct Dispatcher {
  mail:     Option<MailTransport>,
  sms:      Option<SmsTransport>,
  fallback: LogChannel,
}

impl Dispatcher {
  pub fn from_config(cfg: &ServerConfig) -> anyhow::Result<Self> {
    if cfg.mail.is_none() && cfg.sms.is_none() {
      return Ok(Self::default());
    }
    let client = http_client()?;
    Ok(Self {
      mail:     cfg.mail.clone().map(|m| MailTransport::new(client.clone(), m)),
      sms:      cfg.sms.clone().map(|s| SmsTransport::new(client.clone(), s)),
      fallback: LogChannel,
    })
  }

  pub fn has_mail(&self) -> bool { self.mail.is_some() }

  pub fn has_sms(&self) -> bool { self.sms.is_some() }
}

impl NotificationChannel for Dispatcher {
  async fn deliver(&self, notification: Notification) -> Result<(), DeliveryError> {
    match (&notification, &self.mail, &self.sms) {
      (Notification::VerificationLink { email, .. }, Some(mail), _) => {
        mail.send(email, notification.subject(), &notification.body()).await
      }
      (Notification::OneTimeCode { phone, .. }, _, Some(sms)) => {
        sms.send(phone, &notification.body()).await
      }
      _ => self.fallback.deliver(notification).await,
    }
  }
}
