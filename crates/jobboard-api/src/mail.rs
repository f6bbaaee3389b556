//! Mail delivery for the server binary.
//!
//! Without a relay configured, messages are only logged and reported as not
//! delivered. With one, each message is POSTed to the relay as JSON.

use std::{future::Future, time::Duration};

use jobboard_core::mail::{Email, Mailer};
use reqwest::Client;
use serde::Serialize;
use tracing::{info, warn};

use crate::MailConfig;

/// Logs messages instead of sending them.
pub struct LogMailer;

impl Mailer for LogMailer {
  fn send(&self, email: Email) -> impl Future<Output = bool> + Send + '_ {
    async move {
      info!(to = %email.to, subject = %email.subject, "no mail relay configured; message not sent");
      false
    }
  }
}

#[derive(Serialize)]
struct RelayMessage<'a> {
  from:    &'a str,
  to:      &'a str,
  subject: &'a str,
  html:    &'a str,
  text:    &'a str,
}

/// Hands messages to an HTTP mail relay.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RelayMailer {
  client: Client,
  url:    String,
  from:   String,
}

impl RelayMailer {
  pub fn new(url: impl Into<String>, from: impl Into<String>) -> reqwest::Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
    Ok(Self { client, url: url.into(), from: from.into() })
  }
}

impl Mailer for RelayMailer {
  fn send(&self, email: Email) -> impl Future<Output = bool> + Send + '_ {
    async move {
      let message = RelayMessage {
        from:    &self.from,
        to:      &email.to,
        subject: &email.subject,
        html:    &email.html,
        text:    &email.text,
      };
      match self.client.post(&self.url).json(&message).send().await {
        Ok(res) if res.status().is_success() => {
          info!(to = %email.to, "mail delivered to relay");
          true
        }
        Ok(res) => {
          warn!(to = %email.to, status = %res.status(), "mail relay refused message");
          false
        }
        Err(e) => {
          warn!(to = %email.to, error = %e, "mail relay unreachable");
          false
        }
      }
    }
  }
}

/// The mailer chosen by configuration.
pub enum MailTransport {
  Log(LogMailer),
  Relay(RelayMailer),
}

impl MailTransport {
  pub fn from_config(config: &MailConfig) -> reqwest::Result<Self> {
    Ok(match config.relay_url.as_deref().filter(|u| !u.trim().is_empty()) {
      Some(url) => Self::Relay(RelayMailer::new(url, config.from.clone())?),
      None => Self::Log(LogMailer),
    })
  }
}

impl Mailer for MailTransport {
  fn send(&self, email: Email) -> impl Future<Output = bool> + Send + '_ {
    async move {
      match self {
        Self::Log(m) => m.send(email).await,
        Self::Relay(m) => m.send(email).await,
      }
    }
  }
}
