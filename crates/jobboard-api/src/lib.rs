//! JSON HTTP API for the job-board backend.
//!
//! Exposes an axum [`Router`] backed by any [`AccountStore`] and [`Mailer`].
//!
//! # Mounting
//!
//! | Prefix | Contents |
//! |--------|----------|
//! | `/api/users` | job seeker accounts, see [`handlers::users`] |
//! | `/api/companies` | company accounts, see [`handlers::companies`] |
//! | `/uploads` | uploaded files, served statically |

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod mail;
pub mod session;
pub mod uploads;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{Router, extract::DefaultBodyLimit, middleware};
use chrono::Duration;
use jobboard_core::{
  lifecycle::{Lifecycle, MAX_LICENSE_UPLOADS, Policy},
  mail::Mailer,
  store::AccountStore,
};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

use uploads::{FileStore, MAX_UPLOAD_BYTES};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `JOBBOARD_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:             String,
  #[serde(default = "default_port")]
  pub port:             u16,
  #[serde(default = "default_store_path")]
  pub store_path:       PathBuf,
  #[serde(default = "default_upload_dir")]
  pub upload_dir:       PathBuf,
  /// HMAC key for session tokens. Required in production.
  #[serde(default)]
  pub session_secret:   String,
  #[serde(default)]
  pub environment:      Environment,
  #[serde(default = "default_code_ttl")]
  pub code_ttl_minutes: i64,
  #[serde(default)]
  pub mail:             MailConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
  Development,
  #[default]
  Production,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MailConfig {
  /// HTTP endpoint that accepts outgoing mail as JSON. Without one, mail is
  /// only logged.
  #[serde(default)]
  pub relay_url: Option<String>,
  #[serde(default = "default_from")]
  pub from:      String,
}

impl Default for MailConfig {
  fn default() -> Self { Self { relay_url: None, from: default_from() } }
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 5000 }
fn default_store_path() -> PathBuf { PathBuf::from("jobboard.db") }
fn default_upload_dir() -> PathBuf { PathBuf::from("public/uploads") }
fn default_code_ttl() -> i64 { jobboard_core::verification::DEFAULT_CODE_TTL_MINUTES }
fn default_from() -> String { "no-reply@jobboard.local".to_owned() }

impl ServerConfig {
  pub fn is_development(&self) -> bool { self.environment == Environment::Development }

  pub fn policy(&self) -> Policy {
    Policy {
      code_ttl:     Duration::minutes(self.code_ttl_minutes),
      expose_codes: self.is_development(),
    }
  }
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S, M> {
  pub lifecycle: Arc<Lifecycle<S, M>>,
  pub files:     Arc<FileStore>,
  pub config:    Arc<ServerConfig>,
}

impl<S, M> Clone for AppState<S, M> {
  fn clone(&self) -> Self {
    Self {
      lifecycle: self.lifecycle.clone(),
      files:     self.files.clone(),
      config:    self.config.clone(),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Largest request body accepted: a full batch of license uploads plus form
/// overhead.
pub const MAX_REQUEST_BYTES: usize = MAX_UPLOAD_BYTES * MAX_LICENSE_UPLOADS + 1024 * 1024;

/// Build the axum [`Router`] for the API.
pub fn router<S, M>(state: AppState<S, M>) -> Router
where
  S: AccountStore + 'static,
  M: Mailer + 'static,
{
  let uploads = ServeDir::new(state.files.root());

  Router::new()
    .nest("/api/users", handlers::users::routes::<S, M>())
    .nest("/api/companies", handlers::companies::routes::<S, M>())
    .nest_service("/uploads", uploads)
    .layer(middleware::map_response_with_state(
      state.config.clone(),
      error::expose_internal_detail,
    ))
    .layer(DefaultBodyLimit::max(MAX_REQUEST_BYTES))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

#[cfg(test)]
mod tests;
