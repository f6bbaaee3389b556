//! Error types for `jobboard-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Required input is missing or malformed. `missing` names the absent
  /// fields when the failure is a presence check.
  #[error("{message}")]
  Validation {
    message: String,
    missing: Vec<String>,
  },

  #[error("{0} not found")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("{0}")]
  Unauthorized(String),

  #[error("access to this resource is not allowed")]
  Forbidden,

  #[error("account is already verified")]
  AlreadyVerified,

  #[error("invalid profile step: {0}")]
  InvalidStep(i64),

  #[error("internal error: {0}")]
  Internal(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn validation(message: impl Into<String>) -> Self {
    Self::Validation { message: message.into(), missing: Vec::new() }
  }

  /// A validation error listing every required field that was absent.
  pub fn missing_fields(missing: Vec<String>) -> Self {
    Self::Validation {
      message: format!("the following fields are required: {}", missing.join(", ")),
      missing,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
