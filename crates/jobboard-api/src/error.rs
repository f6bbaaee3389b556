//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure is rendered as `{"success": false, "message": …}`; a failed
//! presence check adds `missingFields`. Internal failures never put their
//! cause in the message. In development the cause is added as `error` by
//! [`expose_internal_detail`].

use std::sync::Arc;

use axum::{
  Json,
  extract::{
    State,
    multipart::{MultipartError, MultipartRejection},
    rejection::{JsonRejection, PathRejection, QueryRejection},
  },
  http::StatusCode,
  response::{IntoResponse, Response},
};
use jobboard_core::Error as CoreError;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::ServerConfig;

const INTERNAL_MESSAGE: &str = "internal server error";

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error(transparent)]
  Core(#[from] CoreError),

  #[error("{0}")]
  BadRequest(String),

  #[error("{0}")]
  PayloadTooLarge(String),

  #[error("{0}")]
  UnsupportedMediaType(String),

  #[error("file storage error: {0}")]
  Io(#[from] std::io::Error),
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<PathRejection> for ApiError {
  fn from(rejection: PathRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<QueryRejection> for ApiError {
  fn from(rejection: QueryRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<MultipartRejection> for ApiError {
  fn from(rejection: MultipartRejection) -> Self { Self::BadRequest(rejection.body_text()) }
}

impl From<MultipartError> for ApiError {
  fn from(err: MultipartError) -> Self {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
      Self::PayloadTooLarge(err.body_text())
    } else {
      Self::BadRequest(err.body_text())
    }
  }
}

/// The hidden cause of a 500, carried on the response for
/// [`expose_internal_detail`].
#[derive(Debug, Clone)]
pub struct InternalDetail(pub String);

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = match &self {
      ApiError::Core(e) => match e {
        CoreError::Validation { .. } | CoreError::InvalidStep(_) | CoreError::AlreadyVerified => {
          StatusCode::BAD_REQUEST
        }
        CoreError::NotFound(_) => StatusCode::NOT_FOUND,
        CoreError::Conflict(_) => StatusCode::CONFLICT,
        CoreError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        CoreError::Forbidden => StatusCode::FORBIDDEN,
        CoreError::Internal(_) | CoreError::Store(_) | CoreError::Serialization(_) => {
          StatusCode::INTERNAL_SERVER_ERROR
        }
      },
      ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
      ApiError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
      ApiError::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
      ApiError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
      error!(error = %self, "request failed");
      let mut res =
        (status, Json(json!({ "success": false, "message": INTERNAL_MESSAGE }))).into_response();
      res.extensions_mut().insert(InternalDetail(self.to_string()));
      return res;
    }

    let body = match self {
      ApiError::Core(CoreError::Validation { message, missing }) if !missing.is_empty() => {
        json!({ "success": false, "message": message, "missingFields": missing })
      }
      other => json!({ "success": false, "message": other.to_string() }),
    };
    (status, Json(body)).into_response()
  }
}

/// Response middleware: in development, re-render internal errors with
/// their cause attached.
pub async fn expose_internal_detail(
  State(config): State<Arc<ServerConfig>>,
  mut response: Response,
) -> Response {
  let Some(InternalDetail(detail)) = response.extensions_mut().remove::<InternalDetail>() else {
    return response;
  };
  if !config.is_development() {
    return response;
  }
  let body = json!({ "success": false, "message": INTERNAL_MESSAGE, "error": detail });
  (response.status(), Json(body)).into_response()
}
