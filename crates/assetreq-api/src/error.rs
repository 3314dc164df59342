//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every error body has the shape `{"success": false, "message": "..."}`.

use assetreq_core::{Classify, ErrorKind};
use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The actor headers are missing or malformed.
  #[error("missing or invalid actor headers")]
  Unauthenticated,

  #[error("{0}")]
  NotFound(String),

  /// The body, path or query string could not be decoded.
  #[error("{0}")]
  BadInput(String),

  /// A classified failure from the store or the workflow rules.
  #[error("{message}")]
  Store { kind: ErrorKind, message: String },
}

impl ApiError {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Classify,
  {
    Self::Store { kind: e.kind(), message: e.to_string() }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::Unauthenticated => StatusCode::UNAUTHORIZED,
      Self::NotFound(_) => StatusCode::NOT_FOUND,
      Self::BadInput(_) => StatusCode::UNPROCESSABLE_ENTITY,
      Self::Store { kind, .. } => match kind {
        ErrorKind::Validation => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::InvalidTransition => StatusCode::CONFLICT,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Unauthorized => StatusCode::FORBIDDEN,
        ErrorKind::Persistence => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let body = json!({ "success": false, "message": self.to_string() });
    (status, Json(body)).into_response()
  }
}
