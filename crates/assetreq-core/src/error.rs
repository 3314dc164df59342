//! Error types for `assetreq-core`.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{status::RequestStatus, workflow::Action};

#[derive(Debug, Error)]
pub enum Error {
  /// Bad or missing input; rejected before anything is persisted.
  #[error("{0}")]
  Validation(String),

  #[error("cannot {action} a request that is {}", from.label())]
  InvalidTransition {
    from:   RequestStatus,
    action: Action,
  },

  /// A precondition on an item or issuance that is not a request-level edge.
  #[error("{0}")]
  InvalidState(String),

  #[error("request not found: {0}")]
  RequestNotFound(String),

  #[error("request item not found: {0}")]
  ItemNotFound(Uuid),

  #[error("issuance not found: {0}")]
  IssuanceNotFound(Uuid),

  /// The acknowledger is not the designated recipient. Deliberately silent
  /// about who the recipient is.
  #[error("only the designated recipient may acknowledge this issuance")]
  NotRecipient,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

impl Error {
  pub fn validation(msg: impl Into<String>) -> Self { Self::Validation(msg.into()) }
}

// ─── Classification ──────────────────────────────────────────────────────────

/// The coarse error taxonomy callers branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
  Validation,
  InvalidTransition,
  NotFound,
  Unauthorized,
  Persistence,
}

/// Implemented by every error type a [`crate::store::RequestStore`] can
/// return, so the API layer can map failures without knowing the backend.
pub trait Classify {
  fn kind(&self) -> ErrorKind;
}

impl Classify for Error {
  fn kind(&self) -> ErrorKind {
    match self {
      Self::Validation(_) => ErrorKind::Validation,
      Self::InvalidTransition { .. } | Self::InvalidState(_) => {
        ErrorKind::InvalidTransition
      }
      Self::RequestNotFound(_)
      | Self::ItemNotFound(_)
      | Self::IssuanceNotFound(_) => ErrorKind::NotFound,
      Self::NotRecipient => ErrorKind::Unauthorized,
      Self::Serialization(_) => ErrorKind::Persistence,
    }
  }
}
