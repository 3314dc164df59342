//! Status enums for requests, request items and issuances.
//!
//! Requests and items persist their status as a small integer code. The code,
//! the display label and the badge colour are fixed and shared with every
//! client that renders them, so they must never be renumbered.

use serde::{Deserialize, Serialize};
use strum::EnumIter;

// ─── Request status ──────────────────────────────────────────────────────────

/// Lifecycle status of a [`crate::request::Request`].
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
  New,
  Triaged,
  Approved,
  Issued,
  Acknowledged,
  Canceled,
  Disapproved,
}

impl RequestStatus {
  pub fn code(self) -> u8 {
    match self {
      Self::New => 1,
      Self::Triaged => 2,
      Self::Approved => 3,
      Self::Issued => 4,
      Self::Acknowledged => 5,
      Self::Canceled => 6,
      Self::Disapproved => 7,
    }
  }

  pub fn from_code(code: u8) -> Option<Self> {
    match code {
      1 => Some(Self::New),
      2 => Some(Self::Triaged),
      3 => Some(Self::Approved),
      4 => Some(Self::Issued),
      5 => Some(Self::Acknowledged),
      6 => Some(Self::Canceled),
      7 => Some(Self::Disapproved),
      _ => None,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::New => "New",
      Self::Triaged => "Triaged",
      Self::Approved => "Approved",
      Self::Issued => "Issued",
      Self::Acknowledged => "Acknowledged",
      Self::Canceled => "Canceled",
      Self::Disapproved => "Disapproved",
    }
  }

  pub fn color(self) -> &'static str {
    match self {
      Self::New => "gold",
      Self::Triaged => "lime",
      Self::Approved => "blue",
      Self::Issued | Self::Acknowledged => "green",
      Self::Canceled => "volcano",
      Self::Disapproved => "red",
    }
  }

  /// Whether individual lines may still be canceled.
  pub fn is_open(self) -> bool {
    matches!(self, Self::New | Self::Triaged | Self::Approved)
  }
}

// ─── Item status ─────────────────────────────────────────────────────────────

/// Fulfilment status of a [`crate::request::RequestItem`]. Monotonic: only
/// `Pending` has outgoing edges.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter,
)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
  Pending,
  Issued,
  Canceled,
}

impl ItemStatus {
  pub fn code(self) -> u8 {
    match self {
      Self::Pending => 1,
      Self::Issued => 2,
      Self::Canceled => 3,
    }
  }

  pub fn from_code(code: u8) -> Option<Self> {
    match code {
      1 => Some(Self::Pending),
      2 => Some(Self::Issued),
      3 => Some(Self::Canceled),
      _ => None,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Pending => "Pending",
      Self::Issued => "Issued",
      Self::Canceled => "Canceled",
    }
  }

  pub fn color(self) -> &'static str {
    match self {
      Self::Pending => "gold",
      Self::Issued => "lime",
      Self::Canceled => "green",
    }
  }

  pub fn is_pending(self) -> bool { matches!(self, Self::Pending) }
}

// ─── Acknowledgment status ───────────────────────────────────────────────────

/// Acknowledgment sub-state of an [`crate::issuance::Issuance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
  Pending,
  Acknowledged,
}

// ─── Request mode ────────────────────────────────────────────────────────────

/// How a cart entry was expanded into items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestMode {
  Bulk,
  PerItem,
}
