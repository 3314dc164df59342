//! Requests, their items, and the read models built from them.
//!
//! A [`Request`] exclusively owns its [`RequestItem`]s. Neither is ever
//! physically deleted: cancellation and disapproval are statuses.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use uuid::Uuid;

use crate::{
  cart::CartEntry,
  employee::{EmployeeId, Recipient},
  issuance::Issuance,
  sequence::RequestNumber,
  status::{ItemStatus, RequestMode, RequestStatus},
};

// ─── Requestor ───────────────────────────────────────────────────────────────

/// The employee a request is raised for, as captured at submission time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requestor {
  pub employee_id:     EmployeeId,
  pub name:            String,
  pub department:      Option<String>,
  pub production_line: Option<String>,
  pub station:         Option<String>,
}

// ─── Request ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
  pub request_id:     Uuid,
  /// Assigned once at submission; never changes.
  pub request_number: RequestNumber,
  pub requestor:      Requestor,
  pub status:         RequestStatus,
  pub remarks:        Option<String>,
  pub created_by:     EmployeeId,
  pub updated_by:     EmployeeId,
  pub created_at:     DateTime<Utc>,
  pub updated_at:     DateTime<Utc>,
}

/// One fulfillable line of a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestItem {
  pub item_id:         Uuid,
  pub request_id:      Uuid,
  pub category:        String,
  pub type_of_request: String,
  pub mode:            RequestMode,
  pub recipient:       Recipient,
  pub location:        String,
  pub quantity:        u32,
  pub purpose:         String,
  pub status:          ItemStatus,
  pub created_at:      DateTime<Utc>,
  pub updated_at:      DateTime<Utc>,
}

// ─── Submission ──────────────────────────────────────────────────────────────

/// Input to [`crate::store::RequestStore::submit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequest {
  pub requestor: Requestor,
  #[serde(default)]
  pub remarks:   Option<String>,
  pub cart:      Vec<CartEntry>,
}

/// What a successful submission hands back to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedRequest {
  pub request_id:     Uuid,
  pub request_number: RequestNumber,
}

// ─── Addressing ──────────────────────────────────────────────────────────────

/// A request addressed either by its internal id or by its request number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestRef {
  Id(Uuid),
  Number(String),
}

impl FromStr for RequestRef {
  type Err = std::convert::Infallible;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let s = s.trim();
    Ok(match Uuid::parse_str(s) {
      Ok(id) => Self::Id(id),
      Err(_) => Self::Number(s.to_owned()),
    })
  }
}

impl fmt::Display for RequestRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Id(id) => write!(f, "{id}"),
      Self::Number(n) => f.write_str(n),
    }
  }
}

impl From<&RequestNumber> for RequestRef {
  fn from(n: &RequestNumber) -> Self { Self::Number(n.as_str().to_owned()) }
}

// ─── Read models ─────────────────────────────────────────────────────────────

/// Display code, label and colour of a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatusBadge {
  pub code:  u8,
  pub label: &'static str,
  pub color: &'static str,
}

impl From<RequestStatus> for StatusBadge {
  fn from(s: RequestStatus) -> Self {
    Self { code: s.code(), label: s.label(), color: s.color() }
  }
}

impl From<ItemStatus> for StatusBadge {
  fn from(s: ItemStatus) -> Self {
    Self { code: s.code(), label: s.label(), color: s.color() }
  }
}

/// An item with its recipient resolved for display.
#[derive(Debug, Clone, Serialize)]
pub struct ItemView {
  #[serde(flatten)]
  pub item:           RequestItem,
  pub recipient_name: String,
  pub badge:          StatusBadge,
  pub issuance:       Option<Issuance>,
}

/// Full detail of one request.
#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
  #[serde(flatten)]
  pub request: Request,
  pub badge:   StatusBadge,
  pub items:   Vec<ItemView>,
}

/// One row of a request listing.
#[derive(Debug, Clone, Serialize)]
pub struct RequestSummary {
  #[serde(flatten)]
  pub request:    Request,
  pub badge:      StatusBadge,
  pub item_count: u32,
}

/// Request count for one status; `status` is `None` for the synthetic
/// "All" bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
  pub status: Option<RequestStatus>,
  pub label:  &'static str,
  pub count:  u64,
}

impl StatusCount {
  pub const ALL_LABEL: &'static str = "All";

  /// Build the dashboard buckets from per-status tallies: a leading "All"
  /// bucket followed by every status in code order, zeros included.
  pub fn tally(counts: &[(RequestStatus, u64)]) -> Vec<Self> {
    let count_of = |status: RequestStatus| {
      counts
        .iter()
        .filter(|(s, _)| *s == status)
        .map(|(_, n)| n)
        .sum::<u64>()
    };
    let mut buckets = vec![Self {
      status: None,
      label:  Self::ALL_LABEL,
      count:  counts.iter().map(|(_, n)| n).sum(),
    }];
    buckets.extend(RequestStatus::iter().map(|status| Self {
      status: Some(status),
      label:  status.label(),
      count:  count_of(status),
    }));
    buckets
  }
}

/// A page of requests plus the dashboard counts.
#[derive(Debug, Clone, Serialize)]
pub struct RequestPage {
  pub requests: Vec<RequestSummary>,
  /// Number of requests matching the filter, ignoring limit/offset.
  pub total:    u64,
  pub counts:   Vec<StatusCount>,
}
