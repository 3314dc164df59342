//! Workflow rules for requests, items and issuances.
//!
//! Everything here is pure: given the current persisted state and the
//! caller's input, decide whether a step is legal and what the new state is.
//! Storage backends call these inside the write transaction that applies the
//! result, so the precondition is always checked against committed state.
//!
//! ```text
//! New ──triage──> Triaged ──approve──> Approved ──(items issued)──> Issued ──(acknowledged)──> Acknowledged
//!  │                 │                    │
//!  ├──disapprove──> Disapproved           │
//!  └─────cancel──────┴───────cancel───────┴──> Canceled
//! ```

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::{
  Error, Result,
  employee::{EmployeeId, Recipient},
  issuance::{Issuance, IssueItem, IssuedAsset},
  request::RequestItem,
  status::{ItemStatus, RequestStatus},
};

// ─── Request actions ─────────────────────────────────────────────────────────

/// An actor-driven request transition.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Action {
  Triage,
  Approve,
  Disapprove,
  Cancel,
}

impl Action {
  /// The status this action leads to from `from`, or `None` if the edge does
  /// not exist.
  pub fn target(self, from: RequestStatus) -> Option<RequestStatus> {
    use RequestStatus::*;
    match (self, from) {
      (Self::Triage, New) => Some(Triaged),
      (Self::Approve, Triaged) => Some(Approved),
      (Self::Disapprove, New) => Some(Disapproved),
      (Self::Cancel, New | Triaged | Approved) => Some(Canceled),
      _ => None,
    }
  }

  pub fn requires_remarks(self) -> bool {
    matches!(self, Self::Disapprove | Self::Cancel)
  }

  /// Whether pending items are canceled along with the request.
  pub fn cascades_to_items(self) -> bool {
    matches!(self, Self::Disapprove | Self::Cancel)
  }
}

/// Validate `action` against `current` and return the new status.
pub fn plan_transition(
  current: RequestStatus,
  action: Action,
  remarks: Option<&str>,
) -> Result<RequestStatus> {
  if action.requires_remarks() && is_blank(remarks) {
    return Err(Error::validation(format!("remarks are required to {action}")));
  }
  action
    .target(current)
    .ok_or(Error::InvalidTransition { from: current, action })
}

// ─── Issuing ─────────────────────────────────────────────────────────────────

/// A validated issuance, ready to persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuePlan {
  pub recipient: EmployeeId,
  pub assets:    Vec<IssuedAsset>,
}

/// Check that `item` of a request in `request_status` can be issued with
/// `input`.
///
/// Asset lines with a blank location inherit the item's delivery location.
pub fn plan_issue(
  request_status: RequestStatus,
  item: &RequestItem,
  input: &IssueItem,
) -> Result<IssuePlan> {
  if request_status != RequestStatus::Approved {
    return Err(Error::InvalidState(format!(
      "items can only be issued on an approved request, this one is {}",
      request_status.label()
    )));
  }
  if !item.status.is_pending() {
    return Err(Error::InvalidState(format!(
      "item {} is already {}",
      item.item_id,
      item.status.label()
    )));
  }

  let expected = item.quantity as usize;
  if input.assets.len() != expected {
    return Err(Error::validation(format!(
      "item quantity is {expected} but {} asset(s) were supplied",
      input.assets.len()
    )));
  }

  let mut assets = Vec::with_capacity(expected);
  for (i, asset) in input.assets.iter().enumerate() {
    let hostname = asset.hostname.trim();
    if hostname.is_empty() {
      return Err(Error::validation(format!(
        "asset {} is missing a hostname",
        i + 1
      )));
    }
    let location = match asset.location.trim() {
      "" => item.location.clone(),
      loc => loc.to_owned(),
    };
    assets.push(IssuedAsset {
      hostname: hostname.to_owned(),
      location,
      remarks: asset.remarks.clone().filter(|r| !r.trim().is_empty()),
    });
  }

  let recipient = match (item.recipient, input.recipient) {
    (Recipient::Employee(id), None) => id,
    (Recipient::Employee(id), Some(named)) if named == id => id,
    (Recipient::Employee(_), Some(_)) => {
      return Err(Error::validation(
        "the item already has a recipient; a different one cannot be designated",
      ));
    }
    (Recipient::Unassigned, Some(named)) => named,
    (Recipient::Unassigned, None) => {
      return Err(Error::validation(
        "the item has no recipient; designate one to issue it",
      ));
    }
  };

  Ok(IssuePlan { recipient, assets })
}

// ─── Acknowledging ───────────────────────────────────────────────────────────

/// Check that `acknowledger` may acknowledge `issuance`.
pub fn check_acknowledge(issuance: &Issuance, acknowledger: EmployeeId) -> Result<()> {
  if issuance.is_acknowledged() {
    return Err(Error::InvalidState(format!(
      "issuance {} is already acknowledged",
      issuance.issuance_id
    )));
  }
  if issuance.recipient != acknowledger {
    return Err(Error::NotRecipient);
  }
  Ok(())
}

// ─── Cancelling a single item ────────────────────────────────────────────────

pub fn check_cancel_item(
  request_status: RequestStatus,
  item: &RequestItem,
  remarks: Option<&str>,
) -> Result<()> {
  if is_blank(remarks) {
    return Err(Error::validation("remarks are required to cancel an item"));
  }
  if !request_status.is_open() {
    return Err(Error::InvalidState(format!(
      "items of a {} request cannot be canceled",
      request_status.label()
    )));
  }
  if !item.status.is_pending() {
    return Err(Error::InvalidState(format!(
      "item {} is already {}",
      item.item_id,
      item.status.label()
    )));
  }
  Ok(())
}

// ─── Roll-ups ────────────────────────────────────────────────────────────────

/// After an item leaves Pending: an approved request with nothing left
/// pending and at least one issued item becomes Issued.
pub fn rollup_issued(
  request_status: RequestStatus,
  items: &[ItemStatus],
) -> Option<RequestStatus> {
  let none_pending = items.iter().all(|s| !s.is_pending());
  let any_issued = items.contains(&ItemStatus::Issued);
  (request_status == RequestStatus::Approved && none_pending && any_issued)
    .then_some(RequestStatus::Issued)
}

/// After an acknowledgment: an issued request whose every issued item has an
/// acknowledged issuance becomes Acknowledged.
///
/// `items` pairs each item status with whether its issuance (if any) is
/// acknowledged.
pub fn rollup_acknowledged(
  request_status: RequestStatus,
  items: &[(ItemStatus, bool)],
) -> Option<RequestStatus> {
  let all_acknowledged = items
    .iter()
    .filter(|(status, _)| *status == ItemStatus::Issued)
    .all(|(_, acknowledged)| *acknowledged);
  (request_status == RequestStatus::Issued && all_acknowledged)
    .then_some(RequestStatus::Acknowledged)
}

fn is_blank(s: Option<&str>) -> bool { s.is_none_or(|s| s.trim().is_empty()) }
