//! Issuance records: the binding of an issued item to the concrete assets
//! that were handed over, pending acknowledgment by the recipient.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{employee::EmployeeId, status::AckStatus};

/// One delivered unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedAsset {
  /// Hostname or asset tag of the delivered unit.
  pub hostname: String,
  /// Blank means the item's delivery location.
  #[serde(default)]
  pub location: String,
  #[serde(default)]
  pub remarks:  Option<String>,
}

/// Input to [`crate::store::RequestStore::issue_item`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IssueItem {
  /// Designated acknowledger for an item submitted without a recipient.
  /// Must be absent or equal to the item's recipient otherwise.
  #[serde(default)]
  pub recipient: Option<EmployeeId>,
  /// One entry per unit of the item's quantity.
  pub assets:    Vec<IssuedAsset>,
}

/// At most one exists per request item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issuance {
  pub issuance_id:     Uuid,
  pub item_id:         Uuid,
  pub recipient:       EmployeeId,
  pub assets:          Vec<IssuedAsset>,
  pub ack_status:      AckStatus,
  pub acknowledged_by: Option<EmployeeId>,
  pub acknowledged_at: Option<DateTime<Utc>>,
  pub issued_by:       EmployeeId,
  pub issued_at:       DateTime<Utc>,
}

impl Issuance {
  pub fn is_acknowledged(&self) -> bool {
    self.ack_status == AckStatus::Acknowledged
  }
}
