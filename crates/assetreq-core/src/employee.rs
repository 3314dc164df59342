//! People: the acting user, directory entries, and item recipients.

use serde::{Deserialize, Serialize};

/// Numeric employee identifier as issued by the HR directory.
pub type EmployeeId = i64;

/// Who is performing a workflow call. Always passed explicitly; the engine
/// never looks up a "current user" on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub employee_id: EmployeeId,
  pub name:        String,
}

impl Actor {
  pub fn new(employee_id: EmployeeId, name: impl Into<String>) -> Self {
    Self { employee_id, name: name.into() }
  }
}

/// A cached directory entry used to resolve recipients and display names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Employee {
  pub employee_id: EmployeeId,
  pub name:        String,
  pub department:  Option<String>,
}

/// The person an item is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "employee_id", rename_all = "snake_case")]
pub enum Recipient {
  Unassigned,
  Employee(EmployeeId),
}

impl Recipient {
  pub fn employee_id(self) -> Option<EmployeeId> {
    match self {
      Self::Employee(id) => Some(id),
      Self::Unassigned => None,
    }
  }

  pub fn from_employee_id(id: Option<EmployeeId>) -> Self {
    id.map_or(Self::Unassigned, Self::Employee)
  }
}

/// Display name used when an item has no resolvable recipient.
pub const UNASSIGNED_LABEL: &str = "Unassigned";
