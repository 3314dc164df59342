//! Encoding and decoding helpers between domain types and the plain values
//! stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, statuses as their integer codes. Column lists are written with
//! the table aliases the queries use (`r`, `i`, `s`, `a`).

use assetreq_core::{
  audit::{AuditAction, AuditEntry, EntityType},
  employee::{Employee, Recipient},
  issuance::{Issuance, IssuedAsset},
  request::{Request, RequestItem, Requestor},
  sequence::RequestNumber,
  status::{AckStatus, ItemStatus, RequestMode, RequestStatus},
};
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

pub fn decode_request_status(code: i64) -> Result<RequestStatus> {
  u8::try_from(code)
    .ok()
    .and_then(RequestStatus::from_code)
    .ok_or_else(|| Error::Decode(format!("unknown request status code: {code}")))
}

pub fn decode_item_status(code: i64) -> Result<ItemStatus> {
  u8::try_from(code)
    .ok()
    .and_then(ItemStatus::from_code)
    .ok_or_else(|| Error::Decode(format!("unknown item status code: {code}")))
}

pub fn encode_mode(m: RequestMode) -> &'static str {
  match m {
    RequestMode::Bulk => "bulk",
    RequestMode::PerItem => "per_item",
  }
}

pub fn decode_mode(s: &str) -> Result<RequestMode> {
  match s {
    "bulk" => Ok(RequestMode::Bulk),
    "per_item" => Ok(RequestMode::PerItem),
    other => Err(Error::Decode(format!("unknown request mode: {other:?}"))),
  }
}

pub fn encode_ack(a: AckStatus) -> &'static str {
  match a {
    AckStatus::Pending => "pending",
    AckStatus::Acknowledged => "acknowledged",
  }
}

pub fn decode_ack(s: &str) -> Result<AckStatus> {
  match s {
    "pending" => Ok(AckStatus::Pending),
    "acknowledged" => Ok(AckStatus::Acknowledged),
    other => Err(Error::Decode(format!("unknown ack status: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

pub const REQUEST_COLUMNS: &str = "r.request_id, r.request_number, \
  r.requestor_id, r.requestor_name, r.department, r.production_line, \
  r.station, r.status, r.remarks, r.created_by, r.updated_by, r.created_at, \
  r.updated_at";

/// Raw values read from a `requests` row.
pub struct RawRequest {
  pub request_id:      String,
  pub request_number:  String,
  pub requestor_id:    i64,
  pub requestor_name:  String,
  pub department:      Option<String>,
  pub production_line: Option<String>,
  pub station:         Option<String>,
  pub status:          i64,
  pub remarks:         Option<String>,
  pub created_by:      i64,
  pub updated_by:      i64,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawRequest {
  /// Read [`REQUEST_COLUMNS`] starting at column `at`.
  pub fn from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      request_id:      row.get(at)?,
      request_number:  row.get(at + 1)?,
      requestor_id:    row.get(at + 2)?,
      requestor_name:  row.get(at + 3)?,
      department:      row.get(at + 4)?,
      production_line: row.get(at + 5)?,
      station:         row.get(at + 6)?,
      status:          row.get(at + 7)?,
      remarks:         row.get(at + 8)?,
      created_by:      row.get(at + 9)?,
      updated_by:      row.get(at + 10)?,
      created_at:      row.get(at + 11)?,
      updated_at:      row.get(at + 12)?,
    })
  }

  pub fn into_request(self) -> Result<Request> {
    Ok(Request {
      request_id:     decode_uuid(&self.request_id)?,
      request_number: RequestNumber::from_stored(self.request_number),
      requestor:      Requestor {
        employee_id:     self.requestor_id,
        name:            self.requestor_name,
        department:      self.department,
        production_line: self.production_line,
        station:         self.station,
      },
      status:         decode_request_status(self.status)?,
      remarks:        self.remarks,
      created_by:     self.created_by,
      updated_by:     self.updated_by,
      created_at:     decode_dt(&self.created_at)?,
      updated_at:     decode_dt(&self.updated_at)?,
    })
  }
}

pub const ITEM_COLUMNS: &str = "i.item_id, i.request_id, i.category, \
  i.type_of_request, i.request_mode, i.recipient_id, i.location, i.quantity, \
  i.purpose, i.item_status, i.created_at, i.updated_at";

/// Raw values read from a `request_items` row.
pub struct RawItem {
  pub item_id:         String,
  pub request_id:      String,
  pub category:        String,
  pub type_of_request: String,
  pub request_mode:    String,
  pub recipient_id:    Option<i64>,
  pub location:        String,
  pub quantity:        i64,
  pub purpose:         String,
  pub item_status:     i64,
  pub created_at:      String,
  pub updated_at:      String,
}

impl RawItem {
  /// Read [`ITEM_COLUMNS`] starting at column `at`.
  pub fn from_row(row: &rusqlite::Row<'_>, at: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      item_id:         row.get(at)?,
      request_id:      row.get(at + 1)?,
      category:        row.get(at + 2)?,
      type_of_request: row.get(at + 3)?,
      request_mode:    row.get(at + 4)?,
      recipient_id:    row.get(at + 5)?,
      location:        row.get(at + 6)?,
      quantity:        row.get(at + 7)?,
      purpose:         row.get(at + 8)?,
      item_status:     row.get(at + 9)?,
      created_at:      row.get(at + 10)?,
      updated_at:      row.get(at + 11)?,
    })
  }

  pub fn into_item(self) -> Result<RequestItem> {
    let quantity = u32::try_from(self.quantity)
      .map_err(|_| Error::Decode(format!("invalid quantity: {}", self.quantity)))?;
    Ok(RequestItem {
      item_id: decode_uuid(&self.item_id)?,
      request_id: decode_uuid(&self.request_id)?,
      category: self.category,
      type_of_request: self.type_of_request,
      mode: decode_mode(&self.request_mode)?,
      recipient: Recipient::from_employee_id(self.recipient_id),
      location: self.location,
      quantity,
      purpose: self.purpose,
      status: decode_item_status(self.item_status)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: decode_dt(&self.updated_at)?,
    })
  }
}

pub const ISSUANCE_COLUMNS: &str = "s.issuance_id, s.item_id, s.recipient_id, \
  s.ack_status, s.acknowledged_by, s.acknowledged_at, s.issued_by, s.issued_at";

/// Raw values read from an `issuances` row. Asset lines live in
/// `issuance_assets` and are attached separately.
pub struct RawIssuance {
  pub issuance_id:     String,
  pub item_id:         String,
  pub recipient_id:    i64,
  pub ack_status:      String,
  pub acknowledged_by: Option<i64>,
  pub acknowledged_at: Option<String>,
  pub issued_by:       i64,
  pub issued_at:       String,
}

impl RawIssuance {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      issuance_id:     row.get(0)?,
      item_id:         row.get(1)?,
      recipient_id:    row.get(2)?,
      ack_status:      row.get(3)?,
      acknowledged_by: row.get(4)?,
      acknowledged_at: row.get(5)?,
      issued_by:       row.get(6)?,
      issued_at:       row.get(7)?,
    })
  }

  pub fn into_issuance(self, assets: Vec<IssuedAsset>) -> Result<Issuance> {
    Ok(Issuance {
      issuance_id: decode_uuid(&self.issuance_id)?,
      item_id: decode_uuid(&self.item_id)?,
      recipient: self.recipient_id,
      assets,
      ack_status: decode_ack(&self.ack_status)?,
      acknowledged_by: self.acknowledged_by,
      acknowledged_at: self
        .acknowledged_at
        .as_deref()
        .map(decode_dt)
        .transpose()?,
      issued_by: self.issued_by,
      issued_at: decode_dt(&self.issued_at)?,
    })
  }
}

pub const AUDIT_COLUMNS: &str = "a.audit_id, a.entity_type, a.entity_id, \
  a.action, a.actor_id, a.recorded_at, a.old_values, a.new_values, a.remarks";

/// Raw values read from an `audit_log` row.
pub struct RawAuditEntry {
  pub audit_id:    String,
  pub entity_type: String,
  pub entity_id:   String,
  pub action:      String,
  pub actor_id:    i64,
  pub recorded_at: String,
  pub old_values:  Option<String>,
  pub new_values:  Option<String>,
  pub remarks:     Option<String>,
}

impl RawAuditEntry {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      audit_id:    row.get(0)?,
      entity_type: row.get(1)?,
      entity_id:   row.get(2)?,
      action:      row.get(3)?,
      actor_id:    row.get(4)?,
      recorded_at: row.get(5)?,
      old_values:  row.get(6)?,
      new_values:  row.get(7)?,
      remarks:     row.get(8)?,
    })
  }

  pub fn into_entry(self) -> Result<AuditEntry> {
    let entity_type: EntityType = self
      .entity_type
      .parse()
      .map_err(|_| Error::Decode(format!("unknown entity type: {:?}", self.entity_type)))?;
    let action: AuditAction = self
      .action
      .parse()
      .map_err(|_| Error::Decode(format!("unknown audit action: {:?}", self.action)))?;
    Ok(AuditEntry {
      audit_id: decode_uuid(&self.audit_id)?,
      entity_type,
      entity_id: decode_uuid(&self.entity_id)?,
      action,
      actor_id: self.actor_id,
      recorded_at: decode_dt(&self.recorded_at)?,
      old_values: self.old_values.as_deref().map(serde_json::from_str::<serde_json::Value>).transpose()?,
      new_values: self.new_values.as_deref().map(serde_json::from_str::<serde_json::Value>).transpose()?,
      remarks: self.remarks,
    })
  }
}

pub fn employee_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Employee> {
  Ok(Employee {
    employee_id: row.get(0)?,
    name:        row.get(1)?,
    department:  row.get(2)?,
  })
}
