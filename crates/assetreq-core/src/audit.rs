//! Audit trail entries and the [`AuditSink`] trait.
//!
//! Every mutation of a request, item or issuance is described by a
//! write-once entry holding before/after snapshots. Entries are produced
//! explicitly by the code that performs the mutation and handed to a sink
//! after the business transaction commits.

use std::{fmt, future::Future};

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::{Result, employee::EmployeeId};

/// Format every timestamp inside a snapshot is rewritten to.
pub const SNAPSHOT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Bookkeeping keys that change on every update and say nothing on their own.
const BOOKKEEPING_KEYS: [&str; 2] = ["updated_at", "updated_by"];

// ─── Discriminants ───────────────────────────────────────────────────────────

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EntityType {
  Request,
  RequestItem,
  Issuance,
}

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AuditAction {
  Created,
  Updated,
  Deleted,
  Restored,
}

// ─── Entries ─────────────────────────────────────────────────────────────────

/// Input to [`AuditSink::record`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewAuditEntry {
  pub entity_type: EntityType,
  pub entity_id:   Uuid,
  pub action:      AuditAction,
  pub actor_id:    EmployeeId,
  pub old_values:  Option<Value>,
  pub new_values:  Option<Value>,
  pub remarks:     Option<String>,
}

impl NewAuditEntry {
  pub fn created(
    entity_type: EntityType,
    entity_id: Uuid,
    actor_id: EmployeeId,
    new: &impl Serialize,
  ) -> Result<Self> {
    Ok(Self {
      entity_type,
      entity_id,
      action: AuditAction::Created,
      actor_id,
      old_values: None,
      new_values: Some(serde_json::to_value(new)?),
      remarks: None,
    })
  }

  pub fn updated(
    entity_type: EntityType,
    entity_id: Uuid,
    actor_id: EmployeeId,
    old: &impl Serialize,
    new: &impl Serialize,
  ) -> Result<Self> {
    Ok(Self {
      entity_type,
      entity_id,
      action: AuditAction::Updated,
      actor_id,
      old_values: Some(serde_json::to_value(old)?),
      new_values: Some(serde_json::to_value(new)?),
      remarks: None,
    })
  }

  pub fn with_remarks(mut self, remarks: Option<&str>) -> Self {
    self.remarks = remarks
      .map(str::trim)
      .filter(|r| !r.is_empty())
      .map(str::to_owned);
    self
  }

  /// Reduce the entry to what gets stored.
  ///
  /// `updated` entries keep only the keys whose values differ; if nothing
  /// differs the entry is dropped and `None` is returned. Timestamps in both
  /// snapshots are rewritten in `tz` using [`SNAPSHOT_TIME_FORMAT`].
  pub fn prepare<Tz>(mut self, tz: &Tz) -> Option<Self>
  where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
  {
    if self.action == AuditAction::Updated {
      let (old, new) = changed_fields(
        self.old_values.as_ref().unwrap_or(&Value::Null),
        self.new_values.as_ref().unwrap_or(&Value::Null),
      );
      if old.is_empty() && new.is_empty() {
        return None;
      }
      self.old_values = Some(Value::Object(old));
      self.new_values = Some(Value::Object(new));
    }
    self.old_values = self.old_values.map(|v| normalize_timestamps(v, tz));
    self.new_values = self.new_values.map(|v| normalize_timestamps(v, tz));
    Some(self)
  }
}

/// A stored audit entry. Never mutated or deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
  pub audit_id:    Uuid,
  pub entity_type: EntityType,
  pub entity_id:   Uuid,
  pub action:      AuditAction,
  pub actor_id:    EmployeeId,
  pub recorded_at: DateTime<Utc>,
  pub old_values:  Option<Value>,
  pub new_values:  Option<Value>,
  pub remarks:     Option<String>,
}

// ─── Snapshot helpers ────────────────────────────────────────────────────────

/// The top-level keys of two object snapshots whose values differ, excluding
/// bookkeeping keys. Non-object snapshots are compared whole under a `value`
/// key.
pub fn changed_fields(old: &Value, new: &Value) -> (Map<String, Value>, Map<String, Value>) {
  let mut old_out = Map::new();
  let mut new_out = Map::new();

  match (old, new) {
    (Value::Object(o), Value::Object(n)) => {
      let keys = o.keys().chain(n.keys().filter(|k| !o.contains_key(*k)));
      for key in keys {
        if BOOKKEEPING_KEYS.contains(&key.as_str()) {
          continue;
        }
        let before = o.get(key).unwrap_or(&Value::Null);
        let after = n.get(key).unwrap_or(&Value::Null);
        if before != after {
          old_out.insert(key.clone(), before.clone());
          new_out.insert(key.clone(), after.clone());
        }
      }
    }
    (o, n) if o != n => {
      old_out.insert("value".into(), o.clone());
      new_out.insert("value".into(), n.clone());
    }
    _ => {}
  }

  (old_out, new_out)
}

/// Rewrite RFC 3339 values of timestamp keys (`*_at`) in `value` as local
/// wall-clock time in `tz`. Other strings are left alone.
pub fn normalize_timestamps<Tz>(value: Value, tz: &Tz) -> Value
where
  Tz: TimeZone,
  Tz::Offset: fmt::Display,
{
  match value {
    Value::Array(items) => Value::Array(
      items.into_iter().map(|v| normalize_timestamps(v, tz)).collect(),
    ),
    Value::Object(map) => Value::Object(
      map
        .into_iter()
        .map(|(k, v)| {
          let v = match v {
            Value::String(s) if k.ends_with("_at") => local_time(s, tz),
            other => normalize_timestamps(other, tz),
          };
          (k, v)
        })
        .collect(),
    ),
    other => other,
  }
}

fn local_time<Tz>(s: String, tz: &Tz) -> Value
where
  Tz: TimeZone,
  Tz::Offset: fmt::Display,
{
  match DateTime::parse_from_rfc3339(&s) {
    Ok(dt) => Value::String(dt.with_timezone(tz).format(SNAPSHOT_TIME_FORMAT).to_string()),
    Err(_) => Value::String(s),
  }
}

// ─── Sink ────────────────────────────────────────────────────────────────────

/// Destination for audit entries.
///
/// Implementations apply [`NewAuditEntry::prepare`] before storing and return
/// `None` for skipped no-op updates. Callers treat errors as non-fatal: the
/// business change the entry describes has already committed.
pub trait AuditSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn record(
    &self,
    entry: NewAuditEntry,
  ) -> impl Future<Output = Result<Option<AuditEntry>, Self::Error>> + Send + '_;
}
