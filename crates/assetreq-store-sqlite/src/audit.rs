//! [`SqliteAuditLog`]: the append-only `audit_log` table.

use assetreq_core::audit::{AuditEntry, AuditSink, EntityType, NewAuditEntry};
use chrono::{Local, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  encode::{AUDIT_COLUMNS, RawAuditEntry, encode_dt, encode_uuid},
};

/// Audit sink writing to the `audit_log` table of a store's database.
///
/// Snapshot timestamps are rendered in the server's local time zone.
#[derive(Clone)]
pub struct SqliteAuditLog {
  conn: tokio_rusqlite::Connection,
}

impl SqliteAuditLog {
  pub fn new(conn: tokio_rusqlite::Connection) -> Self { Self { conn } }

  /// Record each entry, logging and discarding failures.
  ///
  /// Used after a business transaction has committed, when there is nothing
  /// left to roll back.
  pub async fn record_best_effort(&self, entries: Vec<NewAuditEntry>) {
    for entry in entries {
      let (entity_type, entity_id) = (entry.entity_type, entry.entity_id);
      if let Err(e) = self.record(entry).await {
        tracing::warn!(
          %entity_type,
          %entity_id,
          error = %e,
          "failed to write audit entry"
        );
      }
    }
  }

  /// All entries for one entity, oldest first.
  pub async fn trail(
    &self,
    entity_type: EntityType,
    entity_id: Uuid,
  ) -> Result<Vec<AuditEntry>> {
    let entity_type = entity_type.to_string();
    let entity_id = encode_uuid(entity_id);

    let raws: Vec<RawAuditEntry> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {AUDIT_COLUMNS} FROM audit_log a
           WHERE a.entity_type = ?1 AND a.entity_id = ?2
           ORDER BY a.seq"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![entity_type, entity_id], RawAuditEntry::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawAuditEntry::into_entry).collect()
  }

  async fn insert(&self, entry: NewAuditEntry) -> Result<AuditEntry> {
    let stored = AuditEntry {
      audit_id:    Uuid::new_v4(),
      entity_type: entry.entity_type,
      entity_id:   entry.entity_id,
      action:      entry.action,
      actor_id:    entry.actor_id,
      recorded_at: Utc::now(),
      old_values:  entry.old_values,
      new_values:  entry.new_values,
      remarks:     entry.remarks,
    };

    let audit_id = encode_uuid(stored.audit_id);
    let entity_type = stored.entity_type.to_string();
    let entity_id = encode_uuid(stored.entity_id);
    let action = stored.action.to_string();
    let actor_id = stored.actor_id;
    let recorded_at = encode_dt(stored.recorded_at);
    let old_values = stored.old_values.as_ref().map(|v| v.to_string());
    let new_values = stored.new_values.as_ref().map(|v| v.to_string());
    let remarks = stored.remarks.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO audit_log
             (audit_id, entity_type, entity_id, action, actor_id,
              recorded_at, old_values, new_values, remarks)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            audit_id,
            entity_type,
            entity_id,
            action,
            actor_id,
            recorded_at,
            old_values,
            new_values,
            remarks,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(stored)
  }
}

impl AuditSink for SqliteAuditLog {
  type Error = Error;

  async fn record(&self, entry: NewAuditEntry) -> Result<Option<AuditEntry>> {
    let (entity_type, entity_id) = (entry.entity_type, entry.entity_id);
    match entry.prepare(&Local) {
      Some(entry) => self.insert(entry).await.map(Some),
      None => {
        tracing::debug!(%entity_type, %entity_id, "skipped audit entry with no changes");
        Ok(None)
      }
    }
  }
}
