//! Request number allocation.

use assetreq_core::sequence::{RequestNumber, next_after};
use rusqlite::{Connection, OptionalExtension as _};

use crate::Result;

/// Allocate the next request number for `year`.
///
/// Must run inside the write transaction that inserts the request carrying
/// the number. The transaction's write lock is what stops two submissions
/// from reading the same latest number; it is held until that insert
/// commits.
pub fn allocate(conn: &Connection, year: i32) -> Result<RequestNumber> {
  let latest: Option<String> = conn
    .query_row(
      "SELECT request_number FROM requests
       WHERE request_year = ?1
       ORDER BY seq DESC
       LIMIT 1",
      rusqlite::params![year],
      |row| row.get(0),
    )
    .optional()?;

  let next = next_after(latest.as_deref(), year);
  if next.restarted {
    tracing::warn!(
      year,
      latest = ?latest,
      allocated = %next.number,
      "latest request number has an unparseable suffix; sequence restarted at 1"
    );
  }
  Ok(next.number)
}
