//! [`SqliteStore`]: the SQLite implementation of [`RequestStore`].

use std::{path::Path, time::Duration};

use assetreq_core::{
  Error as CoreError,
  audit::{AuditEntry, EntityType, NewAuditEntry},
  cart::{self, ItemDraft},
  employee::{Actor, Employee, EmployeeId, Recipient, UNASSIGNED_LABEL},
  issuance::{Issuance, IssueItem, IssuedAsset},
  request::{
    ItemView, NewRequest, Request, RequestDetail, RequestItem, RequestPage,
    RequestRef, RequestSummary, StatusCount, SubmittedRequest,
  },
  status::{AckStatus, ItemStatus, RequestStatus},
  store::{RequestQuery, RequestStore, SortField, SortOrder},
  workflow::{self, Action},
};
use chrono::{DateTime, Datelike, Local, Utc};
use rusqlite::{Connection, OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use crate::{
  Error, Result,
  audit::SqliteAuditLog,
  encode::{
    ISSUANCE_COLUMNS, ITEM_COLUMNS, RawIssuance, RawItem, RawRequest,
    REQUEST_COLUMNS, decode_ack, decode_item_status, decode_request_status,
    employee_from_row, encode_ack, encode_dt, encode_mode, encode_uuid,
  },
  schema::SCHEMA,
  sequence,
};

/// How long a connection waits for another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Page size used when a query names no limit.
const DEFAULT_PAGE_SIZE: usize = 50;

/// Shared filter of the listing queries. `?1` is a status code, `?2` a
/// `LIKE` pattern; either may be NULL.
const LIST_FILTER: &str = "(?1 IS NULL OR r.status = ?1)
  AND (?2 IS NULL
       OR r.request_number LIKE ?2
       OR r.requestor_name LIKE ?2
       OR r.department LIKE ?2
       OR r.remarks LIKE ?2)";

// ─── Store ───────────────────────────────────────────────────────────────────

/// An asset request store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted. Separate
/// stores opened on the same file coordinate through SQLite's write lock.
#[derive(Clone)]
pub struct SqliteStore {
  conn:  tokio_rusqlite::Connection,
  audit: SqliteAuditLog,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    Self::from_connection(conn).await
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    Self::from_connection(conn).await
  }

  async fn from_connection(conn: tokio_rusqlite::Connection) -> Result<Self> {
    let store = Self { audit: SqliteAuditLog::new(conn.clone()), conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) fn connection(&self) -> &tokio_rusqlite::Connection { &self.conn }

  /// Run `f` inside one `BEGIN IMMEDIATE` transaction.
  ///
  /// The transaction commits only if `f` succeeds; any error, domain or
  /// database, drops it and rolls everything back.
  async fn write<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        match f(&*tx) {
          Ok(value) => {
            tx.commit()?;
            Ok(Ok(value))
          }
          Err(e) => Ok(Err(e)),
        }
      })
      .await?
  }

  /// Run `f` against the connection outside any explicit transaction.
  async fn read<T, F>(&self, f: F) -> Result<T>
  where
    T: Send + 'static,
    F: FnOnce(&Connection) -> Result<T> + Send + 'static,
  {
    self.conn.call(move |conn| Ok(f(&*conn))).await?
  }
}

// ─── RequestStore impl ───────────────────────────────────────────────────────

impl RequestStore for SqliteStore {
  type Error = Error;

  // ── Directory ─────────────────────────────────────────────────────────────

  async fn upsert_employee(&self, employee: Employee) -> Result<Employee> {
    let name = employee.name.trim().to_owned();
    if name.is_empty() {
      return Err(CoreError::validation("employee name is required").into());
    }
    let employee = Employee {
      name,
      department: non_blank(employee.department),
      ..employee
    };

    let row = employee.clone();
    self
      .write(move |conn| {
        conn.execute(
          "INSERT INTO employees (employee_id, name, department)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (employee_id) DO UPDATE
             SET name = excluded.name, department = excluded.department",
          rusqlite::params![row.employee_id, row.name, row.department],
        )?;
        Ok(())
      })
      .await?;

    Ok(employee)
  }

  async fn get_employee(&self, id: EmployeeId) -> Result<Option<Employee>> {
    self
      .read(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT employee_id, name, department FROM employees
               WHERE employee_id = ?1",
              rusqlite::params![id],
              employee_from_row,
            )
            .optional()?,
        )
      })
      .await
  }

  // ── Workflow ──────────────────────────────────────────────────────────────

  async fn submit(&self, actor: Actor, input: NewRequest) -> Result<SubmittedRequest> {
    if input.requestor.name.trim().is_empty() {
      return Err(CoreError::validation("requestor name is required").into());
    }
    let drafts = cart::expand(&input.cart)?;
    let item_count = drafts.len();
    let now = Utc::now();
    let year = now.with_timezone(&Local).year();
    let actor_id = actor.employee_id;

    let (submitted, audit) = self
      .write(move |conn| insert_request(conn, &actor, input, drafts, now, year))
      .await?;

    tracing::info!(
      request_number = %submitted.request_number,
      request_id = %submitted.request_id,
      items = item_count,
      actor = actor_id,
      "request submitted"
    );
    self.audit.record_best_effort(audit).await;
    Ok(submitted)
  }

  async fn transition(
    &self,
    actor: Actor,
    request: RequestRef,
    action: Action,
    remarks: Option<String>,
  ) -> Result<Request> {
    let now = Utc::now();
    let actor_id = actor.employee_id;

    let (before, after, audit) = self
      .write(move |conn| apply_transition(conn, &actor, &request, action, remarks, now))
      .await?;

    tracing::info!(
      request_number = %after.request_number,
      %action,
      from = before.label(),
      to = after.status.label(),
      actor = actor_id,
      "request transitioned"
    );
    self.audit.record_best_effort(audit).await;
    Ok(after)
  }

  async fn issue_item(
    &self,
    actor: Actor,
    request: RequestRef,
    item_id: Uuid,
    input: IssueItem,
  ) -> Result<Issuance> {
    let now = Utc::now();
    let actor_id = actor.employee_id;

    let (issuance, audit) = self
      .write(move |conn| record_issuance(conn, &actor, &request, item_id, &input, now))
      .await?;

    tracing::info!(
      issuance_id = %issuance.issuance_id,
      %item_id,
      recipient = issuance.recipient,
      assets = issuance.assets.len(),
      actor = actor_id,
      "item issued"
    );
    self.audit.record_best_effort(audit).await;
    Ok(issuance)
  }

  async fn cancel_item(
    &self,
    actor: Actor,
    request: RequestRef,
    item_id: Uuid,
    remarks: Option<String>,
  ) -> Result<RequestItem> {
    let now = Utc::now();
    let actor_id = actor.employee_id;

    let (item, audit) = self
      .write(move |conn| {
        cancel_pending_item(conn, &actor, &request, item_id, remarks, now)
      })
      .await?;

    tracing::info!(%item_id, actor = actor_id, "item canceled");
    self.audit.record_best_effort(audit).await;
    Ok(item)
  }

  async fn acknowledge(&self, actor: Actor, issuance_id: Uuid) -> Result<Issuance> {
    let now = Utc::now();
    let actor_id = actor.employee_id;

    let (issuance, audit) = self
      .write(move |conn| acknowledge_issuance(conn, &actor, issuance_id, now))
      .await?;

    tracing::info!(%issuance_id, actor = actor_id, "issuance acknowledged");
    self.audit.record_best_effort(audit).await;
    Ok(issuance)
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_request(&self, request: RequestRef) -> Result<Option<RequestDetail>> {
    self
      .read(move |conn| {
        let Some(request) = find_request(conn, &request)? else {
          return Ok(None);
        };
        let items = load_items(conn, request.request_id)?
          .into_iter()
          .map(|item| item_view(conn, item))
          .collect::<Result<Vec<_>>>()?;
        Ok(Some(RequestDetail {
          badge: request.status.into(),
          request,
          items,
        }))
      })
      .await
  }

  async fn list_requests(&self, query: &RequestQuery) -> Result<RequestPage> {
    let status = query.status.map(RequestStatus::code);
    let pattern = query
      .text
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .map(|t| format!("%{t}%"));
    let order_by = order_clause(query.sort, query.order);
    let limit = to_sql_int(query.limit.unwrap_or(DEFAULT_PAGE_SIZE));
    let offset = to_sql_int(query.offset.unwrap_or(0));

    self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {REQUEST_COLUMNS},
                  (SELECT COUNT(*) FROM request_items i
                   WHERE i.request_id = r.request_id)
           FROM requests r
           WHERE {LIST_FILTER}
           ORDER BY {order_by}
           LIMIT ?3 OFFSET ?4"
        ))?;
        let raws = stmt
          .query_map(
            rusqlite::params![status, pattern.as_deref(), limit, offset],
            |row| Ok((RawRequest::from_row(row, 0)?, row.get::<_, i64>(13)?)),
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        let total: i64 = conn.query_row(
          &format!("SELECT COUNT(*) FROM requests r WHERE {LIST_FILTER}"),
          rusqlite::params![status, pattern.as_deref()],
          |row| row.get(0),
        )?;

        let requests = raws
          .into_iter()
          .map(|(raw, item_count)| {
            let request = raw.into_request()?;
            Ok(RequestSummary {
              badge: request.status.into(),
              request,
              item_count: u32::try_from(item_count).unwrap_or(u32::MAX),
            })
          })
          .collect::<Result<Vec<_>>>()?;

        Ok(RequestPage {
          requests,
          total: u64::try_from(total).unwrap_or_default(),
          counts: count_by_status(conn)?,
        })
      })
      .await
  }

  async fn status_counts(&self) -> Result<Vec<StatusCount>> {
    self.read(count_by_status).await
  }

  async fn get_issuance(&self, issuance_id: Uuid) -> Result<Option<Issuance>> {
    self.read(move |conn| find_issuance(conn, issuance_id)).await
  }

  async fn pending_acknowledgments(&self, recipient: EmployeeId) -> Result<Vec<Issuance>> {
    self
      .read(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {ISSUANCE_COLUMNS} FROM issuances s
           WHERE s.recipient_id = ?1 AND s.ack_status = ?2
           ORDER BY s.seq"
        ))?;
        let raws = stmt
          .query_map(
            rusqlite::params![recipient, encode_ack(AckStatus::Pending)],
            RawIssuance::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        raws.into_iter().map(|raw| with_assets(conn, raw)).collect()
      })
      .await
  }

  async fn audit_trail(
    &self,
    entity_type: EntityType,
    entity_id: Uuid,
  ) -> Result<Vec<AuditEntry>> {
    self.audit.trail(entity_type, entity_id).await
  }
}

// ─── Write steps ─────────────────────────────────────────────────────────────
//
// Each runs inside the transaction opened by `SqliteStore::write` and returns
// the audit entries to record once it commits.

fn insert_request(
  conn: &Connection,
  actor: &Actor,
  input: NewRequest,
  drafts: Vec<ItemDraft>,
  now: DateTime<Utc>,
  year: i32,
) -> Result<(SubmittedRequest, Vec<NewAuditEntry>)> {
  let request_number = sequence::allocate(conn, year)?;
  let mut requestor = input.requestor;
  requestor.name = requestor.name.trim().to_owned();

  let request = Request {
    request_id: Uuid::new_v4(),
    request_number,
    requestor,
    status: RequestStatus::New,
    remarks: non_blank(input.remarks),
    created_by: actor.employee_id,
    updated_by: actor.employee_id,
    created_at: now,
    updated_at: now,
  };

  conn.execute(
    "INSERT INTO requests
       (request_id, request_number, request_year, requestor_id, requestor_name,
        department, production_line, station, status, remarks,
        created_by, updated_by, created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    rusqlite::params![
      encode_uuid(request.request_id),
      request.request_number.as_str(),
      year,
      request.requestor.employee_id,
      request.requestor.name,
      request.requestor.department,
      request.requestor.production_line,
      request.requestor.station,
      request.status.code(),
      request.remarks,
      request.created_by,
      request.updated_by,
      encode_dt(request.created_at),
      encode_dt(request.updated_at),
    ],
  )?;

  let mut audit = vec![NewAuditEntry::created(
    EntityType::Request,
    request.request_id,
    actor.employee_id,
    &request,
  )?];

  for draft in drafts {
    let known = match draft.requested_recipient {
      Some(id) => employee_exists(conn, id)?,
      None => false,
    };
    if let (Some(id), false) = (draft.requested_recipient, known) {
      tracing::debug!(employee_id = id, "unknown recipient; item left unassigned");
    }

    let item = RequestItem {
      item_id: Uuid::new_v4(),
      request_id: request.request_id,
      recipient: draft.resolve_recipient(|_| known),
      category: draft.category,
      type_of_request: draft.type_of_request,
      mode: draft.mode,
      location: draft.location,
      quantity: draft.quantity,
      purpose: draft.purpose,
      status: ItemStatus::Pending,
      created_at: now,
      updated_at: now,
    };
    insert_item(conn, &item)?;
    audit.push(NewAuditEntry::created(
      EntityType::RequestItem,
      item.item_id,
      actor.employee_id,
      &item,
    )?);
  }

  let submitted = SubmittedRequest {
    request_id:     request.request_id,
    request_number: request.request_number,
  };
  Ok((submitted, audit))
}

fn insert_item(conn: &Connection, item: &RequestItem) -> Result<()> {
  conn.execute(
    "INSERT INTO request_items
       (item_id, request_id, category, type_of_request, request_mode,
        recipient_id, location, quantity, purpose, item_status,
        created_at, updated_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
    rusqlite::params![
      encode_uuid(item.item_id),
      encode_uuid(item.request_id),
      item.category,
      item.type_of_request,
      encode_mode(item.mode),
      item.recipient.employee_id(),
      item.location,
      item.quantity,
      item.purpose,
      item.status.code(),
      encode_dt(item.created_at),
      encode_dt(item.updated_at),
    ],
  )?;
  Ok(())
}

fn apply_transition(
  conn: &Connection,
  actor: &Actor,
  reference: &RequestRef,
  action: Action,
  remarks: Option<String>,
  now: DateTime<Utc>,
) -> Result<(RequestStatus, Request, Vec<NewAuditEntry>)> {
  let before = load_request(conn, reference)?;
  let target = workflow::plan_transition(before.status, action, remarks.as_deref())?;
  let remarks = non_blank(remarks);

  let after =
    update_request_status(conn, &before, target, actor.employee_id, remarks.as_deref(), now)?;
  let mut audit = vec![
    NewAuditEntry::updated(
      EntityType::Request,
      before.request_id,
      actor.employee_id,
      &before,
      &after,
    )?
    .with_remarks(remarks.as_deref()),
  ];

  if action.cascades_to_items() {
    for item in load_items(conn, before.request_id)? {
      if !item.status.is_pending() {
        continue;
      }
      let canceled = update_item_status(conn, &item, ItemStatus::Canceled, now)?;
      audit.push(
        NewAuditEntry::updated(
          EntityType::RequestItem,
          item.item_id,
          actor.employee_id,
          &item,
          &canceled,
        )?
        .with_remarks(remarks.as_deref()),
      );
    }
  }

  Ok((before.status, after, audit))
}

fn record_issuance(
  conn: &Connection,
  actor: &Actor,
  reference: &RequestRef,
  item_id: Uuid,
  input: &IssueItem,
  now: DateTime<Utc>,
) -> Result<(Issuance, Vec<NewAuditEntry>)> {
  let request = load_request(conn, reference)?;
  let item = load_item(conn, request.request_id, item_id)?;
  let plan = workflow::plan_issue(request.status, &item, input)?;
  if item.recipient == Recipient::Unassigned && !employee_exists(conn, plan.recipient)? {
    return Err(
      CoreError::validation(format!(
        "designated recipient {} is not in the employee directory",
        plan.recipient
      ))
      .into(),
    );
  }

  let issuance = Issuance {
    issuance_id:     Uuid::new_v4(),
    item_id,
    recipient:       plan.recipient,
    assets:          plan.assets,
    ack_status:      AckStatus::Pending,
    acknowledged_by: None,
    acknowledged_at: None,
    issued_by:       actor.employee_id,
    issued_at:       now,
  };
  insert_issuance(conn, &issuance)?;
  let issued = update_item_status(conn, &item, ItemStatus::Issued, now)?;

  let mut audit = vec![
    NewAuditEntry::updated(
      EntityType::RequestItem,
      item_id,
      actor.employee_id,
      &item,
      &issued,
    )?,
    NewAuditEntry::created(
      EntityType::Issuance,
      issuance.issuance_id,
      actor.employee_id,
      &issuance,
    )?,
  ];
  audit.extend(advance_if_fulfilled(conn, &request, actor.employee_id, now)?);

  Ok((issuance, audit))
}

fn insert_issuance(conn: &Connection, issuance: &Issuance) -> Result<()> {
  let issuance_id = encode_uuid(issuance.issuance_id);
  conn.execute(
    "INSERT INTO issuances
       (issuance_id, item_id, recipient_id, ack_status, issued_by, issued_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    rusqlite::params![
      issuance_id,
      encode_uuid(issuance.item_id),
      issuance.recipient,
      encode_ack(issuance.ack_status),
      issuance.issued_by,
      encode_dt(issuance.issued_at),
    ],
  )?;

  let mut stmt = conn.prepare(
    "INSERT INTO issuance_assets (issuance_id, line_no, hostname, location, remarks)
     VALUES (?1, ?2, ?3, ?4, ?5)",
  )?;
  for (line_no, asset) in (1_i64..).zip(&issuance.assets) {
    stmt.execute(rusqlite::params![
      issuance_id,
      line_no,
      asset.hostname,
      asset.location,
      asset.remarks,
    ])?;
  }
  Ok(())
}

fn cancel_pending_item(
  conn: &Connection,
  actor: &Actor,
  reference: &RequestRef,
  item_id: Uuid,
  remarks: Option<String>,
  now: DateTime<Utc>,
) -> Result<(RequestItem, Vec<NewAuditEntry>)> {
  let request = load_request(conn, reference)?;
  let item = load_item(conn, request.request_id, item_id)?;
  workflow::check_cancel_item(request.status, &item, remarks.as_deref())?;

  let canceled = update_item_status(conn, &item, ItemStatus::Canceled, now)?;
  let mut audit = vec![
    NewAuditEntry::updated(
      EntityType::RequestItem,
      item_id,
      actor.employee_id,
      &item,
      &canceled,
    )?
    .with_remarks(remarks.as_deref()),
  ];
  audit.extend(advance_if_fulfilled(conn, &request, actor.employee_id, now)?);

  Ok((canceled, audit))
}

fn acknowledge_issuance(
  conn: &Connection,
  actor: &Actor,
  issuance_id: Uuid,
  now: DateTime<Utc>,
) -> Result<(Issuance, Vec<NewAuditEntry>)> {
  let before =
    find_issuance(conn, issuance_id)?.ok_or(CoreError::IssuanceNotFound(issuance_id))?;
  workflow::check_acknowledge(&before, actor.employee_id)?;

  let after = Issuance {
    ack_status: AckStatus::Acknowledged,
    acknowledged_by: Some(actor.employee_id),
    acknowledged_at: Some(now),
    ..before.clone()
  };
  let changed = conn.execute(
    "UPDATE issuances
     SET ack_status = ?1, acknowledged_by = ?2, acknowledged_at = ?3
     WHERE issuance_id = ?4 AND ack_status = ?5",
    rusqlite::params![
      encode_ack(AckStatus::Acknowledged),
      actor.employee_id,
      encode_dt(now),
      encode_uuid(issuance_id),
      encode_ack(AckStatus::Pending),
    ],
  )?;
  if changed == 0 {
    return Err(
      CoreError::InvalidState(format!("issuance {issuance_id} is already acknowledged"))
        .into(),
    );
  }

  let mut audit = vec![NewAuditEntry::updated(
    EntityType::Issuance,
    issuance_id,
    actor.employee_id,
    &before,
    &after,
  )?];

  let request = request_of_item(conn, before.item_id)?;
  audit.extend(advance_if_acknowledged(conn, &request, actor.employee_id, now)?);

  Ok((after, audit))
}

/// Move an approved request to Issued once none of its items are pending,
/// and on to Acknowledged if every issued item was already acknowledged.
fn advance_if_fulfilled(
  conn: &Connection,
  request: &Request,
  actor_id: EmployeeId,
  now: DateTime<Utc>,
) -> Result<Vec<NewAuditEntry>> {
  let statuses = item_statuses(conn, request.request_id)?;
  let Some(next) = workflow::rollup_issued(request.status, &statuses) else {
    return Ok(Vec::new());
  };
  let advanced = update_request_status(conn, request, next, actor_id, None, now)?;
  let mut audit = vec![NewAuditEntry::updated(
    EntityType::Request,
    request.request_id,
    actor_id,
    request,
    &advanced,
  )?];
  audit.extend(advance_if_acknowledged(conn, &advanced, actor_id, now)?);
  Ok(audit)
}

/// Move an issued request to Acknowledged once every issued item's issuance
/// is acknowledged.
fn advance_if_acknowledged(
  conn: &Connection,
  request: &Request,
  actor_id: EmployeeId,
  now: DateTime<Utc>,
) -> Result<Option<NewAuditEntry>> {
  let states = item_ack_states(conn, request.request_id)?;
  let Some(next) = workflow::rollup_acknowledged(request.status, &states) else {
    return Ok(None);
  };
  let advanced = update_request_status(conn, request, next, actor_id, None, now)?;
  Ok(Some(NewAuditEntry::updated(
    EntityType::Request,
    request.request_id,
    actor_id,
    request,
    &advanced,
  )?))
}

/// Compare-and-set the request status; fails if `before.status` is no longer
/// the stored one. `remarks`, when given, replaces the stored remarks.
fn update_request_status(
  conn: &Connection,
  before: &Request,
  status: RequestStatus,
  actor_id: EmployeeId,
  remarks: Option<&str>,
  now: DateTime<Utc>,
) -> Result<Request> {
  let after = Request {
    status,
    remarks: remarks.map(str::to_owned).or_else(|| before.remarks.clone()),
    updated_by: actor_id,
    updated_at: now,
    ..before.clone()
  };
  let changed = conn.execute(
    "UPDATE requests
     SET status = ?1, remarks = ?2, updated_by = ?3, updated_at = ?4
     WHERE request_id = ?5 AND status = ?6",
    rusqlite::params![
      after.status.code(),
      after.remarks,
      after.updated_by,
      encode_dt(after.updated_at),
      encode_uuid(before.request_id),
      before.status.code(),
    ],
  )?;
  if changed == 0 {
    return Err(
      CoreError::InvalidState(format!(
        "request {} is no longer {}",
        before.request_number,
        before.status.label()
      ))
      .into(),
    );
  }
  Ok(after)
}

/// Compare-and-set the item status.
fn update_item_status(
  conn: &Connection,
  before: &RequestItem,
  status: ItemStatus,
  now: DateTime<Utc>,
) -> Result<RequestItem> {
  let after = RequestItem { status, updated_at: now, ..before.clone() };
  let changed = conn.execute(
    "UPDATE request_items SET item_status = ?1, updated_at = ?2
     WHERE item_id = ?3 AND item_status = ?4",
    rusqlite::params![
      status.code(),
      encode_dt(now),
      encode_uuid(before.item_id),
      before.status.code(),
    ],
  )?;
  if changed == 0 {
    return Err(
      CoreError::InvalidState(format!(
        "item {} is no longer {}",
        before.item_id,
        before.status.label()
      ))
      .into(),
    );
  }
  Ok(after)
}

// ─── Loaders ─────────────────────────────────────────────────────────────────

fn find_request(conn: &Connection, reference: &RequestRef) -> Result<Option<Request>> {
  let (column, key) = match reference {
    RequestRef::Id(id) => ("request_id", encode_uuid(*id)),
    RequestRef::Number(number) => ("request_number", number.clone()),
  };
  conn
    .query_row(
      &format!("SELECT {REQUEST_COLUMNS} FROM requests r WHERE r.{column} = ?1"),
      rusqlite::params![key],
      |row| RawRequest::from_row(row, 0),
    )
    .optional()?
    .map(RawRequest::into_request)
    .transpose()
}

fn load_request(conn: &Connection, reference: &RequestRef) -> Result<Request> {
  find_request(conn, reference)?
    .ok_or_else(|| CoreError::RequestNotFound(reference.to_string()).into())
}

fn request_of_item(conn: &Connection, item_id: Uuid) -> Result<Request> {
  conn
    .query_row(
      &format!(
        "SELECT {REQUEST_COLUMNS} FROM requests r
         JOIN request_items i ON i.request_id = r.request_id
         WHERE i.item_id = ?1"
      ),
      rusqlite::params![encode_uuid(item_id)],
      |row| RawRequest::from_row(row, 0),
    )
    .optional()?
    .ok_or(CoreError::ItemNotFound(item_id))?
    .into_request()
}

fn load_items(conn: &Connection, request_id: Uuid) -> Result<Vec<RequestItem>> {
  let mut stmt = conn.prepare(&format!(
    "SELECT {ITEM_COLUMNS} FROM request_items i
     WHERE i.request_id = ?1
     ORDER BY i.seq"
  ))?;
  let raws = stmt
    .query_map(rusqlite::params![encode_uuid(request_id)], |row| {
      RawItem::from_row(row, 0)
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawItem::into_item).collect()
}

/// The item must belong to `request_id`; an item of another request is
/// reported as not found.
fn load_item(conn: &Connection, request_id: Uuid, item_id: Uuid) -> Result<RequestItem> {
  conn
    .query_row(
      &format!(
        "SELECT {ITEM_COLUMNS} FROM request_items i
         WHERE i.item_id = ?1 AND i.request_id = ?2"
      ),
      rusqlite::params![encode_uuid(item_id), encode_uuid(request_id)],
      |row| RawItem::from_row(row, 0),
    )
    .optional()?
    .ok_or(CoreError::ItemNotFound(item_id))?
    .into_item()
}

fn item_statuses(conn: &Connection, request_id: Uuid) -> Result<Vec<ItemStatus>> {
  let mut stmt =
    conn.prepare("SELECT item_status FROM request_items WHERE request_id = ?1")?;
  let codes = stmt
    .query_map(rusqlite::params![encode_uuid(request_id)], |row| row.get::<_, i64>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  codes.into_iter().map(decode_item_status).collect()
}

/// Each item's status paired with whether its issuance is acknowledged.
fn item_ack_states(conn: &Connection, request_id: Uuid) -> Result<Vec<(ItemStatus, bool)>> {
  let mut stmt = conn.prepare(
    "SELECT i.item_status, s.ack_status
     FROM request_items i
     LEFT JOIN issuances s ON s.item_id = i.item_id
     WHERE i.request_id = ?1",
  )?;
  let rows = stmt
    .query_map(rusqlite::params![encode_uuid(request_id)], |row| {
      Ok((row.get::<_, i64>(0)?, row.get::<_, Option<String>>(1)?))
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  rows
    .into_iter()
    .map(|(code, ack)| {
      let acknowledged = match ack.as_deref() {
        Some(ack) => decode_ack(ack)? == AckStatus::Acknowledged,
        None => false,
      };
      Ok((decode_item_status(code)?, acknowledged))
    })
    .collect()
}

fn find_issuance(conn: &Connection, issuance_id: Uuid) -> Result<Option<Issuance>> {
  find_issuance_by(conn, "issuance_id", encode_uuid(issuance_id))
}

fn issuance_for_item(conn: &Connection, item_id: Uuid) -> Result<Option<Issuance>> {
  find_issuance_by(conn, "item_id", encode_uuid(item_id))
}

fn find_issuance_by(
  conn: &Connection,
  column: &'static str,
  key: String,
) -> Result<Option<Issuance>> {
  conn
    .query_row(
      &format!("SELECT {ISSUANCE_COLUMNS} FROM issuances s WHERE s.{column} = ?1"),
      rusqlite::params![key],
      RawIssuance::from_row,
    )
    .optional()?
    .map(|raw| with_assets(conn, raw))
    .transpose()
}

fn with_assets(conn: &Connection, raw: RawIssuance) -> Result<Issuance> {
  let mut stmt = conn.prepare(
    "SELECT hostname, location, remarks FROM issuance_assets
     WHERE issuance_id = ?1
     ORDER BY line_no",
  )?;
  let assets = stmt
    .query_map(rusqlite::params![raw.issuance_id], |row| {
      Ok(IssuedAsset {
        hostname: row.get(0)?,
        location: row.get(1)?,
        remarks:  row.get(2)?,
      })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raw.into_issuance(assets)
}

fn employee_exists(conn: &Connection, id: EmployeeId) -> Result<bool> {
  Ok(
    conn
      .query_row(
        "SELECT 1 FROM employees WHERE employee_id = ?1",
        rusqlite::params![id],
        |_| Ok(()),
      )
      .optional()?
      .is_some(),
  )
}

fn item_view(conn: &Connection, item: RequestItem) -> Result<ItemView> {
  let recipient_name = match item.recipient {
    Recipient::Employee(id) => conn
      .query_row(
        "SELECT name FROM employees WHERE employee_id = ?1",
        rusqlite::params![id],
        |row| row.get::<_, String>(0),
      )
      .optional()?,
    Recipient::Unassigned => None,
  }
  .unwrap_or_else(|| UNASSIGNED_LABEL.to_owned());

  Ok(ItemView {
    issuance: issuance_for_item(conn, item.item_id)?,
    badge: item.status.into(),
    recipient_name,
    item,
  })
}

fn count_by_status(conn: &Connection) -> Result<Vec<StatusCount>> {
  let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM requests GROUP BY status")?;
  let rows = stmt
    .query_map([], |row| Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?)))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  let counts = rows
    .into_iter()
    .map(|(code, n)| Ok((decode_request_status(code)?, u64::try_from(n).unwrap_or_default())))
    .collect::<Result<Vec<_>>>()?;
  Ok(StatusCount::tally(&counts))
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// Whitelisted `ORDER BY` clause. Insertion order (`seq`) stands in for
/// creation time and breaks ties for the other keys.
fn order_clause(sort: SortField, order: SortOrder) -> String {
  let dir = match order {
    SortOrder::Asc => "ASC",
    SortOrder::Desc => "DESC",
  };
  match sort {
    SortField::CreatedAt => format!("r.seq {dir}"),
    SortField::RequestNumber => format!("r.request_number {dir}, r.seq {dir}"),
    SortField::Status => format!("r.status {dir}, r.seq {dir}"),
    SortField::RequestorName => format!("r.requestor_name {dir}, r.seq {dir}"),
  }
}

fn to_sql_int(n: usize) -> i64 { i64::try_from(n).unwrap_or(i64::MAX) }

fn non_blank(s: Option<String>) -> Option<String> {
  s.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty())
}
