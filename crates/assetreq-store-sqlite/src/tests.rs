//! Integration tests for `SqliteStore` against an in-memory database.

use assetreq_core::{
  Classify, ErrorKind,
  audit::{AuditAction, EntityType},
  cart::{BulkLine, CartEntry, PerItemLine, RecipientField},
  employee::{Actor, Employee, Recipient},
  issuance::{IssueItem, IssuedAsset},
  request::{NewRequest, RequestDetail, RequestRef, Requestor},
  status::{AckStatus, ItemStatus, RequestStatus},
  store::{RequestQuery, RequestStore, SortField, SortOrder},
  workflow::Action,
};
use chrono::{Datelike, Local};
use serde_json::json;
use uuid::Uuid;

use crate::SqliteStore;

const ADA: i64 = 100;
const GRACE: i64 = 200;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

/// A store whose directory knows Ada and Grace.
async fn staffed_store() -> SqliteStore {
  let s = store().await;
  for (id, name) in [(ADA, "Ada Lovelace"), (GRACE, "Grace Hopper")] {
    s.upsert_employee(Employee {
      employee_id: id,
      name:        name.into(),
      department:  Some("Engineering".into()),
    })
    .await
    .unwrap();
  }
  s
}

fn clerk() -> Actor { Actor::new(1, "Clerk") }

fn year() -> i32 { Local::now().year() }

fn number(seq: u32) -> String { format!("REQ-{}-{seq:04}", year()) }

fn requestor(name: &str) -> Requestor {
  Requestor {
    employee_id:     7,
    name:            name.into(),
    department:      Some("Assembly".into()),
    production_line: Some("L1".into()),
    station:         None,
  }
}

fn bulk(lines: &[(&str, Option<i64>)], recipient: Option<RecipientField>) -> CartEntry {
  CartEntry::Bulk {
    category: "Peripherals".into(),
    items: lines
      .iter()
      .map(|(name, qty)| BulkLine { name: (*name).into(), qty: *qty })
      .collect(),
    recipient,
    location: "Line 3".into(),
    purpose: "replacement".into(),
  }
}

fn request_with(cart: Vec<CartEntry>) -> NewRequest {
  NewRequest { requestor: requestor("Ada Lovelace"), remarks: None, cart }
}

/// One monitor for Ada.
fn monitor_for_ada() -> NewRequest {
  request_with(vec![bulk(&[("Monitor", None)], Some(RecipientField::Id(ADA)))])
}

fn assets(hostnames: &[&str]) -> Vec<IssuedAsset> {
  hostnames
    .iter()
    .map(|h| IssuedAsset { hostname: (*h).into(), location: String::new(), remarks: None })
    .collect()
}

async fn detail(s: &SqliteStore, id: Uuid) -> RequestDetail {
  s.get_request(RequestRef::Id(id)).await.unwrap().expect("request exists")
}

/// Submit `input` and walk it to Approved.
async fn approved(s: &SqliteStore, input: NewRequest) -> RequestDetail {
  let submitted = s.submit(clerk(), input).await.unwrap();
  let r = RequestRef::Id(submitted.request_id);
  s.transition(clerk(), r.clone(), Action::Triage, None).await.unwrap();
  s.transition(clerk(), r, Action::Approve, None).await.unwrap();
  detail(s, submitted.request_id).await
}

// ─── Submission ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn submit_numbers_requests_from_one() {
  let s = store().await;

  let first = s.submit(clerk(), monitor_for_ada()).await.unwrap();
  let second = s.submit(clerk(), monitor_for_ada()).await.unwrap();

  assert_eq!(first.request_number.as_str(), number(1));
  assert_eq!(second.request_number.as_str(), number(2));

  let d = detail(&s, first.request_id).await;
  assert_eq!(d.request.status, RequestStatus::New);
  assert_eq!(d.badge.label, "New");
  assert_eq!(d.badge.color, "gold");
  assert_eq!(d.request.created_by, 1);
}

#[tokio::test]
async fn bulk_entry_expands_into_one_item_per_type() {
  let s = staffed_store().await;
  let input = request_with(vec![bulk(
    &[("Mouse", Some(2)), ("Keyboard", Some(1))],
    Some(RecipientField::Text(ADA.to_string())),
  )]);

  let submitted = s.submit(clerk(), input).await.unwrap();
  let d = detail(&s, submitted.request_id).await;

  assert_eq!(d.items.len(), 2);
  let (mouse, keyboard) = (&d.items[0], &d.items[1]);
  assert_eq!(mouse.item.type_of_request, "Mouse");
  assert_eq!(mouse.item.quantity, 2);
  assert_eq!(keyboard.item.type_of_request, "Keyboard");
  assert_eq!(keyboard.item.quantity, 1);
  for view in &d.items {
    assert_eq!(view.item.recipient, Recipient::Employee(ADA));
    assert_eq!(view.recipient_name, "Ada Lovelace");
    assert_eq!(view.item.location, "Line 3");
    assert_eq!(view.item.purpose, "replacement");
    assert_eq!(view.item.status, ItemStatus::Pending);
    assert!(view.issuance.is_none());
  }
}

#[tokio::test]
async fn per_item_recipients_resolve_against_directory() {
  let s = staffed_store().await;
  let line = |recipient: Option<RecipientField>| PerItemLine {
    recipient,
    location: "Bench 4".into(),
    qty: None,
  };
  let input = request_with(vec![CartEntry::PerItem {
    category:        "Computers".into(),
    type_of_request: "Laptop".into(),
    purpose:         "new hires".into(),
    items:           vec![
      line(Some(RecipientField::Text(GRACE.to_string()))),
      line(Some(RecipientField::Id(ADA))),
      line(Some(RecipientField::Id(999))),
      line(Some(RecipientField::Text("unassigned".into()))),
      line(None),
    ],
  }]);

  let submitted = s.submit(clerk(), input).await.unwrap();
  let d = detail(&s, submitted.request_id).await;

  let recipients: Vec<_> = d.items.iter().map(|v| v.item.recipient).collect();
  assert_eq!(recipients, vec![
    Recipient::Employee(GRACE),
    Recipient::Employee(ADA),
    Recipient::Unassigned,
    Recipient::Unassigned,
    Recipient::Unassigned,
  ]);
  let names: Vec<_> = d.items.iter().map(|v| v.recipient_name.as_str()).collect();
  assert_eq!(names, vec![
    "Grace Hopper",
    "Ada Lovelace",
    "Unassigned",
    "Unassigned",
    "Unassigned",
  ]);
  assert!(d.items.iter().all(|v| v.item.quantity == 1));
}

#[tokio::test]
async fn invalid_cart_persists_nothing() {
  let s = store().await;

  let err = s
    .submit(clerk(), request_with(vec![bulk(&[("Mouse", Some(0))], None)]))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let err = s.submit(clerk(), request_with(vec![])).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let err = s
    .submit(
      clerk(),
      request_with(vec![bulk(&[("Mouse", None)], Some(RecipientField::Text("bob".into())))]),
    )
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let counts = s.status_counts().await.unwrap();
  assert_eq!(counts[0].count, 0);

  let first = s.submit(clerk(), monitor_for_ada()).await.unwrap();
  assert_eq!(first.request_number.as_str(), number(1));
}

#[tokio::test]
async fn rolled_back_submission_does_not_consume_a_number() {
  let s = store().await;
  s.connection()
    .call(|conn| {
      conn.execute_batch(
        "CREATE TRIGGER explode BEFORE INSERT ON request_items
         WHEN NEW.purpose = 'explode'
         BEGIN SELECT RAISE(ABORT, 'injected failure'); END;",
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let failing = || {
    let mut input = monitor_for_ada();
    if let CartEntry::Bulk { purpose, .. } = &mut input.cart[0] {
      *purpose = "explode".into();
    }
    input
  };

  let mut committed = Vec::new();
  for attempt in 1..=5 {
    let input = if attempt == 3 { failing() } else { monitor_for_ada() };
    match s.submit(clerk(), input).await {
      Ok(submitted) => committed.push(submitted.request_number.into_string()),
      Err(e) => {
        assert_eq!(attempt, 3);
        assert_eq!(e.kind(), ErrorKind::Persistence);
      }
    }
  }

  assert_eq!(committed, vec![number(1), number(2), number(3), number(4)]);

  let page = s.list_requests(&RequestQuery::default()).await.unwrap();
  assert_eq!(page.total, 4);
}

#[tokio::test]
async fn sequence_restarts_after_unparseable_latest_number() {
  let s = store().await;
  let submitted = s.submit(clerk(), monitor_for_ada()).await.unwrap();

  let id = submitted.request_id.to_string();
  let garbled = format!("REQ-{}-ABCD", year());
  s.connection()
    .call(move |conn| {
      conn.execute(
        "UPDATE requests SET request_number = ?1 WHERE request_id = ?2",
        rusqlite::params![garbled, id],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let next = s.submit(clerk(), monitor_for_ada()).await.unwrap();
  assert_eq!(next.request_number.as_str(), number(1));
}

#[tokio::test]
async fn sequence_is_per_calendar_year() {
  let s = store().await;
  let submitted = s.submit(clerk(), monitor_for_ada()).await.unwrap();

  let id = submitted.request_id.to_string();
  let last_year = year() - 1;
  s.connection()
    .call(move |conn| {
      conn.execute(
        "UPDATE requests SET request_year = ?1, request_number = ?2 WHERE request_id = ?3",
        rusqlite::params![last_year, format!("REQ-{last_year}-0042"), id],
      )?;
      Ok(())
    })
    .await
    .unwrap();

  let next = s.submit(clerk(), monitor_for_ada()).await.unwrap();
  assert_eq!(next.request_number.as_str(), number(1));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_submissions_get_distinct_contiguous_numbers() {
  let dir = tempfile::tempdir().unwrap();
  let path = dir.path().join("requests.db");
  let a = SqliteStore::open(&path).await.unwrap();
  let b = SqliteStore::open(&path).await.unwrap();

  let handles: Vec<_> = (0..12)
    .map(|i| {
      let s = if i % 2 == 0 { a.clone() } else { b.clone() };
      tokio::spawn(async move { s.submit(clerk(), monitor_for_ada()).await })
    })
    .collect();

  let mut numbers = Vec::new();
  for handle in handles {
    numbers.push(handle.await.unwrap().unwrap().request_number.into_string());
  }
  numbers.sort();

  let expected: Vec<_> = (1..=12).map(number).collect();
  assert_eq!(numbers, expected);
}

// ─── Transitions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn approve_requires_triage_first() {
  let s = store().await;
  let submitted = s.submit(clerk(), monitor_for_ada()).await.unwrap();
  let r = RequestRef::from(&submitted.request_number);

  let err = s
    .transition(clerk(), r.clone(), Action::Approve, None)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidTransition);
  assert_eq!(detail(&s, submitted.request_id).await.request.status, RequestStatus::New);

  let triaged = s.transition(clerk(), r.clone(), Action::Triage, None).await.unwrap();
  assert_eq!(triaged.status, RequestStatus::Triaged);
  let approved = s.transition(clerk(), r, Action::Approve, None).await.unwrap();
  assert_eq!(approved.status, RequestStatus::Approved);
}

#[tokio::test]
async fn illegal_transitions_leave_status_unchanged() {
  let s = store().await;
  let submitted = s.submit(clerk(), monitor_for_ada()).await.unwrap();
  let r = RequestRef::Id(submitted.request_id);
  s.transition(clerk(), r.clone(), Action::Triage, None).await.unwrap();

  for action in [Action::Triage, Action::Disapprove] {
    let err = s
      .transition(clerk(), r.clone(), action, Some("because".into()))
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidTransition, "{action}");
  }
  assert_eq!(
    detail(&s, submitted.request_id).await.request.status,
    RequestStatus::Triaged
  );
}

#[tokio::test]
async fn transition_on_unknown_request_is_not_found() {
  let s = store().await;
  let err = s
    .transition(clerk(), RequestRef::Number(number(9)), Action::Triage, None)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn cancel_requires_remarks_and_cancels_pending_items() {
  let s = staffed_store().await;
  let input = request_with(vec![bulk(
    &[("Mouse", Some(2)), ("Keyboard", None)],
    Some(RecipientField::Id(ADA)),
  )]);
  let submitted = s.submit(clerk(), input).await.unwrap();
  let r = RequestRef::Id(submitted.request_id);

  let err = s
    .transition(clerk(), r.clone(), Action::Cancel, Some("  ".into()))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let canceled = s
    .transition(clerk(), r.clone(), Action::Cancel, Some("duplicate".into()))
    .await
    .unwrap();
  assert_eq!(canceled.status, RequestStatus::Canceled);
  assert_eq!(canceled.remarks.as_deref(), Some("duplicate"));

  let d = detail(&s, submitted.request_id).await;
  assert_eq!(d.items.len(), 2);
  assert!(d.items.iter().all(|v| v.item.status == ItemStatus::Canceled));

  let err = s.transition(clerk(), r, Action::Triage, None).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn disapprove_cancels_pending_items() {
  let s = store().await;
  let submitted = s.submit(clerk(), monitor_for_ada()).await.unwrap();
  let r = RequestRef::Id(submitted.request_id);

  let disapproved = s
    .transition(clerk(), r, Action::Disapprove, Some("out of budget".into()))
    .await
    .unwrap();
  assert_eq!(disapproved.status, RequestStatus::Disapproved);

  let d = detail(&s, submitted.request_id).await;
  assert_eq!(d.badge.color, "red");
  assert_eq!(d.items[0].item.status, ItemStatus::Canceled);
}

// ─── Issuing ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn issue_on_unapproved_request_creates_nothing() {
  let s = staffed_store().await;
  let submitted = s.submit(clerk(), monitor_for_ada()).await.unwrap();
  let r = RequestRef::Id(submitted.request_id);
  s.transition(clerk(), r.clone(), Action::Triage, None).await.unwrap();
  let item_id = detail(&s, submitted.request_id).await.items[0].item.item_id;

  let err = s
    .issue_item(clerk(), r, item_id, IssueItem {
      recipient: None,
      assets:    assets(&["MON-001"]),
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidTransition);

  let d = detail(&s, submitted.request_id).await;
  assert_eq!(d.items[0].item.status, ItemStatus::Pending);
  assert!(d.items[0].issuance.is_none());
  assert!(s.pending_acknowledgments(ADA).await.unwrap().is_empty());
}

#[tokio::test]
async fn issue_checks_asset_count_against_quantity() {
  let s = staffed_store().await;
  let d = approved(
    &s,
    request_with(vec![bulk(&[("Mouse", Some(2))], Some(RecipientField::Id(ADA)))]),
  )
  .await;
  let r = RequestRef::Id(d.request.request_id);
  let item_id = d.items[0].item.item_id;

  let err = s
    .issue_item(clerk(), r.clone(), item_id, IssueItem {
      recipient: None,
      assets:    assets(&["M-1"]),
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let err = s
    .issue_item(clerk(), r, item_id, IssueItem {
      recipient: None,
      assets:    assets(&["M-1", " "]),
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

#[tokio::test]
async fn issuing_every_item_advances_request_to_issued() {
  let s = staffed_store().await;
  let d = approved(
    &s,
    request_with(vec![bulk(
      &[("Mouse", Some(2)), ("Keyboard", None)],
      Some(RecipientField::Id(ADA)),
    )]),
  )
  .await;
  let id = d.request.request_id;
  let (mouse, keyboard) = (d.items[0].item.item_id, d.items[1].item.item_id);

  let issuance = s
    .issue_item(clerk(), RequestRef::Id(id), mouse, IssueItem {
      recipient: None,
      assets:    assets(&["M-1", "M-2"]),
    })
    .await
    .unwrap();
  assert_eq!(issuance.recipient, ADA);
  assert_eq!(issuance.ack_status, AckStatus::Pending);
  assert_eq!(issuance.assets.len(), 2);
  assert_eq!(issuance.assets[0].location, "Line 3");
  assert_eq!(detail(&s, id).await.request.status, RequestStatus::Approved);

  s.issue_item(clerk(), RequestRef::Id(id), keyboard, IssueItem {
    recipient: None,
    assets:    assets(&["K-1"]),
  })
  .await
  .unwrap();

  let d = detail(&s, id).await;
  assert_eq!(d.request.status, RequestStatus::Issued);
  assert!(d.items.iter().all(|v| v.item.status == ItemStatus::Issued));
  let stored = d.items[0].issuance.as_ref().expect("issuance attached");
  assert_eq!(stored, &issuance);

  let err = s
    .issue_item(clerk(), RequestRef::Id(id), mouse, IssueItem {
      recipient: None,
      assets:    assets(&["M-3", "M-4"]),
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn issue_item_of_another_request_is_not_found() {
  let s = staffed_store().await;
  let first = approved(&s, monitor_for_ada()).await;
  let second = approved(&s, monitor_for_ada()).await;

  let err = s
    .issue_item(
      clerk(),
      RequestRef::Id(first.request.request_id),
      second.items[0].item.item_id,
      IssueItem { recipient: None, assets: assets(&["MON-1"]) },
    )
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn unassigned_item_needs_a_designated_recipient() {
  let s = staffed_store().await;
  let d = approved(&s, request_with(vec![bulk(&[("Headset", None)], None)])).await;
  let r = RequestRef::Id(d.request.request_id);
  let item_id = d.items[0].item.item_id;
  assert_eq!(d.items[0].recipient_name, "Unassigned");

  let err = s
    .issue_item(clerk(), r.clone(), item_id, IssueItem {
      recipient: None,
      assets:    assets(&["H-1"]),
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let err = s
    .issue_item(clerk(), r.clone(), item_id, IssueItem {
      recipient: Some(999),
      assets:    assets(&["H-1"]),
    })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
  assert_eq!(
    detail(&s, d.request.request_id).await.items[0].item.status,
    ItemStatus::Pending
  );

  let issuance = s
    .issue_item(clerk(), r, item_id, IssueItem {
      recipient: Some(GRACE),
      assets:    assets(&["H-1"]),
    })
    .await
    .unwrap();
  assert_eq!(issuance.recipient, GRACE);
  assert_eq!(s.pending_acknowledgments(GRACE).await.unwrap(), vec![issuance]);
}

#[tokio::test]
async fn canceling_the_last_pending_item_advances_to_issued() {
  let s = staffed_store().await;
  let d = approved(
    &s,
    request_with(vec![bulk(
      &[("Mouse", None), ("Keyboard", None)],
      Some(RecipientField::Id(ADA)),
    )]),
  )
  .await;
  let id = d.request.request_id;
  let (mouse, keyboard) = (d.items[0].item.item_id, d.items[1].item.item_id);

  s.issue_item(clerk(), RequestRef::Id(id), mouse, IssueItem {
    recipient: None,
    assets:    assets(&["M-1"]),
  })
  .await
  .unwrap();

  let err = s
    .cancel_item(clerk(), RequestRef::Id(id), keyboard, None)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);

  let canceled = s
    .cancel_item(clerk(), RequestRef::Id(id), keyboard, Some("out of stock".into()))
    .await
    .unwrap();
  assert_eq!(canceled.status, ItemStatus::Canceled);
  assert_eq!(detail(&s, id).await.request.status, RequestStatus::Issued);

  let err = s
    .cancel_item(clerk(), RequestRef::Id(id), mouse, Some("changed mind".into()))
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidTransition);
}

#[tokio::test]
async fn canceling_after_every_issuance_is_acknowledged_completes_the_request() {
  let s = staffed_store().await;
  let d = approved(
    &s,
    request_with(vec![bulk(
      &[("Mouse", None), ("Keyboard", None)],
      Some(RecipientField::Id(ADA)),
    )]),
  )
  .await;
  let id = d.request.request_id;
  let (mouse, keyboard) = (d.items[0].item.item_id, d.items[1].item.item_id);

  let issuance = s
    .issue_item(clerk(), RequestRef::Id(id), mouse, IssueItem {
      recipient: None,
      assets:    assets(&["M-1"]),
    })
    .await
    .unwrap();
  s.acknowledge(Actor::new(ADA, "Ada Lovelace"), issuance.issuance_id)
    .await
    .unwrap();
  assert_eq!(detail(&s, id).await.request.status, RequestStatus::Approved);

  s.cancel_item(clerk(), RequestRef::Id(id), keyboard, Some("out of stock".into()))
    .await
    .unwrap();
  assert_eq!(detail(&s, id).await.request.status, RequestStatus::Acknowledged);

  let statuses: Vec<_> = s
    .audit_trail(EntityType::Request, id)
    .await
    .unwrap()
    .into_iter()
    .filter_map(|e| e.new_values.and_then(|v| v.get("status").cloned()))
    .collect();
  assert_eq!(statuses[statuses.len() - 2..], [json!("issued"), json!("acknowledged")]);
}

// ─── Acknowledgment ──────────────────────────────────────────────────────────

#[tokio::test]
async fn only_the_recipient_acknowledges_and_only_once() {
  let s = staffed_store().await;
  let d = approved(&s, monitor_for_ada()).await;
  let id = d.request.request_id;
  let issuance = s
    .issue_item(clerk(), RequestRef::Id(id), d.items[0].item.item_id, IssueItem {
      recipient: None,
      assets:    assets(&["MON-1"]),
    })
    .await
    .unwrap();
  assert_eq!(detail(&s, id).await.request.status, RequestStatus::Issued);

  let err = s
    .acknowledge(Actor::new(GRACE, "Grace Hopper"), issuance.issuance_id)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Unauthorized);
  assert!(!err.to_string().contains(&ADA.to_string()));

  let acked = s
    .acknowledge(Actor::new(ADA, "Ada Lovelace"), issuance.issuance_id)
    .await
    .unwrap();
  assert_eq!(acked.ack_status, AckStatus::Acknowledged);
  assert_eq!(acked.acknowledged_by, Some(ADA));
  let stamped = acked.acknowledged_at.expect("acknowledged_at set");

  let err = s
    .acknowledge(Actor::new(ADA, "Ada Lovelace"), issuance.issuance_id)
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidTransition);

  let stored = s.get_issuance(issuance.issuance_id).await.unwrap().unwrap();
  assert_eq!(stored.acknowledged_at, Some(stamped));
  assert!(s.pending_acknowledgments(ADA).await.unwrap().is_empty());

  let d = detail(&s, id).await;
  assert_eq!(d.request.status, RequestStatus::Acknowledged);
  assert_eq!(d.badge.color, "green");
}

#[tokio::test]
async fn request_waits_for_every_issued_item_to_be_acknowledged() {
  let s = staffed_store().await;
  let line = |id: i64| PerItemLine {
    recipient: Some(RecipientField::Id(id)),
    location:  "Bench 1".into(),
    qty:       None,
  };
  let d = approved(
    &s,
    request_with(vec![CartEntry::PerItem {
      category:        "Computers".into(),
      type_of_request: "Laptop".into(),
      purpose:         "refresh".into(),
      items:           vec![line(ADA), line(GRACE)],
    }]),
  )
  .await;
  let id = d.request.request_id;

  let mut issued = Vec::new();
  for (view, host) in d.items.iter().zip(["LT-1", "LT-2"]) {
    issued.push(
      s.issue_item(clerk(), RequestRef::Id(id), view.item.item_id, IssueItem {
        recipient: None,
        assets:    assets(&[host]),
      })
      .await
      .unwrap(),
    );
  }

  s.acknowledge(Actor::new(ADA, "Ada"), issued[0].issuance_id).await.unwrap();
  assert_eq!(detail(&s, id).await.request.status, RequestStatus::Issued);

  s.acknowledge(Actor::new(GRACE, "Grace"), issued[1].issuance_id).await.unwrap();
  assert_eq!(detail(&s, id).await.request.status, RequestStatus::Acknowledged);
}

#[tokio::test]
async fn acknowledge_unknown_issuance_is_not_found() {
  let s = store().await;
  let err = s.acknowledge(clerk(), Uuid::new_v4()).await.unwrap_err();
  assert_eq!(err.kind(), ErrorKind::NotFound);
  assert!(s.get_issuance(Uuid::new_v4()).await.unwrap().is_none());
}

// ─── Reads ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn get_request_by_number_or_id() {
  let s = store().await;
  let submitted = s.submit(clerk(), monitor_for_ada()).await.unwrap();

  let by_number = s
    .get_request(submitted.request_number.as_str().parse().unwrap())
    .await
    .unwrap()
    .unwrap();
  let by_id = detail(&s, submitted.request_id).await;
  assert_eq!(by_number.request, by_id.request);

  assert!(
    s.get_request(RequestRef::Number(number(99)))
      .await
      .unwrap()
      .is_none()
  );
}

#[tokio::test]
async fn list_filters_sorts_and_counts() {
  let s = store().await;
  for name in ["Charlie", "Alice", "Bob"] {
    let mut input = monitor_for_ada();
    input.requestor = requestor(name);
    s.submit(clerk(), input).await.unwrap();
  }
  s.transition(clerk(), RequestRef::Number(number(2)), Action::Triage, None)
    .await
    .unwrap();

  let page = s.list_requests(&RequestQuery::default()).await.unwrap();
  assert_eq!(page.total, 3);
  let order: Vec<_> = page
    .requests
    .iter()
    .map(|r| r.request.request_number.as_str().to_owned())
    .collect();
  assert_eq!(order, vec![number(3), number(2), number(1)]);
  assert!(page.requests.iter().all(|r| r.item_count == 1));

  let by_name = s
    .list_requests(&RequestQuery {
      sort: SortField::RequestorName,
      order: SortOrder::Asc,
      ..Default::default()
    })
    .await
    .unwrap();
  let names: Vec<_> = by_name
    .requests
    .iter()
    .map(|r| r.request.requestor.name.as_str())
    .collect();
  assert_eq!(names, vec!["Alice", "Bob", "Charlie"]);

  let triaged = s
    .list_requests(&RequestQuery {
      status: Some(RequestStatus::Triaged),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(triaged.total, 1);
  assert_eq!(triaged.requests[0].request.requestor.name, "Alice");
  assert_eq!(triaged.requests[0].badge.color, "lime");

  let text = s
    .list_requests(&RequestQuery { text: Some("bo".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(text.total, 1);
  assert_eq!(text.requests[0].request.requestor.name, "Bob");

  let paged = s
    .list_requests(&RequestQuery { limit: Some(1), offset: Some(1), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(paged.total, 3);
  assert_eq!(paged.requests.len(), 1);
  assert_eq!(paged.requests[0].request.request_number.as_str(), number(2));

  let counts = page.counts;
  assert_eq!(counts.len(), 8);
  assert_eq!((counts[0].label, counts[0].count), ("All", 3));
  assert_eq!((counts[1].label, counts[1].count), ("New", 2));
  assert_eq!((counts[2].label, counts[2].count), ("Triaged", 1));
  assert!(counts[3..].iter().all(|c| c.count == 0));
}

#[tokio::test]
async fn upsert_employee_replaces_entry() {
  let s = store().await;
  let first = Employee { employee_id: 5, name: "Lin".into(), department: None };
  s.upsert_employee(first).await.unwrap();
  s.upsert_employee(Employee {
    employee_id: 5,
    name:        " Lin Wei ".into(),
    department:  Some("QA".into()),
  })
  .await
  .unwrap();

  let stored = s.get_employee(5).await.unwrap().unwrap();
  assert_eq!(stored.name, "Lin Wei");
  assert_eq!(stored.department.as_deref(), Some("QA"));
  assert!(s.get_employee(6).await.unwrap().is_none());

  let err = s
    .upsert_employee(Employee { employee_id: 6, name: " ".into(), department: None })
    .await
    .unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Validation);
}

// ─── Audit ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn workflow_steps_leave_an_audit_trail() {
  let s = store().await;
  let submitted = s.submit(clerk(), monitor_for_ada()).await.unwrap();
  let r = RequestRef::Id(submitted.request_id);
  s.transition(clerk(), r, Action::Triage, Some("looks fine".into()))
    .await
    .unwrap();

  let trail = s
    .audit_trail(EntityType::Request, submitted.request_id)
    .await
    .unwrap();
  assert_eq!(trail.len(), 2);

  let created = &trail[0];
  assert_eq!(created.action, AuditAction::Created);
  assert_eq!(created.actor_id, 1);
  assert!(created.old_values.is_none());
  let new = created.new_values.as_ref().unwrap();
  assert_eq!(new["request_number"], json!(number(1)));
  let created_at = new["created_at"].as_str().unwrap();
  assert_eq!(created_at.len(), 19);
  assert!(!created_at.contains('T'));

  let updated = &trail[1];
  assert_eq!(updated.action, AuditAction::Updated);
  assert_eq!(updated.remarks.as_deref(), Some("looks fine"));
  assert_eq!(
    updated.old_values,
    Some(json!({ "status": "new", "remarks": null }))
  );
  assert_eq!(
    updated.new_values,
    Some(json!({ "status": "triaged", "remarks": "looks fine" }))
  );

  let d = detail(&s, submitted.request_id).await;
  let item_trail = s
    .audit_trail(EntityType::RequestItem, d.items[0].item.item_id)
    .await
    .unwrap();
  assert_eq!(item_trail.len(), 1);
}

#[tokio::test]
async fn audit_failure_does_not_fail_the_workflow() {
  let s = store().await;
  s.connection()
    .call(|conn| {
      conn.execute_batch("DROP TABLE audit_log;")?;
      Ok(())
    })
    .await
    .unwrap();

  let submitted = s.submit(clerk(), monitor_for_ada()).await.unwrap();
  let triaged = s
    .transition(clerk(), RequestRef::Id(submitted.request_id), Action::Triage, None)
    .await
    .unwrap();
  assert_eq!(triaged.status, RequestStatus::Triaged);
  assert_eq!(
    detail(&s, submitted.request_id).await.request.status,
    RequestStatus::Triaged
  );
}
