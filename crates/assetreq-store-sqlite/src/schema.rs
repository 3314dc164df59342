//! SQL schema for the asset request SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Local cache of the HR directory; used to resolve recipients.
CREATE TABLE IF NOT EXISTS employees (
    employee_id INTEGER PRIMARY KEY,
    name        TEXT NOT NULL,
    department  TEXT
);

-- Requests are never deleted. `seq` records insertion order and drives
-- request number allocation.
CREATE TABLE IF NOT EXISTS requests (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    request_id      TEXT NOT NULL UNIQUE,
    request_number  TEXT NOT NULL UNIQUE,
    request_year    INTEGER NOT NULL,
    requestor_id    INTEGER NOT NULL,
    requestor_name  TEXT NOT NULL,
    department      TEXT,
    production_line TEXT,
    station         TEXT,
    status          INTEGER NOT NULL CHECK (status BETWEEN 1 AND 7),
    remarks         TEXT,
    created_by      INTEGER NOT NULL,
    updated_by      INTEGER NOT NULL,
    created_at      TEXT NOT NULL,   -- RFC 3339 UTC
    updated_at      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS request_items (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    item_id         TEXT NOT NULL UNIQUE,
    request_id      TEXT NOT NULL REFERENCES requests(request_id),
    category        TEXT NOT NULL,
    type_of_request TEXT NOT NULL,
    request_mode    TEXT NOT NULL,   -- 'bulk' | 'per_item'
    recipient_id    INTEGER,         -- NULL when unassigned
    location        TEXT NOT NULL,
    quantity        INTEGER NOT NULL CHECK (quantity >= 1),
    purpose         TEXT NOT NULL,
    item_status     INTEGER NOT NULL CHECK (item_status BETWEEN 1 AND 3),
    created_at      TEXT NOT NULL,
    updated_at      TEXT NOT NULL
);

-- At most one issuance per item.
CREATE TABLE IF NOT EXISTS issuances (
    seq             INTEGER PRIMARY KEY AUTOINCREMENT,
    issuance_id     TEXT NOT NULL UNIQUE,
    item_id         TEXT NOT NULL UNIQUE REFERENCES request_items(item_id),
    recipient_id    INTEGER NOT NULL,
    ack_status      TEXT NOT NULL DEFAULT 'pending',   -- 'pending' | 'acknowledged'
    acknowledged_by INTEGER,
    acknowledged_at TEXT,
    issued_by       INTEGER NOT NULL,
    issued_at       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS issuance_assets (
    issuance_id TEXT NOT NULL REFERENCES issuances(issuance_id),
    line_no     INTEGER NOT NULL,
    hostname    TEXT NOT NULL,
    location    TEXT NOT NULL,
    remarks     TEXT,
    PRIMARY KEY (issuance_id, line_no)
);

-- Append-only. No UPDATE or DELETE is ever issued against this table.
CREATE TABLE IF NOT EXISTS audit_log (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    audit_id    TEXT NOT NULL UNIQUE,
    entity_type TEXT NOT NULL,
    entity_id   TEXT NOT NULL,
    action      TEXT NOT NULL,
    actor_id    INTEGER NOT NULL,
    recorded_at TEXT NOT NULL,
    old_values  TEXT,              -- JSON snapshot or NULL
    new_values  TEXT,
    remarks     TEXT
);

CREATE INDEX IF NOT EXISTS requests_year_idx     ON requests(request_year, seq);
CREATE INDEX IF NOT EXISTS requests_status_idx   ON requests(status);
CREATE INDEX IF NOT EXISTS items_request_idx     ON request_items(request_id);
CREATE INDEX IF NOT EXISTS issuances_pending_idx ON issuances(recipient_id, ack_status);
CREATE INDEX IF NOT EXISTS audit_entity_idx      ON audit_log(entity_type, entity_id);

PRAGMA user_version = 1;
";
