//! SQL schema for the Gatekeep SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- Provisioned out of band. Rows are updated in place, never deleted here.
CREATE TABLE IF NOT EXISTS members (
    record_id       TEXT PRIMARY KEY,
    badge_id        TEXT NOT NULL,   -- not UNIQUE; lookups take the oldest row
    display_name    TEXT,
    is_currently_in INTEGER NOT NULL DEFAULT 0,
    last_activity   TEXT,            -- RFC 3339 UTC; NULL until first traversal
    created_at      TEXT NOT NULL
);

-- A row exists only while the guest is inside.
CREATE TABLE IF NOT EXISTS guests (
    record_id       TEXT PRIMARY KEY,
    badge_id        TEXT NOT NULL,
    is_currently_in INTEGER NOT NULL DEFAULT 1 CHECK (is_currently_in = 1),
    last_activity   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS members_badge_idx ON members(badge_id);
CREATE INDEX IF NOT EXISTS guests_badge_idx  ON guests(badge_id);

PRAGMA user_version = 1;
";
