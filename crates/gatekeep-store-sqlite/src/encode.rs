//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings and booleans as `0`/`1` integers.

use chrono::{DateTime, Utc};
use gatekeep_core::{
  BadgeId,
  subject::{GuestRecord, MemberRecord},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Raw rows ─────────────────────────────────────────────────────────────────

/// A `members` row as read from SQLite, before validation.
pub struct RawMember {
  pub record_id:       String,
  pub badge_id:        String,
  pub display_name:    Option<String>,
  pub is_currently_in: bool,
  pub last_activity:   Option<String>,
}

impl RawMember {
  pub const COLUMNS: &'static str =
    "record_id, badge_id, display_name, is_currently_in, last_activity";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:       row.get(0)?,
      badge_id:        row.get(1)?,
      display_name:    row.get(2)?,
      is_currently_in: row.get(3)?,
      last_activity:   row.get(4)?,
    })
  }

  pub fn into_record(self) -> Result<MemberRecord> {
    Ok(MemberRecord {
      record_id:       decode_uuid(&self.record_id)?,
      badge_id:        BadgeId::new(&self.badge_id)?,
      display_name:    self.display_name,
      is_currently_in: self.is_currently_in,
      last_activity:   self.last_activity.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// A `guests` row as read from SQLite, before validation.
pub struct RawGuest {
  pub record_id:     String,
  pub badge_id:      String,
  pub last_activity: String,
}

impl RawGuest {
  pub const COLUMNS: &'static str = "record_id, badge_id, last_activity";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      record_id:     row.get(0)?,
      badge_id:      row.get(1)?,
      last_activity: row.get(2)?,
    })
  }

  pub fn into_record(self) -> Result<GuestRecord> {
    Ok(GuestRecord {
      record_id:     decode_uuid(&self.record_id)?,
      badge_id:      BadgeId::new(&self.badge_id)?,
      last_activity: decode_dt(&self.last_activity)?,
    })
  }
}
