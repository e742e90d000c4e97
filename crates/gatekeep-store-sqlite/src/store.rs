//! [`SqliteStore`] — the SQLite implementation of [`SubjectStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use gatekeep_core::{
  BadgeId,
  store::SubjectStore,
  subject::{GuestRecord, MemberRecord},
};

use crate::{
  Error, Result,
  encode::{RawGuest, RawMember, encode_dt, encode_uuid},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Gatekeep subject store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Seeding and inspection ────────────────────────────────────────────────

  /// Insert a member who is currently outside.
  ///
  /// Members are normally provisioned by an external system; this exists for
  /// seeding and tests.
  pub async fn add_member(
    &self,
    badge: &BadgeId,
    display_name: Option<String>,
  ) -> Result<MemberRecord> {
    let member = MemberRecord {
      record_id:       Uuid::new_v4(),
      badge_id:        badge.clone(),
      display_name,
      is_currently_in: false,
      last_activity:   None,
    };

    let id_str    = encode_uuid(member.record_id);
    let badge_str = badge.as_str().to_owned();
    let name      = member.display_name.clone();
    let at_str    = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO members (record_id, badge_id, display_name, is_currently_in, created_at)
           VALUES (?1, ?2, ?3, 0, ?4)",
          rusqlite::params![id_str, badge_str, name, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(member)
  }

  pub async fn get_member(&self, record_id: Uuid) -> Result<Option<MemberRecord>> {
    let id_str = encode_uuid(record_id);

    let raw: Option<RawMember> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM members WHERE record_id = ?1",
          RawMember::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![id_str], RawMember::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMember::into_record).transpose()
  }

  pub async fn list_members(&self) -> Result<Vec<MemberRecord>> {
    let raws: Vec<RawMember> = self
      .conn
      .call(|conn| {
        let sql =
          format!("SELECT {} FROM members ORDER BY rowid", RawMember::COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawMember::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawMember::into_record).collect()
  }

  /// All guests currently inside, oldest admission first.
  pub async fn list_guests(&self) -> Result<Vec<GuestRecord>> {
    let raws: Vec<RawGuest> = self
      .conn
      .call(|conn| {
        let sql =
          format!("SELECT {} FROM guests ORDER BY rowid", RawGuest::COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map([], RawGuest::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGuest::into_record).collect()
  }
}

// ─── SubjectStore impl ───────────────────────────────────────────────────────

impl SubjectStore for SqliteStore {
  type Error = Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn find_member_by_badge<'a>(
    &'a self,
    badge: &'a BadgeId,
  ) -> Result<Option<MemberRecord>> {
    let badge_str = badge.as_str().to_owned();

    let raw: Option<RawMember> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM members WHERE badge_id = ?1 ORDER BY rowid LIMIT 1",
          RawMember::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![badge_str], RawMember::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawMember::into_record).transpose()
  }

  async fn find_guest_by_badge<'a>(
    &'a self,
    badge: &'a BadgeId,
  ) -> Result<Option<GuestRecord>> {
    let badge_str = badge.as_str().to_owned();

    let raw: Option<RawGuest> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {} FROM guests WHERE badge_id = ?1 ORDER BY rowid LIMIT 1",
          RawGuest::COLUMNS
        );
        Ok(
          conn
            .query_row(&sql, rusqlite::params![badge_str], RawGuest::from_row)
            .optional()?,
        )
      })
      .await?;

    raw.map(RawGuest::into_record).transpose()
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn create_guest<'a>(
    &'a self,
    badge: &'a BadgeId,
    at: DateTime<Utc>,
  ) -> Result<GuestRecord> {
    let guest = GuestRecord {
      record_id:     Uuid::new_v4(),
      badge_id:      badge.clone(),
      last_activity: at,
    };

    let id_str    = encode_uuid(guest.record_id);
    let badge_str = badge.as_str().to_owned();
    let at_str    = encode_dt(at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO guests (record_id, badge_id, is_currently_in, last_activity)
           VALUES (?1, ?2, 1, ?3)",
          rusqlite::params![id_str, badge_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(guest)
  }

  async fn delete_guest(&self, record_id: Uuid) -> Result<()> {
    let id_str = encode_uuid(record_id);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM guests WHERE record_id = ?1",
          rusqlite::params![id_str],
        )?)
      })
      .await?;

    if deleted == 0 {
      return Err(Error::GuestNotFound(record_id));
    }
    Ok(())
  }

  async fn update_member_presence(
    &self,
    record_id: Uuid,
    is_currently_in: bool,
    at: DateTime<Utc>,
  ) -> Result<()> {
    let id_str = encode_uuid(record_id);
    let at_str = encode_dt(at);

    let updated = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE members SET is_currently_in = ?2, last_activity = ?3
           WHERE record_id = ?1",
          rusqlite::params![id_str, is_currently_in, at_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Err(Error::MemberNotFound(record_id));
    }
    Ok(())
  }
}
