//! The `SubjectStore` trait.
//!
//! Implemented by storage backends (e.g. `gatekeep-store-sqlite`). The
//! session layer depends on this abstraction only, and never relies on the
//! backend's own transaction semantics for correctness: per-badge
//! serialization happens in process.

use std::future::Future;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  BadgeId,
  subject::{GuestRecord, MemberRecord},
};

/// Abstraction over the persistent member and guest collections.
///
/// Lookups return at most one record. If storage holds duplicates for a
/// badge, the backend returns the oldest one.
pub trait SubjectStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  fn find_member_by_badge<'a>(
    &'a self,
    badge: &'a BadgeId,
  ) -> impl Future<Output = Result<Option<MemberRecord>, Self::Error>> + Send + 'a;

  fn find_guest_by_badge<'a>(
    &'a self,
    badge: &'a BadgeId,
  ) -> impl Future<Output = Result<Option<GuestRecord>, Self::Error>> + Send + 'a;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Persist a new guest, present as of `at`.
  fn create_guest<'a>(
    &'a self,
    badge: &'a BadgeId,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<GuestRecord, Self::Error>> + Send + 'a;

  /// Delete a guest record. Returns an error if it does not exist.
  fn delete_guest(
    &self,
    record_id: Uuid,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Flip a member's presence flag and stamp `last_activity`. Returns an
  /// error if the member does not exist.
  fn update_member_presence(
    &self,
    record_id: Uuid,
    is_currently_in: bool,
    at: DateTime<Utc>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
