//! Subjects — the entities whose presence is tracked at the gate.
//!
//! Members are provisioned out of band and live indefinitely. Guests are
//! created by this system on an unmatched entry and deleted on exit; a guest
//! record's existence is what "inside" means for a guest.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::BadgeId;

/// The two kinds of stored subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
  Member,
  Guest,
}

/// A pre-provisioned, long-lived subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberRecord {
  pub record_id:       Uuid,
  pub badge_id:        BadgeId,
  pub display_name:    Option<String>,
  /// Direction of the last successful traversal: `true` after enter.
  pub is_currently_in: bool,
  /// `None` until the member first passes the gate.
  pub last_activity:   Option<DateTime<Utc>>,
}

/// An ad-hoc subject admitted without a member match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestRecord {
  pub record_id:     Uuid,
  pub badge_id:      BadgeId,
  /// Time of admission. Guests are never updated in place.
  pub last_activity: DateTime<Utc>,
}

impl GuestRecord {
  /// Always `true`: a guest who leaves is deleted, not flipped.
  pub fn is_currently_in(&self) -> bool { true }
}
