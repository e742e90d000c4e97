//! The presence decision engine.
//!
//! [`decide`] is a pure function: it takes a snapshot of what the store knows
//! about a badge and returns whether to open, the state change to apply, and
//! the audit record to emit. Nothing here touches storage, the clock, or the
//! network.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  BadgeId,
  audit::{AuditEvent, AuditKind, Outcome, Reason},
  subject::{GuestRecord, MemberRecord},
};

/// Which way the subject is trying to pass the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
  Enter,
  Exit,
}

/// The result of the two badge queries the engine needs.
#[derive(Debug, Clone, Default)]
pub struct Lookup {
  pub member: Option<MemberRecord>,
  pub guest:  Option<GuestRecord>,
}

impl Lookup {
  /// A badge present in both collections. Members take precedence.
  pub fn is_ambiguous(&self) -> bool {
    self.member.is_some() && self.guest.is_some()
  }
}

/// A state change the caller must apply before reporting the gate open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
  None,
  SetMemberPresence {
    record_id:       Uuid,
    is_currently_in: bool,
    at:              DateTime<Utc>,
  },
  CreateGuest {
    badge: BadgeId,
    at:    DateTime<Utc>,
  },
  DeleteGuest {
    record_id: Uuid,
  },
}

#[derive(Debug, Clone)]
pub struct Decision {
  pub open:     bool,
  pub mutation: Mutation,
  pub audit:    AuditEvent,
}

/// Decide whether `badge` may pass in `direction`.
///
/// | direction | member           | guest | result                 |
/// |-----------|------------------|-------|------------------------|
/// | enter     | out              | any   | open, member → in      |
/// | enter     | in               | any   | deny                   |
/// | enter     | none             | none  | open, create guest     |
/// | enter     | none             | some  | deny                   |
/// | exit      | in               | any   | open, member → out     |
/// | exit      | out              | any   | deny                   |
/// | exit      | none             | some  | open, delete guest     |
/// | exit      | none             | none  | deny (unknown badge)   |
pub fn decide(
  direction: Direction,
  badge: &BadgeId,
  lookup: &Lookup,
  now: DateTime<Utc>,
) -> Decision {
  use Direction::{Enter, Exit};

  let (open, mutation, subject_kind, reason) =
    match (direction, &lookup.member, &lookup.guest) {
      (Enter, Some(m), _) if m.is_currently_in => {
        (false, Mutation::None, AuditKind::Member, Reason::AlreadyInside)
      }
      (Enter, Some(m), _) => (
        true,
        Mutation::SetMemberPresence {
          record_id:       m.record_id,
          is_currently_in: true,
          at:              now,
        },
        AuditKind::Member,
        Reason::Granted,
      ),
      (Enter, None, Some(_)) => {
        (false, Mutation::None, AuditKind::Guest, Reason::AlreadyInside)
      }
      (Enter, None, None) => (
        true,
        Mutation::CreateGuest { badge: badge.clone(), at: now },
        AuditKind::Guest,
        Reason::Granted,
      ),
      (Exit, Some(m), _) if m.is_currently_in => (
        true,
        Mutation::SetMemberPresence {
          record_id:       m.record_id,
          is_currently_in: false,
          at:              now,
        },
        AuditKind::Member,
        Reason::Granted,
      ),
      (Exit, Some(_), _) => {
        (false, Mutation::None, AuditKind::Member, Reason::AlreadyOutside)
      }
      (Exit, None, Some(g)) => (
        true,
        Mutation::DeleteGuest { record_id: g.record_id },
        AuditKind::Guest,
        Reason::Granted,
      ),
      (Exit, None, None) => {
        (false, Mutation::None, AuditKind::Unknown, Reason::UnknownBadge)
      }
    };

  Decision {
    open,
    mutation,
    audit: AuditEvent {
      badge_id: badge.clone(),
      subject_kind,
      direction,
      outcome: if open { Outcome::Succeed } else { Outcome::Failed },
      reason,
      integrity_warning: lookup.is_ambiguous(),
      timestamp: now,
    },
  }
}
