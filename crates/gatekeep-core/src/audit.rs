//! Audit records — one per gate decision — and the [`AuditSink`] trait.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{BadgeId, decision::Direction, subject::SubjectKind};

// ─── Record fields ───────────────────────────────────────────────────────────

/// The kind of subject a decision concerned, as far as it could be
/// determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditKind {
  Member,
  Guest,
  /// No record matched, or the lookup never completed.
  Unknown,
}

impl From<SubjectKind> for AuditKind {
  fn from(kind: SubjectKind) -> Self {
    match kind {
      SubjectKind::Member => Self::Member,
      SubjectKind::Guest => Self::Guest,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
  Succeed,
  Failed,
}

/// Why a decision came out the way it did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Reason {
  Granted,
  AlreadyInside,
  AlreadyOutside,
  UnknownBadge,
  LookupFailure,
  MutationFailure,
  Timeout,
}

impl Reason {
  /// Reasons produced by an infrastructure fault rather than by the
  /// presence rules.
  pub fn is_error(self) -> bool {
    matches!(
      self,
      Self::LookupFailure | Self::MutationFailure | Self::Timeout
    )
  }
}

// ─── AuditEvent ──────────────────────────────────────────────────────────────

/// A single append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEvent {
  pub badge_id:          BadgeId,
  pub subject_kind:      AuditKind,
  pub direction:         Direction,
  pub outcome:           Outcome,
  pub reason:            Reason,
  /// Set when the badge matched both a member and a guest record.
  #[serde(default)]
  pub integrity_warning: bool,
  pub timestamp:         DateTime<Utc>,
}

impl AuditEvent {
  /// A failed decision caused by an infrastructure fault.
  pub fn failure(
    badge_id: BadgeId,
    subject_kind: AuditKind,
    direction: Direction,
    reason: Reason,
    timestamp: DateTime<Utc>,
  ) -> Self {
    Self {
      badge_id,
      subject_kind,
      direction,
      outcome: Outcome::Failed,
      reason,
      integrity_warning: false,
      timestamp,
    }
  }

  /// Downgrade this record to a failure, keeping what was already known
  /// about the subject.
  pub fn into_failure(self, reason: Reason, timestamp: DateTime<Utc>) -> Self {
    Self {
      outcome: Outcome::Failed,
      reason,
      timestamp,
      ..self
    }
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Append-only destination for [`AuditEvent`]s.
pub trait AuditSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn record<'a>(
    &'a self,
    event: &'a AuditEvent,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
