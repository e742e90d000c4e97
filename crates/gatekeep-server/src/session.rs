//! The gate session handler.
//!
//! [`GateService::handle`] runs one enter/exit request end to end: take the
//! badge lock, look the badge up, decide, apply the mutation, write the audit
//! record, release. Every path returns a plain open/deny flag; infrastructure
//! faults are absorbed here and always resolve to deny.

use std::{fmt::Display, future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use gatekeep_core::{
  BadgeId, Error,
  audit::{AuditEvent, AuditKind, AuditSink, Reason},
  decision::{Decision, Direction, Lookup, Mutation, decide},
  store::SubjectStore,
};
use tokio::time::{Instant, timeout_at};
use tracing::{debug, error, warn};

use crate::locks::BadgeLocks;

// ─── Policy ──────────────────────────────────────────────────────────────────

/// Timing and retry limits for a single request.
#[derive(Debug, Clone)]
pub struct GatePolicy {
  /// Budget for the badge lock wait and the lookups together.
  pub request_timeout:       Duration,
  /// Extra attempts after a failed lookup.
  pub lookup_retries:        u32,
  /// Extra attempts after a failed mutation.
  pub mutation_retries:      u32,
  /// Back-off before retry `n` is `n * retry_backoff`.
  pub retry_backoff:         Duration,
  pub lock_table_high_water: usize,
}

impl Default for GatePolicy {
  fn default() -> Self {
    Self {
      request_timeout:       Duration::from_secs(2),
      lookup_retries:        2,
      mutation_retries:      2,
      retry_backoff:         Duration::from_millis(50),
      lock_table_high_water: 1024,
    }
  }
}

// ─── Service ─────────────────────────────────────────────────────────────────

pub struct GateService<S, A> {
  store:  Arc<S>,
  audit:  Arc<A>,
  locks:  BadgeLocks,
  policy: GatePolicy,
}

impl<S, A> GateService<S, A>
where
  S: SubjectStore,
  A: AuditSink,
{
  pub fn new(store: Arc<S>, audit: Arc<A>, policy: GatePolicy) -> Self {
    Self {
      store,
      audit,
      locks: BadgeLocks::new(policy.lock_table_high_water),
      policy,
    }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn locks(&self) -> &BadgeLocks { &self.locks }

  /// Decide whether `badge` may pass in `direction`, applying the resulting
  /// state change. Returns `true` only if the gate should open.
  ///
  /// The request deadline covers the badge lock wait and the lookups. Once a
  /// mutation has been issued its result is final: a committed write always
  /// answers open, so the reply never disagrees with the stored presence.
  #[tracing::instrument(skip(self, badge), fields(badge = %badge))]
  pub async fn handle(&self, direction: Direction, badge: &BadgeId) -> bool {
    let deadline = Instant::now() + self.policy.request_timeout;

    let Ok(_guard) = timeout_at(deadline, self.locks.acquire(badge)).await
    else {
      return self.timed_out(direction, badge).await;
    };

    let lookup = match timeout_at(deadline, self.lookup(badge)).await {
      Ok(Ok(lookup)) => lookup,
      Ok(Err(err)) => {
        error!(%err, "denying");
        self
          .emit(&AuditEvent::failure(
            badge.clone(),
            AuditKind::Unknown,
            direction,
            Reason::LookupFailure,
            Utc::now(),
          ))
          .await;
        return false;
      }
      Err(_) => return self.timed_out(direction, badge).await,
    };

    let (open, event) = self.settle(direction, badge, &lookup).await;
    self.emit(&event).await;
    open
  }

  async fn timed_out(&self, direction: Direction, badge: &BadgeId) -> bool {
    let err = Error::Timeout(self.policy.request_timeout);
    error!(%err, "denying");
    self
      .emit(&AuditEvent::failure(
        badge.clone(),
        AuditKind::Unknown,
        direction,
        Reason::Timeout,
        Utc::now(),
      ))
      .await;
    false
  }

  /// Decide and mutate. Must run under the badge lock.
  async fn settle(
    &self,
    direction: Direction,
    badge: &BadgeId,
    lookup: &Lookup,
  ) -> (bool, AuditEvent) {
    if lookup.is_ambiguous() {
      warn!("badge matches both a member and a guest; member takes precedence");
    }

    let Decision { open, mutation, audit } =
      decide(direction, badge, lookup, Utc::now());
    debug!(open, reason = ?audit.reason, kind = ?audit.subject_kind, "decided");

    match self.apply(&mutation).await {
      Ok(()) => (open, audit),
      Err(err) => {
        error!(%err, "denying");
        (false, audit.into_failure(Reason::MutationFailure, Utc::now()))
      }
    }
  }

  async fn lookup(&self, badge: &BadgeId) -> Result<Lookup, Error> {
    let retries = self.policy.lookup_retries;
    let (member, guest) = tokio::try_join!(
      self.retry("find_member_by_badge", retries, || {
        self.store.find_member_by_badge(badge)
      }),
      self.retry("find_guest_by_badge", retries, || {
        self.store.find_guest_by_badge(badge)
      }),
    )
    .map_err(|e| Error::Lookup(Box::new(e)))?;

    Ok(Lookup { member, guest })
  }

  async fn apply(&self, mutation: &Mutation) -> Result<(), Error> {
    let retries = self.policy.mutation_retries;
    let result = match mutation {
      Mutation::None => Ok(()),
      Mutation::SetMemberPresence { record_id, is_currently_in, at } => {
        self
          .retry("update_member_presence", retries, || {
            self.store.update_member_presence(*record_id, *is_currently_in, *at)
          })
          .await
      }
      Mutation::CreateGuest { badge, at } => self
        .retry("create_guest", retries, || self.store.create_guest(badge, *at))
        .await
        .map(|guest| debug!(record_id = %guest.record_id, "guest created")),
      Mutation::DeleteGuest { record_id } => {
        self
          .retry("delete_guest", retries, || self.store.delete_guest(*record_id))
          .await
      }
    };
    result.map_err(|e| Error::Mutation(Box::new(e)))
  }

  /// Run `op`, retrying up to `retries` more times with linear back-off.
  async fn retry<T, E, F, Fut>(
    &self,
    op_name: &'static str,
    retries: u32,
    mut op: F,
  ) -> Result<T, E>
  where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
  {
    let mut attempt = 0;
    loop {
      match op().await {
        Ok(value) => return Ok(value),
        Err(err) if attempt < retries => {
          attempt += 1;
          warn!(%err, op = op_name, attempt, "store call failed; retrying");
          tokio::time::sleep(self.policy.retry_backoff * attempt).await;
        }
        Err(err) => return Err(err),
      }
    }
  }

  async fn emit(&self, event: &AuditEvent) {
    if let Err(err) = self.audit.record(event).await {
      error!(%err, "failed to write audit record");
    }
  }
}
