//! Test doubles shared by the session and transport tests.

use std::{
  sync::{
    Mutex,
    atomic::{AtomicU32, Ordering},
  },
  time::Duration,
};

use chrono::{DateTime, Utc};
use gatekeep_core::{
  BadgeId,
  audit::{AuditEvent, AuditSink},
  store::SubjectStore,
  subject::{GuestRecord, MemberRecord},
};
use gatekeep_store_sqlite::SqliteStore;
use uuid::Uuid;

pub fn badge(s: &str) -> BadgeId { BadgeId::new(s).unwrap() }

// ─── Audit ───────────────────────────────────────────────────────────────────

/// Collects audit records in memory.
#[derive(Default)]
pub struct MemorySink {
  events: Mutex<Vec<AuditEvent>>,
}

impl MemorySink {
  pub fn events(&self) -> Vec<AuditEvent> { self.events.lock().unwrap().clone() }

  pub fn last(&self) -> Option<AuditEvent> {
    self.events.lock().unwrap().last().cloned()
  }
}

impl AuditSink for MemorySink {
  type Error = std::convert::Infallible;

  async fn record<'a>(&'a self, event: &'a AuditEvent) -> Result<(), Self::Error> {
    self.events.lock().unwrap().push(event.clone());
    Ok(())
  }
}

// ─── Stores ──────────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum TestStoreError {
  #[error("injected failure")]
  Injected,
  #[error(transparent)]
  Sqlite(#[from] gatekeep_store_sqlite::Error),
}

/// Consume one unit of `budget`, reporting whether a failure is due.
fn take(budget: &AtomicU32) -> bool {
  budget
    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
    .is_ok()
}

/// An in-memory store that fails the next N lookups and/or mutations.
pub struct FlakyStore {
  inner:             SqliteStore,
  lookup_failures:   AtomicU32,
  mutation_failures: AtomicU32,
}

impl FlakyStore {
  pub async fn new() -> Self {
    Self {
      inner:             SqliteStore::open_in_memory().await.unwrap(),
      lookup_failures:   AtomicU32::new(0),
      mutation_failures: AtomicU32::new(0),
    }
  }

  pub fn inner(&self) -> &SqliteStore { &self.inner }

  pub fn fail_lookups(&self, n: u32) {
    self.lookup_failures.store(n, Ordering::SeqCst);
  }

  pub fn fail_mutations(&self, n: u32) {
    self.mutation_failures.store(n, Ordering::SeqCst);
  }

  fn check_lookup(&self) -> Result<(), TestStoreError> {
    if take(&self.lookup_failures) {
      Err(TestStoreError::Injected)
    } else {
      Ok(())
    }
  }

  fn check_mutation(&self) -> Result<(), TestStoreError> {
    if take(&self.mutation_failures) {
      Err(TestStoreError::Injected)
    } else {
      Ok(())
    }
  }
}

impl SubjectStore for FlakyStore {
  type Error = TestStoreError;

  async fn find_member_by_badge<'a>(
    &'a self,
    badge: &'a BadgeId,
  ) -> Result<Option<MemberRecord>, TestStoreError> {
    self.check_lookup()?;
    Ok(self.inner.find_member_by_badge(badge).await?)
  }

  async fn find_guest_by_badge<'a>(
    &'a self,
    badge: &'a BadgeId,
  ) -> Result<Option<GuestRecord>, TestStoreError> {
    self.check_lookup()?;
    Ok(self.inner.find_guest_by_badge(badge).await?)
  }

  async fn create_guest<'a>(
    &'a self,
    badge: &'a BadgeId,
    at: DateTime<Utc>,
  ) -> Result<GuestRecord, TestStoreError> {
    self.check_mutation()?;
    Ok(self.inner.create_guest(badge, at).await?)
  }

  async fn delete_guest(&self, record_id: Uuid) -> Result<(), TestStoreError> {
    self.check_mutation()?;
    Ok(self.inner.delete_guest(record_id).await?)
  }

  async fn update_member_presence(
    &self,
    record_id: Uuid,
    is_currently_in: bool,
    at: DateTime<Utc>,
  ) -> Result<(), TestStoreError> {
    self.check_mutation()?;
    Ok(self.inner.update_member_presence(record_id, is_currently_in, at).await?)
  }
}

/// An in-memory store whose lookups stall for a fixed delay.
pub struct SlowStore {
  inner: SqliteStore,
  delay: Duration,
}

impl SlowStore {
  pub async fn new(delay: Duration) -> Self {
    Self {
      inner: SqliteStore::open_in_memory().await.unwrap(),
      delay,
    }
  }
}

impl SubjectStore for SlowStore {
  type Error = gatekeep_store_sqlite::Error;

  async fn find_member_by_badge<'a>(
    &'a self,
    badge: &'a BadgeId,
  ) -> Result<Option<MemberRecord>, Self::Error> {
    tokio::time::sleep(self.delay).await;
    self.inner.find_member_by_badge(badge).await
  }

  async fn find_guest_by_badge<'a>(
    &'a self,
    badge: &'a BadgeId,
  ) -> Result<Option<GuestRecord>, Self::Error> {
    tokio::time::sleep(self.delay).await;
    self.inner.find_guest_by_badge(badge).await
  }

  async fn create_guest<'a>(
    &'a self,
    badge: &'a BadgeId,
    at: DateTime<Utc>,
  ) -> Result<GuestRecord, Self::Error> {
    self.inner.create_guest(badge, at).await
  }

  async fn delete_guest(&self, record_id: Uuid) -> Result<(), Self::Error> {
    self.inner.delete_guest(record_id).await
  }

  async fn update_member_presence(
    &self,
    record_id: Uuid,
    is_currently_in: bool,
    at: DateTime<Utc>,
  ) -> Result<(), Self::Error> {
    self.inner.update_member_presence(record_id, is_currently_in, at).await
  }
}

/// An in-memory store whose writes commit at once but acknowledge late.
pub struct LateAckStore {
  inner: SqliteStore,
  delay: Duration,
}

impl LateAckStore {
  pub async fn new(delay: Duration) -> Self {
    Self {
      inner: SqliteStore::open_in_memory().await.unwrap(),
      delay,
    }
  }

  pub fn inner(&self) -> &SqliteStore { &self.inner }
}

impl SubjectStore for LateAckStore {
  type Error = gatekeep_store_sqlite::Error;

  async fn find_member_by_badge<'a>(
    &'a self,
    badge: &'a BadgeId,
  ) -> Result<Option<MemberRecord>, Self::Error> {
    self.inner.find_member_by_badge(badge).await
  }

  async fn find_guest_by_badge<'a>(
    &'a self,
    badge: &'a BadgeId,
  ) -> Result<Option<GuestRecord>, Self::Error> {
    self.inner.find_guest_by_badge(badge).await
  }

  async fn create_guest<'a>(
    &'a self,
    badge: &'a BadgeId,
    at: DateTime<Utc>,
  ) -> Result<GuestRecord, Self::Error> {
    let guest = self.inner.create_guest(badge, at).await?;
    tokio::time::sleep(self.delay).await;
    Ok(guest)
  }

  async fn delete_guest(&self, record_id: Uuid) -> Result<(), Self::Error> {
    self.inner.delete_guest(record_id).await?;
    tokio::time::sleep(self.delay).await;
    Ok(())
  }

  async fn update_member_presence(
    &self,
    record_id: Uuid,
    is_currently_in: bool,
    at: DateTime<Utc>,
  ) -> Result<(), Self::Error> {
    self
      .inner
      .update_member_presence(record_id, is_currently_in, at)
      .await?;
    tokio::time::sleep(self.delay).await;
    Ok(())
  }
}
