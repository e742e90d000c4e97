//! Per-badge mutual exclusion.
//!
//! [`BadgeLocks`] hands out one async mutex per badge, created on first use.
//! An entry is dropped when its last holder releases it and nobody is
//! waiting. Entries left behind by cancelled waiters are swept whenever the
//! table reaches its high-water mark, so memory stays bounded by the number
//! of badges with a request in flight.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use gatekeep_core::BadgeId;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

type Table = HashMap<BadgeId, Arc<AsyncMutex<()>>>;

pub struct BadgeLocks {
  table:      Mutex<Table>,
  high_water: usize,
}

impl BadgeLocks {
  pub fn new(high_water: usize) -> Self {
    Self {
      table:      Mutex::new(HashMap::new()),
      high_water: high_water.max(1),
    }
  }

  /// Wait for exclusive access to `badge`. Requests for other badges are
  /// never blocked beyond the brief table lookup.
  pub async fn acquire(&self, badge: &BadgeId) -> BadgeGuard<'_> {
    let entry = {
      let mut table = self.table();
      if table.len() >= self.high_water {
        sweep(&mut table);
      }
      table
        .entry(badge.clone())
        .or_insert_with(|| Arc::new(AsyncMutex::new(())))
        .clone()
    };

    let guard = entry.lock_owned().await;
    BadgeGuard {
      locks: self,
      badge: badge.clone(),
      guard: Some(guard),
    }
  }

  /// Number of badges currently tracked.
  pub fn len(&self) -> usize { self.table().len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  fn table(&self) -> MutexGuard<'_, Table> {
    self.table.lock().unwrap_or_else(PoisonError::into_inner)
  }

  fn release(&self, badge: &BadgeId) {
    let mut table = self.table();
    // The table's own reference is the only one left: no holder, no waiter.
    if let Some(entry) = table.get(badge)
      && Arc::strong_count(entry) == 1
    {
      table.remove(badge);
    }
  }
}

impl Default for BadgeLocks {
  fn default() -> Self { Self::new(1024) }
}

fn sweep(table: &mut Table) {
  table.retain(|_, entry| Arc::strong_count(entry) > 1);
}

/// Exclusive access to one badge; released on drop.
pub struct BadgeGuard<'a> {
  locks: &'a BadgeLocks,
  badge: BadgeId,
  guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for BadgeGuard<'_> {
  fn drop(&mut self) {
    // Unlock first so the strong count reflects only waiters.
    drop(self.guard.take());
    self.locks.release(&self.badge);
  }
}
