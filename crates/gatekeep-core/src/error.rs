//! Error types for `gatekeep-core`.

use std::time::Duration;

use thiserror::Error;

/// A boxed backend error, as carried by [`Error::Lookup`] and
/// [`Error::Mutation`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid badge identifier: {0:?}")]
  InvalidBadge(String),

  /// A subject store query failed.
  #[error("subject lookup failed: {0}")]
  Lookup(#[source] BoxError),

  /// A state-changing write failed after the engine decided to open.
  #[error("presence mutation failed: {0}")]
  Mutation(#[source] BoxError),

  #[error("request exceeded its {0:?} budget")]
  Timeout(Duration),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
