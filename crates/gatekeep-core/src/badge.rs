//! [`BadgeId`] — the identifier read from an RFID tag.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// An opaque, non-empty badge identifier.
///
/// Readers report badges either as strings or as bare integers; both
/// deserialise into the same textual form, so `"1234"` and `1234` name the
/// same badge.
#[derive(
  Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "RawBadge", into = "String")]
pub struct BadgeId(String);

impl BadgeId {
  /// Validate and wrap `raw`. Surrounding whitespace is trimmed.
  pub fn new(raw: impl AsRef<str>) -> Result<Self> {
    let trimmed = raw.as_ref().trim();
    if trimmed.is_empty() {
      return Err(Error::InvalidBadge(raw.as_ref().to_owned()));
    }
    Ok(Self(trimmed.to_owned()))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for BadgeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl FromStr for BadgeId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> { Self::new(s) }
}

impl From<BadgeId> for String {
  fn from(id: BadgeId) -> Self { id.0 }
}

/// Wire shapes accepted for a badge.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawBadge {
  Text(String),
  Number(u64),
}

impl TryFrom<RawBadge> for BadgeId {
  type Error = Error;

  fn try_from(raw: RawBadge) -> Result<Self> {
    match raw {
      RawBadge::Text(s) => Self::new(s),
      RawBadge::Number(n) => Self::new(n.to_string()),
    }
  }
}
