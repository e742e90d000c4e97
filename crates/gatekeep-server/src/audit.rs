//! [`AuditLog`] — the production [`AuditSink`].
//!
//! Every record is emitted as a structured `tracing` event on the
//! `gatekeep::audit` target. If an audit file is configured, the record is
//! also appended to it as a single JSON line.

use std::path::Path;

use gatekeep_core::audit::{AuditEvent, AuditSink, Outcome};
use tokio::{
  fs::{File, OpenOptions},
  io::AsyncWriteExt as _,
  sync::Mutex,
};

use crate::{Error, Result};

pub struct AuditLog {
  file: Option<Mutex<File>>,
}

impl AuditLog {
  /// Log records through `tracing` only.
  pub fn tracing_only() -> Self { Self { file: None } }

  /// Append records to the JSON-lines file at `path`, creating it if needed.
  pub async fn with_file(path: impl AsRef<Path>) -> Result<Self> {
    let file = OpenOptions::new()
      .create(true)
      .append(true)
      .open(path)
      .await?;
    Ok(Self { file: Some(Mutex::new(file)) })
  }
}

impl AuditSink for AuditLog {
  type Error = Error;

  async fn record<'a>(&'a self, event: &'a AuditEvent) -> Result<()> {
    if event.outcome == Outcome::Succeed {
      tracing::info!(
        target: "gatekeep::audit",
        badge = %event.badge_id,
        kind = ?event.subject_kind,
        direction = ?event.direction,
        reason = ?event.reason,
        integrity_warning = event.integrity_warning,
        "gate opened"
      );
    } else if event.reason.is_error() {
      tracing::error!(
        target: "gatekeep::audit",
        badge = %event.badge_id,
        kind = ?event.subject_kind,
        direction = ?event.direction,
        reason = ?event.reason,
        "gate held closed after failure"
      );
    } else {
      tracing::info!(
        target: "gatekeep::audit",
        badge = %event.badge_id,
        kind = ?event.subject_kind,
        direction = ?event.direction,
        reason = ?event.reason,
        integrity_warning = event.integrity_warning,
        "gate denied"
      );
    }

    if let Some(file) = &self.file {
      let mut line = serde_json::to_vec(event)?;
      line.push(b'\n');
      let mut file = file.lock().await;
      file.write_all(&line).await?;
      file.flush().await?;
    }
    Ok(())
  }
}
