//! Runtime configuration.
//!
//! Sources are layered lowest to highest: built-in defaults, the optional
//! TOML file, then `GATEKEEP_*` environment variables. Nested keys use a
//! double underscore, e.g. `GATEKEEP_POLICY__REQUEST_TIMEOUT_MS=1500`.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use serde::Deserialize;

use crate::session::GatePolicy;

/// Top-level server configuration, deserialised from `config.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// JSON-lines audit file. Records always go to `tracing` as well.
  #[serde(default)]
  pub audit_log:  Option<PathBuf>,
  #[serde(default)]
  pub policy:     PolicyConfig,
}

/// The `[policy]` table.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
  pub request_timeout_ms:    u64,
  pub lookup_retries:        u32,
  pub mutation_retries:      u32,
  pub retry_backoff_ms:      u64,
  pub lock_table_high_water: usize,
}

impl Default for PolicyConfig {
  fn default() -> Self {
    let policy = GatePolicy::default();
    Self {
      request_timeout_ms:    policy.request_timeout.as_millis() as u64,
      lookup_retries:        policy.lookup_retries,
      mutation_retries:      policy.mutation_retries,
      retry_backoff_ms:      policy.retry_backoff.as_millis() as u64,
      lock_table_high_water: policy.lock_table_high_water,
    }
  }
}

impl PolicyConfig {
  pub fn gate_policy(&self) -> GatePolicy {
    GatePolicy {
      request_timeout:       Duration::from_millis(self.request_timeout_ms),
      lookup_retries:        self.lookup_retries,
      mutation_retries:      self.mutation_retries,
      retry_backoff:         Duration::from_millis(self.retry_backoff_ms),
      lock_table_high_water: self.lock_table_high_water,
    }
  }
}

impl ServerConfig {
  /// Load configuration from `path` (which may be absent) and the
  /// environment.
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("host", "0.0.0.0")?
      .set_default("port", 3484_i64)?
      .set_default("store_path", "gatekeep.db")?
      .add_source(config::File::from(path).required(false))
      .add_source(
        config::Environment::with_prefix("GATEKEEP")
          .prefix_separator("_")
          .separator("__"),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}
