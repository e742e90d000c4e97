//! Core types and trait definitions for the Gatekeep access-control service.
//!
//! This crate is deliberately free of network and database dependencies. The
//! decision engine in [`decision`] is a pure function over a lookup snapshot;
//! storage and audit backends plug in through the [`store::SubjectStore`] and
//! [`audit::AuditSink`] traits.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod audit;
pub mod badge;
pub mod decision;
pub mod error;
pub mod store;
pub mod subject;

pub use badge::BadgeId;
pub use error::{BoxError, Error, Result};
