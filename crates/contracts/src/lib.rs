//! # Contracts
//!
//! Frozen interface contracts shared by every crate in the workspace.
//! Business crates depend on this crate only; reverse dependencies are prohibited.
//!
//! ## Read model
//! - Hits are `u64` counters keyed by name
//! - Metrics are `i64` values keyed by `(name, variation)`
//! - Events are opaque payloads keyed by [`EventKey`]
//!
//! A zero or absent answer from a client means "no data", never an
//! authoritative zero.

mod client;
mod config;
mod error;
mod event;

pub use client::TelemetryClient;
pub use config::*;
pub use error::*;
pub use event::{ttl_millis, EventKey, EventPayload, TelemetryEvent};
