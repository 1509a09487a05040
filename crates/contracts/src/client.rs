//! TelemetryClient trait - Dispatcher backend interface
//!
//! Defines the capability set every telemetry backend exposes.

use std::time::Duration;

use crate::{EventKey, EventPayload, Result};

/// Telemetry backend trait
///
/// All backend implementations must implement this trait. Methods take
/// `&self`; implementations own their interior synchronisation so a single
/// instance can be shared across threads behind an `Arc`.
///
/// Reads use the type's default (`0`, `None`) to mean "no data here". A
/// write-only backend answers every read with that default.
pub trait TelemetryClient: Send + Sync {
    /// Client name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Concrete type name of the implementation
    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Increment the hit counter `name`
    fn track_hit(&self, name: &str) -> Result<()>;

    /// Read the hit counter `name`
    fn get_hit(&self, name: &str) -> Result<u64>;

    /// Remove the hit counter `name`
    fn remove_hit(&self, name: &str) -> Result<()>;

    /// Increment the metric `(name, variation)`
    fn track_metric(&self, name: &str, variation: &str) -> Result<()>;

    /// Read the metric `(name, variation)`
    fn get_metric(&self, name: &str, variation: &str) -> Result<i64>;

    /// Remove the metric `(name, variation)`
    fn remove_metric(&self, name: &str, variation: &str) -> Result<()>;

    /// Store an event without expiry
    fn track_event(&self, key: &EventKey, payload: EventPayload) -> Result<()>;

    /// Store an event that expires after `ttl`
    ///
    /// How `ttl` is applied (absolute, sliding) is up to the backend.
    fn track_event_with_ttl(&self, key: &EventKey, payload: EventPayload, ttl: Duration)
        -> Result<()>;

    /// Retrieve a stored event
    fn get_event(&self, key: &EventKey) -> Result<Option<EventPayload>>;

    /// Record an occurrence of the exception type `exception_type`
    fn track_exception(&self, exception_type: &str) -> Result<()>;

    /// Record that `interface_type` was resolved `resolved_times` times
    fn track_dependency(&self, interface_type: &str, resolved_times: u64) -> Result<()>;
}
