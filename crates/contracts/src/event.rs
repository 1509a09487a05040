//! Event model
//!
//! Events are typed on the caller side and opaque everywhere else: clients
//! store the payload as `Arc<dyn Any>` under an [`EventKey`] and the
//! dispatcher downcasts it back to the event's payload type on read.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Opaque event payload as seen by clients
pub type EventPayload = Arc<dyn Any + Send + Sync>;

/// Identity of a stored event: the event's Rust type plus its name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    /// Fully qualified type name of the event
    pub type_name: &'static str,
    /// Event name
    pub name: String,
}

impl EventKey {
    /// Build the key for event type `E` with the given name
    pub fn of<E: ?Sized + 'static>(name: impl Into<String>) -> Self {
        Self {
            type_name: std::any::type_name::<E>(),
            name: name.into(),
        }
    }
}

impl fmt::Display for EventKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.type_name, self.name)
    }
}

/// A named, typed telemetry event
///
/// # Example
///
/// ```
/// use contracts::{EventKey, TelemetryEvent};
///
/// struct Deployed {
///     version: String,
/// }
///
/// impl TelemetryEvent for Deployed {
///     type Payload = String;
///
///     fn name(&self) -> &str {
///         "deployed"
///     }
///
///     fn payload(&self) -> String {
///         self.version.clone()
///     }
/// }
///
/// let event = Deployed { version: "1.2.0".into() };
/// assert_eq!(event.key(), EventKey::of::<Deployed>("deployed"));
/// ```
pub trait TelemetryEvent: Send + Sync + 'static {
    /// Payload type stored by clients and returned on read
    type Payload: Clone + Send + Sync + 'static;

    /// Event name
    fn name(&self) -> &str;

    /// Payload to store
    fn payload(&self) -> Self::Payload;

    /// Storage key
    fn key(&self) -> EventKey
    where
        Self: Sized,
    {
        EventKey::of::<Self>(self.name())
    }

    /// Payload boxed for transport through clients
    fn erased_payload(&self) -> EventPayload {
        Arc::new(self.payload())
    }
}

/// TTL in whole milliseconds, saturating at `u64::MAX`
pub fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX)
}
