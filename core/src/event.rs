//! Domain events and the sinks that receive them.
//!
//! Mutating operations describe what happened as a domain event and hand it to
//! an [`EventSink`] supplied by the caller. Nothing is triggered implicitly by
//! persistence: if a caller wants an audit trail, it passes a sink that keeps one.
//!
//! # Example
//!
//! ```
//! use helpdesk_core::event::{DomainEvent, EventSink, FanOutSink, NullSink};
//! use serde::Serialize;
//! use std::sync::Arc;
//!
//! #[derive(Clone, Debug, Serialize)]
//! enum DoorEvent {
//!     Opened { by: String },
//! }
//!
//! impl DomainEvent for DoorEvent {
//!     fn event_type(&self) -> &'static str {
//!         match self {
//!             DoorEvent::Opened { .. } => "DoorOpened.v1",
//!         }
//!     }
//! }
//!
//! let sink = FanOutSink::new(vec![Arc::new(NullSink) as Arc<dyn EventSink<DoorEvent>>]);
//! sink.record(DoorEvent::Opened { by: "ana".into() });
//! ```

use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Error types for event operations.
#[derive(Error, Debug)]
pub enum EventError {
    /// Failed to serialize event to JSON.
    #[error("Failed to serialize event: {0}")]
    SerializationError(String),
}

/// A fact about something that happened to an aggregate.
///
/// `event_type()` returns a stable identifier with a version suffix
/// (`"TicketCreated.v1"`) so stored payloads can evolve.
pub trait DomainEvent: Serialize + Send + Sync + 'static {
    /// Returns the event type identifier for this event.
    fn event_type(&self) -> &'static str;

    /// Serialize this event to a JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`EventError::SerializationError`] if the payload cannot be encoded.
    fn to_json(&self) -> Result<serde_json::Value, EventError> {
        serde_json::to_value(self).map_err(|e| EventError::SerializationError(e.to_string()))
    }
}

/// Receives domain events emitted by mutating operations.
///
/// Sinks must not fail the operation that produced the event: implementations
/// log their own problems and return.
pub trait EventSink<E>: Send + Sync {
    /// Record one event.
    fn record(&self, event: E);
}

/// Sink that drops every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl<E> EventSink<E> for NullSink {
    fn record(&self, _event: E) {}
}

/// Sink that writes every event to the `tracing` log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl<E> EventSink<E> for TracingSink
where
    E: DomainEvent + fmt::Debug,
{
    fn record(&self, event: E) {
        tracing::info!(event_type = event.event_type(), ?event, "Domain event");
    }
}

/// Sink that forwards a copy of every event to each inner sink, in order.
pub struct FanOutSink<E> {
    sinks: Vec<Arc<dyn EventSink<E>>>,
}

impl<E> FanOutSink<E> {
    /// Create a fan-out over the given sinks
    #[must_use]
    pub fn new(sinks: Vec<Arc<dyn EventSink<E>>>) -> Self {
        Self { sinks }
    }

    /// Number of inner sinks
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether there are no inner sinks
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl<E> EventSink<E> for FanOutSink<E>
where
    E: Clone + Send + Sync,
{
    fn record(&self, event: E) {
        for sink in &self.sinks {
            sink.record(event.clone());
        }
    }
}

impl<E> fmt::Debug for FanOutSink<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FanOutSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Clone, Debug, Serialize, PartialEq)]
    enum TestEvent {
        Happened { n: u32 },
    }

    impl DomainEvent for TestEvent {
        fn event_type(&self) -> &'static str {
            "Happened.v1"
        }
    }

    #[derive(Default)]
    struct Collect(Mutex<Vec<TestEvent>>);

    impl EventSink<TestEvent> for Collect {
        fn record(&self, event: TestEvent) {
            if let Ok(mut events) = self.0.lock() {
                events.push(event);
            }
        }
    }

    #[test]
    fn test_event_to_json() {
        let json = TestEvent::Happened { n: 3 }.to_json().unwrap();
        assert_eq!(json["Happened"]["n"], 3);
    }

    #[test]
    fn test_fan_out_delivers_to_every_sink() {
        let a = Arc::new(Collect::default());
        let b = Arc::new(Collect::default());
        let fan = FanOutSink::new(vec![
            a.clone() as Arc<dyn EventSink<TestEvent>>,
            b.clone() as Arc<dyn EventSink<TestEvent>>,
        ]);

        fan.record(TestEvent::Happened { n: 1 });
        fan.record(TestEvent::Happened { n: 2 });

        assert_eq!(fan.len(), 2);
        assert_eq!(a.0.lock().unwrap().len(), 2);
        assert_eq!(b.0.lock().unwrap()[1], TestEvent::Happened { n: 2 });
    }
}
