//! # Runtime events emitted by the supervisor and its workers.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Lifecycle events**: service start, init, exit
//! - **Control events**: stop requests and shutdown
//! - **Lobby events**: round starts
//! - **Subscriber events**: overflow and panic reports
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use lobbyvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ServiceFailed)
//!     .with_service("lobby")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::ServiceFailed);
//! assert_eq!(ev.service.as_deref(), Some("lobby"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets `service` (subscriber name) and `reason` (panic message).
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets `service` (subscriber name) and `reason`.
    SubscriberOverflow,

    // === Service lifecycle ===
    /// Service registered and its worker spawned.
    ServiceStarting,

    /// `init` finished; subscriptions and connections exist.
    ServiceInitDone,

    /// `init` failed; the service never ran.
    ///
    /// Sets `reason`.
    ServiceInitFailed,

    /// `run` returned successfully on its own.
    ServiceCompleted,

    /// `run` unwound because of a stop request.
    ServiceStopped,

    /// `run` returned an error.
    ///
    /// Sets `reason`.
    ServiceFailed,

    /// `run` panicked.
    ///
    /// Sets `reason` (panic message).
    ServicePanicked,

    /// Worker ran `cleanup` and left the registry.
    ServiceRemoved,

    // === Control ===
    /// `stop()` was requested for a service.
    StopRequested,

    /// Shutdown requested (OS signal or explicit host stop).
    ShutdownRequested,

    /// All services exited within the grace period.
    AllStoppedWithin,

    /// Grace period exceeded; some services did not exit in time.
    ///
    /// Sets `delay_ms` (grace).
    GraceExceeded,

    // === Lobby ===
    /// The lobby decided to start a round.
    ///
    /// Sets `service` and `reason` (comma-joined roster).
    RoundStarted,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Name of the service, if applicable.
    pub service: Option<Arc<str>>,
    /// Human-readable reason (errors, roster, overflow details).
    pub reason: Option<Arc<str>>,
    /// A duration attached to the event, in milliseconds.
    pub delay_ms: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            service: None,
            reason: None,
            delay_ms: None,
        }
    }

    /// Attaches a service name.
    #[inline]
    pub fn with_service(mut self, service: impl Into<Arc<str>>) -> Self {
        self.service = Some(service.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a duration (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_service(subscriber)
            .with_reason(reason)
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_service(subscriber)
            .with_reason(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::ServiceStarting);
        let b = Event::new(EventKind::ServiceStarting);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_is_saturated() {
        let ev = Event::new(EventKind::GraceExceeded).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }
}
