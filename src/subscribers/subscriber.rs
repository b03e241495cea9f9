//! # The [`Subscribe`] trait.
//!
//! Anything that wants to observe service lifecycle or lobby rounds implements
//! [`Subscribe`] and is handed to [`Supervisor::new`](crate::Supervisor::new).
//! The [`SubscriberSet`](crate::SubscriberSet) gives every subscriber its own
//! task and bounded queue; a panic inside `on_event` is reported on the bus as
//! `SubscriberPanicked` and the subscriber keeps receiving events.
//!
//! ## Example
//! ```rust
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use async_trait::async_trait;
//! use lobbyvisor::{Event, EventKind, Subscribe};
//!
//! #[derive(Default)]
//! struct RoundCounter(AtomicUsize);
//!
//! #[async_trait]
//! impl Subscribe for RoundCounter {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::RoundStarted {
//!             self.0.fetch_add(1, Ordering::Relaxed);
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str { "round-counter" }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Observer of supervisor events.
///
/// `on_event` runs on the subscriber's own task, one event at a time, in bus
/// order. A subscriber that cannot keep up loses events (reported as
/// `SubscriberOverflow`); it never slows down services.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Name used when reporting overflow or panics. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Queue length for this subscriber (at least 1). Default 1024.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
