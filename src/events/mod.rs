//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to lifecycle events emitted by the supervisor and the
//! workers it spawns.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Supervisor` (start/stop/shutdown), worker bodies (init, exit),
//!   `ServiceContext::publish` (service-defined events such as a round start),
//!   `SubscriberSet` workers (overflow/panic).
//! - **Consumers**: the supervisor listener, which fans out to `SubscriberSet`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
