//! # Event subscribers for the lobbyvisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Worker ── publish(Event) ──► Bus ──► supervisor listener ──► SubscriberSet::emit(&Event)
//!                                                                 │
//!                                                  ┌──────────────┼──────────────┐
//!                                                  ▼              ▼              ▼
//!                                              LogWriter       Metrics        Custom
//! ```

mod log;
mod subscriber;
mod subscriber_set;

pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;

pub(crate) use subscriber_set::panic_message;
