//! # Publish/subscribe transport seam.
//!
//! The lobby never talks to a broker directly; it goes through [`Transport`], a
//! connection-scoped client created by a [`TransportFactory`]. Every client is
//! namespaced under the configured topic root (and optionally a subtopic), so
//! services only ever see and use relative topics such as `7/join` or `start`.
//!
//! ```text
//! TransportFactory::client(Some("game/1"))
//!        │                                  topics on the wire
//!        ▼                                  ─────────────────────────────
//!   Transport ── publish("splash/text") ──► spacehack/game/1/splash/text
//!             ◄─ handler("3/ready", "1") ── spacehack/game/1/3/ready
//! ```
//!
//! [`MemoryBroker`] is the in-process implementation used by tests and the demo.

mod memory;
pub mod topic;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::TransportError;

pub use memory::MemoryBroker;

/// Callback for inbound messages: `(topic relative to the client scope, payload)`.
///
/// Invoked on a thread owned by the transport, never on the caller's task.
pub type MessageHandler = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Connection-scoped publish/subscribe client.
///
/// ### Contract
/// - `connect` failures propagate to the caller (a service `init` aborts on them).
/// - Patterns use `+` for exactly one segment and a trailing `#` for the rest.
/// - `publish` is fire-and-forget from the caller's perspective.
/// - `disconnect` releases the session and its subscriptions; idempotent.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Establishes the session.
    async fn connect(&self) -> Result<(), TransportError>;

    /// Subscribes `handler` to every topic matching `pattern`.
    async fn subscribe(&self, pattern: &str, handler: MessageHandler)
        -> Result<(), TransportError>;

    /// Publishes `payload` on `topic`.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError>;

    /// Releases the session.
    async fn disconnect(&self);
}

/// Creates transport clients scoped under the topic root.
pub trait TransportFactory: Send + Sync + 'static {
    /// Returns a new, unconnected client; `subtopic` nests its scope one level deeper.
    fn client(&self, subtopic: Option<&str>) -> Arc<dyn Transport>;
}
