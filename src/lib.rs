//! # lobbyvisor
//!
//! **Lobbyvisor** runs the lobby of a shared, physical party game. Player consoles
//! announce themselves on a publish/subscribe bus; the lobby debounces those
//! signals and, once enough players have been present long enough, publishes a
//! `start` message with the roster.
//!
//! The crate has two halves: a small service supervisor (lifecycle, registry,
//! shutdown) and the [`GameStarter`] debounce state machine it hosts.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   console ── "<id>/join" "1"/"0" ──►┌────────────────────────────┐
//!                                     │ Transport (MemoryBroker,…) │── "start" "A,B" ──► consoles
//!                                     └──────────────┬─────────────┘
//!                                                    │ handler (broker task)
//!                                                    ▼
//!     ┌──────────────┐   ┌──────────────────────────────────────────┐
//!     │     Host     │──►│ Lobby (Service)                          │
//!     │ OS signals   │   │  GameStarter ◄── push / release          │
//!     └──────┬───────┘   │  run: sleep(poll) → step_time → start?   │
//!            │           └──────────────┬───────────────────────────┘
//!            ▼                          │ every start
//! ┌───────────────────────────────┐     ▼
//! │ Supervisor                    │  GameRunner (Service, game/<n>)
//! │ - Registry (name → handle)    │
//! │ - Bus (broadcast events)      │
//! │ - SubscriberSet → LogWriter   │
//! └───────────────────────────────┘
//! ```
//!
//! ### Service lifecycle
//! ```text
//! Supervisor::start(service, sync_init)
//!   ├─► register name (duplicate → AlreadyRunning)
//!   └─► worker task:
//!         init(ctx) ──Err──► InitFailed ─┐
//!           │ Ok                          │
//!           ├─► init-done                 │
//!           └─► run(ctx) ─► Completed / Stopped / Failed / Panicked
//!                                         │
//!         cleanup(ctx)  ◄─────────────────┘  (always)
//!         deregister, publish terminal event
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Services**      | init/run/cleanup contract with cancellation-aware sleep      | [`Service`], [`ServiceContext`]             |
//! | **Supervision**   | start, stop-all, wait-all, registry of live services         | [`Supervisor`], [`ServiceHandle`]           |
//! | **Lobby**         | debounced join/leave, start countdown, roster announcement   | [`GameStarter`], [`Lobby`], [`GameRunner`]  |
//! | **Transport**     | scoped publish/subscribe clients, in-process broker          | [`Transport`], [`MemoryBroker`]             |
//! | **Subscriber API**| hook into lifecycle events                                   | [`Subscribe`], [`LogWriter`]                |
//! | **Errors**        | typed errors for services, transport and shutdown            | [`ServiceError`], [`RuntimeError`]          |
//! | **Configuration** | delays, poll cadence, grace, topic root, env overrides       | [`Config`]                                  |
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use lobbyvisor::{Config, Host, MemoryBroker, Transport, TransportFactory};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = Config::default();
//!     cfg.join_delay = Duration::ZERO;
//!     cfg.game_start_delay = Duration::from_millis(100);
//!
//!     let broker = MemoryBroker::from_config(&cfg);
//!     let mut host = Host::new(cfg, Arc::new(broker.clone()));
//!     host.start(true).await?;
//!
//!     let console = broker.client(None);
//!     console.connect().await?;
//!     console.publish("A/join", "1").await?;
//!     console.publish("B/join", "1").await?;
//!
//!     tokio::time::sleep(Duration::from_millis(300)).await;
//!     host.stop().await?;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod game;
mod lobby;
mod subscribers;
pub mod transport;

// ---- Public re-exports ----

pub use config::{Config, DEFAULT_TOPIC_PREFIX, TOPIC_PREFIX_ENV};
pub use core::{Service, ServiceContext, ServiceExit, ServiceHandle, Supervisor};
pub use error::{ConfigError, HostError, RuntimeError, ServiceError, TopicError, TransportError};
pub use events::{Bus, Event, EventKind};
pub use game::{GameStarter, PlayerHandle, PlayerState, MIN_PLAYERS};
pub use lobby::{
    handle_join, GameRunner, Host, Lobby, ReadyPlayers, JOIN_PATTERN, READY_PATTERN, SPLASH_TOPIC,
    START_TOPIC,
};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
pub use transport::{MemoryBroker, MessageHandler, Transport, TransportFactory};
