//! Lobby services and the process host.
//!
//! - [`Lobby`] feeds join messages into a [`GameStarter`](crate::GameStarter) and announces starts
//! - [`GameRunner`] drives one round's splash texts
//! - [`Host`] wires both to a [`Supervisor`](crate::Supervisor) and OS signals

mod host;
mod runner;
mod service;

pub use host::Host;
pub use runner::{GameRunner, ReadyPlayers, READY_PATTERN, SPLASH_TOPIC};
pub use service::{handle_join, Lobby, JOIN_PATTERN, START_TOPIC};
