//! Lobby decision logic.
//!
//! - [`GameStarter`] debounces per-player presence signals and decides when a round starts
//! - [`PlayerHandle`] push/release capability for one player identifier
//! - [`PlayerState`] membership state of one player

mod starter;

pub use starter::{GameStarter, PlayerHandle, PlayerState, MIN_PLAYERS};
