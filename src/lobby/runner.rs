//! # GameRunner: drives one round's splash screen.
//!
//! Scoped to `<root>/<subtopic>/`, so a runner on `game/3` publishes
//! `spacehack/game/3/splash/text` and hears `spacehack/game/3/<id>/ready`.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::{Service, ServiceContext};
use crate::error::{ServiceError, TopicError};
use crate::transport::{topic, MessageHandler, Transport, TransportFactory};

/// Pattern a runner listens on.
pub const READY_PATTERN: &str = "+/ready";
/// Topic the splash texts are published on.
pub const SPLASH_TOPIC: &str = "splash/text";

const READY_ACTION: &str = "ready";
const TITLE_TEXT: &str = "***** SPACEHACK *****";
const GO_TEXT: &str = "Wheeeeeeeeeeeeee";

/// Players that reported ready in one round, in arrival order.
///
/// Cloning yields another view of the same set.
#[derive(Clone, Debug, Default)]
pub struct ReadyPlayers {
    inner: Arc<Mutex<Vec<String>>>,
}

impl ReadyPlayers {
    fn lock(&self) -> MutexGuard<'_, Vec<String>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Snapshot of the ready players.
    pub fn list(&self) -> Vec<String> {
        self.lock().clone()
    }

    /// Returns `true` if `id` is currently ready.
    pub fn contains(&self, id: &str) -> bool {
        self.lock().iter().any(|p| p == id)
    }

    /// Applies one `<player>/ready` message: `"1"` marks ready, `"0"` clears it.
    pub fn apply(&self, topic: &str, payload: &str) -> Result<(), TopicError> {
        let player = topic::player_segment(topic, READY_ACTION)?;
        let mut ready = self.lock();
        match payload {
            "1" => {
                if !ready.iter().any(|p| p == player) {
                    ready.push(player.to_string());
                }
            }
            "0" => ready.retain(|p| p != player),
            _ => {
                return Err(TopicError::MalformedPayload {
                    topic: topic.to_string(),
                    payload: payload.to_string(),
                })
            }
        }
        Ok(())
    }
}

/// One round of the game, supervised like any other service.
pub struct GameRunner {
    name: String,
    transport: Arc<dyn Transport>,
    ready: ReadyPlayers,
    splash_delay: Duration,
    round_delay: Duration,
}

impl GameRunner {
    /// Creates a runner named `runner-<subtopic>` with a client scoped to `subtopic`.
    pub fn new(cfg: &Config, factory: &dyn TransportFactory, subtopic: &str) -> Self {
        Self {
            name: format!("runner-{subtopic}"),
            transport: factory.client(Some(subtopic)),
            ready: ReadyPlayers::default(),
            splash_delay: cfg.splash_delay,
            round_delay: cfg.round_delay,
        }
    }

    /// Shared view of the players that reported ready.
    pub fn ready_players(&self) -> ReadyPlayers {
        self.ready.clone()
    }
}

#[async_trait]
impl Service for GameRunner {
    fn name(&self) -> &str {
        &self.name
    }

    async fn init(&mut self, ctx: &ServiceContext) -> Result<(), ServiceError> {
        self.transport.connect().await?;

        let ready = self.ready.clone();
        let service = ctx.name().to_string();
        let handler: MessageHandler = Arc::new(move |topic: &str, payload: &str| {
            match ready.apply(topic, payload) {
                Ok(()) => debug!(target: "lobbyvisor::runner", service = %service, topic, payload, "ready update"),
                Err(err) => {
                    warn!(target: "lobbyvisor::runner", service = %service, error = %err, "ignoring message")
                }
            }
        });
        self.transport.subscribe(READY_PATTERN, handler).await?;
        Ok(())
    }

    async fn run(&mut self, ctx: &ServiceContext) -> Result<(), ServiceError> {
        self.transport.publish(SPLASH_TOPIC, TITLE_TEXT).await?;
        ctx.sleep(self.splash_delay).await?;
        self.transport.publish(SPLASH_TOPIC, GO_TEXT).await?;
        ctx.sleep(self.round_delay).await?;
        info!(
            target: "lobbyvisor::runner",
            service = %self.name,
            ready = self.ready.list().len(),
            "round finished"
        );
        Ok(())
    }

    async fn cleanup(&mut self, _ctx: &ServiceContext) {
        self.transport.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_set_tracks_arrival_order() {
        let ready = ReadyPlayers::default();
        ready.apply("B/ready", "1").unwrap();
        ready.apply("A/ready", "1").unwrap();
        ready.apply("B/ready", "1").unwrap();
        assert_eq!(ready.list(), vec!["B", "A"]);

        ready.apply("B/ready", "0").unwrap();
        assert!(!ready.contains("B"));
        assert!(ready.contains("A"));
    }

    #[test]
    fn test_ready_rejects_bad_messages() {
        let ready = ReadyPlayers::default();
        assert!(ready.apply("A/ready", "maybe").is_err());
        assert!(ready.apply("A/join", "1").is_err());
        assert!(ready.list().is_empty());
    }
}
