//! # Lobby service: binds the [`GameStarter`] to transport topics.
//!
//! ```text
//! broker task:  "<id>/join" "1" ──► handle_join ──► PlayerHandle::push
//!               "<id>/join" "0" ──► handle_join ──► PlayerHandle::release
//!
//! lobby task:   loop {
//!                 ctx.sleep(poll)?            (Stopped ends the loop)
//!                 step_time(poll)
//!                 take_start()? ──► publish "start" "<id>,<id>,..."
//!                              └──► RoundStarted event, GameRunner on game/<n>
//!               }
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::core::{Service, ServiceContext, Supervisor};
use crate::error::{ServiceError, TopicError};
use crate::events::{Event, EventKind};
use crate::game::GameStarter;
use crate::lobby::GameRunner;
use crate::transport::{topic, MessageHandler, Transport, TransportFactory};

/// Pattern the lobby listens on.
pub const JOIN_PATTERN: &str = "+/join";
/// Topic the roster is announced on.
pub const START_TOPIC: &str = "start";

const JOIN_ACTION: &str = "join";

/// Background service that decides when a round starts.
pub struct Lobby {
    starter: GameStarter,
    transport: Arc<dyn Transport>,
    poll_interval: Duration,
    rounds: Option<Rounds>,
}

/// Launches one [`GameRunner`] per start through the injected supervisor.
struct Rounds {
    supervisor: Arc<Supervisor>,
    factory: Arc<dyn TransportFactory>,
    config: Config,
    played: u64,
}

impl Lobby {
    /// Creates a lobby with a root-scoped transport client from `factory`.
    pub fn new(cfg: &Config, factory: &dyn TransportFactory) -> Self {
        Self {
            starter: GameStarter::from_config(cfg),
            transport: factory.client(None),
            poll_interval: cfg.poll_interval,
            rounds: None,
        }
    }

    /// Also launch a [`GameRunner`] on `game/<round>` every time a round starts.
    pub fn with_rounds(
        mut self,
        cfg: &Config,
        supervisor: Arc<Supervisor>,
        factory: Arc<dyn TransportFactory>,
    ) -> Self {
        self.rounds = Some(Rounds {
            supervisor,
            factory,
            config: cfg.clone(),
            played: 0,
        });
        self
    }

    /// Shared view of the lobby's state machine.
    pub fn starter(&self) -> GameStarter {
        self.starter.clone()
    }

    /// Announces a start. The lobby has already reset, so a failed publish is
    /// logged and the lobby keeps collecting players.
    async fn announce(&mut self, ctx: &ServiceContext, roster: Vec<String>) {
        let payload = roster.join(",");
        info!(target: "lobbyvisor::lobby", players = %payload, "starting game");
        if let Err(err) = self.transport.publish(START_TOPIC, &payload).await {
            warn!(
                target: "lobbyvisor::lobby",
                label = err.as_label(),
                error = %err,
                "start announcement not published"
            );
        }
        ctx.publish(Event::new(EventKind::RoundStarted).with_reason(payload));

        if let Some(rounds) = self.rounds.as_mut() {
            rounds.launch().await;
        }
    }
}

impl Rounds {
    async fn launch(&mut self) {
        self.played += 1;
        let subtopic = format!("game/{}", self.played);
        let runner = GameRunner::new(&self.config, self.factory.as_ref(), &subtopic);
        if let Err(err) = self.supervisor.start(runner, false).await {
            warn!(
                target: "lobbyvisor::lobby",
                round = %subtopic,
                label = err.as_label(),
                error = %err,
                "game runner not started"
            );
        }
    }
}

/// Applies one inbound `<player>/join` message to `starter`.
///
/// Payload `"1"` pushes, `"0"` releases; anything else is rejected without
/// touching any state.
pub fn handle_join(starter: &GameStarter, topic: &str, payload: &str) -> Result<(), TopicError> {
    let player = topic::player_segment(topic, JOIN_ACTION)?;
    match payload {
        "1" => starter.player(player).push(),
        "0" => starter.player(player).release(),
        _ => {
            return Err(TopicError::MalformedPayload {
                topic: topic.to_string(),
                payload: payload.to_string(),
            })
        }
    }
    Ok(())
}

#[async_trait]
impl Service for Lobby {
    fn name(&self) -> &str {
        "lobby"
    }

    async fn init(&mut self, _ctx: &ServiceContext) -> Result<(), ServiceError> {
        self.transport.connect().await?;

        let starter = self.starter.clone();
        let handler: MessageHandler = Arc::new(move |topic: &str, payload: &str| {
            if let Err(err) = handle_join(&starter, topic, payload) {
                warn!(target: "lobbyvisor::lobby", label = err.as_label(), error = %err, "ignoring message");
            }
        });
        self.transport.subscribe(JOIN_PATTERN, handler).await?;
        debug!(target: "lobbyvisor::lobby", pattern = JOIN_PATTERN, "listening for players");
        Ok(())
    }

    async fn run(&mut self, ctx: &ServiceContext) -> Result<(), ServiceError> {
        loop {
            ctx.sleep(self.poll_interval).await?;
            self.starter.step_time(self.poll_interval);
            if let Some(roster) = self.starter.take_start() {
                self.announce(ctx, roster).await;
            }
        }
    }

    async fn cleanup(&mut self, _ctx: &ServiceContext) {
        self.transport.disconnect().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use crate::game::PlayerState;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn starter() -> GameStarter {
        GameStarter::new(
            Duration::from_secs(5),
            Duration::ZERO,
            Duration::ZERO,
        )
    }

    #[test]
    fn test_join_and_leave_payloads() {
        let gs = starter();
        handle_join(&gs, "7/join", "1").unwrap();
        assert_eq!(gs.state("7"), PlayerState::Joined);

        handle_join(&gs, "7/join", "0").unwrap();
        assert_eq!(gs.state("7"), PlayerState::Idle);
    }

    #[test]
    fn test_malformed_payload_changes_nothing() {
        let gs = starter();
        let err = handle_join(&gs, "7/join", "yes").unwrap_err();
        assert_eq!(err.as_label(), "topic_malformed_payload");
        assert_eq!(gs.state("7"), PlayerState::Idle);
        assert!(gs.joined_players().is_empty());
    }

    #[test]
    fn test_topic_without_player_is_rejected() {
        let gs = starter();
        let err = handle_join(&gs, "/join", "1").unwrap_err();
        assert_eq!(err, TopicError::UnknownPlayerSegment { topic: "/join".into() });
        assert!(gs.joined_players().is_empty());
    }

    /// Accepts everything except publishing.
    #[derive(Default)]
    struct Unreachable {
        attempts: AtomicUsize,
    }

    #[async_trait]
    impl Transport for Unreachable {
        async fn connect(&self) -> Result<(), TransportError> {
            Ok(())
        }

        async fn subscribe(&self, _: &str, _: MessageHandler) -> Result<(), TransportError> {
            Ok(())
        }

        async fn publish(&self, _: &str, _: &str) -> Result<(), TransportError> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::Closed)
        }

        async fn disconnect(&self) {}
    }

    struct UnreachableFactory(Arc<Unreachable>);

    impl TransportFactory for UnreachableFactory {
        fn client(&self, _: Option<&str>) -> Arc<dyn Transport> {
            self.0.clone()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_announcement_keeps_lobby_running() {
        let cfg = Config {
            join_delay: Duration::ZERO,
            game_start_delay: Duration::from_millis(100),
            ..Config::default()
        };
        let transport = Arc::new(Unreachable::default());
        let lobby = Lobby::new(&cfg, &UnreachableFactory(transport.clone()));
        let gs = lobby.starter();
        let sup = Supervisor::new(&cfg, Vec::new());
        let handle = sup.start(lobby, true).await.unwrap();

        gs.player("A").push();
        gs.player("B").push();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(transport.attempts.load(Ordering::SeqCst), 1);
        assert!(handle.is_alive());
        assert!(gs.joined_players().is_empty());

        gs.player("A").push();
        gs.player("B").push();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(transport.attempts.load(Ordering::SeqCst), 2);
    }
}
