//! End-to-end lobby behaviour through the in-process broker, on paused time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{self, Instant};

use lobbyvisor::{
    Config, Host, Lobby, MemoryBroker, PlayerState, ServiceError, ServiceExit, Supervisor,
    Transport, TransportError, TransportFactory,
};

type Inbox = Arc<Mutex<Vec<(Duration, String, String)>>>;

struct Harness {
    broker: MemoryBroker,
    console: Arc<dyn Transport>,
    inbox: Inbox,
    t0: Instant,
}

impl Harness {
    /// Connects a console client that records every message matching `pattern`.
    async fn new(broker: MemoryBroker, pattern: &str) -> Self {
        let console = broker.client(None);
        console.connect().await.unwrap();

        let inbox: Inbox = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&inbox);
        let t0 = Instant::now();
        console
            .subscribe(
                pattern,
                Arc::new(move |topic: &str, payload: &str| {
                    sink.lock()
                        .unwrap()
                        .push((t0.elapsed(), topic.to_string(), payload.to_string()));
                }),
            )
            .await
            .unwrap();

        Self {
            broker,
            console,
            inbox,
            t0,
        }
    }

    async fn send(&self, player: &str, payload: &str) {
        self.console
            .publish(&format!("{player}/join"), payload)
            .await
            .unwrap();
    }

    async fn advance_to(&self, at: Duration) {
        time::sleep_until(self.t0 + at).await;
    }

    fn received(&self) -> Vec<(Duration, String, String)> {
        self.inbox.lock().unwrap().clone()
    }
}

fn config() -> Config {
    Config {
        grace: Duration::from_secs(1),
        ..Config::default()
    }
}

#[tokio::test(start_paused = true)]
async fn test_two_players_start_after_debounce_and_countdown() {
    let cfg = config();
    let broker = MemoryBroker::from_config(&cfg);
    let sup = Supervisor::new(&cfg, Vec::new());
    let lobby = Lobby::new(&cfg, &broker);
    let starter = lobby.starter();
    let handle = sup.start(lobby, true).await.unwrap();

    let h = Harness::new(broker.clone(), "start").await;
    h.send("A", "1").await;
    h.send("B", "1").await;

    h.advance_to(Duration::from_millis(5900)).await;
    assert!(h.received().is_empty());
    assert_eq!(starter.joined_players(), vec!["A", "B"]);

    h.advance_to(Duration::from_secs(7)).await;
    let got = h.received();
    assert_eq!(got.len(), 1);
    let (at, topic, payload) = &got[0];
    assert_eq!(topic, "start");
    assert_eq!(payload, "A,B");
    assert!(*at >= Duration::from_secs(6) && *at < Duration::from_millis(6100));

    // the start resets the lobby
    assert!(starter.joined_players().is_empty());
    assert_eq!(starter.state("A"), PlayerState::Idle);

    handle.stop();
    assert_eq!(handle.wait(None).await, Some(ServiceExit::Stopped));
    assert_eq!(h.broker.subscription_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_dropout_cancels_countdown_until_rejoin() {
    let cfg = config();
    let broker = MemoryBroker::from_config(&cfg);
    let sup = Supervisor::new(&cfg, Vec::new());
    sup.start(Lobby::new(&cfg, &broker), true).await.unwrap();

    let h = Harness::new(broker, "start").await;
    h.send("A", "1").await;
    h.send("B", "1").await;

    h.advance_to(Duration::from_secs(3)).await;
    h.send("A", "0").await;
    h.advance_to(Duration::from_secs(4)).await;
    h.send("A", "1").await;

    h.advance_to(Duration::from_millis(9800)).await;
    assert!(h.received().is_empty());

    h.advance_to(Duration::from_millis(10300)).await;
    let got = h.received();
    assert_eq!(got.len(), 1);
    assert_eq!(got[0].2, "B,A");

    sup.shutdown().await.unwrap();
    assert!(sup.list().await.is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_malformed_messages_change_nothing() {
    let cfg = config();
    let broker = MemoryBroker::from_config(&cfg);
    let sup = Supervisor::new(&cfg, Vec::new());
    let lobby = Lobby::new(&cfg, &broker);
    let starter = lobby.starter();
    sup.start(lobby, true).await.unwrap();

    let h = Harness::new(broker, "start").await;
    h.send("A", "2").await;
    h.send("B", "").await;
    h.console.publish("/join", "1").await.unwrap();
    h.console.publish("C/join/x", "1").await.unwrap();

    h.advance_to(Duration::from_secs(10)).await;
    assert!(h.received().is_empty());
    assert!(starter.joined_players().is_empty());
    for id in ["A", "B", "C"] {
        assert_eq!(starter.state(id), PlayerState::Idle);
    }
    assert!(sup.is_running("lobby").await);
}

#[tokio::test(start_paused = true)]
async fn test_synchronous_start_observes_immediate_messages() {
    let cfg = Config {
        join_delay: Duration::ZERO,
        ..config()
    };
    let broker = MemoryBroker::from_config(&cfg);
    let sup = Supervisor::new(&cfg, Vec::new());
    let lobby = Lobby::new(&cfg, &broker);
    let starter = lobby.starter();
    sup.start(lobby, true).await.unwrap();

    let h = Harness::new(broker, "start").await;
    h.send("A", "1").await;
    h.advance_to(Duration::from_millis(1)).await;

    assert_eq!(starter.state("A"), PlayerState::Joined);
}

#[tokio::test(start_paused = true)]
async fn test_connect_failure_fails_synchronous_start() {
    let cfg = config();
    let broker = MemoryBroker::from_config(&cfg);
    broker.set_accepting(false);
    let sup = Supervisor::new(&cfg, Vec::new());

    let err = sup
        .start(Lobby::new(&cfg, &broker), true)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Transport(TransportError::Connect { .. })
    ));

    sup.wait_all(Some(Duration::from_secs(1))).await.unwrap();
    assert!(sup.list().await.is_empty());
    assert_eq!(broker.subscription_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_stopping_lobby_releases_subscriptions() {
    let cfg = config();
    let broker = MemoryBroker::from_config(&cfg);
    let sup = Supervisor::new(&cfg, Vec::new());
    let handle = sup.start(Lobby::new(&cfg, &broker), true).await.unwrap();
    assert_eq!(broker.subscription_count(), 1);

    handle.stop();
    handle.stop();
    assert_eq!(handle.wait(None).await, Some(ServiceExit::Stopped));
    assert_eq!(broker.subscription_count(), 0);
    assert!(!sup.is_running("lobby").await);
}

#[tokio::test(start_paused = true)]
async fn test_host_launches_a_round_per_start() {
    let cfg = Config {
        join_delay: Duration::ZERO,
        game_start_delay: Duration::from_secs(1),
        ..config()
    };
    let broker = MemoryBroker::from_config(&cfg);
    let mut host = Host::new(cfg.clone(), Arc::new(broker.clone()));
    host.start(true).await.unwrap();
    assert!(matches!(
        host.start(true).await,
        Err(ServiceError::AlreadyRunning { .. })
    ));

    let h = Harness::new(broker, "#").await;
    h.send("A", "1").await;
    h.send("B", "1").await;

    h.advance_to(Duration::from_secs(2)).await;
    assert_eq!(
        host.supervisor().list().await,
        vec!["lobby".to_string(), "runner-game/1".to_string()]
    );

    h.advance_to(Duration::from_secs(7)).await;
    let splash: Vec<String> = h
        .received()
        .into_iter()
        .filter(|(_, topic, _)| topic == "game/1/splash/text")
        .map(|(_, _, text)| text)
        .collect();
    assert_eq!(splash, vec!["***** SPACEHACK *****", "Wheeeeeeeeeeeeee"]);
    assert!(h
        .received()
        .iter()
        .any(|(_, topic, payload)| topic == "start" && payload == "A,B"));

    host.stop().await.unwrap();
    assert!(host.supervisor().list().await.is_empty());
    assert_eq!(host.wait().await, Some(ServiceExit::Stopped));
}

#[tokio::test(start_paused = true)]
async fn test_host_wait_outlasts_a_running_round() {
    let cfg = Config {
        join_delay: Duration::ZERO,
        game_start_delay: Duration::from_secs(1),
        ..config()
    };
    let broker = MemoryBroker::from_config(&cfg);
    let mut host = Host::new(cfg.clone(), Arc::new(broker.clone()));
    let lobby = host.start(true).await.unwrap();

    let h = Harness::new(broker, "game/#").await;
    h.send("A", "1").await;
    h.send("B", "1").await;
    h.advance_to(Duration::from_secs(2)).await;
    assert!(host.supervisor().is_running("runner-game/1").await);

    lobby.stop();
    assert_eq!(host.wait().await, Some(ServiceExit::Stopped));
    assert!(host.supervisor().list().await.is_empty());

    let splash: Vec<String> = h.received().into_iter().map(|(_, _, text)| text).collect();
    assert_eq!(splash, vec!["***** SPACEHACK *****", "Wheeeeeeeeeeeeee"]);
}
