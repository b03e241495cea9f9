//! # In-process broker.
//!
//! [`MemoryBroker`] routes messages between clients of the same process. One
//! dispatcher task drains a single queue, so every subscriber observes messages
//! in publish order and handlers never run on the publisher's task.
//!
//! The dispatcher exits once the broker and all of its clients are dropped.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, error};

use super::{topic, MessageHandler, Transport, TransportFactory};
use crate::config::Config;
use crate::error::TransportError;
use crate::subscribers::panic_message;

struct Message {
    topic: String,
    payload: String,
}

struct Subscription {
    client: u64,
    scope: Arc<str>,
    pattern: String,
    handler: MessageHandler,
}

#[derive(Default)]
struct Routes {
    subscriptions: RwLock<Vec<Subscription>>,
}

impl Routes {
    fn read(&self) -> RwLockReadGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Subscription>> {
        self.subscriptions
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Collects `(handler, relative topic)` pairs for every matching subscription.
    fn route(&self, full_topic: &str) -> Vec<(MessageHandler, String)> {
        self.read()
            .iter()
            .filter_map(|sub| {
                let relative = full_topic.strip_prefix(&*sub.scope)?;
                topic::matches(&sub.pattern, relative)
                    .then(|| (Arc::clone(&sub.handler), relative.to_string()))
            })
            .collect()
    }

    fn deliver(&self, msg: Message) {
        for (handler, relative) in self.route(&msg.topic) {
            let res = catch_unwind(AssertUnwindSafe(|| handler(&relative, &msg.payload)));
            if let Err(panic) = res {
                error!(
                    target: "lobbyvisor::transport",
                    topic = %msg.topic,
                    info = %panic_message(&*panic),
                    "message handler panicked"
                );
            }
        }
    }
}

/// In-process publish/subscribe broker.
///
/// Cloning yields another handle to the same broker.
///
/// # Example
/// ```no_run
/// use std::sync::Arc;
/// use lobbyvisor::{MemoryBroker, Transport, TransportFactory};
///
/// # async fn demo() -> Result<(), lobbyvisor::TransportError> {
/// let broker = MemoryBroker::new("spacehack/");
/// let client = broker.client(None);
/// client.connect().await?;
/// client.subscribe("start", Arc::new(|_topic: &str, roster: &str| println!("start: {roster}"))).await?;
/// client.publish("start", "A,B").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MemoryBroker {
    root: Arc<str>,
    routes: Arc<Routes>,
    tx: mpsc::UnboundedSender<Message>,
    accepting: Arc<AtomicBool>,
    next_client: Arc<AtomicU64>,
}

impl MemoryBroker {
    /// Creates a broker whose clients live under `root` (e.g. `spacehack/`).
    ///
    /// Must be called inside a Tokio runtime: the dispatcher task is spawned here.
    pub fn new(root: impl Into<String>) -> Self {
        let routes = Arc::new(Routes::default());
        let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

        let dispatcher = Arc::clone(&routes);
        tokio::spawn(async move {
            while let Some(msg) = rx.recv().await {
                dispatcher.deliver(msg);
            }
        });

        Self {
            root: Arc::from(root.into()),
            routes,
            tx,
            accepting: Arc::new(AtomicBool::new(true)),
            next_client: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Creates a broker rooted at [`Config::topic_root`].
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(cfg.topic_root.clone())
    }

    /// Controls whether new `connect` calls succeed.
    pub fn set_accepting(&self, accepting: bool) {
        self.accepting.store(accepting, Ordering::SeqCst);
    }

    /// Returns the topic root.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Returns the number of live subscriptions across all clients.
    pub fn subscription_count(&self) -> usize {
        self.routes.read().len()
    }
}

impl TransportFactory for MemoryBroker {
    fn client(&self, subtopic: Option<&str>) -> Arc<dyn Transport> {
        let scope = match subtopic {
            Some(sub) => format!("{}{}/", self.root, sub.trim_matches('/')),
            None => self.root.to_string(),
        };
        Arc::new(MemoryClient {
            id: self.next_client.fetch_add(1, Ordering::Relaxed),
            scope: Arc::from(scope),
            broker: self.clone(),
            connected: AtomicBool::new(false),
        })
    }
}

struct MemoryClient {
    id: u64,
    scope: Arc<str>,
    broker: MemoryBroker,
    connected: AtomicBool,
}

impl MemoryClient {
    fn ensure_connected(&self) -> Result<(), TransportError> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(TransportError::NotConnected)
        }
    }
}

#[async_trait]
impl Transport for MemoryClient {
    async fn connect(&self) -> Result<(), TransportError> {
        if !self.broker.accepting.load(Ordering::SeqCst) {
            return Err(TransportError::Connect {
                reason: "broker is not accepting connections".to_string(),
            });
        }
        self.connected.store(true, Ordering::SeqCst);
        debug!(target: "lobbyvisor::transport", client = self.id, scope = %self.scope, "connected");
        Ok(())
    }

    async fn subscribe(
        &self,
        pattern: &str,
        handler: MessageHandler,
    ) -> Result<(), TransportError> {
        self.ensure_connected()?;
        topic::validate_pattern(pattern)?;
        self.broker.routes.write().push(Subscription {
            client: self.id,
            scope: Arc::clone(&self.scope),
            pattern: pattern.to_string(),
            handler,
        });
        Ok(())
    }

    async fn publish(&self, topic: &str, payload: &str) -> Result<(), TransportError> {
        self.ensure_connected()?;
        topic::validate_topic(topic)?;
        self.broker
            .tx
            .send(Message {
                topic: format!("{}{}", self.scope, topic),
                payload: payload.to_string(),
            })
            .map_err(|_| TransportError::Closed)
    }

    async fn disconnect(&self) {
        if !self.connected.swap(false, Ordering::SeqCst) {
            return;
        }
        self.broker.routes.write().retain(|sub| sub.client != self.id);
        debug!(target: "lobbyvisor::transport", client = self.id, "disconnected");
    }
}
