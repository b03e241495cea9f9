//! # Lifecycle event bus.
//!
//! [`Bus`] carries [`Event`]s from the supervisor, the workers and the services
//! (through [`ServiceContext::publish`](crate::ServiceContext::publish)) to the
//! supervisor's subscriber listener.
//!
//! ```text
//! Supervisor ─┐
//! Worker     ─┼─ publish ─► broadcast ring (capacity = Config::bus_capacity) ─► listener ─► SubscriberSet
//! Lobby      ─┘
//! ```
//!
//! Publishing never waits. With nobody listening the event is dropped; a
//! listener that falls behind loses the oldest events and is told how many.

use tokio::sync::broadcast;

use super::event::Event;

/// Cloneable publishing end of the lifecycle event channel.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a bus holding up to `capacity` undelivered events (at least 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Sends `ev` to every current listener.
    pub fn publish(&self, ev: Event) {
        // dropped when nobody listens
        let _ = self.tx.send(ev);
    }

    /// Opens a listener that sees events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }

    /// Number of open listeners.
    pub fn listeners(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_listener_sees_later_events_in_order() {
        let bus = Bus::new(4);
        bus.publish(Event::new(EventKind::ServiceStarting));

        let mut rx = bus.subscribe();
        assert_eq!(bus.listeners(), 1);
        bus.publish(Event::new(EventKind::ServiceInitDone).with_service("lobby"));
        bus.publish(Event::new(EventKind::RoundStarted).with_reason("A,B"));

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::ServiceInitDone);
        assert_eq!(second.reason.as_deref(), Some("A,B"));
        assert!(second.seq > first.seq);
    }

    #[tokio::test]
    async fn test_slow_listener_is_told_how_much_it_lost() {
        let bus = Bus::new(0);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::ServiceStarting));
        bus.publish(Event::new(EventKind::ServiceCompleted));

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(rx.recv().await.unwrap().kind, EventKind::ServiceCompleted);
    }
}
