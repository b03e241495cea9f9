//! # Per-service runtime context.
//!
//! [`ServiceContext`] is handed to every [`Service`](crate::Service) phase. It carries
//! the service's cancellation token and exposes the cancellation-aware
//! [`sleep`](ServiceContext::sleep), the single suspension point through which a
//! `run` loop learns about stop requests.

use std::sync::Arc;
use std::time::Duration;

use tokio::{select, time};
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::events::{Bus, Event};

/// Runtime view of one supervised service.
#[derive(Clone, Debug)]
pub struct ServiceContext {
    name: Arc<str>,
    token: CancellationToken,
    bus: Bus,
}

impl ServiceContext {
    pub(crate) fn new(name: Arc<str>, token: CancellationToken, bus: Bus) -> Self {
        Self { name, token, bus }
    }

    /// Registry name of the service.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cancellation token of the service (for `select!` in custom loops).
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Returns `true` once a stop was requested.
    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Sleeps for `duration` unless a stop is requested first.
    ///
    /// Returns `Ok(())` when the delay elapsed and `Err(ServiceError::Stopped)` as
    /// soon as cancellation fires (immediately if it already has).
    pub async fn sleep(&self, duration: Duration) -> Result<(), ServiceError> {
        select! {
            biased;
            _ = self.token.cancelled() => Err(ServiceError::Stopped),
            _ = time::sleep(duration) => Ok(()),
        }
    }

    /// Publishes an event on the supervisor bus, tagged with this service's name.
    pub fn publish(&self, event: Event) {
        self.bus.publish(event.with_service(Arc::clone(&self.name)));
    }
}
