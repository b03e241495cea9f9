//! # LogWriter: lifecycle events to `tracing`
//!
//! A subscriber that turns incoming [`Event`]s into `tracing` records, so the
//! application's subscriber (e.g. `tracing-subscriber` with `RUST_LOG`) decides
//! where they go.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO lobbyvisor: service starting service="lobby"
//! INFO lobbyvisor: round started service="lobby" roster="1,2"
//! WARN lobbyvisor: service failed service="runner-game/1" reason="..."
//! ```

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let service = e.service.as_deref().unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::ServiceStarting => info!(target: "lobbyvisor", service, "service starting"),
            EventKind::ServiceInitDone => debug!(target: "lobbyvisor", service, "service init done"),
            EventKind::ServiceInitFailed => {
                error!(target: "lobbyvisor", service, reason, "service init failed")
            }
            EventKind::ServiceCompleted => info!(target: "lobbyvisor", service, "service completed"),
            EventKind::ServiceStopped => info!(target: "lobbyvisor", service, "service stopped"),
            EventKind::ServiceFailed => warn!(target: "lobbyvisor", service, reason, "service failed"),
            EventKind::ServicePanicked => {
                error!(target: "lobbyvisor", service, reason, "service panicked")
            }
            EventKind::ServiceRemoved => debug!(target: "lobbyvisor", service, "service removed"),
            EventKind::StopRequested => debug!(target: "lobbyvisor", service, "stop requested"),
            EventKind::ShutdownRequested => info!(target: "lobbyvisor", "shutdown requested"),
            EventKind::AllStoppedWithin => info!(target: "lobbyvisor", "all services stopped"),
            EventKind::GraceExceeded => {
                warn!(target: "lobbyvisor", grace_ms = e.delay_ms, "shutdown grace exceeded")
            }
            EventKind::RoundStarted => {
                info!(target: "lobbyvisor", service, roster = reason, "round started")
            }
            EventKind::SubscriberOverflow => {
                warn!(target: "lobbyvisor", subscriber = service, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                error!(target: "lobbyvisor", subscriber = service, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
