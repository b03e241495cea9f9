//! # Control handle for one started service.
//!
//! [`ServiceHandle`] is cheap to clone; the supervisor registry keeps one clone per
//! live service and callers keep their own.
//!
//! ```text
//! stop()  ──► cancel token ──► ServiceContext::sleep returns Stopped ──► run() unwinds
//! wait()  ◄── exit watch   ◄── worker publishes ServiceExit after cleanup + deregister
//! await_init_done() ◄── init watch ◄── worker after init()
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::error::ServiceError;
use crate::events::{Bus, Event, EventKind};

/// Terminal outcome of a supervised service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceExit {
    /// `run` returned `Ok(())` on its own.
    Completed,
    /// `run` unwound after a stop request.
    Stopped,
    /// `init` failed; `run` never started.
    InitFailed(ServiceError),
    /// `run` returned an error.
    Failed(ServiceError),
    /// `run` panicked; carries the panic message.
    Panicked(String),
    /// The worker vanished without reporting (runtime shut down underneath it).
    Aborted,
}

impl ServiceExit {
    /// Returns `true` for [`ServiceExit::Completed`] and [`ServiceExit::Stopped`].
    pub fn is_clean(&self) -> bool {
        matches!(self, ServiceExit::Completed | ServiceExit::Stopped)
    }

    pub(crate) fn event_kind(&self) -> EventKind {
        match self {
            ServiceExit::Completed => EventKind::ServiceCompleted,
            ServiceExit::Stopped => EventKind::ServiceStopped,
            ServiceExit::InitFailed(_) => EventKind::ServiceInitFailed,
            ServiceExit::Failed(_) | ServiceExit::Aborted => EventKind::ServiceFailed,
            ServiceExit::Panicked(_) => EventKind::ServicePanicked,
        }
    }

    pub(crate) fn reason(&self) -> Option<String> {
        match self {
            ServiceExit::InitFailed(e) | ServiceExit::Failed(e) => Some(e.to_string()),
            ServiceExit::Panicked(msg) => Some(msg.clone()),
            ServiceExit::Aborted => Some("worker aborted".to_string()),
            ServiceExit::Completed | ServiceExit::Stopped => None,
        }
    }
}

/// Progress of a service's `init` phase.
#[derive(Debug, Clone)]
pub(crate) enum InitState {
    Pending,
    Done,
    Failed(ServiceError),
}

impl InitState {
    fn result(&self) -> Result<(), ServiceError> {
        match self {
            InitState::Done => Ok(()),
            InitState::Failed(e) => Err(e.clone()),
            InitState::Pending => Err(worker_gone()),
        }
    }
}

fn worker_gone() -> ServiceError {
    ServiceError::Init {
        error: "worker exited before init completed".to_string(),
    }
}

/// Handle to a started service.
#[derive(Clone, Debug)]
pub struct ServiceHandle {
    name: Arc<str>,
    token: CancellationToken,
    init: watch::Receiver<InitState>,
    exit: watch::Receiver<Option<ServiceExit>>,
    bus: Bus,
}

impl ServiceHandle {
    pub(crate) fn new(
        name: Arc<str>,
        token: CancellationToken,
        init: watch::Receiver<InitState>,
        exit: watch::Receiver<Option<ServiceExit>>,
        bus: Bus,
    ) -> Self {
        Self {
            name,
            token,
            init,
            exit,
            bus,
        }
    }

    /// Registry name of the service.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Requests cooperative cancellation. Idempotent and non-blocking.
    pub fn stop(&self) {
        if !self.token.is_cancelled() {
            self.token.cancel();
            self.bus.publish(
                Event::new(EventKind::StopRequested).with_service(Arc::clone(&self.name)),
            );
        }
    }

    /// Returns `true` until the worker has fully exited.
    pub fn is_alive(&self) -> bool {
        self.exit.borrow().is_none()
    }

    /// Returns the terminal outcome if the worker has exited.
    pub fn exit(&self) -> Option<ServiceExit> {
        self.exit.borrow().clone()
    }

    /// Waits until the worker has exited (after `cleanup` and deregistration).
    ///
    /// Returns `None` when `timeout` elapsed first; the caller should re-check
    /// [`is_alive`](Self::is_alive).
    pub async fn wait(&self, timeout: Option<Duration>) -> Option<ServiceExit> {
        let mut rx = self.exit.clone();
        let done = async move {
            match rx.wait_for(Option::is_some).await {
                Ok(exit) => (*exit).clone(),
                Err(_) => Some(ServiceExit::Aborted),
            }
        };
        match timeout {
            Some(d) => time::timeout(d, done).await.ok().flatten(),
            None => done.await,
        }
    }

    /// Waits until `init` has completed.
    ///
    /// Returns the init error if `init` failed, or [`ServiceError::InitTimeout`] when
    /// `timeout` elapsed first.
    pub async fn await_init_done(&self, timeout: Option<Duration>) -> Result<(), ServiceError> {
        let mut rx = self.init.clone();
        let done = async move {
            match rx.wait_for(|s| !matches!(s, InitState::Pending)).await {
                Ok(state) => state.result(),
                Err(_) => Err(worker_gone()),
            }
        };
        match timeout {
            Some(d) => time::timeout(d, done)
                .await
                .unwrap_or(Err(ServiceError::InitTimeout { timeout: d })),
            None => done.await,
        }
    }
}
