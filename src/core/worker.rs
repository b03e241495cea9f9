//! # Worker body: one supervised service on one tokio task.
//!
//! ```text
//! init() ── Ok ──► InitState::Done ──► run() ─┬─ Ok            → Completed (Stopped if cancelled)
//!   │                                          ├─ Err(Stopped)  → Stopped
//!   │                                          ├─ Err(e)        → Failed(e)
//!   │                                          └─ panic         → Panicked(msg)
//!   └─ Err / panic ──► InitState::Failed ──────► InitFailed(e)
//!
//! then, on every path: cleanup() → Registry::deregister → exit watch → events
//! ```
//!
//! ## Rules
//! - `cleanup` runs exactly once, whatever `init`/`run` did (panics included).
//! - Deregistration happens **before** the exit outcome becomes visible, so a
//!   caller woken by `wait()` never sees the service in `list()`.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::watch;
use tracing::{debug, error};

use crate::core::context::ServiceContext;
use crate::core::handle::{InitState, ServiceExit};
use crate::core::registry::Registry;
use crate::core::service::Service;
use crate::error::ServiceError;
use crate::events::{Event, EventKind};
use crate::subscribers::panic_message;

/// Everything the spawned task needs besides the service itself.
pub(crate) struct Worker {
    pub(crate) ctx: ServiceContext,
    pub(crate) init_tx: watch::Sender<InitState>,
    pub(crate) exit_tx: watch::Sender<Option<ServiceExit>>,
    pub(crate) registry: Arc<Registry>,
}

impl Worker {
    /// Drives `service` through its lifecycle until it exits.
    pub(crate) async fn run<S: Service>(self, mut service: S) {
        let Worker {
            ctx,
            init_tx,
            exit_tx,
            registry,
        } = self;

        let exit = match Self::init(&mut service, &ctx).await {
            Ok(()) => {
                init_tx.send_replace(InitState::Done);
                ctx.publish(Event::new(EventKind::ServiceInitDone));
                Self::run_main(&mut service, &ctx).await
            }
            Err(e) => {
                init_tx.send_replace(InitState::Failed(e.clone()));
                ServiceExit::InitFailed(e)
            }
        };

        if let Err(p) = AssertUnwindSafe(service.cleanup(&ctx)).catch_unwind().await {
            error!(service = ctx.name(), panic = %panic_message(&*p), "cleanup panicked");
        }
        registry.deregister(ctx.name()).await;
        debug!(service = ctx.name(), ?exit, "service exited");

        let mut ev = Event::new(exit.event_kind());
        if let Some(reason) = exit.reason() {
            ev = ev.with_reason(reason);
        }
        exit_tx.send_replace(Some(exit));
        ctx.publish(ev);
        ctx.publish(Event::new(EventKind::ServiceRemoved));
    }

    async fn init<S: Service>(service: &mut S, ctx: &ServiceContext) -> Result<(), ServiceError> {
        match AssertUnwindSafe(service.init(ctx)).catch_unwind().await {
            Ok(res) => res,
            Err(p) => Err(ServiceError::Init {
                error: format!("panicked: {}", panic_message(&*p)),
            }),
        }
    }

    async fn run_main<S: Service>(service: &mut S, ctx: &ServiceContext) -> ServiceExit {
        match AssertUnwindSafe(service.run(ctx)).catch_unwind().await {
            Ok(Ok(())) if ctx.is_stopped() => ServiceExit::Stopped,
            Ok(Ok(())) => ServiceExit::Completed,
            Ok(Err(ServiceError::Stopped)) => ServiceExit::Stopped,
            Ok(Err(e)) => ServiceExit::Failed(e),
            Err(p) => ServiceExit::Panicked(panic_message(&*p)),
        }
    }
}
