//! # Supervisor: starts services, tracks them, and coordinates shutdown.
//!
//! The [`Supervisor`] owns the event bus, a [`SubscriberSet`], and the registry of
//! live services. It is an explicit object: whoever creates workers gets an
//! `Arc<Supervisor>` injected instead of reaching for process-global state.
//!
//! ## High-level architecture
//! ```text
//! start(service, sync_init)
//!   ├─► Registry::register(handle)           (name must be free)
//!   ├─► publish ServiceStarting
//!   ├─► tokio::spawn(Worker::run(service))   (init → run → cleanup → deregister)
//!   └─► sync_init? await init-done
//!
//! stop_all()  ─► every registered handle: stop()   (cancel token, non-blocking)
//! wait_all()  ─► until registry empty (optional grace → GraceExceeded{stuck})
//! shutdown()  ─► ShutdownRequested → stop_all → wait_all(cfg.grace)
//!                 ├─ Ok  → AllStoppedWithin
//!                 ├─ Err → GraceExceeded
//!                 └─► close listener, drain subscriber queues
//!
//! Event flow:
//!   Worker / Supervisor ── publish(Event) ──► Bus ──► listener ──► SubscriberSet::emit
//! ```
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use lobbyvisor::{Config, Service, ServiceContext, ServiceError, ServiceExit, Supervisor};
//!
//! struct Once;
//!
//! #[async_trait]
//! impl Service for Once {
//!     fn name(&self) -> &str { "once" }
//!     async fn run(&mut self, _ctx: &ServiceContext) -> Result<(), ServiceError> { Ok(()) }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sup = Supervisor::new(&Config::default(), Vec::new());
//!     let handle = sup.start(Once, true).await?;
//!     assert_eq!(handle.wait(Some(Duration::from_secs(1))).await, Some(ServiceExit::Completed));
//!     Ok(())
//! }
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::{select, time};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::core::context::ServiceContext;
use crate::core::handle::{InitState, ServiceHandle};
use crate::core::registry::Registry;
use crate::core::service::Service;
use crate::core::worker::Worker;
use crate::error::{RuntimeError, ServiceError};
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Coordinates service workers, event delivery and graceful shutdown.
pub struct Supervisor {
    grace: Option<Duration>,
    bus: Bus,
    registry: Arc<Registry>,
    listener: Option<Listener>,
}

/// The task forwarding bus events to the subscriber set.
///
/// The bus never closes while the subscriber set holds a sender, so the task
/// is ended through `stop` instead.
struct Listener {
    stop: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    /// Creates a supervisor and spawns the event listener feeding `subscribers`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(cfg: &Config, subscribers: Vec<Arc<dyn Subscribe>>) -> Arc<Self> {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let subs = SubscriberSet::new(subscribers, bus.clone());
        let listener = Self::subscriber_listener(&bus, subs);

        Arc::new(Self {
            grace: cfg.shutdown_grace(),
            bus,
            registry: Arc::new(Registry::new()),
            listener,
        })
    }

    /// Forwards bus events to the subscriber set until stopped, then drains
    /// what is already on the bus and lets every subscriber queue run dry.
    fn subscriber_listener(bus: &Bus, subs: SubscriberSet) -> Option<Listener> {
        if subs.is_empty() {
            return None;
        }
        let stop = CancellationToken::new();
        let token = stop.clone();
        let mut rx = bus.subscribe();

        let task = tokio::spawn(async move {
            loop {
                select! {
                    biased;
                    res = rx.recv() => match res {
                        Ok(ev) => subs.emit(&ev),
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(skipped, "event listener lagged");
                        }
                        Err(RecvError::Closed) => break,
                    },
                    _ = token.cancelled() => break,
                }
            }
            loop {
                match rx.try_recv() {
                    Ok(ev) => subs.emit(&ev),
                    Err(TryRecvError::Lagged(_)) => continue,
                    Err(_) => break,
                }
            }
            subs.shutdown().await;
        });

        Some(Listener {
            stop,
            task: Mutex::new(Some(task)),
        })
    }

    /// Stops the listener and waits until every subscriber has handled the
    /// events published so far.
    async fn close_listener(&self) {
        let Some(listener) = &self.listener else {
            return;
        };
        listener.stop.cancel();
        let task = listener
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                warn!(error = %e, "event listener ended abnormally");
            }
        }
    }

    /// Event bus shared with all workers.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Registers `service` and spawns its worker.
    ///
    /// With `synchronous_init` the call returns only after the service's `init`
    /// finished, so its connections and subscriptions exist; an init failure is
    /// returned as the error (the worker has already cleaned up and deregistered).
    pub async fn start<S: Service>(
        &self,
        service: S,
        synchronous_init: bool,
    ) -> Result<ServiceHandle, ServiceError> {
        let name: Arc<str> = Arc::from(service.name());
        let token = CancellationToken::new();
        let (init_tx, init_rx) = watch::channel(InitState::Pending);
        let (exit_tx, exit_rx) = watch::channel(None);

        let handle = ServiceHandle::new(
            Arc::clone(&name),
            token.clone(),
            init_rx,
            exit_rx,
            self.bus.clone(),
        );
        self.registry.register(handle.clone()).await?;
        self.bus
            .publish(Event::new(EventKind::ServiceStarting).with_service(Arc::clone(&name)));

        let worker = Worker {
            ctx: ServiceContext::new(name, token, self.bus.clone()),
            init_tx,
            exit_tx,
            registry: Arc::clone(&self.registry),
        };
        tokio::spawn(worker.run(service));

        if synchronous_init {
            handle.await_init_done(None).await?;
        }
        Ok(handle)
    }

    /// Requests cancellation of every registered service. Non-blocking.
    pub async fn stop_all(&self) {
        for handle in self.registry.handles().await {
            handle.stop();
        }
    }

    /// Waits until every registered service has exited.
    ///
    /// Services started while waiting are waited for as well. With `grace`, gives up
    /// after that long and reports the names still registered.
    pub async fn wait_all(&self, grace: Option<Duration>) -> Result<(), RuntimeError> {
        let done = async {
            loop {
                let handles = self.registry.handles().await;
                if handles.is_empty() {
                    break;
                }
                for handle in handles {
                    handle.wait(None).await;
                }
            }
        };

        match grace {
            None => {
                done.await;
                Ok(())
            }
            Some(grace) => match time::timeout(grace, done).await {
                Ok(()) => Ok(()),
                Err(_) => Err(RuntimeError::GraceExceeded {
                    grace,
                    stuck: self.registry.list().await,
                }),
            },
        }
    }

    /// Orderly shutdown: stop every service, then wait for all of them within the
    /// configured grace.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.stop_all().await;

        let res = match self.wait_all(self.grace).await {
            Ok(()) => {
                info!("all services stopped");
                self.bus.publish(Event::new(EventKind::AllStoppedWithin));
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, label = e.as_label(), "shutdown incomplete");
                let mut ev = Event::new(EventKind::GraceExceeded);
                if let RuntimeError::GraceExceeded { grace, .. } = &e {
                    ev = ev.with_delay(*grace);
                }
                self.bus.publish(ev);
                Err(e)
            }
        };
        self.close_listener().await;
        res
    }

    /// Returns sorted names of live services.
    pub async fn list(&self) -> Vec<String> {
        self.registry.list().await
    }

    /// Returns `true` if a service with this name is registered.
    pub async fn is_running(&self, name: &str) -> bool {
        self.registry.contains(name).await
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Some(listener) = &self.listener {
            listener.stop.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::ServiceExit;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Clone, Copy)]
    enum Mode {
        Loop,
        Complete,
        Fail,
        Panic,
        FailInit,
        Stubborn,
    }

    struct Scripted {
        name: &'static str,
        mode: Mode,
        cleanups: Arc<AtomicUsize>,
    }

    impl Scripted {
        fn new(name: &'static str, mode: Mode) -> (Self, Arc<AtomicUsize>) {
            let cleanups = Arc::new(AtomicUsize::new(0));
            (
                Self {
                    name,
                    mode,
                    cleanups: Arc::clone(&cleanups),
                },
                cleanups,
            )
        }
    }

    #[async_trait]
    impl Service for Scripted {
        fn name(&self) -> &str {
            self.name
        }

        async fn init(&mut self, _ctx: &ServiceContext) -> Result<(), ServiceError> {
            time::sleep(Duration::from_millis(10)).await;
            match self.mode {
                Mode::FailInit => Err(ServiceError::Init {
                    error: "connection refused".into(),
                }),
                _ => Ok(()),
            }
        }

        async fn run(&mut self, ctx: &ServiceContext) -> Result<(), ServiceError> {
            match self.mode {
                Mode::Complete => Ok(()),
                Mode::Fail => Err(ServiceError::Fail {
                    error: "boom".into(),
                }),
                Mode::Panic => panic!("run exploded"),
                Mode::Stubborn => {
                    time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
                Mode::Loop | Mode::FailInit => loop {
                    ctx.sleep(Duration::from_millis(50)).await?;
                },
            }
        }

        async fn cleanup(&mut self, _ctx: &ServiceContext) {
            self.cleanups.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn supervisor() -> Arc<Supervisor> {
        Supervisor::new(&Config::default(), Vec::new())
    }

    #[tokio::test(start_paused = true)]
    async fn test_synchronous_start_waits_for_init() {
        let sup = supervisor();
        let (svc, _) = Scripted::new("loop", Mode::Loop);
        let handle = sup.start(svc, true).await.unwrap();

        assert_eq!(handle.await_init_done(Some(Duration::ZERO)).await, Ok(()));
        assert!(handle.is_alive());
        assert_eq!(sup.list().await, vec!["loop".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_runs_cleanup_and_deregisters() {
        let sup = supervisor();
        let (svc, cleanups) = Scripted::new("loop", Mode::Loop);
        let handle = sup.start(svc, true).await.unwrap();

        handle.stop();
        handle.stop();
        assert_eq!(handle.wait(None).await, Some(ServiceExit::Stopped));
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert!(!sup.is_running("loop").await);
        assert!(!handle.is_alive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_run_still_cleans_up() {
        let sup = supervisor();
        let (svc, cleanups) = Scripted::new("fail", Mode::Fail);
        let handle = sup.start(svc, false).await.unwrap();

        let exit = handle.wait(None).await.unwrap();
        assert_eq!(
            exit,
            ServiceExit::Failed(ServiceError::Fail {
                error: "boom".into()
            })
        );
        assert!(!exit.is_clean());
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert!(sup.list().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_run_is_contained() {
        let sup = supervisor();
        let (panicker, cleanups) = Scripted::new("panic", Mode::Panic);
        let (sibling, _) = Scripted::new("sibling", Mode::Loop);
        let sibling = sup.start(sibling, true).await.unwrap();
        let handle = sup.start(panicker, true).await.unwrap();

        assert_eq!(
            handle.wait(None).await,
            Some(ServiceExit::Panicked("run exploded".into()))
        );
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert!(sibling.is_alive());
        assert_eq!(sup.list().await, vec!["sibling".to_string()]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_completed_service_exits_cleanly() {
        let sup = supervisor();
        let (svc, _) = Scripted::new("once", Mode::Complete);
        let handle = sup.start(svc, false).await.unwrap();
        assert_eq!(handle.wait(None).await, Some(ServiceExit::Completed));
    }

    #[tokio::test(start_paused = true)]
    async fn test_init_failure_reported_to_synchronous_caller() {
        let sup = supervisor();
        let (svc, cleanups) = Scripted::new("broken", Mode::FailInit);
        let err = sup.start(svc, true).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::Init {
                error: "connection refused".into()
            }
        );

        sup.wait_all(None).await.unwrap();
        assert_eq!(cleanups.load(Ordering::SeqCst), 1);
        assert!(sup.list().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_name_rejected() {
        let sup = supervisor();
        let (first, _) = Scripted::new("lobby", Mode::Loop);
        let (second, _) = Scripted::new("lobby", Mode::Loop);
        sup.start(first, false).await.unwrap();

        let err = sup.start(second, false).await.unwrap_err();
        assert_eq!(
            err,
            ServiceError::AlreadyRunning {
                name: "lobby".into()
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_timeout_returns_none() {
        let sup = supervisor();
        let (svc, _) = Scripted::new("loop", Mode::Loop);
        let handle = sup.start(svc, true).await.unwrap();
        assert_eq!(handle.wait(Some(Duration::from_millis(100))).await, None);
        assert!(handle.is_alive());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_all_then_wait_all_empties_registry() {
        let sup = supervisor();
        let mut cleanups = Vec::new();
        for name in ["a", "b", "c"] {
            let (svc, c) = Scripted::new(name, Mode::Loop);
            sup.start(svc, true).await.unwrap();
            cleanups.push(c);
        }
        assert_eq!(sup.list().await.len(), 3);

        sup.stop_all().await;
        sup.wait_all(Some(Duration::from_secs(1))).await.unwrap();
        assert!(sup.list().await.is_empty());
        assert!(cleanups.iter().all(|c| c.load(Ordering::SeqCst) == 1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_reports_stuck_service() {
        let sup = supervisor();
        let mut rx = sup.bus().subscribe();
        let (stubborn, _) = Scripted::new("stubborn", Mode::Stubborn);
        let (polite, _) = Scripted::new("polite", Mode::Loop);
        sup.start(stubborn, true).await.unwrap();
        sup.start(polite, true).await.unwrap();

        let err = sup.shutdown().await.unwrap_err();
        match err {
            RuntimeError::GraceExceeded { grace, stuck } => {
                assert_eq!(grace, Duration::from_secs(5));
                assert_eq!(stuck, vec!["stubborn".to_string()]);
            }
        }

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::ShutdownRequested));
        assert!(kinds.contains(&EventKind::GraceExceeded));
    }

    #[derive(Default)]
    struct Recorder {
        seen: std::sync::Mutex<Vec<EventKind>>,
    }

    #[async_trait]
    impl Subscribe for Recorder {
        async fn on_event(&self, ev: &Event) {
            time::sleep(Duration::from_millis(5)).await;
            self.seen.lock().unwrap().push(ev.kind);
        }

        fn name(&self) -> &'static str {
            "recorder"
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_drained_before_shutdown_returns() {
        let recorder = Arc::new(Recorder::default());
        let sup = Supervisor::new(&Config::default(), vec![recorder.clone() as Arc<dyn Subscribe>]);
        let (svc, _) = Scripted::new("loop", Mode::Loop);
        sup.start(svc, true).await.unwrap();

        sup.shutdown().await.unwrap();

        let seen = recorder.seen.lock().unwrap().clone();
        assert_eq!(seen.first(), Some(&EventKind::ServiceStarting));
        assert!(seen.contains(&EventKind::ServiceStopped));
        assert_eq!(seen.last(), Some(&EventKind::AllStoppedWithin));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_supervisor_releases_subscribers() {
        let recorder = Arc::new(Recorder::default());
        let sup = Supervisor::new(&Config::default(), vec![recorder.clone() as Arc<dyn Subscribe>]);
        assert_eq!(Arc::strong_count(&recorder), 2);

        drop(sup);
        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(Arc::strong_count(&recorder), 1);
    }
}
