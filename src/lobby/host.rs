//! # Host: the process-level wiring.
//!
//! Owns the [`Supervisor`] and the [`Lobby`], starts the lobby, and on a
//! termination signal stops every worker and waits for them within the grace.
//!
//! ```text
//! Host::new(config, factory)
//!   ├─► Supervisor::new(config, [LogWriter])
//!   └─► Lobby::new(..).with_rounds(supervisor, factory)
//!
//! run_until_signal()
//!   start(true) ─► wait_for_shutdown_signal() ─► stop() = shutdown(grace)
//! ```

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::core::{shutdown, ServiceExit, ServiceHandle, Supervisor};
use crate::error::{HostError, ServiceError};
use crate::game::GameStarter;
use crate::lobby::Lobby;
use crate::subscribers::{LogWriter, Subscribe};
use crate::transport::TransportFactory;

/// Top-level lobby process.
pub struct Host {
    supervisor: Arc<Supervisor>,
    starter: GameStarter,
    lobby: Option<Lobby>,
    handle: Option<ServiceHandle>,
}

impl Host {
    /// Builds the supervisor (with a [`LogWriter`]) and a lobby that launches a
    /// game runner for every round.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(config: Config, factory: Arc<dyn TransportFactory>) -> Self {
        let subscribers: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
        let supervisor = Supervisor::new(&config, subscribers);
        let lobby = Lobby::new(&config, factory.as_ref()).with_rounds(
            &config,
            Arc::clone(&supervisor),
            factory,
        );

        Self {
            supervisor,
            starter: lobby.starter(),
            lobby: Some(lobby),
            handle: None,
        }
    }

    /// The supervisor every worker of this host runs under.
    pub fn supervisor(&self) -> &Arc<Supervisor> {
        &self.supervisor
    }

    /// Shared view of the lobby's state machine.
    pub fn starter(&self) -> GameStarter {
        self.starter.clone()
    }

    /// Starts the lobby; see [`Supervisor::start`] for `synchronous_init`.
    ///
    /// A host starts its lobby once; later calls fail with
    /// [`ServiceError::AlreadyRunning`].
    pub async fn start(&mut self, synchronous_init: bool) -> Result<ServiceHandle, ServiceError> {
        let Some(lobby) = self.lobby.take() else {
            return Err(ServiceError::AlreadyRunning {
                name: "lobby".to_string(),
            });
        };
        let handle = self.supervisor.start(lobby, synchronous_init).await?;
        self.handle = Some(handle.clone());
        Ok(handle)
    }

    /// Stops every worker and waits for them within the configured grace.
    pub async fn stop(&self) -> Result<(), HostError> {
        self.supervisor.shutdown().await?;
        Ok(())
    }

    /// Waits for the lobby and every round it launched to exit, then returns
    /// the lobby's outcome. `None` if it was never started.
    pub async fn wait(&self) -> Option<ServiceExit> {
        let handle = self.handle.as_ref()?;
        let exit = handle.wait(None).await;
        if let Err(err) = self.supervisor.wait_all(None).await {
            warn!(target: "lobbyvisor::host", label = err.as_label(), error = %err, "workers still running");
        }
        exit
    }

    /// Starts the lobby, blocks until a termination signal, then shuts down.
    ///
    /// If the lobby exits on its own first, the remaining workers are shut down
    /// as well.
    pub async fn run_until_signal(&mut self) -> Result<(), HostError> {
        let handle = self.start(true).await?;
        info!(target: "lobbyvisor::host", services = ?self.supervisor.list().await, "host running");

        tokio::select! {
            signal = shutdown::wait_for_shutdown_signal() => match signal {
                Ok(name) => info!(target: "lobbyvisor::host", signal = name, "termination signal"),
                Err(err) => {
                    warn!(target: "lobbyvisor::host", error = %err, "signal handler failed");
                    self.stop().await?;
                    return Err(HostError::Signal(err));
                }
            },
            exit = handle.wait(None) => {
                warn!(target: "lobbyvisor::host", exit = ?exit, "lobby exited");
            }
        }
        self.stop().await
    }
}
