//! # Service registry - live services by name.
//!
//! The registry is the only state shared between worker tasks and the
//! coordinating caller:
//! - `Supervisor::start` → [`Registry::register`] (before the worker is spawned)
//! - worker exit         → [`Registry::deregister`] (after `cleanup`)
//! - `stop_all` / `wait_all` / `list` → snapshots under the read lock
//!
//! ## Rules
//! - Names are unique among live services; a second registration fails with
//!   [`ServiceError::AlreadyRunning`].
//! - Locks are never held across an await on a worker.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::core::handle::ServiceHandle;
use crate::error::ServiceError;

/// Name-keyed map of live services.
#[derive(Default)]
pub(crate) struct Registry {
    services: RwLock<HashMap<String, ServiceHandle>>,
}

impl Registry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Adds a handle; fails if a live service already uses the name.
    pub(crate) async fn register(&self, handle: ServiceHandle) -> Result<(), ServiceError> {
        let mut services = self.services.write().await;
        if services.contains_key(handle.name()) {
            return Err(ServiceError::AlreadyRunning {
                name: handle.name().to_string(),
            });
        }
        services.insert(handle.name().to_string(), handle);
        Ok(())
    }

    /// Removes a handle; returns `false` if it was not registered.
    pub(crate) async fn deregister(&self, name: &str) -> bool {
        self.services.write().await.remove(name).is_some()
    }

    /// Returns sorted list of live service names.
    pub(crate) async fn list(&self) -> Vec<String> {
        let services = self.services.read().await;
        let mut names: Vec<String> = services.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// Returns a snapshot of all live handles.
    pub(crate) async fn handles(&self) -> Vec<ServiceHandle> {
        self.services.read().await.values().cloned().collect()
    }

    pub(crate) async fn contains(&self, name: &str) -> bool {
        self.services.read().await.contains_key(name)
    }
}
