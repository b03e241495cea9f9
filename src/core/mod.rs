//! Runtime core: supervised services and their lifecycle.
//!
//! Public API from this module:
//! - [`Service`]: the init/run/cleanup contract a worker implements;
//! - [`ServiceContext`]: what a running service sees (cancellation, sleep, events);
//! - [`ServiceHandle`] / [`ServiceExit`]: control and outcome of one started service;
//! - [`Supervisor`]: the injected registry that starts, stops and waits for services.
//!
//! Internal modules:
//! - [`worker`]: the spawned body enforcing init → run → cleanup → deregister;
//! - [`registry`]: name → handle map of live services;
//! - [`shutdown`]: cross-platform termination signal handling.

mod context;
mod handle;
mod registry;
mod service;
pub(crate) mod shutdown;
mod supervisor;
mod worker;

pub use context::ServiceContext;
pub use handle::{ServiceExit, ServiceHandle};
pub use service::Service;
pub use supervisor::Supervisor;
