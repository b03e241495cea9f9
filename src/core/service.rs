//! # Supervised service contract.
//!
//! A [`Service`] is one long-running background worker with three phases. The
//! supervisor drives them in a fixed order on a dedicated tokio task:
//!
//! ```text
//! init() ──► init-done ──► run() (under cancellation) ──► cleanup() ──► deregister
//!   │                         │
//!   └─ Err ─► InitFailed ─────┴─ Ok / Err / panic / Stopped ──► cleanup() always runs
//! ```
//!
//! ## Rules
//! - `init` creates connections and subscriptions; callers may block on it via
//!   `Supervisor::start(service, true)`.
//! - `run` observes stop requests through [`ServiceContext::sleep`], which returns
//!   [`ServiceError::Stopped`]; propagating it with `?` is a normal exit.
//! - `cleanup` must be idempotent; it also runs after a failed `init`.

use async_trait::async_trait;

use crate::core::context::ServiceContext;
use crate::error::ServiceError;

/// # Background worker driven by the [`Supervisor`](crate::Supervisor).
///
/// # Example
/// ```
/// use std::time::Duration;
/// use async_trait::async_trait;
/// use lobbyvisor::{Service, ServiceContext, ServiceError};
///
/// struct Ticker;
///
/// #[async_trait]
/// impl Service for Ticker {
///     fn name(&self) -> &str { "ticker" }
///
///     async fn run(&mut self, ctx: &ServiceContext) -> Result<(), ServiceError> {
///         loop {
///             ctx.sleep(Duration::from_millis(250)).await?;
///             // tick...
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Service: Send + 'static {
    /// Returns the registry name; must be unique among live services.
    fn name(&self) -> &str;

    /// Setup before init-done is signalled. Default: nothing to do.
    async fn init(&mut self, _ctx: &ServiceContext) -> Result<(), ServiceError> {
        Ok(())
    }

    /// Main loop.
    async fn run(&mut self, ctx: &ServiceContext) -> Result<(), ServiceError>;

    /// Resource release, called exactly once on every exit path. Default: nothing to do.
    async fn cleanup(&mut self, _ctx: &ServiceContext) {}
}
