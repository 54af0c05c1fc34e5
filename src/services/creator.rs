//! # Creator: deferred, fallible factory of a [`Runner`](crate::Runner).
//!
//! Creators are registered on a [`Swarm`](crate::Swarm) and invoked one after another,
//! in registration order, during the build phase. Each receives the *build context*:
//! a [`CancellationToken`] that is cancelled when a later creator fails, or once every
//! runner of the swarm has returned.
//!
//! A creator may spawn background work that watches the build context. That work is
//! guaranteed to observe cancellation either on build failure or after completion.
//! A build that never finishes (its future dropped, or a creator panicking) counts as
//! a failure.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BoxError;
use crate::services::runner::RunnerBox;

/// Owned, type-erased creator as stored by the swarm.
pub type CreatorBox = Box<dyn Creator>;

/// # Fallible factory of a service runner.
///
/// `create` consumes the creator: it is invoked at most once. Returning an error aborts
/// the whole build; the error reaches the caller unmodified.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use swarmvisor::{BoxError, Creator, RunnerBox, RunnerFn};
///
/// struct Listener { port: u16 }
///
/// #[async_trait]
/// impl Creator for Listener {
///     fn name(&self) -> &str { "listener" }
///
///     async fn create(self: Box<Self>, _ctx: CancellationToken) -> Result<RunnerBox, BoxError> {
///         let port = self.port;
///         Ok(RunnerFn::boxed(move |ctx: CancellationToken| async move {
///             let _ = port;
///             ctx.cancelled().await;
///         }))
///     }
/// }
/// ```
#[async_trait]
pub trait Creator: Send + 'static {
    /// Returns a human-readable name used in logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose - override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Builds the runner. `ctx` is the build context.
    async fn create(self: Box<Self>, ctx: CancellationToken) -> Result<RunnerBox, BoxError>;
}
