//! # Runner: the body of a running service.
//!
//! A [`Runner`] is produced by a [`Creator`](crate::Creator) during the build phase
//! and invoked exactly once in the run phase. It receives the run context as a
//! [`CancellationToken`] and is expected to keep working until that token is
//! cancelled (or until its work is done).

use std::future::Future;
use std::pin::Pin;

use tokio_util::sync::CancellationToken;

/// Boxed future returned by [`Runner::run`].
pub type BoxRunFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Owned, type-erased runner as stored by the swarm.
pub type RunnerBox = Box<dyn Runner>;

/// # Service body.
///
/// `run` consumes the runner: a runner executes at most once. It doesn't return a
/// value; failures inside the service are the service's own business.
///
/// # Example
/// ```
/// use tokio_util::sync::CancellationToken;
/// use swarmvisor::{BoxRunFuture, Runner};
///
/// struct Ticker;
///
/// impl Runner for Ticker {
///     fn run(self: Box<Self>, ctx: CancellationToken) -> BoxRunFuture {
///         Box::pin(async move {
///             ctx.cancelled().await;
///         })
///     }
/// }
/// ```
pub trait Runner: Send + 'static {
    /// Runs the service until `ctx` is cancelled or the work completes.
    fn run(self: Box<Self>, ctx: CancellationToken) -> BoxRunFuture;
}

impl Runner for RunnerBox {
    fn run(self: Box<Self>, ctx: CancellationToken) -> BoxRunFuture {
        (*self).run(ctx)
    }
}
