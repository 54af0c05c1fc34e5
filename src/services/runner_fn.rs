//! # Function-backed runner (`RunnerFn`)
//!
//! [`RunnerFn`] wraps a closure `F: FnOnce(CancellationToken) -> Fut`. The closure is
//! called once, when the swarm starts the run phase.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use swarmvisor::RunnerFn;
//!
//! let r = RunnerFn::new(|ctx: CancellationToken| async move {
//!     ctx.cancelled().await;
//! });
//! # let _ = r;
//! ```

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::services::runner::{BoxRunFuture, Runner, RunnerBox};

/// Function-backed runner implementation.
pub struct RunnerFn<F> {
    f: F,
}

impl<F, Fut> RunnerFn<F>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    /// Creates a new function-backed runner.
    pub fn new(f: F) -> Self {
        Self { f }
    }

    /// Creates the runner and returns it type-erased, ready to be returned by a creator.
    pub fn boxed(f: F) -> RunnerBox {
        Box::new(Self::new(f))
    }
}

impl<F, Fut> Runner for RunnerFn<F>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    fn run(self: Box<Self>, ctx: CancellationToken) -> BoxRunFuture {
        Box::pin((self.f)(ctx))
    }
}

impl<F> std::fmt::Debug for RunnerFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerFn").finish_non_exhaustive()
    }
}
