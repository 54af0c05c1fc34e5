//! # Function-backed creators.
//!
//! - [`CreatorFn`] wraps an async closure `FnOnce(CancellationToken) -> Fut` where
//!   `Fut` resolves to `Result<R, E>`, `R` is any [`Runner`] and `E` converts into
//!   [`BoxError`].
//! - [`DirectCreator`] never fails: it hands out a runner prepared up front.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use swarmvisor::{CreateError, CreatorFn, RunnerFn};
//!
//! let c = CreatorFn::new("db", |_build: CancellationToken| async move {
//!     Ok::<_, CreateError>(RunnerFn::new(|ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!     }))
//! });
//! # let _ = c;
//! ```

use std::borrow::Cow;
use std::future::Future;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::BoxError;
use crate::services::creator::Creator;
use crate::services::runner::{Runner, RunnerBox};

/// Function-backed creator implementation.
pub struct CreatorFn<F> {
    name: Cow<'static, str>,
    f: F,
}

impl<F, Fut, R, E> CreatorFn<F>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Runner,
    E: Into<BoxError> + 'static,
{
    /// Creates a new function-backed creator.
    pub fn new(name: impl Into<Cow<'static, str>>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut, R, E> Creator for CreatorFn<F>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: Runner,
    E: Into<BoxError> + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(self: Box<Self>, ctx: CancellationToken) -> Result<RunnerBox, BoxError> {
        let Self { f, .. } = *self;
        match f(ctx).await {
            Ok(runner) => Ok(Box::new(runner)),
            Err(e) => Err(e.into()),
        }
    }
}

impl<F> std::fmt::Debug for CreatorFn<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatorFn")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Creator that always succeeds, returning the runner it was given.
///
/// Handy for services that need no setup:
/// ```rust
/// use tokio_util::sync::CancellationToken;
/// use swarmvisor::{DirectCreator, RunnerFn, Swarm};
///
/// let swarm = Swarm::new();
/// swarm.register(DirectCreator::new("ticker", RunnerFn::new(|ctx: CancellationToken| async move {
///     ctx.cancelled().await;
/// })));
/// ```
pub struct DirectCreator {
    name: Cow<'static, str>,
    runner: RunnerBox,
}

impl DirectCreator {
    /// Wraps `runner` into a creator named `name`.
    pub fn new(name: impl Into<Cow<'static, str>>, runner: impl Runner) -> Self {
        Self {
            name: name.into(),
            runner: Box::new(runner),
        }
    }
}

#[async_trait]
impl Creator for DirectCreator {
    fn name(&self) -> &str {
        &self.name
    }

    async fn create(self: Box<Self>, _ctx: CancellationToken) -> Result<RunnerBox, BoxError> {
        Ok(self.runner)
    }
}
