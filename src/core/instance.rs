//! # Instance: a fully built swarm, ready to run.
//!
//! An [`Instance`] is what a successful build phase produces. It owns the built runners
//! and the build context, which is kept alive so background work spawned by creators
//! keeps running while the services do.
//!
//! ## Run phase
//! ```text
//! Instance::start(run_ctx)
//!   ├─► JoinSet.spawn(runner_1.run(run_ctx))
//!   ├─► JoinSet.spawn(runner_2.run(run_ctx))
//!   ├─► ...
//!   └─► join task:
//!         wait for every runner
//!         ├─► done.cancel()    (completion signal)
//!         └─► build.cancel()   (releases build-phase background work)
//! ```
//!
//! ## Rules
//! - `start` is one-shot; a second call panics.
//! - Runners have no ordering guarantee among themselves.
//! - The completion signal fires strictly after every runner returned (a panicking
//!   runner counts as returned), and the build context is cancelled after it.
//! - An instance dropped without being started cancels its build context.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use futures::FutureExt;
use tokio::task::JoinSet;
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

use crate::error::Misuse;
use crate::services::RunnerBox;

/// A runner together with the name of the creator that built it.
pub(crate) struct Built {
    pub(crate) name: String,
    pub(crate) runner: RunnerBox,
}

/// Running (or ready-to-run) swarm.
///
/// Returned by [`Swarm::instance`](crate::Swarm::instance) and
/// [`Swarm::start`](crate::Swarm::start).
pub struct Instance {
    build: CancellationToken,
    runners: Mutex<Vec<Built>>,
    len: usize,
    started: AtomicBool,
    done: CancellationToken,
}

impl Instance {
    pub(crate) fn new(build: CancellationToken, runners: Vec<Built>) -> Self {
        Self {
            build,
            len: runners.len(),
            runners: Mutex::new(runners),
            started: AtomicBool::new(false),
            done: CancellationToken::new(),
        }
    }

    /// Starts every runner concurrently, each receiving `ctx` as its run context.
    ///
    /// Returns immediately; use [`done`](Self::done) to wait for the runners to exit.
    ///
    /// # Panics
    /// If the instance was already started, or if called outside a tokio runtime.
    pub fn start(&self, ctx: CancellationToken) {
        if self.started.swap(true, Ordering::AcqRel) {
            Misuse::InstanceStartedTwice.raise();
        }
        let runners =
            std::mem::take(&mut *self.runners.lock().unwrap_or_else(PoisonError::into_inner));

        let mut set = JoinSet::new();
        for Built { name, runner } in runners {
            let fut = runner.run(ctx.clone());
            tracing::debug!(runner = %name, "runner started");
            set.spawn(async move {
                match AssertUnwindSafe(fut).catch_unwind().await {
                    Ok(()) => tracing::debug!(runner = %name, "runner exited"),
                    Err(panic) => tracing::error!(
                        runner = %name,
                        panic = panic_message(panic.as_ref()),
                        "runner panicked"
                    ),
                }
            });
        }

        let done = self.done.clone();
        let build = self.build.clone();
        tokio::spawn(async move {
            while let Some(res) = set.join_next().await {
                if let Err(err) = res {
                    tracing::warn!(error = %err, "runner task did not complete");
                }
            }
            tracing::debug!("all runners exited");
            done.cancel();
            build.cancel();
        });
    }

    /// Completion signal: resolves once every runner has returned.
    ///
    /// Can be called any number of times; each returned future resolves on the same
    /// event. Never resolves if the instance is never started.
    pub fn done(&self) -> WaitForCancellationFutureOwned {
        self.done.clone().cancelled_owned()
    }

    /// True once every runner has returned.
    pub fn is_done(&self) -> bool {
        self.done.is_cancelled()
    }

    /// Returns a token that observes the build context.
    ///
    /// It is cancelled on completion (or when an unstarted instance is dropped).
    /// Cancelling the returned token does not affect the build context.
    pub fn build_context(&self) -> CancellationToken {
        self.build.child_token()
    }

    /// Number of runners built.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the swarm had no creators.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for Instance {
    fn drop(&mut self) {
        if !*self.started.get_mut() {
            self.build.cancel();
        }
    }
}

impl std::fmt::Debug for Instance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instance")
            .field("len", &self.len)
            .field("started", &self.started.load(Ordering::Acquire))
            .field("done", &self.is_done())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "unknown panic payload"
    }
}
