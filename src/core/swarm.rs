//! # Swarm: two-phase coordinator of service creators.
//!
//! The [`Swarm`] collects [`Creator`]s and turns them into a running [`Instance`]:
//!
//! ```text
//! register(c1) register(c2) ... register(cN)
//!        │
//!        ▼
//! instance(root) ──► build = root.child_token()
//!        │
//!        ├─► c1.create(build) ─► Ok(r1)
//!        ├─► c2.create(build) ─► Ok(r2)
//!        │      ...
//!        ├─► ck.create(build) ─► Err(e) ──► build.cancel(), return Err(e)
//!        │                                  (c(k+1)..cN never invoked, no runner started)
//!        ▼
//! Ok(Instance{ r1..rN, build }) ──► Instance::start(run_ctx)
//! ```
//!
//! ## Rules
//! - Creators run **sequentially**, in registration order. When creator `k` fails,
//!   creators `1..k-1` succeeded and `k+1..N` never ran.
//! - The creator error is returned **verbatim**.
//! - Build is one-shot: a second [`instance`](Swarm::instance) or
//!   [`start`](Swarm::start) panics, and so does [`register`](Swarm::register) once the
//!   build began.
//! - A build that doesn't reach the end (creator failure, creator panic, or the build
//!   future dropped mid-way) cancels the build context. The swarm stays unusable.
//! - Cancelling `root` doesn't stop the build loop; creators see it through their
//!   build context and decide for themselves.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use swarmvisor::{CreateError, CreatorFn, RunnerFn, Swarm};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), swarmvisor::BoxError> {
//! let swarm = Swarm::new();
//! swarm.register(CreatorFn::new("http", |_build: CancellationToken| async move {
//!     Ok::<_, CreateError>(RunnerFn::new(|ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!     }))
//! }));
//!
//! let root = CancellationToken::new();
//! let instance = swarm.start(&root).await?;
//! root.cancel();
//! instance.done().await;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

use crate::core::instance::{Built, Instance};
use crate::error::{BoxError, Misuse};
use crate::services::{Creator, CreatorBox};

/// Coordinates a set of services that are built together and run together.
#[derive(Default)]
pub struct Swarm {
    started: AtomicBool,
    creators: Mutex<Vec<CreatorBox>>,
}

impl Swarm {
    /// Creates an empty swarm.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a creator. It will be invoked during the build phase, after every
    /// creator registered before it.
    ///
    /// # Panics
    /// If the build phase has already started.
    pub fn register(&self, creator: impl Creator) {
        self.register_boxed(Box::new(creator));
    }

    /// Registers an already boxed creator. See [`register`](Self::register).
    pub fn register_boxed(&self, creator: CreatorBox) {
        let mut creators = self.creators.lock().unwrap_or_else(PoisonError::into_inner);
        if self.started.load(Ordering::Acquire) {
            Misuse::RegisterAfterStart.raise();
        }
        creators.push(creator);
    }

    /// Number of registered creators not yet consumed by a build.
    pub fn len(&self) -> usize {
        self.creators
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if no creators are waiting for a build.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs the build phase and returns the built, not yet started, [`Instance`].
    ///
    /// The build context is a child of `ctx`. On the first creator failure it is
    /// cancelled and the failure is returned as is. It is also cancelled when the
    /// returned future is dropped before the build finishes, or when a creator panics.
    ///
    /// # Panics
    /// If the swarm was already built or started.
    pub async fn instance(&self, ctx: &CancellationToken) -> Result<Instance, BoxError> {
        if self.started.swap(true, Ordering::AcqRel) {
            Misuse::SwarmStartedTwice.raise();
        }
        let creators = std::mem::take(
            &mut *self.creators.lock().unwrap_or_else(PoisonError::into_inner),
        );

        let build = ctx.child_token();
        // cancels the build context if this future is dropped or a creator panics
        let guard = build.clone().drop_guard();
        let total = creators.len();
        let mut built = Vec::with_capacity(total);
        for (index, creator) in creators.into_iter().enumerate() {
            let name = creator.name().to_owned();
            tracing::debug!(creator = %name, index, total, "building");
            match creator.create(build.clone()).await {
                Ok(runner) => built.push(Built { name, runner }),
                Err(err) => {
                    build.cancel();
                    tracing::warn!(
                        creator = %name,
                        index,
                        error = %err,
                        "creator failed; build aborted"
                    );
                    return Err(err);
                }
            }
        }

        Ok(Instance::new(guard.disarm(), built))
    }

    /// Builds the swarm and, if every creator succeeded, starts all runners with `ctx`
    /// as their run context.
    ///
    /// The returned [`Instance`] is already started; keep it to wait on
    /// [`Instance::done`]. Dropping it doesn't stop the runners.
    ///
    /// # Panics
    /// If the swarm was already built or started.
    pub async fn start(&self, ctx: &CancellationToken) -> Result<Instance, BoxError> {
        let instance = self.instance(ctx).await?;
        instance.start(ctx.clone());
        Ok(instance)
    }
}

impl std::fmt::Debug for Swarm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Swarm")
            .field("started", &self.started.load(Ordering::Acquire))
            .field("creators", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::panic::AssertUnwindSafe;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use futures::FutureExt;
    use tokio::sync::mpsc;

    use super::*;
    use crate::error::CreateError;
    use crate::services::{CreatorFn, DirectCreator, RunnerBox, RunnerFn};
    use crate::testing::{eventually, recv_within};

    const WAIT: Duration = Duration::from_secs(5);

    fn noop() -> RunnerBox {
        RunnerFn::boxed(|_ctx: CancellationToken| async {})
    }

    fn blow_up() {
        panic!("runner blew up");
    }

    fn failing(msg: &'static str) -> impl Creator {
        CreatorFn::new("failing", move |_ctx: CancellationToken| async move {
            Err::<RunnerBox, _>(CreateError::fail(msg))
        })
    }

    async fn assert_done(instance: &Instance) {
        tokio::time::timeout(WAIT, instance.done())
            .await
            .expect("instance did not properly finish");
        assert!(instance.is_done());
    }

    #[tokio::test]
    async fn build_error_is_returned_verbatim() {
        let swarm = Swarm::new();
        swarm.register(failing("creation error"));

        let err = swarm
            .instance(&CancellationToken::new())
            .await
            .expect_err("build should fail");
        assert_eq!(err.to_string(), "creation failed: creation error");
        assert!(matches!(
            err.downcast_ref::<CreateError>(),
            Some(CreateError::Fail { error }) if error == "creation error"
        ));
    }

    #[tokio::test]
    async fn merged_start_reports_build_error() {
        let swarm = Swarm::new();
        swarm.register(failing("creation error"));
        assert!(swarm.start(&CancellationToken::new()).await.is_err());
    }

    #[tokio::test]
    async fn runner_is_executed_and_completes() {
        let executed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&executed);

        let swarm = Swarm::new();
        swarm.register(DirectCreator::new(
            "direct",
            RunnerFn::new(move |_ctx: CancellationToken| async move {
                flag.store(true, Ordering::SeqCst);
            }),
        ));

        let ctx = CancellationToken::new();
        let instance = swarm.instance(&ctx).await.expect("build failed");
        assert_eq!(instance.len(), 1);
        instance.start(ctx.clone());

        eventually(WAIT, || executed.load(Ordering::SeqCst)).await;
        assert_done(&instance).await;
    }

    #[tokio::test]
    async fn creator_failure_cancels_build_and_skips_the_rest() {
        let runner_started = Arc::new(AtomicBool::new(false));
        let c1_cancelled = Arc::new(AtomicBool::new(false));
        let c3_executed = Arc::new(AtomicBool::new(false));

        let swarm = Swarm::new();
        {
            let runner_started = Arc::clone(&runner_started);
            let c1_cancelled = Arc::clone(&c1_cancelled);
            swarm.register(CreatorFn::new("c1", move |ctx: CancellationToken| async move {
                tokio::spawn(async move {
                    ctx.cancelled().await;
                    c1_cancelled.store(true, Ordering::SeqCst);
                });
                Ok::<_, CreateError>(RunnerFn::new(move |_ctx: CancellationToken| async move {
                    runner_started.store(true, Ordering::SeqCst);
                }))
            }));
        }
        swarm.register(failing("creation error"));
        {
            let c3_executed = Arc::clone(&c3_executed);
            swarm.register(CreatorFn::new("c3", move |_ctx: CancellationToken| async move {
                c3_executed.store(true, Ordering::SeqCst);
                Ok::<_, CreateError>(noop())
            }));
        }

        // second creator fails: the first observes cancellation, the third never runs
        assert!(swarm.instance(&CancellationToken::new()).await.is_err());
        eventually(WAIT, || c1_cancelled.load(Ordering::SeqCst)).await;
        assert!(!c3_executed.load(Ordering::SeqCst), "c3 was executed");
        assert!(!runner_started.load(Ordering::SeqCst), "runner was started");
    }

    #[tokio::test]
    async fn creators_run_in_registration_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let swarm = Swarm::new();
        for i in 0..5 {
            let order = Arc::clone(&order);
            swarm.register(CreatorFn::new(
                format!("c{i}"),
                move |_ctx: CancellationToken| async move {
                    tokio::task::yield_now().await;
                    order.lock().unwrap().push(i);
                    Ok::<_, CreateError>(noop())
                },
            ));
        }
        assert_eq!(swarm.len(), 5);

        swarm
            .instance(&CancellationToken::new())
            .await
            .expect("build failed");
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3, 4]);
        assert!(swarm.is_empty());
    }

    #[tokio::test]
    async fn run_context_is_passed_to_every_runner() {
        let started = Arc::new(AtomicUsize::new(0));
        let exited = Arc::new(AtomicUsize::new(0));

        let swarm = Swarm::new();
        for i in 0..3 {
            let started = Arc::clone(&started);
            let exited = Arc::clone(&exited);
            swarm.register(DirectCreator::new(
                format!("r{i}"),
                RunnerFn::new(move |ctx: CancellationToken| async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    ctx.cancelled().await;
                    exited.fetch_add(1, Ordering::SeqCst);
                }),
            ));
        }

        let run_ctx = CancellationToken::new();
        let instance = swarm
            .instance(&CancellationToken::new())
            .await
            .expect("build failed");
        instance.start(run_ctx.clone());

        eventually(WAIT, || started.load(Ordering::SeqCst) == 3).await;
        assert!(!instance.is_done());

        run_ctx.cancel();
        assert_done(&instance).await;
        assert_eq!(exited.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn merged_start_runs_with_root_context() {
        let exited = Arc::new(AtomicUsize::new(0));
        let swarm = Swarm::new();
        for i in 0..3 {
            let exited = Arc::clone(&exited);
            swarm.register(CreatorFn::new(
                format!("c{i}"),
                move |_ctx: CancellationToken| async move {
                    Ok::<_, CreateError>(RunnerFn::new(move |ctx: CancellationToken| async move {
                        ctx.cancelled().await;
                        exited.fetch_add(1, Ordering::SeqCst);
                    }))
                },
            ));
        }

        let root = CancellationToken::new();
        let instance = swarm.start(&root).await.expect("build failed");
        root.cancel();
        assert_done(&instance).await;
        assert_eq!(exited.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn build_context_outlives_runners() {
        let (cancelled_tx, mut cancelled_rx) = mpsc::channel::<usize>(1);
        let exited = Arc::new(AtomicUsize::new(0));
        let stop = CancellationToken::new();

        let swarm = Swarm::new();
        {
            let exited = Arc::clone(&exited);
            let stop = stop.clone();
            swarm.register(CreatorFn::new("watcher", move |ctx: CancellationToken| {
                let seen = Arc::clone(&exited);
                async move {
                    tokio::spawn(async move {
                        ctx.cancelled().await;
                        let _ = cancelled_tx.send(seen.load(Ordering::SeqCst)).await;
                    });
                    Ok::<_, CreateError>(RunnerFn::new(move |_ctx: CancellationToken| async move {
                        stop.cancelled().await;
                        exited.fetch_add(1, Ordering::SeqCst);
                    }))
                }
            }));
        }
        {
            let exited = Arc::clone(&exited);
            let stop = stop.clone();
            swarm.register(DirectCreator::new(
                "plain",
                RunnerFn::new(move |_ctx: CancellationToken| async move {
                    stop.cancelled().await;
                    exited.fetch_add(1, Ordering::SeqCst);
                }),
            ));
        }

        let ctx = CancellationToken::new();
        let instance = swarm.start(&ctx).await.expect("build failed");
        let observer = instance.build_context();

        // while runners are alive the build context must stay untouched
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cancelled_rx.try_recv().is_err(), "build context cancelled while running");
        assert!(!observer.is_cancelled());

        stop.cancel();
        let exited_when_cancelled = recv_within(&mut cancelled_rx, WAIT).await;
        assert_eq!(exited_when_cancelled, 2, "build context cancelled before runners exited");
        assert!(instance.is_done());
        assert!(observer.is_cancelled());
        assert!(!ctx.is_cancelled(), "root context must not be cancelled by the swarm");
    }

    #[tokio::test]
    async fn root_cancellation_is_advisory_during_build() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let swarm = Swarm::new();
        for i in 0..2 {
            let invoked = Arc::clone(&invoked);
            swarm.register(CreatorFn::new(
                format!("c{i}"),
                move |ctx: CancellationToken| async move {
                    assert!(ctx.is_cancelled());
                    invoked.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, CreateError>(noop())
                },
            ));
        }

        let root = CancellationToken::new();
        root.cancel();
        let instance = swarm.instance(&root).await.expect("build failed");
        assert_eq!(invoked.load(Ordering::SeqCst), 2);
        assert_eq!(instance.len(), 2);
    }

    #[tokio::test]
    async fn empty_swarm_completes_right_away() {
        let swarm = Swarm::new();
        let instance = swarm
            .start(&CancellationToken::new())
            .await
            .expect("empty build can't fail");
        assert!(instance.is_empty());
        assert_done(&instance).await;
    }

    #[tokio::test]
    async fn panicking_runner_still_completes() {
        let swarm = Swarm::new();
        swarm.register(DirectCreator::new(
            "boom",
            RunnerFn::new(|_ctx: CancellationToken| async move { blow_up() }),
        ));
        swarm.register(DirectCreator::new("quiet", noop()));

        let instance = swarm
            .start(&CancellationToken::new())
            .await
            .expect("build failed");
        assert_done(&instance).await;
    }

    #[tokio::test]
    async fn dropping_unstarted_instance_cancels_build_context() {
        let swarm = Swarm::new();
        swarm.register(DirectCreator::new("idle", noop()));

        let instance = swarm
            .instance(&CancellationToken::new())
            .await
            .expect("build failed");
        let observer = instance.build_context();
        assert!(!observer.is_cancelled());

        drop(instance);
        assert!(observer.is_cancelled());
    }

    #[tokio::test]
    async fn dropping_started_instance_keeps_runners_alive() {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let run_ctx = CancellationToken::new();

        let swarm = Swarm::new();
        swarm.register(DirectCreator::new(
            "worker",
            RunnerFn::new(move |ctx: CancellationToken| async move {
                ctx.cancelled().await;
                let _ = tx.send(()).await;
            }),
        ));

        let instance = swarm
            .instance(&CancellationToken::new())
            .await
            .expect("build failed");
        let observer = instance.build_context();
        instance.start(run_ctx.clone());
        drop(instance);

        assert!(!observer.is_cancelled());
        run_ctx.cancel();
        recv_within(&mut rx, WAIT).await;
        eventually(WAIT, || observer.is_cancelled()).await;
    }

    #[tokio::test]
    #[should_panic(expected = "swarm instance already started")]
    async fn instance_start_twice_panics() {
        let swarm = Swarm::new();
        swarm.register(DirectCreator::new("noop", noop()));
        let instance = swarm
            .instance(&CancellationToken::new())
            .await
            .expect("build failed");
        instance.start(CancellationToken::new());
        instance.start(CancellationToken::new());
    }

    #[tokio::test]
    #[should_panic(expected = "swarm already started")]
    async fn swarm_start_twice_panics() {
        let swarm = Swarm::new();
        swarm.register(DirectCreator::new("noop", noop()));
        let ctx = CancellationToken::new();
        let _instance = swarm.start(&ctx).await.expect("build failed");
        let _ = swarm.start(&ctx).await;
    }

    #[tokio::test]
    #[should_panic(expected = "swarm already started")]
    async fn instance_after_failed_build_panics() {
        let swarm = Swarm::new();
        swarm.register(failing("creation error"));
        let ctx = CancellationToken::new();
        assert!(swarm.instance(&ctx).await.is_err());
        let _ = swarm.instance(&ctx).await;
    }

    #[tokio::test]
    async fn aborted_build_cancels_build_context() {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let swarm = Swarm::new();
        swarm.register(CreatorFn::new("watcher", move |ctx: CancellationToken| async move {
            tokio::spawn(async move {
                ctx.cancelled().await;
                let _ = tx.send(()).await;
            });
            Ok::<_, CreateError>(noop())
        }));
        swarm.register(CreatorFn::new("slow", |_ctx: CancellationToken| async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, CreateError>(noop())
        }));

        let root = CancellationToken::new();
        let res = tokio::time::timeout(Duration::from_millis(50), swarm.instance(&root)).await;
        assert!(res.is_err(), "build finished despite the slow creator");

        recv_within(&mut rx, WAIT).await;
        assert!(!root.is_cancelled(), "root context must not be cancelled by the swarm");
    }

    #[tokio::test]
    async fn panicking_creator_cancels_build_context() {
        let (tx, mut rx) = mpsc::channel::<()>(1);
        let swarm = Swarm::new();
        swarm.register(CreatorFn::new("watcher", move |ctx: CancellationToken| async move {
            tokio::spawn(async move {
                ctx.cancelled().await;
                let _ = tx.send(()).await;
            });
            Ok::<_, CreateError>(noop())
        }));
        swarm.register(CreatorFn::new("boom", |_ctx: CancellationToken| async move {
            blow_up();
            Ok::<_, CreateError>(noop())
        }));

        let root = CancellationToken::new();
        let res = AssertUnwindSafe(swarm.instance(&root)).catch_unwind().await;
        assert!(res.is_err(), "creator panic was swallowed");

        recv_within(&mut rx, WAIT).await;
        assert!(!root.is_cancelled());
    }

    #[tokio::test]
    #[should_panic(expected = "can't register new creators")]
    async fn register_after_start_panics() {
        let swarm = Swarm::new();
        swarm.register(DirectCreator::new("noop", noop()));
        let _instance = swarm
            .start(&CancellationToken::new())
            .await
            .expect("build failed");
        swarm.register(DirectCreator::new("late", noop()));
    }

    #[tokio::test]
    #[should_panic(expected = "can't register new creators")]
    async fn register_after_failed_build_panics() {
        let swarm = Swarm::new();
        swarm.register(failing("creation error"));
        assert!(swarm.instance(&CancellationToken::new()).await.is_err());
        swarm.register(DirectCreator::new("late", noop()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn concurrent_builds_let_only_one_through() {
        let invoked = Arc::new(AtomicUsize::new(0));
        let swarm = Arc::new(Swarm::new());
        {
            let invoked = Arc::clone(&invoked);
            swarm.register(CreatorFn::new("counted", move |_ctx: CancellationToken| async move {
                invoked.fetch_add(1, Ordering::SeqCst);
                Ok::<_, CreateError>(noop())
            }));
        }

        let root = CancellationToken::new();
        let attempts: Vec<_> = (0..2)
            .map(|_| {
                let swarm = Arc::clone(&swarm);
                let root = root.clone();
                tokio::spawn(async move { swarm.instance(&root).await.map(|i| i.len()) })
            })
            .collect();

        let (mut built, mut rejected) = (0, 0);
        for attempt in attempts {
            match attempt.await {
                Ok(Ok(len)) => {
                    assert_eq!(len, 1);
                    built += 1;
                }
                Ok(Err(err)) => panic!("unexpected build error: {err}"),
                Err(err) => {
                    assert!(err.is_panic());
                    rejected += 1;
                }
            }
        }
        assert_eq!((built, rejected), (1, 1));
        assert_eq!(invoked.load(Ordering::SeqCst), 1);
    }
}
