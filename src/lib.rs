//! # swarmvisor
//!
//! **Swarmvisor** coordinates a fixed set of independent async services that are built
//! together and run together, and ships a small fire-and-forget broadcast queue for
//! wiring them up.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Creator    │   │   Creator    │   │   Creator    │
//!     │ (service #1) │   │ (service #2) │   │ (service #3) │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Swarm (build phase, sequential)                                  │
//! │  - invokes creators in registration order with the build context  │
//! │  - first failure: cancel build context, return the error as is    │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼ all succeeded
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Instance (run phase, concurrent)                                 │
//! │  - spawns every runner with the run context                       │
//! │  - when all returned: fire done(), then cancel build context      │
//! └──────┬──────────────────┬──────────────────┬──────────────────────┘
//!        ▼                  ▼                  ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │    Runner    │   │    Runner    │   │    Runner    │
//!     └──────┬───────┘   └──────┬───────┘   └──────▲───────┘
//!            │ send             │ send             │ recv
//!            ▼                  ▼                  │
//!        ┌────────┐  bypass  ┌────────┐            │
//!        │ Queue  │ ───────► │ Queue  │ ───────────┘
//!        └────────┘          └────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! Empty ──instance()──► Building ──┬─► Failed   (terminal, no runner ever started)
//!                                  └─► Built ──start()──► Running ──all returned──► Completed
//! ```
//!
//! ## Features
//! | Area           | Description                                               | Key types / traits                         |
//! |----------------|-----------------------------------------------------------|--------------------------------------------|
//! | **Services**   | Two-phase service definition, closure-backed helpers.     | [`Creator`], [`Runner`], [`CreatorFn`], [`RunnerFn`], [`DirectCreator`] |
//! | **Swarm**      | All-or-nothing build, concurrent run, completion signal.  | [`Swarm`], [`Instance`]                    |
//! | **Queue**      | Broadcast with forwarding chains and backpressure.        | [`Queue`], [`QueueConfig`]                 |
//! | **Errors**     | Verbatim build errors and typed cause lookup.             | [`BoxError`], [`CreateError`], [`find_typed`] |
//!
//! ## Misuse
//! Starting twice, registering after start, subscribing to a bypassing queue, bypassing
//! to self or bypassing twice are programming errors: they panic instead of returning
//! an error.
//!
//! ## Logging
//! The crate emits [`tracing`] events and installs no subscriber.
//!
//! ## Example
//! ```rust
//! use tokio_util::sync::CancellationToken;
//! use swarmvisor::{CreateError, CreatorFn, Queue, RunnerFn, Swarm};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), swarmvisor::BoxError> {
//!     let events: Queue<String> = Queue::new();
//!     let mut rx = events.subscribe();
//!
//!     let swarm = Swarm::new();
//!     let tx = events.clone();
//!     swarm.register(CreatorFn::new("producer", move |_build: CancellationToken| async move {
//!         Ok::<_, CreateError>(RunnerFn::new(move |_ctx: CancellationToken| async move {
//!             tx.send("hello".to_string()).await;
//!         }))
//!     }));
//!
//!     let instance = swarm.start(&CancellationToken::new()).await?;
//!     assert_eq!(rx.recv().await.as_deref(), Some("hello"));
//!     instance.done().await;
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod queue;
mod services;

#[cfg(test)]
mod testing;

// ---- Public re-exports ----

pub use config::{DEFAULT_BUFFER_LEN, QueueConfig};
pub use crate::core::{Instance, Swarm};
pub use error::{BoxError, CreateError, find_typed};
pub use queue::Queue;
pub use services::{
    BoxRunFuture, Creator, CreatorBox, CreatorFn, DirectCreator, Runner, RunnerBox, RunnerFn,
};
