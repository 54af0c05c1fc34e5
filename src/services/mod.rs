//! # Service abstractions: creators and runners.
//!
//! A service goes through two phases, each with its own trait:
//! - [`Creator`] - fallible, async factory invoked during the build phase
//! - [`Runner`] - the service body, invoked once during the run phase
//!
//! Closure-backed implementations:
//! - [`CreatorFn`] - wraps `FnOnce(CancellationToken) -> Future<Output = Result<R, E>>`
//! - [`DirectCreator`] - a creator that can't fail and hands out a prepared runner
//! - [`RunnerFn`] - wraps `FnOnce(CancellationToken) -> Future<Output = ()>`

mod creator;
mod creator_fn;
mod runner;
mod runner_fn;

pub use creator::{Creator, CreatorBox};
pub use creator_fn::{CreatorFn, DirectCreator};
pub use runner::{BoxRunFuture, Runner, RunnerBox};
pub use runner_fn::RunnerFn;
