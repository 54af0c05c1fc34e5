//! Runtime core: the build/run protocol.
//!
//! The public API from this module is [`Swarm`] and [`Instance`].
//!
//! Internal modules:
//! - [`swarm`]: creator registration, the sequential build phase, the one-shot gate;
//! - [`instance`]: concurrent run phase, completion signal, build-context cleanup.

mod instance;
mod swarm;

pub use instance::Instance;
pub use swarm::Swarm;
