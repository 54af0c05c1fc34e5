//! Broadcast queues with forwarding chains.
//!
//! ## Contents
//! - [`Queue`] fire-and-forget fan-out to bounded subscriber channels, with an
//!   optional single forwarding target
//!
//! ## Topology
//! ```text
//!   Q1 ──bypass──► Q2 ──bypass──► Q3 ──┬──► [sub 1]
//!                  ▲                   ├──► [sub 2]
//!   Q4 ──bypass────┘                   └──► [sub N]
//! ```
//! Each queue forwards to at most one other queue; many queues may forward into the
//! same one. A `send` on any queue of the chain lands on the subscribers of the
//! terminal queue (`Q3` above).

mod queue;

pub use queue::Queue;
