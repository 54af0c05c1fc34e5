//! # Queue configuration.
//!
//! Provides [`QueueConfig`], the settings a [`Queue`](crate::Queue) is built with.
//!
//! ## Sentinel values
//! - `buffer_len = 0` → clamped to 1 (bounded tokio channels need a non-zero capacity)

/// Default capacity of every subscriber channel.
pub const DEFAULT_BUFFER_LEN: usize = 1;

/// Configuration for a [`Queue`](crate::Queue).
///
/// ## Field semantics
/// - `buffer_len`: capacity of each subscriber channel. A full channel makes
///   [`Queue::send`](crate::Queue::send) wait for that subscriber (backpressure).
///
/// ## Example
/// ```rust
/// use swarmvisor::{Queue, QueueConfig};
///
/// let q: Queue<u32> = Queue::with_config(QueueConfig::default().with_buffer_len(16));
/// assert_eq!(q.buffer_len(), 16);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueConfig {
    /// Capacity of each subscriber channel (min 1; clamped by the queue).
    pub buffer_len: usize,
}

impl QueueConfig {
    /// Returns a copy with the subscriber channel capacity set to `n`.
    #[must_use]
    pub fn with_buffer_len(mut self, n: usize) -> Self {
        self.buffer_len = n;
        self
    }

    /// Returns the buffer length clamped to a minimum of 1.
    #[inline]
    pub fn buffer_len_clamped(&self) -> usize {
        self.buffer_len.max(1)
    }
}

impl Default for QueueConfig {
    /// Default configuration: `buffer_len = 1`.
    fn default() -> Self {
        Self {
            buffer_len: DEFAULT_BUFFER_LEN,
        }
    }
}
