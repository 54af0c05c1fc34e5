//! # Fire-and-forget broadcast queue.
//!
//! [`Queue`] delivers every message to all of its subscribers, each of which owns a
//! bounded [`tokio::sync::mpsc`] channel. A queue may instead *bypass* its traffic to
//! another queue, building a forward-only chain.
//!
//! ## Rules
//! - **Drop when idle**: with no subscribers and no bypass target, `send` returns at
//!   once and the message is lost. Late subscribers never see earlier messages.
//! - **Per-subscriber backpressure**: `send` waits while a subscriber's channel is
//!   full; a slow subscriber stalls the broadcast of that message.
//! - **Subscription order**: subscribers are served in the order they subscribed.
//!   There is no cross-subscriber atomicity.
//! - **Forward-only chains**: a queue bypasses to at most one queue, only once, and
//!   never to itself. Cycles are not detected; `send` on a cycle never returns.
//! - **Setup first**: `subscribe` and `bypass` are meant to run before concurrent
//!   `send` traffic starts.
//!
//! ## Example
//! ```rust
//! use swarmvisor::Queue;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let head: Queue<&str> = Queue::new();
//! let tail: Queue<&str> = Queue::new();
//! let mut rx = tail.subscribe();
//! head.bypass(&tail);
//!
//! head.send("hello").await;
//! assert_eq!(rx.recv().await, Some("hello"));
//! # }
//! ```

use std::fmt;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use tokio::sync::mpsc;

use crate::config::QueueConfig;
use crate::error::Misuse;

struct Inner<T> {
    cfg: QueueConfig,
    dsts: RwLock<Vec<mpsc::Sender<T>>>,
    bypass_to: OnceLock<Queue<T>>,
}

/// Broadcast queue with an optional forwarding target.
///
/// ### Properties
/// - **Cloneable**: clones are handles to the same queue.
/// - **Non-blocking when idle**: no subscribers, no wait.
/// - **Fire-and-forget**: no persistence, no retries.
pub struct Queue<T> {
    inner: Arc<Inner<T>>,
}

impl<T> Clone for Queue<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> fmt::Debug for Queue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Queue")
            .field("buffer_len", &self.buffer_len())
            .field("subscribers", &self.subscriber_count())
            .field("bypassing", &self.is_bypassing())
            .finish()
    }
}

impl<T> Default for Queue<T>
where
    T: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Queue<T>
where
    T: Clone + Send + 'static,
{
    /// Creates a queue whose subscriber channels hold a single message.
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    /// Creates a queue with the given configuration.
    pub fn with_config(cfg: QueueConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                cfg,
                dsts: RwLock::new(Vec::new()),
                bypass_to: OnceLock::new(),
            }),
        }
    }

    /// Subscribes to this queue.
    ///
    /// Only messages sent after this call are received. Dropping the receiver removes
    /// the subscriber from future deliveries.
    ///
    /// # Panics
    /// If this queue is already bypassing to another queue.
    pub fn subscribe(&self) -> mpsc::Receiver<T> {
        let mut dsts = self.inner.dsts.write().unwrap_or_else(PoisonError::into_inner);
        if self.is_bypassing() {
            Misuse::SubscribeWhileBypassing.raise();
        }
        let (tx, rx) = mpsc::channel(self.inner.cfg.buffer_len_clamped());
        dsts.push(tx);
        rx
    }

    /// Forwards every future [`send`](Self::send) on this queue to `to`.
    ///
    /// Subscribers this queue already has are kept but won't receive anything else.
    /// Forwarding cycles are not detected.
    ///
    /// # Panics
    /// If `to` is this very queue, or if this queue is already bypassing.
    pub fn bypass(&self, to: &Queue<T>) {
        if Arc::ptr_eq(&self.inner, &to.inner) {
            Misuse::SelfBypass.raise();
        }
        let dsts = self.inner.dsts.write().unwrap_or_else(PoisonError::into_inner);
        if self.inner.bypass_to.set(to.clone()).is_err() {
            Misuse::DoubleBypass.raise();
        }
        if !dsts.is_empty() {
            tracing::warn!(
                subscribers = dsts.len(),
                "queue with subscribers now bypasses to another queue; they will receive nothing"
            );
        }
    }

    /// Sends `value` to every subscriber of the terminal queue of the bypass chain.
    ///
    /// Returns immediately if there is nobody to deliver to. Otherwise waits, in
    /// subscription order, for room in each subscriber's channel. Subscribers whose
    /// receiver was dropped are skipped.
    pub async fn send(&self, value: T) {
        let dsts = self.terminal().senders();
        let Some((last, rest)) = dsts.split_last() else {
            tracing::trace!("no subscribers; message dropped");
            return;
        };
        for dst in rest {
            if dst.send(value.clone()).await.is_err() {
                tracing::trace!("subscriber gone; message skipped");
            }
        }
        if last.send(value).await.is_err() {
            tracing::trace!("subscriber gone; message skipped");
        }
    }

    /// Blocking variant of [`send`](Self::send) for synchronous code.
    ///
    /// # Panics
    /// If called from within an asynchronous execution context (see
    /// [`mpsc::Sender::blocking_send`]).
    pub fn blocking_send(&self, value: T) {
        let dsts = self.terminal().senders();
        let Some((last, rest)) = dsts.split_last() else {
            tracing::trace!("no subscribers; message dropped");
            return;
        };
        for dst in rest {
            if dst.blocking_send(value.clone()).is_err() {
                tracing::trace!("subscriber gone; message skipped");
            }
        }
        if last.blocking_send(value).is_err() {
            tracing::trace!("subscriber gone; message skipped");
        }
    }
}

impl<T> Queue<T> {
    /// Number of subscribers registered on this queue (not on its bypass target).
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .dsts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True if this queue forwards its traffic to another queue.
    pub fn is_bypassing(&self) -> bool {
        self.inner.bypass_to.get().is_some()
    }

    /// Effective capacity of each subscriber channel.
    pub fn buffer_len(&self) -> usize {
        self.inner.cfg.buffer_len_clamped()
    }

    /// Follows the bypass chain down to the queue that owns the subscribers.
    fn terminal(&self) -> &Queue<T> {
        let mut q = self;
        while let Some(next) = q.inner.bypass_to.get() {
            q = next;
        }
        q
    }

    /// Snapshot of the subscriber senders; the lock is not held while delivering.
    fn senders(&self) -> Vec<mpsc::Sender<T>> {
        self.inner
            .dsts
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
