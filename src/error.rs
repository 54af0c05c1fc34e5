//! Error types used by swarm creators and the coordinator runtime.
//!
//! Two classes of failure exist:
//!
//! - **Build failures**: a [`Creator`](crate::Creator) returns an error. It travels
//!   as [`BoxError`] and reaches the caller of
//!   [`Swarm::instance`](crate::Swarm::instance) unmodified. [`CreateError`] is a
//!   ready-made error type for creators that don't need their own.
//! - **Precondition violations**: misuse of one-shot or topology rules
//!   (double start, register after start, subscribe while bypassing...). These
//!   are never returned; they panic through [`Misuse::raise`].
//!
//! [`find_typed`] walks an error's `source()` chain looking for a concrete type.

use std::error::Error as StdError;
use thiserror::Error;

/// Type-erased error returned by creators and propagated verbatim by the swarm.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// # Errors produced by creators.
///
/// Creators may return any error convertible into [`BoxError`]; this enum covers the
/// common cases so small creators don't need a dedicated type.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CreateError {
    /// The component could not be built.
    #[error("creation failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The build context was cancelled before the component was ready.
    #[error("build context cancelled")]
    Canceled,
}

impl CreateError {
    /// Shorthand for [`CreateError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        CreateError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use swarmvisor::CreateError;
    ///
    /// assert_eq!(CreateError::fail("boom").as_label(), "create_failed");
    /// assert_eq!(CreateError::Canceled.as_label(), "create_canceled");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            CreateError::Fail { .. } => "create_failed",
            CreateError::Canceled => "create_canceled",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            CreateError::Fail { error } => format!("error: {error}"),
            CreateError::Canceled => "build context cancelled".to_string(),
        }
    }
}

/// Protocol misuse. Raised as a panic, never returned.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Misuse {
    #[error("swarm already started")]
    SwarmStartedTwice,

    #[error("swarm already started: can't register new creators")]
    RegisterAfterStart,

    #[error("swarm instance already started")]
    InstanceStartedTwice,

    #[error("queue is already bypassing data to another queue: can't subscribe to it")]
    SubscribeWhileBypassing,

    #[error("queue can't bypass to itself")]
    SelfBypass,

    #[error("queue is already bypassing to another queue")]
    DoubleBypass,
}

impl Misuse {
    pub(crate) fn as_label(&self) -> &'static str {
        match self {
            Misuse::SwarmStartedTwice => "swarm_started_twice",
            Misuse::RegisterAfterStart => "swarm_register_after_start",
            Misuse::InstanceStartedTwice => "instance_started_twice",
            Misuse::SubscribeWhileBypassing => "queue_subscribe_while_bypassing",
            Misuse::SelfBypass => "queue_self_bypass",
            Misuse::DoubleBypass => "queue_double_bypass",
        }
    }

    /// Logs the violation and aborts the calling path.
    #[track_caller]
    pub(crate) fn raise(self) -> ! {
        tracing::error!(misuse = self.as_label(), "{self}");
        panic!("{self}")
    }
}

/// Returns the first error in `err`'s cause chain whose concrete type is `E`.
///
/// The chain starts at `err` itself and continues through
/// [`source()`](std::error::Error::source). `None` means no cause matched.
///
/// # Example
/// ```
/// use swarmvisor::{find_typed, BoxError, CreateError};
///
/// let err: BoxError = Box::new(CreateError::fail("port in use"));
/// let found = find_typed::<CreateError>(err.as_ref());
/// assert!(matches!(found, Some(CreateError::Fail { .. })));
/// assert!(find_typed::<std::io::Error>(err.as_ref()).is_none());
/// ```
pub fn find_typed<'a, E>(err: &'a (dyn StdError + 'static)) -> Option<&'a E>
where
    E: StdError + 'static,
{
    let mut cause = Some(err);
    while let Some(e) = cause {
        if let Some(found) = e.downcast_ref::<E>() {
            return Some(found);
        }
        cause = e.source();
    }
    None
}
