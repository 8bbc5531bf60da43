//! Error types for the thread-events library.
//!
//! Recoverable "not found" conditions — redeeming an unknown ticket,
//! unsubscribing an unknown subscription — are expressed as `Option` and
//! `bool` returns at the call site, not as error variants. The variants
//! here cover the failures that actually abort an operation.

use thiserror::Error;

/// Type alias for Results in this crate
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for thread-events
#[derive(Error, Debug)]
pub enum Error {
    /// The async event queue already has a live consumer thread.
    #[error("event queue consumer is already running")]
    ConsumerAlreadyRunning,

    /// Spawning a named worker thread failed.
    #[error("failed to spawn thread {name:?}")]
    ThreadSpawn {
        /// Name the thread would have carried.
        name: String,
        /// The underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The owner-thread executor is no longer accepting tickets.
    #[error("owner executor is closed")]
    ExecutorClosed,

    /// A synchronous subscribe completed without producing a subscription id.
    #[error("subscribe for event type {event_type:?} produced no subscription id")]
    SubscribeFailed {
        /// Event type the request was for.
        event_type: String,
    },

    /// Event (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Generic internal error
    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new internal error with a custom message
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// Check if this error means the owner executor has gone away.
    pub fn is_executor_closed(&self) -> bool {
        matches!(self, Error::ExecutorClosed)
    }

    /// Check if this error reports a duplicate consumer start.
    pub fn is_already_running(&self) -> bool {
        matches!(self, Error::ConsumerAlreadyRunning)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::SubscribeFailed {
            event_type: "alarm".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "subscribe for event type \"alarm\" produced no subscription id"
        );
    }

    #[test]
    fn test_error_is_executor_closed() {
        assert!(Error::ExecutorClosed.is_executor_closed());
        assert!(!Error::internal("test").is_executor_closed());
    }

    #[test]
    fn test_error_is_already_running() {
        assert!(Error::ConsumerAlreadyRunning.is_already_running());
        assert!(!Error::ExecutorClosed.is_already_running());
    }
}
