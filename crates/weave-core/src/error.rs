//! Unified error types for the Weave core engine.
//!
//! Guard errors ("next() called multiple times", foreign context) and
//! capability errors are detected as close to their source as possible and
//! reject the dispatch immediately. Errors raised by user handlers are
//! wrapped opaquely and bubble to the top-level dispatch caller unchanged;
//! the engine applies no retry and no suppression.

use thiserror::Error;

/// Type-erased error produced by a user handler.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors that can occur while dispatching an update through a pipeline.
#[derive(Debug, Error)]
pub enum WeaveError {
    /// A handler invoked its continuation more than once.
    ///
    /// The step index of a running chain is strictly increasing; a second
    /// invocation of the same continuation rewinds it and is rejected.
    #[error("next() called multiple times")]
    NextCalledMultipleTimes,

    /// A continuation was invoked with a context that does not belong to
    /// the dispatch it was created for.
    #[error("next() called with a context from another dispatch")]
    InvalidContext,

    /// An operation was invoked on a context that cannot support it.
    ///
    /// Names both the attempted operation and the current classification
    /// of the update to aid diagnosis.
    #[error("\"{method}\" is not available for \"{classification}\"")]
    Capability {
        /// The operation that was attempted.
        method: &'static str,
        /// The context's classification at the time of the call.
        classification: String,
    },

    /// A remote capability call failed.
    #[error(transparent)]
    Api(#[from] crate::api::ApiError),

    /// An error raised by a user-supplied handler.
    #[error(transparent)]
    Handler(BoxError),
}

impl WeaveError {
    /// Wraps an arbitrary handler error.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }

    /// Wraps a plain message as a handler error.
    pub fn msg(msg: impl Into<String>) -> Self {
        Self::Handler(msg.into().into())
    }
}

/// Result type for dispatch operations.
pub type WeaveResult<T> = Result<T, WeaveError>;
