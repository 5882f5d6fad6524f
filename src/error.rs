use thiserror::Error;

use crate::pipe::Item;

/// Result type for stream operations
pub type Result<T> = std::result::Result<T, StreamError>;

/// Errors that can surface from a running pipeline
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StreamError {
    /// A handler received a payload of the wrong type
    #[error("{stage}: expect type {expected}, got {actual}")]
    TypeMismatch {
        /// Stage kind that performed the failed downcast ("source", "flow", "sink")
        stage: &'static str,
        /// Declared input type of the handler
        expected: &'static str,
        /// Type the payload was actually constructed from
        actual: &'static str,
    },

    /// The run was cancelled by a deadline or cancellation token
    #[error("pipeline cancelled")]
    Cancelled,

    /// A user-supplied stage function failed
    #[error("{0}")]
    Stage(String),
}

impl StreamError {
    /// Wrap a stage failure message
    pub fn stage(msg: impl Into<String>) -> Self {
        StreamError::Stage(msg.into())
    }

    /// Build the mismatch error for a payload that failed to downcast to `T`
    pub fn type_mismatch<T>(stage: &'static str, item: &Item) -> Self {
        StreamError::TypeMismatch {
            stage,
            expected: std::any::type_name::<T>(),
            actual: item.type_name(),
        }
    }
}

impl From<String> for StreamError {
    fn from(msg: String) -> Self {
        StreamError::Stage(msg)
    }
}

impl From<&str> for StreamError {
    fn from(msg: &str) -> Self {
        StreamError::Stage(msg.to_owned())
    }
}
