//! Error types shared across the core data model.

use thiserror::Error;

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while wrapping an external record as a node tree.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The record is not usable as a validation subject.
    #[error("invalid record: {message}")]
    InvalidRecord {
        /// What made the record unusable.
        message: String,
    },
}

impl Error {
    /// Create an invalid record error.
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }
}

/// An operation required a singleton collection but received zero or more
/// than one element.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{context}: expected a singleton collection, found {actual} elements")]
pub struct CardinalityError {
    /// Number of elements actually present.
    pub actual: usize,
    /// The operation or operator that required the singleton.
    pub context: String,
}

impl CardinalityError {
    /// Create a cardinality error for the given operation context.
    pub fn new(context: impl Into<String>, actual: usize) -> Self {
        Self {
            actual,
            context: context.into(),
        }
    }
}
