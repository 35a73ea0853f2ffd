//! Error types for expression compilation and evaluation.

use fhirbind_core::{CardinalityError, TerminologyError};
use thiserror::Error;

/// Result type for expression operations.
pub type Result<T> = std::result::Result<T, FhirPathError>;

/// Errors raised while compiling or evaluating an expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FhirPathError {
    /// Malformed expression text. Fatal to that expression's compilation,
    /// never to anything else.
    #[error("syntax error at position {position}: {message}")]
    Syntax {
        /// Byte offset into the expression text.
        position: usize,
        /// What was wrong.
        message: String,
    },

    /// A function was called with an argument count outside its declared
    /// range. Always fatal to compilation.
    #[error("{function}() expects {expected_min} to {expected_max} arguments, got {actual}")]
    Arity {
        /// Function name.
        function: String,
        /// Minimum declared arity.
        expected_min: usize,
        /// Maximum declared arity.
        expected_max: usize,
        /// Argument count actually supplied.
        actual: usize,
    },

    /// An operation required a singleton collection.
    #[error(transparent)]
    Cardinality(#[from] CardinalityError),

    /// The injected terminology capability failed.
    #[error(transparent)]
    Terminology(#[from] TerminologyError),
}

impl FhirPathError {
    /// Create a syntax error at a byte offset.
    pub fn syntax(position: usize, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }

    /// Create an arity error.
    pub fn arity(function: &str, expected_min: usize, expected_max: usize, actual: usize) -> Self {
        Self::Arity {
            function: function.to_string(),
            expected_min,
            expected_max,
            actual,
        }
    }
}
