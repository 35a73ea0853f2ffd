//! Error types for the validation engine.

use thiserror::Error;

/// Result type for validator operations.
pub type ValidatorResult<T> = std::result::Result<T, ValidatorError>;

/// Errors raised by [`crate::RecordValidator::validate`].
///
/// These signal programmer errors — a record that is not a validation
/// subject at all, or a misconfigured resolver capability. Data-quality
/// problems are reported as issues, never as errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidatorError {
    /// The record cannot be wrapped as a node tree.
    #[error("invalid record: {message}")]
    InvalidRecord { message: String },

    /// No structural definition is resolvable for the record type.
    #[error("no structural definition found for type '{type_name}'")]
    DefinitionNotFound { type_name: String },
}

impl ValidatorError {
    /// Create an invalid record error.
    pub fn invalid_record(message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            message: message.into(),
        }
    }

    /// Create a definition-not-found error.
    pub fn definition_not_found(type_name: impl Into<String>) -> Self {
        Self::DefinitionNotFound {
            type_name: type_name.into(),
        }
    }
}

impl From<fhirbind_core::Error> for ValidatorError {
    fn from(err: fhirbind_core::Error) -> Self {
        match err {
            fhirbind_core::Error::InvalidRecord { message } => Self::InvalidRecord { message },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_names_the_type() {
        let err = ValidatorError::definition_not_found("Observation");
        assert!(format!("{}", err).contains("Observation"));
    }
}
