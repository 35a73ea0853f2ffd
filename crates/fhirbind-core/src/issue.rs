//! Validation findings reported to callers.

use serde::{Deserialize, Serialize};

/// Severity of a reported issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// The record violates a rule.
    Error,
    /// The record deviates from a recommendation.
    Warning,
}

/// A single validation finding tied to a constraint and a location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Severity of the finding.
    pub severity: Severity,

    /// Stable machine-readable code, e.g. `constraint-failed`.
    pub code: String,

    /// Human-readable message.
    pub message: String,

    /// The source expression that produced the finding.
    pub expression: String,

    /// Definition location the finding is tied to.
    pub location: String,
}

impl Issue {
    /// Create an error-severity issue.
    pub fn error(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            code: code.into(),
            message: message.into(),
            expression: String::new(),
            location: String::new(),
        }
    }

    /// Create a warning-severity issue.
    pub fn warning(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, message)
        }
    }

    /// Attach the source expression.
    pub fn with_expression(mut self, expression: impl Into<String>) -> Self {
        self.expression = expression.into();
        self
    }

    /// Attach the definition location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }
}
