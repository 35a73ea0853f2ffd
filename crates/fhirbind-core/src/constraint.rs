//! Severity-tagged boolean constraints over a record.

use serde::{Deserialize, Serialize};

/// Location used for constraints declared at the definition root.
pub const BASE_LOCATION: &str = "(base)";

/// Severity of a constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintSeverity {
    /// Violation is an error.
    Rule,
    /// Violation is a warning.
    Warning,
}

impl ConstraintSeverity {
    /// Parse a severity name; accepts the FHIR spelling `error` for rules.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "rule" | "error" => Some(ConstraintSeverity::Rule),
            "warning" => Some(ConstraintSeverity::Warning),
            _ => None,
        }
    }
}

/// Whether a constraint was authored or synthesized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintSource {
    /// Declared by the definition author.
    #[default]
    Declared,
    /// Synthesized by the constraint generator from binding metadata.
    Generated,
}

/// A named boolean expression that must hold for a valid record.
///
/// Constraints are created once per structural definition and immutable
/// thereafter; the per-definition list order is part of the contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Constraint {
    /// Stable identifier of the constraint.
    pub key: String,

    /// Severity of a violation.
    pub severity: ConstraintSeverity,

    /// Path into the structural definition, or `(base)`.
    #[serde(default)]
    pub location: String,

    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human: Option<String>,

    /// Expression text evaluated against the record.
    pub expression: String,

    /// Provenance of the constraint.
    #[serde(default)]
    pub source: ConstraintSource,
}

impl Constraint {
    /// Create a declared rule-severity constraint.
    pub fn rule(key: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            severity: ConstraintSeverity::Rule,
            location: String::new(),
            human: None,
            expression: expression.into(),
            source: ConstraintSource::Declared,
        }
    }

    /// Create a declared warning-severity constraint.
    pub fn warning(key: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            severity: ConstraintSeverity::Warning,
            ..Self::rule(key, expression)
        }
    }

    /// Attach a human-readable description.
    pub fn with_human(mut self, human: impl Into<String>) -> Self {
        self.human = Some(human.into());
        self
    }

    /// Attach a definition location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    /// True when a violation of this constraint is an error.
    pub fn is_error(&self) -> bool {
        self.severity == ConstraintSeverity::Rule
    }
}
