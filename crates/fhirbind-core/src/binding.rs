//! Terminology binding metadata.

use serde::{Deserialize, Serialize};

/// How strictly a coded field must draw its value from a value set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BindingStrength {
    /// The value must come from the value set.
    Required,
    /// The value should come from the value set; otherwise it must satisfy
    /// the wider max value set when one is declared.
    Extensible,
    /// The value should come from the value set, informationally.
    Preferred,
}

impl BindingStrength {
    /// The canonical lowercase name of the strength.
    pub fn as_str(&self) -> &'static str {
        match self {
            BindingStrength::Required => "required",
            BindingStrength::Extensible => "extensible",
            BindingStrength::Preferred => "preferred",
        }
    }

    /// Parse a strength name.
    pub fn parse(text: &str) -> Option<Self> {
        match text {
            "required" => Some(BindingStrength::Required),
            "extensible" => Some(BindingStrength::Extensible),
            "preferred" => Some(BindingStrength::Preferred),
            _ => None,
        }
    }
}

impl std::fmt::Display for BindingStrength {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Binding of a coded element to its terminology value sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    /// Binding strength for the primary value set.
    pub strength: BindingStrength,

    /// Canonical URL of the primary value set.
    #[serde(rename = "valueSet")]
    pub value_set: String,

    /// Canonical URL of the wider "max" value set, when declared.
    #[serde(rename = "maxValueSet", skip_serializing_if = "Option::is_none")]
    pub max_value_set: Option<String>,

    /// Description of the binding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Binding {
    /// Create a binding to a primary value set.
    pub fn new(strength: BindingStrength, value_set: impl Into<String>) -> Self {
        Self {
            strength,
            value_set: value_set.into(),
            max_value_set: None,
            description: None,
        }
    }

    /// Attach a max value set.
    pub fn with_max_value_set(mut self, value_set: impl Into<String>) -> Self {
        self.max_value_set = Some(value_set.into());
        self
    }
}
