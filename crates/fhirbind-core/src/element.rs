//! Element definitions within a structural definition.

use serde::{Deserialize, Serialize};

use crate::{Binding, Constraint};

/// Definition of one data element: its path, cardinality, types, binding
/// metadata and declared constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDefinition {
    /// Dotted path of the element, e.g. `Observation.code`. Choice-typed
    /// elements end in `[x]`, e.g. `Observation.value[x]`.
    pub path: String,

    /// Short description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub short: Option<String>,

    /// Minimum cardinality.
    #[serde(default)]
    pub min: u32,

    /// Maximum cardinality: `"1"`, `"*"`, or a number.
    #[serde(default = "default_max")]
    pub max: String,

    /// Concrete type names; more than one for choice-typed elements.
    #[serde(rename = "type", default, skip_serializing_if = "Vec::is_empty")]
    pub types: Vec<String>,

    /// Terminology binding, when the element is coded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binding: Option<Binding>,

    /// Constraints declared by the definition author on this element.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

fn default_max() -> String {
    "1".to_string()
}

impl Default for ElementDefinition {
    fn default() -> Self {
        Self {
            path: String::new(),
            short: None,
            min: 0,
            max: default_max(),
            types: Vec::new(),
            binding: None,
            constraints: Vec::new(),
        }
    }
}

impl ElementDefinition {
    /// Create an element definition with the given path and cardinality.
    pub fn new(path: impl Into<String>, min: u32, max: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            min,
            max: max.into(),
            ..Default::default()
        }
    }

    /// Attach a terminology binding.
    pub fn with_binding(mut self, binding: Binding) -> Self {
        self.binding = Some(binding);
        self
    }

    /// Attach concrete type names.
    pub fn with_types(mut self, types: &[&str]) -> Self {
        self.types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    /// True when the element may be absent.
    pub fn is_optional(&self) -> bool {
        self.min == 0
    }

    /// True when the element may carry more than one value.
    pub fn is_repeatable(&self) -> bool {
        self.max != "0" && self.max != "1"
    }

    /// True when the element's value may be one of several concrete types.
    pub fn is_choice(&self) -> bool {
        self.path.ends_with("[x]")
    }

    /// The field name used in expressions: the last path segment, with the
    /// choice marker stripped.
    pub fn field_name(&self) -> &str {
        let segment = self.path.rsplit('.').next().unwrap_or(&self.path);
        segment.strip_suffix("[x]").unwrap_or(segment)
    }
}
