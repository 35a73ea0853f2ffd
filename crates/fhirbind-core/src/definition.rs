//! Structural definitions and their resolution.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{Constraint, ElementDefinition};

/// A structural definition: the ordered element list and declared
/// constraints for one record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructureDefinition {
    /// Canonical URL of the definition.
    pub url: String,

    /// Computable name.
    pub name: String,

    /// The record type this definition constrains.
    #[serde(rename = "type")]
    pub type_name: String,

    /// Element definitions in declaration order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub elements: Vec<ElementDefinition>,

    /// Constraints declared at the definition root.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub constraints: Vec<Constraint>,
}

impl StructureDefinition {
    /// Create an empty definition for a record type.
    pub fn new(url: impl Into<String>, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: name.into(),
            type_name: type_name.into(),
            elements: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Append an element definition, preserving declaration order.
    pub fn with_element(mut self, element: ElementDefinition) -> Self {
        self.elements.push(element);
        self
    }

    /// Append a definition-level declared constraint.
    pub fn with_constraint(mut self, constraint: Constraint) -> Self {
        self.constraints.push(constraint);
        self
    }
}

/// Capability for resolving structural definitions.
///
/// Injected explicitly into the constraint generator and validator; there is
/// no ambient global registry.
pub trait DefinitionResolver: Send + Sync {
    /// Resolve a definition by canonical URL.
    fn resolve(&self, url: &str) -> Option<Arc<StructureDefinition>>;

    /// Resolve the definition applicable to a record type.
    fn resolve_type(&self, type_name: &str) -> Option<Arc<StructureDefinition>>;
}

/// In-memory definition resolver backed by two lookup maps.
#[derive(Debug, Default)]
pub struct InMemoryDefinitionResolver {
    by_url: HashMap<String, Arc<StructureDefinition>>,
    by_type: HashMap<String, Arc<StructureDefinition>>,
}

impl InMemoryDefinitionResolver {
    /// Create an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition under its URL and record type.
    pub fn add(&mut self, definition: StructureDefinition) {
        debug!(url = %definition.url, type_name = %definition.type_name, "registered definition");
        let definition = Arc::new(definition);
        self.by_url
            .insert(definition.url.clone(), definition.clone());
        self.by_type
            .insert(definition.type_name.clone(), definition);
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.by_url.len()
    }

    /// True when no definitions are registered.
    pub fn is_empty(&self) -> bool {
        self.by_url.is_empty()
    }
}

impl DefinitionResolver for InMemoryDefinitionResolver {
    fn resolve(&self, url: &str) -> Option<Arc<StructureDefinition>> {
        self.by_url.get(url).cloned()
    }

    fn resolve_type(&self, type_name: &str) -> Option<Arc<StructureDefinition>> {
        self.by_type.get(type_name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolver_finds_by_url_and_type() {
        let mut resolver = InMemoryDefinitionResolver::new();
        resolver.add(StructureDefinition::new(
            "http://example.org/StructureDefinition/vitals",
            "Vitals",
            "Observation",
        ));

        assert_eq!(resolver.len(), 1);
        assert!(resolver
            .resolve("http://example.org/StructureDefinition/vitals")
            .is_some());
        assert!(resolver.resolve_type("Observation").is_some());
        assert!(resolver.resolve_type("Patient").is_none());
    }

    #[test]
    fn definition_preserves_element_order() {
        let definition = StructureDefinition::new("u", "N", "Observation")
            .with_element(ElementDefinition::new("Observation.status", 1, "1"))
            .with_element(ElementDefinition::new("Observation.code", 1, "1"));
        assert_eq!(definition.elements[0].path, "Observation.status");
        assert_eq!(definition.elements[1].path, "Observation.code");
    }
}
