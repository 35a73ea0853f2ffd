//! Validation engine.
//!
//! Compiles and runs every declared and generated constraint against a
//! record instance. Validation never stops at the first failing constraint:
//! a broken constraint yields one issue and the batch continues.

use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use fhirbind_core::{
    Collection, Constraint, ConstraintSeverity, DefinitionResolver, Issue, Node,
    TerminologyProvider,
};
use fhirbind_fhirpath::{Evaluator, FhirPathError};

use crate::cache::ExpressionCache;
use crate::error::{ValidatorError, ValidatorResult};
use crate::generator::ConstraintGenerator;

/// Validator for record instances.
///
/// Holds the injected capabilities (definition resolution, terminology
/// membership) and the shared compiled-expression cache.
pub struct RecordValidator {
    definitions: Arc<dyn DefinitionResolver>,
    generator: ConstraintGenerator,
    evaluator: Evaluator,
    cache: Arc<ExpressionCache>,
}

impl RecordValidator {
    /// Create a validator over the given definition resolver. Without a
    /// terminology capability, membership checks yield no result and decide
    /// nothing.
    pub fn new(definitions: Arc<dyn DefinitionResolver>) -> Self {
        Self {
            definitions,
            generator: ConstraintGenerator::new(),
            evaluator: Evaluator::new(),
            cache: Arc::new(ExpressionCache::new()),
        }
    }

    /// Inject a terminology membership capability.
    pub fn with_terminology(mut self, terminology: Arc<dyn TerminologyProvider>) -> Self {
        self.evaluator = Evaluator::with_terminology(terminology);
        self
    }

    /// Share a compiled-expression cache with other validators. Compilation
    /// is pure, so the cache is safe across instances and threads.
    pub fn with_cache(mut self, cache: Arc<ExpressionCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Validate a record, returning one issue per failed or warned
    /// constraint in constraint order.
    ///
    /// Errors are reserved for unusable inputs: a record that is not a JSON
    /// object with a `resourceType`, or a type the injected resolver does
    /// not know.
    pub fn validate(&self, record: &Value) -> ValidatorResult<Vec<Issue>> {
        let root = Node::root(record)?;
        let type_name = root.type_name().to_string();
        let definition = self
            .definitions
            .resolve_type(&type_name)
            .ok_or_else(|| ValidatorError::definition_not_found(&type_name))?;

        let constraints = self.generator.generate(&definition);
        let context = Collection::from_node(root);

        let mut issues = Vec::new();
        for constraint in &constraints {
            self.check_constraint(constraint, &context, &mut issues);
        }

        debug!(
            record_type = %type_name,
            constraints = constraints.len(),
            issues = issues.len(),
            "validation finished"
        );
        Ok(issues)
    }

    fn check_constraint(
        &self,
        constraint: &Constraint,
        context: &Collection<'_>,
        issues: &mut Vec<Issue>,
    ) {
        let compiled = match self.cache.get_or_compile(&constraint.expression) {
            Ok(compiled) => compiled,
            Err(err) => {
                // A compile failure is fatal to this constraint only.
                issues.push(self.issue(
                    constraint,
                    "invalid-expression",
                    format!("Constraint {} cannot be compiled: {}", constraint.key, err),
                ));
                return;
            }
        };

        match self.evaluator.evaluate(&compiled, context) {
            Ok(result) => {
                // Only an explicit false is a violation; true or empty pass.
                if result.single_boolean() == Some(false) {
                    let message = constraint.human.clone().unwrap_or_else(|| {
                        format!(
                            "Constraint {} violated: {}",
                            constraint.key, constraint.expression
                        )
                    });
                    issues.push(self.issue(constraint, "constraint-failed", message));
                }
            }
            Err(FhirPathError::Terminology(err)) => {
                issues.push(self.issue(
                    constraint,
                    "terminology-unavailable",
                    format!("Constraint {} could not be checked: {}", constraint.key, err),
                ));
            }
            Err(err) => {
                issues.push(self.issue(
                    constraint,
                    "evaluation-failed",
                    format!("Constraint {} could not be evaluated: {}", constraint.key, err),
                ));
            }
        }
    }

    fn issue(&self, constraint: &Constraint, code: &str, message: String) -> Issue {
        let issue = match constraint.severity {
            ConstraintSeverity::Rule => Issue::error(code, message),
            ConstraintSeverity::Warning => Issue::warning(code, message),
        };
        issue
            .with_expression(constraint.expression.as_str())
            .with_location(constraint.location.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fhirbind_core::{
        Binding, BindingStrength, ElementDefinition, InMemoryDefinitionResolver, Severity,
        StructureDefinition,
    };
    use serde_json::json;

    fn resolver() -> Arc<InMemoryDefinitionResolver> {
        let mut resolver = InMemoryDefinitionResolver::new();
        resolver.add(
            StructureDefinition::new("http://example.org/sd/patient", "Pat", "Patient")
                .with_element(
                    ElementDefinition::new("Patient.gender", 1, "1")
                        .with_binding(Binding::new(
                            BindingStrength::Required,
                            "http://example.org/vs/gender",
                        )),
                ),
        );
        Arc::new(resolver)
    }

    #[test]
    fn rejects_records_that_are_not_validation_subjects() {
        let validator = RecordValidator::new(resolver());

        let err = validator.validate(&json!("not an object")).unwrap_err();
        assert!(matches!(err, ValidatorError::InvalidRecord { .. }));

        let err = validator.validate(&json!({ "id": "x" })).unwrap_err();
        assert!(matches!(err, ValidatorError::InvalidRecord { .. }));
    }

    #[test]
    fn unresolvable_type_is_an_error_not_an_issue() {
        let validator = RecordValidator::new(resolver());
        let err = validator
            .validate(&json!({ "resourceType": "Medication" }))
            .unwrap_err();
        assert_eq!(
            err,
            ValidatorError::definition_not_found("Medication")
        );
    }

    #[test]
    fn missing_required_field_is_one_error() {
        let validator = RecordValidator::new(resolver());
        let issues = validator
            .validate(&json!({ "resourceType": "Patient" }))
            .unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].code, "constraint-failed");
        assert_eq!(issues[0].location, "Patient.gender");
    }

    #[test]
    fn issues_carry_expression_and_location() {
        let validator = RecordValidator::new(resolver());
        let issues = validator
            .validate(&json!({ "resourceType": "Patient" }))
            .unwrap();
        assert!(issues[0].expression.contains("gender.exists()"));
    }
}
