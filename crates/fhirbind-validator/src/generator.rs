//! Constraint synthesis from binding metadata.
//!
//! For each element carrying a binding, constraints are synthesized from the
//! (choice-type x optional x repeatable) shape of the element, in a fixed
//! order matching declaration order in the definition. Callers index into
//! the returned list, so positions are part of the contract: declared
//! constraints precede generated ones, per element.
//!
//! Severity rules: the primary value-set assertion is a rule only under
//! `required` strength. Under `extensible` or `preferred` strength the
//! primary assertion is demoted to a warning and the max value set, when
//! declared, carries the rule. Existence is asserted only within a
//! rule-severity constraint; warning constraints are always guarded with
//! `exists() implies` so that absence alone never warns.

use fhirbind_core::{
    Binding, BindingStrength, Constraint, ConstraintSeverity, ConstraintSource,
    ElementDefinition, StructureDefinition, BASE_LOCATION,
};
use tracing::debug;

/// Generator turning structural definitions into ordered constraint lists.
#[derive(Debug, Default)]
pub struct ConstraintGenerator;

impl ConstraintGenerator {
    /// Create a generator.
    pub fn new() -> Self {
        Self
    }

    /// Produce the full ordered constraint list for a definition: declared
    /// definition-level constraints, then per element in declaration order
    /// its declared constraints followed by its generated ones.
    pub fn generate(&self, definition: &StructureDefinition) -> Vec<Constraint> {
        let mut constraints = Vec::new();

        for declared in &definition.constraints {
            constraints.push(normalize_declared(declared, BASE_LOCATION));
        }

        for element in &definition.elements {
            for declared in &element.constraints {
                constraints.push(normalize_declared(declared, &element.path));
            }
            self.generate_for_element(element, &mut constraints);
        }

        debug!(
            definition = %definition.url,
            count = constraints.len(),
            "gathered constraints"
        );
        constraints
    }

    fn generate_for_element(&self, element: &ElementDefinition, out: &mut Vec<Constraint>) {
        // A field with no binding receives no generated constraint.
        let Some(binding) = &element.binding else {
            return;
        };
        if binding.value_set.is_empty() {
            return;
        }

        let mut keys = KeySequence::new(&element.path);
        let field = element.field_name();

        if element.is_choice() {
            let has_rule_tier = binding.strength == BindingStrength::Required
                || binding.max_value_set.is_some();
            if has_rule_tier && !element.is_optional() {
                // Presence of the choice field is asserted once, not per type.
                out.push(generated(
                    ConstraintSeverity::Rule,
                    keys.next(),
                    &element.path,
                    format!("{}.exists()", field),
                    format!("A value for {} must be present", element.path),
                ));
            }
            for type_name in &element.types {
                let subject = format!("{}.as({})", field, type_name);
                self.push_membership(element, binding, &subject, true, &mut keys, out);
            }
        } else {
            self.push_membership(element, binding, field, element.is_optional(), &mut keys, out);
        }
    }

    // Emit the membership constraints for one subject expression. `guarded`
    // wraps rule-tier assertions in an existence implication instead of
    // conjoining the existence check.
    fn push_membership(
        &self,
        element: &ElementDefinition,
        binding: &Binding,
        subject: &str,
        guarded: bool,
        keys: &mut KeySequence,
        out: &mut Vec<Constraint>,
    ) {
        let repeatable = element.is_repeatable();
        let term = |value_set: &str, strength: &str| {
            if repeatable {
                format!("{}.all(memberOf('{}', '{}'))", subject, value_set, strength)
            } else {
                format!("{}.memberOf('{}', '{}')", subject, value_set, strength)
            }
        };

        match binding.strength {
            BindingStrength::Required => {
                let mut body = term(&binding.value_set, "required");
                if let Some(max) = &binding.max_value_set {
                    body = format!("{} and {}", body, term(max, "required"));
                }
                let expression = if guarded {
                    format!("{}.exists() implies ({})", subject, body)
                } else {
                    format!("{}.exists() and {}", subject, body)
                };
                out.push(generated(
                    ConstraintSeverity::Rule,
                    keys.next(),
                    &element.path,
                    expression,
                    format!(
                        "Value of {} must be drawn from {}",
                        element.path, binding.value_set
                    ),
                ));
            }
            BindingStrength::Extensible | BindingStrength::Preferred => {
                out.push(generated(
                    ConstraintSeverity::Warning,
                    keys.next(),
                    &element.path,
                    format!(
                        "{}.exists() implies {}",
                        subject,
                        term(&binding.value_set, binding.strength.as_str())
                    ),
                    format!(
                        "Value of {} should be drawn from {}",
                        element.path, binding.value_set
                    ),
                ));
                if let Some(max) = &binding.max_value_set {
                    let expression = if guarded {
                        format!("{}.exists() implies {}", subject, term(max, "required"))
                    } else {
                        format!("{}.exists() and {}", subject, term(max, "required"))
                    };
                    out.push(generated(
                        ConstraintSeverity::Rule,
                        keys.next(),
                        &element.path,
                        expression,
                        format!("Value of {} must be drawn from {}", element.path, max),
                    ));
                }
            }
        }
    }
}

struct KeySequence {
    prefix: String,
    next: usize,
}

impl KeySequence {
    fn new(path: &str) -> Self {
        Self {
            prefix: path.replace("[x]", ""),
            next: 1,
        }
    }

    fn next(&mut self) -> String {
        let key = format!("{}-binding-{}", self.prefix, self.next);
        self.next += 1;
        key
    }
}

fn normalize_declared(declared: &Constraint, location: &str) -> Constraint {
    let mut constraint = declared.clone();
    if constraint.location.is_empty() {
        constraint.location = location.to_string();
    }
    constraint
}

fn generated(
    severity: ConstraintSeverity,
    key: String,
    location: &str,
    expression: String,
    human: String,
) -> Constraint {
    Constraint {
        key,
        severity,
        location: location.to_string(),
        human: Some(human),
        expression,
        source: ConstraintSource::Generated,
    }
}
