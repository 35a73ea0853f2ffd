//! Tree-walking evaluator.
//!
//! Evaluation is synchronous and recursive with no suspension points. The
//! empty collection propagates through path steps and stands for "unknown"
//! in the boolean operators; operations that require a singleton fail with a
//! cardinality error instead of guessing.

use std::cmp::Ordering;
use std::sync::Arc;

use chrono::NaiveDateTime;
use fhirbind_core::{
    BindingStrength, CardinalityError, Collection, Item, Node, Scalar, TerminologyProvider,
};
use tracing::trace;

use crate::ast::{BinaryOp, Expression, Literal, TypeOpKind, UnaryOp};
use crate::error::Result;

/// Expression evaluator with an optionally injected terminology capability.
#[derive(Default)]
pub struct Evaluator {
    terminology: Option<Arc<dyn TerminologyProvider>>,
}

impl Evaluator {
    /// Evaluator without terminology support; `memberOf` yields empty.
    pub fn new() -> Self {
        Self { terminology: None }
    }

    /// Evaluator delegating `memberOf` to the given capability.
    pub fn with_terminology(terminology: Arc<dyn TerminologyProvider>) -> Self {
        Self {
            terminology: Some(terminology),
        }
    }

    /// Evaluate an expression against an input collection, producing a
    /// result collection.
    pub fn evaluate<'a>(
        &self,
        expression: &Expression,
        input: &Collection<'a>,
    ) -> Result<Collection<'a>> {
        match expression {
            Expression::Literal(literal) => {
                Ok(Collection::singleton(Item::Value(literal_scalar(literal))))
            }
            Expression::Path { base, name } => {
                let base_collection = match base {
                    Some(base) => self.evaluate(base, input)?,
                    None => input.clone(),
                };
                Ok(step(&base_collection, name))
            }
            Expression::Index { base, index } => {
                let base_collection = self.evaluate(base, input)?;
                let index_collection = self.evaluate(index, input)?;
                if index_collection.is_empty() {
                    return Ok(Collection::empty());
                }
                let item = index_collection.as_singleton("indexer")?;
                match item.scalar() {
                    Some(Scalar::Integer(i)) if i >= 0 => Ok(base_collection
                        .iter()
                        .nth(i as usize)
                        .cloned()
                        .map(Collection::singleton)
                        .unwrap_or_default()),
                    _ => Ok(Collection::empty()),
                }
            }
            Expression::Function { base, name, args } => {
                let base_collection = match base {
                    Some(base) => self.evaluate(base, input)?,
                    None => input.clone(),
                };
                self.call(name, args, &base_collection, input)
            }
            Expression::Unary { op: UnaryOp::Neg, operand } => {
                let operand = self.evaluate(operand, input)?;
                if operand.is_empty() {
                    return Ok(Collection::empty());
                }
                let item = operand.as_singleton("unary '-'")?;
                Ok(match item.scalar() {
                    Some(Scalar::Integer(i)) => match i.checked_neg() {
                        Some(n) => Collection::singleton(Item::Value(Scalar::Integer(n))),
                        None => Collection::empty(),
                    },
                    Some(Scalar::Decimal(d)) => {
                        Collection::singleton(Item::Value(Scalar::Decimal(-d)))
                    }
                    _ => Collection::empty(),
                })
            }
            Expression::Binary { op, left, right } => self.binary(*op, left, right, input),
            Expression::TypeOp { op, operand, type_name } => {
                let operand = self.evaluate(operand, input)?;
                match op {
                    TypeOpKind::As => Ok(cast_collection(&operand, type_name)),
                    TypeOpKind::Is => type_test(&operand, type_name),
                }
            }
        }
    }

    fn binary<'a>(
        &self,
        op: BinaryOp,
        left: &Expression,
        right: &Expression,
        input: &Collection<'a>,
    ) -> Result<Collection<'a>> {
        match op {
            BinaryOp::And => {
                let left = to_boolean(&self.evaluate(left, input)?)?;
                if left == Some(false) {
                    return Ok(Collection::boolean(false));
                }
                let right = to_boolean(&self.evaluate(right, input)?)?;
                Ok(match (left, right) {
                    (_, Some(false)) => Collection::boolean(false),
                    (Some(true), Some(true)) => Collection::boolean(true),
                    _ => Collection::empty(),
                })
            }
            BinaryOp::Or => {
                let left = to_boolean(&self.evaluate(left, input)?)?;
                if left == Some(true) {
                    return Ok(Collection::boolean(true));
                }
                let right = to_boolean(&self.evaluate(right, input)?)?;
                Ok(match (left, right) {
                    (_, Some(true)) => Collection::boolean(true),
                    (Some(false), Some(false)) => Collection::boolean(false),
                    _ => Collection::empty(),
                })
            }
            BinaryOp::Xor => {
                let left = to_boolean(&self.evaluate(left, input)?)?;
                let right = to_boolean(&self.evaluate(right, input)?)?;
                Ok(match (left, right) {
                    (Some(l), Some(r)) => Collection::boolean(l != r),
                    _ => Collection::empty(),
                })
            }
            BinaryOp::Implies => {
                let left = to_boolean(&self.evaluate(left, input)?)?;
                if left == Some(false) {
                    return Ok(Collection::boolean(true));
                }
                let right = to_boolean(&self.evaluate(right, input)?)?;
                Ok(match (left, right) {
                    (_, Some(true)) => Collection::boolean(true),
                    (Some(true), Some(false)) => Collection::boolean(false),
                    _ => Collection::empty(),
                })
            }
            BinaryOp::Eq | BinaryOp::Ne => {
                let left = self.evaluate(left, input)?;
                let right = self.evaluate(right, input)?;
                if left.is_empty() || right.is_empty() {
                    return Ok(Collection::empty());
                }
                let mut equal = left.len() == right.len();
                if equal {
                    for (l, r) in left.iter().zip(right.iter()) {
                        if !item_equal(l, r) {
                            equal = false;
                            break;
                        }
                    }
                }
                Ok(Collection::boolean(if op == BinaryOp::Eq {
                    equal
                } else {
                    !equal
                }))
            }
            BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
                let left = self.evaluate(left, input)?;
                let right = self.evaluate(right, input)?;
                if left.is_empty() || right.is_empty() {
                    return Ok(Collection::empty());
                }
                let context = format!("operator '{}'", op.symbol());
                let l = left.as_singleton(&context)?.scalar();
                let r = right.as_singleton(&context)?.scalar();
                let (Some(l), Some(r)) = (l, r) else {
                    return Ok(Collection::empty());
                };
                Ok(match compare_scalars(&l, &r) {
                    Some(ordering) => Collection::boolean(match op {
                        BinaryOp::Lt => ordering == Ordering::Less,
                        BinaryOp::Le => ordering != Ordering::Greater,
                        BinaryOp::Gt => ordering == Ordering::Greater,
                        _ => ordering != Ordering::Less,
                    }),
                    None => Collection::empty(),
                })
            }
            BinaryOp::Mul | BinaryOp::Div | BinaryOp::Add | BinaryOp::Sub => {
                let left = self.evaluate(left, input)?;
                let right = self.evaluate(right, input)?;
                if left.is_empty() || right.is_empty() {
                    return Ok(Collection::empty());
                }
                let context = format!("operator '{}'", op.symbol());
                let l = left.as_singleton(&context)?.scalar();
                let r = right.as_singleton(&context)?.scalar();
                let (Some(l), Some(r)) = (l, r) else {
                    return Ok(Collection::empty());
                };
                Ok(arithmetic(op, &l, &r))
            }
        }
    }

    fn call<'a>(
        &self,
        name: &str,
        args: &[Expression],
        input: &Collection<'a>,
        outer: &Collection<'a>,
    ) -> Result<Collection<'a>> {
        match name {
            "exists" => {
                if let Some(criteria) = args.first() {
                    for item in input.iter() {
                        if self.criteria_holds(criteria, item)? {
                            return Ok(Collection::boolean(true));
                        }
                    }
                    Ok(Collection::boolean(false))
                } else {
                    Ok(Collection::boolean(!input.is_empty()))
                }
            }
            "empty" => Ok(Collection::boolean(input.is_empty())),
            "all" => {
                // Vacuously true on empty input.
                let criteria = &args[0];
                for item in input.iter() {
                    if !self.criteria_holds(criteria, item)? {
                        return Ok(Collection::boolean(false));
                    }
                }
                Ok(Collection::boolean(true))
            }
            "hasValue" => Ok(Collection::boolean(
                input.len() == 1 && input.first().is_some_and(Item::has_value),
            )),
            "count" => Ok(Collection::singleton(Item::Value(Scalar::Integer(
                input.len() as i64,
            )))),
            "first" => Ok(input
                .first()
                .cloned()
                .map(Collection::singleton)
                .unwrap_or_default()),
            "not" => Ok(match to_boolean(input)? {
                Some(b) => Collection::boolean(!b),
                None => Collection::empty(),
            }),
            "where" => {
                let criteria = &args[0];
                let mut kept = Collection::empty();
                for item in input.iter() {
                    if self.criteria_holds(criteria, item)? {
                        kept.push(item.clone());
                    }
                }
                Ok(kept)
            }
            "as" => Ok(cast_collection(input, type_argument(args))),
            "is" => type_test(input, type_argument(args)),
            "memberOf" => self.member_of(args, input, outer),
            _ => unreachable!("unknown functions are rejected at parse time"),
        }
    }

    fn criteria_holds(&self, criteria: &Expression, item: &Item<'_>) -> Result<bool> {
        let scope = Collection::singleton(item.clone());
        let result = self.evaluate(criteria, &scope)?;
        Ok(to_boolean(&result)? == Some(true))
    }

    fn member_of<'a>(
        &self,
        args: &[Expression],
        input: &Collection<'a>,
        outer: &Collection<'a>,
    ) -> Result<Collection<'a>> {
        if input.is_empty() {
            return Ok(Collection::empty());
        }
        let item = input.as_singleton("memberOf()")?;

        // Arguments are evaluated in the enclosing context, not against the
        // coded element itself.
        let (Some(value_set), Some(strength)) = (
            self.string_argument(&args[0], outer)?,
            self.string_argument(&args[1], outer)?,
        ) else {
            return Ok(Collection::empty());
        };
        let Some(strength) = BindingStrength::parse(&strength) else {
            return Ok(Collection::empty());
        };

        let codes = extract_codes(item);
        if codes.is_empty() {
            // No extractable code: the answer is unknowable, not an error.
            return Ok(Collection::empty());
        }
        let Some(terminology) = &self.terminology else {
            return Ok(Collection::empty());
        };

        for (code, system) in &codes {
            let member =
                terminology.is_member(code, system.as_deref(), &value_set, strength)?;
            trace!(code = %code, value_set = %value_set, member, "terminology membership checked");
            if member {
                return Ok(Collection::boolean(true));
            }
        }
        Ok(Collection::boolean(false))
    }

    fn string_argument(
        &self,
        argument: &Expression,
        input: &Collection<'_>,
    ) -> Result<Option<String>> {
        let value = self.evaluate(argument, input)?;
        if value.is_empty() {
            return Ok(None);
        }
        match value.as_singleton("memberOf() argument")?.scalar() {
            Some(Scalar::String(s)) => Ok(Some(s)),
            _ => Ok(None),
        }
    }
}

fn literal_scalar(literal: &Literal) -> Scalar {
    match literal {
        Literal::Bool(b) => Scalar::Bool(*b),
        Literal::Integer(i) => Scalar::Integer(*i),
        Literal::Decimal(d) => Scalar::Decimal(*d),
        Literal::Str(s) => Scalar::String(s.clone()),
        Literal::Date(d) => Scalar::Date(*d),
        Literal::DateTime(dt) => Scalar::DateTime(*dt),
    }
}

// A path step over an empty collection yields an empty collection; this is
// the foundation of the three-valued logic.
fn step<'a>(input: &Collection<'a>, name: &str) -> Collection<'a> {
    let mut out = Collection::empty();
    for item in input.iter() {
        if let Item::Node(node) = item {
            if node.type_name() == name {
                // Type-anchored step, e.g. `Patient.name` on a Patient root.
                out.push(item.clone());
            } else {
                for child in node.children(name) {
                    out.push(Item::Node(child));
                }
            }
        }
    }
    out
}

fn type_argument(args: &[Expression]) -> &str {
    match args.first() {
        Some(Expression::Path { base: None, name }) => name,
        _ => unreachable!("type arguments are validated at parse time"),
    }
}

fn cast_collection<'a>(input: &Collection<'a>, type_name: &str) -> Collection<'a> {
    let mut out = Collection::empty();
    for item in input.iter() {
        match item {
            Item::Node(node) => {
                if let Some(cast) = node.cast_to(type_name) {
                    out.push(Item::Node(cast));
                }
            }
            Item::Value(scalar) => {
                if scalar.type_name().eq_ignore_ascii_case(type_name) {
                    out.push(item.clone());
                }
            }
        }
    }
    out
}

fn type_test<'a>(input: &Collection<'a>, type_name: &str) -> Result<Collection<'a>> {
    if input.is_empty() {
        return Ok(Collection::empty());
    }
    let item = input.as_singleton("operator 'is'")?;
    let matches = match item {
        Item::Node(node) => node.cast_to(type_name).is_some(),
        Item::Value(scalar) => scalar.type_name().eq_ignore_ascii_case(type_name),
    };
    Ok(Collection::boolean(matches))
}

fn to_boolean(collection: &Collection<'_>) -> Result<Option<bool>> {
    match collection.len() {
        0 => Ok(None),
        1 => Ok(Some(match collection.first().and_then(Item::scalar) {
            Some(Scalar::Bool(b)) => b,
            // A non-boolean singleton is truthy in a boolean context.
            _ => true,
        })),
        n => Err(CardinalityError::new("boolean evaluation", n).into()),
    }
}

fn item_equal(left: &Item<'_>, right: &Item<'_>) -> bool {
    match (left.scalar(), right.scalar()) {
        (Some(l), Some(r)) => scalar_equal(&l, &r),
        (None, None) => match (left, right) {
            (Item::Node(l), Item::Node(r)) => l.json() == r.json(),
            _ => false,
        },
        _ => false,
    }
}

fn scalar_equal(left: &Scalar, right: &Scalar) -> bool {
    if let (Some(l), Some(r)) = (numeric(left), numeric(right)) {
        return l == r;
    }
    match (left, right) {
        (Scalar::String(l), Scalar::String(r)) => l == r,
        (Scalar::Bool(l), Scalar::Bool(r)) => l == r,
        _ => match (as_datetime(left), as_datetime(right)) {
            (Some(l), Some(r)) => l == r,
            _ => false,
        },
    }
}

fn compare_scalars(left: &Scalar, right: &Scalar) -> Option<Ordering> {
    if let (Scalar::Integer(l), Scalar::Integer(r)) = (left, right) {
        return Some(l.cmp(r));
    }
    if let (Some(l), Some(r)) = (numeric(left), numeric(right)) {
        return l.partial_cmp(&r);
    }
    if let (Scalar::String(l), Scalar::String(r)) = (left, right) {
        return Some(l.cmp(r));
    }
    if matches!(left, Scalar::Date(_) | Scalar::DateTime(_))
        || matches!(right, Scalar::Date(_) | Scalar::DateTime(_))
    {
        if let (Some(l), Some(r)) = (as_datetime(left), as_datetime(right)) {
            return Some(l.cmp(&r));
        }
    }
    None
}

// The shapes a coded element can take: a bare code, a Coding with
// code/system children, or a CodeableConcept holding a list of codings.
fn extract_codes(item: &Item<'_>) -> Vec<(String, Option<String>)> {
    fn string_child(node: &Node<'_>, name: &str) -> Option<String> {
        match node.children(name).into_iter().next()?.primitive() {
            Some(Scalar::String(s)) => Some(s),
            _ => None,
        }
    }

    fn coding(node: &Node<'_>) -> Option<(String, Option<String>)> {
        let code = string_child(node, "code")?;
        Some((code, string_child(node, "system")))
    }

    match item {
        Item::Value(Scalar::String(code)) => vec![(code.clone(), None)],
        Item::Value(_) => Vec::new(),
        Item::Node(node) => {
            if let Some(Scalar::String(code)) = node.primitive() {
                return vec![(code, None)];
            }
            if let Some(pair) = coding(node) {
                return vec![pair];
            }
            node.children("coding")
                .iter()
                .filter_map(coding)
                .collect()
        }
    }
}

fn numeric(scalar: &Scalar) -> Option<f64> {
    match scalar {
        Scalar::Integer(i) => Some(*i as f64),
        Scalar::Decimal(d) => Some(*d),
        _ => None,
    }
}

fn as_datetime(scalar: &Scalar) -> Option<NaiveDateTime> {
    match scalar {
        Scalar::Date(d) => d.and_hms_opt(0, 0, 0),
        Scalar::DateTime(dt) => Some(*dt),
        Scalar::String(s) => {
            let naive = s.strip_suffix('Z').unwrap_or(s);
            for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"] {
                if let Ok(dt) = NaiveDateTime::parse_from_str(naive, format) {
                    return Some(dt);
                }
            }
            chrono::NaiveDate::parse_from_str(naive, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        }
        _ => None,
    }
}

fn arithmetic<'a>(op: BinaryOp, left: &Scalar, right: &Scalar) -> Collection<'a> {
    if op == BinaryOp::Add {
        if let (Scalar::String(l), Scalar::String(r)) = (left, right) {
            return Collection::singleton(Item::Value(Scalar::String(format!("{}{}", l, r))));
        }
    }

    if let (Scalar::Integer(l), Scalar::Integer(r)) = (left, right) {
        if op != BinaryOp::Div {
            let result = match op {
                BinaryOp::Mul => l.checked_mul(*r),
                BinaryOp::Add => l.checked_add(*r),
                _ => l.checked_sub(*r),
            };
            return result
                .map(|i| Collection::singleton(Item::Value(Scalar::Integer(i))))
                .unwrap_or_default();
        }
    }

    let (Some(l), Some(r)) = (numeric(left), numeric(right)) else {
        return Collection::empty();
    };
    let result = match op {
        BinaryOp::Mul => l * r,
        BinaryOp::Add => l + r,
        BinaryOp::Sub => l - r,
        _ => {
            // Division by zero yields empty, not an error.
            if r == 0.0 {
                return Collection::empty();
            }
            l / r
        }
    };
    Collection::singleton(Item::Value(Scalar::Decimal(result)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use fhirbind_core::InMemoryTerminology;
    use serde_json::{json, Value};

    fn observation() -> Value {
        json!({
            "resourceType": "Observation",
            "status": "final",
            "code": {
                "coding": [
                    { "system": "http://loinc.org", "code": "8480-6" },
                    { "system": "http://example.org/local", "code": "bp-sys" }
                ]
            },
            "category": [
                { "coding": [{ "system": "http://example.org/cat", "code": "vital-signs" }] }
            ],
            "valueQuantity": { "value": 120.0, "unit": "mmHg" },
            "issued": "2021-06-01T08:30:00Z"
        })
    }

    fn eval<'a>(evaluator: &Evaluator, text: &str, record: &'a Value) -> Collection<'a> {
        let root = Node::root(record).unwrap();
        evaluator
            .evaluate(&parse(text).unwrap(), &Collection::from_node(root))
            .unwrap()
    }

    fn eval_bool(text: &str, record: &Value) -> Option<bool> {
        eval(&Evaluator::new(), text, record).single_boolean()
    }

    #[test]
    fn path_steps_over_empty_yield_empty() {
        let record = observation();
        let result = eval(&Evaluator::new(), "subject.reference.display", &record);
        assert!(result.is_empty());
    }

    #[test]
    fn exists_truth_table() {
        let record = observation();
        assert_eq!(eval_bool("status.exists()", &record), Some(true));
        assert_eq!(eval_bool("subject.exists()", &record), Some(false));
        assert_eq!(
            eval_bool("code.coding.exists(code = '8480-6')", &record),
            Some(true)
        );
        assert_eq!(
            eval_bool("code.coding.exists(code = 'missing')", &record),
            Some(false)
        );
    }

    #[test]
    fn all_is_vacuously_true_on_empty() {
        let record = observation();
        assert_eq!(eval_bool("subject.all(exists())", &record), Some(true));
        assert_eq!(
            eval_bool("code.coding.all(code.exists())", &record),
            Some(true)
        );
        assert_eq!(
            eval_bool("code.coding.all(system = 'http://loinc.org')", &record),
            Some(false)
        );
    }

    #[test]
    fn has_value_semantics() {
        let record = observation();
        // Singleton with a primitive value.
        assert_eq!(eval_bool("status.hasValue()", &record), Some(true));
        // Complex singleton: no primitive value.
        assert_eq!(eval_bool("code.hasValue()", &record), Some(false));
        // Empty input: false, not an error.
        assert_eq!(eval_bool("subject.hasValue()", &record), Some(false));
        // Multi-valued input: false, not an error.
        assert_eq!(eval_bool("code.coding.hasValue()", &record), Some(false));
    }

    #[test]
    fn three_valued_and() {
        let record = observation();
        // false and <empty> is false, not empty.
        assert_eq!(
            eval_bool("subject.exists() and missing", &record),
            Some(false)
        );
        // true and <empty> is empty.
        assert!(eval(&Evaluator::new(), "status.exists() and missing", &record).is_empty());
        assert_eq!(
            eval_bool("status.exists() and code.exists()", &record),
            Some(true)
        );
    }

    #[test]
    fn three_valued_or_xor_implies() {
        let record = observation();
        // true or <empty> is true.
        assert_eq!(eval_bool("status.exists() or missing", &record), Some(true));
        // false or <empty> is empty.
        assert!(eval(&Evaluator::new(), "subject.exists() or missing", &record).is_empty());
        // <empty> xor true is empty.
        assert!(eval(&Evaluator::new(), "missing xor true", &record).is_empty());
        assert_eq!(eval_bool("true xor false", &record), Some(true));
        // false implies <empty> is true.
        assert_eq!(eval_bool("subject.exists() implies missing", &record), Some(true));
        // <empty> implies true is true.
        assert_eq!(eval_bool("missing implies true", &record), Some(true));
        // true implies <empty> is empty.
        assert!(eval(&Evaluator::new(), "status.exists() implies missing", &record).is_empty());
    }

    #[test]
    fn comparisons_require_singletons() {
        let record = observation();
        let err = Evaluator::new()
            .evaluate(
                &parse("code.coding.code = '8480-6'").unwrap(),
                &Collection::from_node(Node::root(&record).unwrap()),
            )
            .unwrap_err();
        assert!(matches!(err, crate::FhirPathError::Cardinality(_)));
    }

    #[test]
    fn arithmetic_and_comparison() {
        let record = observation();
        assert_eq!(eval_bool("1 + 2 * 3 = 7", &record), Some(true));
        assert_eq!(eval_bool("valueQuantity.value > 100", &record), Some(true));
        assert_eq!(eval_bool("'a' + 'b' = 'ab'", &record), Some(true));
        // Division by zero yields empty.
        assert!(eval(&Evaluator::new(), "1 / 0", &record).is_empty());
        // Empty operand propagates.
        assert!(eval(&Evaluator::new(), "missing + 1", &record).is_empty());
    }

    #[test]
    fn date_comparison_coerces_strings() {
        let record = observation();
        assert_eq!(eval_bool("issued > @2021-01-01", &record), Some(true));
        assert_eq!(eval_bool("issued < @2021-06-02", &record), Some(true));
    }

    #[test]
    fn type_cast_and_test() {
        let record = observation();
        assert_eq!(
            eval_bool("value.as(Quantity).exists()", &record),
            Some(true)
        );
        assert_eq!(
            eval_bool("value.as(CodeableConcept).exists()", &record),
            Some(false)
        );
        assert_eq!(eval_bool("value.is(Quantity)", &record), Some(true));
        assert_eq!(eval_bool("value is Quantity", &record), Some(true));
        // Cast failure is no result, never an error.
        assert!(eval(&Evaluator::new(), "value.as(Period)", &record).is_empty());
        // is over empty input is empty.
        assert!(eval(&Evaluator::new(), "missing.is(Quantity)", &record).is_empty());
    }

    #[test]
    fn indexer_and_first() {
        let record = observation();
        assert_eq!(
            eval_bool("code.coding[1].code = 'bp-sys'", &record),
            Some(true)
        );
        assert!(eval(&Evaluator::new(), "code.coding[5]", &record).is_empty());
        assert_eq!(
            eval_bool("code.coding.first().code = '8480-6'", &record),
            Some(true)
        );
    }

    #[test]
    fn where_filters_in_order() {
        let record = observation();
        assert_eq!(
            eval_bool(
                "code.coding.where(system = 'http://loinc.org').count() = 1",
                &record
            ),
            Some(true)
        );
    }

    #[test]
    fn not_function() {
        let record = observation();
        assert_eq!(eval_bool("subject.exists().not()", &record), Some(true));
        assert!(eval(&Evaluator::new(), "missing.not()", &record).is_empty());
    }

    fn terminology() -> Arc<InMemoryTerminology> {
        let mut t = InMemoryTerminology::new();
        t.add_code("http://example.org/vs/loinc", Some("http://loinc.org"), "8480-6");
        t.add_code("http://example.org/vs/status", None, "final");
        Arc::new(t)
    }

    #[test]
    fn member_of_plain_code() {
        let record = observation();
        let evaluator = Evaluator::with_terminology(terminology());
        assert_eq!(
            eval(
                &evaluator,
                "status.memberOf('http://example.org/vs/status', 'required')",
                &record
            )
            .single_boolean(),
            Some(true)
        );
        assert_eq!(
            eval(
                &evaluator,
                "status.memberOf('http://example.org/vs/loinc', 'required')",
                &record
            )
            .single_boolean(),
            Some(false)
        );
    }

    #[test]
    fn member_of_codeable_concept_matches_any_coding() {
        let record = observation();
        let evaluator = Evaluator::with_terminology(terminology());
        assert_eq!(
            eval(
                &evaluator,
                "code.memberOf('http://example.org/vs/loinc', 'extensible')",
                &record
            )
            .single_boolean(),
            Some(true)
        );
    }

    #[test]
    fn member_of_without_capability_is_empty() {
        let record = observation();
        let result = eval(
            &Evaluator::new(),
            "status.memberOf('http://example.org/vs/status', 'required')",
            &record,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn member_of_empty_input_is_empty() {
        let record = observation();
        let evaluator = Evaluator::with_terminology(terminology());
        let result = eval(
            &evaluator,
            "subject.memberOf('http://example.org/vs/status', 'required')",
            &record,
        );
        assert!(result.is_empty());
    }

    #[test]
    fn member_of_surfaces_capability_failure() {
        struct Unavailable;
        impl TerminologyProvider for Unavailable {
            fn is_member(
                &self,
                _code: &str,
                _system: Option<&str>,
                _value_set: &str,
                _strength: BindingStrength,
            ) -> std::result::Result<bool, fhirbind_core::TerminologyError> {
                Err(fhirbind_core::TerminologyError::unavailable("offline"))
            }
        }

        let record = observation();
        let evaluator = Evaluator::with_terminology(Arc::new(Unavailable));
        let root = Node::root(&record).unwrap();
        let err = evaluator
            .evaluate(
                &parse("status.memberOf('http://example.org/vs/status', 'required')").unwrap(),
                &Collection::from_node(root),
            )
            .unwrap_err();
        assert!(matches!(err, crate::FhirPathError::Terminology(_)));
    }
}
