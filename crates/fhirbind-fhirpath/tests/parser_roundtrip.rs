//! Property test: printing a parsed expression and reparsing it yields a
//! structurally equal tree.

use fhirbind_fhirpath::{parse, BinaryOp, Expression, Literal, TypeOpKind, UnaryOp};
use proptest::prelude::*;

fn identifier() -> impl Strategy<Value = String> {
    "[a-z][a-zA-Z0-9]{0,7}".prop_filter("keywords are not identifiers", |s| {
        !matches!(
            s.as_str(),
            "and" | "or" | "xor" | "implies" | "is" | "as" | "true" | "false"
        )
    })
}

fn type_name() -> impl Strategy<Value = String> {
    "[A-Z][a-zA-Z0-9]{0,7}"
}

fn literal() -> impl Strategy<Value = Expression> {
    prop_oneof![
        any::<bool>().prop_map(|b| Expression::Literal(Literal::Bool(b))),
        (0i64..1_000_000).prop_map(|i| Expression::Literal(Literal::Integer(i))),
        // Built from two small integers so the canonical form never needs
        // exponent notation.
        (0i64..1_000_000, 0u32..100).prop_map(|(whole, cents)| {
            Expression::Literal(Literal::Decimal(whole as f64 + cents as f64 / 100.0))
        }),
        "[a-zA-Z0-9 _:./-]{0,12}".prop_map(|s| Expression::Literal(Literal::Str(s))),
    ]
}

fn binary_op() -> impl Strategy<Value = BinaryOp> {
    prop_oneof![
        Just(BinaryOp::Mul),
        Just(BinaryOp::Div),
        Just(BinaryOp::Add),
        Just(BinaryOp::Sub),
        Just(BinaryOp::Eq),
        Just(BinaryOp::Ne),
        Just(BinaryOp::Lt),
        Just(BinaryOp::Le),
        Just(BinaryOp::Gt),
        Just(BinaryOp::Ge),
        Just(BinaryOp::And),
        Just(BinaryOp::Or),
        Just(BinaryOp::Xor),
        Just(BinaryOp::Implies),
    ]
}

fn expression() -> impl Strategy<Value = Expression> {
    let leaf = prop_oneof![
        literal(),
        identifier().prop_map(|name| Expression::Path { base: None, name }),
    ];

    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            // Path step on a base.
            (inner.clone(), identifier()).prop_map(|(base, name)| Expression::Path {
                base: Some(Box::new(base)),
                name,
            }),
            // Indexer.
            (inner.clone(), 0i64..10).prop_map(|(base, i)| Expression::Index {
                base: Box::new(base),
                index: Box::new(Expression::Literal(Literal::Integer(i))),
            }),
            // Nullary functions from the registry.
            (inner.clone(), prop_oneof![
                Just("exists"),
                Just("empty"),
                Just("hasValue"),
                Just("count"),
                Just("first"),
                Just("not"),
            ])
                .prop_map(|(base, name)| Expression::Function {
                    base: Some(Box::new(base)),
                    name: name.to_string(),
                    args: vec![],
                }),
            // Criteria functions.
            (inner.clone(), inner.clone(), prop_oneof![Just("all"), Just("where")]).prop_map(
                |(base, criteria, name)| Expression::Function {
                    base: Some(Box::new(base)),
                    name: name.to_string(),
                    args: vec![criteria],
                }
            ),
            // Type functions.
            (inner.clone(), type_name(), prop_oneof![Just("as"), Just("is")]).prop_map(
                |(base, type_name, name)| Expression::Function {
                    base: Some(Box::new(base)),
                    name: name.to_string(),
                    args: vec![Expression::Path {
                        base: None,
                        name: type_name,
                    }],
                }
            ),
            // Infix type operators.
            (inner.clone(), type_name(), prop_oneof![Just(TypeOpKind::Is), Just(TypeOpKind::As)])
                .prop_map(|(operand, type_name, op)| Expression::TypeOp {
                    op,
                    operand: Box::new(operand),
                    type_name,
                }),
            // Unary negation.
            inner.clone().prop_map(|operand| Expression::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            }),
            // Binary operators.
            (inner.clone(), binary_op(), inner).prop_map(|(left, op, right)| {
                Expression::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                }
            }),
        ]
    })
}

proptest! {
    #[test]
    fn print_parse_round_trip(expr in expression()) {
        let printed = expr.to_string();
        let reparsed = parse(&printed)
            .unwrap_or_else(|e| panic!("failed to reparse '{}': {}", printed, e));
        prop_assert_eq!(&reparsed, &expr, "printed form: {}", printed);
    }

    #[test]
    fn parse_is_deterministic(expr in expression()) {
        let printed = expr.to_string();
        let first = parse(&printed).unwrap();
        let second = parse(&printed).unwrap();
        prop_assert_eq!(first, second);
    }
}
