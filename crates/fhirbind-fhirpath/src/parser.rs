//! Recursive-descent parser.
//!
//! One cascade level per precedence tier, one token of lookahead. Parsing is
//! pure and deterministic: it either yields the full expression tree or
//! fails with a positioned error, never partially.

use crate::ast::{BinaryOp, Expression, Literal, TypeOpKind, UnaryOp};
use crate::error::{FhirPathError, Result};
use crate::functions;
use crate::lexer::{Lexer, Token, TokenKind};

/// Parse expression text into an AST.
pub fn parse(input: &str) -> Result<Expression> {
    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let expression = parser.parse_expression()?;
    let trailing = parser.peek();
    if trailing.kind != TokenKind::Eof {
        return Err(FhirPathError::syntax(
            trailing.pos,
            format!("expected end of input, found {}", trailing.kind.name()),
        ));
    }
    Ok(expression)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // The token stream always ends with Eof.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if &self.peek().kind == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token> {
        if &self.peek().kind == kind {
            Ok(self.advance())
        } else {
            let token = self.peek();
            Err(FhirPathError::syntax(
                token.pos,
                format!("expected {}, found {}", kind.name(), token.kind.name()),
            ))
        }
    }

    fn expect_ident(&mut self) -> Result<(String, usize)> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                Ok((name, token.pos))
            }
            other => Err(FhirPathError::syntax(
                token.pos,
                format!("expected identifier, found {}", other.name()),
            )),
        }
    }

    fn parse_expression(&mut self) -> Result<Expression> {
        self.parse_or_tier()
    }

    // or / xor / implies share the lowest tier.
    fn parse_or_tier(&mut self) -> Result<Expression> {
        let mut left = self.parse_and()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Or => BinaryOp::Or,
                TokenKind::Xor => BinaryOp::Xor,
                TokenKind::Implies => BinaryOp::Implies,
                _ => break,
            };
            self.advance();
            let right = self.parse_and()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expression> {
        let mut left = self.parse_comparison()?;
        while self.eat(&TokenKind::And) {
            let right = self.parse_comparison()?;
            left = Expression::Binary {
                op: BinaryOp::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_comparison(&mut self) -> Result<Expression> {
        let mut left = self.parse_type_op()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Eq => BinaryOp::Eq,
                TokenKind::NotEq => BinaryOp::Ne,
                TokenKind::Lt => BinaryOp::Lt,
                TokenKind::LtEq => BinaryOp::Le,
                TokenKind::Gt => BinaryOp::Gt,
                TokenKind::GtEq => BinaryOp::Ge,
                _ => break,
            };
            self.advance();
            let right = self.parse_type_op()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_type_op(&mut self) -> Result<Expression> {
        let mut left = self.parse_additive()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Is => TypeOpKind::Is,
                TokenKind::As => TypeOpKind::As,
                _ => break,
            };
            self.advance();
            let (type_name, _) = self.expect_ident()?;
            left = Expression::TypeOp {
                op,
                operand: Box::new(left),
                type_name,
            };
        }
        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression> {
        let mut left = self.parse_multiplicative()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinaryOp::Mul,
                TokenKind::Slash => BinaryOp::Div,
                _ => break,
            };
            self.advance();
            let right = self.parse_unary()?;
            left = Expression::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expression> {
        if self.eat(&TokenKind::Minus) {
            let operand = self.parse_unary()?;
            Ok(Expression::Unary {
                op: UnaryOp::Neg,
                operand: Box::new(operand),
            })
        } else {
            self.parse_postfix()
        }
    }

    fn parse_postfix(&mut self) -> Result<Expression> {
        let mut expression = self.parse_primary()?;
        loop {
            if self.eat(&TokenKind::Dot) {
                expression = self.parse_step(expression)?;
            } else if self.eat(&TokenKind::LBracket) {
                let index = self.parse_expression()?;
                self.expect(&TokenKind::RBracket)?;
                expression = Expression::Index {
                    base: Box::new(expression),
                    index: Box::new(index),
                };
            } else {
                break;
            }
        }
        Ok(expression)
    }

    // One step after a '.': a child name, a function call, or the
    // function-call form of the type operators (`value.as(Quantity)`).
    fn parse_step(&mut self, base: Expression) -> Result<Expression> {
        let token = self.peek().clone();
        let (name, name_pos) = match token.kind {
            TokenKind::Ident(name) => {
                self.advance();
                (name, token.pos)
            }
            TokenKind::As => {
                self.advance();
                ("as".to_string(), token.pos)
            }
            TokenKind::Is => {
                self.advance();
                ("is".to_string(), token.pos)
            }
            other => {
                return Err(FhirPathError::syntax(
                    token.pos,
                    format!("expected member name, found {}", other.name()),
                ));
            }
        };

        if self.eat(&TokenKind::LParen) {
            let args = self.parse_arguments()?;
            self.finish_function(Some(Box::new(base)), name, name_pos, args)
        } else {
            Ok(Expression::Path {
                base: Some(Box::new(base)),
                name,
            })
        }
    }

    fn parse_primary(&mut self) -> Result<Expression> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Bool(b) => {
                self.advance();
                Ok(Expression::Literal(Literal::Bool(b)))
            }
            TokenKind::Integer(i) => {
                self.advance();
                Ok(Expression::Literal(Literal::Integer(i)))
            }
            TokenKind::Decimal(d) => {
                self.advance();
                Ok(Expression::Literal(Literal::Decimal(d)))
            }
            TokenKind::Str(ref s) => {
                let s = s.clone();
                self.advance();
                Ok(Expression::Literal(Literal::Str(s)))
            }
            TokenKind::Date(d) => {
                self.advance();
                Ok(Expression::Literal(Literal::Date(d)))
            }
            TokenKind::DateTime(dt) => {
                self.advance();
                Ok(Expression::Literal(Literal::DateTime(dt)))
            }
            TokenKind::LParen => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ident(ref name) => {
                let name = name.clone();
                self.advance();
                if self.eat(&TokenKind::LParen) {
                    let args = self.parse_arguments()?;
                    self.finish_function(None, name, token.pos, args)
                } else {
                    Ok(Expression::Path { base: None, name })
                }
            }
            ref other => Err(FhirPathError::syntax(
                token.pos,
                format!("expected expression, found {}", other.name()),
            )),
        }
    }

    fn parse_arguments(&mut self) -> Result<Vec<Expression>> {
        let mut args = Vec::new();
        if !self.eat(&TokenKind::RParen) {
            loop {
                args.push(self.parse_expression()?);
                if !self.eat(&TokenKind::Comma) {
                    break;
                }
            }
            self.expect(&TokenKind::RParen)?;
        }
        Ok(args)
    }

    fn finish_function(
        &self,
        base: Option<Box<Expression>>,
        name: String,
        name_pos: usize,
        args: Vec<Expression>,
    ) -> Result<Expression> {
        let Some(signature) = functions::signature(&name) else {
            return Err(FhirPathError::syntax(
                name_pos,
                format!("unknown function '{}'", name),
            ));
        };

        if args.len() < signature.min_arity || args.len() > signature.max_arity {
            return Err(FhirPathError::arity(
                &name,
                signature.min_arity,
                signature.max_arity,
                args.len(),
            ));
        }

        if signature.type_argument {
            let valid = matches!(args.first(), Some(Expression::Path { base: None, .. }));
            if !valid {
                return Err(FhirPathError::syntax(
                    name_pos,
                    format!("{}() expects a type name argument", name),
                ));
            }
        }

        Ok(Expression::Function { base, name, args })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(name: &str) -> Expression {
        Expression::Path {
            base: None,
            name: name.to_string(),
        }
    }

    #[test]
    fn precedence_shapes() {
        // and binds tighter than implies; comparisons tighter than and.
        let expr = parse("a.exists() implies b = 1 and c").unwrap();
        match expr {
            Expression::Binary { op: BinaryOp::Implies, right, .. } => match *right {
                Expression::Binary { op: BinaryOp::And, left, .. } => match *left {
                    Expression::Binary { op: BinaryOp::Eq, .. } => {}
                    other => panic!("expected comparison under and, got {:?}", other),
                },
                other => panic!("expected and under implies, got {:?}", other),
            },
            other => panic!("expected implies at the top, got {:?}", other),
        }

        // * binds tighter than +.
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            Expression::Binary {
                op: BinaryOp::Add,
                left: Box::new(Expression::Literal(Literal::Integer(1))),
                right: Box::new(Expression::Binary {
                    op: BinaryOp::Mul,
                    left: Box::new(Expression::Literal(Literal::Integer(2))),
                    right: Box::new(Expression::Literal(Literal::Integer(3))),
                }),
            }
        );
    }

    #[test]
    fn parses_generated_constraint_shape() {
        let expr = parse(
            "code.exists() implies (code.memberOf('http://example.org/vs', 'extensible'))",
        )
        .unwrap();
        match expr {
            Expression::Binary { op: BinaryOp::Implies, left, right } => {
                assert_eq!(
                    *left,
                    Expression::Function {
                        base: Some(Box::new(path("code"))),
                        name: "exists".to_string(),
                        args: vec![],
                    }
                );
                assert!(matches!(*right, Expression::Function { .. }));
            }
            other => panic!("expected implies, got {:?}", other),
        }
    }

    #[test]
    fn type_operator_and_function_forms() {
        let infix = parse("value is Quantity").unwrap();
        assert_eq!(
            infix,
            Expression::TypeOp {
                op: TypeOpKind::Is,
                operand: Box::new(path("value")),
                type_name: "Quantity".to_string(),
            }
        );

        let call = parse("value.as(Quantity).exists()").unwrap();
        match call {
            Expression::Function { base: Some(base), name, .. } => {
                assert_eq!(name, "exists");
                assert_eq!(
                    *base,
                    Expression::Function {
                        base: Some(Box::new(path("value"))),
                        name: "as".to_string(),
                        args: vec![path("Quantity")],
                    }
                );
            }
            other => panic!("expected function, got {:?}", other),
        }
    }

    #[test]
    fn indexer() {
        let expr = parse("name[0].family").unwrap();
        assert_eq!(
            expr,
            Expression::Path {
                base: Some(Box::new(Expression::Index {
                    base: Box::new(path("name")),
                    index: Box::new(Expression::Literal(Literal::Integer(0))),
                })),
                name: "family".to_string(),
            }
        );
    }

    #[test]
    fn unknown_function_is_a_syntax_error() {
        let err = parse("code.resolve()").unwrap_err();
        assert!(matches!(err, FhirPathError::Syntax { .. }));
        assert!(format!("{}", err).contains("unknown function"));
    }

    #[test]
    fn wrong_arity_is_an_arity_error() {
        let err = parse("code.memberOf('http://example.org/vs')").unwrap_err();
        assert_eq!(
            err,
            FhirPathError::Arity {
                function: "memberOf".to_string(),
                expected_min: 2,
                expected_max: 2,
                actual: 1,
            }
        );

        assert!(matches!(
            parse("code.exists(a, b)").unwrap_err(),
            FhirPathError::Arity { .. }
        ));
    }

    #[test]
    fn type_function_requires_bare_type_name() {
        let err = parse("value.as('Quantity')").unwrap_err();
        assert!(matches!(err, FhirPathError::Syntax { .. }));
    }

    #[test]
    fn malformed_input_never_partially_succeeds() {
        assert!(parse("").is_err());
        assert!(parse("a and").is_err());
        assert!(parse("a ) b").is_err());
        assert!(parse("(a").is_err());
        assert!(parse("a..b").is_err());
    }

    #[test]
    fn display_round_trips_structurally() {
        for text in [
            "code.exists() and code.memberOf('http://example.org/vs', 'required')",
            "value.as(Quantity).exists() implies (value.as(Quantity).memberOf('http://x', 'required'))",
            "a.b[0].c.where(d = 'x').exists()",
            "1 + 2 * 3 - -4",
            "(a or b) and c xor d implies e",
            "@2020-03-15 < @2021-01-01T00:00:00",
        ] {
            let first = parse(text).unwrap();
            let second = parse(&first.to_string()).unwrap();
            assert_eq!(first, second, "round-trip failed for {}", text);
        }
    }
}
