//! Expression AST.
//!
//! Produced once by the parser and shared read-only across evaluations;
//! nothing here is mutated after construction. `Display` prints a canonical
//! textual form that parses back to a structurally equal tree.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};

/// A literal value in an expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Bool(bool),
    Integer(i64),
    Decimal(f64),
    Str(String),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Mul,
    Div,
    Add,
    Sub,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    Xor,
    Implies,
}

impl BinaryOp {
    /// Operator symbol as written in source.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Implies => "implies",
        }
    }

    /// Binding strength; higher binds tighter. All binary operators are
    /// left-associative.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Mul | BinaryOp::Div => 7,
            BinaryOp::Add | BinaryOp::Sub => 6,
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Le
            | BinaryOp::Gt
            | BinaryOp::Ge => 4,
            BinaryOp::And => 3,
            BinaryOp::Or | BinaryOp::Xor | BinaryOp::Implies => 2,
        }
    }
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
}

/// Infix type-test operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeOpKind {
    Is,
    As,
}

impl TypeOpKind {
    pub fn symbol(&self) -> &'static str {
        match self {
            TypeOpKind::Is => "is",
            TypeOpKind::As => "as",
        }
    }
}

const TYPE_OP_PRECEDENCE: u8 = 5;
const UNARY_PRECEDENCE: u8 = 8;
const ATOM_PRECEDENCE: u8 = 9;

/// An expression tree node.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// A literal value.
    Literal(Literal),
    /// A path step: bare (`code`) or on a base (`code.coding`).
    Path {
        base: Option<Box<Expression>>,
        name: String,
    },
    /// An indexer: `base[index]`.
    Index {
        base: Box<Expression>,
        index: Box<Expression>,
    },
    /// A function call, optionally on a base: `exists()`, `code.memberOf(...)`.
    Function {
        base: Option<Box<Expression>>,
        name: String,
        args: Vec<Expression>,
    },
    /// A unary operation.
    Unary {
        op: UnaryOp,
        operand: Box<Expression>,
    },
    /// A binary operation.
    Binary {
        op: BinaryOp,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    /// An infix type test or cast: `value is Quantity`, `value as Quantity`.
    TypeOp {
        op: TypeOpKind,
        operand: Box<Expression>,
        type_name: String,
    },
}

impl Expression {
    fn precedence(&self) -> u8 {
        match self {
            Expression::Binary { op, .. } => op.precedence(),
            Expression::TypeOp { .. } => TYPE_OP_PRECEDENCE,
            Expression::Unary { .. } => UNARY_PRECEDENCE,
            _ => ATOM_PRECEDENCE,
        }
    }

    fn fmt_with_min(&self, f: &mut fmt::Formatter<'_>, min: u8) -> fmt::Result {
        if self.precedence() < min {
            write!(f, "(")?;
            write!(f, "{}", self)?;
            write!(f, ")")
        } else {
            write!(f, "{}", self)
        }
    }
}

fn write_string_literal(f: &mut fmt::Formatter<'_>, value: &str) -> fmt::Result {
    write!(f, "'")?;
    for c in value.chars() {
        match c {
            '\'' => write!(f, "\\'")?,
            '\\' => write!(f, "\\\\")?,
            '\n' => write!(f, "\\n")?,
            '\t' => write!(f, "\\t")?,
            '\r' => write!(f, "\\r")?,
            '\u{0c}' => write!(f, "\\f")?,
            c => write!(f, "{}", c)?,
        }
    }
    write!(f, "'")
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Bool(b) => write!(f, "{}", b),
            Literal::Integer(i) => write!(f, "{}", i),
            // Debug formatting keeps the decimal point on whole values.
            Literal::Decimal(d) => write!(f, "{:?}", d),
            Literal::Str(s) => write_string_literal(f, s),
            Literal::Date(d) => write!(f, "@{}", d.format("%Y-%m-%d")),
            Literal::DateTime(dt) => write!(f, "@{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expression::Literal(literal) => write!(f, "{}", literal),
            Expression::Path { base, name } => {
                if let Some(base) = base {
                    base.fmt_with_min(f, ATOM_PRECEDENCE)?;
                    write!(f, ".")?;
                }
                write!(f, "{}", name)
            }
            Expression::Index { base, index } => {
                base.fmt_with_min(f, ATOM_PRECEDENCE)?;
                write!(f, "[{}]", index)
            }
            Expression::Function { base, name, args } => {
                if let Some(base) = base {
                    base.fmt_with_min(f, ATOM_PRECEDENCE)?;
                    write!(f, ".")?;
                }
                write!(f, "{}(", name)?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", arg)?;
                }
                write!(f, ")")
            }
            Expression::Unary { op: UnaryOp::Neg, operand } => {
                write!(f, "-")?;
                operand.fmt_with_min(f, UNARY_PRECEDENCE)
            }
            Expression::Binary { op, left, right } => {
                left.fmt_with_min(f, op.precedence())?;
                write!(f, " {} ", op.symbol())?;
                // Left-associative: an equal-precedence right child needs parens.
                right.fmt_with_min(f, op.precedence() + 1)
            }
            Expression::TypeOp { op, operand, type_name } => {
                operand.fmt_with_min(f, TYPE_OP_PRECEDENCE)?;
                write!(f, " {} {}", op.symbol(), type_name)
            }
        }
    }
}
