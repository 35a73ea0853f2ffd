//! # FHIRBind FHIRPath
//!
//! A FHIRPath-style expression language for record constraints: lexer,
//! recursive-descent parser, immutable AST, and a tree-walking evaluator
//! with the built-in function library.
//!
//! Parsing is pure and cacheable; a parsed [`Expression`] is immutable and
//! safely shared across threads and evaluations.

#![warn(clippy::all)]

pub mod ast;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;

pub use ast::{BinaryOp, Expression, Literal, TypeOpKind, UnaryOp};
pub use error::{FhirPathError, Result};
pub use evaluator::Evaluator;
pub use parser::parse;
