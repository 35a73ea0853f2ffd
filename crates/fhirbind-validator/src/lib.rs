//! # FHIRBind Validator
//!
//! Constraint generation and record validation: synthesizes binding
//! constraints from structural definitions, compiles their expressions
//! through a shared cache, and evaluates them against record instances,
//! reporting issues without short-circuiting on the first failure.

#![warn(clippy::all)]

pub mod cache;
pub mod error;
pub mod generator;
pub mod validator;

pub use cache::ExpressionCache;
pub use error::{ValidatorError, ValidatorResult};
pub use generator::ConstraintGenerator;
pub use validator::RecordValidator;
