//! # FHIRBind Core
//!
//! Core data model for binding-driven validation of clinical records: the
//! node view over external records, binding metadata, structural
//! definitions, constraints, issues, and the injected capabilities
//! (terminology membership, definition resolution) the engine depends on.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binding;
pub mod constraint;
pub mod definition;
pub mod element;
pub mod error;
pub mod issue;
pub mod node;
pub mod terminology;

pub use binding::{Binding, BindingStrength};
pub use constraint::{Constraint, ConstraintSeverity, ConstraintSource, BASE_LOCATION};
pub use definition::{DefinitionResolver, InMemoryDefinitionResolver, StructureDefinition};
pub use element::ElementDefinition;
pub use error::{CardinalityError, Error, Result};
pub use issue::{Issue, Severity};
pub use node::{Collection, Item, Node, Scalar};
pub use terminology::{InMemoryTerminology, TerminologyError, TerminologyProvider};
