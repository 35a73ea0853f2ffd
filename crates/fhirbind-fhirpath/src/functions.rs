//! Built-in function registry.
//!
//! Every function declares an arity range; calls outside that range are
//! rejected at compile time, as are calls to names not in the registry.

/// Declared signature of a built-in function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: &'static str,
    pub min_arity: usize,
    pub max_arity: usize,
    /// The argument is a bare type name rather than a value expression.
    pub type_argument: bool,
}

const fn sig(name: &'static str, min_arity: usize, max_arity: usize) -> FunctionSignature {
    FunctionSignature {
        name,
        min_arity,
        max_arity,
        type_argument: false,
    }
}

const fn type_sig(name: &'static str) -> FunctionSignature {
    FunctionSignature {
        name,
        min_arity: 1,
        max_arity: 1,
        type_argument: true,
    }
}

static FUNCTIONS: &[FunctionSignature] = &[
    sig("exists", 0, 1),
    sig("empty", 0, 0),
    sig("all", 1, 1),
    sig("hasValue", 0, 0),
    sig("count", 0, 0),
    sig("first", 0, 0),
    sig("not", 0, 0),
    sig("where", 1, 1),
    type_sig("as"),
    type_sig("is"),
    sig("memberOf", 2, 2),
];

/// Look up a function by name.
pub fn signature(name: &str) -> Option<&'static FunctionSignature> {
    FUNCTIONS.iter().find(|s| s.name == name)
}
