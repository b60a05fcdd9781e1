// Error taxonomy, spec §7. Each variant is structured enough for a caller
// to act on programmatically, not just print; human messages are produced
// by thiserror's `#[error(...)]` from those same fields.

use crate::symbol::Symbol;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TypeError {
    #[error("arity mismatch calling `{callee}`: expected {expected} args, got {got}")]
    Arity { callee: String, expected: usize, got: usize },

    #[error("type mismatch: expected {expected}, got {got}")]
    Mismatch { expected: String, got: String },

    #[error("unknown symbol `{0}`")]
    Undefined(String),

    #[error("non-affine expression used in an index position: {0}")]
    NonAffineIndex(String),

    #[error("write to const argument `{0}`")]
    WriteToConst(Symbol),

    #[error("call graph contains a cycle through `{0}`")]
    CyclicCall(String),

    #[error("window/tensor mismatch for argument `{0}`")]
    WindowTensorMismatch(String),

    #[error("allocation `{0}` uses a static memory kind but does not appear in a leaf procedure")]
    NonLeafStaticAlloc(String),

    #[error("loop nesting violates device-mode rules: {0}")]
    BadLoopNesting(String),

    #[error("no memory capability registered for kind `{0}`")]
    UnknownMemory(String),

    #[error("no extern capability registered for `{0}`")]
    UnknownExtern(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("scheduling error at {span}: {reason}")]
pub struct SchedulingError {
    pub span: String,
    pub reason: String,
}

impl SchedulingError {
    pub fn new(span: impl Into<String>, reason: impl Into<String>) -> SchedulingError {
        SchedulingError { span: span.into(), reason: reason.into() }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("could not parse pattern `{pattern}`: {reason}")]
pub struct ParseFragmentError {
    pub pattern: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("memory `{memory}` rejected {operation}: {reason}")]
pub struct MemGenError {
    pub memory: String,
    pub operation: String,
    pub reason: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
#[error("config `{config}.{field}` does not permit {access}")]
pub struct ConfigError {
    pub config: String,
    pub field: String,
    pub access: String,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CursorInvalid {
    #[error("cursor's procedure version has been dropped")]
    Dropped,
    #[error("cursor path `{0}` has no forwarding to the current procedure version")]
    NotForwarded(String),
    #[error("path `{0}` does not resolve in the current procedure")]
    BadPath(String),
}

/// Umbrella error for `lower::compile`, which can fail at any of the three
/// independent error boundaries spec §7 assigns to the lowering pipeline:
/// a typing/analysis violation, a capability rejecting a codegen request,
/// or a disallowed config access.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LowerError {
    #[error(transparent)]
    Type(#[from] TypeError),
    #[error(transparent)]
    MemGen(#[from] MemGenError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}
