// Type vocabulary of the typed IR, spec §3 "Types".

use crate::expr::AExpr;
use crate::symbol::Symbol;
use std::fmt;

/// Numeric scalar base types. `bool` is included because predicates and
/// mask buffers share the scalar slot in a read/write statement.
#[derive(Clone, Copy, Eq, PartialEq, PartialOrd, Ord, Hash, Debug)]
pub enum Scalar {
    F16,
    F32,
    F64,
    I8,
    I32,
    UI8,
    UI16,
    Bool,
}

impl Scalar {
    /// The C-family spelling used by the lowering pass.
    pub fn ctype(&self) -> &'static str {
        match self {
            Scalar::F16 => "_Float16",
            Scalar::F32 => "float",
            Scalar::F64 => "double",
            Scalar::I8 => "int8_t",
            Scalar::I32 => "int32_t",
            Scalar::UI8 => "uint8_t",
            Scalar::UI16 => "uint16_t",
            Scalar::Bool => "bool",
        }
    }

    /// A short tag used in synthesized window struct names, e.g. `exo_win_2f32`.
    pub fn tag(&self) -> &'static str {
        match self {
            Scalar::F16 => "f16",
            Scalar::F32 => "f32",
            Scalar::F64 => "f64",
            Scalar::I8 => "i8",
            Scalar::I32 => "i32",
            Scalar::UI8 => "ui8",
            Scalar::UI16 => "ui16",
            Scalar::Bool => "bool",
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.ctype())
    }
}

/// The four "indexable" index classes, collectively what §3 calls *indexable*.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum IndexClass {
    /// `size`, statically known or symbolic, but always `>= 1`.
    Size,
    /// `index`, an arbitrary integer used to address a dimension.
    Index,
    /// `stride`, an integer scale factor between adjacent elements.
    Stride,
    /// `bool`, used by predicate-valued index contexts (masks).
    Bool,
}

/// Where a memory (capability) places buffer bytes. Only the name is
/// carried here; the behavior lives behind the `Memory` capability trait
/// (spec §6) the host supplies at lowering time.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct MemKind(pub String);

impl MemKind {
    pub fn dram() -> MemKind {
        MemKind("DRAM".to_string())
    }
}

impl fmt::Display for MemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A contiguous, row-major logical tensor: base scalar type plus a shape of
/// affine size expressions.
#[derive(Clone, Debug)]
pub struct Tensor {
    pub base: Scalar,
    pub shape: Vec<AExpr>,
    pub mem: MemKind,
}

impl Tensor {
    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

/// A strided view over another buffer: base scalar, shape, the symbol of
/// the buffer it views, and whether the view is read-only.
#[derive(Clone, Debug)]
pub struct Window {
    pub base: Scalar,
    pub shape: Vec<AExpr>,
    pub source: Symbol,
    pub is_const: bool,
}

impl Window {
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Name of the synthesized struct for this window's (scalar, rank,
    /// constness): one struct per unique combination, per spec §4.5.
    pub fn struct_name(&self) -> String {
        let c = if self.is_const { "c" } else { "" };
        format!("exo_win_{}{}{}", self.rank(), self.base.tag(), c)
    }
}

/// The resolved type of a TIR node: a numeric buffer (Tensor/Window), a
/// scalar value, or an index-class value.
#[derive(Clone, Debug)]
pub enum Type {
    Tensor(Tensor),
    Window(Window),
    Scalar(Scalar),
    Index(IndexClass),
}

impl Type {
    pub fn is_buffer(&self) -> bool {
        matches!(self, Type::Tensor(_) | Type::Window(_))
    }

    /// A short printable type name, used by the pretty-printer and by
    /// diagnostic messages.
    pub fn name(&self) -> String {
        match self {
            Type::Tensor(t) => format!("{}[{}]", t.base, t.rank()),
            Type::Window(w) => w.struct_name(),
            Type::Scalar(s) => s.to_string(),
            Type::Index(IndexClass::Size) => "size".to_string(),
            Type::Index(IndexClass::Index) => "index".to_string(),
            Type::Index(IndexClass::Stride) => "stride".to_string(),
            Type::Index(IndexClass::Bool) => "bool".to_string(),
        }
    }
}

/// Argument read/write effect, spec §3 "Procedures".
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub enum Effect {
    In,
    Out,
    InOut,
}

impl Effect {
    pub fn permits_write(&self) -> bool {
        matches!(self, Effect::Out | Effect::InOut)
    }
}
