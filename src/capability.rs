// Capability interfaces the host plugs into the compiler, spec §6. This
// codebase has no plug-in boundary of its own elsewhere (`Env`/`Checker`
// are closed, in-crate types); grounded instead on the doc-comment-heavy
// trait style of `UOR-Foundation-UOR-Framework`'s core trait definitions,
// the one place this crate reaches for that style rather than its usual
// one since nothing closer at hand fits.

use crate::error::MemGenError;
use crate::stmt::{SrcInfo, Statement};
use crate::types::Scalar;

/// A snippet of target-language source produced by a capability hook,
/// plus any file-scope declarations it additionally requires.
#[derive(Clone, Debug, Default)]
pub struct Snippet {
    pub text: String,
    pub globals: Vec<String>,
}

impl Snippet {
    pub fn new(text: impl Into<String>) -> Snippet {
        Snippet { text: text.into(), globals: Vec::new() }
    }
}

/// A host-supplied plug-in encapsulating allocation, deallocation, and
/// load/store/reduce codegen for one storage kind (spec §6 "Memory
/// capability"). Object-safe so the compiler can hold a `dyn Memory` per
/// declared memory kind without knowing its concrete type.
pub trait Memory {
    fn name(&self) -> &str;
    fn can_read(&self) -> bool;
    fn can_write(&self) -> bool;

    /// Whether this memory kind may only be allocated by a leaf procedure
    /// (spec §4.5 static-memory check).
    fn is_static(&self) -> bool {
        false
    }

    /// Any file-scope declarations this memory kind always needs (e.g. an
    /// `#include`), emitted once per translation unit regardless of use
    /// count.
    fn global(&self) -> Option<String> {
        None
    }

    fn alloc(
        &self,
        name: &str,
        ctype: Scalar,
        shape_strs: &[String],
        srcinfo: &SrcInfo,
    ) -> Result<Snippet, MemGenError>;

    fn free(&self, name: &str, ctype: Scalar, shape_strs: &[String], srcinfo: &SrcInfo) -> Result<Snippet, MemGenError>;

    fn read(&self, stmt: &Statement, lhs: &str, rhs: &str) -> Result<Snippet, MemGenError>;

    fn write(&self, stmt: &Statement, lhs: &str, rhs: &str) -> Result<Snippet, MemGenError>;

    fn reduce(&self, stmt: &Statement, lhs: &str, rhs: &str) -> Result<Snippet, MemGenError>;

    /// A dataptr expression for a window view: `base[offset]` plus the
    /// subset of strides corresponding to preserved (range) axes.
    fn window(
        &self,
        basetype: Scalar,
        base: &str,
        offsets: &[String],
        strides: &[String],
        srcinfo: &SrcInfo,
    ) -> Result<Snippet, MemGenError>;
}

/// The default dense, heap-resident memory kind (DRAM), used whenever a
/// buffer's declaration leaves `mem` unannotated (spec §4.1 "Default
/// memory for unannotated buffers is DRAM").
pub struct DramMemory;

impl Memory for DramMemory {
    fn name(&self) -> &str {
        "DRAM"
    }

    fn can_read(&self) -> bool {
        true
    }

    fn can_write(&self) -> bool {
        true
    }

    fn alloc(&self, name: &str, ctype: Scalar, shape_strs: &[String], _srcinfo: &SrcInfo) -> Result<Snippet, MemGenError> {
        let dims: String = shape_strs.iter().map(|s| format!("[{}]", s)).collect();
        Ok(Snippet::new(format!("{} {}{};", ctype.ctype(), name, dims)))
    }

    fn free(&self, _name: &str, _ctype: Scalar, _shape_strs: &[String], _srcinfo: &SrcInfo) -> Result<Snippet, MemGenError> {
        Ok(Snippet::default())
    }

    fn read(&self, _stmt: &Statement, lhs: &str, rhs: &str) -> Result<Snippet, MemGenError> {
        Ok(Snippet::new(format!("{} = {};", lhs, rhs)))
    }

    fn write(&self, _stmt: &Statement, lhs: &str, rhs: &str) -> Result<Snippet, MemGenError> {
        Ok(Snippet::new(format!("{} = {};", lhs, rhs)))
    }

    fn reduce(&self, _stmt: &Statement, lhs: &str, rhs: &str) -> Result<Snippet, MemGenError> {
        Ok(Snippet::new(format!("{} += {};", lhs, rhs)))
    }

    fn window(&self, _basetype: Scalar, base: &str, offsets: &[String], strides: &[String], _srcinfo: &SrcInfo) -> Result<Snippet, MemGenError> {
        let offset = offsets
            .iter()
            .zip(strides.iter())
            .map(|(o, s)| format!("{}*{}", o, s))
            .collect::<Vec<_>>()
            .join(" + ");
        Ok(Snippet::new(format!("&{}[{}]", base, offset)))
    }
}

/// A host-supplied external function (spec §6 "Extern capability").
pub trait Extern {
    fn name(&self) -> &str;

    fn globl(&self, ctype: Scalar) -> Option<String> {
        let _ = ctype;
        None
    }

    fn compile(&self, args: &[String], ctype: Scalar) -> String;
}

/// A registry of host-supplied externs, keyed by name, mirroring
/// `MemoryRegistry`'s role for `Memory` capabilities.
#[derive(Default)]
pub struct ExternRegistry<'a> {
    externs: std::collections::HashMap<String, &'a dyn Extern>,
}

impl<'a> ExternRegistry<'a> {
    pub fn new() -> ExternRegistry<'a> {
        ExternRegistry { externs: std::collections::HashMap::new() }
    }

    pub fn with(mut self, e: &'a dyn Extern) -> ExternRegistry<'a> {
        self.externs.insert(e.name().to_string(), e);
        self
    }

    pub fn get(&self, name: &str) -> Result<&'a dyn Extern, crate::error::TypeError> {
        self.externs.get(name).copied().ok_or_else(|| crate::error::TypeError::UnknownExtern(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::SrcInfo;

    #[test]
    fn dram_alloc_emits_array_declaration() {
        let mem = DramMemory;
        let snippet = mem.alloc("A", Scalar::F32, &["16".to_string(), "4".to_string()], &SrcInfo::UNKNOWN).unwrap();
        assert_eq!(snippet.text, "float A[16][4];");
    }

    #[test]
    fn dram_is_not_static() {
        assert!(!DramMemory.is_static());
    }
}
