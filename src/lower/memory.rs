// Memory analysis, spec §4.5 pass (iv): confirms every read/write targets
// a memory kind declaring the right `can_read`/`can_write` capability, and
// enforces the static-memory check -- "a procedure allocating a buffer
// whose memory kind is marked static must be a leaf (it may only call
// instruction-macro procedures)".

use crate::capability::Memory;
use crate::error::TypeError;
use crate::expr::{Pred, Slice, ValExpr};
use crate::stmt::{Proc, Statement};
use crate::symbol::Symbol;
use crate::types::MemKind;
use std::collections::HashMap;

/// A registry of host-supplied memory capabilities, keyed by the `MemKind`
/// name a buffer's declaration carries (spec §6 "Memory capability").
pub struct MemoryRegistry<'a> {
    memories: HashMap<String, &'a dyn Memory>,
}

impl<'a> MemoryRegistry<'a> {
    pub fn new() -> MemoryRegistry<'a> {
        MemoryRegistry { memories: HashMap::new() }
    }

    pub fn with(mut self, mem: &'a dyn Memory) -> MemoryRegistry<'a> {
        self.memories.insert(mem.name().to_string(), mem);
        self
    }

    pub fn get(&self, kind: &MemKind) -> Result<&'a dyn Memory, TypeError> {
        self.memories.get(&kind.0).copied().ok_or_else(|| TypeError::UnknownMemory(kind.0.clone()))
    }
}

impl<'a> Default for MemoryRegistry<'a> {
    fn default() -> MemoryRegistry<'a> {
        MemoryRegistry::new()
    }
}

/// Symbol id -> declared memory kind, gathered from a procedure's buffer
/// arguments and allocations.
fn mem_map(proc: &Proc) -> HashMap<u64, MemKind> {
    let mut map = HashMap::new();
    for arg in &proc.args {
        if arg.ty.is_buffer() {
            map.insert(arg.sym.id(), arg.mem.clone());
        }
    }
    collect_allocs(&proc.body, &mut map);
    map
}

fn collect_allocs(stmts: &[Statement], map: &mut HashMap<u64, MemKind>) {
    for s in stmts {
        match s {
            Statement::Alloc { sym, mem, .. } => {
                map.insert(sym.id(), mem.clone());
            }
            Statement::If { body, orelse, .. } => {
                collect_allocs(body, map);
                collect_allocs(orelse, map);
            }
            Statement::For { body, .. } | Statement::With { body, .. } => collect_allocs(body, map),
            _ => {}
        }
    }
}

/// Does `proc` allocate any buffer whose memory kind is `static` (spec
/// §4.5's leaf-procedure precondition)?
fn allocates_static(proc: &Proc, registry: &MemoryRegistry) -> Result<bool, TypeError> {
    fn walk(stmts: &[Statement], registry: &MemoryRegistry) -> Result<bool, TypeError> {
        for s in stmts {
            match s {
                Statement::Alloc { mem, .. } => {
                    if registry.get(mem)?.is_static() {
                        return Ok(true);
                    }
                }
                Statement::If { body, orelse, .. } => {
                    if walk(body, registry)? || walk(orelse, registry)? {
                        return Ok(true);
                    }
                }
                Statement::For { body, .. } | Statement::With { body, .. } => {
                    if walk(body, registry)? {
                        return Ok(true);
                    }
                }
                _ => {}
            }
        }
        Ok(false)
    }
    walk(&proc.body, registry)
}

/// Does `proc` call anything other than an instruction-macro procedure?
fn calls_non_instr_proc(proc: &Proc) -> bool {
    fn walk(stmts: &[Statement]) -> bool {
        for s in stmts {
            match s {
                Statement::Call { callee, .. } if callee.instr.is_none() => return true,
                Statement::If { body, orelse, .. } => {
                    if walk(body) || walk(orelse) {
                        return true;
                    }
                }
                Statement::For { body, .. } | Statement::With { body, .. } => {
                    if walk(body) {
                        return true;
                    }
                }
                _ => {}
            }
        }
        false
    }
    walk(&proc.body)
}

/// Walk `proc` confirming every read/write/reduce targets a memory that
/// permits it, and that the static-memory/leaf precondition holds.
pub fn check_proc(proc: &Proc, registry: &MemoryRegistry) -> Result<(), TypeError> {
    if allocates_static(proc, registry)? && calls_non_instr_proc(proc) {
        return Err(TypeError::NonLeafStaticAlloc(proc.name.clone()));
    }
    let mems = mem_map(proc);
    check_block(&proc.body, &mems, registry)
}

fn require(mems: &HashMap<u64, MemKind>, registry: &MemoryRegistry, sym: &Symbol, write: bool) -> Result<(), TypeError> {
    let Some(kind) = mems.get(&sym.id()) else { return Ok(()) };
    let mem = registry.get(kind)?;
    let ok = if write { mem.can_write() } else { mem.can_read() };
    if !ok {
        return Err(TypeError::Mismatch {
            expected: if write { "writable memory".to_string() } else { "readable memory".to_string() },
            got: format!("{} ({})", sym, kind),
        });
    }
    Ok(())
}

fn check_value(e: &ValExpr, mems: &HashMap<u64, MemKind>, registry: &MemoryRegistry) -> Result<(), TypeError> {
    match e {
        ValExpr::Read(sym, _) => require(mems, registry, sym, false),
        ValExpr::WindowExpr(sym, slices) => {
            require(mems, registry, sym, false)?;
            for s in slices {
                match s {
                    Slice::Point(_) => {}
                    Slice::Range(_, _) => {}
                }
            }
            Ok(())
        }
        ValExpr::BinOp(_, a, b) => {
            check_value(a, mems, registry)?;
            check_value(b, mems, registry)
        }
        ValExpr::USub(a) => check_value(a, mems, registry),
        ValExpr::Extern(_, args) => {
            for a in args {
                check_value(a, mems, registry)?;
            }
            Ok(())
        }
        ValExpr::Select(p, e) => {
            check_pred(p, mems, registry)?;
            check_value(e, mems, registry)
        }
        ValExpr::Const(_) | ValExpr::StrideExpr(..) | ValExpr::ReadConfig(..) => Ok(()),
    }
}

fn check_pred(p: &Pred, mems: &HashMap<u64, MemKind>, registry: &MemoryRegistry) -> Result<(), TypeError> {
    match p {
        Pred::And(a, b) | Pred::Or(a, b) => {
            check_pred(a, mems, registry)?;
            check_pred(b, mems, registry)
        }
        Pred::Cmp(..) | Pred::BConst(_) => Ok(()),
    }
}

fn check_block(stmts: &[Statement], mems: &HashMap<u64, MemKind>, registry: &MemoryRegistry) -> Result<(), TypeError> {
    for s in stmts {
        match s {
            Statement::Assign { sym, rhs, .. } => {
                require(mems, registry, sym, true)?;
                check_value(rhs, mems, registry)?;
            }
            Statement::Reduce { sym, rhs, .. } => {
                require(mems, registry, sym, true)?;
                require(mems, registry, sym, false)?;
                check_value(rhs, mems, registry)?;
            }
            Statement::If { cond, body, orelse, .. } => {
                check_pred(cond, mems, registry)?;
                check_block(body, mems, registry)?;
                check_block(orelse, mems, registry)?;
            }
            Statement::For { body, .. } | Statement::With { body, .. } => check_block(body, mems, registry)?,
            Statement::Call { args, .. } => {
                for a in args {
                    check_value(a, mems, registry)?;
                }
            }
            Statement::WriteConfig { rhs, .. } => check_value(rhs, mems, registry)?,
            _ => {}
        }
    }
    Ok(())
}
