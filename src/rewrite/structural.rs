// Structural rewrites that retype a procedure or one of its arguments
// without touching the body: `rename`, `set_window`, `set_memory` (spec
// §4.4 "Structural"). These never move a cursor, so every one of them
// returns the identity forwarding.

use super::{err, RewriteResult};
use crate::cursor::Forwarding;
use crate::stmt::Proc;
use crate::types::{MemKind, Type};
use std::rc::Rc;

/// Rename the procedure. Precondition: `name` must not collide with
/// anything the *caller* tracks as already in use (callers own that
/// namespace; we take the pre-checked uniqueness as a precondition rather
/// than re-deriving it, since the rewrite engine has no global registry of
/// procedure names -- spec §5 "no global mutable state beyond the
/// fresh-id counter").
pub fn rename(proc: &Proc, name: impl Into<String>, already_used: impl Fn(&str) -> bool) -> RewriteResult {
    let name = name.into();
    if already_used(&name) {
        return Err(err(proc.name.clone(), format!("name `{}` is already in use", name)));
    }
    let new_proc = Rc::new(Proc {
        name,
        args: proc.args.clone(),
        preconditions: proc.preconditions.clone(),
        body: proc.body.clone(),
        instr: proc.instr.clone(),
        srcinfo: proc.srcinfo.clone(),
    });
    Ok((new_proc, Forwarding::identity()))
}

/// Retype an argument between its tensor and window forms, or back.
/// Precondition: the argument exists and, when `to_window` is true, is
/// currently a `Tensor` (conversely a `Window` when going back).
pub fn set_window(proc: &Proc, arg_name: &str, to_window: bool) -> RewriteResult {
    let idx = proc
        .args
        .iter()
        .position(|a| a.sym.base() == arg_name)
        .ok_or_else(|| err(proc.name.clone(), format!("no argument named `{}`", arg_name)))?;
    let arg = &proc.args[idx];
    let new_ty = match (&arg.ty, to_window) {
        (Type::Tensor(t), true) => Type::Window(crate::types::Window {
            base: t.base,
            shape: t.shape.clone(),
            source: arg.sym.clone(),
            is_const: !arg.effect.permits_write(),
        }),
        (Type::Window(w), false) => Type::Tensor(crate::types::Tensor {
            base: w.base,
            shape: w.shape.clone(),
            mem: MemKind::dram(),
        }),
        _ => {
            return Err(err(
                proc.name.clone(),
                format!("argument `{}` is not convertible {}", arg_name, if to_window { "to a window" } else { "back to a tensor" }),
            ))
        }
    };
    let mut args = proc.args.clone();
    args[idx].ty = new_ty;
    let new_proc = Rc::new(Proc {
        name: proc.name.clone(),
        args,
        preconditions: proc.preconditions.clone(),
        body: proc.body.clone(),
        instr: proc.instr.clone(),
        srcinfo: proc.srcinfo.clone(),
    });
    Ok((new_proc, Forwarding::identity()))
}

/// Retype an `Alloc`'s memory kind. Precondition is delegated to the host:
/// the caller must confirm `mem` is writable from this allocation's
/// context (the capability trait makes that determination, spec §6); the
/// rewrite itself only rewrites the tag.
pub fn set_memory(proc: &Proc, alloc_name: &str, mem: MemKind) -> RewriteResult {
    fn rewrite(stmts: &[crate::stmt::Statement], name: &str, mem: &MemKind) -> (Vec<crate::stmt::Statement>, bool) {
        let mut found = false;
        let mut out = Vec::with_capacity(stmts.len());
        for s in stmts {
            let s = match s {
                crate::stmt::Statement::Alloc { sym, ty, mem: old_mem, srcinfo } if sym.base() == name => {
                    found = true;
                    crate::stmt::Statement::Alloc { sym: sym.clone(), ty: ty.clone(), mem: mem.clone(), srcinfo: srcinfo.clone() }
                }
                crate::stmt::Statement::If { cond, body, orelse, srcinfo } => {
                    let (b, f1) = rewrite(body, name, mem);
                    let (o, f2) = rewrite(orelse, name, mem);
                    found |= f1 || f2;
                    crate::stmt::Statement::If { cond: cond.clone(), body: crate::stmt::Node::new(b), orelse: crate::stmt::Node::new(o), srcinfo: srcinfo.clone() }
                }
                crate::stmt::Statement::For { iter, lo, hi, mode, body, srcinfo } => {
                    let (b, f1) = rewrite(body, name, mem);
                    found |= f1;
                    crate::stmt::Statement::For { iter: iter.clone(), lo: lo.clone(), hi: hi.clone(), mode: *mode, body: crate::stmt::Node::new(b), srcinfo: srcinfo.clone() }
                }
                other => other.clone(),
            };
            out.push(s);
        }
        (out, found)
    }
    let (new_body, found) = rewrite(&proc.body, alloc_name, &mem);
    if !found {
        return Err(err(proc.name.clone(), format!("no allocation named `{}`", alloc_name)));
    }
    let new_proc = super::with_body(proc, crate::stmt::Node::new(new_body));
    Ok((new_proc, Forwarding::identity()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::SrcInfo;
    use crate::symbol::Symbol;

    fn empty_proc(name: &str) -> Proc {
        Proc {
            name: name.to_string(),
            args: vec![],
            preconditions: vec![],
            body: crate::stmt::Node::new(vec![]),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        }
    }

    #[test]
    fn rename_rejects_collision() {
        let proc = empty_proc("foo");
        let result = rename(&proc, "bar", |n| n == "bar");
        assert!(result.is_err());
    }

    #[test]
    fn rename_succeeds_and_keeps_body() {
        let proc = empty_proc("foo");
        let (renamed, _) = rename(&proc, "bar", |_| false).unwrap();
        assert_eq!(renamed.name, "bar");
    }

    #[test]
    fn set_memory_rewrites_matching_alloc() {
        let mut proc = empty_proc("p");
        let sym = Symbol::fresh("buf");
        proc.body = crate::stmt::Node::new(vec![crate::stmt::Statement::Alloc {
            sym: sym.clone(),
            ty: Type::Scalar(crate::types::Scalar::F32),
            mem: MemKind::dram(),
            srcinfo: SrcInfo::UNKNOWN,
        }]);
        let (new_proc, _) = set_memory(&proc, "buf", MemKind("SRAM".to_string())).unwrap();
        let crate::stmt::Statement::Alloc { mem, .. } = &new_proc.body[0] else { panic!() };
        assert_eq!(mem.0, "SRAM");
    }

    #[test]
    fn set_memory_rejects_unknown_alloc() {
        let proc = empty_proc("p");
        assert!(set_memory(&proc, "nope", MemKind::dram()).is_err());
    }
}
