// Staging rewrites, spec §4.4 "Staging": `stage_mem`, `stage_window`. Both
// allocate a fresh local buffer for a region already proven affine,
// rewrite the target's reads/writes to go through it, and bracket the
// target with copy-in/copy-out (or, for a window, a single `WindowStmt`
// binding).
//
// Scoped to `n_lifts == 0` -- staging directly around the target
// statement without hoisting the allocation past an enclosing loop.
// Hoisting past loops is a straightforward repeated application of this
// same bracket one level up per `n_lifts`, left unimplemented here; callers
// that need it currently get a `SchedulingError` rather than silently
// skipping the lift.

use super::{err, splice, target_path, RewriteResult};
use crate::cursor::{Cursor, Forwarding};
use crate::expr::{AExpr, Slice, ValExpr};
use crate::stmt::{LoopMode, Node, Proc, Statement};
use crate::symbol::Symbol;
use crate::types::{MemKind, Scalar, Tensor, Type};
use std::rc::Rc;

fn valexpr_reads_and_subst(e: &ValExpr, src: &Symbol, iter: &Symbol, lo: &AExpr, new_buf: &Symbol) -> (ValExpr, bool) {
    match e {
        ValExpr::Read(s, idx) if s == src && idx.len() == 1 && matches!(&idx[0], AExpr::AVar(v) if v == iter) => {
            (ValExpr::Read(new_buf.clone(), vec![AExpr::sub(AExpr::AVar(iter.clone()), lo.clone())]), true)
        }
        ValExpr::Read(s, idx) => (ValExpr::Read(s.clone(), idx.clone()), false),
        ValExpr::Const(c) => (ValExpr::Const(*c), false),
        ValExpr::BinOp(op, a, b) => {
            let (a2, fa) = valexpr_reads_and_subst(a, src, iter, lo, new_buf);
            let (b2, fb) = valexpr_reads_and_subst(b, src, iter, lo, new_buf);
            (ValExpr::BinOp(*op, Rc::new(a2), Rc::new(b2)), fa || fb)
        }
        ValExpr::USub(a) => {
            let (a2, fa) = valexpr_reads_and_subst(a, src, iter, lo, new_buf);
            (ValExpr::USub(Rc::new(a2)), fa)
        }
        ValExpr::StrideExpr(s, d) => (ValExpr::StrideExpr(s.clone(), *d), false),
        ValExpr::ReadConfig(c, f) => (ValExpr::ReadConfig(c.clone(), f.clone()), false),
        ValExpr::Extern(f, args) => {
            let mut found = false;
            let args = args
                .iter()
                .map(|a| {
                    let (a2, fa) = valexpr_reads_and_subst(a, src, iter, lo, new_buf);
                    found |= fa;
                    a2
                })
                .collect();
            (ValExpr::Extern(f.clone(), args), found)
        }
        ValExpr::WindowExpr(s, slices) => (ValExpr::WindowExpr(s.clone(), slices.clone()), false),
        ValExpr::Select(p, a) => {
            let (a2, fa) = valexpr_reads_and_subst(a, src, iter, lo, new_buf);
            (ValExpr::Select(p.clone(), Rc::new(a2)), fa)
        }
    }
}

/// Rewrite every `Read(src, [iter])` reachable inside `stmt` to read from
/// `new_buf` instead, and report whether `src` is ever *written* at index
/// `[iter]` (needed to know if a copy-out is required). Recurses into
/// nested blocks so a staged loop body below the target is also covered.
fn restage(stmt: &Statement, src: &Symbol, iter: &Symbol, lo: &AExpr, new_buf: &Symbol) -> (Statement, bool, bool) {
    match stmt {
        Statement::Assign { sym, idx, rhs, srcinfo } => {
            let (rhs2, read) = valexpr_reads_and_subst(rhs, src, iter, lo, new_buf);
            let writes = sym == src && idx.len() == 1 && matches!(&idx[0], AExpr::AVar(v) if v == iter);
            let (sym2, idx2) = if writes { (new_buf.clone(), vec![AExpr::sub(AExpr::AVar(iter.clone()), lo.clone())]) } else { (sym.clone(), idx.clone()) };
            (Statement::Assign { sym: sym2, idx: idx2, rhs: rhs2, srcinfo: srcinfo.clone() }, read, writes)
        }
        Statement::Reduce { sym, idx, rhs, srcinfo } => {
            let (rhs2, read) = valexpr_reads_and_subst(rhs, src, iter, lo, new_buf);
            let writes = sym == src && idx.len() == 1 && matches!(&idx[0], AExpr::AVar(v) if v == iter);
            let (sym2, idx2) = if writes { (new_buf.clone(), vec![AExpr::sub(AExpr::AVar(iter.clone()), lo.clone())]) } else { (sym.clone(), idx.clone()) };
            (Statement::Reduce { sym: sym2, idx: idx2, rhs: rhs2, srcinfo: srcinfo.clone() }, read, writes)
        }
        Statement::If { cond, body, orelse, srcinfo } => {
            let mut read = false;
            let mut write = false;
            let body2: Vec<Statement> = body
                .iter()
                .map(|s| {
                    let (s2, r, w) = restage(s, src, iter, lo, new_buf);
                    read |= r;
                    write |= w;
                    s2
                })
                .collect();
            let orelse2: Vec<Statement> = orelse
                .iter()
                .map(|s| {
                    let (s2, r, w) = restage(s, src, iter, lo, new_buf);
                    read |= r;
                    write |= w;
                    s2
                })
                .collect();
            (Statement::If { cond: cond.clone(), body: Node::new(body2), orelse: Node::new(orelse2), srcinfo: srcinfo.clone() }, read, write)
        }
        Statement::For { iter: i, lo: flo, hi, mode, body, srcinfo } => {
            let mut read = false;
            let mut write = false;
            let body2: Vec<Statement> = body
                .iter()
                .map(|s| {
                    let (s2, r, w) = restage(s, src, iter, lo, new_buf);
                    read |= r;
                    write |= w;
                    s2
                })
                .collect();
            (
                Statement::For { iter: i.clone(), lo: flo.clone(), hi: hi.clone(), mode: *mode, body: Node::new(body2), srcinfo: srcinfo.clone() },
                read,
                write,
            )
        }
        Statement::With { tag, body, srcinfo } => {
            let mut read = false;
            let mut write = false;
            let body2: Vec<Statement> = body
                .iter()
                .map(|s| {
                    let (s2, r, w) = restage(s, src, iter, lo, new_buf);
                    read |= r;
                    write |= w;
                    s2
                })
                .collect();
            (Statement::With { tag: tag.clone(), body: Node::new(body2), srcinfo: srcinfo.clone() }, read, write)
        }
        other => (other.clone(), false, false),
    }
}

/// `stage_mem(expr, name, n_lifts)`: lift the 1-D affine region
/// `src[iter]` for `iter` in `[lo, hi)` into a freshly allocated local
/// buffer `name`, copying in before the target and out after if the
/// target ever writes `src`.
pub fn stage_mem(
    proc: &Rc<Proc>,
    target: &Cursor,
    name: &str,
    base: Scalar,
    src: &Symbol,
    iter: &Symbol,
    lo: AExpr,
    hi: AExpr,
    mem: MemKind,
    n_lifts: usize,
) -> RewriteResult {
    if n_lifts != 0 {
        return Err(err("stage_mem", "only n_lifts == 0 (staging at the target itself) is supported"));
    }
    let path = target_path(target)?;
    let stmt = target.node().map_err(|e| err("stage_mem", e.to_string()))?;

    let new_buf = Symbol::fresh(name);
    let (rewritten, read, wrote) = restage(&stmt, src, iter, &lo, &new_buf);
    if !read && !wrote {
        return Err(err("stage_mem", format!("target never reads or writes `{}` at index `{}`", src, iter)));
    }

    let region = AExpr::sub(hi.clone(), lo.clone());
    let srcinfo = stmt.srcinfo().clone();
    let alloc = Statement::Alloc {
        sym: new_buf.clone(),
        ty: Type::Tensor(Tensor { base, shape: vec![region.clone()], mem: mem.clone() }),
        mem: mem.clone(),
        srcinfo: srcinfo.clone(),
    };
    let free = Statement::Free {
        sym: new_buf.clone(),
        ty: Type::Tensor(Tensor { base, shape: vec![region], mem: mem.clone() }),
        mem,
        srcinfo: srcinfo.clone(),
    };

    let mut out = vec![alloc];
    if read {
        let j = Symbol::fresh("stage_i");
        out.push(Statement::For {
            iter: j.clone(),
            lo: lo.clone(),
            hi: hi.clone(),
            mode: LoopMode::Seq,
            body: Node::new(vec![Statement::Assign {
                sym: new_buf.clone(),
                idx: vec![AExpr::sub(AExpr::AVar(j.clone()), lo.clone())],
                rhs: ValExpr::Read(src.clone(), vec![AExpr::AVar(j)]),
                srcinfo: srcinfo.clone(),
            }]),
            srcinfo: srcinfo.clone(),
        });
    }
    out.push(rewritten);
    if wrote {
        let j = Symbol::fresh("stage_o");
        out.push(Statement::For {
            iter: j.clone(),
            lo: lo.clone(),
            hi: hi.clone(),
            mode: LoopMode::Seq,
            body: Node::new(vec![Statement::Assign {
                sym: src.clone(),
                idx: vec![AExpr::AVar(j.clone())],
                rhs: ValExpr::Read(new_buf.clone(), vec![AExpr::sub(AExpr::AVar(j), lo.clone())]),
                srcinfo: srcinfo.clone(),
            }]),
            srcinfo: srcinfo.clone(),
        });
    }
    out.push(free);

    let new_proc = splice(proc, &path, out);
    let block_path = path.parent().unwrap_or_else(crate::cursor::Path::root);
    let idx = crate::cursor::step_index(path.0.last().unwrap());
    let fwd = Forwarding::with_remap(vec![(path, crate::cursor::ForwardResult::ToGap(block_path, idx + if read { 1 } else { 0 }))]);
    Ok((new_proc, fwd))
}

/// `stage_window(read, name, mem)`: bind a `WindowExpr` appearing in the
/// target statement to a freshly named window symbol via an explicit
/// `WindowStmt`, so later rewrites and the lowering pass can address it by
/// name. Precondition: the window's slices are all `Range` (a genuinely
/// contiguous sub-region, never a point-indexed scalar projection).
pub fn stage_window(proc: &Rc<Proc>, target: &Cursor, name: &str) -> RewriteResult {
    let path = target_path(target)?;
    let stmt = target.node().map_err(|e| err("stage_window", e.to_string()))?;

    let (src, slices) = find_window(&stmt).ok_or_else(|| err("stage_window", "target does not read via a window expression"))?;
    if !slices.iter().all(|s| matches!(s, Slice::Range(_, _))) {
        return Err(err("stage_window", "window does not address a contiguous region"));
    }

    let new_name = Symbol::fresh(name);
    let window_stmt = Statement::WindowStmt {
        name: new_name.clone(),
        expr: (src.clone(), slices.clone()),
        srcinfo: stmt.srcinfo().clone(),
    };
    let identity_slices: Vec<Slice> = slices
        .iter()
        .map(|s| match s {
            Slice::Range(lo, hi) => Slice::Range(AExpr::sub(lo.clone(), lo.clone()), AExpr::sub(hi.clone(), lo.clone())),
            Slice::Point(p) => Slice::Point(p.clone()),
        })
        .collect();
    let rewritten = replace_window(&stmt, &src, &slices, &new_name, &identity_slices);

    let new_proc = splice(proc, &path, vec![window_stmt, rewritten]);
    let block_path = path.parent().unwrap_or_else(crate::cursor::Path::root);
    let idx = crate::cursor::step_index(path.0.last().unwrap());
    let fwd = Forwarding::with_remap(vec![(path, crate::cursor::ForwardResult::ToGap(block_path, idx + 1))]);
    Ok((new_proc, fwd))
}

fn find_window(stmt: &Statement) -> Option<(Symbol, Vec<Slice>)> {
    fn in_val(e: &ValExpr) -> Option<(Symbol, Vec<Slice>)> {
        match e {
            ValExpr::WindowExpr(s, slices) => Some((s.clone(), slices.clone())),
            ValExpr::BinOp(_, a, b) => in_val(a).or_else(|| in_val(b)),
            ValExpr::USub(a) | ValExpr::Select(_, a) => in_val(a),
            ValExpr::Extern(_, args) => args.iter().find_map(in_val),
            _ => None,
        }
    }
    match stmt {
        Statement::Assign { rhs, .. } | Statement::Reduce { rhs, .. } => in_val(rhs),
        _ => None,
    }
}

fn replace_window(stmt: &Statement, src: &Symbol, slices: &[Slice], new_name: &Symbol, new_slices: &[Slice]) -> Statement {
    fn in_val(e: &ValExpr, src: &Symbol, slices: &[Slice], new_name: &Symbol, new_slices: &[Slice]) -> ValExpr {
        match e {
            ValExpr::WindowExpr(s, sl) if s == src && sl.len() == slices.len() => {
                ValExpr::WindowExpr(new_name.clone(), new_slices.to_vec())
            }
            ValExpr::BinOp(op, a, b) => ValExpr::BinOp(
                *op,
                Rc::new(in_val(a, src, slices, new_name, new_slices)),
                Rc::new(in_val(b, src, slices, new_name, new_slices)),
            ),
            ValExpr::USub(a) => ValExpr::USub(Rc::new(in_val(a, src, slices, new_name, new_slices))),
            ValExpr::Select(p, a) => ValExpr::Select(p.clone(), Rc::new(in_val(a, src, slices, new_name, new_slices))),
            ValExpr::Extern(f, args) => {
                ValExpr::Extern(f.clone(), args.iter().map(|a| in_val(a, src, slices, new_name, new_slices)).collect())
            }
            other => other.clone(),
        }
    }
    match stmt {
        Statement::Assign { sym, idx, rhs, srcinfo } => Statement::Assign {
            sym: sym.clone(),
            idx: idx.clone(),
            rhs: in_val(rhs, src, slices, new_name, new_slices),
            srcinfo: srcinfo.clone(),
        },
        Statement::Reduce { sym, idx, rhs, srcinfo } => Statement::Reduce {
            sym: sym.clone(),
            idx: idx.clone(),
            rhs: in_val(rhs, src, slices, new_name, new_slices),
            srcinfo: srcinfo.clone(),
        },
        other => other.clone(),
    }
}
