// Shared substitution helpers used by several rewrites (`divide_loop`,
// `unroll_loop`, `inline`, `stage_mem`): replacing one symbol's affine
// occurrences with a new expression throughout a statement tree. Kept as
// its own small module since five catalog entries need exactly this, and
// duplicating a tree-walk five times is the kind of repetition `vm.rs`
// factors into one macro/helper instead.

use crate::expr::{AExpr, Pred, Slice, ValExpr};
use crate::stmt::{Node, Statement};
use crate::symbol::Symbol;
use std::rc::Rc;

pub fn aexpr(e: &AExpr, sym: &Symbol, with: &AExpr) -> AExpr {
    match e {
        AExpr::AVar(s) if s == sym => with.clone(),
        AExpr::AVar(_) | AExpr::ASize(_) | AExpr::AConst(_) => e.clone(),
        AExpr::AAdd(a, b) => AExpr::add(aexpr(a, sym, with), aexpr(b, sym, with)),
        AExpr::ASub(a, b) => AExpr::sub(aexpr(a, sym, with), aexpr(b, sym, with)),
        AExpr::AScale(k, a) => AExpr::scale(*k, aexpr(a, sym, with)),
        AExpr::AScaleDiv(a, k) => AExpr::scale_div(aexpr(a, sym, with), *k),
    }
}

pub fn pred(p: &Pred, sym: &Symbol, with: &AExpr) -> Pred {
    match p {
        Pred::BConst(b) => Pred::BConst(*b),
        Pred::And(a, b) => Pred::and(pred(a, sym, with), pred(b, sym, with)),
        Pred::Or(a, b) => Pred::or(pred(a, sym, with), pred(b, sym, with)),
        Pred::Cmp(op, a, b) => Pred::cmp(*op, aexpr(a, sym, with), aexpr(b, sym, with)),
    }
}

fn slice(s: &Slice, sym: &Symbol, with: &AExpr) -> Slice {
    match s {
        Slice::Point(e) => Slice::Point(aexpr(e, sym, with)),
        Slice::Range(lo, hi) => Slice::Range(aexpr(lo, sym, with), aexpr(hi, sym, with)),
    }
}

pub fn valexpr(e: &ValExpr, sym: &Symbol, with: &AExpr) -> ValExpr {
    match e {
        ValExpr::Read(s, idx) => ValExpr::Read(s.clone(), idx.iter().map(|i| aexpr(i, sym, with)).collect()),
        ValExpr::Const(c) => ValExpr::Const(*c),
        ValExpr::BinOp(op, a, b) => ValExpr::BinOp(*op, Rc::new(valexpr(a, sym, with)), Rc::new(valexpr(b, sym, with))),
        ValExpr::USub(a) => ValExpr::USub(Rc::new(valexpr(a, sym, with))),
        ValExpr::StrideExpr(s, dim) => ValExpr::StrideExpr(s.clone(), *dim),
        ValExpr::ReadConfig(cfg, field) => ValExpr::ReadConfig(cfg.clone(), field.clone()),
        ValExpr::Extern(f, args) => ValExpr::Extern(f.clone(), args.iter().map(|a| valexpr(a, sym, with)).collect()),
        ValExpr::WindowExpr(s, slices) => ValExpr::WindowExpr(s.clone(), slices.iter().map(|s| slice(s, sym, with)).collect()),
        ValExpr::Select(p, e) => ValExpr::Select(Rc::new(pred(p, sym, with)), Rc::new(valexpr(e, sym, with))),
    }
}

pub fn block(stmts: &[Statement], sym: &Symbol, with: &AExpr) -> Vec<Statement> {
    stmts.iter().map(|s| stmt(s, sym, with)).collect()
}

pub fn stmt(s: &Statement, sym: &Symbol, with: &AExpr) -> Statement {
    match s {
        Statement::Pass { srcinfo } => Statement::Pass { srcinfo: srcinfo.clone() },
        Statement::Assign { sym: target, idx, rhs, srcinfo } => Statement::Assign {
            sym: target.clone(),
            idx: idx.iter().map(|i| aexpr(i, sym, with)).collect(),
            rhs: valexpr(rhs, sym, with),
            srcinfo: srcinfo.clone(),
        },
        Statement::Reduce { sym: target, idx, rhs, srcinfo } => Statement::Reduce {
            sym: target.clone(),
            idx: idx.iter().map(|i| aexpr(i, sym, with)).collect(),
            rhs: valexpr(rhs, sym, with),
            srcinfo: srcinfo.clone(),
        },
        Statement::Alloc { .. } | Statement::Free { .. } => s.clone(),
        Statement::If { cond, body, orelse, srcinfo } => Statement::If {
            cond: pred(cond, sym, with),
            body: Node::new(block(body, sym, with)),
            orelse: Node::new(block(orelse, sym, with)),
            srcinfo: srcinfo.clone(),
        },
        Statement::For { iter, lo, hi, mode, body, srcinfo } => Statement::For {
            iter: iter.clone(),
            lo: aexpr(lo, sym, with),
            hi: aexpr(hi, sym, with),
            mode: *mode,
            body: Node::new(block(body, sym, with)),
            srcinfo: srcinfo.clone(),
        },
        Statement::Call { callee, args, srcinfo } => Statement::Call {
            callee: callee.clone(),
            args: args.iter().map(|a| valexpr(a, sym, with)).collect(),
            srcinfo: srcinfo.clone(),
        },
        Statement::WindowStmt { name, expr, srcinfo } => {
            let (src, slices) = expr;
            Statement::WindowStmt {
                name: name.clone(),
                expr: (src.clone(), slices.iter().map(|s| slice(s, sym, with)).collect()),
                srcinfo: srcinfo.clone(),
            }
        }
        Statement::WriteConfig { cfg, field, rhs, srcinfo } => Statement::WriteConfig {
            cfg: cfg.clone(),
            field: field.clone(),
            rhs: valexpr(rhs, sym, with),
            srcinfo: srcinfo.clone(),
        },
        Statement::Sync { codegen, srcinfo } => Statement::Sync { codegen: codegen.clone(), srcinfo: srcinfo.clone() },
        Statement::With { tag, body, srcinfo } => {
            Statement::With { tag: tag.clone(), body: Node::new(block(body, sym, with)), srcinfo: srcinfo.clone() }
        }
    }
}

/// Replace every occurrence of `sym` (as a binder or a leaf reference) with
/// `with` throughout a statement tree. Used by `inline` both to bind a
/// formal buffer/window argument to the symbol the caller actually passed,
/// and to alpha-rename the callee's own locals (fresh allocs, loop
/// iterators, window names) so they cannot capture or collide with names
/// already live at the call site.
pub fn rename_sym_block(stmts: &[Statement], sym: &Symbol, with: &Symbol) -> Vec<Statement> {
    stmts.iter().map(|s| rename_sym_stmt(s, sym, with)).collect()
}

fn rename_sym_aexpr(e: &AExpr, sym: &Symbol, with: &Symbol) -> AExpr {
    match e {
        AExpr::AVar(s) if s == sym => AExpr::AVar(with.clone()),
        AExpr::ASize(s) if s == sym => AExpr::ASize(with.clone()),
        AExpr::AVar(_) | AExpr::ASize(_) | AExpr::AConst(_) => e.clone(),
        AExpr::AAdd(a, b) => AExpr::add(rename_sym_aexpr(a, sym, with), rename_sym_aexpr(b, sym, with)),
        AExpr::ASub(a, b) => AExpr::sub(rename_sym_aexpr(a, sym, with), rename_sym_aexpr(b, sym, with)),
        AExpr::AScale(k, a) => AExpr::scale(*k, rename_sym_aexpr(a, sym, with)),
        AExpr::AScaleDiv(a, k) => AExpr::scale_div(rename_sym_aexpr(a, sym, with), *k),
    }
}

fn rename_sym_pred(p: &Pred, sym: &Symbol, with: &Symbol) -> Pred {
    match p {
        Pred::BConst(b) => Pred::BConst(*b),
        Pred::And(a, b) => Pred::and(rename_sym_pred(a, sym, with), rename_sym_pred(b, sym, with)),
        Pred::Or(a, b) => Pred::or(rename_sym_pred(a, sym, with), rename_sym_pred(b, sym, with)),
        Pred::Cmp(op, a, b) => Pred::cmp(*op, rename_sym_aexpr(a, sym, with), rename_sym_aexpr(b, sym, with)),
    }
}

fn rename_sym_slice(s: &Slice, sym: &Symbol, with: &Symbol) -> Slice {
    match s {
        Slice::Point(e) => Slice::Point(rename_sym_aexpr(e, sym, with)),
        Slice::Range(lo, hi) => Slice::Range(rename_sym_aexpr(lo, sym, with), rename_sym_aexpr(hi, sym, with)),
    }
}

fn rename_sym_valexpr(e: &ValExpr, sym: &Symbol, with: &Symbol) -> ValExpr {
    match e {
        ValExpr::Read(s, idx) => ValExpr::Read(
            if s == sym { with.clone() } else { s.clone() },
            idx.iter().map(|i| rename_sym_aexpr(i, sym, with)).collect(),
        ),
        ValExpr::Const(c) => ValExpr::Const(*c),
        ValExpr::BinOp(op, a, b) => {
            ValExpr::BinOp(*op, Rc::new(rename_sym_valexpr(a, sym, with)), Rc::new(rename_sym_valexpr(b, sym, with)))
        }
        ValExpr::USub(a) => ValExpr::USub(Rc::new(rename_sym_valexpr(a, sym, with))),
        ValExpr::StrideExpr(s, dim) => ValExpr::StrideExpr(if s == sym { with.clone() } else { s.clone() }, *dim),
        ValExpr::ReadConfig(cfg, field) => ValExpr::ReadConfig(cfg.clone(), field.clone()),
        ValExpr::Extern(f, args) => {
            ValExpr::Extern(f.clone(), args.iter().map(|a| rename_sym_valexpr(a, sym, with)).collect())
        }
        ValExpr::WindowExpr(s, slices) => ValExpr::WindowExpr(
            if s == sym { with.clone() } else { s.clone() },
            slices.iter().map(|s| rename_sym_slice(s, sym, with)).collect(),
        ),
        ValExpr::Select(p, e) => {
            ValExpr::Select(Rc::new(rename_sym_pred(p, sym, with)), Rc::new(rename_sym_valexpr(e, sym, with)))
        }
    }
}

pub fn rename_sym_stmt(s: &Statement, sym: &Symbol, with: &Symbol) -> Statement {
    let r = |t: &Symbol| if t == sym { with.clone() } else { t.clone() };
    match s {
        Statement::Pass { srcinfo } => Statement::Pass { srcinfo: srcinfo.clone() },
        Statement::Assign { sym: target, idx, rhs, srcinfo } => Statement::Assign {
            sym: r(target),
            idx: idx.iter().map(|i| rename_sym_aexpr(i, sym, with)).collect(),
            rhs: rename_sym_valexpr(rhs, sym, with),
            srcinfo: srcinfo.clone(),
        },
        Statement::Reduce { sym: target, idx, rhs, srcinfo } => Statement::Reduce {
            sym: r(target),
            idx: idx.iter().map(|i| rename_sym_aexpr(i, sym, with)).collect(),
            rhs: rename_sym_valexpr(rhs, sym, with),
            srcinfo: srcinfo.clone(),
        },
        Statement::Alloc { sym: target, ty, mem, srcinfo } => {
            Statement::Alloc { sym: r(target), ty: ty.clone(), mem: mem.clone(), srcinfo: srcinfo.clone() }
        }
        Statement::Free { sym: target, ty, mem, srcinfo } => {
            Statement::Free { sym: r(target), ty: ty.clone(), mem: mem.clone(), srcinfo: srcinfo.clone() }
        }
        Statement::If { cond, body, orelse, srcinfo } => Statement::If {
            cond: rename_sym_pred(cond, sym, with),
            body: Node::new(rename_sym_block(body, sym, with)),
            orelse: Node::new(rename_sym_block(orelse, sym, with)),
            srcinfo: srcinfo.clone(),
        },
        Statement::For { iter, lo, hi, mode, body, srcinfo } => Statement::For {
            iter: r(iter),
            lo: rename_sym_aexpr(lo, sym, with),
            hi: rename_sym_aexpr(hi, sym, with),
            mode: *mode,
            body: Node::new(rename_sym_block(body, sym, with)),
            srcinfo: srcinfo.clone(),
        },
        Statement::Call { callee, args, srcinfo } => Statement::Call {
            callee: callee.clone(),
            args: args.iter().map(|a| rename_sym_valexpr(a, sym, with)).collect(),
            srcinfo: srcinfo.clone(),
        },
        Statement::WindowStmt { name, expr, srcinfo } => {
            let (src, slices) = expr;
            Statement::WindowStmt {
                name: r(name),
                expr: (r(src), slices.iter().map(|s| rename_sym_slice(s, sym, with)).collect()),
                srcinfo: srcinfo.clone(),
            }
        }
        Statement::WriteConfig { cfg, field, rhs, srcinfo } => Statement::WriteConfig {
            cfg: r(cfg),
            field: field.clone(),
            rhs: rename_sym_valexpr(rhs, sym, with),
            srcinfo: srcinfo.clone(),
        },
        Statement::Sync { codegen, srcinfo } => Statement::Sync { codegen: codegen.clone(), srcinfo: srcinfo.clone() },
        Statement::With { tag, body, srcinfo } => {
            Statement::With { tag: tag.clone(), body: Node::new(rename_sym_block(body, sym, with)), srcinfo: srcinfo.clone() }
        }
    }
}

/// Replace every scalar-valued read of `sym` with the arbitrary expression
/// `with`, used by `inline` to bind formal scalar/index arguments whose
/// actual value at the call site is not itself a bare symbol (e.g. a
/// literal or a computed expression). Buffer-typed arguments must instead
/// go through `rename_sym_block`, since a buffer occupies an addressable
/// binding, not a substitutable value.
pub fn valexpr_subst_sym(e: &ValExpr, sym: &Symbol, with: &ValExpr) -> ValExpr {
    match e {
        ValExpr::Read(s, idx) if idx.is_empty() && s == sym => with.clone(),
        ValExpr::Read(s, idx) => ValExpr::Read(s.clone(), idx.clone()),
        ValExpr::Const(c) => ValExpr::Const(*c),
        ValExpr::BinOp(op, a, b) => {
            ValExpr::BinOp(*op, Rc::new(valexpr_subst_sym(a, sym, with)), Rc::new(valexpr_subst_sym(b, sym, with)))
        }
        ValExpr::USub(a) => ValExpr::USub(Rc::new(valexpr_subst_sym(a, sym, with))),
        ValExpr::StrideExpr(s, dim) => ValExpr::StrideExpr(s.clone(), *dim),
        ValExpr::ReadConfig(cfg, field) => ValExpr::ReadConfig(cfg.clone(), field.clone()),
        ValExpr::Extern(f, args) => {
            ValExpr::Extern(f.clone(), args.iter().map(|a| valexpr_subst_sym(a, sym, with)).collect())
        }
        ValExpr::WindowExpr(s, slices) => ValExpr::WindowExpr(s.clone(), slices.clone()),
        ValExpr::Select(p, e) => ValExpr::Select(p.clone(), Rc::new(valexpr_subst_sym(e, sym, with))),
    }
}

/// Thread `stmt_subst_sym` over a whole block.
pub fn stmt_subst_sym(s: &Statement, sym: &Symbol, with: &ValExpr) -> Statement {
    match s {
        Statement::Assign { sym: target, idx, rhs, srcinfo } => Statement::Assign {
            sym: target.clone(),
            idx: idx.clone(),
            rhs: valexpr_subst_sym(rhs, sym, with),
            srcinfo: srcinfo.clone(),
        },
        Statement::Reduce { sym: target, idx, rhs, srcinfo } => Statement::Reduce {
            sym: target.clone(),
            idx: idx.clone(),
            rhs: valexpr_subst_sym(rhs, sym, with),
            srcinfo: srcinfo.clone(),
        },
        Statement::If { cond, body, orelse, srcinfo } => Statement::If {
            cond: cond.clone(),
            body: Node::new(body.iter().map(|s| stmt_subst_sym(s, sym, with)).collect()),
            orelse: Node::new(orelse.iter().map(|s| stmt_subst_sym(s, sym, with)).collect()),
            srcinfo: srcinfo.clone(),
        },
        Statement::For { iter, lo, hi, mode, body, srcinfo } => Statement::For {
            iter: iter.clone(),
            lo: lo.clone(),
            hi: hi.clone(),
            mode: *mode,
            body: Node::new(body.iter().map(|s| stmt_subst_sym(s, sym, with)).collect()),
            srcinfo: srcinfo.clone(),
        },
        Statement::Call { callee, args, srcinfo } => Statement::Call {
            callee: callee.clone(),
            args: args.iter().map(|a| valexpr_subst_sym(a, sym, with)).collect(),
            srcinfo: srcinfo.clone(),
        },
        Statement::WriteConfig { cfg, field, rhs, srcinfo } => Statement::WriteConfig {
            cfg: cfg.clone(),
            field: field.clone(),
            rhs: valexpr_subst_sym(rhs, sym, with),
            srcinfo: srcinfo.clone(),
        },
        Statement::With { tag, body, srcinfo } => Statement::With {
            tag: tag.clone(),
            body: Node::new(body.iter().map(|s| stmt_subst_sym(s, sym, with)).collect()),
            srcinfo: srcinfo.clone(),
        },
        other => other.clone(),
    }
}

pub fn stmt_subst_sym_block(stmts: &[Statement], sym: &Symbol, with: &ValExpr) -> Vec<Statement> {
    stmts.iter().map(|s| stmt_subst_sym(s, sym, with)).collect()
}
