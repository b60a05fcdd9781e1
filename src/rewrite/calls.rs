// `replace`, `call_eqv`, `inline` (spec §4.4 "Calls"). `replace` and
// `call_eqv` swap which procedure a `Call` statement targets; `inline` goes
// the other way, splicing a callee's body in at the call site. All three
// reuse `subst.rs`'s symbol-renaming helpers -- `replace`'s "matches the
// body of `proc` modulo renaming" precondition and `inline`'s
// "alpha-renaming locals" are the same alpha-equivalence problem from
// opposite ends.

use super::{err, splice, target_path, RewriteResult};
use crate::cursor::{Cursor, ForwardResult, Forwarding, Path};
use crate::expr::{AExpr, BinOp, Const, Pred, Slice, ValExpr};
use crate::stmt::{Node, Proc, SrcInfo, Statement};
use crate::symbol::Symbol;
use crate::types::Type;
use std::rc::Rc;

/// A symbol-blind structural shape, used to decide whether two statement
/// blocks are equal "modulo renaming": every bound symbol is replaced by
/// the index of its first occurrence in a left-to-right traversal, so two
/// alpha-equivalent trees produce identical `Shape`s regardless of the
/// actual `Symbol`s involved.
#[derive(Clone, PartialEq, Debug)]
enum Shape {
    Leaf(String),
    Sym(usize),
    Node(&'static str, Vec<Shape>),
}

struct Shaper {
    seen: Vec<Symbol>,
}

impl Shaper {
    fn new() -> Shaper {
        Shaper { seen: Vec::new() }
    }

    fn sym(&mut self, s: &Symbol) -> Shape {
        let idx = match self.seen.iter().position(|x| x == s) {
            Some(i) => i,
            None => {
                self.seen.push(s.clone());
                self.seen.len() - 1
            }
        };
        Shape::Sym(idx)
    }

    fn aexpr(&mut self, e: &AExpr) -> Shape {
        match e {
            AExpr::AVar(s) | AExpr::ASize(s) => self.sym(s),
            AExpr::AConst(c) => Shape::Leaf(format!("c{}", c)),
            AExpr::AAdd(a, b) => Shape::Node("add", vec![self.aexpr(a), self.aexpr(b)]),
            AExpr::ASub(a, b) => Shape::Node("sub", vec![self.aexpr(a), self.aexpr(b)]),
            AExpr::AScale(k, a) => Shape::Node("scale", vec![Shape::Leaf(format!("k{}", k)), self.aexpr(a)]),
            AExpr::AScaleDiv(a, k) => Shape::Node("scalediv", vec![self.aexpr(a), Shape::Leaf(format!("k{}", k))]),
        }
    }

    fn pred(&mut self, p: &Pred) -> Shape {
        match p {
            Pred::BConst(b) => Shape::Leaf(format!("b{}", b)),
            Pred::And(a, b) => Shape::Node("and", vec![self.pred(a), self.pred(b)]),
            Pred::Or(a, b) => Shape::Node("or", vec![self.pred(a), self.pred(b)]),
            Pred::Cmp(op, a, b) => Shape::Node("cmp", vec![Shape::Leaf(format!("{:?}", op)), self.aexpr(a), self.aexpr(b)]),
        }
    }

    fn slice(&mut self, s: &Slice) -> Shape {
        match s {
            Slice::Point(e) => Shape::Node("point", vec![self.aexpr(e)]),
            Slice::Range(lo, hi) => Shape::Node("range", vec![self.aexpr(lo), self.aexpr(hi)]),
        }
    }

    fn valexpr(&mut self, e: &ValExpr) -> Shape {
        match e {
            ValExpr::Read(s, idx) => {
                let mut v = vec![self.sym(s)];
                v.extend(idx.iter().map(|i| self.aexpr(i)));
                Shape::Node("read", v)
            }
            ValExpr::Const(Const::Bool(b)) => Shape::Leaf(format!("b{}", b)),
            ValExpr::Const(Const::Int(i)) => Shape::Leaf(format!("i{}", i)),
            ValExpr::Const(Const::Float(f)) => Shape::Leaf(format!("f{}", f)),
            ValExpr::BinOp(op, a, b) => Shape::Node("binop", vec![Shape::Leaf(format!("{:?}", op)), self.valexpr(a), self.valexpr(b)]),
            ValExpr::USub(a) => Shape::Node("usub", vec![self.valexpr(a)]),
            ValExpr::StrideExpr(s, dim) => Shape::Node("stride", vec![self.sym(s), Shape::Leaf(format!("d{}", dim))]),
            ValExpr::ReadConfig(cfg, field) => Shape::Node("cfg", vec![self.sym(cfg), Shape::Leaf(field.clone())]),
            ValExpr::Extern(f, args) => {
                let mut v = vec![self.sym(f)];
                v.extend(args.iter().map(|a| self.valexpr(a)));
                Shape::Node("extern", v)
            }
            ValExpr::WindowExpr(s, slices) => {
                let mut v = vec![self.sym(s)];
                v.extend(slices.iter().map(|sl| self.slice(sl)));
                Shape::Node("window", v)
            }
            ValExpr::Select(p, e) => Shape::Node("select", vec![self.pred(p), self.valexpr(e)]),
        }
    }

    fn stmt(&mut self, s: &Statement) -> Shape {
        match s {
            Statement::Pass { .. } => Shape::Leaf("pass".to_string()),
            Statement::Assign { sym, idx, rhs, .. } => {
                let mut v = vec![self.sym(sym)];
                v.extend(idx.iter().map(|i| self.aexpr(i)));
                v.push(self.valexpr(rhs));
                Shape::Node("assign", v)
            }
            Statement::Reduce { sym, idx, rhs, .. } => {
                let mut v = vec![self.sym(sym)];
                v.extend(idx.iter().map(|i| self.aexpr(i)));
                v.push(self.valexpr(rhs));
                Shape::Node("reduce", v)
            }
            Statement::Alloc { sym, ty, .. } => Shape::Node("alloc", vec![self.sym(sym), Shape::Leaf(ty.name())]),
            Statement::Free { sym, .. } => Shape::Node("free", vec![self.sym(sym)]),
            Statement::If { cond, body, orelse, .. } => {
                let c = self.pred(cond);
                let b = self.block(body);
                let o = self.block(orelse);
                Shape::Node("if", vec![c, b, o])
            }
            Statement::For { iter, lo, hi, mode, body, .. } => {
                let i = self.sym(iter);
                let l = self.aexpr(lo);
                let h = self.aexpr(hi);
                let b = self.block(body);
                Shape::Node("for", vec![Shape::Leaf(format!("{:?}", mode)), i, l, h, b])
            }
            Statement::Call { callee, args, .. } => {
                let mut v = vec![Shape::Leaf(callee.name.clone())];
                v.extend(args.iter().map(|a| self.valexpr(a)));
                Shape::Node("call", v)
            }
            Statement::WindowStmt { name, expr, .. } => {
                let (src, slices) = expr;
                let mut v = vec![self.sym(name), self.sym(src)];
                v.extend(slices.iter().map(|s| self.slice(s)));
                Shape::Node("windowstmt", v)
            }
            Statement::WriteConfig { cfg, field, rhs, .. } => {
                Shape::Node("writecfg", vec![self.sym(cfg), Shape::Leaf(field.clone()), self.valexpr(rhs)])
            }
            Statement::Sync { codegen, .. } => Shape::Node("sync", vec![Shape::Leaf(codegen.clone())]),
            Statement::With { tag, body, .. } => {
                let b = self.block(body);
                Shape::Node("with", vec![Shape::Leaf(format!("{:?}", tag)), b])
            }
        }
    }

    fn block(&mut self, stmts: &[Statement]) -> Shape {
        Shape::Node("block", stmts.iter().map(|s| self.stmt(s)).collect())
    }
}

fn shape_of(stmts: &[Statement]) -> Shape {
    Shaper::new().block(stmts)
}

/// Replace the statement(s) at `target` with a `Call` to `callee`.
/// Precondition: the targeted statement(s), after alpha-renaming, are
/// structurally identical to `callee`'s body (spec: "stmt matches the body
/// of `proc` modulo renaming").
pub fn replace(proc: &Rc<Proc>, target: &Cursor, callee: Rc<Proc>, call_args: Vec<ValExpr>) -> RewriteResult {
    let path = target_path(target)?;
    let stmt = target.node().map_err(|e| err("replace", e.to_string()))?;
    let targeted = std::slice::from_ref(&stmt);
    if shape_of(targeted) != shape_of(&callee.body) {
        return Err(err("replace", format!("targeted statement does not match the body of `{}` modulo renaming", callee.name)));
    }
    if call_args.len() != callee.args.len() {
        return Err(err("replace", format!("arity mismatch calling `{}`", callee.name)));
    }
    let call = Statement::Call { callee, args: call_args, srcinfo: SrcInfo::UNKNOWN };
    let new_proc = splice(proc, &path, vec![call]);
    let fwd = Forwarding::with_remap(vec![(path.clone(), ForwardResult::Same(path))]);
    Ok((new_proc, fwd))
}

/// `call_eqv(call, proc')`: swap a `Call`'s target to `replacement`, a
/// procedure the host has separately asserted is equivalent to the current
/// callee (spec §6 `unsafe_assert_eq`; `is_equivalent` is the host's
/// verdict, since the rewrite engine does not itself prove procedure
/// equivalence -- spec §1 "does not attempt to prove arbitrary program
/// equivalences").
pub fn call_eqv(
    proc: &Rc<Proc>,
    target: &Cursor,
    replacement: Rc<Proc>,
    is_equivalent: impl Fn(&str, &str) -> bool,
) -> RewriteResult {
    let path = target_path(target)?;
    let stmt = target.node().map_err(|e| err("call_eqv", e.to_string()))?;
    let Statement::Call { callee, args, srcinfo } = stmt else {
        return Err(err("call_eqv", "target is not a Call statement"));
    };
    if !is_equivalent(&callee.name, &replacement.name) {
        return Err(err("call_eqv", format!("`{}` is not asserted equivalent to `{}`", replacement.name, callee.name)));
    }
    if replacement.args.len() != args.len() {
        return Err(err("call_eqv", "replacement procedure has a different arity"));
    }
    let new_call = Statement::Call { callee: replacement, args, srcinfo };
    let new_proc = splice(proc, &path, vec![new_call]);
    let fwd = Forwarding::with_remap(vec![(path.clone(), ForwardResult::Same(path))]);
    Ok((new_proc, fwd))
}

/// `inline(call)`: substitute the callee's body in place of the `Call`,
/// binding each formal argument to the actual the caller passed and
/// alpha-renaming every symbol the callee declares itself (allocations,
/// loop iterators, window names) so they cannot capture anything already
/// live at the call site. Precondition: the callee is not (directly)
/// recursive.
pub fn inline(proc: &Rc<Proc>, target: &Cursor) -> RewriteResult {
    let path = target_path(target)?;
    let stmt = target.node().map_err(|e| err("inline", e.to_string()))?;
    let Statement::Call { callee, args, .. } = stmt else {
        return Err(err("inline", "target is not a Call statement"));
    };
    if calls_self(&callee.body, &callee.name) {
        return Err(err("inline", format!("`{}` is (directly) recursive and cannot be inlined", callee.name)));
    }
    if args.len() != callee.args.len() {
        return Err(err("inline", "arity mismatch at inlined call site"));
    }

    let mut body: Vec<Statement> = (*callee.body).clone();

    // Bind each formal to its actual. Buffers/windows are always addressed
    // by symbol (never by value), and any formal the body writes through
    // -- `Out`/`InOut` scalars included -- names a location the caller
    // owns, so both require a bare symbol reference and a rename rather
    // than a value substitution. Only read-only scalar/index formals
    // accept an arbitrary expression.
    for (formal, actual) in callee.args.iter().zip(args.iter()) {
        if formal.ty.is_buffer() || formal.effect.permits_write() {
            match actual {
                ValExpr::Read(actual_sym, idx) if idx.is_empty() => {
                    body = super::subst::rename_sym_block(&body, &formal.sym, actual_sym);
                }
                _ => {
                    return Err(err(
                        "inline",
                        format!("argument `{}` is written by the callee and must be passed by bare name to be inlined", formal.sym.base()),
                    ))
                }
            }
        } else {
            body = super::subst::stmt_subst_sym_block(&body, &formal.sym, actual);
        }
    }

    // Alpha-rename every symbol the callee binds itself so a second
    // inlining of the same procedure (or a name already live at the call
    // site) cannot collide with it.
    for local in locally_bound_symbols(&body) {
        let fresh = local.refresh();
        body = super::subst::rename_sym_block(&body, &local, &fresh);
    }

    let new_proc = splice(proc, &path, body);
    let block_path = path.parent().unwrap_or_else(Path::root);
    let idx = crate::cursor::step_index(path.0.last().unwrap());
    let fwd = Forwarding::with_remap(vec![(path, ForwardResult::ToGap(block_path, idx))]);
    Ok((new_proc, fwd))
}

fn calls_self(stmts: &[Statement], name: &str) -> bool {
    stmts.iter().any(|s| match s {
        Statement::Call { callee, .. } => callee.name == name,
        Statement::If { body, orelse, .. } => calls_self(body, name) || calls_self(orelse, name),
        Statement::For { body, .. } | Statement::With { body, .. } => calls_self(body, name),
        _ => false,
    })
}

fn locally_bound_symbols(stmts: &[Statement]) -> Vec<Symbol> {
    let mut out = Vec::new();
    fn walk(stmts: &[Statement], out: &mut Vec<Symbol>) {
        for s in stmts {
            match s {
                Statement::Alloc { sym, .. } => out.push(sym.clone()),
                Statement::For { iter, body, .. } => {
                    out.push(iter.clone());
                    walk(body, out);
                }
                Statement::WindowStmt { name, .. } => out.push(name.clone()),
                Statement::If { body, orelse, .. } => {
                    walk(body, out);
                    walk(orelse, out);
                }
                Statement::With { body, .. } => walk(body, out),
                _ => {}
            }
        }
    }
    walk(stmts, &mut out);
    out
}
