// `eliminate_dead_code` and `simplify` (spec §4.4 "Simplify"). Both are
// whole-tree passes rather than single-cursor edits: they fold `affine`'s
// sum-of-scaled-terms normalization (and its boolean-predicate analogue)
// through every index/condition position in the procedure, and drop
// statements that carry no effect. Grounded on `set_memory`'s recursive
// tree-rewrite shape in `structural.rs`, generalized from "rewrite one
// matching Alloc" to "rewrite every statement."

use super::RewriteResult;
use crate::affine;
use crate::cursor::Forwarding;
use crate::expr::{AExpr, Pred};
use crate::stmt::{Node, Proc, Statement};

/// Drop every statement with no externally observable effect
/// (`Statement::has_effect()`), recursing into `If`/`For`/`With` bodies.
/// An `If` whose condition is `Pred::BConst` is collapsed to whichever
/// branch is taken, since the other branch is then unreachable.
pub fn eliminate_dead_code(proc: &Proc) -> RewriteResult {
    let new_body = dce_block(&proc.body);
    let new_proc = super::with_body(proc, Node::new(new_body));
    Ok((new_proc, Forwarding::identity()))
}

fn dce_block(stmts: &[Statement]) -> Vec<Statement> {
    stmts.iter().flat_map(dce_stmt).collect()
}

/// Dead-code-eliminate a single statement, producing zero, one, or (for a
/// branch whose condition folded to a constant) many replacement
/// statements -- an `If { cond: BConst(true), body, .. }` is replaced by
/// `body` itself, since `orelse` can no longer run.
fn dce_stmt(s: &Statement) -> Vec<Statement> {
    match s {
        Statement::Pass { .. } => vec![],
        Statement::If { cond, body, orelse, srcinfo } => match cond {
            Pred::BConst(true) => dce_block(body),
            Pred::BConst(false) => dce_block(orelse),
            _ => {
                let b = dce_block(body);
                let o = dce_block(orelse);
                if b.is_empty() && o.is_empty() {
                    vec![]
                } else {
                    vec![Statement::If { cond: cond.clone(), body: Node::new(b), orelse: Node::new(o), srcinfo: srcinfo.clone() }]
                }
            }
        },
        Statement::For { iter, lo, hi, mode, body, srcinfo } => {
            let b = dce_block(body);
            if b.is_empty() {
                vec![]
            } else {
                vec![Statement::For { iter: iter.clone(), lo: lo.clone(), hi: hi.clone(), mode: *mode, body: Node::new(b), srcinfo: srcinfo.clone() }]
            }
        }
        Statement::With { tag, body, srcinfo } => {
            let b = dce_block(body);
            if b.is_empty() {
                vec![]
            } else {
                vec![Statement::With { tag: tag.clone(), body: Node::new(b), srcinfo: srcinfo.clone() }]
            }
        }
        other => vec![other.clone()],
    }
}

/// Fold every affine index/bound expression and boolean condition in the
/// procedure to its canonical simplified form (spec §4.2). Idempotent,
/// since `affine::simplify` and `simplify_pred` both are.
pub fn simplify(proc: &Proc) -> RewriteResult {
    let new_body = simplify_block(&proc.body);
    let new_proc = super::with_body(proc, Node::new(new_body));
    Ok((new_proc, Forwarding::identity()))
}

fn simplify_block(stmts: &[Statement]) -> Vec<Statement> {
    stmts.iter().map(simplify_stmt).collect()
}

fn simplify_stmt(s: &Statement) -> Statement {
    match s {
        Statement::Pass { srcinfo } => Statement::Pass { srcinfo: srcinfo.clone() },
        Statement::Assign { sym, idx, rhs, srcinfo } => Statement::Assign {
            sym: sym.clone(),
            idx: idx.iter().map(affine::simplify).collect(),
            rhs: simplify_valexpr(rhs),
            srcinfo: srcinfo.clone(),
        },
        Statement::Reduce { sym, idx, rhs, srcinfo } => Statement::Reduce {
            sym: sym.clone(),
            idx: idx.iter().map(affine::simplify).collect(),
            rhs: simplify_valexpr(rhs),
            srcinfo: srcinfo.clone(),
        },
        Statement::Alloc { sym, ty, mem, srcinfo } => {
            Statement::Alloc { sym: sym.clone(), ty: simplify_type(ty), mem: mem.clone(), srcinfo: srcinfo.clone() }
        }
        Statement::Free { sym, ty, mem, srcinfo } => {
            Statement::Free { sym: sym.clone(), ty: simplify_type(ty), mem: mem.clone(), srcinfo: srcinfo.clone() }
        }
        Statement::If { cond, body, orelse, srcinfo } => Statement::If {
            cond: simplify_pred(cond),
            body: Node::new(simplify_block(body)),
            orelse: Node::new(simplify_block(orelse)),
            srcinfo: srcinfo.clone(),
        },
        Statement::For { iter, lo, hi, mode, body, srcinfo } => Statement::For {
            iter: iter.clone(),
            lo: affine::simplify(lo),
            hi: affine::simplify(hi),
            mode: *mode,
            body: Node::new(simplify_block(body)),
            srcinfo: srcinfo.clone(),
        },
        Statement::Call { callee, args, srcinfo } => Statement::Call {
            callee: callee.clone(),
            args: args.iter().map(simplify_valexpr).collect(),
            srcinfo: srcinfo.clone(),
        },
        Statement::WindowStmt { name, expr, srcinfo } => {
            let (src, slices) = expr;
            Statement::WindowStmt {
                name: name.clone(),
                expr: (src.clone(), slices.iter().map(simplify_slice).collect()),
                srcinfo: srcinfo.clone(),
            }
        }
        Statement::WriteConfig { cfg, field, rhs, srcinfo } => Statement::WriteConfig {
            cfg: cfg.clone(),
            field: field.clone(),
            rhs: simplify_valexpr(rhs),
            srcinfo: srcinfo.clone(),
        },
        Statement::Sync { codegen, srcinfo } => Statement::Sync { codegen: codegen.clone(), srcinfo: srcinfo.clone() },
        Statement::With { tag, body, srcinfo } => {
            Statement::With { tag: tag.clone(), body: Node::new(simplify_block(body)), srcinfo: srcinfo.clone() }
        }
    }
}

fn simplify_type(ty: &crate::types::Type) -> crate::types::Type {
    match ty {
        crate::types::Type::Tensor(t) => crate::types::Type::Tensor(crate::types::Tensor {
            base: t.base,
            shape: t.shape.iter().map(affine::simplify).collect(),
            mem: t.mem.clone(),
        }),
        crate::types::Type::Window(w) => crate::types::Type::Window(crate::types::Window {
            base: w.base,
            shape: w.shape.iter().map(affine::simplify).collect(),
            source: w.source.clone(),
            is_const: w.is_const,
        }),
        other => other.clone(),
    }
}

fn simplify_slice(s: &crate::expr::Slice) -> crate::expr::Slice {
    match s {
        crate::expr::Slice::Point(e) => crate::expr::Slice::Point(affine::simplify(e)),
        crate::expr::Slice::Range(lo, hi) => crate::expr::Slice::Range(affine::simplify(lo), affine::simplify(hi)),
    }
}

fn simplify_valexpr(e: &crate::expr::ValExpr) -> crate::expr::ValExpr {
    use crate::expr::ValExpr;
    use std::rc::Rc;
    match e {
        ValExpr::Read(s, idx) => ValExpr::Read(s.clone(), idx.iter().map(affine::simplify).collect()),
        ValExpr::Const(c) => ValExpr::Const(*c),
        ValExpr::BinOp(op, a, b) => ValExpr::BinOp(*op, Rc::new(simplify_valexpr(a)), Rc::new(simplify_valexpr(b))),
        ValExpr::USub(a) => ValExpr::USub(Rc::new(simplify_valexpr(a))),
        ValExpr::StrideExpr(s, dim) => ValExpr::StrideExpr(s.clone(), *dim),
        ValExpr::ReadConfig(cfg, field) => ValExpr::ReadConfig(cfg.clone(), field.clone()),
        ValExpr::Extern(f, args) => ValExpr::Extern(f.clone(), args.iter().map(simplify_valexpr).collect()),
        ValExpr::WindowExpr(s, slices) => ValExpr::WindowExpr(s.clone(), slices.iter().map(simplify_slice).collect()),
        ValExpr::Select(p, e) => ValExpr::Select(Rc::new(simplify_pred(p)), Rc::new(simplify_valexpr(e))),
    }
}

/// Fold `true && p = p`, `false || p = p`, and a `Cmp` whose two sides
/// normalize to the same canonical form (e.g. `i < i + 0`) to a constant
/// when the comparison operator makes that decidable from equality alone.
fn simplify_pred(p: &Pred) -> Pred {
    match p {
        Pred::BConst(b) => Pred::BConst(*b),
        Pred::And(a, b) => {
            let (a, b) = (simplify_pred(a), simplify_pred(b));
            match (&a, &b) {
                (Pred::BConst(true), _) => b,
                (_, Pred::BConst(true)) => a,
                (Pred::BConst(false), _) | (_, Pred::BConst(false)) => Pred::BConst(false),
                _ => Pred::and(a, b),
            }
        }
        Pred::Or(a, b) => {
            let (a, b) = (simplify_pred(a), simplify_pred(b));
            match (&a, &b) {
                (Pred::BConst(false), _) => b,
                (_, Pred::BConst(false)) => a,
                (Pred::BConst(true), _) | (_, Pred::BConst(true)) => Pred::BConst(true),
                _ => Pred::or(a, b),
            }
        }
        Pred::Cmp(op, a, b) => {
            let (na, nb) = (affine::simplify(a), affine::simplify(b));
            if let (AExpr::AConst(x), AExpr::AConst(y)) = (&na, &nb) {
                let result = match op {
                    crate::expr::CmpOp::Lt => x < y,
                    crate::expr::CmpOp::Gt => x > y,
                    crate::expr::CmpOp::Le => x <= y,
                    crate::expr::CmpOp::Ge => x >= y,
                    crate::expr::CmpOp::Eq => x == y,
                };
                Pred::BConst(result)
            } else if matches!(op, crate::expr::CmpOp::Eq | crate::expr::CmpOp::Le | crate::expr::CmpOp::Ge)
                && affine::normalize(&na) == affine::normalize(&nb)
            {
                Pred::BConst(true)
            } else {
                Pred::Cmp(*op, std::rc::Rc::new(na), std::rc::Rc::new(nb))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{CmpOp, Const, ValExpr};
    use crate::stmt::SrcInfo;
    use crate::symbol::Symbol;

    fn leaf_pass() -> Statement {
        Statement::Pass { srcinfo: SrcInfo::UNKNOWN }
    }

    #[test]
    fn eliminate_dead_code_drops_pass_statements() {
        let sym = Symbol::fresh("x");
        let proc = Proc {
            name: "p".to_string(),
            args: vec![],
            preconditions: vec![],
            body: Node::new(vec![
                leaf_pass(),
                Statement::Assign { sym, idx: vec![], rhs: ValExpr::Const(Const::Int(1)), srcinfo: SrcInfo::UNKNOWN },
                leaf_pass(),
            ]),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        };
        let (new_proc, _) = eliminate_dead_code(&proc).unwrap();
        assert_eq!(new_proc.body.len(), 1);
    }

    #[test]
    fn eliminate_dead_code_drops_empty_loop() {
        let proc = Proc {
            name: "p".to_string(),
            args: vec![],
            preconditions: vec![],
            body: Node::new(vec![Statement::For {
                iter: Symbol::fresh("i"),
                lo: AExpr::AConst(0),
                hi: AExpr::AConst(8),
                mode: crate::stmt::LoopMode::Seq,
                body: Node::new(vec![leaf_pass()]),
                srcinfo: SrcInfo::UNKNOWN,
            }]),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        };
        let (new_proc, _) = eliminate_dead_code(&proc).unwrap();
        assert!(new_proc.body.is_empty());
    }

    #[test]
    fn simplify_folds_zero_offset_index() {
        let sym = Symbol::fresh("A");
        let i = Symbol::fresh("i");
        let idx = AExpr::add(AExpr::AVar(i), AExpr::AConst(0));
        let proc = Proc {
            name: "p".to_string(),
            args: vec![],
            preconditions: vec![],
            body: Node::new(vec![Statement::Assign {
                sym,
                idx: vec![idx],
                rhs: ValExpr::Const(Const::Int(0)),
                srcinfo: SrcInfo::UNKNOWN,
            }]),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        };
        let (new_proc, _) = simplify(&proc).unwrap();
        let Statement::Assign { idx, .. } = &new_proc.body[0] else { panic!() };
        assert!(matches!(idx[0], AExpr::AVar(_)));
    }

    #[test]
    fn simplify_folds_constant_comparison() {
        let cond = Pred::cmp(CmpOp::Lt, AExpr::AConst(1), AExpr::AConst(2));
        assert_eq!(simplify_pred(&cond), Pred::BConst(true));
    }

    #[test]
    fn simplify_folds_reflexive_equality() {
        let i = Symbol::fresh("i");
        let cond = Pred::cmp(CmpOp::Eq, AExpr::AVar(i.clone()), AExpr::AVar(i));
        assert_eq!(simplify_pred(&cond), Pred::BConst(true));
    }

    #[test]
    fn simplify_does_not_corrupt_divide_loop_bounds_for_symbolic_trip_count() {
        // Regression for the `divide_loop` + `simplify` combination: a
        // symbolic `N / 16` outer bound and `16 * (N / 16)` tail bound must
        // survive a whole-procedure `simplify` unchanged, not collapse to
        // `N` and `16 * N`.
        use crate::cursor::{Cursor, Path, Position, Step};
        use crate::rewrite::loops::{divide_loop, TailPolicy};

        let n_sym = Symbol::fresh("N");
        let j = Symbol::fresh("j");
        let x = Symbol::fresh("x");
        let body = vec![Statement::Assign {
            sym: x,
            idx: vec![AExpr::AVar(j.clone())],
            rhs: ValExpr::Const(Const::Int(0)),
            srcinfo: SrcInfo::UNKNOWN,
        }];
        let for_j = Statement::For {
            iter: j,
            lo: AExpr::AConst(0),
            hi: AExpr::ASize(n_sym.clone()),
            mode: crate::stmt::LoopMode::Seq,
            body: Node::new(body),
            srcinfo: SrcInfo::UNKNOWN,
        };
        let proc = std::rc::Rc::new(Proc {
            name: "p".to_string(),
            args: vec![],
            preconditions: vec![],
            body: Node::new(vec![for_j]),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        });
        let target = Cursor::at(&proc, Position::Node(Path::root().child(Step::Body(0))));
        let (divided, _) = divide_loop(&proc, &target, 16, ("jo".to_string(), "ji".to_string()), TailPolicy::CutAndGuard).unwrap();

        let expected_outer_hi = AExpr::scale_div(AExpr::ASize(n_sym.clone()), 16);
        let expected_tail_lo = AExpr::scale(16, AExpr::scale_div(AExpr::ASize(n_sym), 16));

        let (simplified, _) = simplify(&divided).unwrap();
        assert_eq!(simplified.body.len(), 2, "tiled loop plus guarded tail survive simplify");
        let Statement::For { hi: outer_hi, .. } = &simplified.body[0] else { panic!("expected the tiled outer loop") };
        let Statement::For { lo: tail_lo, .. } = &simplified.body[1] else { panic!("expected the guarded tail loop") };

        assert_eq!(affine::normalize(outer_hi), affine::normalize(&expected_outer_hi));
        assert_eq!(affine::normalize(tail_lo), affine::normalize(&expected_tail_lo));
    }
}
