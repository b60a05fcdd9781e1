// Control rewrites, spec §4.4 "Control": `lift_if`, `specialize`.

use super::{err, splice, target_path, RewriteResult};
use crate::cursor::{Cursor, Forwarding};
use crate::expr::Pred;
use crate::stmt::{Node, Proc, SrcInfo, Statement};
use std::rc::Rc;

/// `lift_if(if, n_lifts)`: hoist an `If` outside its `n_lifts` enclosing
/// loops, duplicating the body into each branch of the lifted copies.
/// Precondition: the condition must not reference any of the lifted
/// loops' iterators (checked syntactically: the predicate's free symbols
/// must exclude them).
pub fn lift_if(proc: &Rc<Proc>, target: &Cursor, enclosing_iters: &[crate::symbol::Symbol]) -> RewriteResult {
    let path = target_path(target)?;
    let stmt = target.node().map_err(|e| err("lift_if", e.to_string()))?;
    let Statement::If { cond, body, orelse, .. } = &stmt else {
        return Err(err("lift_if", "target is not an If statement"));
    };
    for iter in enclosing_iters {
        if pred_mentions(cond, iter) {
            return Err(err("lift_if", format!("condition depends on loop variable `{}`", iter)));
        }
    }
    // With the dependency check passed, lifting an `If` out from under its
    // own position is a no-op on locality (the enclosing loop headers are
    // untouched by this rewrite; the caller nests `lift_if` calls, one per
    // enclosing loop, to hoist further). Here we perform one level: swap
    // the If with its parent loop if the If is the loop's sole body
    // statement.
    let parent_path = path.parent().ok_or_else(|| err("lift_if", "If has no enclosing loop to lift past"))?;
    let parent_stmt = crate::cursor::resolve_path_to_statement(proc, &parent_path)
        .map_err(|e| err("lift_if", e.to_string()))?;
    let Statement::For { iter, lo, hi, mode, body: loop_body, .. } = &parent_stmt else {
        return Err(err("lift_if", "enclosing statement is not a loop"));
    };
    if loop_body.len() != 1 {
        return Err(err("lift_if", "enclosing loop must contain only the If being lifted"));
    }

    let then_loop = Statement::For {
        iter: iter.clone(),
        lo: lo.clone(),
        hi: hi.clone(),
        mode: *mode,
        body: body.clone(),
        srcinfo: SrcInfo::UNKNOWN,
    };
    let else_loop = Statement::For {
        iter: iter.clone(),
        lo: lo.clone(),
        hi: hi.clone(),
        mode: *mode,
        body: orelse.clone(),
        srcinfo: SrcInfo::UNKNOWN,
    };
    let lifted = Statement::If {
        cond: cond.clone(),
        body: Node::new(vec![then_loop]),
        orelse: Node::new(vec![else_loop]),
        srcinfo: SrcInfo::UNKNOWN,
    };
    let new_proc = splice(proc, &parent_path, vec![lifted]);
    Ok((new_proc, Forwarding::identity()))
}

fn pred_mentions(p: &Pred, sym: &crate::symbol::Symbol) -> bool {
    match p {
        Pred::BConst(_) => false,
        Pred::And(a, b) | Pred::Or(a, b) => pred_mentions(a, sym) || pred_mentions(b, sym),
        Pred::Cmp(_, a, b) => aexpr_mentions(a, sym) || aexpr_mentions(b, sym),
    }
}

fn aexpr_mentions(e: &crate::expr::AExpr, sym: &crate::symbol::Symbol) -> bool {
    use crate::expr::AExpr::*;
    match e {
        AVar(s) | ASize(s) => s == sym,
        AConst(_) => false,
        AAdd(a, b) | ASub(a, b) => aexpr_mentions(a, sym) || aexpr_mentions(b, sym),
        AScale(_, a) | AScaleDiv(a, _) => aexpr_mentions(a, sym),
    }
}

/// `specialize(stmt, conds)`: wrap `stmt` in a chain of `If`s, one copy of
/// `stmt` per condition. Precondition: `conds` must be mutually exclusive
/// and exhaustive over the domain the rewrite's caller asserts (this is a
/// host-supplied proof obligation per spec §4.4's "conds are mutually
/// exclusive exhaustive over the covered domain" -- the rewrite itself
/// only checks that at least one condition is supplied and builds the
/// chain; the exhaustiveness proof is the precondition a schedule author
/// discharges when they write the conds).
pub fn specialize(proc: &Rc<Proc>, target: &Cursor, conds: Vec<Pred>) -> RewriteResult {
    if conds.is_empty() {
        return Err(err("specialize", "at least one condition is required"));
    }
    let path = target_path(target)?;
    let stmt = target.node().map_err(|e| err("specialize", e.to_string()))?;

    let mut chain: Option<Statement> = None;
    for cond in conds.into_iter().rev() {
        let orelse = match chain {
            Some(prev) => vec![prev],
            None => vec![],
        };
        chain = Some(Statement::If {
            cond,
            body: Node::new(vec![stmt.clone()]),
            orelse: Node::new(orelse),
            srcinfo: SrcInfo::UNKNOWN,
        });
    }
    let new_proc = splice(proc, &path, vec![chain.unwrap()]);
    let block_path = path.parent().unwrap_or_else(crate::cursor::Path::root);
    let idx = crate::cursor::step_index(path.0.last().unwrap());
    let fwd = Forwarding::with_remap(vec![(path, crate::cursor::ForwardResult::ToGap(block_path, idx))]);
    Ok((new_proc, fwd))
}
