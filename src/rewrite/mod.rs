// The rewrite catalog, spec §4.4. Every operation has the signature
// `(proc, target: Cursor, args) -> (proc', fwd)`, checks a local
// precondition before touching the tree, and returns a `SchedulingError`
// (leaving the input `Proc` untouched) on failure -- spec §7 "a failed
// rewrite returns the original procedure unchanged."
//
// Grounded on `vm.rs`'s macro-factored, one-function-per-opcode style
// (each rewrite below follows the same precondition-check /
// rebuild-subtree / emit-forwarding shape `vm.rs` uses for each
// instruction handler) and `typechecker.rs`'s `TypeCheck` result-alias
// convention, reused here as `RewriteResult`.

pub mod calls;
pub mod control;
pub mod layout;
pub mod loops;
pub mod simplify;
pub mod staging;
pub mod structural;
pub mod subst;

use crate::cursor::{step_index, Cursor, Forwarding, Path, Position, Step};
use crate::error::SchedulingError;
use crate::stmt::{Node, Proc, Statement};
use std::rc::Rc;

pub type RewriteResult = Result<(Rc<Proc>, Forwarding), SchedulingError>;

/// The path a node cursor names, or a `SchedulingError` if it names a gap
/// or selection instead (most rewrites target a single statement).
pub(crate) fn target_path(cursor: &Cursor) -> Result<Path, SchedulingError> {
    match cursor.position() {
        Position::Node(p) => Ok(p.clone()),
        _ => Err(err("cursor", "expected a node cursor, got a gap or selection")),
    }
}

/// Replace the single statement at `path` with `replacement` (possibly
/// more or fewer than one statement), leaving every other statement in
/// the procedure untouched.
pub(crate) fn splice(proc: &Proc, path: &Path, replacement: Vec<Statement>) -> Rc<Proc> {
    let block_path = path.parent().unwrap_or_else(Path::root);
    let idx = step_index(path.0.last().expect("splice requires a non-root path"));
    edit_block(proc, &block_path, |block| {
        let mut out = Vec::with_capacity(block.len() - 1 + replacement.len());
        out.extend_from_slice(&block[..idx]);
        out.extend(replacement);
        out.extend_from_slice(&block[idx + 1..]);
        out
    })
}

/// Rebuild `body`, threading `path` down to the addressed block and
/// applying `f` to that block's statement slice. Persistent: statements
/// outside the spine from root to `path` are `Clone`d (cheap -- their own
/// `body`/`orelse` fields are `Rc` and only bump a refcount), so unrelated
/// subtrees are shared with the pre-edit version by pointer.
pub(crate) fn edit_at(
    body: &Node<Vec<Statement>>,
    path: &[Step],
    f: &mut dyn FnMut(&[Statement]) -> Vec<Statement>,
) -> Node<Vec<Statement>> {
    match path.split_first() {
        None => Node::new(f(body)),
        Some((step, rest)) => {
            let idx = step_index(step);
            let mut new_body: Vec<Statement> = (**body).clone();
            let target = new_body[idx].clone();
            new_body[idx] = descend(target, step, rest, f);
            Node::new(new_body)
        }
    }
}

fn descend(
    stmt: Statement,
    step: &Step,
    rest: &[Step],
    f: &mut dyn FnMut(&[Statement]) -> Vec<Statement>,
) -> Statement {
    match (stmt, step) {
        (Statement::If { cond, body, orelse, srcinfo }, Step::Body(_)) => {
            Statement::If { cond, body: edit_at(&body, rest, f), orelse, srcinfo }
        }
        (Statement::If { cond, body, orelse, srcinfo }, Step::Orelse(_)) => {
            Statement::If { cond, body, orelse: edit_at(&orelse, rest, f), srcinfo }
        }
        (Statement::For { iter, lo, hi, mode, body, srcinfo }, Step::Body(_)) => {
            Statement::For { iter, lo, hi, mode, body: edit_at(&body, rest, f), srcinfo }
        }
        (Statement::With { tag, body, srcinfo }, Step::Body(_)) => {
            Statement::With { tag, body: edit_at(&body, rest, f), srcinfo }
        }
        (other, _) => other,
    }
}

/// Replace the whole procedure's body, reusing `proc`'s other fields.
pub(crate) fn with_body(proc: &Proc, body: Node<Vec<Statement>>) -> Rc<Proc> {
    Rc::new(Proc {
        name: proc.name.clone(),
        args: proc.args.clone(),
        preconditions: proc.preconditions.clone(),
        body,
        instr: proc.instr.clone(),
        srcinfo: proc.srcinfo.clone(),
    })
}

/// Edit the block at `block_path` (as produced by `Position::Gap`'s
/// `block` field, or a node cursor's `before()`/`after()`), replacing it
/// via `f`, and reusing the rest of the procedure unchanged.
pub(crate) fn edit_block(proc: &Proc, block_path: &Path, f: impl FnOnce(&[Statement]) -> Vec<Statement>) -> Rc<Proc> {
    let mut f = Some(f);
    let new_body = edit_at(&proc.body, &block_path.0, &mut |b| (f.take().unwrap())(b));
    with_body(proc, new_body)
}

pub(crate) fn err(span: impl Into<String>, reason: impl Into<String>) -> SchedulingError {
    SchedulingError::new(span, reason)
}
