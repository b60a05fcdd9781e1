// The Schedule API, spec §6: a fluent, side-effect-free facade a host
// program drives to turn one procedure into another. Every method takes
// `&self` and returns a new `Schedule` (or a bare rewrite result where the
// underlying operation can fail), never mutating the procedure it started
// from -- spec §6 "each returns a new procedure; side-effect-free."
//
// Grounded on `vm.rs`'s split between a `Program` (an immutable value)
// and a `VM` that executes it step by step: here the "program" is a
// persistent `Rc<Proc>` and each `Schedule` method is one step,
// generalized from "execute bytecode" to "apply a named rewrite and hand
// back the resulting procedure."

use crate::cursor::{self, Cursor};
use crate::error::{ParseFragmentError, SchedulingError};
use crate::expr::{AExpr, Pred, ValExpr};
use crate::rewrite::loops::TailPolicy;
use crate::rewrite::{calls, control, layout, loops, simplify, staging, structural, subst, RewriteResult};
use crate::stmt::Proc;
use crate::symbol::Symbol;
use crate::types::{MemKind, Scalar};
use std::rc::Rc;

/// A procedure value plus the fluent operations spec §6 lists. Cloning a
/// `Schedule` is cheap (an `Rc` bump); every mutator consumes `self` by
/// reference and returns a fresh value rather than editing in place.
#[derive(Clone)]
pub struct Schedule {
    proc: Rc<Proc>,
}

impl Schedule {
    pub fn new(proc: Rc<Proc>) -> Schedule {
        Schedule { proc }
    }

    /// The procedure this schedule currently wraps.
    pub fn proc(&self) -> &Rc<Proc> {
        &self.proc
    }

    /// `args`: the procedure's formal parameter list.
    pub fn args(&self) -> &[crate::stmt::Arg] {
        &self.proc.args
    }

    /// `body`: a cursor over the procedure's top-level statement block.
    pub fn body(&self) -> Cursor {
        Cursor::root(&self.proc)
    }

    /// `find(pattern)`: every cursor whose statement's printed form
    /// matches `pattern`.
    pub fn find(&self, pattern: &str) -> Result<Vec<Cursor>, ParseFragmentError> {
        cursor::find(&self.proc, pattern)
    }

    /// `find_loop(pattern)`, `many=False`: the unique matching loop.
    pub fn find_loop(&self, pattern: &str) -> Result<Cursor, SchedulingError> {
        cursor::find_loop(&self.proc, pattern)
    }

    /// `find_loop(pattern, many=True)`: every matching loop.
    pub fn find_loop_many(&self, pattern: &str) -> Result<Vec<Cursor>, SchedulingError> {
        cursor::find_loop_many(&self.proc, pattern)
    }

    /// `rename(name)`. `already_used` is the host's namespace check (the
    /// rewrite engine tracks no global registry of procedure names).
    pub fn rename(&self, name: impl Into<String>, already_used: impl Fn(&str) -> bool) -> Result<Schedule, SchedulingError> {
        let (p, _) = structural::rename(&self.proc, name, already_used)?;
        Ok(Schedule::new(p))
    }

    /// `set_window(arg, to_window)`: retype a tensor argument to a window
    /// or back.
    pub fn set_window(&self, arg_name: &str, to_window: bool) -> Result<Schedule, SchedulingError> {
        let (p, _) = structural::set_window(&self.proc, arg_name, to_window)?;
        Ok(Schedule::new(p))
    }

    /// `set_memory(alloc, mem)`: retag an allocation's memory kind.
    pub fn set_memory(&self, alloc_name: &str, mem: MemKind) -> Result<Schedule, SchedulingError> {
        let (p, _) = structural::set_memory(&self.proc, alloc_name, mem)?;
        Ok(Schedule::new(p))
    }

    /// `add_assertion(pred)`: strengthen the procedure's precondition set.
    /// Never fails; a schedule author who asserts something false is
    /// responsible for the unsoundness, same as the host-supplied
    /// equivalence proofs `call_eqv`/`unsafe_assert_eq` take on faith.
    pub fn add_assertion(&self, pred: Pred) -> Schedule {
        let mut preconditions = self.proc.preconditions.clone();
        preconditions.push(pred);
        Schedule::new(Rc::new(Proc { preconditions, ..(*self.proc).clone() }))
    }

    /// `partial_eval(sym=value, ...)`: bind one or more of the procedure's
    /// size/index arguments to compile-time constants, substituting the
    /// constant throughout the body and preconditions and dropping the
    /// bound arguments from the signature.
    pub fn partial_eval(&self, bindings: &[(Symbol, i64)]) -> Result<Schedule, SchedulingError> {
        let mut proc = (*self.proc).clone();
        for (sym, value) in bindings {
            if !proc.args.iter().any(|a| &a.sym == sym) {
                return Err(SchedulingError::new("partial_eval", format!("`{}` is not a formal argument", sym)));
            }
            let with = AExpr::AConst(*value);
            proc.args.retain(|a| &a.sym != sym);
            proc.body = crate::stmt::Node::new(subst::block(&proc.body, sym, &with));
            proc.preconditions = proc.preconditions.iter().map(|p| subst::pred(p, sym, &with)).collect();
        }
        Ok(Schedule::new(Rc::new(proc)))
    }

    /// `unsafe_assert_eq(other)`: the host vouches that `self` and `other`
    /// compute the same result; this rewrite engine does not -- and does
    /// not attempt to -- verify that (spec §1 "does not attempt to prove
    /// arbitrary program equivalences"). Returns `other` unchanged, purely
    /// to make the substitution explicit at the call site.
    pub fn unsafe_assert_eq(&self, other: &Schedule) -> Schedule {
        other.clone()
    }

    // -- Loop rewrites, spec §4.4 "Loop" --

    pub fn divide_loop(&self, target: &Cursor, k: i64, names: (String, String), tail: TailPolicy) -> Result<Schedule, SchedulingError> {
        Self::traced("divide_loop", target, loops::divide_loop(&self.proc, target, k, names, tail))
    }

    pub fn reorder_loops(&self, target: &Cursor) -> Result<Schedule, SchedulingError> {
        Self::traced("reorder_loops", target, loops::reorder_loops(&self.proc, target))
    }

    pub fn fission(&self, gap: &Cursor, n_lifts: usize) -> Result<Schedule, SchedulingError> {
        Self::traced("fission", gap, loops::fission(&self.proc, gap, n_lifts))
    }

    pub fn fuse(&self, first: &Cursor, second: &Cursor) -> Result<Schedule, SchedulingError> {
        Self::traced("fuse", first, loops::fuse(&self.proc, first, second))
    }

    pub fn unroll_loop(&self, target: &Cursor) -> Result<Schedule, SchedulingError> {
        Self::traced("unroll_loop", target, loops::unroll_loop(&self.proc, target))
    }

    // -- Control rewrites, spec §4.4 "Control" --

    pub fn lift_if(&self, target: &Cursor, enclosing_iters: &[Symbol]) -> Result<Schedule, SchedulingError> {
        Self::traced("lift_if", target, control::lift_if(&self.proc, target, enclosing_iters))
    }

    pub fn specialize(&self, target: &Cursor, conds: Vec<Pred>) -> Result<Schedule, SchedulingError> {
        Self::traced("specialize", target, control::specialize(&self.proc, target, conds))
    }

    // -- Layout rewrites, spec §4.4 "Layout" --

    pub fn divide_dim(&self, alloc_name: &str, dim: usize, k: i64) -> Result<Schedule, SchedulingError> {
        Self::traced("divide_dim", alloc_name, layout::divide_dim(&self.proc, alloc_name, dim, k))
    }

    pub fn bound_alloc(&self, alloc_name: &str, bounds: Vec<AExpr>) -> Result<Schedule, SchedulingError> {
        Self::traced("bound_alloc", alloc_name, layout::bound_alloc(&self.proc, alloc_name, bounds))
    }

    pub fn expand_dim(&self, alloc_name: &str, size: AExpr, idx: AExpr, in_scope: &[Symbol]) -> Result<Schedule, SchedulingError> {
        Self::traced("expand_dim", alloc_name, layout::expand_dim(&self.proc, alloc_name, size, idx, in_scope))
    }

    // -- Staging rewrites, spec §4.4 "Staging" --

    #[allow(clippy::too_many_arguments)]
    pub fn stage_mem(
        &self,
        target: &Cursor,
        name: &str,
        base: Scalar,
        src: &Symbol,
        iter: &Symbol,
        lo: AExpr,
        hi: AExpr,
        mem: MemKind,
        n_lifts: usize,
    ) -> Result<Schedule, SchedulingError> {
        Self::traced("stage_mem", target, staging::stage_mem(&self.proc, target, name, base, src, iter, lo, hi, mem, n_lifts))
    }

    pub fn stage_window(&self, target: &Cursor, name: &str) -> Result<Schedule, SchedulingError> {
        Self::traced("stage_window", target, staging::stage_window(&self.proc, target, name))
    }

    // -- Call rewrites, spec §4.4 "Call" --

    pub fn replace(&self, target: &Cursor, callee: Rc<Proc>, call_args: Vec<ValExpr>) -> Result<Schedule, SchedulingError> {
        Self::traced("replace", target, calls::replace(&self.proc, target, callee, call_args))
    }

    pub fn call_eqv(&self, target: &Cursor, replacement: Rc<Proc>, is_equivalent: impl Fn(&str, &str) -> bool) -> Result<Schedule, SchedulingError> {
        Self::traced("call_eqv", target, calls::call_eqv(&self.proc, target, replacement, is_equivalent))
    }

    pub fn inline(&self, target: &Cursor) -> Result<Schedule, SchedulingError> {
        Self::traced("inline", target, calls::inline(&self.proc, target))
    }

    // -- Cleanup, spec §4.4 "Simplify" --

    pub fn eliminate_dead_code(&self) -> Result<Schedule, SchedulingError> {
        Self::traced("eliminate_dead_code", &self.proc.name, simplify::eliminate_dead_code(&self.proc))
    }

    pub fn simplify(&self) -> Result<Schedule, SchedulingError> {
        Self::traced("simplify", &self.proc.name, simplify::simplify(&self.proc))
    }

    /// Every rewrite funnels through here so a host driving a schedule gets
    /// one consistent trace of what was tried, against what, and whether it
    /// stuck -- mirrors the per-opcode trace `vm.rs` emitted around each
    /// instruction it executed, generalized from "instruction" to "rewrite."
    fn traced(op: &'static str, target: impl std::fmt::Debug, result: RewriteResult) -> Result<Schedule, SchedulingError> {
        match &result {
            Ok(_) => tracing::debug!(rewrite = op, target = ?target, "rewrite applied"),
            Err(e) => tracing::debug!(rewrite = op, target = ?target, error = %e, "rewrite rejected"),
        }
        result.map(|(p, _)| Schedule::new(p))
    }
}
