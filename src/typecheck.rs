// `check(UAST) -> TIR`, spec §4.1. Grounded on `typechecker.rs`'s
// `TypeChecker` struct wrapping a `Node<Env<T>>`, an `eval_*` dispatch
// table per expression kind, and `eval_block`'s "child scope via
// `Env::chain`" idiom for nested blocks. Generalized from a
// dynamically-typed value-language checker to one that additionally
// classifies every expression as scalar/affine/predicate and rejects
// non-affine terms in index position (spec §3 invariant).

use crate::error::TypeError;
use crate::expr::{AExpr, BinOp, CmpOp, Const, Pred, Slice, ValExpr};
use crate::stmt::{Arg, DeviceMode, InstrMacro, LoopMode, Proc, SrcInfo, Statement, WithTag};
use crate::symbol::Symbol;
use crate::types::{Effect, MemKind, Scalar, Tensor, Type, Window};
use crate::uast::{DeviceMode as UDeviceMode, LoopMode as ULoopMode, UArg, UEffect, UExpr};
use crate::uast::{UProc, USlice, UStmt, UTypeName};
use std::collections::HashSet;
use std::rc::Rc;

/// A resolved binding: a symbol plus whatever the checker needs to know
/// about it to classify later uses (its type, and whether writes are
/// permitted).
#[derive(Clone, Debug)]
struct Binding {
    sym: Symbol,
    ty: Type,
    effect: Effect,
}

struct Checker {
    env: crate::env::Env<Binding>,
    proc_env: crate::env::Env<Rc<Proc>>,
    written: HashSet<u64>,
}

/// Type-check a whole untyped procedure, producing a TIR `Proc` or the
/// first `TypeError` encountered. `callables` resolves previously checked
/// sibling procedures referenced by `Call` statements (needed to validate
/// arity/const-ness and to detect call-graph cycles per spec §4.1).
#[tracing::instrument(skip(proc, callables), fields(proc = %proc.name))]
pub fn check(proc: &UProc, callables: &[Rc<Proc>]) -> Result<Proc, TypeError> {
    tracing::debug!(callables = callables.len(), "typechecking procedure");
    let root = crate::env::Env::root();
    let proc_root = crate::env::Env::root();
    for p in callables {
        proc_root.define(&p.name, p.clone());
    }
    let checker = Checker { env: root, proc_env: proc_root, written: HashSet::new() };

    let mut args = Vec::new();
    for ua in &proc.args {
        let sym = Symbol::fresh(ua.name.clone());
        let ty = checker.resolve_type(&ua.ty)?;
        let effect = match ua.effect {
            UEffect::In => Effect::In,
            UEffect::Out => Effect::Out,
            UEffect::InOut => Effect::InOut,
        };
        checker.env.define(&ua.name, Binding { sym: sym.clone(), ty: ty.clone(), effect });
        args.push(Arg { sym, ty, mem: checker.mem_of(&ua.mem), effect });
    }

    let mut preconditions = Vec::new();
    for pc in &proc.preconditions {
        preconditions.push(checker.eval_pred(pc)?);
    }

    let body = checker.check_block(&proc.body)?;
    check_acyclic(&proc.name, &body, &proc_root)?;

    Ok(Proc {
        name: proc.name.clone(),
        args,
        preconditions,
        body: Rc::new(body),
        instr: proc.instr.clone().map(|template| InstrMacro { template }),
        srcinfo: SrcInfo::new(proc.srcinfo.clone(), 0),
    })
}

fn check_acyclic(name: &str, body: &[Statement], proc_env: &crate::env::Env<Rc<Proc>>) -> Result<(), TypeError> {
    // `stack` tracks the chain of *Call* edges taken to reach the current
    // statement, not nesting inside `If`/`For`/`With`: re-visiting the
    // same proc's own nested blocks isn't a cycle, only following a Call
    // back to a proc already on the stack is.
    fn visit(
        name: &str,
        stmts: &[Statement],
        stack: &mut Vec<String>,
        proc_env: &crate::env::Env<Rc<Proc>>,
    ) -> Result<(), TypeError> {
        for s in stmts {
            match s {
                Statement::Call { callee, .. } => {
                    if let Some(callee_body) = proc_env.get(&callee.name) {
                        if stack.iter().any(|s| s == &callee_body.name) {
                            return Err(TypeError::CyclicCall(callee_body.name.clone()));
                        }
                        stack.push(callee_body.name.clone());
                        visit(&callee_body.name, &callee_body.body, stack, proc_env)?;
                        stack.pop();
                    }
                }
                Statement::If { body, orelse, .. } => {
                    visit(name, body, stack, proc_env)?;
                    visit(name, orelse, stack, proc_env)?;
                }
                Statement::For { body, .. } | Statement::With { body, .. } => {
                    visit(name, body, stack, proc_env)?;
                }
                _ => {}
            }
        }
        Ok(())
    }
    let mut stack = vec![name.to_string()];
    visit(name, body, &mut stack, proc_env)
}

impl Checker {
    fn mem_of(&self, mem: &Option<String>) -> MemKind {
        match mem {
            Some(m) => MemKind(m.clone()),
            None => MemKind::dram(),
        }
    }

    fn resolve_type(&self, ty: &UTypeName) -> Result<Type, TypeError> {
        match ty {
            UTypeName::Scalar(name) => Ok(Type::Scalar(resolve_scalar(name)?)),
            UTypeName::Tensor(base, shape) => {
                let base = resolve_scalar(base)?;
                let shape = shape.iter().map(|e| self.eval_affine(e)).collect::<Result<_, _>>()?;
                Ok(Type::Tensor(Tensor { base, shape, mem: MemKind::dram() }))
            }
            UTypeName::Window(base, shape, source, is_const) => {
                let base = resolve_scalar(base)?;
                let shape = shape.iter().map(|e| self.eval_affine(e)).collect::<Result<_, _>>()?;
                let source = self.resolve_sym(source)?;
                Ok(Type::Window(Window { base, shape, source, is_const: *is_const }))
            }
        }
    }

    fn resolve_sym(&self, name: &str) -> Result<Symbol, TypeError> {
        self.env
            .get(name)
            .map(|b| b.sym.clone())
            .ok_or_else(|| TypeError::Undefined(name.to_string()))
    }

    fn binding(&self, name: &str) -> Result<Binding, TypeError> {
        self.env.get(name).map(|b| (*b).clone()).ok_or_else(|| TypeError::Undefined(name.to_string()))
    }

    /// Classify a UExpr used in an index/shape position: must reduce to an
    /// affine expression over `size`/`index` symbols and integer constants.
    fn eval_affine(&self, e: &UExpr) -> Result<AExpr, TypeError> {
        match e {
            UExpr::ConstInt(n) => Ok(AExpr::AConst(*n)),
            UExpr::Read(name, idx) if idx.is_empty() => {
                let b = self.binding(name)?;
                match b.ty {
                    Type::Index(crate::types::IndexClass::Size) => Ok(AExpr::ASize(b.sym)),
                    Type::Index(_) => Ok(AExpr::AVar(b.sym)),
                    _ => Err(TypeError::NonAffineIndex(name.clone())),
                }
            }
            UExpr::BinOp(op, a, b) => {
                let (a, b) = (self.eval_affine(a)?, self.eval_affine(b)?);
                match op.as_str() {
                    "+" => Ok(AExpr::add(a, b)),
                    "-" => Ok(AExpr::sub(a, b)),
                    "*" => match (&a, &b) {
                        (AExpr::AConst(k), _) => Ok(AExpr::scale(*k, b)),
                        (_, AExpr::AConst(k)) => Ok(AExpr::scale(*k, a)),
                        _ => Err(TypeError::NonAffineIndex("non-linear product".to_string())),
                    },
                    "/" => match &b {
                        AExpr::AConst(k) => Ok(AExpr::scale_div(a, *k)),
                        _ => Err(TypeError::NonAffineIndex("division by non-constant".to_string())),
                    },
                    _ => Err(TypeError::NonAffineIndex(format!("operator `{}`", op))),
                }
            }
            UExpr::USub(a) => {
                let a = self.eval_affine(a)?;
                Ok(AExpr::scale(-1, a))
            }
            other => Err(TypeError::NonAffineIndex(format!("{:?}", other))),
        }
    }

    fn eval_pred(&self, e: &UExpr) -> Result<Pred, TypeError> {
        match e {
            UExpr::ConstBool(b) => Ok(Pred::BConst(*b)),
            UExpr::BinOp(op, a, b) if op == "and" => {
                Ok(Pred::and(self.eval_pred(a)?, self.eval_pred(b)?))
            }
            UExpr::BinOp(op, a, b) if op == "or" => {
                Ok(Pred::or(self.eval_pred(a)?, self.eval_pred(b)?))
            }
            UExpr::BinOp(op, a, b) => {
                let cmp = match op.as_str() {
                    "<" => CmpOp::Lt,
                    ">" => CmpOp::Gt,
                    "<=" => CmpOp::Le,
                    ">=" => CmpOp::Ge,
                    "==" => CmpOp::Eq,
                    _ => return Err(TypeError::Mismatch { expected: "predicate".to_string(), got: op.clone() }),
                };
                Ok(Pred::cmp(cmp, self.eval_affine(a)?, self.eval_affine(b)?))
            }
            other => Err(TypeError::Mismatch {
                expected: "predicate".to_string(),
                got: format!("{:?}", other),
            }),
        }
    }

    fn eval_value(&self, e: &UExpr) -> Result<ValExpr, TypeError> {
        match e {
            UExpr::ConstInt(n) => Ok(ValExpr::Const(Const::Int(*n))),
            UExpr::ConstFloat(f) => Ok(ValExpr::Const(Const::Float(*f))),
            UExpr::ConstBool(b) => Ok(ValExpr::Const(Const::Bool(*b))),
            UExpr::Read(name, idx) => {
                let b = self.binding(name)?;
                if idx.is_empty() && !b.ty.is_buffer() {
                    return Ok(ValExpr::Read(b.sym, vec![]));
                }
                if !b.ty.is_buffer() {
                    return Err(TypeError::Mismatch {
                        expected: "buffer".to_string(),
                        got: name.clone(),
                    });
                }
                let idx = idx.iter().map(|e| self.eval_affine(e)).collect::<Result<_, _>>()?;
                Ok(ValExpr::Read(b.sym, idx))
            }
            UExpr::BinOp(op, a, b) => {
                let op = resolve_binop(op)?;
                Ok(ValExpr::BinOp(op, Rc::new(self.eval_value(a)?), Rc::new(self.eval_value(b)?)))
            }
            UExpr::USub(a) => Ok(ValExpr::USub(Rc::new(self.eval_value(a)?))),
            UExpr::StrideExpr(name, dim) => Ok(ValExpr::StrideExpr(self.resolve_sym(name)?, *dim)),
            UExpr::ReadConfig(cfg, field) => {
                Ok(ValExpr::ReadConfig(self.resolve_sym(cfg)?, field.clone()))
            }
            UExpr::Extern(name, args) => {
                let sym = self.resolve_sym(name)?;
                let args = args.iter().map(|a| self.eval_value(a)).collect::<Result<_, _>>()?;
                Ok(ValExpr::Extern(sym, args))
            }
            UExpr::WindowExpr(name, slices) => {
                let sym = self.resolve_sym(name)?;
                let slices = slices.iter().map(|s| self.eval_slice(s)).collect::<Result<_, _>>()?;
                Ok(ValExpr::WindowExpr(sym, slices))
            }
            UExpr::Select(pred, e) => {
                Ok(ValExpr::Select(Rc::new(self.eval_pred(pred)?), Rc::new(self.eval_value(e)?)))
            }
        }
    }

    fn eval_slice(&self, s: &USlice) -> Result<Slice, TypeError> {
        match s {
            USlice::Point(e) => Ok(Slice::Point(self.eval_affine(e)?)),
            USlice::Range(lo, hi) => Ok(Slice::Range(self.eval_affine(lo)?, self.eval_affine(hi)?)),
        }
    }

    fn check_block(&self, stmts: &[UStmt]) -> Result<Vec<Statement>, TypeError> {
        let mut out = Vec::with_capacity(stmts.len());
        for s in stmts {
            out.push(self.check_stmt(s)?);
        }
        Ok(out)
    }

    fn check_write(&self, name: &str) -> Result<Symbol, TypeError> {
        let b = self.binding(name)?;
        if !b.effect.permits_write() {
            return Err(TypeError::WriteToConst(b.sym));
        }
        Ok(b.sym)
    }

    fn check_stmt(&self, s: &UStmt) -> Result<Statement, TypeError> {
        let srcinfo = SrcInfo::UNKNOWN;
        match s {
            UStmt::Pass => Ok(Statement::Pass { srcinfo }),
            UStmt::Assign(name, idx, rhs) => {
                let sym = self.check_write(name)?;
                let idx = idx.iter().map(|e| self.eval_affine(e)).collect::<Result<_, _>>()?;
                let rhs = self.eval_value(rhs)?;
                Ok(Statement::Assign { sym, idx, rhs, srcinfo })
            }
            UStmt::Reduce(name, idx, rhs) => {
                let sym = self.check_write(name)?;
                let idx = idx.iter().map(|e| self.eval_affine(e)).collect::<Result<_, _>>()?;
                let rhs = self.eval_value(rhs)?;
                Ok(Statement::Reduce { sym, idx, rhs, srcinfo })
            }
            UStmt::Alloc(name, ty, mem) => {
                let ty = self.resolve_type(ty)?;
                let mem = self.mem_of(mem);
                let sym = Symbol::fresh(name.clone());
                self.env.define(
                    name,
                    Binding { sym: sym.clone(), ty: ty.clone(), effect: Effect::InOut },
                );
                Ok(Statement::Alloc { sym, ty, mem, srcinfo })
            }
            UStmt::Free(name) => {
                let b = self.binding(name)?;
                let mem = match &b.ty {
                    Type::Tensor(t) => t.mem.clone(),
                    _ => MemKind::dram(),
                };
                Ok(Statement::Free { sym: b.sym, ty: b.ty, mem, srcinfo })
            }
            UStmt::If(cond, body, orelse) => {
                let cond = self.eval_pred(cond)?;
                let body = self.check_block(body)?;
                let orelse = self.check_block(orelse)?;
                Ok(Statement::If { cond, body: Rc::new(body), orelse: Rc::new(orelse), srcinfo })
            }
            UStmt::For(iter_name, lo, hi, mode, body) => {
                let lo = self.eval_affine(lo)?;
                let hi = self.eval_affine(hi)?;
                let iter = Symbol::fresh(iter_name.clone());
                self.env.define(
                    iter_name,
                    Binding {
                        sym: iter.clone(),
                        ty: Type::Index(crate::types::IndexClass::Index),
                        effect: Effect::In,
                    },
                );
                let mode = resolve_loop_mode(mode);
                let body = self.check_block(body)?;
                Ok(Statement::For { iter, lo, hi, mode, body: Rc::new(body), srcinfo })
            }
            UStmt::Call(callee, args) => {
                let callee_proc = self
                    .proc_env
                    .get(callee)
                    .ok_or_else(|| TypeError::Undefined(callee.clone()))?;
                if args.len() != callee_proc.args.len() {
                    return Err(TypeError::Arity {
                        callee: callee.clone(),
                        expected: callee_proc.args.len(),
                        got: args.len(),
                    });
                }
                let args = args.iter().map(|a| self.eval_value(a)).collect::<Result<_, _>>()?;
                Ok(Statement::Call { callee: (*callee_proc).clone().into(), args, srcinfo })
            }
            UStmt::WindowStmt(name, expr) => {
                if let UExpr::WindowExpr(src, slices) = expr {
                    let sym = Symbol::fresh(name.clone());
                    let src_sym = self.resolve_sym(src)?;
                    let slices = slices.iter().map(|s| self.eval_slice(s)).collect::<Result<_, _>>()?;
                    Ok(Statement::WindowStmt { name: sym, expr: (src_sym, slices), srcinfo })
                } else {
                    Err(TypeError::Mismatch {
                        expected: "window expression".to_string(),
                        got: format!("{:?}", expr),
                    })
                }
            }
            UStmt::WriteConfig(cfg, field, rhs) => {
                let cfg_sym = self.resolve_sym(cfg)?;
                let rhs = self.eval_value(rhs)?;
                Ok(Statement::WriteConfig { cfg: cfg_sym, field: field.clone(), rhs, srcinfo })
            }
            UStmt::SyncStmt(code) => Ok(Statement::Sync { codegen: code.clone(), srcinfo }),
            UStmt::With(tag, body) => {
                let tag = match tag.as_str() {
                    "async" => WithTag::Async,
                    "collective" => WithTag::CollectiveSpecialize,
                    other => WithTag::ExternCodegen(other.to_string()),
                };
                let body = self.check_block(body)?;
                Ok(Statement::With { tag, body: Rc::new(body), srcinfo })
            }
        }
    }
}

fn resolve_scalar(name: &str) -> Result<Scalar, TypeError> {
    match name {
        "f16" => Ok(Scalar::F16),
        "f32" => Ok(Scalar::F32),
        "f64" => Ok(Scalar::F64),
        "i8" => Ok(Scalar::I8),
        "i32" => Ok(Scalar::I32),
        "ui8" => Ok(Scalar::UI8),
        "ui16" => Ok(Scalar::UI16),
        "bool" => Ok(Scalar::Bool),
        other => Err(TypeError::Mismatch { expected: "scalar type".to_string(), got: other.to_string() }),
    }
}

fn resolve_binop(op: &str) -> Result<BinOp, TypeError> {
    match op {
        "+" => Ok(BinOp::Add),
        "-" => Ok(BinOp::Sub),
        "*" => Ok(BinOp::Mul),
        "/" => Ok(BinOp::Div),
        "%" => Ok(BinOp::Mod),
        "and" => Ok(BinOp::And),
        "or" => Ok(BinOp::Or),
        "<" => Ok(BinOp::Lt),
        ">" => Ok(BinOp::Gt),
        "<=" => Ok(BinOp::Le),
        ">=" => Ok(BinOp::Ge),
        "==" => Ok(BinOp::Eq),
        other => Err(TypeError::Mismatch { expected: "operator".to_string(), got: other.to_string() }),
    }
}

fn resolve_loop_mode(mode: &ULoopMode) -> LoopMode {
    match mode {
        ULoopMode::Seq => LoopMode::Seq,
        ULoopMode::Par => LoopMode::Par,
        ULoopMode::Device(UDeviceMode::Block) => LoopMode::Device(DeviceMode::Block),
        ULoopMode::Device(UDeviceMode::Warp) => LoopMode::Device(DeviceMode::Warp),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uast::*;

    fn simple_acc() -> UProc {
        UProc {
            name: "acc".to_string(),
            args: vec![
                UArg { name: "N".to_string(), ty: UTypeName::Scalar("i32".to_string()), mem: None, effect: UEffect::In },
                UArg {
                    name: "A".to_string(),
                    ty: UTypeName::Tensor("f32".to_string(), vec![UExpr::Read("N".to_string(), vec![])]),
                    mem: None,
                    effect: UEffect::In,
                },
                UArg { name: "r".to_string(), ty: UTypeName::Scalar("f32".to_string()), mem: None, effect: UEffect::Out },
            ],
            preconditions: vec![],
            body: vec![
                UStmt::Assign("r".to_string(), vec![], UExpr::ConstFloat(0.0)),
                UStmt::For(
                    "i".to_string(),
                    UExpr::ConstInt(0),
                    UExpr::Read("N".to_string(), vec![]),
                    LoopMode::Seq,
                    vec![UStmt::Reduce(
                        "r".to_string(),
                        vec![],
                        UExpr::Read("A".to_string(), vec![UExpr::Read("i".to_string(), vec![])]),
                    )],
                ),
            ],
            instr: None,
            srcinfo: "test".to_string(),
        }
    }

    #[test]
    fn checks_acc_kernel() {
        let tir = check(&simple_acc(), &[]).unwrap();
        assert_eq!(tir.args.len(), 3);
        assert_eq!(tir.body.len(), 2);
    }

    #[test]
    fn rejects_write_to_in_argument() {
        let mut p = simple_acc();
        p.body[0] = UStmt::Assign("N".to_string(), vec![], UExpr::ConstInt(0));
        let err = check(&p, &[]).unwrap_err();
        assert!(matches!(err, TypeError::WriteToConst(_)));
    }

    #[test]
    fn rejects_unknown_symbol() {
        let mut p = simple_acc();
        p.body[0] = UStmt::Assign("nope".to_string(), vec![], UExpr::ConstFloat(0.0));
        let err = check(&p, &[]).unwrap_err();
        assert!(matches!(err, TypeError::Undefined(_)));
    }

    #[test]
    fn rejects_non_affine_index() {
        let mut p = simple_acc();
        p.body[1] = UStmt::Reduce(
            "r".to_string(),
            vec![],
            UExpr::Read(
                "A".to_string(),
                vec![UExpr::BinOp(
                    "*".to_string(),
                    Rc::new(UExpr::Read("i".to_string(), vec![])),
                    Rc::new(UExpr::Read("i".to_string(), vec![])),
                )],
            ),
        );
        // "i" isn't bound outside the removed loop, so this is Undefined;
        // construct a case with a genuine non-affine product instead.
        let mut env_check_proc = simple_acc();
        env_check_proc.body = vec![UStmt::For(
            "i".to_string(),
            UExpr::ConstInt(0),
            UExpr::Read("N".to_string(), vec![]),
            LoopMode::Seq,
            vec![UStmt::Reduce(
                "r".to_string(),
                vec![],
                UExpr::Read(
                    "A".to_string(),
                    vec![UExpr::BinOp(
                        "*".to_string(),
                        Rc::new(UExpr::Read("i".to_string(), vec![])),
                        Rc::new(UExpr::Read("i".to_string(), vec![])),
                    )],
                ),
            )],
        )];
        let err = check(&env_check_proc, &[]).unwrap_err();
        assert!(matches!(err, TypeError::NonAffineIndex(_)));
        let _ = p;
    }

    #[test]
    fn check_acyclic_allows_a_proc_with_nested_loop_bodies() {
        // Regression: revisiting the same proc's own `For`/`If` nesting is
        // not a call-graph cycle; only a `Call` back to a proc already on
        // the stack is.
        let i = Symbol::fresh("i");
        let body = vec![Statement::For {
            iter: i,
            lo: AExpr::AConst(0),
            hi: AExpr::AConst(4),
            mode: LoopMode::Seq,
            body: Rc::new(vec![Statement::If {
                cond: Pred::BConst(true),
                body: Rc::new(vec![Statement::Pass { srcinfo: SrcInfo::UNKNOWN }]),
                orelse: Rc::new(vec![Statement::Pass { srcinfo: SrcInfo::UNKNOWN }]),
                srcinfo: SrcInfo::UNKNOWN,
            }]),
            srcinfo: SrcInfo::UNKNOWN,
        }];
        let proc_env = crate::env::Env::root();
        assert!(check_acyclic("p", &body, &proc_env).is_ok());
    }

    #[test]
    fn check_acyclic_rejects_self_recursive_call() {
        let self_proc = Rc::new(Proc {
            name: "p".to_string(),
            args: vec![],
            preconditions: vec![],
            body: Rc::new(vec![]),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        });
        let proc_env = crate::env::Env::root();
        proc_env.define("p", self_proc.clone());
        let body = vec![Statement::Call { callee: self_proc, args: vec![], srcinfo: SrcInfo::UNKNOWN }];
        let err = check_acyclic("p", &body, &proc_env).unwrap_err();
        assert!(matches!(err, TypeError::CyclicCall(_)));
    }

    #[test]
    fn check_acyclic_rejects_mutual_recursion() {
        let b = Rc::new(Proc {
            name: "b".to_string(),
            args: vec![],
            preconditions: vec![],
            body: Rc::new(vec![]),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        });
        let proc_env = crate::env::Env::root();
        proc_env.define("b", b.clone());
        // `b`'s registered body calls back to `a`, completing the cycle
        // `a -> b -> a` once `a`'s own body (checked below) calls `b`.
        let a = Rc::new(Proc {
            name: "a".to_string(),
            args: vec![],
            preconditions: vec![],
            body: Rc::new(vec![Statement::Call { callee: b.clone(), args: vec![], srcinfo: SrcInfo::UNKNOWN }]),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        });
        proc_env.define("a", a.clone());
        let b_with_call_to_a = Rc::new(Proc {
            name: "b".to_string(),
            args: vec![],
            preconditions: vec![],
            body: Rc::new(vec![Statement::Call { callee: a, args: vec![], srcinfo: SrcInfo::UNKNOWN }]),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        });
        proc_env.define("b", b_with_call_to_a);

        let body = vec![Statement::Call { callee: b, args: vec![], srcinfo: SrcInfo::UNKNOWN }];
        let err = check_acyclic("a", &body, &proc_env).unwrap_err();
        assert!(matches!(err, TypeError::CyclicCall(_)));
    }
}
