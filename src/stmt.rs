// Typed IR: statements and procedures, spec §3 "Statements"/"Procedures".
// Every index position holds an AExpr, every branch condition a Pred
// (invariant from spec §3); scalar expressions never appear inside an
// AExpr because `expr::AExpr` is a distinct Rust type from `expr::ValExpr`.

use crate::expr::{AExpr, Pred, Slice, ValExpr};
use crate::symbol::Symbol;
use crate::types::{Effect, MemKind, Type};
use std::rc::Rc;

pub type Node<T> = Rc<T>;

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum LoopMode {
    Seq,
    Par,
    Device(DeviceMode),
}

#[derive(Clone, Copy, Eq, PartialEq, Debug)]
pub enum DeviceMode {
    Block,
    Warp,
}

#[derive(Clone, Debug)]
pub enum WithTag {
    Async,
    CollectiveSpecialize,
    ExternCodegen(String),
}

#[derive(Clone, Debug)]
pub enum Statement {
    Pass { srcinfo: SrcInfo },
    Assign { sym: Symbol, idx: Vec<AExpr>, rhs: ValExpr, srcinfo: SrcInfo },
    Reduce { sym: Symbol, idx: Vec<AExpr>, rhs: ValExpr, srcinfo: SrcInfo },
    Alloc { sym: Symbol, ty: Type, mem: MemKind, srcinfo: SrcInfo },
    Free { sym: Symbol, ty: Type, mem: MemKind, srcinfo: SrcInfo },
    If { cond: Pred, body: Node<Vec<Statement>>, orelse: Node<Vec<Statement>>, srcinfo: SrcInfo },
    For {
        iter: Symbol,
        lo: AExpr,
        hi: AExpr,
        mode: LoopMode,
        body: Node<Vec<Statement>>,
        srcinfo: SrcInfo,
    },
    Call { callee: Node<Proc>, args: Vec<ValExpr>, srcinfo: SrcInfo },
    WindowStmt { name: Symbol, expr: (Symbol, Vec<Slice>), srcinfo: SrcInfo },
    WriteConfig { cfg: Symbol, field: String, rhs: ValExpr, srcinfo: SrcInfo },
    Sync { codegen: String, srcinfo: SrcInfo },
    With { tag: WithTag, body: Node<Vec<Statement>>, srcinfo: SrcInfo },
}

impl Statement {
    pub fn srcinfo(&self) -> &SrcInfo {
        match self {
            Statement::Pass { srcinfo }
            | Statement::Assign { srcinfo, .. }
            | Statement::Reduce { srcinfo, .. }
            | Statement::Alloc { srcinfo, .. }
            | Statement::Free { srcinfo, .. }
            | Statement::If { srcinfo, .. }
            | Statement::For { srcinfo, .. }
            | Statement::Call { srcinfo, .. }
            | Statement::WindowStmt { srcinfo, .. }
            | Statement::WriteConfig { srcinfo, .. }
            | Statement::Sync { srcinfo, .. }
            | Statement::With { srcinfo, .. } => srcinfo,
        }
    }

    /// Does this statement have any externally observable effect at all?
    /// Used by `eliminate_dead_code` (spec §4.4).
    pub fn has_effect(&self) -> bool {
        !matches!(self, Statement::Pass { .. })
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Default)]
pub struct SrcInfo {
    pub file: String,
    pub line: u32,
}

impl SrcInfo {
    pub const UNKNOWN: SrcInfo = SrcInfo { file: String::new(), line: 0 };

    pub fn new(file: impl Into<String>, line: u32) -> SrcInfo {
        SrcInfo { file: file.into(), line }
    }
}

#[derive(Clone, Debug)]
pub struct Arg {
    pub sym: Symbol,
    pub ty: Type,
    pub mem: MemKind,
    pub effect: Effect,
}

#[derive(Clone, Debug)]
pub struct Proc {
    pub name: String,
    pub args: Vec<Arg>,
    pub preconditions: Vec<Pred>,
    pub body: Node<Vec<Statement>>,
    pub instr: Option<InstrMacro>,
    pub srcinfo: SrcInfo,
}

/// Opaque string-template record for direct lowering of library calls,
/// spec §3 "Procedures" and §4.5 "Call" emission.
#[derive(Clone, Debug)]
pub struct InstrMacro {
    pub template: String,
}

impl Proc {
    pub fn arg(&self, name: &str) -> Option<&Arg> {
        self.args.iter().find(|a| a.sym.base() == name)
    }

    pub fn written_symbols(&self) -> Vec<Symbol> {
        fn walk(stmts: &[Statement], out: &mut Vec<Symbol>) {
            for s in stmts {
                match s {
                    Statement::Assign { sym, .. } | Statement::Reduce { sym, .. } => {
                        out.push(sym.clone())
                    }
                    Statement::If { body, orelse, .. } => {
                        walk(body, out);
                        walk(orelse, out);
                    }
                    Statement::For { body, .. } => walk(body, out),
                    Statement::With { body, .. } => walk(body, out),
                    _ => {}
                }
            }
        }
        let mut out = Vec::new();
        walk(&self.body, &mut out);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scalar;

    #[test]
    fn pass_has_no_effect() {
        assert!(!Statement::Pass { srcinfo: SrcInfo::UNKNOWN }.has_effect());
    }

    #[test]
    fn assign_has_effect() {
        let s = Statement::Assign {
            sym: Symbol::fresh("x"),
            idx: vec![],
            rhs: ValExpr::Const(crate::expr::Const::Int(0)),
            srcinfo: SrcInfo::UNKNOWN,
        };
        assert!(s.has_effect());
    }

    #[test]
    fn written_symbols_collects_across_nesting() {
        let x = Symbol::fresh("x");
        let y = Symbol::fresh("y");
        let body = Rc::new(vec![
            Statement::Assign {
                sym: x.clone(),
                idx: vec![],
                rhs: ValExpr::Const(crate::expr::Const::Int(0)),
                srcinfo: SrcInfo::UNKNOWN,
            },
            Statement::For {
                iter: Symbol::fresh("i"),
                lo: AExpr::AConst(0),
                hi: AExpr::AConst(3),
                mode: LoopMode::Seq,
                body: Rc::new(vec![Statement::Reduce {
                    sym: y.clone(),
                    idx: vec![],
                    rhs: ValExpr::Const(crate::expr::Const::Int(1)),
                    srcinfo: SrcInfo::UNKNOWN,
                }]),
                srcinfo: SrcInfo::UNKNOWN,
            },
        ]);
        let proc = Proc {
            name: "p".to_string(),
            args: vec![],
            preconditions: vec![],
            body,
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        };
        let written = proc.written_symbols();
        assert!(written.contains(&x));
        assert!(written.contains(&y));
        let _ = Scalar::F32;
    }
}
