// Parallel analysis, spec §4.5 pass (i): validates loop-mode nesting before
// emission. The only nesting rule spec §5 names explicitly is that a
// device-warp loop must be enclosed by a device-block loop; sequential and
// parallel-for loops nest freely with anything.

use crate::error::TypeError;
use crate::stmt::{DeviceMode, LoopMode, Proc, Statement};

/// Walk `proc`'s body confirming every `Device(Warp)` loop has a `Device(Block)`
/// ancestor. Returns the first violation found, if any.
pub fn check_proc(proc: &Proc) -> Result<(), TypeError> {
    check_block(&proc.body, false)
}

fn check_block(stmts: &[Statement], in_block: bool) -> Result<(), TypeError> {
    for s in stmts {
        check_stmt(s, in_block)?;
    }
    Ok(())
}

fn check_stmt(s: &Statement, in_block: bool) -> Result<(), TypeError> {
    match s {
        Statement::For { iter, mode, body, .. } => match mode {
            LoopMode::Device(DeviceMode::Warp) if !in_block => Err(TypeError::BadLoopNesting(format!(
                "device-warp loop `{}` has no enclosing device-block loop",
                iter
            ))),
            LoopMode::Device(DeviceMode::Block) => check_block(body, true),
            _ => check_block(body, in_block),
        },
        Statement::If { body, orelse, .. } => {
            check_block(body, in_block)?;
            check_block(orelse, in_block)
        }
        Statement::With { body, .. } => check_block(body, in_block),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::AExpr;
    use crate::stmt::{Node, SrcInfo};
    use crate::symbol::Symbol;

    fn proc_with(body: Vec<Statement>) -> Proc {
        Proc {
            name: "p".to_string(),
            args: vec![],
            preconditions: vec![],
            body: Node::new(body),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        }
    }

    #[test]
    fn bare_warp_loop_is_rejected() {
        let warp = Statement::For {
            iter: Symbol::fresh("lane"),
            lo: AExpr::AConst(0),
            hi: AExpr::AConst(32),
            mode: LoopMode::Device(DeviceMode::Warp),
            body: Node::new(vec![]),
            srcinfo: SrcInfo::UNKNOWN,
        };
        assert!(check_proc(&proc_with(vec![warp])).is_err());
    }

    #[test]
    fn warp_loop_nested_in_block_loop_is_accepted() {
        let warp = Statement::For {
            iter: Symbol::fresh("lane"),
            lo: AExpr::AConst(0),
            hi: AExpr::AConst(32),
            mode: LoopMode::Device(DeviceMode::Warp),
            body: Node::new(vec![]),
            srcinfo: SrcInfo::UNKNOWN,
        };
        let block = Statement::For {
            iter: Symbol::fresh("blk"),
            lo: AExpr::AConst(0),
            hi: AExpr::AConst(8),
            mode: LoopMode::Device(DeviceMode::Block),
            body: Node::new(vec![warp]),
            srcinfo: SrcInfo::UNKNOWN,
        };
        assert!(check_proc(&proc_with(vec![block])).is_ok());
    }

    #[test]
    fn sequential_and_parallel_loops_nest_freely() {
        let inner = Statement::For {
            iter: Symbol::fresh("j"),
            lo: AExpr::AConst(0),
            hi: AExpr::AConst(4),
            mode: LoopMode::Par,
            body: Node::new(vec![]),
            srcinfo: SrcInfo::UNKNOWN,
        };
        let outer = Statement::For {
            iter: Symbol::fresh("i"),
            lo: AExpr::AConst(0),
            hi: AExpr::AConst(4),
            mode: LoopMode::Seq,
            body: Node::new(vec![inner]),
            srcinfo: SrcInfo::UNKNOWN,
        };
        assert!(check_proc(&proc_with(vec![outer])).is_ok());
    }
}
