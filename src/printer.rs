// Deterministic pretty-printer, spec §4.6/§4.3. `find`/`find_loop` match
// patterns against this printer's output, and the round-trip property
// (spec §8 property 2) depends on it being a faithful, deterministic
// rendering. Grounded on `vm.rs`'s `decode_word`/assembly-text convention,
// used here in the opposite direction (struct to text rather than text to
// struct).

use crate::expr::{AExpr, BinOp, CmpOp, Const, Pred, Slice, ValExpr};
use crate::stmt::{LoopMode, Proc, Statement};

pub fn print_proc(proc: &Proc) -> String {
    let mut out = format!("def {}(", proc.name);
    let args: Vec<String> = proc.args.iter().map(|a| format!("{}: {}", a.sym, a.ty.name())).collect();
    out.push_str(&args.join(", "));
    out.push_str("):\n");
    print_block(&proc.body, 1, &mut out);
    out
}

fn indent(level: usize, out: &mut String) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

pub fn print_block(stmts: &[Statement], level: usize, out: &mut String) {
    if stmts.is_empty() {
        indent(level, out);
        out.push_str("pass\n");
        return;
    }
    for s in stmts {
        print_stmt(s, level, out);
    }
}

pub fn print_stmt(s: &Statement, level: usize, out: &mut String) {
    indent(level, out);
    match s {
        Statement::Pass { .. } => out.push_str("pass\n"),
        Statement::Assign { sym, idx, rhs, .. } => {
            out.push_str(&format!("{}{} = {}\n", sym, print_idx(idx), print_val(rhs)));
        }
        Statement::Reduce { sym, idx, rhs, .. } => {
            out.push_str(&format!("{}{} += {}\n", sym, print_idx(idx), print_val(rhs)));
        }
        Statement::Alloc { sym, ty, mem, .. } => {
            out.push_str(&format!("{}: {} @ {}\n", sym, ty.name(), mem));
        }
        Statement::Free { sym, .. } => out.push_str(&format!("free({})\n", sym)),
        Statement::If { cond, body, orelse, .. } => {
            out.push_str(&format!("if {}:\n", print_pred(cond)));
            print_block(body, level + 1, out);
            if !orelse.is_empty() {
                indent(level, out);
                out.push_str("else:\n");
                print_block(orelse, level + 1, out);
            }
        }
        Statement::For { iter, lo, hi, mode, body, .. } => {
            out.push_str(&format!("for {} in {}({}, {}):\n", iter, print_mode(mode), print_aexpr(lo), print_aexpr(hi)));
            print_block(body, level + 1, out);
        }
        Statement::Call { callee, args, .. } => {
            let args: Vec<String> = args.iter().map(print_val).collect();
            out.push_str(&format!("{}({})\n", callee.name, args.join(", ")));
        }
        Statement::WindowStmt { name, expr, .. } => {
            let (src, slices) = expr;
            let slices: Vec<String> = slices.iter().map(print_slice).collect();
            out.push_str(&format!("{} = {}[{}]\n", name, src, slices.join(", ")));
        }
        Statement::WriteConfig { cfg, field, rhs, .. } => {
            out.push_str(&format!("{}.{} = {}\n", cfg, field, print_val(rhs)));
        }
        Statement::Sync { codegen, .. } => out.push_str(&format!("sync({})\n", codegen)),
        Statement::With { tag, body, .. } => {
            out.push_str(&format!("with {:?}:\n", tag));
            print_block(body, level + 1, out);
        }
    }
}

fn print_mode(mode: &LoopMode) -> &'static str {
    match mode {
        LoopMode::Seq => "seq",
        LoopMode::Par => "par",
        LoopMode::Device(crate::stmt::DeviceMode::Block) => "cuda_block",
        LoopMode::Device(crate::stmt::DeviceMode::Warp) => "cuda_warp",
    }
}

fn print_idx(idx: &[AExpr]) -> String {
    if idx.is_empty() {
        String::new()
    } else {
        let parts: Vec<String> = idx.iter().map(print_aexpr).collect();
        format!("[{}]", parts.join(", "))
    }
}

pub fn print_aexpr(e: &AExpr) -> String {
    match e {
        AExpr::AVar(s) => format!("{}", s),
        AExpr::ASize(s) => format!("{}", s),
        AExpr::AConst(c) => c.to_string(),
        AExpr::AAdd(a, b) => format!("({} + {})", print_aexpr(a), print_aexpr(b)),
        AExpr::ASub(a, b) => format!("({} - {})", print_aexpr(a), print_aexpr(b)),
        AExpr::AScale(k, a) => format!("({} * {})", k, print_aexpr(a)),
        AExpr::AScaleDiv(a, k) => format!("({} / {})", print_aexpr(a), k),
    }
}

pub fn print_pred(p: &Pred) -> String {
    match p {
        Pred::BConst(b) => b.to_string(),
        Pred::And(a, b) => format!("({} and {})", print_pred(a), print_pred(b)),
        Pred::Or(a, b) => format!("({} or {})", print_pred(a), print_pred(b)),
        Pred::Cmp(op, a, b) => format!("({} {} {})", print_aexpr(a), print_cmp(*op), print_aexpr(b)),
    }
}

fn print_cmp(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Lt => "<",
        CmpOp::Gt => ">",
        CmpOp::Le => "<=",
        CmpOp::Ge => ">=",
        CmpOp::Eq => "==",
    }
}

fn print_binop(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::And => "and",
        BinOp::Or => "or",
        BinOp::Lt => "<",
        BinOp::Gt => ">",
        BinOp::Le => "<=",
        BinOp::Ge => ">=",
        BinOp::Eq => "==",
    }
}

pub fn print_val(e: &ValExpr) -> String {
    match e {
        ValExpr::Read(sym, idx) => format!("{}{}", sym, print_idx(idx)),
        ValExpr::Const(Const::Bool(b)) => b.to_string(),
        ValExpr::Const(Const::Int(i)) => i.to_string(),
        ValExpr::Const(Const::Float(f)) => f.to_string(),
        ValExpr::BinOp(op, a, b) => format!("({} {} {})", print_val(a), print_binop(*op), print_val(b)),
        ValExpr::USub(a) => format!("(-{})", print_val(a)),
        ValExpr::StrideExpr(sym, dim) => format!("stride({}, {})", sym, dim),
        ValExpr::ReadConfig(cfg, field) => format!("{}.{}", cfg, field),
        ValExpr::Extern(f, args) => {
            let args: Vec<String> = args.iter().map(print_val).collect();
            format!("{}({})", f, args.join(", "))
        }
        ValExpr::WindowExpr(sym, slices) => {
            let slices: Vec<String> = slices.iter().map(print_slice).collect();
            format!("{}[{}]", sym, slices.join(", "))
        }
        ValExpr::Select(pred, e) => format!("select({}, {})", print_pred(pred), print_val(e)),
    }
}

fn print_slice(s: &Slice) -> String {
    match s {
        Slice::Point(e) => print_aexpr(e),
        Slice::Range(lo, hi) => format!("{}:{}", print_aexpr(lo), print_aexpr(hi)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{AExpr, Const};
    use crate::stmt::SrcInfo;
    use crate::symbol::Symbol;

    #[test]
    fn prints_assign_with_index() {
        let sym = Symbol::fresh("r");
        let mut out = String::new();
        print_stmt(
            &Statement::Assign { sym: sym.clone(), idx: vec![], rhs: ValExpr::Const(Const::Float(0.0)), srcinfo: SrcInfo::UNKNOWN },
            0,
            &mut out,
        );
        assert_eq!(out, format!("{} = 0\n", sym));
    }

    #[test]
    fn prints_for_header_with_mode() {
        let i = Symbol::fresh("i");
        let mut out = String::new();
        let body = crate::stmt::Node::new(vec![]);
        print_stmt(
            &Statement::For {
                iter: i.clone(),
                lo: AExpr::AConst(0),
                hi: AExpr::AConst(10),
                mode: LoopMode::Seq,
                body,
                srcinfo: SrcInfo::UNKNOWN,
            },
            0,
            &mut out,
        );
        assert!(out.starts_with(&format!("for {} in seq(0, 10):", i)));
    }
}
