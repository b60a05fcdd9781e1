// Precision analysis, spec §4.5 pass (ii): propagates scalar precisions
// along assignments and reductions, inserting an explicit cast in emitted
// text when an assignment's right-hand side was produced at a different
// precision than its left-hand side's declared scalar type.

use crate::stmt::{Proc, Statement};
use crate::types::{Scalar, Type};
use std::collections::HashMap;

/// Symbol -> declared scalar type, gathered from a procedure's arguments and
/// allocations. Buffers contribute their element scalar; index-class and
/// loop-iteration symbols are left unresolved (they never appear as an
/// assignment target).
#[derive(Clone, Debug, Default)]
pub struct PrecisionMap(HashMap<u64, Scalar>);

impl PrecisionMap {
    pub fn infer(proc: &Proc) -> PrecisionMap {
        let mut map = HashMap::new();
        for arg in &proc.args {
            if let Some(s) = scalar_of(&arg.ty) {
                map.insert(arg.sym.id(), s);
            }
        }
        collect_allocs(&proc.body, &mut map);
        PrecisionMap(map)
    }

    pub fn resolve(&self, id: u64) -> Option<Scalar> {
        self.0.get(&id).copied()
    }
}

fn scalar_of(ty: &Type) -> Option<Scalar> {
    match ty {
        Type::Scalar(s) => Some(*s),
        Type::Tensor(t) => Some(t.base),
        Type::Window(w) => Some(w.base),
        Type::Index(_) => None,
    }
}

fn collect_allocs(stmts: &[Statement], map: &mut HashMap<u64, Scalar>) {
    for s in stmts {
        match s {
            Statement::Alloc { sym, ty, .. } => {
                if let Some(scalar) = scalar_of(ty) {
                    map.insert(sym.id(), scalar);
                }
            }
            Statement::If { body, orelse, .. } => {
                collect_allocs(body, map);
                collect_allocs(orelse, map);
            }
            Statement::For { body, .. } | Statement::With { body, .. } => collect_allocs(body, map),
            _ => {}
        }
    }
}

/// Does moving a value of precision `from` into a slot of precision `to`
/// require an explicit C cast?
pub fn needs_cast(from: Scalar, to: Scalar) -> bool {
    from != to
}

/// Wrap `text` in an explicit cast to `to` if `from` differs, else return it
/// unchanged.
pub fn cast_to(text: &str, from: Scalar, to: Scalar) -> String {
    if needs_cast(from, to) {
        format!("({})({})", to.ctype(), text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stmt::{Arg, Node, SrcInfo};
    use crate::symbol::Symbol;
    use crate::types::{Effect, MemKind};

    #[test]
    fn infers_scalar_from_arg_type() {
        let sym = Symbol::fresh("x");
        let proc = Proc {
            name: "p".to_string(),
            args: vec![Arg { sym: sym.clone(), ty: Type::Scalar(Scalar::F32), mem: MemKind::dram(), effect: Effect::In }],
            preconditions: vec![],
            body: Node::new(vec![]),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        };
        let map = PrecisionMap::infer(&proc);
        assert_eq!(map.resolve(sym.id()), Some(Scalar::F32));
    }

    #[test]
    fn cast_to_differing_precision_wraps_expression() {
        assert_eq!(cast_to("x", Scalar::F32, Scalar::F64), "(double)(x)");
        assert_eq!(cast_to("x", Scalar::F32, Scalar::F32), "x");
    }
}
