// Context struct synthesis, spec §4.5 closing paragraph: "The compiler
// also synthesizes a per-library context struct containing user-declared
// mutable configs; read-only configs are omitted with a comment." Kept as
// its own module rather than folded into `emit`: it has a distinct
// concern, collecting mutable configs across every procedure in a compile
// unit, and its own naming/ordering invariant (one field per mutable
// config, declared in registry order).

use crate::config::{Access, ConfigRegistry};

/// Render the `struct <name> { ... };` the emitted `.h` prologue carries,
/// one field per `ReadWrite` config field, with a `//` comment standing in
/// for every `ReadOnly` field so the struct's shape still documents what
/// exists.
pub fn synthesize(struct_name: &str, configs: &ConfigRegistry) -> String {
    let mut out = format!("typedef struct {} {{\n", struct_name);
    for (cfg_name, spec) in configs.iter() {
        for (field_name, field) in &spec.fields {
            match field.access {
                Access::ReadWrite => {
                    out.push_str(&format!("  {} {}_{};\n", field.ty.ctype(), cfg_name, field_name));
                }
                Access::ReadOnly => {
                    out.push_str(&format!("  // {} {}_{} (read-only, not stored in context)\n", field.ty.ctype(), cfg_name, field_name));
                }
            }
        }
    }
    out.push_str(&format!("}} {};\n", struct_name));
    out
}

/// The lvalue a `ReadConfig`/`WriteConfig` statement compiles to for a
/// mutable field: `ctxt->cfg_field`. Read-only fields have no context
/// storage and must be resolved some other way by the host (out of scope
/// here, same as spec §4.5's "not detailed" async/device dispatch).
pub fn field_lvalue(cfg_name: &str, field_name: &str) -> String {
    format!("ctxt->{}_{}", cfg_name, field_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigField, ConfigSpec};
    use crate::types::Scalar;

    fn registry() -> ConfigRegistry {
        let mut spec = ConfigSpec::default();
        spec.fields.insert("block_size".to_string(), ConfigField { ty: Scalar::I32, access: Access::ReadWrite });
        spec.fields.insert("eps".to_string(), ConfigField { ty: Scalar::F32, access: Access::ReadOnly });
        ConfigRegistry::new().with_config("tuning", spec)
    }

    #[test]
    fn mutable_field_gets_a_real_member() {
        let text = synthesize("exo_context", &registry());
        assert!(text.contains("int32_t tuning_block_size;"));
    }

    #[test]
    fn readonly_field_is_commented_out() {
        let text = synthesize("exo_context", &registry());
        assert!(text.contains("// float tuning_eps (read-only, not stored in context)"));
        assert!(!text.contains("float tuning_eps;"));
    }

    #[test]
    fn field_lvalue_dereferences_ctxt() {
        assert_eq!(field_lvalue("tuning", "block_size"), "ctxt->tuning_block_size");
    }
}
