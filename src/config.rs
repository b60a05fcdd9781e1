// Procedure-attached configuration values, spec §3 "ReadConfig(cfg, field)"/
// "WriteConfig(cfg, field, rhs)" and §4.5's closing paragraph ("the compiler
// also synthesizes a per-library context struct containing user-declared
// mutable configs; read-only configs are omitted with a comment"). Config
// values are small `serde`-derived value types: a thing the host declares
// once and the rest of the system consults, loaded here from a JSON
// fixture rather than parsed from source.

use crate::error::ConfigError;
use crate::types::Scalar;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Whether a config field may be written by kernel code, spec §7
/// "ConfigError: read/write to a config whose access mode forbids it."
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    ReadOnly,
    ReadWrite,
}

impl Access {
    pub fn permits_write(&self) -> bool {
        matches!(self, Access::ReadWrite)
    }
}

/// One field of a declared config: its C scalar type and access mode.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigField {
    pub ty: Scalar,
    pub access: Access,
}

/// A named config, e.g. `tuning` with fields `block_size: ReadWrite`,
/// `eps: ReadOnly`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigSpec {
    pub fields: BTreeMap<String, ConfigField>,
}

/// Every config a compile unit knows about, keyed by config name. Supplied
/// by the host alongside the `Memory`/`Extern` capability registries: config
/// declaration is external to the core the same way memory/extern
/// capabilities are.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ConfigRegistry {
    configs: BTreeMap<String, ConfigSpec>,
}

impl ConfigRegistry {
    pub fn new() -> ConfigRegistry {
        ConfigRegistry::default()
    }

    pub fn with_config(mut self, name: impl Into<String>, spec: ConfigSpec) -> ConfigRegistry {
        self.configs.insert(name.into(), spec);
        self
    }

    pub fn get(&self, name: &str) -> Option<&ConfigSpec> {
        self.configs.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ConfigSpec)> {
        self.configs.iter()
    }

    fn field(&self, cfg: &str, field: &str) -> Result<&ConfigField, ConfigError> {
        self.configs
            .get(cfg)
            .and_then(|spec| spec.fields.get(field))
            .ok_or_else(|| ConfigError { config: cfg.to_string(), field: field.to_string(), access: "declared".to_string() })
    }

    /// `check(cfg, field)` for a `ReadConfig` use: legal as long as the
    /// field is declared.
    pub fn check_read(&self, cfg: &str, field: &str) -> Result<(), ConfigError> {
        self.field(cfg, field).map(|_| ())
    }

    /// `check(cfg, field)` for a `WriteConfig` use: legal only if the field
    /// is declared `ReadWrite`.
    pub fn check_write(&self, cfg: &str, field: &str) -> Result<(), ConfigError> {
        let f = self.field(cfg, field)?;
        if f.access.permits_write() {
            Ok(())
        } else {
            Err(ConfigError { config: cfg.to_string(), field: field.to_string(), access: "write".to_string() })
        }
    }
}

/// Compile-unit-wide settings, spec §2's ambient "CompilerConfig" addition:
/// the default memory kind for unannotated buffers (spec §4.1 "Default
/// memory for unannotated buffers is DRAM") and whether precondition
/// assumptions are emitted as compiler hints (spec §4.5 "Precondition
/// assumptions ... emitted as compiler hints (`assume(expr)` macro)").
/// Loaded from a JSON fixture via `serde_json` rather than a `ron`-based
/// loader, since no gauge-layout DSL survives here.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    pub default_memory: String,
    pub emit_assume_macro: bool,
    pub context_struct_name: String,
}

impl Default for CompilerConfig {
    fn default() -> CompilerConfig {
        CompilerConfig {
            default_memory: "DRAM".to_string(),
            emit_assume_macro: true,
            context_struct_name: "exo_context".to_string(),
        }
    }
}

impl CompilerConfig {
    pub fn from_json(text: &str) -> serde_json::Result<CompilerConfig> {
        serde_json::from_str(text)
    }
}
