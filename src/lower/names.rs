// C-identifier fresh-name policy, spec §4.6: "the policy is applied in
// both lowering (to avoid colliding with emitted identifiers) and
// pretty-printing. Two distinct symbols always receive two distinct
// printed names." The IR pretty-printer (`printer.rs`) gets this for free
// from `Symbol`'s own `base$id` `Display` impl, which is fine for a
// debug/round-trip format but not a legal C identifier; lowering needs its
// own table assigning each `Symbol` a sanitized, collision-free spelling.

use crate::symbol::Symbol;
use std::collections::{HashMap, HashSet};

/// Assigns every `Symbol` it is asked about a stable, unique C identifier:
/// the symbol's base name if free, else `base_1`, `base_2`, ... (spec
/// §4.6 "if the user-chosen name collides, the printer appends `_1, _2,
/// …`"). The same symbol always gets back the same name on repeated
/// lookups within one `NameTable`.
#[derive(Default)]
pub struct NameTable {
    used: HashSet<String>,
    assigned: HashMap<u64, String>,
}

impl NameTable {
    pub fn new() -> NameTable {
        NameTable::default()
    }

    /// Reserve a name up front (e.g. `ctxt`, a fixed parameter name) so no
    /// symbol is ever assigned it.
    pub fn reserve(&mut self, name: &str) {
        self.used.insert(name.to_string());
    }

    /// Look up the name already assigned to `sym` without assigning a new
    /// one, falling back to its sanitized base name if it has never been
    /// named in this table. Used by renderers that only ever run after the
    /// symbol's real name was assigned elsewhere (e.g. a loop iterator,
    /// named when its `For` is entered, read back from a nested window
    /// offset expression).
    pub fn peek(&self, sym: &Symbol) -> String {
        self.assigned.get(&sym.id()).cloned().unwrap_or_else(|| sanitize(sym.base()))
    }

    pub fn name(&mut self, sym: &Symbol) -> String {
        if let Some(existing) = self.assigned.get(&sym.id()) {
            return existing.clone();
        }
        let base = sanitize(sym.base());
        let chosen = if self.used.insert(base.clone()) {
            base
        } else {
            let mut n = 1;
            loop {
                let candidate = format!("{}_{}", base, n);
                if self.used.insert(candidate.clone()) {
                    break candidate;
                }
                n += 1;
            }
        };
        self.assigned.insert(sym.id(), chosen.clone());
        chosen
    }
}

/// Replace any character not valid in a C identifier with `_`, and prefix
/// a leading digit (user source names are otherwise free-form).
fn sanitize(base: &str) -> String {
    let mut out = String::with_capacity(base.len());
    for (i, c) in base.chars().enumerate() {
        if c.is_ascii_alphanumeric() || c == '_' {
            out.push(c);
        } else {
            out.push('_');
        }
        if i == 0 && out.chars().next().map(|c| c.is_ascii_digit()).unwrap_or(false) {
            out.insert(0, '_');
        }
    }
    if out.is_empty() {
        out.push('_');
    }
    out
}
