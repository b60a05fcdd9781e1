// Fresh-name policy: every symbol is stamped with a globally unique id at
// creation time and the id is never reused, even if the symbol is later
// dropped from the IR. See spec §4.6 and §5.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// A name plus a disambiguating id. Two symbols with the same `base` but
/// different `id`s print differently (`x`, `x.1`, `x.2`, ...) so that
/// renames and `stage_mem`/`stage_window` copies never collide.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Symbol {
    base: String,
    id: u64,
}

impl Symbol {
    /// Mint a brand new symbol from a human-readable base name.
    pub fn fresh(base: impl Into<String>) -> Symbol {
        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        Symbol { base: base.into(), id }
    }

    /// Derive a new symbol that shares `self`'s base but gets a new id.
    /// Used by rewrites that duplicate a binding (e.g. `stage_mem`).
    pub fn refresh(&self) -> Symbol {
        Symbol::fresh(self.base.clone())
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}${}", self.base, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_symbols_never_collide() {
        let a = Symbol::fresh("x");
        let b = Symbol::fresh("x");
        assert_ne!(a, b);
        assert_eq!(a.base(), b.base());
    }

    #[test]
    fn refresh_keeps_base_changes_id() {
        let a = Symbol::fresh("acc");
        let b = a.refresh();
        assert_eq!(a.base(), b.base());
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn display_includes_disambiguator() {
        let a = Symbol::fresh("i");
        let text = format!("{}", a);
        assert!(text.starts_with("i$"));
        assert_eq!(text, format!("i${}", a.id()));
    }
}
