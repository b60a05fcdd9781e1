// Affine normalization and simplification, spec §4.2.
//
// `normalize` rewrites an AExpr to a canonical sum-of-scaled-terms: a
// sorted Vec of (Symbol, coefficient) pairs (two kinds of leaf, AVar and
// ASize, are kept in separate canonical-key namespaces) plus an integer
// constant. `simplify` folds the identities named in §4.2 and then
// re-synthesizes an AExpr tree from the canonical form, so repeated
// application is idempotent (testable property 1).

use crate::expr::AExpr;
use crate::printer::print_aexpr;
use crate::symbol::Symbol;
use std::cmp::Ordering;
use std::collections::BTreeMap;

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug)]
enum TermKey {
    Var(String, u64),
    Size(String, u64),
}

impl TermKey {
    fn of(sym: &Symbol, is_size: bool) -> TermKey {
        if is_size {
            TermKey::Size(sym.base().to_string(), sym.id())
        } else {
            TermKey::Var(sym.base().to_string(), sym.id())
        }
    }
}

/// Key for a non-foldable `AScaleDiv` term that survives normalization: the
/// printed form of its (already-normalized) numerator, plus the divisor.
/// The printed form stands in for structural equality on `AExpr`, which has
/// no `Ord` impl of its own.
type DivKey = (String, i64);

/// Σ kᵢ·xᵢ + Σ dⱼ·(numeratorⱼ / kⱼ) + c, kept in sorted maps so two
/// structurally-equal sums compare equal regardless of original term order.
/// The `divs` term is what lets a floor-division that can't be folded into
/// a constant (any division with a symbolic dividend) survive normalization
/// as an opaque atom, instead of being silently dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct Canonical {
    terms: BTreeMap<TermKey, i64>,
    symbols: BTreeMap<TermKey, Symbol>,
    divs: BTreeMap<DivKey, (i64, AExpr)>,
    constant: i64,
}

impl Canonical {
    fn constant(c: i64) -> Canonical {
        Canonical { terms: BTreeMap::new(), symbols: BTreeMap::new(), divs: BTreeMap::new(), constant: c }
    }

    fn var(sym: Symbol, is_size: bool) -> Canonical {
        let key = TermKey::of(&sym, is_size);
        let mut terms = BTreeMap::new();
        let mut symbols = BTreeMap::new();
        terms.insert(key.clone(), 1);
        symbols.insert(key, sym);
        Canonical { terms, symbols, divs: BTreeMap::new(), constant: 0 }
    }

    /// A single opaque `numerator / divisor` term, coefficient 1: what a
    /// non-foldable `AScaleDiv` normalizes to.
    fn div_term(numerator: &Canonical, divisor: i64) -> Canonical {
        let numerator_expr = numerator.to_expr();
        let key = (print_aexpr(&numerator_expr), divisor);
        let mut divs = BTreeMap::new();
        divs.insert(key, (1, numerator_expr));
        Canonical { terms: BTreeMap::new(), symbols: BTreeMap::new(), divs, constant: 0 }
    }

    fn add(&self, other: &Canonical) -> Canonical {
        let mut terms = self.terms.clone();
        let mut symbols = self.symbols.clone();
        for (k, coeff) in &other.terms {
            let entry = terms.entry(k.clone()).or_insert(0);
            *entry += coeff;
            symbols.entry(k.clone()).or_insert_with(|| other.symbols[k].clone());
        }
        terms.retain(|_, c| *c != 0);

        let mut divs = self.divs.clone();
        for (k, (coeff, expr)) in &other.divs {
            let entry = divs.entry(k.clone()).or_insert_with(|| (0, expr.clone()));
            entry.0 += coeff;
        }
        divs.retain(|_, (c, _)| *c != 0);

        Canonical { terms, symbols, divs, constant: self.constant + other.constant }
    }

    fn negate(&self) -> Canonical {
        let terms = self.terms.iter().map(|(k, c)| (k.clone(), -c)).collect();
        let divs = self.divs.iter().map(|(k, (c, e))| (k.clone(), (-c, e.clone()))).collect();
        Canonical { terms, symbols: self.symbols.clone(), divs, constant: -self.constant }
    }

    fn scale(&self, k: i64) -> Canonical {
        if k == 0 {
            return Canonical::constant(0);
        }
        let terms = self.terms.iter().map(|(key, c)| (key.clone(), c * k)).collect();
        let divs = self.divs.iter().map(|(key, (c, e))| (key.clone(), (c * k, e.clone()))).collect();
        Canonical { terms, symbols: self.symbols.clone(), divs, constant: self.constant * k }
    }

    fn is_const(&self) -> bool {
        self.terms.is_empty() && self.divs.is_empty()
    }

    /// Re-synthesize a (simplified) AExpr tree in canonical key order.
    fn to_expr(&self) -> AExpr {
        let mut keys: Vec<&TermKey> = self.terms.keys().collect();
        keys.sort();
        let mut acc: Option<AExpr> = None;
        for key in keys {
            let coeff = self.terms[key];
            if coeff == 0 {
                continue;
            }
            let sym = self.symbols[key].clone();
            let leaf = match key {
                TermKey::Var(..) => AExpr::AVar(sym),
                TermKey::Size(..) => AExpr::ASize(sym),
            };
            let term = if coeff == 1 { leaf } else { AExpr::scale(coeff, leaf) };
            acc = Some(match acc {
                None => term,
                Some(prev) => AExpr::add(prev, term),
            });
        }
        // Rebuild each surviving division term as `coeff * (numerator / k)`
        // (or bare `numerator / k` when coeff is 1), in the same sorted-key
        // order the var/size terms above use.
        for (key, (coeff, numerator)) in &self.divs {
            if *coeff == 0 {
                continue;
            }
            let (_, divisor) = key;
            let division = AExpr::scale_div(numerator.clone(), *divisor);
            let term = if *coeff == 1 { division } else { AExpr::scale(*coeff, division) };
            acc = Some(match acc {
                None => term,
                Some(prev) => AExpr::add(prev, term),
            });
        }
        match (acc, self.constant) {
            (None, c) => AExpr::AConst(c),
            (Some(e), 0) => e,
            (Some(e), c) => AExpr::add(e, AExpr::AConst(c)),
        }
    }
}

/// Normalize an AExpr to its canonical sum-of-scaled-terms form.
pub fn normalize(e: &AExpr) -> Canonical {
    match e {
        AExpr::AVar(s) => Canonical::var(s.clone(), false),
        AExpr::ASize(s) => Canonical::var(s.clone(), true),
        AExpr::AConst(c) => Canonical::constant(*c),
        AExpr::AAdd(a, b) => normalize(a).add(&normalize(b)),
        AExpr::ASub(a, b) => normalize(a).add(&normalize(b).negate()),
        AExpr::AScale(k, a) => normalize(a).scale(*k),
        AExpr::AScaleDiv(a, k) => {
            let n = normalize(a);
            if n.is_const() && k != &0 && n.constant.rem_euclid(*k) == 0 {
                Canonical::constant(n.constant.div_euclid(*k))
            } else {
                // Not foldable into a single constant (true of any
                // symbolic dividend): keep the division as an opaque
                // `numerator / k` atom rather than discarding it, so
                // `normalize` never silently turns `N / 16` into `N`.
                Canonical::div_term(&n, *k)
            }
        }
    }
}

/// `simplify_cir`: fold `0+x=x`, `x-0=x`, `0*x=0`, `1*x=x`, `x/1=x`,
/// `-(-x)=x`, fuse constant USub, and canonicalize term order. Idempotent:
/// `simplify(simplify(e)) == simplify(e)`.
pub fn simplify(e: &AExpr) -> AExpr {
    match e {
        AExpr::AVar(_) | AExpr::ASize(_) | AExpr::AConst(_) => e.clone(),
        AExpr::AAdd(a, b) => {
            let (a, b) = (simplify(a), simplify(b));
            match (&a, &b) {
                (AExpr::AConst(0), _) => b,
                (_, AExpr::AConst(0)) => a,
                _ => normalize(&AExpr::add(a, b)).to_expr(),
            }
        }
        AExpr::ASub(a, b) => {
            let (a, b) = (simplify(a), simplify(b));
            match &b {
                AExpr::AConst(0) => a,
                _ => normalize(&AExpr::sub(a, b)).to_expr(),
            }
        }
        AExpr::AScale(k, a) => {
            let a = simplify(a);
            match k {
                0 => AExpr::AConst(0),
                1 => a,
                _ => normalize(&AExpr::scale(*k, a)).to_expr(),
            }
        }
        AExpr::AScaleDiv(a, k) => {
            let a = simplify(a);
            if *k == 1 {
                a
            } else {
                normalize(&AExpr::scale_div(a, *k)).to_expr()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simplify_is_idempotent() {
        let i = Symbol::fresh("i");
        let e = AExpr::add(
            AExpr::AConst(0),
            AExpr::sub(AExpr::scale(1, AExpr::AVar(i.clone())), AExpr::AConst(0)),
        );
        let once = simplify(&e);
        let twice = simplify(&once);
        assert_eq!(normalize(&once), normalize(&twice));
    }

    #[test]
    fn zero_times_x_folds_to_zero() {
        let i = Symbol::fresh("i");
        let e = AExpr::scale(0, AExpr::AVar(i));
        assert_eq!(simplify(&e), AExpr::AConst(0));
    }

    #[test]
    fn like_terms_combine_regardless_of_order() {
        let i = Symbol::fresh("i");
        let e1 = AExpr::add(AExpr::AVar(i.clone()), AExpr::AVar(i.clone()));
        let e2 = AExpr::scale(2, AExpr::AVar(i));
        assert_eq!(normalize(&e1), normalize(&e2));
    }

    #[test]
    fn non_foldable_division_survives_normalize_and_simplify() {
        // `N / 16` for a symbolic `N` can't fold into a constant; it must
        // not collapse to plain `N`, or a loop bound built from it (e.g.
        // `divide_loop`'s outer trip count) would silently corrupt.
        let n = Symbol::fresh("N");
        let e = AExpr::scale_div(AExpr::ASize(n.clone()), 16);
        assert!(!normalize(&e).is_const());
        assert_ne!(normalize(&e), normalize(&AExpr::ASize(n.clone())));
        assert_eq!(simplify(&e), AExpr::AScaleDiv(std::rc::Rc::new(AExpr::ASize(n)), 16));
    }

    #[test]
    fn scaled_non_foldable_division_keeps_its_divisor() {
        // `16 * (N / 16)`, the tail loop's lower bound in `divide_loop`,
        // must not simplify to `16 * N`.
        let n = Symbol::fresh("N");
        let e = AExpr::scale(16, AExpr::scale_div(AExpr::ASize(n.clone()), 16));
        let simplified = simplify(&e);
        assert_ne!(simplified, AExpr::scale(16, AExpr::ASize(n)));
        assert!(matches!(simplified, AExpr::AScale(16, _) | AExpr::AScaleDiv(..)));
    }
}
