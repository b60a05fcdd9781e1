// Window analysis, spec §4.5 pass (iii): resolves window subtyping
// (const/non-const) and computes the per-call window constructor data used
// by `emit` to build a `struct exo_win_<rank><type>[c]` literal, per
// scenario S5.

use crate::expr::{AExpr, Slice};
use crate::printer::print_aexpr;
use crate::types::Scalar;

/// The named stride a dense tensor argument `base` exposes on axis `axis`,
/// e.g. `sA0` for tensor `A`'s outermost axis. Declared once per tensor
/// argument by `emit`, then read by every window constructed from it.
pub fn stride_name(base: &str, axis: usize) -> String {
    format!("s{}{}", base, axis)
}

pub fn stride_names(base: &str, rank: usize) -> Vec<String> {
    (0..rank).map(|i| stride_name(base, i)).collect()
}

/// Suffix-product stride values for a dense row-major shape (innermost
/// axis has stride 1), as printed text rather than evaluated integers since
/// shape dimensions may be symbolic sizes.
pub fn dense_stride_values(shape: &[AExpr]) -> Vec<String> {
    dense_stride_values_with(&print_aexpr, shape)
}

/// As [`dense_stride_values`], rendering each dimension through `fmt`.
pub fn dense_stride_values_with(fmt: &dyn Fn(&AExpr) -> String, shape: &[AExpr]) -> Vec<String> {
    let mut out = vec![String::new(); shape.len()];
    let mut acc = "1".to_string();
    for i in (0..shape.len()).rev() {
        out[i] = acc.clone();
        if i > 0 {
            let dim = fmt(&shape[i]);
            acc = if acc == "1" { dim } else { format!("{}*{}", dim, acc) };
        }
    }
    out
}

/// The constructor data for one call-site window literal: which struct to
/// build, the flattened base-pointer offset, and the strides of the axes
/// the slice preserves (range axes only; point axes drop their axis from
/// the resulting window's rank and do not contribute a stride).
#[derive(Clone, Debug, PartialEq)]
pub struct WindowCtor {
    pub struct_name: String,
    pub offset: String,
    pub strides: Vec<String>,
}

/// Build the constructor data for slicing `base_strides` (the full-rank
/// strides of the tensor or window being sliced) by `slices`, rendering
/// offset sub-expressions with the IR pretty-printer. Suitable for tests
/// and diagnostics; `lower::emit` uses [`build_with`] instead so offset
/// text comes out as valid C identifiers rather than `print_aexpr`'s
/// `base$id` debug form.
pub fn build(scalar: Scalar, is_const: bool, base_strides: &[String], slices: &[Slice]) -> WindowCtor {
    build_with(&print_aexpr, scalar, is_const, base_strides, slices)
}

/// As [`build`], but rendering each offset sub-expression through `fmt`
/// instead of the IR pretty-printer.
pub fn build_with(
    fmt: &dyn Fn(&AExpr) -> String,
    scalar: Scalar,
    is_const: bool,
    base_strides: &[String],
    slices: &[Slice],
) -> WindowCtor {
    let rank = slices.iter().filter(|s| matches!(s, Slice::Range(..))).count();
    let c = if is_const { "c" } else { "" };
    let struct_name = format!("exo_win_{}{}{}", rank, scalar.tag(), c);

    let mut offset_terms = Vec::new();
    let mut strides = Vec::new();
    for (slice, stride) in slices.iter().zip(base_strides.iter()) {
        match slice {
            Slice::Point(e) => offset_terms.push(format!("{}*{}", fmt(e), stride)),
            Slice::Range(lo, _hi) => {
                offset_terms.push(format!("{}*{}", fmt(lo), stride));
                strides.push(stride.clone());
            }
        }
    }
    let offset = if offset_terms.is_empty() { "0".to_string() } else { offset_terms.join(" + ") };
    WindowCtor { struct_name, offset, strides }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Symbol;

    #[test]
    fn stride_names_follow_s_base_axis_convention() {
        assert_eq!(stride_names("A", 2), vec!["sA0".to_string(), "sA1".to_string()]);
    }

    #[test]
    fn window_ctor_matches_range_range_slice_scenario() {
        let m = Symbol::fresh("M");
        let shape = vec![AExpr::ASize(m.clone()), AExpr::ASize(Symbol::fresh("N"))];
        let strides = stride_names("A", shape.len());
        let slices = vec![
            Slice::Range(AExpr::AConst(0), AExpr::ASize(m)),
            Slice::Range(AExpr::AConst(4), AExpr::add(AExpr::AConst(4), AExpr::AConst(16))),
        ];
        let ctor = build(Scalar::F32, false, &strides, &slices);
        assert_eq!(ctor.struct_name, "exo_win_2f32");
        assert_eq!(ctor.offset, "0*sA0 + 4*sA1");
        assert_eq!(ctor.strides, vec!["sA0".to_string(), "sA1".to_string()]);
    }

    #[test]
    fn point_slice_drops_axis_from_preserved_strides() {
        let strides = stride_names("A", 2);
        let slices = vec![Slice::Point(AExpr::AConst(2)), Slice::Range(AExpr::AConst(0), AExpr::AConst(8))];
        let ctor = build(Scalar::F32, true, &strides, &slices);
        assert_eq!(ctor.struct_name, "exo_win_1f32c");
        assert_eq!(ctor.strides, vec!["sA1".to_string()]);
    }
}
