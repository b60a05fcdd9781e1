// The lowering pass proper, spec §4.5: walks a fully-scheduled TIR
// procedure and produces C-family source text, delegating allocation and
// buffer access to the `Memory` capability and library calls to the
// `Extern`/instruction-macro machinery. Grounded on `vm.rs`'s `lower()`
// free function: "walk a typed tree, emit a different textual
// representation, accumulate auxiliary tables" is the same two-stage
// shape here, generalized from bytecode words to C statements and from a
// flat `Vec<Insn>` accumulator to the header/source split spec §6 calls
// for.

use crate::capability::{Extern, ExternRegistry, Memory};
use crate::config::ConfigRegistry;
use crate::error::LowerError;
use crate::expr::{AExpr, BinOp, CmpOp, Const, Pred, Slice, ValExpr};
use crate::lower::context;
use crate::lower::memory::MemoryRegistry;
use crate::lower::names::NameTable;
use crate::lower::parallel;
use crate::lower::precision::{self, PrecisionMap};
use crate::lower::window::{self, WindowCtor};
use crate::range::RangeEnv;
use crate::stmt::{DeviceMode, LoopMode, Proc, SrcInfo, Statement, WithTag};
use crate::symbol::Symbol;
use crate::types::{IndexClass, MemKind, Scalar, Type};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::rc::Rc;

/// The two C-family streams spec §6 "Compiled output" names: `S.h`
/// (prototypes, window structs, context struct) and `S.c` (definitions,
/// globals, `floor_div` helper).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompiledOutput {
    pub header: String,
    pub source: String,
}

/// Everything an emitted leaf procedure needs that isn't itself part of
/// the TIR: the host's memory/extern capability registries, its declared
/// configs, and the name the context struct should carry.
pub struct CompileUnit<'a> {
    pub stem: String,
    pub context_struct_name: String,
    pub memories: &'a MemoryRegistry<'a>,
    pub externs: &'a ExternRegistry<'a>,
    pub configs: &'a ConfigRegistry,
}

/// Compile every procedure in `procs` (spec §4.5 "Responsibility: emit
/// target source for a leaf procedure") into one `S.h`/`S.c` pair, running
/// the two analyses of spec §4.5 (parallel nesting, memory capability) on
/// each before emission and synthesizing one window struct per unique
/// (scalar, rank, constness) across the whole unit plus the shared
/// `floor_div` helper if any procedure needs it.
#[tracing::instrument(skip(procs, unit), fields(stem = %unit.stem, procs = procs.len()))]
pub fn compile<'a>(procs: &'a [Rc<Proc>], unit: &'a CompileUnit<'a>) -> Result<CompiledOutput, LowerError> {
    let mut window_structs: BTreeSet<(usize, Scalar, bool)> = BTreeSet::new();
    let mut globals: Vec<String> = Vec::new();
    let mut needs_floor_div = false;
    let mut prototypes = String::new();
    let mut definitions = String::new();

    for proc in procs {
        let _span = tracing::debug_span!("lower_proc", proc = %proc.name).entered();
        tracing::debug!("parallel nesting check");
        parallel::check_proc(proc)?;
        tracing::debug!("memory capability check");
        crate::lower::memory::check_proc(proc, unit.memories)?;

        let mut st = ProcEmitter::new(proc, unit);
        let def = st.emit()?;
        window_structs.extend(st.window_structs.iter().copied());
        globals.extend(st.globals.drain(..));
        needs_floor_div |= st.needs_floor_div;

        prototypes.push_str(&format!("{};\n", st.signature));
        definitions.push_str(&def);
        definitions.push('\n');
    }
    tracing::debug!(window_structs = window_structs.len(), needs_floor_div, "unit emitted");

    let mut header = format!("#ifndef {0}_H\n#define {0}_H\n\n", unit.stem.to_uppercase());
    header.push_str("#include <stdint.h>\n#include <stdbool.h>\n\n");
    for (rank, scalar, is_const) in &window_structs {
        header.push_str(&window_struct_typedef(*rank, *scalar, *is_const));
        header.push('\n');
    }
    header.push_str(&context::synthesize(&unit.context_struct_name, unit.configs));
    header.push('\n');
    header.push_str(&prototypes);
    header.push_str(&format!("\n#endif // {}_H\n", unit.stem.to_uppercase()));

    let mut source = format!("#include \"{}.h\"\n\n", unit.stem);
    globals.sort();
    globals.dedup();
    for g in &globals {
        source.push_str(g);
        source.push('\n');
    }
    if needs_floor_div {
        source.push_str(FLOOR_DIV_HELPER);
        source.push('\n');
    }
    source.push_str(&definitions);

    Ok(CompiledOutput { header, source })
}

const FLOOR_DIV_HELPER: &str = "static int32_t floor_div(int32_t n, int32_t q) {\n  int32_t off = (n >= 0) ? 0 : q - 1;\n  return (n - off) / q;\n}\n";

fn window_struct_typedef(rank: usize, scalar: Scalar, is_const: bool) -> String {
    let c = if is_const { "c" } else { "" };
    let name = format!("exo_win_{}{}{}", rank, scalar.tag(), c);
    let inner = if is_const { "const " } else { "" };
    format!(
        "#ifndef {name}_DEFINED\n#define {name}_DEFINED\nstruct {name} {{\n  {inner}{ty}* const data;\n  const int32_t strides[{rank}];\n}};\n#endif\n",
        name = name,
        inner = inner,
        ty = scalar.ctype(),
        rank = rank,
    )
}

/// Per-procedure emission state: the C-identifier table, the bounds
/// context accumulated as `For` loops are entered/exited, and the
/// accumulator tables the whole-unit `compile` merges across procedures.
struct ProcEmitter<'a> {
    proc: &'a Proc,
    unit: &'a CompileUnit<'a>,
    names: NameTable,
    range: RangeEnv,
    precision: PrecisionMap,
    sym_ty: HashMap<u64, Type>,
    sym_mem: HashMap<u64, MemKind>,
    /// Symbols bound by the procedure's own argument list. Argument
    /// tensors are always flat `T* restrict` pointers (C can't pass a
    /// runtime-shaped nested array across a call boundary), so they're
    /// indexed through manually declared stride locals; everything else
    /// (local `Alloc`s) gets the C array declaration `Memory::alloc`
    /// actually emits and is indexed with one bracket per axis instead.
    arg_syms: HashSet<u64>,
    /// C identifiers for the per-axis stride locals declared for each
    /// argument tensor, keyed by symbol id.
    stride_locals: HashMap<u64, Vec<String>>,
    written: Vec<Symbol>,
    window_structs: BTreeSet<(usize, Scalar, bool)>,
    globals: Vec<String>,
    needs_floor_div: bool,
    signature: String,
}

impl<'a> ProcEmitter<'a> {
    fn new(proc: &'a Proc, unit: &'a CompileUnit<'a>) -> ProcEmitter<'a> {
        let mut names = NameTable::new();
        names.reserve("ctxt");
        ProcEmitter {
            proc,
            unit,
            names,
            range: RangeEnv::new(),
            precision: PrecisionMap::infer(proc),
            sym_ty: sym_types(proc),
            sym_mem: sym_mems(proc),
            arg_syms: proc.args.iter().map(|a| a.sym.id()).collect(),
            stride_locals: HashMap::new(),
            written: proc.written_symbols(),
            window_structs: BTreeSet::new(),
            globals: Vec::new(),
            needs_floor_div: false,
            signature: String::new(),
        }
    }

    fn emit(&mut self) -> Result<String, LowerError> {
        let proc = self.proc;
        let mut params = vec![format!("{}* {}", self.unit.context_struct_name, "ctxt")];
        for arg in &proc.args {
            let name = self.names.name(&arg.sym);
            if let Type::Window(w) = &arg.ty {
                self.window_structs.insert((w.rank(), w.base, w.is_const));
            }
            let is_written = self.written.iter().any(|s| s == &arg.sym);
            params.push(self.param_decl(&arg.ty, &name, is_written));
        }
        self.signature = format!("void {}({})", proc.name, params.join(", "));

        let mut out = format!("{} {{\n", self.signature);
        for arg in &proc.args {
            if let Type::Tensor(t) = &arg.ty {
                for (n, v) in self.declare_tensor_strides(&arg.sym, &t.shape) {
                    indent(1, &mut out);
                    out.push_str(&format!("int32_t {} = {};\n", n, v));
                }
            }
        }
        self.emit_preconditions(&mut out, 1)?;
        let body = proc.body.clone();
        self.emit_block(&body, 1, &mut out)?;
        out.push_str("}\n");
        Ok(out)
    }

    fn param_decl(&self, ty: &Type, name: &str, is_written: bool) -> String {
        match ty {
            Type::Tensor(t) => {
                let c = if is_written { "" } else { "const " };
                format!("{}{}* restrict {}", c, t.base.ctype(), name)
            }
            Type::Window(w) => format!("struct {} {}", w.struct_name(), name),
            Type::Scalar(s) => format!("{} {}", s.ctype(), name),
            Type::Index(_) => format!("int32_t {}", name),
        }
    }

    /// Declare the per-axis stride locals for an argument tensor (once per
    /// symbol), returning the `(name, value_text)` pairs still needing a
    /// declaration statement. Local allocations never call this: they are
    /// indexed directly through the C array `Memory::alloc` declares.
    fn declare_tensor_strides(&mut self, sym: &Symbol, shape: &[AExpr]) -> Vec<(String, String)> {
        if self.stride_locals.contains_key(&sym.id()) {
            return Vec::new();
        }
        let name = self.names.name(sym);
        let stride_names = window::stride_names(&name, shape.len());
        let values = {
            let names_ref = &self.names;
            window::dense_stride_values_with(&|e| emit_aexpr_readonly(e, names_ref), shape)
        };
        self.stride_locals.insert(sym.id(), stride_names.clone());
        stride_names.into_iter().zip(values).collect()
    }

    /// Emit precondition predicates as compiler hints, spec §4.5
    /// "Precondition assumptions are emitted as compiler hints (`assume(expr)`
    /// macro)". Stride-equality preconditions would instead feed a
    /// known-strides table (spec §4.5); this implementation always reads
    /// strides from the declared locals/window struct and does not
    /// special-case stride-constant preconditions (documented simplification,
    /// see DESIGN.md).
    fn emit_preconditions(&mut self, out: &mut String, level: usize) -> Result<(), LowerError> {
        for p in self.proc.preconditions.clone() {
            let text = self.emit_pred(&p);
            indent(level, out);
            out.push_str(&format!("assume({});\n", text));
        }
        Ok(())
    }

    fn emit_block(&mut self, stmts: &[Statement], level: usize, out: &mut String) -> Result<(), LowerError> {
        for s in stmts {
            self.emit_stmt(s, level, out)?;
        }
        Ok(())
    }

    fn emit_stmt(&mut self, s: &Statement, level: usize, out: &mut String) -> Result<(), LowerError> {
        match s {
            Statement::Pass { .. } => {}
            Statement::Assign { sym, idx, rhs, srcinfo: _ } => {
                let lhs = self.emit_addr(sym, idx);
                let snippet = if let ValExpr::Read(src, src_idx) = rhs {
                    let src_addr = self.emit_addr(src, src_idx);
                    self.mem_for(src)?.read(s, &lhs, &src_addr)?
                } else {
                    let rhs_text = self.emit_val_cast(rhs, sym)?;
                    self.mem_for(sym)?.write(s, &lhs, &rhs_text)?
                };
                self.globals.extend(snippet.globals);
                indent(level, out);
                out.push_str(&snippet.text);
                out.push('\n');
            }
            Statement::Reduce { sym, idx, rhs, srcinfo: _ } => {
                let lhs = self.emit_addr(sym, idx);
                let rhs_text = self.emit_val_cast(rhs, sym)?;
                let snippet = self.mem_for(sym)?.reduce(s, &lhs, &rhs_text)?;
                self.globals.extend(snippet.globals);
                indent(level, out);
                out.push_str(&snippet.text);
                out.push('\n');
            }
            Statement::Alloc { sym, ty, mem, srcinfo } => {
                let name = self.names.name(sym);
                self.sym_ty.insert(sym.id(), ty.clone());
                self.sym_mem.insert(sym.id(), mem.clone());
                let capability = self.unit.memories.get(mem)?;
                let shape_strs: Vec<String> = match ty {
                    Type::Tensor(t) => t.shape.iter().map(|e| self.emit_aexpr(e)).collect(),
                    _ => Vec::new(),
                };
                let snippet = capability.alloc(&name, ty_scalar(ty), &shape_strs, srcinfo)?;
                self.globals.extend(snippet.globals);
                indent(level, out);
                out.push_str(&snippet.text);
                out.push('\n');
            }
            Statement::Free { sym, ty, mem, srcinfo } => {
                let name = self.names.name(sym);
                let capability = self.unit.memories.get(mem)?;
                let snippet = capability.free(&name, ty_scalar(ty), &[], srcinfo)?;
                self.globals.extend(snippet.globals);
                if !snippet.text.is_empty() {
                    indent(level, out);
                    out.push_str(&snippet.text);
                    out.push('\n');
                }
            }
            Statement::If { cond, body, orelse, .. } => {
                let cond_text = self.emit_pred(cond);
                indent(level, out);
                out.push_str(&format!("if ({}) {{\n", cond_text));
                self.emit_block(body, level + 1, out)?;
                indent(level, out);
                if orelse.is_empty() {
                    out.push_str("}\n");
                } else {
                    out.push_str("} else {\n");
                    self.emit_block(orelse, level + 1, out)?;
                    indent(level, out);
                    out.push_str("}\n");
                }
            }
            Statement::For { iter, lo, hi, mode, body, .. } => {
                let lo_text = self.emit_aexpr(lo);
                let hi_text = self.emit_aexpr(hi);
                let name = self.names.name(iter);
                let token = self.range.push_loop(iter, lo, hi);
                match mode {
                    LoopMode::Par => {
                        indent(level, out);
                        out.push_str("#pragma omp parallel for\n");
                    }
                    LoopMode::Device(DeviceMode::Block) => {
                        indent(level, out);
                        out.push_str("/* device block loop */\n");
                    }
                    LoopMode::Device(DeviceMode::Warp) => {
                        indent(level, out);
                        out.push_str("/* device warp loop */\n");
                    }
                    LoopMode::Seq => {}
                }
                indent(level, out);
                out.push_str(&format!("for (int32_t {i} = {lo}; {i} < {hi}; {i}++) {{\n", i = name, lo = lo_text, hi = hi_text));
                self.emit_block(body, level + 1, out)?;
                self.range.pop_loop(token);
                indent(level, out);
                out.push_str("}\n");
            }
            Statement::Call { callee, args, srcinfo: _ } => {
                let line = self.emit_call(callee, args)?;
                indent(level, out);
                out.push_str(&line);
                out.push('\n');
            }
            Statement::WindowStmt { name, expr, .. } => {
                let (src, slices) = expr;
                let is_const = !self.written.iter().any(|s| s == name);
                let local_name = self.names.name(name);
                let rank = slices.iter().filter(|s| matches!(s, Slice::Range(..))).count();
                let ctor = self.window_ctor(src, slices, is_const);
                let base_strides = self.base_strides(src);
                let data_expr = self.window_data_expr(src, slices, &base_strides)?;
                let scalar = tensor_or_window_base(self.sym_type(src));
                self.window_structs.insert((rank, scalar, is_const));
                self.sym_ty.insert(
                    name.id(),
                    Type::Window(crate::types::Window {
                        base: scalar,
                        shape: slices
                            .iter()
                            .filter_map(|sl| match sl {
                                Slice::Range(lo, hi) => Some(AExpr::sub(hi.clone(), lo.clone())),
                                Slice::Point(_) => None,
                            })
                            .collect(),
                        source: src.clone(),
                        is_const,
                    }),
                );
                indent(level, out);
                out.push_str(&format!(
                    "struct {} {} = (struct {}){{ .data = {}, .strides = {{ {} }} }};\n",
                    ctor.struct_name,
                    local_name,
                    ctor.struct_name,
                    data_expr,
                    ctor.strides.join(", "),
                ));
            }
            Statement::WriteConfig { cfg, field, rhs, .. } => {
                self.unit.configs.check_write(cfg.base(), field)?;
                let rhs_text = self.emit_val(rhs)?;
                indent(level, out);
                out.push_str(&format!("{} = {};\n", context::field_lvalue(cfg.base(), field), rhs_text));
            }
            Statement::Sync { codegen, .. } => {
                indent(level, out);
                out.push_str(codegen);
                out.push('\n');
            }
            Statement::With { tag, body, .. } => {
                indent(level, out);
                match tag {
                    WithTag::Async => out.push_str("/* async region */\n"),
                    WithTag::CollectiveSpecialize => out.push_str("/* collective specialization */\n"),
                    WithTag::ExternCodegen(raw) => {
                        out.push_str(raw);
                        out.push('\n');
                    }
                }
                self.emit_block(body, level, out)?;
            }
        }
        Ok(())
    }

    fn emit_call(&mut self, callee: &Rc<Proc>, args: &[ValExpr]) -> Result<String, LowerError> {
        if let Some(instr) = &callee.instr {
            let mut text = instr.template.clone();
            for (i, (formal, actual)) in callee.args.iter().zip(args.iter()).enumerate() {
                let (data_sub, int_sub, bare_sub) = self.instr_substitution(formal, actual)?;
                if let Some(d) = data_sub {
                    text = text.replace(&format!("{{{}}}_data", i), &d);
                }
                if let Some(n) = int_sub {
                    text = text.replace(&format!("{{{}}}_int", i), &n);
                }
                text = text.replace(&format!("{{{}}}", i), &bare_sub);
            }
            return Ok(text);
        }
        let mut rendered = vec!["ctxt".to_string()];
        for (formal, actual) in callee.args.iter().zip(args.iter()) {
            rendered.push(self.call_arg(formal, actual)?);
        }
        Ok(format!("{}({});", callee.name, rendered.join(", ")))
    }

    fn call_arg(&mut self, _formal: &crate::stmt::Arg, actual: &ValExpr) -> Result<String, LowerError> {
        self.emit_val(actual)
    }

    fn instr_substitution(&mut self, formal: &crate::stmt::Arg, actual: &ValExpr) -> Result<(Option<String>, Option<String>, String), LowerError> {
        let ValExpr::Read(sym, idx) = actual else {
            return Ok((None, None, self.emit_val(actual)?));
        };
        if !idx.is_empty() {
            return Ok((None, None, self.emit_val(actual)?));
        }
        let name = self.names.name(sym);
        Ok(match &formal.ty {
            Type::Tensor(_) => (None, None, format!("&{}", name)),
            Type::Window(_) => (Some(format!("{}.data", name)), Some(name.clone()), name),
            _ => (None, None, name),
        })
    }

    fn sym_type(&self, sym: &Symbol) -> &Type {
        self.sym_ty.get(&sym.id()).expect("buffer symbol missing from type table")
    }

    /// The struct shape (rank, struct name, per-axis strides of the
    /// *retained* axes) for a window sliced from `src`. The `.data`
    /// pointer itself is computed separately by `window_data_expr`, which
    /// defers to the `Memory` capability.
    fn window_ctor(&mut self, src: &Symbol, slices: &[Slice], is_const: bool) -> WindowCtor {
        let base_strides = self.base_strides(src);
        let scalar = tensor_or_window_base(self.sym_type(src));
        let names_ref = &self.names;
        window::build_with(&|e| emit_aexpr_readonly(e, names_ref), scalar, is_const, &base_strides, slices)
    }

    /// The `.data` initializer for a window view, delegating to the
    /// source buffer's `Memory` capability (spec §6 "`Memory::window`: a
    /// dataptr expression for a window view") rather than hardcoding
    /// pointer arithmetic here, so a host's non-default memory kind gets a
    /// say in how a view into it is addressed.
    fn window_data_expr(&mut self, src: &Symbol, slices: &[Slice], base_strides: &[String]) -> Result<String, LowerError> {
        let base_addr = self.base_data_expr(src);
        let basetype = tensor_or_window_base(self.sym_type(src));
        let offsets: Vec<String> = {
            let names_ref = &self.names;
            slices
                .iter()
                .map(|sl| match sl {
                    Slice::Point(i) => emit_aexpr_readonly(i, names_ref),
                    Slice::Range(lo, _) => emit_aexpr_readonly(lo, names_ref),
                })
                .collect()
        };
        let snippet = self.mem_for(src)?.window(basetype, &base_addr, &offsets, base_strides, &SrcInfo::UNKNOWN)?;
        self.globals.extend(snippet.globals);
        Ok(snippet.text)
    }

    /// Per-axis strides for `sym`: the declared stride locals for an
    /// argument tensor, the analytically dense strides for a locally
    /// allocated tensor (never materialized as C variables, since it's
    /// indexed with native nested brackets instead), or the struct's own
    /// `.strides[i]` fields for a window.
    fn base_strides(&self, sym: &Symbol) -> Vec<String> {
        if let Some(strides) = self.stride_locals.get(&sym.id()) {
            return strides.clone();
        }
        match self.sym_type(sym) {
            Type::Window(w) => {
                let name = self.names.peek(sym);
                (0..w.rank()).map(|i| format!("{}.strides[{}]", name, i)).collect()
            }
            Type::Tensor(t) => window::dense_stride_values_with(&|e| emit_aexpr_readonly(e, &self.names), &t.shape),
            _ => Vec::new(),
        }
    }

    fn base_data_expr(&mut self, sym: &Symbol) -> String {
        let name = self.names.name(sym);
        match self.sym_type(sym) {
            Type::Window(_) => format!("{}.data", name),
            _ => name,
        }
    }

    fn mem_for(&self, sym: &Symbol) -> Result<&'a dyn Memory, LowerError> {
        let kind = self.sym_mem.get(&sym.id()).cloned().unwrap_or_else(MemKind::dram);
        Ok(self.unit.memories.get(&kind)?)
    }

    /// The full address/value text for `sym[idx]`: native nested-bracket
    /// indexing for a locally allocated tensor (matching the C array
    /// `Memory::alloc` declared for it), flat stride arithmetic for an
    /// argument tensor (always a flat pointer across the call boundary),
    /// `.data[...]` plus struct-field strides for a window, or the bare
    /// symbol for a scalar/non-indexed use.
    fn emit_addr(&mut self, sym: &Symbol, idx: &[AExpr]) -> String {
        let name = self.names.name(sym);
        if idx.is_empty() {
            return name;
        }
        match self.sym_ty.get(&sym.id()) {
            Some(Type::Window(_)) => {
                let strides = self.base_strides(sym);
                let offset = self.offset_text(idx, &strides);
                format!("{}.data[{}]", name, offset)
            }
            Some(Type::Tensor(_)) if !self.arg_syms.contains(&sym.id()) => {
                let brackets: String = idx.iter().map(|e| format!("[{}]", self.emit_aexpr(e))).collect();
                format!("{}{}", name, brackets)
            }
            _ => {
                let strides = self.stride_locals.get(&sym.id()).cloned().unwrap_or_default();
                let offset = self.offset_text(idx, &strides);
                format!("{}[{}]", name, offset)
            }
        }
    }

    fn offset_text(&mut self, idx: &[AExpr], strides: &[String]) -> String {
        if idx.is_empty() {
            return "0".to_string();
        }
        let one = "1".to_string();
        let terms: Vec<String> = idx
            .iter()
            .zip(strides.iter().chain(std::iter::repeat(&one)))
            .map(|(e, s)| format!("{}*{}", self.emit_aexpr(e), s))
            .collect();
        terms.join(" + ")
    }

    fn emit_val_cast(&mut self, e: &ValExpr, target: &Symbol) -> Result<String, LowerError> {
        let text = self.emit_val(e)?;
        let to = self.precision.resolve(target.id());
        let from = infer_precision(e, &self.precision);
        Ok(match (from, to) {
            (Some(f), Some(t)) => precision::cast_to(&text, f, t),
            _ => text,
        })
    }

    fn emit_val(&mut self, e: &ValExpr) -> Result<String, LowerError> {
        Ok(match e {
            ValExpr::Read(sym, idx) => self.emit_addr(sym, idx),
            ValExpr::Const(c) => emit_const(*c),
            ValExpr::BinOp(op, a, b) => {
                let a = self.emit_val(a)?;
                let b = self.emit_val(b)?;
                format!("({} {} {})", a, binop_text(*op), b)
            }
            ValExpr::USub(a) => format!("(-{})", self.emit_val(a)?),
            ValExpr::StrideExpr(sym, dim) => {
                let strides = self.base_strides(sym);
                strides.get(*dim).cloned().unwrap_or_else(|| "1".to_string())
            }
            ValExpr::ReadConfig(cfg, field) => {
                self.unit.configs.check_read(cfg.base(), field)?;
                context::field_lvalue(cfg.base(), field)
            }
            ValExpr::Extern(f, args) => {
                let mut rendered = Vec::with_capacity(args.len());
                for a in args {
                    rendered.push(self.emit_val(a)?);
                }
                let ctype = args.first().and_then(|a| infer_precision(a, &self.precision)).unwrap_or(Scalar::F32);
                let ext = self.unit.externs.get(f.base())?;
                ext.compile(&rendered, ctype)
            }
            ValExpr::WindowExpr(sym, slices) => {
                let is_const = true;
                let rank = slices.iter().filter(|s| matches!(s, Slice::Range(..))).count();
                let ctor = self.window_ctor(sym, slices, is_const);
                let base_strides = self.base_strides(sym);
                let data_expr = self.window_data_expr(sym, slices, &base_strides)?;
                let scalar = tensor_or_window_base(self.sym_type(sym));
                self.window_structs.insert((rank, scalar, is_const));
                format!(
                    "(struct {}){{ .data = {}, .strides = {{ {} }} }}",
                    ctor.struct_name,
                    data_expr,
                    ctor.strides.join(", "),
                )
            }
            ValExpr::Select(p, e) => format!("({} ? {} : 0)", self.emit_pred(p), self.emit_val(e)?),
        })
    }

    fn emit_pred(&mut self, p: &Pred) -> String {
        match p {
            Pred::BConst(b) => b.to_string(),
            Pred::And(a, b) => format!("({} && {})", self.emit_pred(a), self.emit_pred(b)),
            Pred::Or(a, b) => format!("({} || {})", self.emit_pred(a), self.emit_pred(b)),
            Pred::Cmp(op, a, b) => format!("({} {} {})", self.emit_aexpr(a), cmp_text(*op), self.emit_aexpr(b)),
        }
    }

    /// Floor-division-aware index arithmetic, spec §4.2/§4.5: native `/`
    /// when the range environment proves the dividend non-negative and the
    /// divisor positive, else the shared `floor_div` helper.
    fn emit_aexpr(&mut self, e: &AExpr) -> String {
        match e {
            AExpr::AVar(s) => self.names.name(s),
            AExpr::ASize(s) => self.names.name(s),
            AExpr::AConst(c) => c.to_string(),
            AExpr::AAdd(a, b) => format!("({} + {})", self.emit_aexpr(a), self.emit_aexpr(b)),
            AExpr::ASub(a, b) => format!("({} - {})", self.emit_aexpr(a), self.emit_aexpr(b)),
            AExpr::AScale(k, a) => format!("({} * {})", k, self.emit_aexpr(a)),
            AExpr::AScaleDiv(a, k) => {
                let inner = self.emit_aexpr(a);
                if *k > 0 && self.range.non_negative(a) {
                    format!("({} / {})", inner, k)
                } else {
                    self.needs_floor_div = true;
                    format!("floor_div({}, {})", inner, k)
                }
            }
        }
    }
}

/// Pure affine printer for contexts where every referenced symbol was
/// already named earlier (a loop iterator on entry, a proc argument
/// during signature building): shape/stride text, and slice offsets
/// inside an already-nested statement. Never assigns a new name, so it
/// can be called from behind an immutable `&NameTable` closure.
fn emit_aexpr_readonly(e: &AExpr, names: &NameTable) -> String {
    match e {
        AExpr::AVar(s) => names.peek(s),
        AExpr::ASize(s) => names.peek(s),
        AExpr::AConst(c) => c.to_string(),
        AExpr::AAdd(a, b) => format!("({} + {})", emit_aexpr_readonly(a, names), emit_aexpr_readonly(b, names)),
        AExpr::ASub(a, b) => format!("({} - {})", emit_aexpr_readonly(a, names), emit_aexpr_readonly(b, names)),
        AExpr::AScale(k, a) => format!("({} * {})", k, emit_aexpr_readonly(a, names)),
        AExpr::AScaleDiv(a, k) => format!("({} / {})", emit_aexpr_readonly(a, names), k),
    }
}

/// Infer the "natural" scalar precision of a value expression from the
/// declared precision of the symbols it reads, for cast insertion (spec
/// §4.5 "Precision lowering"). `None` means ambiguous/no declared
/// precision (a bare constant, a mismatched binop), in which case
/// `emit_val_cast` leaves the text uncast.
fn infer_precision(e: &ValExpr, pm: &PrecisionMap) -> Option<Scalar> {
    match e {
        ValExpr::Read(sym, _) => pm.resolve(sym.id()),
        ValExpr::Const(_) => None,
        ValExpr::BinOp(_, a, b) => {
            let a = infer_precision(a, pm);
            let b = infer_precision(b, pm);
            if a == b {
                a
            } else {
                None
            }
        }
        ValExpr::USub(a) => infer_precision(a, pm),
        ValExpr::StrideExpr(..) => Some(Scalar::I32),
        ValExpr::ReadConfig(..) => None,
        ValExpr::Extern(_, args) => args.first().and_then(|a| infer_precision(a, pm)),
        ValExpr::WindowExpr(..) => None,
        ValExpr::Select(_, v) => infer_precision(v, pm),
    }
}

fn emit_const(c: Const) -> String {
    match c {
        Const::Bool(b) => b.to_string(),
        Const::Int(i) => i.to_string(),
        Const::Float(f) => format!("{:?}", f),
    }
}

fn binop_text(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mul => "*",
        BinOp::Div => "/",
        BinOp::Mod => "%",
        BinOp::And => "&&",
        BinOp::Or => "||",
        BinOp::Lt => "<",
        BinOp::Gt => ">",
        BinOp::Le => "<=",
        BinOp::Ge => ">=",
        BinOp::Eq => "==",
    }
}

fn cmp_text(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Lt => "<",
        CmpOp::Gt => ">",
        CmpOp::Le => "<=",
        CmpOp::Ge => ">=",
        CmpOp::Eq => "==",
    }
}

fn indent(level: usize, out: &mut String) {
    for _ in 0..level {
        out.push_str("  ");
    }
}

fn ty_scalar(ty: &Type) -> Scalar {
    match ty {
        Type::Tensor(t) => t.base,
        Type::Window(w) => w.base,
        Type::Scalar(s) => *s,
        Type::Index(IndexClass::Bool) => Scalar::Bool,
        Type::Index(_) => Scalar::I32,
    }
}

fn tensor_or_window_base(ty: &Type) -> Scalar {
    ty_scalar(ty)
}

fn sym_types(proc: &Proc) -> HashMap<u64, Type> {
    let mut map = HashMap::new();
    for arg in &proc.args {
        map.insert(arg.sym.id(), arg.ty.clone());
    }
    fn walk(stmts: &[Statement], map: &mut HashMap<u64, Type>) {
        for s in stmts {
            match s {
                Statement::Alloc { sym, ty, .. } => {
                    map.insert(sym.id(), ty.clone());
                }
                Statement::If { body, orelse, .. } => {
                    walk(body, map);
                    walk(orelse, map);
                }
                Statement::For { body, .. } | Statement::With { body, .. } => walk(body, map),
                _ => {}
            }
        }
    }
    walk(&proc.body, &mut map);
    map
}

fn sym_mems(proc: &Proc) -> HashMap<u64, MemKind> {
    let mut map = HashMap::new();
    for arg in &proc.args {
        map.insert(arg.sym.id(), arg.mem.clone());
    }
    fn walk(stmts: &[Statement], map: &mut HashMap<u64, MemKind>) {
        for s in stmts {
            match s {
                Statement::Alloc { sym, mem, .. } => {
                    map.insert(sym.id(), mem.clone());
                }
                Statement::If { body, orelse, .. } => {
                    walk(body, map);
                    walk(orelse, map);
                }
                Statement::For { body, .. } | Statement::With { body, .. } => walk(body, map),
                _ => {}
            }
        }
    }
    walk(&proc.body, &mut map);
    map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::DramMemory;
    use crate::expr::{AExpr, Const};
    use crate::stmt::{Arg, Node, SrcInfo};
    use crate::types::{Effect, Scalar as Sc, Tensor};

    fn memories() -> MemoryRegistry<'static> {
        static DRAM: DramMemory = DramMemory;
        MemoryRegistry::new().with(&DRAM)
    }

    fn unit<'a>(memories: &'a MemoryRegistry<'a>, externs: &'a ExternRegistry<'a>, configs: &'a ConfigRegistry) -> CompileUnit<'a> {
        CompileUnit {
            stem: "kernels".to_string(),
            context_struct_name: "exo_context".to_string(),
            memories,
            externs,
            configs,
        }
    }

    fn acc_proc() -> Rc<Proc> {
        let n = Symbol::fresh("N");
        let a = Symbol::fresh("A");
        let r = Symbol::fresh("r");
        let i = Symbol::fresh("i");
        let body = vec![
            Statement::Assign { sym: r.clone(), idx: vec![], rhs: ValExpr::Const(Const::Float(0.0)), srcinfo: SrcInfo::UNKNOWN },
            Statement::For {
                iter: i.clone(),
                lo: AExpr::AConst(0),
                hi: AExpr::ASize(n.clone()),
                mode: LoopMode::Seq,
                body: Node::new(vec![Statement::Reduce {
                    sym: r.clone(),
                    idx: vec![],
                    rhs: ValExpr::Read(a.clone(), vec![AExpr::AVar(i)]),
                    srcinfo: SrcInfo::UNKNOWN,
                }]),
                srcinfo: SrcInfo::UNKNOWN,
            },
        ];
        Rc::new(Proc {
            name: "acc".to_string(),
            args: vec![
                Arg { sym: n.clone(), ty: Type::Index(IndexClass::Size), mem: MemKind::dram(), effect: Effect::In },
                Arg {
                    sym: a,
                    ty: Type::Tensor(Tensor { base: Sc::F32, shape: vec![AExpr::ASize(n)], mem: MemKind::dram() }),
                    mem: MemKind::dram(),
                    effect: Effect::In,
                },
                Arg { sym: r, ty: Type::Scalar(Sc::F32), mem: MemKind::dram(), effect: Effect::Out },
            ],
            preconditions: vec![],
            body: Node::new(body),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        })
    }

    #[test]
    fn emits_public_signature_with_ctxt_first() {
        let memories = memories();
        let externs = ExternRegistry::new();
        let configs = ConfigRegistry::new();
        let u = unit(&memories, &externs, &configs);
        let procs = [acc_proc()];
        let out = compile(&procs, &u).unwrap();
        assert!(out.header.contains("void acc(exo_context* ctxt"));
    }

    #[test]
    fn emits_for_loop_and_reduce() {
        let memories = memories();
        let externs = ExternRegistry::new();
        let configs = ConfigRegistry::new();
        let u = unit(&memories, &externs, &configs);
        let procs = [acc_proc()];
        let out = compile(&procs, &u).unwrap();
        assert!(out.source.contains("for (int32_t"));
        assert!(out.source.contains("+="));
    }

    #[test]
    fn locally_allocated_tensor_uses_nested_bracket_indexing() {
        let memories = memories();
        let externs = ExternRegistry::new();
        let configs = ConfigRegistry::new();
        let u = unit(&memories, &externs, &configs);
        let tmp = Symbol::fresh("tmp");
        let i = Symbol::fresh("i");
        let j = Symbol::fresh("j");
        let proc = Rc::new(Proc {
            name: "scratch".to_string(),
            args: vec![],
            preconditions: vec![],
            body: Node::new(vec![
                Statement::Alloc {
                    sym: tmp.clone(),
                    ty: Type::Tensor(Tensor { base: Sc::F32, shape: vec![AExpr::AConst(4), AExpr::AConst(4)], mem: MemKind::dram() }),
                    mem: MemKind::dram(),
                    srcinfo: SrcInfo::UNKNOWN,
                },
                Statement::Assign {
                    sym: tmp,
                    idx: vec![AExpr::AVar(i), AExpr::AVar(j)],
                    rhs: ValExpr::Const(Const::Float(1.0)),
                    srcinfo: SrcInfo::UNKNOWN,
                },
            ]),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        });
        let _ = (i, j);
        let procs = [proc];
        let out = compile(&procs, &u).unwrap();
        assert!(out.source.contains("float tmp[4][4];"));
        assert!(out.source.contains("tmp[") && out.source.contains("][") && out.source.contains("] = 1.0"));
    }

    #[test]
    fn scenario_s4_proven_nonnegative_index_uses_native_division() {
        let memories = memories();
        let externs = ExternRegistry::new();
        let configs = ConfigRegistry::new();
        let u = unit(&memories, &externs, &configs);
        let n = Symbol::fresh("N");
        let a = Symbol::fresh("A");
        let i = Symbol::fresh("i");
        let proc = Rc::new(Proc {
            name: "halves".to_string(),
            args: vec![
                Arg { sym: n.clone(), ty: Type::Index(IndexClass::Size), mem: MemKind::dram(), effect: Effect::In },
                Arg {
                    sym: a.clone(),
                    ty: Type::Tensor(Tensor { base: Sc::F32, shape: vec![AExpr::ASize(n.clone())], mem: MemKind::dram() }),
                    mem: MemKind::dram(),
                    effect: Effect::Out,
                },
            ],
            preconditions: vec![],
            body: Node::new(vec![Statement::For {
                iter: i.clone(),
                lo: AExpr::AConst(0),
                hi: AExpr::ASize(n),
                mode: LoopMode::Seq,
                body: Node::new(vec![Statement::Assign {
                    sym: a,
                    idx: vec![AExpr::scale_div(AExpr::AVar(i), 8)],
                    rhs: ValExpr::Const(Const::Float(0.0)),
                    srcinfo: SrcInfo::UNKNOWN,
                }]),
                srcinfo: SrcInfo::UNKNOWN,
            }]),
            instr: None,
            srcinfo: SrcInfo::UNKNOWN,
        });
        let procs = [proc];
        let out = compile(&procs, &u).unwrap();
        assert!(!out.source.contains("floor_div"));
    }
}
