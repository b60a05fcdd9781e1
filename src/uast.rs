// Untyped AST delivered by the (out-of-scope) front end, spec §3/§4.1.
// Names are plain strings here -- they only become `Symbol`s once `check`
// resolves them against an environment. Structurally this mirrors
// ast.rs's `Expr`/`Statement`/`Program` triad: a handful of closed ADTs
// with Rc-boxed recursive fields, string identifiers standing in for a
// not-yet-resolved `Symbol`.
//
// `Serialize`/`Deserialize` let the demo binary (`src/bin/exo.rs`) load a
// `UProc` from a JSON fixture -- the front end that would otherwise
// produce one is out of scope (spec §1), so this is the stand-in the
// decision to use `serde_json` for fixtures covers.

use serde::{Deserialize, Serialize};
use std::rc::Rc;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum UExpr {
    Read(String, Vec<UExpr>),
    ConstInt(i64),
    ConstFloat(f64),
    ConstBool(bool),
    BinOp(String, Rc<UExpr>, Rc<UExpr>),
    USub(Rc<UExpr>),
    StrideExpr(String, usize),
    ReadConfig(String, String),
    Extern(String, Vec<UExpr>),
    WindowExpr(String, Vec<USlice>),
    Select(Rc<UExpr>, Rc<UExpr>),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum USlice {
    Point(UExpr),
    Range(UExpr, UExpr),
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum LoopMode {
    Seq,
    Par,
    Device(DeviceMode),
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum DeviceMode {
    Block,
    Warp,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum UStmt {
    Pass,
    Assign(String, Vec<UExpr>, UExpr),
    Reduce(String, Vec<UExpr>, UExpr),
    Alloc(String, UTypeName, Option<String>),
    Free(String),
    If(UExpr, Vec<UStmt>, Vec<UStmt>),
    For(String, UExpr, UExpr, LoopMode, Vec<UStmt>),
    Call(String, Vec<UExpr>),
    WindowStmt(String, UExpr),
    WriteConfig(String, String, UExpr),
    SyncStmt(String),
    /// A with-statement marker wrapping a body in a typed context (async
    /// region, collective specialization, external codegen block); `tag`
    /// names which kind.
    With(String, Vec<UStmt>),
}

/// A not-yet-resolved type annotation as written by the user: either a
/// named scalar with a shape, or a window over a named source buffer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum UTypeName {
    Scalar(String),
    Tensor(String, Vec<UExpr>),
    Window(String, Vec<UExpr>, String, bool),
}

#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub enum UEffect {
    In,
    Out,
    InOut,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UArg {
    pub name: String,
    pub ty: UTypeName,
    pub mem: Option<String>,
    pub effect: UEffect,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UProc {
    pub name: String,
    pub args: Vec<UArg>,
    pub preconditions: Vec<UExpr>,
    pub body: Vec<UStmt>,
    pub instr: Option<String>,
    pub srcinfo: String,
}
