// Scheduling IR, rewrite engine, and C-family lowering for
// user-schedulable array kernels.
//
// Six cooperating components, leaves first (spec §2): `symbol`/`env`
// (fresh names, layered scopes), `types`/`expr`/`uast`/`stmt` (the two
// tree languages and their shared type vocabulary), `typecheck` (UAST ->
// TIR), `affine`/`range` (normalization and interval proofs), `cursor`
// (stable positional references and forwarding), `rewrite`/`schedule`
// (the §4.4 catalog behind a fluent facade), and `lower` (the §4.5
// compiler). `capability` is the host plug-in boundary the compiler
// delegates memory/extern codegen to; `config` holds the host-declared
// config values `ReadConfig`/`WriteConfig` address; `interp` is test-only
// tooling and is not compiled into non-test builds.

pub mod affine;
pub mod capability;
pub mod config;
pub mod cursor;
pub mod env;
pub mod error;
pub mod expr;
#[cfg(test)]
pub mod interp;
pub mod lower;
pub mod pattern;
pub mod printer;
pub mod range;
pub mod rewrite;
pub mod schedule;
pub mod stmt;
pub mod symbol;
pub mod typecheck;
pub mod types;
pub mod uast;
