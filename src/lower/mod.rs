// The lowering pipeline, spec §4.5: a fixed sequence of passes turning a
// scheduled `Proc` into target-language source. Each pass is its own
// module and can be run/tested independently; `emit` is the pass that
// actually produces C text and is the only one `compile` calls directly
// (the others are invoked from inside `emit::compile` or from a pass that
// needs their result, mirroring `rewrite/mod.rs`'s one-module-per-concern
// layout with a thin parent `mod.rs` gluing the catalog together).

pub mod context;
pub mod emit;
pub mod memory;
pub mod names;
pub mod parallel;
pub mod precision;
pub mod window;
