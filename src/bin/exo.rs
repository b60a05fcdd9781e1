// Demo CLI for the scheduling/lowering pipeline. Not part of the public
// crate API -- a thin driver that loads a `UProc` from a JSON fixture
// (the front end that would otherwise produce one is out of scope, spec
// §1) and runs it through `typecheck::check`/`lower::emit::compile`.
// Grounded on the `main.rs`/`bin/preview.rs` split: a `clap`-derived entry
// point parsing a subcommand, then handing off to library code that does
// the actual work and returns a `Result` the binary turns into an exit
// code.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use exo_sched::capability::{DramMemory, ExternRegistry};
use exo_sched::config::ConfigRegistry;
use exo_sched::lower::emit::{self, CompileUnit};
use exo_sched::lower::memory::MemoryRegistry;
use exo_sched::typecheck;
use exo_sched::uast::UProc;

#[derive(Parser)]
#[command(name = "exo", about = "Typecheck and lower scheduled kernels")]
struct Cli {
    /// Enable verbose tracing output (RUST_LOG still takes precedence).
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Typecheck a UAST fixture and print the lowered procedure's printed form.
    Typecheck {
        /// Path to a JSON-encoded `UProc`.
        uast: PathBuf,
    },
    /// Typecheck a UAST fixture and lower it to a C header/source pair.
    Lower {
        /// Path to a JSON-encoded `UProc`.
        uast: PathBuf,
        /// File stem for the generated `<stem>.h`/`<stem>.c`.
        #[arg(long, default_value = "kernel")]
        stem: String,
        /// Directory the header/source pair is written into.
        #[arg(long, default_value = ".")]
        out: PathBuf,
        /// Optional JSON-encoded `ConfigRegistry` fixture.
        #[arg(long)]
        configs: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Typecheck { uast } => cmd_typecheck(&uast),
        Command::Lower { uast, stem, out, configs } => cmd_lower(&uast, &stem, &out, configs.as_deref()),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn load_uast(path: &std::path::Path) -> Result<UProc> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing UAST fixture {}", path.display()))
}

fn cmd_typecheck(uast: &std::path::Path) -> Result<()> {
    let uproc = load_uast(uast)?;
    let proc = typecheck::check(&uproc, &[]).with_context(|| format!("typechecking `{}`", uproc.name))?;
    println!("{}", exo_sched::printer::print_proc(&proc));
    Ok(())
}

fn cmd_lower(uast: &std::path::Path, stem: &str, out: &std::path::Path, configs: Option<&std::path::Path>) -> Result<()> {
    let uproc = load_uast(uast)?;
    let proc = typecheck::check(&uproc, &[]).with_context(|| format!("typechecking `{}`", uproc.name))?;

    let configs = match configs {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing config fixture {}", path.display()))?
        }
        None => ConfigRegistry::new(),
    };

    static DRAM: DramMemory = DramMemory;
    let memories = MemoryRegistry::new().with(&DRAM);
    let externs = ExternRegistry::new();
    let unit = CompileUnit {
        stem: stem.to_string(),
        context_struct_name: format!("{}_context", stem),
        memories: &memories,
        externs: &externs,
        configs: &configs,
    };

    let compiled = emit::compile(&[std::rc::Rc::new(proc)], &unit)?;

    fs::create_dir_all(out).with_context(|| format!("creating output directory {}", out.display()))?;
    let header_path = out.join(format!("{}.h", stem));
    let source_path = out.join(format!("{}.c", stem));
    fs::write(&header_path, &compiled.header).with_context(|| format!("writing {}", header_path.display()))?;
    fs::write(&source_path, &compiled.source).with_context(|| format!("writing {}", source_path.display()))?;

    println!("wrote {} and {}", header_path.display(), source_path.display());
    Ok(())
}
