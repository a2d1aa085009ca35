//! ferro - reference CLI + REPL host program for the Ferro interpreter.
//!
//! Wires a concrete [`host::FileHostHooks`] implementation into
//! `ferro_rt::Vm` and drives it through the stack-based embedding API:
//! `--eval`/`--load` run non-interactively, a bare `ferro`
//! (or a trailing positional script with none of the above) starts the
//! line-edited REPL.
//!
//! Usage:
//!   ferro                        # start the REPL
//!   ferro script.ferro           # load and run a script, no REPL
//!   ferro --eval '(+ 1 2)'       # evaluate one expression and print it
//!   ferro --load lib.ferro repl.ferro  # load lib.ferro, then run repl.ferro

mod error;
mod host;
mod repl;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ferro_core::ObjType;
use ferro_rt::Vm;

use error::ReplResult;
use host::FileHostHooks;

#[derive(Parser)]
#[command(name = "ferro")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Embeddable Kernel-style Lisp interpreter", long_about = None)]
struct Args {
    /// Source file to load and run. Starts the REPL afterwards only if no
    /// --eval/--load was given and no script was provided at all.
    script: Option<PathBuf>,

    /// Evaluate EXPR and print its result; may be given multiple times.
    #[arg(long = "eval", value_name = "EXPR")]
    evals: Vec<String>,

    /// Load and run FILE before anything else; may be given multiple
    /// times. Unlike `script`, errors abort the run immediately.
    #[arg(long = "load", value_name = "FILE")]
    loads: Vec<PathBuf>,

    /// Directory to search for `$import`ed modules; may be given multiple
    /// times. Also honors the `FERRO_PATH` environment variable.
    #[arg(long = "search-path", value_name = "DIR")]
    search_paths: Vec<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("ferro=warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ferro: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> ReplResult<()> {
    let hooks = Box::new(FileHostHooks::new(args.search_paths));
    let mut vm = Vm::new(hooks);

    for path in &args.loads {
        run_file(&mut vm, path)?;
    }

    let mut ran_something = !args.loads.is_empty();

    for expr in &args.evals {
        eval_and_print(&mut vm, expr.as_bytes())?;
        ran_something = true;
    }

    if let Some(script) = &args.script {
        run_file(&mut vm, script)?;
        ran_something = true;
    }

    if !ran_something {
        repl::run(&mut vm)?;
    }

    Ok(())
}

/// Load `path`, parsing and evaluating every top-level form in order and
/// printing nothing unless a form evaluates to an `Error` value.
fn run_file(vm: &mut Vm, path: &PathBuf) -> ReplResult<()> {
    let bytes = std::fs::read(path).map_err(|source| error::ReplError::Read {
        path: path.clone(),
        source,
    })?;
    let mut cursor = 0usize;
    while cursor < bytes.len() {
        let next = vm.parse(&bytes, cursor);
        vm.eval(-1)?;
        let result = vm.peekstack(-1)?;
        if result.obj_type() == Some(ObjType::Error) {
            eprintln!("{}: {}", path.display(), vm_format(vm, -1)?);
        }
        vm.pop(1);
        cursor = next;
    }
    Ok(())
}

fn eval_and_print(vm: &mut Vm, src: &[u8]) -> ReplResult<()> {
    vm.parse(src, 0);
    vm.eval(-1)?;
    vm.print(-1, "\n")?;
    vm.pop(1);
    Ok(())
}

fn vm_format(vm: &mut Vm, idx: i64) -> ReplResult<String> {
    let v = vm.peekstack(idx)?;
    Ok(v.obj().as_error().message.to_string())
}
