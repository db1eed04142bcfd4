//! glimmer-cli — the REPL and file runner (C8) exposed as the `glimmer`
//! binary.
//!
//! Exit codes follow the `sysexits.h` convention this language borrows:
//! `0` ok, `64` usage error, `65` compile error, `70` runtime error, `74`
//! I/O error.

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::debug;

use glimmer_vm::Vm;

pub const EXIT_OK: i32 = 0;
pub const EXIT_USAGE: i32 = 64;
pub const EXIT_COMPILE_ERROR: i32 = 65;
pub const EXIT_RUNTIME_ERROR: i32 = 70;
pub const EXIT_IO_ERROR: i32 = 74;

/// Installs the `tracing` subscriber honoring `GLIMMER_LOG`, the way every
/// other ambient-logging entry point in this workspace does.
pub fn init_logging() {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_env("GLIMMER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).try_init();
}

#[derive(Parser, Debug)]
#[command(name = "glimmer", version, about = "Run or interactively evaluate a glimmer script")]
struct Cli {
    /// Script to execute. Omit to start an interactive REPL.
    script: Option<PathBuf>,
}

/// Parses argv and dispatches to the REPL or the file runner. Returns the
/// process exit code; never panics on user input.
pub fn run(args: impl IntoIterator<Item = String>) -> i32 {
    let args: Vec<String> = args.into_iter().collect();
    let cli = match Cli::try_parse_from(&args) {
        Ok(cli) => cli,
        Err(err) if err.kind() == clap::error::ErrorKind::DisplayHelp || err.kind() == clap::error::ErrorKind::DisplayVersion => {
            print!("{err}");
            return EXIT_OK;
        }
        Err(_) => {
            eprintln!("Usage: glimmer [script]");
            return EXIT_USAGE;
        }
    };

    match cli.script {
        None => run_repl(),
        Some(path) => run_file(&path),
    }
}

fn run_repl() -> i32 {
    println!("glimmer {}", env!("CARGO_PKG_VERSION"));
    println!("Type 'exit' to quit\n");

    let mut vm = Vm::new();
    let stdin = io::stdin();
    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return EXIT_IO_ERROR;
        }

        let mut line = String::new();
        let bytes_read = match stdin.read_line(&mut line) {
            Ok(n) => n,
            Err(_) => return EXIT_IO_ERROR,
        };
        if bytes_read == 0 {
            // EOF (e.g. piped input or Ctrl-D).
            return EXIT_OK;
        }
        if line == "exit\n" || line == "exit\r\n" {
            return EXIT_OK;
        }

        match glimmer_compiler::compile_str(&line) {
            Ok(function) => {
                if let Err(err) = vm.interpret(function) {
                    eprintln!("{err}");
                }
            }
            Err(compile_err) => {
                for diag in &compile_err.0 {
                    eprintln!("{diag}");
                }
            }
        }
    }
}

fn run_file(path: &PathBuf) -> i32 {
    let source = match std::fs::read_to_string(path).with_context(|| format!("Could not read file \"{}\"", path.display())) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("{err:#}");
            return EXIT_IO_ERROR;
        }
    };

    let function = match glimmer_compiler::compile_str(&source) {
        Ok(function) => function,
        Err(compile_err) => {
            for diag in &compile_err.0 {
                eprintln!("{diag}");
            }
            return EXIT_COMPILE_ERROR;
        }
    };
    debug!(path = %path.display(), "compiled script");

    let mut vm = Vm::new();
    match vm.interpret(function) {
        Ok(_) => EXIT_OK,
        Err(err) => {
            eprintln!("{err}");
            EXIT_RUNTIME_ERROR
        }
    }
}
