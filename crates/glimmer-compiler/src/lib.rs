//! glimmer-compiler — lexer, parser, and single-pass-style bytecode codegen
//! (C6/C7/C4) for the glimmer language.
//!
//! ## Modules
//! - `lexer`: hand-rolled character scanner.
//! - `ast`: the parsed program representation.
//! - `parser`: recursive-descent parser with precedence climbing.
//! - `compiler`: lowers a parsed `Program` into a `glimmer_core::VFunction`.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

pub mod ast;
pub mod compiler;
pub mod error;
pub mod lexer;
pub mod parser;

use glimmer_core::VFunction;
use tracing::debug;

pub use error::{CompileError, Diagnostic};

/// Compiles a whole program's source text into its top-level `VFunction`.
///
/// Parses the full source first; a parse failure short-circuits codegen
/// entirely, same as the panic-mode model parser and compiler each follow
/// internally (see `parser`/`compiler` docs).
pub fn compile_str(source: &str) -> Result<VFunction, CompileError> {
    let program = parser::Parser::new(source).parse().map_err(CompileError)?;
    debug!(statements = program.statements.len(), "parsed program");
    compiler::Compiler::new().compile(&program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_a_small_program() {
        let result = compile_str("let x = 1; print x + 2;");
        assert!(result.is_ok());
    }

    #[test]
    fn reports_parse_errors_without_compiling() {
        let result = compile_str("let = ;");
        assert!(result.is_err());
    }
}
