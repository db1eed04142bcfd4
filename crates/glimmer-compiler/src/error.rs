//! Diagnostics shared by the parser and the codegen pass. Both stages
//! collect `Diagnostic`s rather than bailing on the first one, matching the
//! panic-mode recovery described in §4.3.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub line: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn new(line: u32, message: impl Into<String>) -> Self {
        Self { line, message: message.into() }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error: {}", self.line, self.message)
    }
}

/// Failure to compile a program: every diagnostic collected before the
/// compiler gave up, in source order.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("compilation failed with {} error(s)", .0.len())]
pub struct CompileError(pub Vec<Diagnostic>);
