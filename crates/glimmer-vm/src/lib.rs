//! glimmer-vm — the stack-based dispatch loop (C5) that executes a
//! compiled `VFunction`, plus the host-provided numeric builtins (C_stdlib).
//!
//! ## Modules
//! - `vm`: `Vm`/`VmOptions` and the instruction dispatch loop.
//! - `stdlib`: the seven numeric natives installed into every fresh `Vm`.
//! - `error`: `RuntimeError` and its call-stack trace.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms, unused_must_use)]

mod error;
mod stdlib;
mod vm;

pub use error::{RuntimeError, TraceFrame};
pub use vm::{Vm, VmOptions};
