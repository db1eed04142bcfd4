//! Chunk (C2): an ordered instruction vector, a run-length line table used
//! only for diagnostics, and a bounded constant pool.

use crate::bytecode::ops::{ConstIx, Op};
use crate::value::Value;

/// A contiguous run of instructions sharing a source line, so the line
/// table doesn't need one entry per instruction.
#[derive(Debug, Clone, Copy)]
struct LineRun {
    start_pc: usize,
    line: u32,
    len: usize,
}

#[derive(Debug, Clone, Default)]
pub struct LineTable {
    runs: Vec<LineRun>,
}

impl LineTable {
    pub fn push(&mut self, pc: usize, line: u32) {
        if let Some(last) = self.runs.last_mut() {
            if last.line == line && last.start_pc + last.len == pc {
                last.len += 1;
                return;
            }
        }
        self.runs.push(LineRun { start_pc: pc, line, len: 1 });
    }

    /// Source line for the instruction at `pc`, or `0` if unknown.
    pub fn line_for(&self, pc: usize) -> u32 {
        for run in &self.runs {
            if pc >= run.start_pc && pc < run.start_pc + run.len {
                return run.line;
            }
        }
        0
    }
}

/// The maximum number of distinct constants a single chunk may hold — a
/// `Constant`/`GetGlobal`/... operand is a single byte.
pub const MAX_CONSTANTS: usize = 256;

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConstPoolError {
    #[error("Too many constants in one chunk")]
    TooManyConstants,
}

#[derive(Debug, Default)]
pub struct ConstPool {
    values: Vec<Value>,
}

impl ConstPool {
    pub fn add(&mut self, value: Value) -> Result<ConstIx, ConstPoolError> {
        if self.values.len() >= MAX_CONSTANTS {
            return Err(ConstPoolError::TooManyConstants);
        }
        self.values.push(value);
        Ok((self.values.len() - 1) as ConstIx)
    }

    pub fn get(&self, index: ConstIx) -> Option<&Value> {
        self.values.get(index as usize)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A self-contained bytecode body owned by a `VFunction`.
#[derive(Debug, Default)]
pub struct Chunk {
    pub ops: Vec<Op>,
    pub lines: LineTable,
    pub constants: ConstPool,
}

impl Chunk {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_op(&mut self, op: Op, line: u32) -> usize {
        let pc = self.ops.len();
        self.ops.push(op);
        self.lines.push(pc, line);
        pc
    }

    pub fn add_const(&mut self, value: Value) -> Result<ConstIx, ConstPoolError> {
        self.constants.add(value)
    }

    pub fn line_for(&self, pc: usize) -> u32 {
        self.lines.line_for(pc)
    }

    /// Human-readable disassembly, one instruction per line, for debugging.
    pub fn disassemble(&self, name: &str) -> String {
        let mut out = format!("== {name} ==\n");
        for (pc, op) in self.ops.iter().enumerate() {
            out.push_str(&format!("{pc:04} {:>5} {op}\n", self.line_for(pc)));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_table_runs_coalesce() {
        let mut t = LineTable::default();
        t.push(0, 1);
        t.push(1, 1);
        t.push(2, 2);
        assert_eq!(t.line_for(0), 1);
        assert_eq!(t.line_for(1), 1);
        assert_eq!(t.line_for(2), 2);
        assert_eq!(t.runs.len(), 2);
    }

    #[test]
    fn const_pool_rejects_overflow() {
        let mut pool = ConstPool::default();
        for _ in 0..MAX_CONSTANTS {
            pool.add(Value::Nil).unwrap();
        }
        assert!(matches!(pool.add(Value::Nil), Err(ConstPoolError::TooManyConstants)));
    }

    #[test]
    fn push_op_tracks_lines() {
        let mut c = Chunk::new();
        c.push_op(Op::Nil, 1);
        c.push_op(Op::Print, 1);
        c.push_op(Op::Return, 2);
        assert_eq!(c.line_for(0), 1);
        assert_eq!(c.line_for(2), 2);
    }
}
