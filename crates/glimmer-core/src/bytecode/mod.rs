//! Bytecode core: the instruction set (C2/C4 ↔ C5 contract) and the chunk
//! that owns an ordered instruction vector, line table, and constant pool.

pub mod chunk;
pub mod ops;

pub use chunk::{Chunk, ConstPool, ConstPoolError, LineTable, MAX_CONSTANTS};
pub use ops::{Argc, ConstIx, JumpOffset, LocalIx, Op};
