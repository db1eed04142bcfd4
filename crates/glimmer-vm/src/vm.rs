//! The stack-based dispatch loop (C5): one `CallFrame` per active call,
//! operating on a single shared value stack.

use std::rc::Rc;

use glimmer_core::{GlobalTable, Obj, Op, VFunction, VString, Value, FRAMES_MAX, STACK_MAX};
use tracing::trace;

use crate::error::{RuntimeError, TraceFrame};
use crate::stdlib;

struct CallFrame {
    function: Rc<Obj>,
    ip: usize,
    base: usize,
}

impl CallFrame {
    fn function(&self) -> &VFunction {
        match self.function.as_ref() {
            Obj::Function(f) => f,
            _ => unreachable!("call frames only ever hold Obj::Function"),
        }
    }
}

/// Runtime tunables. The only knob today is per-instruction tracing; see
/// the ambient logging conventions this mirrors.
#[derive(Debug, Clone, Copy, Default)]
pub struct VmOptions {
    pub trace: bool,
}

impl VmOptions {
    pub fn with_trace(mut self, on: bool) -> Self {
        self.trace = on;
        self
    }
}

pub struct Vm {
    stack: Vec<Value>,
    frames: Vec<CallFrame>,
    globals: GlobalTable,
    trace: bool,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::with_options(VmOptions::default())
    }

    pub fn with_options(options: VmOptions) -> Self {
        let mut globals = GlobalTable::new();
        stdlib::install(&mut globals);
        Self { stack: Vec::with_capacity(STACK_MAX), frames: Vec::with_capacity(FRAMES_MAX), globals, trace: options.trace }
    }

    pub fn globals(&self) -> &GlobalTable {
        &self.globals
    }

    /// Runs a freshly compiled top-level function to completion, returning
    /// whatever value the script's implicit or explicit `return` leaves.
    pub fn interpret(&mut self, script: VFunction) -> Result<Value, RuntimeError> {
        let script_value = Value::function(script);
        self.push(script_value.clone())?;
        let function = match &script_value {
            Value::Obj(o) => o.clone(),
            _ => unreachable!(),
        };
        self.frames.push(CallFrame { function, ip: 0, base: 0 });
        let result = self.run();
        if result.is_err() {
            // A runtime error abandons the current call in progress; reset
            // so the next `interpret` (e.g. the next REPL line) starts clean.
            self.stack.clear();
            self.frames.clear();
        }
        result
    }

    fn run(&mut self) -> Result<Value, RuntimeError> {
        loop {
            let op = {
                let frame = self.frames.last().expect("at least one call frame");
                let ops = &frame.function().chunk.ops;
                ops[frame.ip]
            };
            self.frames.last_mut().expect("frame").ip += 1;

            if self.trace {
                trace!(?op, "dispatch");
            }

            match op {
                Op::Constant(ix) => {
                    let value = self.read_constant(ix);
                    self.push(value)?;
                }
                Op::Nil => self.push(Value::Nil)?,
                Op::True => self.push(Value::Bool(true))?,
                Op::False => self.push(Value::Bool(false))?,
                Op::Pop => {
                    self.pop()?;
                }
                Op::GetLocal(slot) => {
                    let base = self.frames.last().unwrap().base;
                    let value = self.stack[base + slot as usize].clone();
                    self.push(value)?;
                }
                Op::SetLocal(slot) => {
                    let base = self.frames.last().unwrap().base;
                    let value = self.peek(0)?.clone();
                    self.stack[base + slot as usize] = value;
                }
                Op::GetGlobal(ix) => {
                    let name = self.read_string_constant(ix);
                    match self.globals.get(&name) {
                        Some(value) => self.push(value)?,
                        None => return Err(self.runtime_error(format!("Undefined variable '{name}'"))),
                    }
                }
                Op::DefineGlobal(ix) => {
                    let name = self.read_string_constant(ix);
                    let value = self.peek(0)?.clone();
                    self.globals.set(Rc::new(name), value);
                    self.pop()?;
                }
                Op::SetGlobal(ix) => {
                    let name = self.read_string_constant(ix);
                    if self.globals.get(&name).is_none() {
                        return Err(self.runtime_error(format!("Undefined variable '{name}'")));
                    }
                    let value = self.peek(0)?.clone();
                    self.globals.set(Rc::new(name), value);
                }
                Op::Equal => {
                    let b = self.pop()?;
                    let a = self.pop()?;
                    self.push(Value::Bool(Value::values_equal(&a, &b)))?;
                }
                Op::Greater => self.binary_cmp(|a, b| a > b)?,
                Op::Less => self.binary_cmp(|a, b| a < b)?,
                Op::Add => self.binary_num(|a, b| a + b)?,
                Op::Sub => self.binary_num(|a, b| a - b)?,
                Op::Mul => self.binary_num(|a, b| a * b)?,
                Op::Div => self.binary_num(|a, b| a / b)?,
                Op::Modulo => self.binary_num(|a, b| a % b)?,
                Op::Not => {
                    let v = self.pop()?;
                    self.push(Value::Bool(!v.is_truthy()))?;
                }
                Op::Negate => {
                    if self.peek(0)?.as_number().is_none() {
                        return Err(self.runtime_error("Operand must be a number"));
                    }
                    let n = self.pop()?.as_number().unwrap();
                    self.push(Value::Number(-n))?;
                }
                Op::Print => {
                    let v = self.pop()?;
                    println!("{v}");
                }
                Op::Jump(offset) => {
                    self.frames.last_mut().unwrap().ip += offset as usize;
                }
                Op::JumpIfFalse(offset) => {
                    if !self.peek(0)?.is_truthy() {
                        self.frames.last_mut().unwrap().ip += offset as usize;
                    }
                }
                Op::Loop(offset) => {
                    self.frames.last_mut().unwrap().ip -= offset as usize;
                }
                Op::Call(argc) => self.call_value(argc)?,
                Op::Return => {
                    let result = self.pop()?;
                    let frame = self.frames.pop().expect("returning frame");
                    if self.frames.is_empty() {
                        self.pop()?;
                        return Ok(result);
                    }
                    self.stack.truncate(frame.base);
                    self.push(result)?;
                }
            }
        }
    }

    // --- stack/frame plumbing ---

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        if self.stack.len() >= STACK_MAX {
            return Err(self.runtime_error("Stack overflow"));
        }
        self.stack.push(value);
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        self.stack.pop().ok_or_else(|| self.runtime_error("Stack underflow"))
    }

    fn peek(&self, distance: usize) -> Result<&Value, RuntimeError> {
        let len = self.stack.len();
        self.stack
            .get(len.checked_sub(1 + distance).unwrap_or(usize::MAX))
            .ok_or_else(|| RuntimeError::new("Stack underflow", self.build_trace()))
    }

    fn read_constant(&self, ix: glimmer_core::ConstIx) -> Value {
        self.frames.last().unwrap().function().chunk.constants.get(ix).cloned().expect("valid constant index")
    }

    fn read_string_constant(&self, ix: glimmer_core::ConstIx) -> VString {
        match self.read_constant(ix) {
            Value::Obj(o) => match o.as_ref() {
                Obj::Str(s) => VString::new(s.as_str()),
                _ => unreachable!("identifier constant must be a string"),
            },
            _ => unreachable!("identifier constant must be a string"),
        }
    }

    fn binary_num(&mut self, f: impl FnOnce(f64, f64) -> f64) -> Result<(), RuntimeError> {
        let (a, b) = self.pop_number_pair()?;
        self.push(Value::Number(f(a, b)))
    }

    fn binary_cmp(&mut self, f: impl FnOnce(f64, f64) -> bool) -> Result<(), RuntimeError> {
        let (a, b) = self.pop_number_pair()?;
        self.push(Value::Bool(f(a, b)))
    }

    fn pop_number_pair(&mut self) -> Result<(f64, f64), RuntimeError> {
        if self.peek(0)?.as_number().is_none() || self.peek(1)?.as_number().is_none() {
            return Err(self.runtime_error("Operands must be numbers"));
        }
        let b = self.pop()?.as_number().unwrap();
        let a = self.pop()?.as_number().unwrap();
        Ok((a, b))
    }

    fn call_value(&mut self, argc: glimmer_core::Argc) -> Result<(), RuntimeError> {
        let argc = argc as usize;
        let callee = self.peek(argc)?.clone();
        match &callee {
            Value::Obj(o) => match o.as_ref() {
                Obj::Function(f) => {
                    if argc != f.arity as usize {
                        return Err(self.runtime_error(format!("Expected {} arguments but got {argc}", f.arity)));
                    }
                    if self.frames.len() == FRAMES_MAX {
                        return Err(self.runtime_error("Stack overflow"));
                    }
                    let base = self.stack.len() - argc - 1;
                    self.frames.push(CallFrame { function: o.clone(), ip: 0, base });
                    Ok(())
                }
                Obj::Native(n) => {
                    let args_start = self.stack.len() - argc;
                    let args: Vec<Value> = self.stack[args_start..].to_vec();
                    let result = (n.function)(&args);
                    self.stack.truncate(args_start - 1);
                    self.push(result)
                }
                _ => Err(self.runtime_error("Can only call functions")),
            },
            _ => Err(self.runtime_error("Can only call functions")),
        }
    }

    // --- error reporting ---

    fn runtime_error(&self, message: impl Into<String>) -> RuntimeError {
        RuntimeError::new(message, self.build_trace())
    }

    fn build_trace(&self) -> Vec<TraceFrame> {
        self.frames
            .iter()
            .rev()
            .map(|frame| {
                let function = frame.function();
                let pc = frame.ip.saturating_sub(1);
                TraceFrame { line: function.chunk.line_for(pc), function_name: function.name.as_ref().map(|n| n.to_string()) }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glimmer_core::Chunk;

    fn script_with(ops: Vec<Op>, constants: Vec<Value>) -> VFunction {
        let mut chunk = Chunk::new();
        for c in constants {
            chunk.add_const(c).unwrap();
        }
        for op in ops {
            chunk.push_op(op, 1);
        }
        VFunction { arity: 0, name: None, chunk }
    }

    #[test]
    fn arithmetic_and_print() {
        let f = script_with(
            vec![Op::Constant(0), Op::Constant(1), Op::Add, Op::Print, Op::Nil, Op::Return],
            vec![Value::Number(1.0), Value::Number(2.0)],
        );
        let mut vm = Vm::new();
        assert!(vm.interpret(f).is_ok());
    }

    #[test]
    fn dividing_by_non_number_is_a_runtime_error() {
        let f = script_with(
            vec![Op::Constant(0), Op::Constant(1), Op::Add, Op::Pop, Op::Nil, Op::Return],
            vec![Value::Number(1.0), Value::Bool(true)],
        );
        let mut vm = Vm::new();
        let err = vm.interpret(f).unwrap_err();
        assert!(err.message.contains("Operands must be numbers"));
    }

    #[test]
    fn undefined_global_read_is_a_runtime_error() {
        let f = script_with(vec![Op::GetGlobal(0), Op::Pop, Op::Nil, Op::Return], vec![Value::string("missing")]);
        let mut vm = Vm::new();
        let err = vm.interpret(f).unwrap_err();
        assert!(err.message.contains("Undefined variable"));
    }

    #[test]
    fn trace_includes_script_frame() {
        let f = script_with(vec![Op::GetGlobal(0), Op::Pop, Op::Nil, Op::Return], vec![Value::string("missing")]);
        let mut vm = Vm::new();
        let err = vm.interpret(f).unwrap_err();
        assert!(err.trace.iter().any(|t| t.function_name.is_none()));
    }
}
