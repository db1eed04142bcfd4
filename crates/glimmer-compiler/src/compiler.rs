//! Single-pass-style AST-to-bytecode lowering (C4): walks the parsed
//! `Program` once and emits a `Chunk` per function, tracking lexical locals
//! and scope depth the way the source program nests blocks.
//!
//! Unlike the reference this design was distilled from, `declare_variable`
//! here takes its name token explicitly rather than reading a shared
//! "current token" — the parse and codegen passes are separate stages in
//! this crate, so there is no single mutable parser cursor to read back.

use std::rc::Rc;

use glimmer_core::{Chunk, Op, VFunction, VString, Value};

use crate::ast::{BinaryOp, Expr, LogicalOp, Program, Stmt, UnaryOp};
use crate::error::{CompileError, Diagnostic};

const MAX_LOCALS: usize = 256;

#[derive(Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    Script,
    Function,
}

enum LocalResolution {
    Found(u8),
    /// Name exists in the current scope but its initializer is still being
    /// compiled (`let x = x;`).
    Uninitialized,
    NotFound,
}

struct Local {
    name: String,
    /// `None` while the local's initializer is still being compiled — lets
    /// `let x = x;` raise "Can't read local variable in its own
    /// initializer" instead of silently shadowing.
    depth: Option<u32>,
}

struct FunctionCtx {
    chunk: Chunk,
    locals: Vec<Local>,
    scope_depth: u32,
    kind: FunctionKind,
    arity: u8,
    name: Option<String>,
}

impl FunctionCtx {
    fn new(kind: FunctionKind, name: Option<String>) -> Self {
        // Slot 0 is reserved for the callee itself, mirroring the call
        // frame's base slot (§4.4).
        let locals = vec![Local { name: String::new(), depth: Some(0) }];
        Self { chunk: Chunk::new(), locals, scope_depth: 0, kind, arity: 0, name }
    }
}

pub struct Compiler {
    contexts: Vec<FunctionCtx>,
    diagnostics: Vec<Diagnostic>,
}

impl Compiler {
    pub fn new() -> Self {
        Self { contexts: vec![FunctionCtx::new(FunctionKind::Script, None)], diagnostics: Vec::new() }
    }

    pub fn compile(mut self, program: &Program) -> Result<VFunction, CompileError> {
        for stmt in &program.statements {
            self.statement(stmt);
        }
        let mut chunk = self.contexts.pop().expect("script context always present").chunk;
        if !matches!(chunk.ops.last(), Some(Op::Return)) {
            chunk.push_op(Op::Nil, 0);
            chunk.push_op(Op::Return, 0);
        }
        if self.diagnostics.is_empty() {
            Ok(VFunction { arity: 0, name: None, chunk })
        } else {
            Err(CompileError(self.diagnostics))
        }
    }

    fn current(&mut self) -> &mut FunctionCtx {
        self.contexts.last_mut().expect("at least one function context")
    }

    fn chunk(&mut self) -> &mut Chunk {
        &mut self.current().chunk
    }

    fn error(&mut self, line: u32, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic::new(line, message.into()));
    }

    // --- statements ---

    fn statement(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr { expr, line } => {
                self.expression(expr);
                self.chunk().push_op(Op::Pop, *line);
            }
            Stmt::Let { name, init, line } => self.let_statement(name, init.as_ref(), *line),
            Stmt::Print { expr, line } => {
                self.expression(expr);
                self.chunk().push_op(Op::Print, *line);
            }
            Stmt::Block { body, .. } => {
                self.begin_scope();
                for s in body {
                    self.statement(s);
                }
                self.end_scope(body.last().map_or(0, |s| s.line()));
            }
            Stmt::If { cond, then_branch, else_branch, line } => self.if_statement(cond, then_branch, else_branch.as_deref(), *line),
            Stmt::While { cond, body, line } => self.while_statement(cond, body, *line),
            Stmt::Return { value, line } => self.return_statement(value.as_ref(), *line),
            Stmt::Function { name, params, body, line } => self.function_statement(name, params, body, *line),
        }
    }

    fn let_statement(&mut self, name: &str, init: Option<&Expr>, line: u32) {
        match init {
            Some(expr) => self.expression(expr),
            None => {
                self.chunk().push_op(Op::Nil, line);
            }
        }
        self.declare_variable(name, line);
        if self.current().scope_depth > 0 {
            self.mark_initialized();
            return;
        }
        let ix = self.identifier_constant(name);
        self.chunk().push_op(Op::DefineGlobal(ix), line);
    }

    fn if_statement(&mut self, cond: &Expr, then_branch: &[Stmt], else_branch: Option<&[Stmt]>, line: u32) {
        self.expression(cond);
        let then_jump = self.emit_placeholder_jump(Op::JumpIfFalse(0), line);
        self.chunk().push_op(Op::Pop, line);
        self.begin_scope();
        for s in then_branch {
            self.statement(s);
        }
        self.end_scope(line);
        let else_jump = self.emit_placeholder_jump(Op::Jump(0), line);
        self.patch_jump(then_jump);
        self.chunk().push_op(Op::Pop, line);
        if let Some(else_branch) = else_branch {
            self.begin_scope();
            for s in else_branch {
                self.statement(s);
            }
            self.end_scope(line);
        }
        self.patch_jump(else_jump);
    }

    fn while_statement(&mut self, cond: &Expr, body: &[Stmt], line: u32) {
        let loop_start = self.chunk().ops.len();
        self.expression(cond);
        let exit_jump = self.emit_placeholder_jump(Op::JumpIfFalse(0), line);
        self.chunk().push_op(Op::Pop, line);
        self.begin_scope();
        for s in body {
            self.statement(s);
        }
        self.end_scope(line);
        self.emit_loop(loop_start, line);
        self.patch_jump(exit_jump);
        self.chunk().push_op(Op::Pop, line);
    }

    fn return_statement(&mut self, value: Option<&Expr>, line: u32) {
        if self.current().kind == FunctionKind::Script {
            self.error(line, "Cannot return from top-level code");
        }
        match value {
            Some(expr) => self.expression(expr),
            None => {
                self.chunk().push_op(Op::Nil, line);
            }
        }
        self.chunk().push_op(Op::Return, line);
    }

    fn function_statement(&mut self, name: &str, params: &[String], body: &[Stmt], line: u32) {
        self.declare_variable(name, line);
        if self.current().scope_depth > 0 {
            self.mark_initialized();
        }

        self.contexts.push(FunctionCtx::new(FunctionKind::Function, Some(name.to_string())));
        self.current().scope_depth += 1;
        if params.len() > 255 {
            self.error(line, "Too many parameters");
        }
        self.current().arity = params.len().min(255) as u8;
        for param in params {
            self.declare_variable(param, line);
            self.mark_initialized();
        }
        for stmt in body {
            self.statement(stmt);
        }
        if !matches!(self.chunk().ops.last(), Some(Op::Return)) {
            self.chunk().push_op(Op::Nil, line);
            self.chunk().push_op(Op::Return, line);
        }
        let ctx = self.contexts.pop().expect("pushed function context above");
        let function = VFunction { arity: ctx.arity, name: Some(Rc::new(VString::new(name.to_string()))), chunk: ctx.chunk };
        let const_ix = self.add_const(Value::function(function), line);
        self.chunk().push_op(Op::Constant(const_ix), line);

        // Local case: the constant just pushed *is* the local's value: the
        // declare/mark above already reserved its slot. Global case: bind it.
        if self.current().scope_depth == 0 {
            let ix = self.identifier_constant(name);
            self.chunk().push_op(Op::DefineGlobal(ix), line);
        }
    }

    // --- expressions ---

    fn expression(&mut self, expr: &Expr) {
        match expr {
            Expr::Number { value, line } => {
                let ix = self.add_const(Value::Number(*value), *line);
                self.chunk().push_op(Op::Constant(ix), *line);
            }
            Expr::Str { line, .. } => {
                self.error(*line, "String literals are not supported");
            }
            Expr::Bool { value, line } => {
                self.chunk().push_op(if *value { Op::True } else { Op::False }, *line);
            }
            Expr::Nil { line } => {
                self.chunk().push_op(Op::Nil, *line);
            }
            Expr::Identifier { name, line } => self.resolve_and_get(name, *line),
            Expr::Assign { name, value, line } => {
                self.expression(value);
                self.resolve_and_set(name, *line);
            }
            Expr::Unary { op, operand, line } => {
                self.expression(operand);
                match op {
                    UnaryOp::Negate => self.chunk().push_op(Op::Negate, *line),
                    UnaryOp::Not => self.chunk().push_op(Op::Not, *line),
                };
            }
            Expr::Binary { op, left, right, line } => {
                self.expression(left);
                self.expression(right);
                let op = match op {
                    BinaryOp::Add => Op::Add,
                    BinaryOp::Sub => Op::Sub,
                    BinaryOp::Mul => Op::Mul,
                    BinaryOp::Div => Op::Div,
                    BinaryOp::Mod => Op::Modulo,
                    BinaryOp::Equal => Op::Equal,
                    BinaryOp::Less => Op::Less,
                    BinaryOp::Greater => Op::Greater,
                    BinaryOp::NotEqual => {
                        self.chunk().push_op(Op::Equal, *line);
                        self.chunk().push_op(Op::Not, *line);
                        return;
                    }
                    BinaryOp::LessEqual => {
                        self.chunk().push_op(Op::Greater, *line);
                        self.chunk().push_op(Op::Not, *line);
                        return;
                    }
                    BinaryOp::GreaterEqual => {
                        self.chunk().push_op(Op::Less, *line);
                        self.chunk().push_op(Op::Not, *line);
                        return;
                    }
                };
                self.chunk().push_op(op, *line);
            }
            Expr::Logical { op, left, right, line } => match op {
                LogicalOp::And => {
                    self.expression(left);
                    let end_jump = self.emit_placeholder_jump(Op::JumpIfFalse(0), *line);
                    self.chunk().push_op(Op::Pop, *line);
                    self.expression(right);
                    self.patch_jump(end_jump);
                }
                LogicalOp::Or => {
                    self.expression(left);
                    let else_jump = self.emit_placeholder_jump(Op::JumpIfFalse(0), *line);
                    let end_jump = self.emit_placeholder_jump(Op::Jump(0), *line);
                    self.patch_jump(else_jump);
                    self.chunk().push_op(Op::Pop, *line);
                    self.expression(right);
                    self.patch_jump(end_jump);
                }
            },
            Expr::Call { callee, args, line } => {
                self.expression(callee);
                if args.len() > 255 {
                    self.error(*line, "Too many arguments");
                }
                for arg in args {
                    self.expression(arg);
                }
                self.chunk().push_op(Op::Call(args.len().min(255) as u8), *line);
            }
        }
    }

    // --- locals / globals ---

    fn begin_scope(&mut self) {
        self.current().scope_depth += 1;
    }

    fn end_scope(&mut self, line: u32) {
        let depth = {
            let ctx = self.current();
            ctx.scope_depth -= 1;
            ctx.scope_depth
        };
        let mut pops = 0usize;
        {
            let ctx = self.current();
            while matches!(ctx.locals.last(), Some(l) if l.depth.is_some_and(|d| d > depth)) {
                ctx.locals.pop();
                pops += 1;
            }
        }
        for _ in 0..pops {
            self.chunk().push_op(Op::Pop, line);
        }
    }

    /// Declares `name` in the current scope. At top level (`scope_depth ==
    /// 0`) this is a no-op; global names are resolved by content at
    /// runtime, not by compile-time slot.
    fn declare_variable(&mut self, name: &str, line: u32) {
        let scope_depth = self.current().scope_depth;
        if scope_depth == 0 {
            return;
        }
        let duplicate = {
            let ctx = self.current();
            let mut found = false;
            for local in ctx.locals.iter().rev() {
                if local.depth.is_some_and(|d| d < scope_depth) {
                    break;
                }
                if local.name == name {
                    found = true;
                    break;
                }
            }
            found
        };
        if duplicate {
            self.error(line, "Already a variable with this name in this scope");
            return;
        }
        let too_many = self.current().locals.len() >= MAX_LOCALS;
        if too_many {
            self.error(line, "Too many local variables in function");
            return;
        }
        self.current().locals.push(Local { name: name.to_string(), depth: None });
    }

    fn mark_initialized(&mut self) {
        let ctx = self.current();
        if ctx.scope_depth == 0 {
            return;
        }
        let depth = ctx.scope_depth;
        if let Some(local) = ctx.locals.last_mut() {
            local.depth = Some(depth);
        }
    }

    fn resolve_local(&self, name: &str) -> LocalResolution {
        let ctx = self.contexts.last().expect("current context");
        for (i, local) in ctx.locals.iter().enumerate().rev() {
            if local.name == name {
                return match local.depth {
                    Some(_) => LocalResolution::Found(i as u8),
                    None => LocalResolution::Uninitialized,
                };
            }
        }
        LocalResolution::NotFound
    }

    fn resolve_and_get(&mut self, name: &str, line: u32) {
        match self.resolve_local(name) {
            LocalResolution::Uninitialized => {
                self.error(line, "Can't read local variable in its own initializer");
            }
            LocalResolution::Found(slot) => {
                self.chunk().push_op(Op::GetLocal(slot), line);
            }
            LocalResolution::NotFound => {
                let ix = self.identifier_constant(name);
                self.chunk().push_op(Op::GetGlobal(ix), line);
            }
        }
    }

    fn resolve_and_set(&mut self, name: &str, line: u32) {
        match self.resolve_local(name) {
            LocalResolution::Uninitialized => {
                self.error(line, "Can't read local variable in its own initializer");
            }
            LocalResolution::Found(slot) => {
                self.chunk().push_op(Op::SetLocal(slot), line);
            }
            LocalResolution::NotFound => {
                let ix = self.identifier_constant(name);
                self.chunk().push_op(Op::SetGlobal(ix), line);
            }
        }
    }

    fn identifier_constant(&mut self, name: &str) -> u8 {
        self.add_const(Value::string(name.to_string()), 0)
    }

    fn add_const(&mut self, value: Value, line: u32) -> u8 {
        match self.chunk().add_const(value) {
            Ok(ix) => ix,
            Err(_) => {
                self.error(line, "Too many constants in one chunk");
                0
            }
        }
    }

    // --- jumps ---

    fn emit_placeholder_jump(&mut self, placeholder: Op, line: u32) -> usize {
        self.chunk().push_op(placeholder, line)
    }

    fn patch_jump(&mut self, at: usize) {
        let chunk = self.chunk();
        let offset = chunk.ops.len() - at - 1;
        if offset > u16::MAX as usize {
            self.error(0, "Too much code to jump over");
            return;
        }
        let offset = offset as u16;
        match &mut self.chunk().ops[at] {
            Op::Jump(o) | Op::JumpIfFalse(o) => *o = offset,
            _ => unreachable!("patch_jump target must be a placeholder jump"),
        }
    }

    fn emit_loop(&mut self, loop_start: usize, line: u32) {
        let pc = self.chunk().push_op(Op::Loop(0), line);
        let offset = pc - loop_start + 1;
        if offset > u16::MAX as usize {
            self.error(line, "Loop body too large");
            return;
        }
        if let Op::Loop(o) = &mut self.chunk().ops[pc] {
            *o = offset as u16;
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}
