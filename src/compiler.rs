// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Expression lowering: typed expressions (see [`crate::reader::expr`])
//! become instructions appended to a stream.
//!
//! Register allocation has no place in a stack machine with no registers;
//! every reference instead resolves through the environment to a
//! `GETGL`/`GETLC`/`GETAG` addressing opcode, and every application pushes
//! its arguments onto the data stack in reverse (rightmost-first) order.

#[cfg(test)]
mod compiler_test;

use crate::env::{BindingKind, Environment};
use crate::reader::expr::{is_builtin, is_reserved_unimplemented, Expr};
use crate::stream::{Immediate, Instruction, InstructionStream, Op, StreamId, StreamTable};
use crate::symbol::SymbolTable;

/// A failure to lower an expression to bytecode.
#[derive(Debug, Clone, PartialEq)]
pub enum CompileError {
    /// A `Reference` to a name with no binding in scope and no built-in
    /// of that name.
    UnboundSymbol(String),
    /// `isseq`/`and`/`or`/`not` are reserved but not yet lowered.
    NotYetImplemented(String),
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnboundSymbol(name) => write!(f, "unbound identifier: {name}"),
            Self::NotYetImplemented(name) => {
                write!(f, "`{name}` is reserved but not yet implemented")
            }
        }
    }
}

impl std::error::Error for CompileError {}

/// Lowers expressions into instruction streams.
///
/// Holds no state of its own beyond borrows of the symbol table and
/// stream table it's given; the environment is passed in per call since
/// lambda bodies compile against a temporarily extended copy of it.
pub struct Compiler<'a> {
    pub symbols: &'a mut SymbolTable,
    pub streams: &'a mut StreamTable,
}

impl<'a> Compiler<'a> {
    #[must_use]
    pub fn new(symbols: &'a mut SymbolTable, streams: &'a mut StreamTable) -> Self {
        Self { symbols, streams }
    }

    /// Compile `expr`, appending instructions to `stream`. Returns the
    /// number of instructions emitted (non-semantic; useful for tests and
    /// disassembly).
    ///
    /// # Errors
    ///
    /// Returns [`CompileError`] if `expr` references an unbound name or
    /// uses a reserved-but-unimplemented built-in.
    pub fn compile_expr(
        &mut self,
        env: &mut Environment,
        stream: &mut InstructionStream,
        expr: &Expr,
    ) -> Result<usize, CompileError> {
        let before = stream.len();
        match expr {
            Expr::Number(n) => {
                stream.emit(Instruction::new(Op::PushN, Immediate::Number(*n)));
            }
            Expr::Symbol(name) => {
                let id = self.symbols.intern(name);
                stream.emit(Instruction::new(Op::PushS, Immediate::Symbol(id)));
            }
            Expr::Reference(name) => self.compile_reference(env, stream, name)?,
            Expr::List(items) => self.compile_list_literal(env, stream, items)?,
            Expr::If { cond, then, els } => self.compile_if(env, stream, cond, then, els)?,
            Expr::Lambda { params, body } => self.compile_lambda(env, stream, params, body)?,
            Expr::Application { callee, args } => {
                self.compile_application(env, stream, callee, args)?;
            }
            Expr::Define { .. } => {
                unreachable!("define is handled by the top-level driver, not the compiler")
            }
        }
        Ok(stream.len() - before)
    }

    fn compile_reference(
        &mut self,
        env: &Environment,
        stream: &mut InstructionStream,
        name: &str,
    ) -> Result<(), CompileError> {
        let binding = env
            .find(name)
            .ok_or_else(|| CompileError::UnboundSymbol(name.to_owned()))?;
        let op = match binding.kind {
            BindingKind::Global => Op::Getgl,
            BindingKind::Local => Op::Getlc,
            BindingKind::Argument => Op::Getag,
        };
        stream.emit(Instruction::new(op, Immediate::Offset(binding.offset)));
        Ok(())
    }

    fn compile_list_literal(
        &mut self,
        env: &mut Environment,
        stream: &mut InstructionStream,
        items: &[Expr],
    ) -> Result<(), CompileError> {
        stream.emit(Instruction::bare(Op::PushZ));
        for item in items.iter().rev() {
            self.compile_expr(env, stream, item)?;
            stream.emit(Instruction::bare(Op::Cons));
        }
        Ok(())
    }

    fn compile_if(
        &mut self,
        env: &mut Environment,
        stream: &mut InstructionStream,
        cond: &Expr,
        then: &Expr,
        els: &Expr,
    ) -> Result<(), CompileError> {
        self.compile_expr(env, stream, cond)?;

        let mut true_branch = InstructionStream::new();
        self.compile_expr(env, &mut true_branch, then)?;
        let mut false_branch = InstructionStream::new();
        self.compile_expr(env, &mut false_branch, els)?;

        // BF jumps past: this BF instruction, the true branch, and the B
        // instruction that follows it.
        let bf_target = stream.len() + 1 + true_branch.len() + 1;
        stream.emit(Instruction::new(Op::Bf, Immediate::Offset(bf_target)));
        stream.extend_from(&true_branch);

        // B jumps past itself and the false branch.
        let b_target = stream.len() + 1 + false_branch.len();
        stream.emit(Instruction::new(Op::B, Immediate::Offset(b_target)));
        stream.extend_from(&false_branch);

        Ok(())
    }

    fn compile_lambda(
        &mut self,
        env: &mut Environment,
        stream: &mut InstructionStream,
        params: &[String],
        body: &Expr,
    ) -> Result<(), CompileError> {
        env.push_scope();
        for (index, param) in params.iter().enumerate() {
            env.add(param.clone(), BindingKind::Argument, index);
        }

        let mut body_stream = InstructionStream::new();
        let result = self.compile_expr(env, &mut body_stream, body);
        env.pop_scope();
        result?;
        body_stream.emit(Instruction::bare(Op::Ret));

        let stream_id = self.streams.insert(body_stream);
        stream.emit(Instruction::new(Op::PushL, Immediate::Offset(stream_id.raw())));
        Ok(())
    }

    fn compile_application(
        &mut self,
        env: &mut Environment,
        stream: &mut InstructionStream,
        callee: &Expr,
        args: &[Expr],
    ) -> Result<(), CompileError> {
        if let Expr::Reference(name) = callee {
            if is_reserved_unimplemented(name) {
                return Err(CompileError::NotYetImplemented(name.clone()));
            }
            if is_builtin(name) {
                for arg in args.iter().rev() {
                    self.compile_expr(env, stream, arg)?;
                }
                stream.emit(Instruction::bare(builtin_op(name)));
                return Ok(());
            }
        }

        for arg in args.iter().rev() {
            self.compile_expr(env, stream, arg)?;
        }
        self.compile_expr(env, stream, callee)?;
        stream.emit(Instruction::bare(Op::Call));
        stream.emit(Instruction::new(Op::Close, Immediate::Offset(args.len())));
        Ok(())
    }
}

fn builtin_op(name: &str) -> Op {
    match name {
        "add" => Op::Add,
        "sub" => Op::Sub,
        "mul" => Op::Mul,
        "div" => Op::Div,
        "gt" => Op::IsGt,
        "get" => Op::IsGet,
        "lt" => Op::IsLt,
        "let" => Op::IsLet,
        "eq" => Op::IsEq,
        "car" => Op::Car,
        "cdr" => Op::Cdr,
        "cons" => Op::Cons,
        "null" => Op::IsNull,
        other => unreachable!("{other} is not a lowered built-in"),
    }
}
