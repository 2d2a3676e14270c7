// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Top-level read-compile-execute driver.
//!
//! [`Session`] is the single owner of everything a run of Atto needs
//! across repeated top-level inputs — symbols, the global environment,
//! compiled streams, and the VM itself — grounded on the teacher's own
//! `Process`/`ProcessPool` "one owner of execution state" shape (see
//! `lona-vm/src/process/mod.rs`), simplified to §5's single-session,
//! single-threaded model: no cross-thread sharing, one owner.

#[cfg(test)]
mod driver_test;

use crate::compiler::{CompileError, Compiler};
use crate::define::{self, DefineError};
use crate::env::Environment;
use crate::heap::{Heap, HeapIndex};
use crate::reader::expr::Expr;
use crate::reader::{read_one, ReadError};
use crate::stream::{Instruction, InstructionStream, Op, StreamTable};
use crate::symbol::SymbolTable;
use crate::vm::{RuntimeError, Vm, VmFlags};

/// The observable outcome of evaluating one top-level form.
#[derive(Debug, Clone, PartialEq)]
pub enum EvalOutcome {
    /// `(define name ...)` ran successfully; carries the defined name.
    Defined(String),
    /// An ordinary expression was compiled and run; carries the heap
    /// index of the resulting value.
    Value(HeapIndex),
}

/// Anything that can fail while evaluating one top-level input.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    Read(ReadError),
    Compile(CompileError),
    Define(DefineError),
    Runtime(RuntimeError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Read(e) => write!(f, "{e}"),
            Self::Compile(e) => write!(f, "{e}"),
            Self::Define(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<ReadError> for SessionError {
    fn from(e: ReadError) -> Self {
        Self::Read(e)
    }
}

impl From<CompileError> for SessionError {
    fn from(e: CompileError) -> Self {
        Self::Compile(e)
    }
}

impl From<DefineError> for SessionError {
    fn from(e: DefineError) -> Self {
        Self::Define(e)
    }
}

impl From<RuntimeError> for SessionError {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}

/// Whether `SessionError` indicates a compiler-bug-grade condition (§7:
/// unknown opcode) that the driver should treat as unrecoverable, versus
/// an ordinary user-facing error that just discards the failed form.
#[must_use]
pub fn is_fatal(error: &SessionError) -> bool {
    matches!(error, SessionError::Runtime(RuntimeError::UnboundOpcode))
}

/// The long-lived state of one Atto session: symbols, the global
/// environment, every compiled stream, and the VM's heap/stacks.
pub struct Session {
    pub symbols: SymbolTable,
    pub global_env: Environment,
    pub streams: StreamTable,
    pub vm: Vm,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self {
            symbols: SymbolTable::new(),
            global_env: Environment::new(),
            streams: StreamTable::new(),
            vm: Vm::new(Heap::new()),
        }
    }

    /// Toggle the VM's verbose (instruction-trace) flag, for the REPL's
    /// `-verbose-on`/`-verbose-off` meta-commands.
    pub fn set_verbose(&mut self, verbose: bool) {
        if verbose {
            self.vm.flags.insert(VmFlags::VERBOSE);
        } else {
            self.vm.flags.remove(VmFlags::VERBOSE);
        }
    }

    /// Read, compile, and run one top-level form from `source`.
    ///
    /// Reads exactly one form; trailing input after it is ignored (the
    /// REPL feeds one line at a time — §6 "one input line").
    ///
    /// # Errors
    ///
    /// Returns [`SessionError`] on any failure in the pipeline: reading,
    /// compiling, defining, or running. Per §7, local recovery happens at
    /// this boundary: a failed form leaves the session exactly as it was
    /// before the call (module the monotone heap growth §5 accepts), with
    /// the one exception of [`RuntimeError::UnboundOpcode`] (see
    /// [`is_fatal`]), which indicates a compiler bug rather than
    /// recoverable user error.
    pub fn eval_str(&mut self, source: &str) -> Result<Option<EvalOutcome>, SessionError> {
        let Some(expr) = read_one(source)? else {
            return Ok(None);
        };
        self.eval_expr(&expr).map(Some)
    }

    fn eval_expr(&mut self, expr: &Expr) -> Result<EvalOutcome, SessionError> {
        if let Expr::Define { name, body } = expr {
            define::define(
                &mut self.vm,
                &mut self.symbols,
                &mut self.streams,
                &mut self.global_env,
                name,
                body,
            )?;
            return Ok(EvalOutcome::Defined(name.clone()));
        }

        let mut stream = InstructionStream::new();
        {
            let mut compiler = Compiler::new(&mut self.symbols, &mut self.streams);
            compiler.compile_expr(&mut self.global_env, &mut stream, expr)?;
        }
        stream.emit(Instruction::bare(Op::Stop));
        let stream_id = self.streams.insert(stream);

        let result = self.vm.run(&self.streams, stream_id)?;
        Ok(EvalOutcome::Value(result))
    }

    /// Force a value and render it as Atto source text, for the REPL's
    /// result line and for tests asserting on the printed form.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if forcing the value fails.
    pub fn print(&mut self, index: HeapIndex) -> Result<String, RuntimeError> {
        self.vm.force(&self.streams, index)?;
        Ok(crate::printer::print_heap_value(&self.vm.heap, &self.symbols, index))
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
