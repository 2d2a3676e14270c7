// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Definition handler.
//!
//! `(define name body)` pre-binds `name` as a global *before* compiling
//! `body`, so a recursive reference inside the body resolves; it then
//! dispatches on the body's shape, running immediate forms eagerly and
//! heap-allocating a thunk for anything that needs lazy evaluation. Ported
//! from `original_source/src/compiler.c`'s `compile_definition`.

#[cfg(test)]
mod define_test;

use crate::compiler::{CompileError, Compiler};
use crate::env::{BindingKind, Environment};
use crate::heap::{HeapIndex, Object};
use crate::reader::expr::Expr;
use crate::stream::{Instruction, InstructionStream, Op, StreamTable};
use crate::symbol::SymbolTable;
use crate::vm::{RuntimeError, Vm};

/// Failure while defining a top-level name.
#[derive(Debug, Clone, PartialEq)]
pub enum DefineError {
    Compile(CompileError),
    Runtime(RuntimeError),
}

impl std::fmt::Display for DefineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Compile(e) => write!(f, "{e}"),
            Self::Runtime(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for DefineError {}

impl From<CompileError> for DefineError {
    fn from(e: CompileError) -> Self {
        Self::Compile(e)
    }
}

impl From<RuntimeError> for DefineError {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}

/// Whether a body is run immediately (to fill its pre-bound global slot
/// eagerly) or deferred behind a thunk. Per §4.5: literals, symbols,
/// references, and lambdas are denotationally simple and immediate;
/// lists, `if`, and applications are the subjects of lazy evaluation.
fn is_immediate(body: &Expr) -> bool {
    matches!(
        body,
        Expr::Number(_) | Expr::Symbol(_) | Expr::Reference(_) | Expr::Lambda { .. }
    )
}

/// Define `name` as `body` in the global environment, per §4.5.
///
/// On success, the global environment gains a binding for `name` whose
/// data-stack slot holds the computed (or thunked) value. On failure, the
/// pre-bound global entry and the stream allocated for its body are both
/// rolled back (§9 Open Question — this implementation chooses rollback;
/// see `DESIGN.md`), so a failed `define` leaves the environment exactly
/// as it was before the attempt.
///
/// # Errors
///
/// Returns [`DefineError`] if the body fails to compile or fails to run.
pub fn define(
    vm: &mut Vm,
    symbols: &mut SymbolTable,
    streams: &mut StreamTable,
    global_env: &mut Environment,
    name: &str,
    body: &Expr,
) -> Result<(), DefineError> {
    let global_offset = vm.data_stack.len();
    global_env.add(name.to_owned(), BindingKind::Global, global_offset);

    let mut body_stream = InstructionStream::new();
    let compile_result = {
        let mut compiler = Compiler::new(symbols, streams);
        compiler.compile_expr(global_env, &mut body_stream, body)
    };

    let stream_id = match compile_result {
        Ok(_) => {
            body_stream.emit(Instruction::bare(Op::Stop));
            streams.insert(body_stream)
        }
        Err(e) => {
            global_env.remove_last_global_if(name);
            return Err(e.into());
        }
    };

    if is_immediate(body) {
        if let Err(e) = vm.run(streams, stream_id) {
            vm.data_stack.truncate(global_offset);
            global_env.remove_last_global_if(name);
            streams.remove_last_if(stream_id);
            return Err(e.into());
        }
    } else {
        let index: HeapIndex = match vm.heap.alloc(Object::Thunk { stream: stream_id }) {
            Ok(index) => index,
            Err(e) => {
                global_env.remove_last_global_if(name);
                streams.remove_last_if(stream_id);
                return Err(RuntimeError::from(e).into());
            }
        };
        vm.data_stack.push(index);
    }

    Ok(())
}
