// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! The stack-based bytecode interpreter.
//!
//! Fetch-execute loop, thunk forcing, and every opcode handler. Ported
//! from `original_source/src/vm.c`'s `atto_vm_perform_step`/`atto_run_vm`/
//! `evaluate_thunk` onto a safe `Vec`-backed heap and data stack, in the
//! teacher crate's own "stateless-struct + explicit loop" shape
//! (`vm::Vm::run`).

#[cfg(test)]
mod vm_test;

use crate::heap::{Heap, HeapExhausted, HeapIndex, Object};
use crate::stream::{Immediate, Op, StreamId, StreamTable};
use crate::symbol::{self, SymbolId};

/// A call-stack entry, recording enough of the caller's state to resume
/// it once the callee returns.
#[derive(Debug, Clone, Copy)]
pub struct Frame {
    pub stream: StreamId,
    pub return_offset: usize,
    pub entry_data_stack_size: usize,
}

/// Everything that can go wrong while running bytecode.
#[derive(Debug, Clone, PartialEq)]
pub enum RuntimeError {
    /// Arithmetic/comparison on a non-number, `CAR`/`CDR` on a non-list,
    /// `BT`/`BF` on a non-symbol, `CALL` on a non-lambda.
    TypeError { op: &'static str, found: &'static str },
    /// A fatal, compiler-bug-indicating condition: the opcode table has
    /// no handler for the decoded instruction.
    UnboundOpcode,
    DataStackUnderflow,
    CallStackOverflow,
    DataStackExhausted,
    HeapExhausted,
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TypeError { op, found } => {
                write!(f, "`{op}` cannot operate on a {found}")
            }
            Self::UnboundOpcode => write!(f, "unknown opcode (compiler bug)"),
            Self::DataStackUnderflow => write!(f, "data stack underflow"),
            Self::CallStackOverflow => write!(f, "call stack overflow"),
            Self::DataStackExhausted => write!(f, "data stack exhausted"),
            Self::HeapExhausted => write!(f, "heap exhausted"),
        }
    }
}

impl std::error::Error for RuntimeError {}

impl From<HeapExhausted> for RuntimeError {
    fn from(_: HeapExhausted) -> Self {
        Self::HeapExhausted
    }
}

/// Safety-net cap on call-stack depth, matching the original
/// `ATTO_VM_MAX_CALL_STACK_SIZE`.
pub const DEFAULT_CALL_STACK_CAPACITY: usize = 256;
/// Safety-net cap on data-stack depth, matching the original
/// `ATTO_VM_MAX_DATA_STACK_SIZE`.
pub const DEFAULT_DATA_STACK_CAPACITY: usize = 256;

/// Defines a minimal bitflags-shaped type without pulling in the
/// `bitflags` crate for two bits.
macro_rules! bitflags_like {
    (
        $(#[$meta:meta])*
        pub struct $name:ident: $repr:ty {
            $(const $flag:ident = $value:expr;)*
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name($repr);

        impl $name {
            $(pub const $flag: Self = Self($value);)*

            #[must_use]
            pub const fn empty() -> Self {
                Self(0)
            }

            #[must_use]
            pub const fn contains(self, other: Self) -> bool {
                self.0 & other.0 == other.0
            }

            pub fn insert(&mut self, other: Self) {
                self.0 |= other.0;
            }

            pub fn remove(&mut self, other: Self) {
                self.0 &= !other.0;
            }
        }
    };
}

bitflags_like! {
    /// VM flags byte.
    pub struct VmFlags: u8 {
        const RUNNING = 1 << 0;
        const VERBOSE = 1 << 1;
    }
}

/// The interpreter's entire runtime state.
pub struct Vm {
    pub data_stack: Vec<HeapIndex>,
    pub heap: Heap,
    pub call_stack: Vec<Frame>,
    pub pc_stream: StreamId,
    pub pc_offset: usize,
    pub flags: VmFlags,
}

impl Vm {
    #[must_use]
    pub fn new(heap: Heap) -> Self {
        Self {
            data_stack: Vec::new(),
            heap,
            call_stack: Vec::new(),
            pc_stream: StreamId::new(0),
            pc_offset: 0,
            flags: VmFlags::empty(),
        }
    }

    fn push(&mut self, index: HeapIndex) -> Result<(), RuntimeError> {
        if self.data_stack.len() >= DEFAULT_DATA_STACK_CAPACITY {
            return Err(RuntimeError::DataStackExhausted);
        }
        self.data_stack.push(index);
        Ok(())
    }

    fn pop(&mut self) -> Result<HeapIndex, RuntimeError> {
        self.data_stack.pop().ok_or(RuntimeError::DataStackUnderflow)
    }

    fn top(&self) -> Result<HeapIndex, RuntimeError> {
        self.data_stack
            .last()
            .copied()
            .ok_or(RuntimeError::DataStackUnderflow)
    }

    fn entry_data_stack_size(&self) -> usize {
        self.call_stack
            .last()
            .map_or(0, |f| f.entry_data_stack_size)
    }

    /// Run `streams[start]` from offset 0 to completion (`RET` with an
    /// empty call stack, or `STOP`), returning the index of the value left
    /// on top of the data stack.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] on any type error, resource exhaustion, or
    /// unbound opcode encountered while running.
    pub fn run(&mut self, streams: &StreamTable, start: StreamId) -> Result<HeapIndex, RuntimeError> {
        self.pc_stream = start;
        self.pc_offset = 0;
        self.flags.insert(VmFlags::RUNNING);

        tracing::trace!(stream = start.raw(), "vm: run");

        while self.flags.contains(VmFlags::RUNNING) {
            self.step(streams)?;

            if self.pc_offset >= streams.get(self.pc_stream).len() {
                self.flags.remove(VmFlags::RUNNING);
            }
        }

        self.top()
    }

    /// Run `stream` as a nested invocation (used by thunk forcing):
    /// records the caller's position on the call stack, runs until that
    /// frame is popped again (by an explicit `RET`, or implicitly because
    /// the stream ran out — thunk streams end in `STOP` rather than
    /// `RET`), and restores the caller's position.
    ///
    /// This does not reuse [`Self::run`]'s own loop: `run`'s termination
    /// condition (`pc_offset` past the end of the *current* stream) would
    /// misfire the instant `RET`/`STOP` hands control back to the
    /// caller's position, since the caller is, in general, mid-stream.
    fn run_nested(&mut self, streams: &StreamTable, stream: StreamId) -> Result<HeapIndex, RuntimeError> {
        if self.call_stack.len() >= DEFAULT_CALL_STACK_CAPACITY {
            return Err(RuntimeError::CallStackOverflow);
        }
        let depth = self.call_stack.len();
        self.call_stack.push(Frame {
            stream: self.pc_stream,
            return_offset: self.pc_offset,
            entry_data_stack_size: self.data_stack.len(),
        });
        self.pc_stream = stream;
        self.pc_offset = 0;

        let saved_flags = self.flags;
        self.flags.insert(VmFlags::RUNNING);

        loop {
            if self.call_stack.len() <= depth {
                // RET already popped our frame and restored the caller's position.
                break;
            }
            if self.pc_offset >= streams.get(self.pc_stream).len()
                || !self.flags.contains(VmFlags::RUNNING)
            {
                // Stream ran off the end, or hit STOP, without an explicit
                // RET: unwind the frame ourselves, same bookkeeping RET does.
                let frame = self.call_stack.pop().expect("depth invariant holds");
                let result = self.top()?;
                self.data_stack.truncate(frame.entry_data_stack_size);
                self.data_stack.push(result);
                self.pc_stream = frame.stream;
                self.pc_offset = frame.return_offset;
                break;
            }
            self.step(streams)?;
        }

        let result = self.top();
        self.flags = saved_flags;
        self.flags.insert(VmFlags::RUNNING);
        result
    }

    /// Force a thunk at `index`, memoizing the result in place.
    ///
    /// A no-op if the object at `index` is not a thunk.
    ///
    /// # Errors
    ///
    /// Returns [`RuntimeError`] if running the thunk's stream fails.
    pub fn force(&mut self, streams: &StreamTable, index: HeapIndex) -> Result<(), RuntimeError> {
        let Object::Thunk { stream } = self.heap.get(index) else {
            return Ok(());
        };
        let result = self.run_nested(streams, stream)?;
        let value = self.heap.get(result);
        self.heap.set(index, value);
        Ok(())
    }

    fn force_top_two(&mut self, streams: &StreamTable) -> Result<(Object, Object), RuntimeError> {
        let a_index = self.pop()?;
        let b_index = self.pop()?;
        self.force(streams, a_index)?;
        self.force(streams, b_index)?;
        Ok((self.heap.get(a_index), self.heap.get(b_index)))
    }

    fn step(&mut self, streams: &StreamTable) -> Result<(), RuntimeError> {
        let instr = streams
            .get(self.pc_stream)
            .get(self.pc_offset)
            .ok_or(RuntimeError::UnboundOpcode)?;

        tracing::trace!(op = instr.op.mnemonic(), offset = self.pc_offset, "vm: step");

        match instr.op {
            Op::Nop => self.pc_offset += 1,

            Op::Call => {
                let callee = self.pop()?;
                let Object::Lambda { stream } = self.heap.get(callee) else {
                    return Err(RuntimeError::TypeError {
                        op: "call",
                        found: self.heap.get(callee).kind_name(),
                    });
                };
                if self.call_stack.len() >= DEFAULT_CALL_STACK_CAPACITY {
                    return Err(RuntimeError::CallStackOverflow);
                }
                self.call_stack.push(Frame {
                    stream: self.pc_stream,
                    return_offset: self.pc_offset + 1,
                    entry_data_stack_size: self.data_stack.len(),
                });
                self.pc_stream = stream;
                self.pc_offset = 0;
            }

            Op::Ret => {
                let Some(frame) = self.call_stack.pop() else {
                    self.flags.remove(VmFlags::RUNNING);
                    return Ok(());
                };
                let result = self.top()?;
                self.data_stack.truncate(frame.entry_data_stack_size);
                self.data_stack.push(result);
                self.pc_stream = frame.stream;
                self.pc_offset = frame.return_offset;
            }

            Op::B => {
                let Immediate::Offset(target) = instr.imm else {
                    return Err(RuntimeError::UnboundOpcode);
                };
                self.pc_offset = target;
            }

            Op::Bt | Op::Bf => {
                let Immediate::Offset(target) = instr.imm else {
                    return Err(RuntimeError::UnboundOpcode);
                };
                let index = self.pop()?;
                let Object::Symbol(id) = self.heap.get(index) else {
                    return Err(RuntimeError::TypeError {
                        op: if instr.op == Op::Bt { "bt" } else { "bf" },
                        found: self.heap.get(index).kind_name(),
                    });
                };
                let wants = if instr.op == Op::Bt { symbol::TRUE } else { symbol::FALSE };
                if id == wants {
                    self.pc_offset = target;
                } else {
                    self.pc_offset += 1;
                }
            }

            Op::Close => {
                let Immediate::Offset(count) = instr.imm else {
                    return Err(RuntimeError::UnboundOpcode);
                };
                // `count` args plus the one result currently on top must
                // collapse to just the result: the target slot is below
                // both, measured from the *current* stack depth (the call
                // just returned, so any frame on `call_stack` now is the
                // caller's own — its `entry_data_stack_size` is not this
                // call's argument boundary).
                let result = self.top()?;
                let target = self
                    .data_stack
                    .len()
                    .checked_sub(count + 1)
                    .ok_or(RuntimeError::DataStackUnderflow)?;
                self.data_stack[target] = result;
                self.data_stack.truncate(target + 1);
                self.pc_offset += 1;
            }

            Op::Stop => {
                self.flags.remove(VmFlags::RUNNING);
            }

            Op::Add | Op::Sub | Op::Mul | Op::Div => {
                let (a, b) = self.force_top_two(streams)?;
                let (Object::Number(a), Object::Number(b)) = (a, b) else {
                    return Err(RuntimeError::TypeError {
                        op: instr.op.mnemonic(),
                        found: if matches!(a, Object::Number(_)) { b.kind_name() } else { a.kind_name() },
                    });
                };
                let result = match instr.op {
                    Op::Add => a + b,
                    Op::Sub => a - b,
                    Op::Mul => a * b,
                    Op::Div => a / b,
                    _ => unreachable!(),
                };
                let index = self.heap.alloc(Object::Number(result))?;
                self.push(index)?;
                self.pc_offset += 1;
            }

            Op::IsEq | Op::IsLt | Op::IsLet | Op::IsGt | Op::IsGet => {
                let (a, b) = self.force_top_two(streams)?;
                let (Object::Number(a), Object::Number(b)) = (a, b) else {
                    return Err(RuntimeError::TypeError {
                        op: instr.op.mnemonic(),
                        found: if matches!(a, Object::Number(_)) { b.kind_name() } else { a.kind_name() },
                    });
                };
                let truthy = match instr.op {
                    Op::IsEq => (a - b).abs() < f64::EPSILON,
                    Op::IsLt => a < b,
                    Op::IsLet => a <= b,
                    Op::IsGt => a > b,
                    Op::IsGet => a >= b,
                    _ => unreachable!(),
                };
                let id = if truthy { symbol::TRUE } else { symbol::FALSE };
                let index = self.heap.alloc(Object::Symbol(id))?;
                self.push(index)?;
                self.pc_offset += 1;
            }

            Op::IsSeq | Op::Not | Op::Or | Op::And => return Err(RuntimeError::UnboundOpcode),

            Op::Car => {
                let index = self.pop()?;
                self.force(streams, index)?;
                let Object::List { car, .. } = self.heap.get(index) else {
                    return Err(RuntimeError::TypeError {
                        op: "car",
                        found: self.heap.get(index).kind_name(),
                    });
                };
                self.push(car)?;
                self.pc_offset += 1;
            }

            Op::Cdr => {
                let index = self.pop()?;
                self.force(streams, index)?;
                let Object::List { cdr, .. } = self.heap.get(index) else {
                    return Err(RuntimeError::TypeError {
                        op: "cdr",
                        found: self.heap.get(index).kind_name(),
                    });
                };
                self.push(cdr)?;
                self.pc_offset += 1;
            }

            Op::Cons => {
                let car = self.pop()?;
                let cdr = self.pop()?;
                let index = self.heap.alloc(Object::List { car, cdr })?;
                self.push(index)?;
                self.pc_offset += 1;
            }

            Op::IsNull => {
                let index = self.pop()?;
                self.force(streams, index)?;
                let id = if matches!(self.heap.get(index), Object::Null) {
                    symbol::TRUE
                } else {
                    symbol::FALSE
                };
                let result = self.heap.alloc(Object::Symbol(id))?;
                self.push(result)?;
                self.pc_offset += 1;
            }

            Op::PushN => {
                let Immediate::Number(n) = instr.imm else {
                    return Err(RuntimeError::UnboundOpcode);
                };
                let index = self.heap.alloc(Object::Number(n))?;
                self.push(index)?;
                self.pc_offset += 1;
            }

            Op::PushS => {
                let Immediate::Symbol(id) = instr.imm else {
                    return Err(RuntimeError::UnboundOpcode);
                };
                let index = self.heap.alloc(Object::Symbol(id))?;
                self.push(index)?;
                self.pc_offset += 1;
            }

            Op::PushL => {
                let Immediate::Offset(stream_index) = instr.imm else {
                    return Err(RuntimeError::UnboundOpcode);
                };
                let index = self.heap.alloc(Object::Lambda {
                    stream: StreamId::new(stream_index),
                })?;
                self.push(index)?;
                self.pc_offset += 1;
            }

            Op::PushZ => {
                let index = self.heap.alloc(Object::Null)?;
                self.push(index)?;
                self.pc_offset += 1;
            }

            Op::Dup | Op::Drop | Op::Swap => return Err(RuntimeError::UnboundOpcode),

            Op::Getgl => {
                let Immediate::Offset(k) = instr.imm else {
                    return Err(RuntimeError::UnboundOpcode);
                };
                let index = *self
                    .data_stack
                    .get(k)
                    .ok_or(RuntimeError::DataStackUnderflow)?;
                self.push(index)?;
                self.pc_offset += 1;
            }

            Op::Getlc => {
                let Immediate::Offset(k) = instr.imm else {
                    return Err(RuntimeError::UnboundOpcode);
                };
                let at = self.entry_data_stack_size() + k;
                let index = *self
                    .data_stack
                    .get(at)
                    .ok_or(RuntimeError::DataStackUnderflow)?;
                self.push(index)?;
                self.pc_offset += 1;
            }

            Op::Getag => {
                let Immediate::Offset(k) = instr.imm else {
                    return Err(RuntimeError::UnboundOpcode);
                };
                let entry = self.entry_data_stack_size();
                let at = entry
                    .checked_sub(k + 1)
                    .ok_or(RuntimeError::DataStackUnderflow)?;
                let index = *self
                    .data_stack
                    .get(at)
                    .ok_or(RuntimeError::DataStackUnderflow)?;
                self.push(index)?;
                self.pc_offset += 1;
            }
        }

        Ok(())
    }
}
