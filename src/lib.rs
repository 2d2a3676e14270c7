// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Atto: a small, lazily-evaluated Lisp compiled to a custom bytecode and
//! run on a stack-based virtual machine with call-by-need semantics for
//! composite expressions.
//!
//! The crate is organized the way `SPEC_FULL.md` §1 lays out the system:
//! a symbol table, a compile-time environment, an object heap, an
//! instruction stream/opcode table, a compiler, a virtual machine, a
//! definition handler, a minimal reader (lexer/parser/semantic pass), a
//! top-level driver tying all of the above into a session, and a
//! printer for introspection. `src/bin/atto.rs` wires [`driver::Session`]
//! to an interactive terminal.

pub mod compiler;
pub mod define;
pub mod driver;
pub mod env;
pub mod heap;
pub mod printer;
pub mod reader;
pub mod stream;
pub mod symbol;
pub mod vm;

pub use driver::{EvalOutcome, Session, SessionError};
