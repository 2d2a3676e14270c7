// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Printing and introspection: turning heap values, the data stack, and
//! the environment into human-readable text for the REPL's result line
//! and its `-stack`/`-env`/`-heap-usage` meta-commands. Grounded on the
//! teacher's own `value::print_value` (same "walk the tagged value,
//! recurse into pairs" shape) and `original_source/src/vm.c`'s
//! `pretty_print_stack`.

#[cfg(test)]
mod printer_test;

use crate::env::{visible_bindings, Environment};
use crate::heap::{Heap, HeapIndex, Object};
use crate::symbol::SymbolTable;
use crate::vm::Vm;

/// Render a heap value as Atto source text. Never forces a thunk — this
/// is a pure, read-only view, used after the VM has already produced a
/// value (forcing, if needed, is the caller's job).
#[must_use]
pub fn print_heap_value(heap: &Heap, symbols: &SymbolTable, index: HeapIndex) -> String {
    let mut out = String::new();
    write_value(heap, symbols, index, &mut out);
    out
}

fn write_value(heap: &Heap, symbols: &SymbolTable, index: HeapIndex, out: &mut String) {
    use std::fmt::Write as _;

    match heap.get(index) {
        Object::Null => out.push_str("()"),
        Object::Number(n) => {
            let _ = write!(out, "{n}");
        }
        Object::Symbol(id) => {
            out.push(':');
            out.push_str(symbols.name(id).unwrap_or("?"));
        }
        Object::List { car, cdr } => {
            out.push('(');
            write_value(heap, symbols, car, out);
            write_list_tail(heap, symbols, cdr, out);
            out.push(')');
        }
        Object::Lambda { .. } => out.push_str("#<lambda>"),
        Object::Thunk { .. } => out.push_str("#<thunk>"),
    }
}

fn write_list_tail(heap: &Heap, symbols: &SymbolTable, index: HeapIndex, out: &mut String) {
    match heap.get(index) {
        Object::Null => {}
        Object::List { car, cdr } => {
            out.push(' ');
            write_value(heap, symbols, car, out);
            write_list_tail(heap, symbols, cdr, out);
        }
        _ => {
            // An improper list: render the dotted tail rather than pretend
            // it's a well-formed one.
            out.push_str(" . ");
            write_value(heap, symbols, index, out);
        }
    }
}

/// Render every value currently on the VM's data stack, bottom to top,
/// one per line (REPL `-stack`).
#[must_use]
pub fn pretty_print_stack(vm: &Vm, symbols: &SymbolTable) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    for (depth, &index) in vm.data_stack.iter().enumerate() {
        let value = print_heap_value(&vm.heap, symbols, index);
        let _ = writeln!(out, "{depth:>4}: {value}");
    }
    out
}

/// Render every binding currently visible in `env`, innermost scope
/// first (REPL `-env`).
#[must_use]
pub fn pretty_print_env(env: &Environment) -> String {
    use std::fmt::Write as _;

    let mut out = String::new();
    for binding in visible_bindings(env) {
        let kind = match binding.kind {
            crate::env::BindingKind::Global => "global",
            crate::env::BindingKind::Local => "local",
            crate::env::BindingKind::Argument => "argument",
        };
        let _ = writeln!(out, "{} : {kind}[{}]", binding.name, binding.offset);
    }
    out
}

/// Heap occupancy snapshot for the REPL's `-heap-usage` command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeapUsage {
    pub used: usize,
    pub capacity: Option<usize>,
}

impl std::fmt::Display for HeapUsage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.capacity {
            Some(cap) => write!(f, "{}/{} objects", self.used, cap),
            None => write!(f, "{} objects (unbounded)", self.used),
        }
    }
}

/// Report how much of the heap is in use.
#[must_use]
pub fn heap_usage(heap: &Heap) -> HeapUsage {
    HeapUsage {
        used: heap.used(),
        capacity: heap.remaining().map(|remaining| remaining + heap.used()),
    }
}
