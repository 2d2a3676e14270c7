// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

use super::*;

#[test]
fn pre_interns_false_and_true() {
    let table = SymbolTable::new();
    assert_eq!(table.name(FALSE), Some("false"));
    assert_eq!(table.name(TRUE), Some("true"));
}

#[test]
fn interning_is_idempotent() {
    let mut table = SymbolTable::new();
    let a = table.intern("foo");
    let b = table.intern("foo");
    assert_eq!(a, b);
    assert_eq!(table.name(a), Some("foo"));
}

#[test]
fn distinct_names_get_distinct_ids() {
    let mut table = SymbolTable::new();
    let a = table.intern("foo");
    let b = table.intern("bar");
    assert_ne!(a, b);
}

#[test]
fn lookup_does_not_intern() {
    let mut table = SymbolTable::new();
    assert_eq!(table.lookup("never-seen"), None);
    table.intern("never-seen");
    assert_eq!(table.lookup("never-seen"), Some(2));
}

#[test]
fn is_empty_ignores_the_pre_interned_false_true_pair() {
    let mut table = SymbolTable::new();
    assert_eq!(table.len(), 2);
    assert!(table.is_empty());
    table.intern("foo");
    assert_eq!(table.len(), 3);
    assert!(!table.is_empty());
}
