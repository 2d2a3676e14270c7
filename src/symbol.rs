// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Symbol interning.
//!
//! Atto symbols are small integers; the table maps between the integer id
//! and the textual name so the printer and reader can round-trip them.
//! Ids `0` and `1` are reserved at construction time for `false` and `true`
//! respectively, matching the branch opcodes which test a symbol id against
//! those two constants directly.

#[cfg(test)]
mod symbol_test;

use std::collections::HashMap;

/// Interned symbol identifier.
pub type SymbolId = u64;

/// Symbol id reserved for `false`.
pub const FALSE: SymbolId = 0;
/// Symbol id reserved for `true`.
pub const TRUE: SymbolId = 1;

/// Bidirectional symbol name <-> id table.
pub struct SymbolTable {
    names: Vec<String>,
    ids: HashMap<String, SymbolId>,
}

impl SymbolTable {
    /// Create a table with `false`/`true` pre-interned as ids 0/1.
    #[must_use]
    pub fn new() -> Self {
        let mut table = Self {
            names: Vec::new(),
            ids: HashMap::new(),
        };
        let false_id = table.intern("false");
        let true_id = table.intern("true");
        debug_assert_eq!(false_id, FALSE);
        debug_assert_eq!(true_id, TRUE);
        table
    }

    /// Return the id for `name`, interning it if it hasn't been seen before.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(&id) = self.ids.get(name) {
            return id;
        }
        let id = self.names.len() as SymbolId;
        self.names.push(name.to_owned());
        self.ids.insert(name.to_owned(), id);
        id
    }

    /// Look up the id for a name without interning it.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.ids.get(name).copied()
    }

    /// Resolve an id back to its textual name.
    #[must_use]
    pub fn name(&self, id: SymbolId) -> Option<&str> {
        self.names.get(id as usize).map(String::as_str)
    }

    /// Number of interned symbols.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether any symbols beyond the pre-interned `false`/`true` pair have
    /// been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.len() <= 2
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
