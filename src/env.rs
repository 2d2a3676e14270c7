// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright 2026 Tobias Sarnowski

//! Compile-time environment.
//!
//! An environment is a chain of scopes. Each scope holds its bindings in
//! the order they were added; lookup walks a scope from its most recently
//! added binding backward before falling through to the parent scope, so a
//! later binding of the same name shadows an earlier one without removing
//! it.

#[cfg(test)]
mod env_test;

/// What kind of storage a binding resolves to at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Absolute index into the data stack, fixed at definition time.
    Global,
    /// Offset from the current frame's `entry_data_stack_size`.
    Local,
    /// Offset from the current frame's `entry_data_stack_size`, counting
    /// backward (arguments were pushed before the call).
    Argument,
}

/// A single name -> storage binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Binding {
    pub name: String,
    pub kind: BindingKind,
    pub offset: usize,
}

/// One level of lexical scope.
#[derive(Debug, Clone, Default)]
struct Scope {
    bindings: Vec<Binding>,
}

/// A chain of scopes, innermost first.
///
/// The global environment is a single scope with no parent. Compiling a
/// lambda body pushes a fresh scope on top of (a view into) the enclosing
/// environment; once the body is compiled, that scope is discarded.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    scopes: Vec<Scope>,
}

impl Environment {
    /// Create an environment with a single, empty global scope.
    #[must_use]
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    /// Push a new, empty scope (used when entering a lambda body).
    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    /// Pop the innermost scope (used when leaving a lambda body).
    ///
    /// # Panics
    ///
    /// Panics if called with only the global scope left; that would be a
    /// compiler bug, not a user error.
    pub fn pop_scope(&mut self) {
        assert!(
            self.scopes.len() > 1,
            "cannot pop the global environment scope"
        );
        self.scopes.pop();
    }

    /// Add a binding to the innermost scope. Shadows any existing binding
    /// of the same name without removing it.
    pub fn add(&mut self, name: impl Into<String>, kind: BindingKind, offset: usize) {
        let scope = self.scopes.last_mut().expect("environment has no scopes");
        scope.bindings.push(Binding {
            name: name.into(),
            kind,
            offset,
        });
    }

    /// Resolve a name, searching the innermost scope first (most recent
    /// binding wins) and falling through to enclosing scopes.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Binding> {
        for scope in self.scopes.iter().rev() {
            if let Some(binding) = scope.bindings.iter().rev().find(|b| b.name == name) {
                return Some(binding);
            }
        }
        None
    }

    /// Number of bindings currently visible from the global scope only.
    ///
    /// Used by `define` to compute the global offset a new top-level name
    /// should bind to (the data stack slot it will occupy once executed).
    #[must_use]
    pub fn global_binding_count(&self) -> usize {
        self.scopes[0].bindings.len()
    }

    /// Remove the most recently added global binding, if its name matches.
    ///
    /// Used to roll back a `define` whose body failed to compile.
    pub fn remove_last_global_if(&mut self, name: &str) {
        let global = &mut self.scopes[0].bindings;
        if global.last().is_some_and(|b| b.name == name) {
            global.pop();
        }
    }
}

/// Iterator adapter helper for tests: a flat view of every currently
/// visible binding, innermost scope first.
pub fn visible_bindings(env: &Environment) -> impl Iterator<Item = &Binding> {
    env.scopes.iter().rev().flat_map(|s| s.bindings.iter().rev())
}
