//! Lexically scoped bindings for one method body or host unit.
//!
//! [`LocalEnv`] manages a stack of scopes. Locals get a slot in the
//! frame; slots are never reused within a body, so the frame size is the
//! total number of locals ever defined.

use std::collections::HashMap;

use cinder_eval::{FieldHandle, Type};

// ══════════════════════════════════════════════════════════════════════════════
// Scope Kind
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    /// Top level of a host unit; declarations here become persistent fields.
    Host,
    /// Top level of a method or constructor body.
    Method,
    /// A nested block.
    Block,
    /// A loop body (including a `for` header).
    Loop,
}

#[derive(Debug, Clone)]
pub enum Binding {
    Local {
        slot: usize,
        ty: Type,
        readonly: bool,
    },
    /// A top-level variable hoisted into field storage.
    Field { handle: FieldHandle, readonly: bool },
}

#[derive(Debug)]
struct Scope {
    kind: ScopeKind,
    bindings: HashMap<String, Binding>,
}

impl Scope {
    fn new(kind: ScopeKind) -> Self {
        Self {
            kind,
            bindings: HashMap::new(),
        }
    }
}

// ══════════════════════════════════════════════════════════════════════════════
// LocalEnv
// ══════════════════════════════════════════════════════════════════════════════

#[derive(Debug)]
pub struct LocalEnv {
    scopes: Vec<Scope>,
    next_slot: usize,
}

impl LocalEnv {
    pub fn new(kind: ScopeKind) -> Self {
        Self {
            scopes: vec![Scope::new(kind)],
            next_slot: 0,
        }
    }

    pub fn push_scope(&mut self, kind: ScopeKind) {
        self.scopes.push(Scope::new(kind));
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the root scope");
        if self.scopes.len() > 1 {
            self.scopes.pop();
        }
    }

    /// Define a local in the current scope. Returns `None` if the name is
    /// already defined there.
    pub fn define_local(&mut self, name: &str, ty: Type, readonly: bool) -> Option<usize> {
        if self.defined_in_current_scope(name) {
            return None;
        }
        let slot = self.next_slot;
        self.next_slot += 1;
        self.insert(name, Binding::Local { slot, ty, readonly });
        Some(slot)
    }

    /// Define a hoisted field in the current scope. Returns `false` if the
    /// name is already defined there.
    pub fn define_field(&mut self, name: &str, handle: FieldHandle, readonly: bool) -> bool {
        if self.defined_in_current_scope(name) {
            return false;
        }
        self.insert(name, Binding::Field { handle, readonly });
        true
    }

    fn insert(&mut self, name: &str, binding: Binding) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.bindings.insert(name.to_string(), binding);
        }
    }

    /// Look up a binding, innermost scope first.
    pub fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.bindings.get(name))
    }

    pub fn defined_in_current_scope(&self, name: &str) -> bool {
        self.scopes
            .last()
            .is_some_and(|s| s.bindings.contains_key(name))
    }

    /// `true` inside a loop body, where `break` and `continue` are valid.
    pub fn in_loop(&self) -> bool {
        self.scopes.iter().any(|s| s.kind == ScopeKind::Loop)
    }

    /// `true` at the top level of a host unit.
    pub fn at_host_top_level(&self) -> bool {
        self.scopes.len() == 1 && self.scopes[0].kind == ScopeKind::Host
    }

    /// Number of frame slots needed.
    pub fn slot_count(&self) -> usize {
        self.next_slot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inner_scope_shadows_and_pops() {
        let mut env = LocalEnv::new(ScopeKind::Method);
        assert_eq!(env.define_local("x", Type::Int, false), Some(0));
        assert_eq!(env.define_local("x", Type::Int, false), None);
        env.push_scope(ScopeKind::Block);
        assert_eq!(env.define_local("x", Type::String, false), Some(1));
        assert!(matches!(
            env.lookup("x"),
            Some(Binding::Local { slot: 1, .. })
        ));
        env.pop_scope();
        assert!(matches!(
            env.lookup("x"),
            Some(Binding::Local { slot: 0, .. })
        ));
        assert_eq!(env.slot_count(), 2);
    }

    #[test]
    fn loop_tracking() {
        let mut env = LocalEnv::new(ScopeKind::Host);
        assert!(env.at_host_top_level());
        assert!(!env.in_loop());
        env.push_scope(ScopeKind::Loop);
        env.push_scope(ScopeKind::Block);
        assert!(env.in_loop());
        assert!(!env.at_host_top_level());
    }
}
