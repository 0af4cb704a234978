use std::collections::{HashMap, HashSet};

use super::types::Ty;

/// One lexical scope: name bindings plus the set of constant names.
#[derive(Debug, Default)]
struct Scope {
    symbols: HashMap<String, Ty>,
    constants: HashSet<String>,
}

/// Chained scopes for one module. Type declarations live in the same table
/// as values, wrapped in the `Type` marker, so using one for the other is
/// diagnosable.
#[derive(Debug)]
pub struct SymbolTable {
    scopes: Vec<Scope>,
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { scopes: vec![Scope::default()] }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(Scope::default());
    }

    pub fn pop_scope(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the global scope");
        self.scopes.pop();
    }

    /// Register a name in the innermost scope. Fails when the name is
    /// already bound in that same scope; shadowing outer scopes is fine.
    pub fn register(&mut self, name: &str, ty: Ty, constant: bool) -> Result<(), ()> {
        let scope = self.scopes.last_mut().expect("symbol table has a scope");
        if scope.symbols.contains_key(name) {
            return Err(());
        }
        if constant {
            scope.constants.insert(name.to_string());
        }
        scope.symbols.insert(name.to_string(), ty);
        Ok(())
    }

    /// Overwrite or insert a binding in the innermost scope.
    pub fn insert(&mut self, name: &str, ty: Ty, constant: bool) {
        let scope = self.scopes.last_mut().expect("symbol table has a scope");
        if constant {
            scope.constants.insert(name.to_string());
        } else {
            scope.constants.remove(name);
        }
        scope.symbols.insert(name.to_string(), ty);
    }

    pub fn resolve(&self, name: &str) -> Option<&Ty> {
        self.scopes.iter().rev().find_map(|scope| scope.symbols.get(name))
    }

    pub fn is_constant(&self, name: &str) -> bool {
        for scope in self.scopes.iter().rev() {
            if scope.symbols.contains_key(name) {
                return scope.constants.contains(name);
            }
        }
        false
    }

    pub fn exists(&self, name: &str) -> bool {
        self.resolve(name).is_some()
    }
}
