//! Scope-aware register/switch alias store (C1).
//!
//! LangUMS programs refer to storage by name, `var foo`, a function
//! parameter, a `switch bar`, and this store is what turns those names
//! into physical register or switch ids. Two programs can each declare a
//! variable named `i` inside two different functions without colliding:
//! aliases live in per-function scopes plus one global scope, mirroring
//! the way the source language resolves a name to the innermost
//! declaration that introduces it.
//!
//! Physical ids are handed out from a shared free list, so a name that
//! goes out of scope (a function returns, in effect, because this store
//! has no notion of call stacks, every function's locals live for the
//! whole program) can have its id reclaimed by [`RegisterAliasStore::deallocate`]
//! and reused elsewhere. The lowerer currently never calls `deallocate`
//! for registers that might still be read after a function returns from a
//! call made by another function; it is available for callers that want
//! tighter packing and know their program does not rely on a local
//! surviving across calls.

use std::collections::HashMap;

use umsc_types::{AliasError, RegisterId, Result as TypesResult};

/// Identifies the scope an alias is declared in. `Global` covers
/// top-level `globalvar` declarations; `Function` covers a function's
/// parameters and `var` locals, keyed by the function's declared name
/// (function names are unique at the top level, so the name alone is
/// enough to key a scope, there is no nested function declaration in
/// the source language).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Function(String),
}

/// Maps names to physical register ids within one or more [`Scope`]s,
/// handing out fresh ids from a shared pool and allowing them to be
/// reclaimed.
#[derive(Debug, Default)]
pub struct RegisterAliasStore {
    aliases: HashMap<Scope, HashMap<String, RegisterId>>,
    free_ids: Vec<RegisterId>,
    next_free_id: RegisterId,
}

impl RegisterAliasStore {
    pub fn new() -> Self {
        Self {
            aliases: HashMap::new(),
            free_ids: Vec::new(),
            next_free_id: umsc_types::ReservedRegister::ReservedEnd.id(),
        }
    }

    /// True if `name` resolves to something in `scope` or, failing that,
    /// in the global scope.
    pub fn has_alias(&self, scope: &Scope, name: &str) -> bool {
        self.aliases.get(scope).is_some_and(|m| m.contains_key(name))
            || self.aliases.get(&Scope::Global).is_some_and(|m| m.contains_key(name))
    }

    pub fn has_global_alias(&self, name: &str) -> bool {
        self.aliases.get(&Scope::Global).is_some_and(|m| m.contains_key(name))
    }

    /// Resolves `name` in `scope`, falling back to the global scope if
    /// the function scope has no declaration of that name. This is what
    /// lets a function body reference a `globalvar` directly.
    pub fn get(&self, scope: &Scope, name: &str) -> TypesResult<RegisterId> {
        if let Some(id) = self.aliases.get(scope).and_then(|m| m.get(name)) {
            return Ok(*id);
        }
        self.get_global(name)
    }

    pub fn get_global(&self, name: &str) -> TypesResult<RegisterId> {
        self.aliases
            .get(&Scope::Global)
            .and_then(|m| m.get(name))
            .copied()
            .ok_or_else(|| AliasError::UnknownName(name.to_string()))
    }

    /// Declares `name` in `scope`, allocating a fresh physical id for it.
    /// Re-declaring an existing name in the same scope returns its
    /// existing id rather than allocating a second one, matching a
    /// function that re-enters the same `var` declaration on every call.
    pub fn allocate(&mut self, scope: &Scope, name: &str) -> TypesResult<RegisterId> {
        if let Some(id) = self.aliases.get(scope).and_then(|m| m.get(name)) {
            return Ok(*id);
        }

        let id = self.next_free_id(name)?;
        self.aliases.entry(scope.clone()).or_default().insert(name.to_string(), id);
        Ok(id)
    }

    /// Releases the id bound to `name` in `scope` back to the free list.
    /// A no-op if `name` is not currently declared there.
    pub fn deallocate(&mut self, scope: &Scope, name: &str) {
        if let Some(id) = self.aliases.get_mut(scope).and_then(|m| m.remove(name)) {
            self.free_ids.push(id);
        }
    }

    /// All aliases declared directly in `scope` (not including names that
    /// only resolve there via the global fallback).
    pub fn aliases_in(&self, scope: &Scope) -> impl Iterator<Item = (&str, RegisterId)> {
        self.aliases.get(scope).into_iter().flat_map(|m| m.iter().map(|(k, v)| (k.as_str(), *v)))
    }

    fn next_free_id(&mut self, name: &str) -> TypesResult<RegisterId> {
        if let Some(id) = self.free_ids.pop() {
            return Ok(id);
        }

        if self.next_free_id >= umsc_types::MAX_ADDRESSABLE_REGISTERS {
            return Err(AliasError::Exhausted(name.to_string()));
        }

        let id = self.next_free_id;
        self.next_free_id += 1;
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_name_in_different_functions_gets_different_ids() {
        let mut store = RegisterAliasStore::new();
        let a = store.allocate(&Scope::Function("a".into()), "i").unwrap();
        let b = store.allocate(&Scope::Function("b".into()), "i").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn function_scope_falls_back_to_global() {
        let mut store = RegisterAliasStore::new();
        let g = store.allocate(&Scope::Global, "score").unwrap();
        let resolved = store.get(&Scope::Function("main".into()), "score").unwrap();
        assert_eq!(g, resolved);
    }

    #[test]
    fn redeclaring_in_the_same_scope_reuses_the_id() {
        let mut store = RegisterAliasStore::new();
        let scope = Scope::Function("f".into());
        let first = store.allocate(&scope, "x").unwrap();
        let second = store.allocate(&scope, "x").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn deallocate_then_allocate_reuses_the_freed_id() {
        let mut store = RegisterAliasStore::new();
        let scope = Scope::Function("f".into());
        let first = store.allocate(&scope, "x").unwrap();
        store.deallocate(&scope, "x");
        let second = store.allocate(&scope, "y").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_name_is_an_error() {
        let store = RegisterAliasStore::new();
        assert!(store.get(&Scope::Global, "nope").is_err());
    }
}
