//! Environment for variable bindings
//!
//! Each scope keeps its own table behind a reader/writer lock. Lookups take
//! one node's lock at a time and release it before moving to the parent, so
//! readers on different threads never block each other on unrelated scopes.

use super::Value;
use indexmap::IndexMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Shared reference to an environment
pub type EnvRef = Arc<Environment>;

/// Environment holding variable bindings
#[derive(Debug)]
pub struct Environment {
    /// Variable bindings in this scope
    bindings: RwLock<IndexMap<String, Value>>,
    /// Parent environment for lexical scoping
    parent: Option<EnvRef>,
}

impl Environment {
    /// Create a new global environment
    pub fn new() -> Self {
        Environment {
            bindings: RwLock::new(IndexMap::new()),
            parent: None,
        }
    }

    /// Create a new environment with a parent
    pub fn with_parent(parent: EnvRef) -> Self {
        Environment {
            bindings: RwLock::new(IndexMap::new()),
            parent: Some(parent),
        }
    }

    /// Wrap in Arc
    pub fn into_ref(self) -> EnvRef {
        Arc::new(self)
    }

    // A panic while holding the lock leaves the table itself intact.
    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, Value>> {
        self.bindings.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, Value>> {
        self.bindings.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Declare or shadow a variable in the current scope
    pub fn define(&self, name: impl Into<String>, value: Value) {
        self.write().insert(name.into(), value);
    }

    /// Look up a variable in the scope chain
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.read().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.get(name))
    }

    /// Update the innermost scope that already defines `name`.
    /// Returns false when no scope in the chain defines it.
    pub fn set(&self, name: &str, value: Value) -> bool {
        {
            let mut bindings = self.write();
            if let Some(slot) = bindings.get_mut(name) {
                *slot = value;
                return true;
            }
        }
        match &self.parent {
            Some(parent) => parent.set(name, value),
            None => false,
        }
    }

    /// Check if a variable exists in the scope chain
    pub fn contains(&self, name: &str) -> bool {
        if self.read().contains_key(name) {
            return true;
        }
        self.parent.as_ref().is_some_and(|parent| parent.contains(name))
    }

    /// Names bound directly in this scope, in definition order
    pub fn local_names(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn parent(&self) -> Option<&EnvRef> {
        self.parent.as_ref()
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a child environment from a parent reference
pub fn child_env(parent: &EnvRef) -> EnvRef {
    Environment::with_parent(Arc::clone(parent)).into_ref()
}
