//! Trait instance tables owned by one interpreter

use super::value::Value;
use crate::ast::{FnDef, TraitDef, Type, TraitMethod};
use crate::hints::AnalyzerHints;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Instance key: one type constructor name per trait parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeKey(pub Vec<String>);

impl TypeKey {
    pub fn single(name: impl Into<String>) -> Self {
        TypeKey(vec![name.into()])
    }

    /// Key from declared instance types. Type variables keep their
    /// (lowercase) name so they can match anything.
    pub fn from_types(types: &[Type]) -> Self {
        TypeKey(
            types
                .iter()
                .map(|t| match t {
                    Type::Var(name) => name.clone(),
                    other => other.constructor_name().unwrap_or("?").to_string(),
                })
                .collect(),
        )
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for TypeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join(", "))
    }
}

/// Method table of one instance, in definition order
pub type MethodTable = IndexMap<String, Value>;

#[derive(Debug, Default)]
pub struct TraitRegistry {
    /// Declared methods per trait
    traits: HashMap<String, Vec<TraitMethod>>,
    /// trait -> instance key -> methods, keys in registration order
    instances: HashMap<String, IndexMap<TypeKey, MethodTable>>,
    method_order: HashMap<String, Vec<String>>,
    super_traits: HashMap<String, Vec<String>>,
    user_defaults: HashMap<String, IndexMap<String, Arc<FnDef>>>,
    builtin_defaults: HashMap<String, IndexMap<String, Value>>,
    aliases: HashMap<String, Type>,
}

impl TraitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed trait metadata from analyzer hints.
    pub fn absorb_hints(&mut self, hints: &AnalyzerHints) {
        for (name, order) in &hints.method_order {
            self.method_order.insert(name.clone(), order.clone());
        }
        for (name, supers) in &hints.super_traits {
            self.super_traits.insert(name.clone(), supers.clone());
        }
        for (name, defaults) in &hints.trait_defaults {
            let table = self.user_defaults.entry(name.clone()).or_default();
            for def in defaults {
                table.insert(def.name.clone(), Arc::clone(def));
            }
        }
        for (alias, target) in &hints.aliases {
            self.aliases.insert(alias.clone(), target.clone());
        }
    }

    pub fn declare_trait(&mut self, def: &TraitDef) {
        self.method_order
            .entry(def.name.clone())
            .or_insert_with(|| def.methods.iter().map(|m| m.name.clone()).collect());
        self.traits.insert(def.name.clone(), def.methods.clone());
    }

    pub fn trait_method(&self, trait_name: &str, method: &str) -> Option<&TraitMethod> {
        self.traits.get(trait_name)?.iter().find(|m| m.name == method)
    }

    pub fn register_method(&mut self, trait_name: &str, key: TypeKey, method: &str, value: Value) {
        self.instances
            .entry(trait_name.to_string())
            .or_default()
            .entry(key)
            .or_default()
            .insert(method.to_string(), value);
    }

    /// Make sure an instance entry exists even if it defines no methods.
    pub fn register_instance(&mut self, trait_name: &str, key: TypeKey) {
        self.instances
            .entry(trait_name.to_string())
            .or_default()
            .entry(key)
            .or_default();
    }

    pub fn lookup_method(&self, trait_name: &str, key: &TypeKey, method: &str) -> Option<Value> {
        self.instances.get(trait_name)?.get(key)?.get(method).cloned()
    }

    pub fn has_instance(&self, trait_name: &str, key: &TypeKey) -> bool {
        self.instances
            .get(trait_name)
            .is_some_and(|table| table.contains_key(key))
    }

    /// Instance keys of a trait in registration order.
    pub fn instance_keys(&self, trait_name: &str) -> Vec<TypeKey> {
        self.instances
            .get(trait_name)
            .map(|table| table.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of type parameters of a trait, as seen from its first
    /// registered instance.
    pub fn key_arity(&self, trait_name: &str) -> Option<usize> {
        self.instances.get(trait_name)?.keys().next().map(TypeKey::len)
    }

    /// Method names in dictionary order
    pub fn method_names(&self, trait_name: &str) -> &[String] {
        self.method_order
            .get(trait_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn super_traits(&self, trait_name: &str) -> &[String] {
        self.super_traits
            .get(trait_name)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn user_default(&self, trait_name: &str, method: &str) -> Option<Arc<FnDef>> {
        self.user_defaults.get(trait_name)?.get(method).cloned()
    }

    pub fn builtin_default(&self, trait_name: &str, method: &str) -> Option<Value> {
        self.builtin_defaults.get(trait_name)?.get(method).cloned()
    }

    pub fn register_builtin_default(&mut self, trait_name: &str, method: &str, value: Value) {
        self.builtin_defaults
            .entry(trait_name.to_string())
            .or_default()
            .insert(method.to_string(), value);
    }

    /// Constructor name an alias stands for.
    pub fn alias_target(&self, name: &str) -> Option<&str> {
        self.aliases.get(name)?.constructor_name()
    }
}
