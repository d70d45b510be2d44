//! Per-evaluator state stacks
//!
//! Witness frames, expected-type hints, container hints and call frames all
//! follow the same discipline: a push hands back a [`StackGuard`] and the
//! entry disappears when the guard is dropped, whichever way the enclosing
//! scope is left.

use super::trace::CallFrame;
use crate::ast::Type;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

/// Witness key naming the expected result type of the current call
pub const RESULT_KEY: &str = "$result";

/// LIFO stack shared between an evaluator and the guards it hands out
#[derive(Debug)]
pub struct ScopedStack<T> {
    items: Rc<RefCell<Vec<T>>>,
}

impl<T> Clone for ScopedStack<T> {
    fn clone(&self) -> Self {
        ScopedStack {
            items: Rc::clone(&self.items),
        }
    }
}

impl<T> Default for ScopedStack<T> {
    fn default() -> Self {
        ScopedStack {
            items: Rc::new(RefCell::new(Vec::new())),
        }
    }
}

impl<T: Clone> ScopedStack<T> {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use = "the entry is popped when the guard is dropped"]
    pub fn push(&self, item: T) -> StackGuard<T> {
        let mut items = self.items.borrow_mut();
        let depth = items.len();
        items.push(item);
        StackGuard {
            items: Rc::clone(&self.items),
            depth,
        }
    }

    pub fn depth(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn top(&self) -> Option<T> {
        self.items.borrow().last().cloned()
    }

    /// Entries bottom to top.
    pub fn snapshot(&self) -> Vec<T> {
        self.items.borrow().clone()
    }

    /// Overwrite the top entry in place; used when a tail call takes over
    /// the current frame.
    pub fn replace_top(&self, item: T) {
        if let Some(top) = self.items.borrow_mut().last_mut() {
            *top = item;
        }
    }
}

/// Restores its stack to the depth it had before the push
#[derive(Debug)]
pub struct StackGuard<T> {
    items: Rc<RefCell<Vec<T>>>,
    depth: usize,
}

impl<T> Drop for StackGuard<T> {
    fn drop(&mut self) {
        self.items.borrow_mut().truncate(self.depth);
    }
}

/// One frame of witness evidence: key -> concrete types
///
/// Keys are trait names, type-variable names or [`RESULT_KEY`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WitnessFrame {
    entries: IndexMap<String, Vec<Type>>,
}

impl WitnessFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, ty: Type) -> Self {
        self.insert(key, ty);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, ty: Type) {
        self.entries.insert(key.into(), vec![ty]);
    }

    pub fn get(&self, key: &str) -> Option<&[Type]> {
        self.entries.get(key).map(|v| v.as_slice())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

pub type WitnessStack = ScopedStack<Arc<WitnessFrame>>;

impl ScopedStack<Arc<WitnessFrame>> {
    /// Innermost evidence for `key`.
    pub fn lookup(&self, key: &str) -> Option<Vec<Type>> {
        self.items
            .borrow()
            .iter()
            .rev()
            .find_map(|frame| frame.get(key).map(|types| types.to_vec()))
    }

    /// All active evidence folded into one frame, inner entries winning.
    /// `None` when nothing is active.
    pub fn merged(&self) -> Option<Arc<WitnessFrame>> {
        let items = self.items.borrow();
        if items.iter().all(|frame| frame.is_empty()) {
            return None;
        }
        let mut merged = WitnessFrame::new();
        for frame in items.iter() {
            for (key, types) in &frame.entries {
                merged.entries.insert(key.clone(), types.clone());
            }
        }
        Some(Arc::new(merged))
    }
}

/// All evaluation stacks of one interpreter
#[derive(Debug, Clone, Default)]
pub struct EvalStacks {
    pub witnesses: WitnessStack,
    /// Expected result types from annotated expressions
    pub type_context: ScopedStack<Type>,
    /// Container type names set while a `do` chain runs
    pub containers: ScopedStack<String>,
    pub calls: ScopedStack<CallFrame>,
}
