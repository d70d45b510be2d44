//! Abstract Syntax Tree definitions
//!
//! The tree arrives already parsed and analyzed; it is the interchange
//! format between an external front end and the evaluator.

pub mod build;
mod expr;
mod span;
mod types;

pub use expr::*;
pub use span::*;
pub use types::*;

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// A program is a sequence of top-level items
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    /// Source file name used in call frames
    #[serde(default)]
    pub file: String,
    pub items: Vec<Item>,
}

/// Top-level item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Item {
    Fn(Arc<FnDef>),
    Data(DataDef),
    Trait(TraitDef),
    Instance(InstanceDef),
    Const(ConstDef),
}

/// Function definition, also used for lambdas and instance methods
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FnDef {
    pub name: String,
    pub params: Vec<Param>,
    #[serde(default)]
    pub ret_ty: Option<Type>,
    /// Trait constraints on type variables: `a: Monoid`
    #[serde(default)]
    pub constraints: Vec<Constraint>,
    /// Dictionary parameters inserted by the analyzer
    #[serde(default)]
    pub witness_params: Vec<WitnessParam>,
    pub body: Spanned<Expr>,
    #[serde(default)]
    pub span: Span,
}

impl FnDef {
    /// Number of parameters that must be supplied by the caller.
    pub fn required_params(&self) -> usize {
        self.params
            .iter()
            .filter(|p| p.default.is_none() && !p.variadic)
            .count()
    }

    /// Whether the last parameter collects surplus arguments.
    pub fn is_variadic(&self) -> bool {
        self.params.last().is_some_and(|p| p.variadic)
    }

    /// Parameters bound one argument each (everything but a variadic tail).
    pub fn fixed_params(&self) -> &[Param] {
        if self.is_variadic() {
            &self.params[..self.params.len() - 1]
        } else {
            &self.params
        }
    }
}

/// Function parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    #[serde(default)]
    pub ty: Option<Type>,
    #[serde(default)]
    pub default: Option<Spanned<Expr>>,
    #[serde(default)]
    pub variadic: bool,
}

impl Param {
    pub fn new(name: impl Into<String>) -> Self {
        Param {
            name: name.into(),
            ty: None,
            default: None,
            variadic: false,
        }
    }

    pub fn typed(name: impl Into<String>, ty: Type) -> Self {
        Param {
            ty: Some(ty),
            ..Param::new(name)
        }
    }
}

/// Trait bound on a type variable
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constraint {
    pub type_var: String,
    pub trait_name: String,
}

/// Named dictionary parameter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessParam {
    pub name: String,
    pub trait_name: String,
}

/// Algebraic data type definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataDef {
    pub name: String,
    pub constructors: Vec<CtorDef>,
}

/// Data constructor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtorDef {
    pub name: String,
    #[serde(default)]
    pub arity: usize,
}

/// Trait (typeclass) declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitDef {
    pub name: String,
    pub methods: Vec<TraitMethod>,
}

/// Method signature inside a trait
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraitMethod {
    pub name: String,
    pub arity: usize,
    /// Where the dispatched type shows up, when the analyzer knows
    #[serde(default)]
    pub dispatch: Option<Vec<DispatchSource>>,
}

/// Position that carries the type a trait method dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchSource {
    /// The nth argument
    Arg(usize),
    /// Only the return type
    Return,
}

/// Trait instance for one or more concrete types
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceDef {
    pub trait_name: String,
    pub types: Vec<Type>,
    pub methods: Vec<Arc<FnDef>>,
}

/// Top-level constant
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConstDef {
    pub name: String,
    #[serde(default)]
    pub ty: Option<Type>,
    pub value: Spanned<Expr>,
}
