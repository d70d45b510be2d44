//! Type AST nodes

use serde::{Deserialize, Serialize};

/// Type representation as produced by the analyzer.
///
/// Only the shape needed for dispatch is kept: constructor names, type
/// variables and applications. Builtin types are ordinary constructors
/// (`Int`, `String`, `List`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    /// Named type constructor: `Int`, `Option`
    Con(String),
    /// Type variable: `a`, `f`
    Var(String),
    /// Application: `Option<Int>`, `f<a>`
    App { head: Box<Type>, args: Vec<Type> },
    /// Function type: `(Int, Int) -> Int`
    Fn { params: Vec<Type>, ret: Box<Type> },
    /// Tuple type: `(Int, String)`
    Tuple(Vec<Type>),
}

impl Type {
    pub fn con(name: impl Into<String>) -> Self {
        Type::Con(name.into())
    }

    pub fn var(name: impl Into<String>) -> Self {
        Type::Var(name.into())
    }

    pub fn app(head: impl Into<String>, args: Vec<Type>) -> Self {
        Type::App {
            head: Box::new(Type::Con(head.into())),
            args,
        }
    }

    pub fn func(params: Vec<Type>, ret: Type) -> Self {
        Type::Fn {
            params,
            ret: Box::new(ret),
        }
    }

    /// Name of the outermost type constructor, if it is known.
    pub fn constructor_name(&self) -> Option<&str> {
        match self {
            Type::Con(name) => Some(name),
            Type::Var(_) => None,
            Type::App { head, .. } => head.constructor_name(),
            Type::Fn { .. } => Some("Function"),
            Type::Tuple(_) => Some("Tuple"),
        }
    }

    /// Arguments of an applied type (`[Int]` for `Option<Int>`).
    pub fn type_args(&self) -> &[Type] {
        match self {
            Type::App { args, .. } => args,
            Type::Tuple(elems) => elems,
            _ => &[],
        }
    }

    /// Parameter types of a function type.
    pub fn fn_params(&self) -> Option<&[Type]> {
        match self {
            Type::Fn { params, .. } => Some(params),
            _ => None,
        }
    }

    /// Whether the head of this type is still an unbound variable.
    pub fn has_var_head(&self) -> bool {
        match self {
            Type::Var(_) => true,
            Type::App { head, .. } => head.has_var_head(),
            _ => false,
        }
    }

    /// Replace type variables using `lookup`; unbound variables are kept.
    pub fn substitute<F>(&self, lookup: &F) -> Type
    where
        F: Fn(&str) -> Option<Type>,
    {
        match self {
            Type::Con(_) => self.clone(),
            Type::Var(name) => lookup(name).unwrap_or_else(|| self.clone()),
            Type::App { head, args } => {
                let head = head.substitute(lookup);
                let args = args.iter().map(|a| a.substitute(lookup)).collect();
                match head {
                    // `f<Int>` with `f := Option<a>` collapses to `Option<Int>`
                    Type::App { head: inner, .. } => Type::App { head: inner, args },
                    other => Type::App {
                        head: Box::new(other),
                        args,
                    },
                }
            }
            Type::Fn { params, ret } => Type::Fn {
                params: params.iter().map(|p| p.substitute(lookup)).collect(),
                ret: Box::new(ret.substitute(lookup)),
            },
            Type::Tuple(elems) => Type::Tuple(elems.iter().map(|e| e.substitute(lookup)).collect()),
        }
    }
}

/// Lowercase names are type variables (`a`, `f`), uppercase ones constructors.
pub fn is_type_variable_name(name: &str) -> bool {
    name.chars().next().is_some_and(|c| c.is_lowercase())
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Con(name) | Type::Var(name) => write!(f, "{name}"),
            Type::App { head, args } => {
                write!(f, "{head}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            Type::Fn { params, ret } => {
                write!(f, "(")?;
                for (i, p) in params.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{p}")?;
                }
                write!(f, ") -> {ret}")
            }
            Type::Tuple(elems) => {
                write!(f, "(")?;
                for (i, e) in elems.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{e}")?;
                }
                write!(f, ")")
            }
        }
    }
}
