//! Expression AST nodes

use super::{FnDef, Spanned, Type};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Identity of a call node, as assigned by the analyzer.
///
/// Analyzer hints (inferred types, generic instantiations) are keyed by it.
pub type NodeId = u32;

/// Literal value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(String),
    Unit,
}

/// Expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Literal
    Lit(Literal),

    /// Variable reference
    Var(String),

    /// List literal: [a, b, c]
    List(Vec<Spanned<Expr>>),

    /// Tuple literal: (a, b)
    Tuple(Vec<Spanned<Expr>>),

    /// Record literal: { x: 1, y: 2 }
    Record(Vec<(String, Spanned<Expr>)>),

    /// Integer range: start..end (end exclusive)
    Range {
        start: Box<Spanned<Expr>>,
        end: Box<Spanned<Expr>>,
    },

    /// Anonymous function
    Lambda(Arc<FnDef>),

    /// Function application
    Call {
        id: NodeId,
        callee: Box<Spanned<Expr>>,
        args: Vec<Spanned<Expr>>,
    },

    /// Method call: receiver.method(args)
    MethodCall {
        id: NodeId,
        receiver: Box<Spanned<Expr>>,
        method: String,
        args: Vec<Spanned<Expr>>,
    },

    /// Field access: expr.field
    Field {
        target: Box<Spanned<Expr>>,
        field: String,
    },

    /// Binary operation
    Binary {
        left: Box<Spanned<Expr>>,
        op: BinOp,
        right: Box<Spanned<Expr>>,
    },

    /// Unary operation
    Unary {
        op: UnOp,
        expr: Box<Spanned<Expr>>,
    },

    /// Operator used as a value: (+)
    OperatorRef(BinOp),

    /// Function composition: outer . inner
    Compose {
        outer: Box<Spanned<Expr>>,
        inner: Box<Spanned<Expr>>,
    },

    /// Conditional: if cond then then_branch else else_branch
    If {
        cond: Box<Spanned<Expr>>,
        then_branch: Box<Spanned<Expr>>,
        else_branch: Box<Spanned<Expr>>,
    },

    /// Let binding: let name: ty = value; body
    Let {
        name: String,
        #[serde(default)]
        ty: Option<Type>,
        value: Box<Spanned<Expr>>,
        body: Box<Spanned<Expr>>,
    },

    /// Block: { expr1; expr2; ...; result }
    Block(Vec<Spanned<Expr>>),

    /// Assignment to an existing variable: name = value
    Assign {
        name: String,
        value: Box<Spanned<Expr>>,
    },

    /// Expression under an explicit type annotation: (expr : ty)
    Annotated {
        expr: Box<Spanned<Expr>>,
        ty: Type,
    },

    /// Match expression
    Match {
        expr: Box<Spanned<Expr>>,
        arms: Vec<MatchArm>,
    },

    /// Explicit trait dictionary inserted by the analyzer.
    /// An empty `types` list is a placeholder dictionary.
    Dict {
        trait_name: String,
        #[serde(default)]
        types: Vec<Type>,
    },

    /// Monadic bind chain: do { x <- m; y <- n; body }
    Do {
        binds: Vec<DoBind>,
        body: Box<Spanned<Expr>>,
    },

    /// Evaluate and turn a runtime error into an `Error` value
    Try(Box<Spanned<Expr>>),
}

/// One `name <- value` step of a do block
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoBind {
    pub name: String,
    pub value: Spanned<Expr>,
}

/// A single arm in a match expression
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchArm {
    pub pattern: Spanned<Pattern>,
    pub body: Spanned<Expr>,
}

/// Pattern for match expressions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Pattern {
    /// Wildcard pattern: _
    Wildcard,
    /// Variable binding: name
    Var(String),
    /// Literal pattern: 42, true, etc.
    Literal(Literal),
    /// Data constructor: Some(x), None
    Constructor { name: String, fields: Vec<Pattern> },
    /// Tuple pattern: (a, b)
    Tuple(Vec<Pattern>),
    /// Record pattern: { x: pat, y: pat }
    Record(Vec<(String, Pattern)>),
}

/// Binary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinOp {
    // Arithmetic
    Add,
    Sub,
    Mul,
    Div,
    Mod,

    // Comparison
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    // Logical
    And,
    Or,
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinOp::Add => write!(f, "+"),
            BinOp::Sub => write!(f, "-"),
            BinOp::Mul => write!(f, "*"),
            BinOp::Div => write!(f, "/"),
            BinOp::Mod => write!(f, "%"),
            BinOp::Eq => write!(f, "=="),
            BinOp::Ne => write!(f, "!="),
            BinOp::Lt => write!(f, "<"),
            BinOp::Gt => write!(f, ">"),
            BinOp::Le => write!(f, "<="),
            BinOp::Ge => write!(f, ">="),
            BinOp::And => write!(f, "&&"),
            BinOp::Or => write!(f, "||"),
        }
    }
}

/// Unary operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnOp {
    /// Negation (-)
    Neg,
    /// Logical not
    Not,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Neg => write!(f, "-"),
            UnOp::Not => write!(f, "!"),
        }
    }
}
