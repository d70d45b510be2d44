//! Helpers for constructing trees programmatically.
//!
//! Embedders that produce trees without going through JSON (and the test
//! suites) use these instead of spelling out `Spanned` wrappers by hand.
//! Nodes built here carry no source position.

use super::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

/// Call ids handed out by [`call`]; explicit ids for hint lookups should
/// stay below this.
const AUTO_NODE_BASE: NodeId = 1 << 24;

static NEXT_NODE: AtomicU32 = AtomicU32::new(AUTO_NODE_BASE);

fn next_node() -> NodeId {
    NEXT_NODE.fetch_add(1, Ordering::Relaxed)
}

pub type E = Spanned<Expr>;

pub fn int(n: i64) -> E {
    Spanned::bare(Expr::Lit(Literal::Int(n)))
}

pub fn float(x: f64) -> E {
    Spanned::bare(Expr::Lit(Literal::Float(x)))
}

pub fn boolean(b: bool) -> E {
    Spanned::bare(Expr::Lit(Literal::Bool(b)))
}

pub fn string(s: &str) -> E {
    Spanned::bare(Expr::Lit(Literal::Str(s.to_string())))
}

pub fn unit() -> E {
    Spanned::bare(Expr::Lit(Literal::Unit))
}

pub fn var(name: &str) -> E {
    Spanned::bare(Expr::Var(name.to_string()))
}

pub fn list(items: Vec<E>) -> E {
    Spanned::bare(Expr::List(items))
}

pub fn tuple(items: Vec<E>) -> E {
    Spanned::bare(Expr::Tuple(items))
}

pub fn record(fields: Vec<(&str, E)>) -> E {
    Spanned::bare(Expr::Record(
        fields.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
    ))
}

/// Call with a fresh node id.
pub fn call(callee: E, args: Vec<E>) -> E {
    call_at(next_node(), callee, args)
}

/// Call with an explicit node id, for tests that attach analyzer hints.
pub fn call_at(id: NodeId, callee: E, args: Vec<E>) -> E {
    Spanned::bare(Expr::Call {
        id,
        callee: Box::new(callee),
        args,
    })
}

pub fn method_call(receiver: E, method: &str, args: Vec<E>) -> E {
    Spanned::bare(Expr::MethodCall {
        id: next_node(),
        receiver: Box::new(receiver),
        method: method.to_string(),
        args,
    })
}

pub fn field(target: E, name: &str) -> E {
    Spanned::bare(Expr::Field {
        target: Box::new(target),
        field: name.to_string(),
    })
}

pub fn binary(left: E, op: BinOp, right: E) -> E {
    Spanned::bare(Expr::Binary {
        left: Box::new(left),
        op,
        right: Box::new(right),
    })
}

pub fn unary(op: UnOp, expr: E) -> E {
    Spanned::bare(Expr::Unary {
        op,
        expr: Box::new(expr),
    })
}

pub fn if_(cond: E, then_branch: E, else_branch: E) -> E {
    Spanned::bare(Expr::If {
        cond: Box::new(cond),
        then_branch: Box::new(then_branch),
        else_branch: Box::new(else_branch),
    })
}

pub fn let_(name: &str, ty: Option<Type>, value: E, body: E) -> E {
    Spanned::bare(Expr::Let {
        name: name.to_string(),
        ty,
        value: Box::new(value),
        body: Box::new(body),
    })
}

pub fn block(exprs: Vec<E>) -> E {
    Spanned::bare(Expr::Block(exprs))
}

pub fn assign(name: &str, value: E) -> E {
    Spanned::bare(Expr::Assign {
        name: name.to_string(),
        value: Box::new(value),
    })
}

pub fn annotated(expr: E, ty: Type) -> E {
    Spanned::bare(Expr::Annotated {
        expr: Box::new(expr),
        ty,
    })
}

pub fn dict(trait_name: &str, types: Vec<Type>) -> E {
    Spanned::bare(Expr::Dict {
        trait_name: trait_name.to_string(),
        types,
    })
}

pub fn compose(outer: E, inner: E) -> E {
    Spanned::bare(Expr::Compose {
        outer: Box::new(outer),
        inner: Box::new(inner),
    })
}

pub fn do_(binds: Vec<(&str, E)>, body: E) -> E {
    Spanned::bare(Expr::Do {
        binds: binds
            .into_iter()
            .map(|(name, value)| DoBind {
                name: name.to_string(),
                value,
            })
            .collect(),
        body: Box::new(body),
    })
}

pub fn try_(expr: E) -> E {
    Spanned::bare(Expr::Try(Box::new(expr)))
}

pub fn match_(expr: E, arms: Vec<(Pattern, E)>) -> E {
    Spanned::bare(Expr::Match {
        expr: Box::new(expr),
        arms: arms
            .into_iter()
            .map(|(pattern, body)| MatchArm {
                pattern: Spanned::bare(pattern),
                body,
            })
            .collect(),
    })
}

pub fn lambda(params: &[&str], body: E) -> E {
    Spanned::bare(Expr::Lambda(Arc::new(func(
        "<lambda>",
        params.iter().map(|p| Param::new(*p)).collect(),
        body,
    ))))
}

/// A function definition with untyped parameters and no return type.
pub fn func(name: &str, params: Vec<Param>, body: E) -> FnDef {
    FnDef {
        name: name.to_string(),
        params,
        ret_ty: None,
        constraints: Vec::new(),
        witness_params: Vec::new(),
        body,
        span: Span::unknown(),
    }
}

pub fn params(names: &[&str]) -> Vec<Param> {
    names.iter().map(|n| Param::new(*n)).collect()
}

pub fn fn_item(def: FnDef) -> Item {
    Item::Fn(Arc::new(def))
}

pub fn data(name: &str, ctors: &[(&str, usize)]) -> Item {
    Item::Data(DataDef {
        name: name.to_string(),
        constructors: ctors
            .iter()
            .map(|(n, arity)| CtorDef {
                name: n.to_string(),
                arity: *arity,
            })
            .collect(),
    })
}

pub fn trait_(name: &str, methods: &[(&str, usize)]) -> Item {
    Item::Trait(TraitDef {
        name: name.to_string(),
        methods: methods
            .iter()
            .map(|(n, arity)| TraitMethod {
                name: n.to_string(),
                arity: *arity,
                dispatch: None,
            })
            .collect(),
    })
}

pub fn instance(trait_name: &str, types: Vec<Type>, methods: Vec<FnDef>) -> Item {
    Item::Instance(InstanceDef {
        trait_name: trait_name.to_string(),
        types,
        methods: methods.into_iter().map(Arc::new).collect(),
    })
}

pub fn constant(name: &str, ty: Option<Type>, value: E) -> Item {
    Item::Const(ConstDef {
        name: name.to_string(),
        ty,
        value,
    })
}
