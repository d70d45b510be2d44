//! Expression evaluator

use super::apply::{callable_name, CallSite};
use super::builtins::{self, BuiltinSpec};
use super::env::{child_env, EnvRef, Environment};
use super::error::{InterpResult, RuntimeError};
use super::interop::{FallbackCallHandler, HostBridge};
use super::registry::{TraitRegistry, TypeKey};
use super::stacks::EvalStacks;
use super::value::{Builtin, ClassMethod, Closure, ComposedFunction, ConstructorFn, Dictionary, Value};
use crate::ast::{BinOp, DoBind, Expr, Item, Literal, Pattern, Spanned, Type, UnOp};
use crate::config::EvalConfig;
use crate::hints::{AnalyzedProgram, AnalyzerHints};
use indexmap::IndexMap;
use std::cmp::Ordering;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::debug;

/// Result of evaluating an expression that may sit in tail position
pub(crate) enum Step {
    Done(Value),
    /// Call left for the enclosing trampoline
    Tail(TailCall),
}

pub(crate) struct TailCall {
    pub callee: Value,
    pub args: Vec<Value>,
    pub site: CallSite,
}

/// What the enclosing expression expects of the one being evaluated
#[derive(Debug, Clone, Copy, Default)]
struct EvalCtx<'a> {
    /// The value becomes the result of the current function body
    tail: bool,
    /// Declared type of the binding or annotation around this expression
    annotation: Option<&'a Type>,
}

impl<'a> EvalCtx<'a> {
    fn tail() -> Self {
        EvalCtx {
            tail: true,
            annotation: None,
        }
    }

    fn annotated(ty: Option<&'a Type>) -> Self {
        EvalCtx {
            tail: false,
            annotation: ty,
        }
    }
}

/// The interpreter
pub struct Interpreter {
    /// Global environment
    pub(super) global_env: EnvRef,
    pub(super) registry: TraitRegistry,
    pub(super) hints: AnalyzerHints,
    pub(super) config: EvalConfig,
    pub(super) stacks: EvalStacks,
    /// Source file used in call frames
    pub(super) file: String,
    pub(super) host_bridge: Option<Arc<dyn HostBridge>>,
    pub(super) fallback: Option<Arc<dyn FallbackCallHandler>>,
}

impl Interpreter {
    /// Create a new interpreter
    pub fn new() -> Self {
        Self::with_config(EvalConfig::default())
    }

    pub fn with_config(config: EvalConfig) -> Self {
        let mut interp = Interpreter {
            global_env: Environment::new().into_ref(),
            registry: TraitRegistry::new(),
            hints: AnalyzerHints::default(),
            config,
            stacks: EvalStacks::default(),
            file: "<input>".to_string(),
            host_bridge: None,
            fallback: None,
        };
        builtins::register_core(&mut interp);
        interp
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    pub fn global_env(&self) -> &EnvRef {
        &self.global_env
    }

    pub fn registry(&self) -> &TraitRegistry {
        &self.registry
    }

    /// Logical calls currently in progress
    pub fn call_depth(&self) -> usize {
        self.stacks.calls.depth()
    }

    pub fn witness_depth(&self) -> usize {
        self.stacks.witnesses.depth()
    }

    pub fn type_context_depth(&self) -> usize {
        self.stacks.type_context.depth()
    }

    pub fn set_host_bridge(&mut self, bridge: Arc<dyn HostBridge>) {
        self.host_bridge = Some(bridge);
    }

    pub fn set_fallback_handler(&mut self, handler: Arc<dyn FallbackCallHandler>) {
        self.fallback = Some(handler);
    }

    pub fn define_global(&mut self, name: impl Into<String>, value: Value) {
        self.global_env.define(name, value);
    }

    pub fn register_builtin(&mut self, spec: BuiltinSpec) {
        let name = spec.name().to_string();
        self.global_env.define(name, spec.into_value());
    }

    /// Builtin used when no instance or user default implements a method.
    pub fn register_trait_default(&mut self, trait_name: &str, method: &str, spec: BuiltinSpec) {
        self.registry
            .register_builtin_default(trait_name, method, spec.into_value());
    }

    /// Add a method to an instance from outside a program.
    pub fn register_instance_method(&mut self, trait_name: &str, types: &[Type], method: &str, value: Value) {
        self.registry
            .register_method(trait_name, TypeKey::from_types(types), method, value);
    }

    /// Load a program: declarations first, then constants in order.
    pub fn load(&mut self, analyzed: &AnalyzedProgram) -> InterpResult<()> {
        let program = &analyzed.program;
        if !program.file.is_empty() {
            self.file = program.file.clone();
        }
        self.hints = analyzed.hints.clone();
        self.registry.absorb_hints(&analyzed.hints);

        for item in &program.items {
            match item {
                Item::Fn(def) => {
                    let closure = Closure::new(Arc::clone(def), Arc::clone(&self.global_env));
                    self.global_env
                        .define(def.name.clone(), Value::Function(Arc::new(closure)));
                }
                Item::Data(def) => {
                    for ctor in &def.constructors {
                        let value = if ctor.arity == 0 {
                            Value::data(&def.name, &ctor.name, Vec::new())
                        } else {
                            Value::Constructor(Arc::new(ConstructorFn {
                                type_name: def.name.clone(),
                                name: ctor.name.clone(),
                                arity: ctor.arity,
                            }))
                        };
                        self.global_env.define(ctor.name.clone(), value);
                    }
                }
                Item::Trait(def) => {
                    self.registry.declare_trait(def);
                    for method in &def.methods {
                        let value = Value::ClassMethod(Arc::new(ClassMethod {
                            trait_name: def.name.clone(),
                            method: method.name.clone(),
                            arity: method.arity,
                            dispatch: method.dispatch.clone(),
                        }));
                        self.global_env.define(method.name.clone(), value);
                    }
                }
                Item::Instance(def) => {
                    let key = TypeKey::from_types(&def.types);
                    self.registry.register_instance(&def.trait_name, key.clone());
                    for method in &def.methods {
                        let closure = Closure {
                            owner_trait: Some(def.trait_name.clone()),
                            ..Closure::new(Arc::clone(method), Arc::clone(&self.global_env))
                        };
                        self.registry.register_method(
                            &def.trait_name,
                            key.clone(),
                            &method.name,
                            Value::Function(Arc::new(closure)),
                        );
                    }
                }
                Item::Const(_) => {}
            }
        }

        let global = Arc::clone(&self.global_env);
        for item in &program.items {
            if let Item::Const(def) = item {
                let value = self.eval_with(&def.value, &global, EvalCtx::annotated(def.ty.as_ref()))?;
                global.define(def.name.clone(), value);
            }
        }
        debug!(file = %self.file, items = program.items.len(), "program loaded");
        Ok(())
    }

    /// Run the program's `main`
    pub fn run(&mut self) -> InterpResult<Value> {
        self.call_function("main", Vec::new())
    }

    /// Call a global by name
    pub fn call_function(&mut self, name: &str, args: Vec<Value>) -> InterpResult<Value> {
        let callee = self
            .global_env
            .get(name)
            .ok_or_else(|| RuntimeError::undefined_variable(name))?;
        let site = CallSite::named(name).with_env(Arc::clone(&self.global_env));
        self.apply(callee, args, &site)
    }

    /// Evaluate an expression in the global environment
    pub fn eval_expr(&mut self, expr: &Spanned<Expr>) -> InterpResult<Value> {
        let global = Arc::clone(&self.global_env);
        self.eval(expr, &global)
    }

    /// Evaluate an expression whose result is needed here
    pub(crate) fn eval(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        self.eval_with(expr, env, EvalCtx::default())
    }

    /// Evaluate a function body; a call in tail position comes back as
    /// [`Step::Tail`] instead of being applied.
    pub(crate) fn eval_tail(&mut self, expr: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Step> {
        self.eval_step(expr, env, EvalCtx::tail())
    }

    fn eval_with(&mut self, expr: &Spanned<Expr>, env: &EnvRef, ctx: EvalCtx<'_>) -> InterpResult<Value> {
        match self.eval_step(expr, env, EvalCtx { tail: false, ..ctx })? {
            Step::Done(value) => Ok(value),
            Step::Tail(call) => self.apply(call.callee, call.args, &call.site),
        }
    }

    /// Evaluate with automatic stack growth for deep recursion
    fn eval_step(&mut self, expr: &Spanned<Expr>, env: &EnvRef, ctx: EvalCtx<'_>) -> InterpResult<Step> {
        let (red_zone, grow) = (self.config.stack_red_zone, self.config.stack_grow_size);
        stacker::maybe_grow(red_zone, grow, || self.eval_inner(expr, env, ctx))
            .map_err(|e| e.or_location(expr.span))
    }

    fn eval_inner(&mut self, expr: &Spanned<Expr>, env: &EnvRef, ctx: EvalCtx<'_>) -> InterpResult<Step> {
        let value = match &expr.node {
            Expr::Lit(lit) => literal_value(lit),

            Expr::Var(name) => env
                .get(name)
                .ok_or_else(|| RuntimeError::undefined_variable(name))?,

            Expr::List(items) => Value::list(self.eval_all(items, env)?),

            Expr::Tuple(items) => Value::tuple(self.eval_all(items, env)?),

            Expr::Record(fields) => {
                let mut record = IndexMap::new();
                for (name, value) in fields {
                    record.insert(name.clone(), self.eval(value, env)?);
                }
                Value::Record(Arc::new(record))
            }

            Expr::Range { start, end } => {
                let start_val = self.eval(start, env)?;
                let end_val = self.eval(end, env)?;
                match (&start_val, &end_val) {
                    (Value::Int(s), Value::Int(e)) => Value::Range(*s, *e),
                    _ => {
                        return Err(RuntimeError::type_error(
                            "Int..Int",
                            &format!("{}..{}", start_val.type_name(), end_val.type_name()),
                        ))
                    }
                }
            }

            Expr::Lambda(def) => Value::Function(Arc::new(Closure {
                witnesses: self.stacks.witnesses.merged(),
                ..Closure::new(Arc::clone(def), Arc::clone(env))
            })),

            Expr::Call { id, callee, args } => {
                let callee_val = self.eval(callee, env)?;
                let arg_vals = self.eval_all(args, env)?;
                let name = match &callee.node {
                    Expr::Var(name) => name.clone(),
                    _ => callable_name(&callee_val),
                };
                let site = CallSite::named(name)
                    .with_node(*id)
                    .with_span(expr.span)
                    .with_annotation(ctx.annotation.cloned())
                    .with_env(Arc::clone(env));
                return self.finish_call(callee_val, arg_vals, site, ctx);
            }

            Expr::MethodCall {
                id,
                receiver,
                method,
                args,
            } => {
                let recv = self.eval(receiver, env)?;
                let arg_vals = self.eval_all(args, env)?;
                let callee = match &recv {
                    Value::Host(host) => {
                        let bridge = self.host_bridge.clone().ok_or_else(|| {
                            RuntimeError::host(&format!(
                                "no host bridge configured to call `{method}` on {}",
                                host.type_name
                            ))
                        })?;
                        return Ok(Step::Done(bridge.call_member(host, method, arg_vals)?));
                    }
                    Value::Record(fields) if fields.get(method).is_some_and(Value::is_callable) => {
                        fields[method.as_str()].clone()
                    }
                    _ => {
                        let func = env
                            .get(method)
                            .ok_or_else(|| RuntimeError::undefined_variable(method))?;
                        Value::bound(func, recv)
                    }
                };
                let site = CallSite::named(method.clone())
                    .with_node(*id)
                    .with_span(expr.span)
                    .with_annotation(ctx.annotation.cloned())
                    .with_env(Arc::clone(env));
                return self.finish_call(callee, arg_vals, site, ctx);
            }

            Expr::Field { target, field } => {
                let value = self.eval(target, env)?;
                self.read_field(&value, field)?
            }

            Expr::Binary { left, op, right } => match op {
                BinOp::And | BinOp::Or => {
                    let lhs = self.eval(left, env)?;
                    let lhs = lhs
                        .as_bool()
                        .ok_or_else(|| RuntimeError::type_error("Bool", lhs.type_name()))?;
                    if (*op == BinOp::And) != lhs {
                        Value::Bool(lhs)
                    } else {
                        let rhs = self.eval(right, env)?;
                        match rhs {
                            Value::Bool(_) => rhs,
                            other => return Err(RuntimeError::type_error("Bool", other.type_name())),
                        }
                    }
                }
                _ => {
                    let lhs = self.eval(left, env)?;
                    let rhs = self.eval(right, env)?;
                    self.eval_binary(*op, lhs, rhs)?
                }
            },

            Expr::Unary { op, expr: inner } => {
                let value = self.eval(inner, env)?;
                match (op, &value) {
                    (UnOp::Neg, Value::Int(n)) => Value::Int(n.wrapping_neg()),
                    (UnOp::Neg, Value::Float(x)) => Value::Float(-x),
                    (UnOp::Not, Value::Bool(b)) => Value::Bool(!b),
                    (UnOp::Neg, _) => return Err(RuntimeError::type_error("numeric", value.type_name())),
                    (UnOp::Not, _) => return Err(RuntimeError::type_error("Bool", value.type_name())),
                }
            }

            Expr::OperatorRef(op) => Value::Operator(*op),

            Expr::Compose { outer, inner } => {
                let outer = self.eval(outer, env)?;
                let inner = self.eval(inner, env)?;
                Value::Composed(Arc::new(ComposedFunction { outer, inner }))
            }

            Expr::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let cond_val = self.eval(cond, env)?;
                return match cond_val {
                    Value::Bool(true) => self.eval_step(then_branch, env, ctx),
                    Value::Bool(false) => self.eval_step(else_branch, env, ctx),
                    other => Err(RuntimeError::type_error("Bool", other.type_name())),
                };
            }

            Expr::Let {
                name,
                ty,
                value,
                body,
            } => {
                let bound = self.eval_with(value, env, EvalCtx::annotated(ty.as_ref()))?;
                let scope = child_env(env);
                scope.define(name.clone(), bound);
                return self.eval_step(body, &scope, ctx);
            }

            Expr::Block(exprs) => {
                let Some((last, init)) = exprs.split_last() else {
                    return Ok(Step::Done(Value::Unit));
                };
                let scope = child_env(env);
                for e in init {
                    self.eval(e, &scope)?;
                }
                return self.eval_step(last, &scope, ctx);
            }

            Expr::Assign { name, value } => {
                let new_value = self.eval(value, env)?;
                if !env.set(name, new_value) {
                    return Err(RuntimeError::undefined_variable(name));
                }
                Value::Unit
            }

            Expr::Annotated { expr: inner, ty } => {
                let resolved = self.resolve_type(ty, env);
                let _context = self.stacks.type_context.push(resolved.clone());
                self.eval_with(inner, env, EvalCtx::annotated(Some(&resolved)))?
            }

            Expr::Match { expr: scrutinee, arms } => {
                let value = self.eval(scrutinee, env)?;
                for arm in arms {
                    let scope = child_env(env);
                    if match_pattern(&arm.pattern.node, &value, &scope) {
                        return self.eval_step(&arm.body, &scope, ctx);
                    }
                }
                return Err(RuntimeError::pattern_mismatch(&format!("no arm matches {value}")));
            }

            Expr::Dict { trait_name, types } => {
                if types.is_empty() {
                    Value::Dictionary(Arc::new(Dictionary::placeholder(trait_name.clone())))
                } else {
                    let key = TypeKey::from_types(types);
                    Value::Dictionary(self.build_dictionary(trait_name, &key)?)
                }
            }

            Expr::Do { binds, body } => self.eval_do(binds, body, env)?,

            Expr::Try(inner) => match self.eval(inner, env) {
                Ok(value) => value,
                Err(err) => Value::Error(Arc::new(err)),
            },
        };
        Ok(Step::Done(value))
    }

    fn eval_all(&mut self, exprs: &[Spanned<Expr>], env: &EnvRef) -> InterpResult<Vec<Value>> {
        exprs.iter().map(|e| self.eval(e, env)).collect()
    }

    fn finish_call(&mut self, callee: Value, args: Vec<Value>, site: CallSite, ctx: EvalCtx<'_>) -> InterpResult<Step> {
        if ctx.tail {
            Ok(Step::Tail(TailCall { callee, args, site }))
        } else {
            self.apply(callee, args, &site).map(Step::Done)
        }
    }

    fn read_field(&self, value: &Value, field: &str) -> InterpResult<Value> {
        match value {
            Value::Record(fields) => fields
                .get(field)
                .cloned()
                .ok_or_else(|| RuntimeError::pattern_mismatch(&format!("record has no field `{field}`"))),
            Value::Tuple(items) => field
                .parse::<usize>()
                .ok()
                .and_then(|i| items.get(i).cloned())
                .ok_or_else(|| RuntimeError::pattern_mismatch(&format!("tuple has no field `{field}`"))),
            Value::Host(host) => match &self.host_bridge {
                Some(bridge) => bridge.read_field(host, field),
                None => Err(RuntimeError::host(&format!(
                    "no host bridge configured to read `{field}` of {}",
                    host.type_name
                ))),
            },
            other => Err(RuntimeError::type_error("Record", other.type_name())),
        }
    }

    /// `do { x <- m; rest }` is `bind(m, \x -> do { rest })`, run with the
    /// container type of `m` as the dispatch hint.
    fn eval_do(&mut self, binds: &[DoBind], body: &Spanned<Expr>, env: &EnvRef) -> InterpResult<Value> {
        let Some((first, rest)) = binds.split_first() else {
            return self.eval(body, env);
        };
        let source = self.eval(&first.value, env)?;
        let _hint = self.stacks.containers.push(source.type_name().to_string());
        let bind = env
            .get("bind")
            .ok_or_else(|| RuntimeError::undefined_variable("bind"))?;

        let name = first.name.clone();
        let rest = rest.to_vec();
        let body = body.clone();
        let scope_parent = Arc::clone(env);
        let continuation = Value::Builtin(Arc::new(Builtin {
            name: "<do>".to_string(),
            func: Arc::new(move |interp: &mut Interpreter, args: Vec<Value>| {
                let scope = child_env(&scope_parent);
                scope.define(name.clone(), args.into_iter().next().unwrap_or(Value::Unit));
                interp.eval_do(&rest, &body, &scope)
            }),
            signature: Some(Type::func(vec![Type::var("a")], Type::var("b"))),
            defaults: Vec::new(),
        }));

        let site = CallSite::named("bind")
            .with_span(first.value.span)
            .with_env(Arc::clone(env));
        self.apply(bind, vec![source, continuation], &site)
    }

    /// Substitute type variables bound in `env` (or, failing that, in the
    /// witness stack).
    pub(crate) fn resolve_type(&self, ty: &Type, env: &EnvRef) -> Type {
        ty.substitute(&|name: &str| match env.get(name) {
            Some(Value::Type(bound)) => Some((*bound).clone()),
            _ => self
                .stacks
                .witnesses
                .lookup(name)
                .and_then(|types| types.into_iter().next()),
        })
    }

    /// Build the dictionary of an instance, super-trait dictionaries included.
    pub(crate) fn build_dictionary(&mut self, trait_name: &str, key: &TypeKey) -> InterpResult<Arc<Dictionary>> {
        let mut visiting = HashSet::new();
        self.build_dictionary_inner(trait_name, key, &mut visiting)
    }

    fn build_dictionary_inner(
        &mut self,
        trait_name: &str,
        key: &TypeKey,
        visiting: &mut HashSet<String>,
    ) -> InterpResult<Arc<Dictionary>> {
        if !self.registry.has_instance(trait_name, key) {
            return Err(RuntimeError::no_implementation(trait_name, &key.to_string(), "<dictionary>"));
        }
        visiting.insert(trait_name.to_string());

        let names = self.registry.method_names(trait_name).to_vec();
        let mut methods = Vec::with_capacity(names.len());
        for name in &names {
            let method = match self.registry.lookup_method(trait_name, key, name) {
                Some(found) => found,
                None => match self.registry.user_default(trait_name, name) {
                    Some(def) => Value::Function(Arc::new(Closure {
                        owner_trait: Some(trait_name.to_string()),
                        ..Closure::new(def, Arc::clone(&self.global_env))
                    })),
                    None => match self.registry.builtin_default(trait_name, name) {
                        Some(builtin) => builtin,
                        // Left for runtime dispatch
                        None => Value::ClassMethod(Arc::new(ClassMethod {
                            trait_name: trait_name.to_string(),
                            method: name.clone(),
                            arity: self
                                .registry
                                .trait_method(trait_name, name)
                                .map_or(0, |m| m.arity),
                            dispatch: None,
                        })),
                    },
                },
            };
            methods.push(method);
        }

        let mut supers = Vec::new();
        for sup in self.registry.super_traits(trait_name).to_vec() {
            if !visiting.contains(&sup) && self.registry.has_instance(&sup, key) {
                supers.push(self.build_dictionary_inner(&sup, key, visiting)?);
            }
        }

        Ok(Arc::new(Dictionary {
            trait_name: trait_name.to_string(),
            type_key: Some(key.clone()),
            methods,
            supers,
        }))
    }

    pub(crate) fn eval_binary(&self, op: BinOp, left: Value, right: Value) -> InterpResult<Value> {
        match op {
            BinOp::Add => match (&left, &right) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_add(*b))),
                (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a + b)),
                (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 + b)),
                (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a + *b as f64)),
                (Value::Str(a), Value::Str(b)) => Ok(Value::string(&format!("{a}{b}"))),
                (Value::List(a), Value::List(b)) => {
                    Ok(Value::list(a.iter().chain(b.iter()).cloned().collect()))
                }
                _ => Err(RuntimeError::type_error(
                    "numeric, String or List",
                    &format!("{} + {}", left.type_name(), right.type_name()),
                )),
            },
            BinOp::Sub => match (&left, &right) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_sub(*b))),
                (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a - b)),
                (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 - b)),
                (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a - *b as f64)),
                _ => Err(RuntimeError::type_error(
                    "numeric",
                    &format!("{} - {}", left.type_name(), right.type_name()),
                )),
            },
            BinOp::Mul => match (&left, &right) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_mul(*b))),
                (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a * b)),
                (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 * b)),
                (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a * *b as f64)),
                _ => Err(RuntimeError::type_error(
                    "numeric",
                    &format!("{} * {}", left.type_name(), right.type_name()),
                )),
            },
            BinOp::Div => match (&left, &right) {
                (Value::Int(_), Value::Int(0)) => Err(RuntimeError::division_by_zero()),
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_div(*b))),
                (Value::Float(a), Value::Float(b)) => Ok(Value::Float(a / b)),
                (Value::Int(a), Value::Float(b)) => Ok(Value::Float(*a as f64 / b)),
                (Value::Float(a), Value::Int(b)) => Ok(Value::Float(a / *b as f64)),
                _ => Err(RuntimeError::type_error(
                    "numeric",
                    &format!("{} / {}", left.type_name(), right.type_name()),
                )),
            },
            BinOp::Mod => match (&left, &right) {
                (Value::Int(_), Value::Int(0)) => Err(RuntimeError::division_by_zero()),
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a.wrapping_rem(*b))),
                _ => Err(RuntimeError::type_error("Int", left.type_name())),
            },

            BinOp::Eq => Ok(Value::Bool(left == right)),
            BinOp::Ne => Ok(Value::Bool(left != right)),
            BinOp::Lt => Ok(Value::Bool(compare(&left, &right)? == Ordering::Less)),
            BinOp::Gt => Ok(Value::Bool(compare(&left, &right)? == Ordering::Greater)),
            BinOp::Le => Ok(Value::Bool(compare(&left, &right)? != Ordering::Greater)),
            BinOp::Ge => Ok(Value::Bool(compare(&left, &right)? != Ordering::Less)),

            // Reached only through `(&&)` / `(||)` values; both sides are evaluated
            BinOp::And | BinOp::Or => match (&left, &right) {
                (Value::Bool(a), Value::Bool(b)) => {
                    Ok(Value::Bool(if op == BinOp::And { *a && *b } else { *a || *b }))
                }
                _ => Err(RuntimeError::type_error(
                    "Bool",
                    &format!("{} {op} {}", left.type_name(), right.type_name()),
                )),
            },
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

fn compare(left: &Value, right: &Value) -> InterpResult<Ordering> {
    let ordering = match (left, right) {
        (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
        (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
        (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
        (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
        (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
        (Value::Char(a), Value::Char(b)) => Some(a.cmp(b)),
        _ => None,
    };
    ordering.ok_or_else(|| {
        RuntimeError::type_error(
            "comparable values",
            &format!("{} and {}", left.type_name(), right.type_name()),
        )
    })
}

fn literal_value(lit: &Literal) -> Value {
    match lit {
        Literal::Int(n) => Value::Int(*n),
        Literal::Float(x) => Value::Float(*x),
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Char(c) => Value::Char(*c),
        Literal::Str(s) => Value::string(s),
        Literal::Unit => Value::Unit,
    }
}

/// Match `value` against `pattern`, binding variables into `env`.
/// Bindings made before a failing sub-pattern are left behind; callers use
/// a fresh scope per arm.
fn match_pattern(pattern: &Pattern, value: &Value, env: &EnvRef) -> bool {
    match (pattern, value) {
        (Pattern::Wildcard, _) => true,
        (Pattern::Var(name), _) => {
            env.define(name.clone(), value.clone());
            true
        }
        (Pattern::Literal(lit), _) => literal_value(lit) == *value,
        (Pattern::Constructor { name, fields }, Value::Data(data)) => {
            data.constructor == *name
                && data.fields.len() == fields.len()
                && fields
                    .iter()
                    .zip(&data.fields)
                    .all(|(p, v)| match_pattern(p, v, env))
        }
        (Pattern::Tuple(pats), Value::Tuple(items)) => {
            pats.len() == items.len() && pats.iter().zip(items.iter()).all(|(p, v)| match_pattern(p, v, env))
        }
        (Pattern::Record(pats), Value::Record(fields)) => pats.iter().all(|(name, p)| {
            fields
                .get(name)
                .is_some_and(|v| match_pattern(p, v, env))
        }),
        _ => false,
    }
}
