//! Function application engine
//!
//! Every call goes through [`Interpreter::apply`]. User functions run inside
//! a trampoline: a call in tail position of a body hands the callee back to
//! the loop instead of growing the native stack. Witness frames pushed for a
//! logical call are held as guards, so they are popped on every exit path.

use super::dispatch::plain_args;
use super::env::{child_env, EnvRef};
use super::error::{InterpResult, RuntimeError};
use super::eval::Step;
use super::stacks::{StackGuard, WitnessFrame, RESULT_KEY};
use super::trace::CallFrame;
use super::value::{Builtin, Closure, Dictionary, Value};
use super::Interpreter;
use crate::ast::{FnDef, NodeId, Span, Type};
use std::sync::Arc;
use tracing::trace;

/// Where a call happens
///
/// Threaded through application and dispatch so the resolver can see the
/// call node's hints and annotation.
#[derive(Debug, Clone, Default)]
pub struct CallSite {
    /// Name shown in call frames
    pub name: String,
    /// Analyzer node id of the call expression
    pub node: Option<NodeId>,
    pub span: Span,
    /// Declared type of the binding the call's result flows into
    pub annotation: Option<Type>,
    /// Caller's environment, for resolving type variables in hints
    pub env: Option<EnvRef>,
}

impl CallSite {
    pub fn named(name: impl Into<String>) -> Self {
        CallSite {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_node(mut self, node: NodeId) -> Self {
        self.node = Some(node);
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_annotation(mut self, annotation: Option<Type>) -> Self {
        self.annotation = annotation;
        self
    }

    pub fn with_env(mut self, env: EnvRef) -> Self {
        self.env = Some(env);
        self
    }
}

/// Name of a callable for frames and messages
pub fn callable_name(value: &Value) -> String {
    match value {
        Value::Function(c) => c.name().to_string(),
        Value::Builtin(b) => b.name.clone(),
        Value::Constructor(c) => c.name.clone(),
        Value::ClassMethod(m) => m.method.clone(),
        Value::Partial(p) => callable_name(&p.callee),
        Value::Bound(b) => callable_name(&b.method),
        Value::Operator(op) => format!("({op})"),
        Value::Composed(_) => "<composed>".to_string(),
        other => format!("<{}>", other.type_name()),
    }
}

enum Binding {
    /// Parameters bound in a fresh call environment
    Ready(EnvRef),
    /// Too few arguments; the call produced a partial application
    Partial(Value),
}

/// Callee reduced to something that runs directly
struct Unwrapped {
    callee: Value,
    args: Vec<Value>,
    /// Context evidence established by dispatch
    witness: Option<Arc<WitnessFrame>>,
}

enum Reduced {
    Call(Unwrapped),
    /// Trait method still short of arguments; dispatch waits for the rest
    Partial(Value),
}

type WitnessGuard = StackGuard<Arc<WitnessFrame>>;

impl Interpreter {
    /// Apply `callee` to `args`.
    pub fn apply(&mut self, callee: Value, args: Vec<Value>, site: &CallSite) -> InterpResult<Value> {
        let (red_zone, grow) = (self.config.stack_red_zone, self.config.stack_grow_size);
        stacker::maybe_grow(red_zone, grow, || self.apply_inner(callee, args, site))
    }

    fn apply_inner(&mut self, callee: Value, args: Vec<Value>, site: &CallSite) -> InterpResult<Value> {
        let limit = self.config.trace_limit;
        if self.stacks.calls.depth() >= self.config.max_call_depth {
            let err = RuntimeError::stack_overflow(self.config.max_call_depth).or_location(site.span);
            return Err(err.or_trace(self.stacks.calls.capture(limit)));
        }
        let _frame = self
            .stacks
            .calls
            .push(CallFrame::new(site.name.clone(), self.file.clone(), site.span));
        // The trace is captured while this call's frame is still on the stack
        self.trampoline(callee, args, site.clone())
            .map_err(|e| e.or_trace(self.stacks.calls.capture(limit)))
    }

    fn trampoline(&mut self, callee: Value, args: Vec<Value>, site: CallSite) -> InterpResult<Value> {
        let mut witnesses: Vec<WitnessGuard> = Vec::new();
        let Unwrapped {
            mut callee,
            mut args,
            witness,
        } = match self.unwrap_callee(callee, args, &site)? {
            Reduced::Call(unwrapped) => unwrapped,
            Reduced::Partial(partial) => return Ok(partial),
        };
        if let Some(frame) = witness {
            witnesses.push(self.stacks.witnesses.push(frame));
        }
        let mut site = site;
        let mut reentered = false;

        loop {
            let closure = match callee {
                Value::Function(closure) => closure,
                other => {
                    return self
                        .apply_native(other, args, &site)
                        .map_err(|e| at_tail_site(e, &site, reentered));
                }
            };

            let env = match self
                .bind_arguments(&closure, args, &site)
                .map_err(|e| at_tail_site(e, &site, reentered))?
            {
                Binding::Ready(env) => env,
                Binding::Partial(partial) => return Ok(partial),
            };
            if let Some(snapshot) = &closure.witnesses {
                witnesses.push(self.stacks.witnesses.push(Arc::clone(snapshot)));
            }
            if let Some(frame) = self.return_witness(&closure, &env) {
                witnesses.push(self.stacks.witnesses.push(Arc::new(frame)));
            }

            let step = self
                .eval_tail(&closure.def.body, &env)
                .map_err(|e| at_tail_site(e, &site, reentered))?;
            match step {
                Step::Done(value) => return Ok(value),
                Step::Tail(tail) => {
                    trace!(from = closure.name(), to = %tail.site.name, "tail call");
                    // Dispatch sees the caller's evidence; the callee runs without it
                    let next = match self
                        .unwrap_callee(tail.callee, tail.args, &tail.site)
                        .map_err(|e| e.or_location(tail.site.span))?
                    {
                        Reduced::Call(next) => next,
                        Reduced::Partial(partial) => return Ok(partial),
                    };
                    witnesses.clear();
                    if let Some(frame) = next.witness {
                        witnesses.push(self.stacks.witnesses.push(frame));
                    }
                    self.stacks.calls.replace_top(CallFrame::new(
                        tail.site.name.clone(),
                        self.file.clone(),
                        tail.site.span,
                    ));
                    callee = next.callee;
                    args = next.args;
                    site = tail.site;
                    reentered = true;
                }
            }
        }
    }

    /// Peel partial applications and bound methods, resolve trait methods.
    fn unwrap_callee(&mut self, callee: Value, args: Vec<Value>, site: &CallSite) -> InterpResult<Reduced> {
        let mut callee = callee;
        let mut args = args;
        let mut witness = None;
        loop {
            match callee {
                Value::Partial(partial) => {
                    let mut full = partial.args.clone();
                    full.extend(args);
                    args = full;
                    callee = partial.callee.clone();
                }
                Value::Bound(bound) => {
                    args.insert(0, bound.receiver.clone());
                    callee = bound.method.clone();
                }
                Value::ClassMethod(method) => {
                    let supplied = plain_args(&args).len();
                    if supplied > 0 && supplied < method.arity {
                        let remaining = method.arity - supplied;
                        return Ok(Reduced::Partial(Value::partial(Value::ClassMethod(method), args, remaining)));
                    }
                    let resolution = self.resolve(&method, args, site)?;
                    if let Value::ClassMethod(again) = &resolution.callee {
                        if Arc::ptr_eq(again, &method) {
                            return Err(RuntimeError::no_implementation(
                                &method.trait_name,
                                "unknown",
                                &method.method,
                            ));
                        }
                    }
                    if let Some((trait_name, ty)) = resolution.witness {
                        witness = Some(Arc::new(WitnessFrame::new().with(trait_name, ty)));
                    }
                    callee = resolution.callee;
                    args = resolution.args;
                }
                other => {
                    return Ok(Reduced::Call(Unwrapped {
                        callee: other,
                        args,
                        witness,
                    }))
                }
            }
        }
    }

    fn bind_arguments(&mut self, closure: &Arc<Closure>, args: Vec<Value>, site: &CallSite) -> InterpResult<Binding> {
        let def = &closure.def;
        let dict_count = args
            .iter()
            .take_while(|a| matches!(a, Value::Dictionary(_)))
            .count();
        let supplied = args.len() - dict_count;
        let required = def.required_params();

        if supplied < required {
            if supplied == 0 && dict_count == 0 {
                return Err(RuntimeError::missing_arguments(&def.name, required));
            }
            // Dictionaries stay in front so they bind once the rest arrives
            let partial = Value::partial(Value::Function(Arc::clone(closure)), args, required - supplied);
            return Ok(Binding::Partial(partial));
        }
        if !def.is_variadic() && supplied > def.params.len() {
            return Err(RuntimeError::arity_mismatch(&def.name, def.params.len(), supplied));
        }

        let env = child_env(&closure.env);
        let mut args = args.into_iter();
        let dicts: Vec<Arc<Dictionary>> = args
            .by_ref()
            .take(dict_count)
            .filter_map(|v| match v {
                Value::Dictionary(d) => Some(d),
                _ => None,
            })
            .collect();
        if !dicts.is_empty() && !def.witness_params.is_empty() {
            bind_witnesses(def, &dicts, &env)?;
        }

        if let Some(substitution) = site.node.and_then(|id| self.hints.instantiation(id)) {
            for (var, ty) in substitution {
                env.define(var.clone(), Value::Type(Arc::new(ty.clone())));
            }
        }

        let mut rest: Vec<Value> = args.collect();
        let fixed = def.fixed_params();
        let surplus = if rest.len() > fixed.len() {
            rest.split_off(fixed.len())
        } else {
            Vec::new()
        };
        let mut rest = rest.into_iter();
        for param in fixed {
            let value = match (rest.next(), &param.default) {
                (Some(value), _) => value,
                // Defaults see the defining scope, not the other parameters
                (None, Some(default)) => self.eval(default, &closure.env)?,
                (None, None) => return Err(RuntimeError::arity_mismatch(&def.name, required, supplied)),
            };
            env.define(param.name.clone(), value);
        }
        if let Some(variadic) = def.params.last().filter(|p| p.variadic) {
            env.define(variadic.name.clone(), Value::list(surplus));
        }
        Ok(Binding::Ready(env))
    }

    /// Evidence frame for a body whose declared return type is known.
    fn return_witness(&self, closure: &Closure, env: &EnvRef) -> Option<WitnessFrame> {
        let def = &closure.def;
        let declared = def.ret_ty.as_ref()?;
        let resolved = self.resolve_type(declared, env);
        if resolved.has_var_head() {
            return None;
        }
        resolved.constructor_name()?;

        let mut frame = WitnessFrame::new().with(RESULT_KEY, resolved.clone());
        if let Some(owner) = &closure.owner_trait {
            frame.insert(owner.clone(), resolved.clone());
        }
        if let Some(var) = head_variable(declared) {
            for constraint in def.constraints.iter().filter(|c| c.type_var == var) {
                frame.insert(constraint.trait_name.clone(), resolved.clone());
            }
        }
        Some(frame)
    }

    /// Apply callables that do not run a user body.
    fn apply_native(&mut self, callee: Value, args: Vec<Value>, site: &CallSite) -> InterpResult<Value> {
        let result = match callee {
            Value::Builtin(builtin) => self.call_builtin(&builtin, args),
            Value::Constructor(ctor) => match args.len() {
                n if n == ctor.arity => Ok(Value::data(&ctor.type_name, &ctor.name, args)),
                0 => Err(RuntimeError::missing_arguments(&ctor.name, ctor.arity)),
                n if n < ctor.arity => {
                    let remaining = ctor.arity - n;
                    Ok(Value::partial(Value::Constructor(ctor), args, remaining))
                }
                n => Err(RuntimeError::arity_mismatch(&ctor.name, ctor.arity, n)),
            },
            Value::Operator(op) => match args.len() {
                2 => {
                    let mut args = args.into_iter();
                    match (args.next(), args.next()) {
                        (Some(lhs), Some(rhs)) => self.eval_binary(op, lhs, rhs),
                        _ => Err(RuntimeError::arity_mismatch(&op.to_string(), 2, 0)),
                    }
                }
                1 => Ok(Value::partial(Value::Operator(op), args, 1)),
                0 => Err(RuntimeError::missing_arguments(&op.to_string(), 2)),
                n => Err(RuntimeError::arity_mismatch(&op.to_string(), 2, n)),
            },
            Value::Composed(composed) => {
                let inner = self.apply(composed.inner.clone(), args, site)?;
                self.apply(composed.outer.clone(), vec![inner], site)
            }
            callee @ (Value::Function(_) | Value::Partial(_) | Value::Bound(_) | Value::ClassMethod(_)) => {
                self.apply(callee, args, site)
            }
            other => match self.fallback.clone() {
                Some(handler) => handler
                    .try_call(&other, &args)
                    .unwrap_or_else(|| Err(RuntimeError::not_callable(other.type_name()))),
                None => Err(RuntimeError::not_callable(other.type_name())),
            },
        };
        result.map_err(|e| e.or_location(site.span))
    }

    fn call_builtin(&mut self, builtin: &Arc<Builtin>, args: Vec<Value>) -> InterpResult<Value> {
        let Some(arity) = builtin.arity() else {
            return (builtin.func)(self, args);
        };
        let mut args: Vec<Value> = args
            .into_iter()
            .skip_while(|a| matches!(a, Value::Dictionary(_)))
            .collect();
        let required = builtin.required().unwrap_or(arity);
        if args.is_empty() && required > 0 {
            return Err(RuntimeError::missing_arguments(&builtin.name, required));
        }
        if args.len() < required {
            let remaining = required - args.len();
            return Ok(Value::partial(Value::Builtin(Arc::clone(builtin)), args, remaining));
        }
        if args.len() > arity {
            return Err(RuntimeError::arity_mismatch(&builtin.name, arity, args.len()));
        }
        let missing = arity - args.len();
        let defaults = &builtin.defaults[builtin.defaults.len() - missing..];
        args.extend(defaults.iter().cloned());
        (builtin.func)(self, args)
    }
}

fn bind_witnesses(def: &FnDef, dicts: &[Arc<Dictionary>], env: &EnvRef) -> InterpResult<()> {
    for (i, param) in def.witness_params.iter().enumerate() {
        let dict = match dicts.get(i) {
            Some(dict) => Arc::clone(dict),
            None => dicts[0].find_super(&param.trait_name).ok_or_else(|| {
                RuntimeError::witness_mismatch(&def.name, def.witness_params.len(), dicts.len())
            })?,
        };
        env.define(param.name.clone(), Value::Dictionary(dict));
    }
    Ok(())
}

/// `a` for `a` and `f` for `f<b>`
fn head_variable(ty: &Type) -> Option<&str> {
    match ty {
        Type::Var(name) => Some(name.as_str()),
        Type::App { head, .. } => head_variable(head),
        _ => None,
    }
}

fn at_tail_site(err: RuntimeError, site: &CallSite, reentered: bool) -> RuntimeError {
    if reentered {
        err.or_location(site.span)
    } else {
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::build::*;
    use crate::ast::{BinOp, Constraint, Param, Program};
    use crate::hints::{AnalyzedProgram, AnalyzerHints};
    use crate::interp::ErrorKind;

    fn load(items: Vec<crate::ast::Item>) -> Interpreter {
        let mut interp = Interpreter::new();
        interp
            .load(&AnalyzedProgram::new(
                Program {
                    file: "apply.dc".into(),
                    items,
                },
                AnalyzerHints::default(),
            ))
            .unwrap();
        interp
    }

    fn add3() -> crate::ast::Item {
        fn_item(func(
            "add3",
            params(&["a", "b", "c"]),
            binary(binary(var("a"), BinOp::Add, var("b")), BinOp::Add, var("c")),
        ))
    }

    #[test]
    fn test_partial_needs_remaining() {
        let mut interp = load(vec![add3()]);
        let partial = interp.call_function("add3", vec![Value::Int(1)]).unwrap();
        match &partial {
            Value::Partial(p) => assert_eq!(p.remaining, 2),
            other => panic!("expected partial, got {other}"),
        }
        let partial = interp
            .apply(partial, vec![Value::Int(2)], &CallSite::named("p"))
            .unwrap();
        match &partial {
            Value::Partial(p) => assert_eq!(p.remaining, 1),
            other => panic!("expected partial, got {other}"),
        }
        let result = interp.apply(partial, vec![Value::Int(3)], &CallSite::named("p"));
        assert_eq!(result.unwrap(), Value::Int(6));
    }

    #[test]
    fn test_zero_args_is_arity_error() {
        let mut interp = load(vec![add3()]);
        let err = interp.call_function("add3", vec![]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Arity);
    }

    #[test]
    fn test_too_many_args() {
        let mut interp = load(vec![add3()]);
        let args = (0..4).map(Value::Int).collect();
        let err = interp.call_function("add3", args).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Arity);
        assert!(err.message.contains("expects 3"));
    }

    #[test]
    fn test_defaults_and_variadic() {
        let mut def = func(
            "collect",
            vec![
                Param::new("first"),
                Param {
                    default: Some(int(10)),
                    ..Param::new("second")
                },
                Param {
                    variadic: true,
                    ..Param::new("rest")
                },
            ],
            tuple(vec![var("first"), var("second"), var("rest")]),
        );
        def.span = Span::new(1, 1);
        let mut interp = load(vec![fn_item(def)]);

        let only_first = interp.call_function("collect", vec![Value::Int(1)]).unwrap();
        assert_eq!(only_first.to_string(), "(1, 10, [])");

        let args = (1..=4).map(Value::Int).collect();
        let all = interp.call_function("collect", args).unwrap();
        assert_eq!(all.to_string(), "(1, 2, [3, 4])");
    }

    #[test]
    fn test_default_evaluated_in_defining_scope() {
        let items = vec![
            constant("BASE", None, int(100)),
            fn_item(func(
                "offset",
                vec![
                    Param::new("x"),
                    Param {
                        default: Some(var("BASE")),
                        ..Param::new("by")
                    },
                ],
                binary(var("x"), BinOp::Add, var("by")),
            )),
        ];
        let mut interp = load(items);
        assert_eq!(interp.call_function("offset", vec![Value::Int(1)]).unwrap(), Value::Int(101));
    }

    #[test]
    fn test_leading_dictionaries_stripped() {
        let mut interp = load(vec![add3()]);
        let dict = Value::Dictionary(Arc::new(Dictionary::placeholder("Num")));
        let args = vec![dict, Value::Int(1), Value::Int(2), Value::Int(3)];
        assert_eq!(interp.call_function("add3", args).unwrap(), Value::Int(6));
    }

    #[test]
    fn test_witness_params_recovered_from_supers() {
        let eq = Arc::new(Dictionary {
            trait_name: "Eq".into(),
            type_key: None,
            methods: vec![Value::Operator(BinOp::Eq)],
            supers: vec![],
        });
        let ord = Arc::new(Dictionary {
            trait_name: "Ord".into(),
            type_key: None,
            methods: vec![Value::Operator(BinOp::Lt)],
            supers: vec![Arc::clone(&eq)],
        });
        let mut def = func("same", params(&["a"]), var("eqDict"));
        def.witness_params = vec![
            crate::ast::WitnessParam {
                name: "ordDict".into(),
                trait_name: "Ord".into(),
            },
            crate::ast::WitnessParam {
                name: "eqDict".into(),
                trait_name: "Eq".into(),
            },
        ];
        let mut interp = load(vec![fn_item(def)]);
        let bound = interp
            .call_function("same", vec![Value::Dictionary(ord), Value::Int(1)])
            .unwrap();
        assert_eq!(bound, Value::Dictionary(Arc::clone(&eq)));

        let mut lone = func("lone", params(&["a"]), var("a"));
        lone.witness_params = vec![
            crate::ast::WitnessParam {
                name: "x".into(),
                trait_name: "Show".into(),
            },
            crate::ast::WitnessParam {
                name: "y".into(),
                trait_name: "Hash".into(),
            },
        ];
        let mut interp = load(vec![fn_item(lone)]);
        let err = interp
            .call_function("lone", vec![Value::Dictionary(eq), Value::Int(1)])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Arity);
    }

    #[test]
    fn test_return_witness_popped() {
        let mut def = func("wrap", params(&["x"]), call(var("witness_depth"), vec![]));
        def.ret_ty = Some(Type::app("Option", vec![Type::var("a")]));
        def.constraints = vec![Constraint {
            type_var: "f".into(),
            trait_name: "Functor".into(),
        }];
        let mut interp = load(vec![fn_item(def)]);
        let inside = interp.call_function("wrap", vec![Value::Int(1)]).unwrap();
        // Tail call into a builtin runs after the frame was dropped
        assert_eq!(inside, Value::Int(0));
        assert_eq!(interp.witness_depth(), 0);
    }

    #[test]
    fn test_return_witness_visible_in_body() {
        let mut def = func(
            "wrap",
            params(&["x"]),
            block(vec![let_("d", None, call(var("witness_depth"), vec![]), var("d"))]),
        );
        def.ret_ty = Some(Type::app("Option", vec![Type::var("a")]));
        let mut interp = load(vec![fn_item(def)]);
        assert_eq!(interp.call_function("wrap", vec![Value::Int(1)]).unwrap(), Value::Int(1));
        assert_eq!(interp.witness_depth(), 0);
    }

    #[test]
    fn test_constructor_arity() {
        let mut interp = load(vec![data("Pair", &[("Pair", 2)])]);
        let partial = interp.call_function("Pair", vec![Value::Int(1)]).unwrap();
        let pair = interp
            .apply(partial, vec![Value::Int(2)], &CallSite::named("Pair"))
            .unwrap();
        assert_eq!(pair.to_string(), "Pair(1, 2)");
        let err = interp
            .call_function("Pair", vec![Value::Int(1), Value::Int(2), Value::Int(3)])
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Arity);
    }

    #[test]
    fn test_not_callable() {
        let mut interp = Interpreter::new();
        let err = interp
            .apply(Value::Int(3), vec![Value::Int(1)], &CallSite::named("three").with_span(Span::new(2, 5)))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::TypeShape);
        assert_eq!(err.message, "not a function: Int");
        assert_eq!(err.location, Some(Span::new(2, 5)));
        assert_eq!(err.trace.as_ref().map(|t| t[0].name.as_str()), Some("three"));
    }

    #[test]
    fn test_depth_limit() {
        let config = crate::config::EvalConfig {
            max_call_depth: 50,
            ..Default::default()
        };
        let mut interp = Interpreter::with_config(config);
        // Non-tail recursion: 1 + down(n - 1)
        let body = if_(
            binary(var("n"), BinOp::Eq, int(0)),
            int(0),
            binary(int(1), BinOp::Add, call(var("down"), vec![binary(var("n"), BinOp::Sub, int(1))])),
        );
        interp
            .load(&AnalyzedProgram::new(
                Program {
                    file: "deep.dc".into(),
                    items: vec![fn_item(func("down", params(&["n"]), body))],
                },
                AnalyzerHints::default(),
            ))
            .unwrap();
        assert_eq!(interp.call_function("down", vec![Value::Int(10)]).unwrap(), Value::Int(10));
        let err = interp.call_function("down", vec![Value::Int(500)]).unwrap_err();
        assert_eq!(err.kind, ErrorKind::StackOverflow);
        assert_eq!(interp.call_depth(), 0);
    }
}
