//! Builtin registration and the core builtin set

use super::error::{InterpResult, RuntimeError};
use super::value::{Builtin, BuiltinFn, Value};
use super::Interpreter;
use crate::ast::Type;
use std::io::Write;
use std::sync::Arc;

/// Description of a native function handed to
/// [`Interpreter::register_builtin`].
pub struct BuiltinSpec {
    name: String,
    func: BuiltinFn,
    signature: Option<Type>,
    defaults: Vec<Value>,
}

impl BuiltinSpec {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&mut Interpreter, Vec<Value>) -> InterpResult<Value> + Send + Sync + 'static,
    {
        BuiltinSpec {
            name: name.into(),
            func: Arc::new(func),
            signature: None,
            defaults: Vec::new(),
        }
    }

    /// Declare a function type. A builtin with a signature is applied like a
    /// user function: partial application, arity errors, defaults.
    pub fn with_signature(mut self, signature: Type) -> Self {
        self.signature = Some(signature);
        self
    }

    /// Values for the trailing parameters when the caller omits them
    pub fn with_defaults(mut self, defaults: Vec<Value>) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn into_value(self) -> Value {
        Value::Builtin(Arc::new(Builtin {
            name: self.name,
            func: self.func,
            signature: self.signature,
            defaults: self.defaults,
        }))
    }
}

fn unary(param: Type, ret: Type) -> Type {
    Type::func(vec![param], ret)
}

fn any() -> Type {
    Type::var("a")
}

fn write_joined(args: &[Value], newline: bool) -> InterpResult<Value> {
    let line = args.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" ");
    let mut out = std::io::stdout().lock();
    let result = if newline {
        writeln!(out, "{line}")
    } else {
        write!(out, "{line}").and_then(|_| out.flush())
    };
    result.map_err(|e| RuntimeError::host(&e.to_string()))?;
    Ok(Value::Unit)
}

fn show_value(_: &mut Interpreter, args: Vec<Value>) -> InterpResult<Value> {
    let value = args.into_iter().next().unwrap_or(Value::Unit);
    Ok(Value::string(&value.to_string()))
}

fn length(_: &mut Interpreter, args: Vec<Value>) -> InterpResult<Value> {
    let n = match &args[..] {
        [Value::List(items)] | [Value::Tuple(items)] => items.len(),
        [Value::Str(s)] => s.chars().count(),
        [Value::Record(fields)] => fields.len(),
        [Value::Range(start, end)] => end.saturating_sub(*start).max(0) as usize,
        [other] => return Err(RuntimeError::type_error("List or String", other.type_name())),
        _ => return Err(RuntimeError::arity_mismatch("length", 1, args.len())),
    };
    Ok(Value::Int(n as i64))
}

fn fail(_: &mut Interpreter, args: Vec<Value>) -> InterpResult<Value> {
    let message = args
        .first()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "failure".to_string());
    Err(RuntimeError::user(&message))
}

fn error_message(_: &mut Interpreter, args: Vec<Value>) -> InterpResult<Value> {
    match args.first() {
        Some(Value::Error(e)) => Ok(Value::string(&e.message)),
        Some(other) => Err(RuntimeError::type_error("Error", other.type_name())),
        None => Err(RuntimeError::missing_arguments("error_message", 1)),
    }
}

/// Register the builtins every interpreter starts with.
pub(crate) fn register_core(interp: &mut Interpreter) {
    interp.register_builtin(BuiltinSpec::new("print", |_, args| write_joined(&args, false)));
    interp.register_builtin(BuiltinSpec::new("println", |_, args| write_joined(&args, true)));
    interp.register_builtin(
        BuiltinSpec::new("show", show_value).with_signature(unary(any(), Type::con("String"))),
    );
    interp.register_builtin(
        BuiltinSpec::new("length", length).with_signature(unary(any(), Type::con("Int"))),
    );
    interp.register_builtin(
        BuiltinSpec::new("fail", fail)
            .with_signature(unary(Type::con("String"), any()))
            .with_defaults(vec![Value::string("failure")]),
    );
    interp.register_builtin(
        BuiltinSpec::new("error_message", error_message)
            .with_signature(unary(Type::con("Error"), Type::con("String"))),
    );
    interp.register_builtin(
        BuiltinSpec::new("call_depth", |interp, _| Ok(Value::Int(interp.call_depth() as i64)))
            .with_signature(Type::func(vec![], Type::con("Int"))),
    );
    interp.register_builtin(
        BuiltinSpec::new("witness_depth", |interp, _| {
            Ok(Value::Int(interp.witness_depth() as i64))
        })
        .with_signature(Type::func(vec![], Type::con("Int"))),
    );

    interp.register_trait_default(
        "Show",
        "show",
        BuiltinSpec::new("Show.show", show_value).with_signature(unary(any(), Type::con("String"))),
    );
    let eq_sig = || Type::func(vec![any(), any()], Type::con("Bool"));
    interp.register_trait_default(
        "Eq",
        "eq",
        BuiltinSpec::new("Eq.eq", |_, args| Ok(Value::Bool(args[0] == args[1]))).with_signature(eq_sig()),
    );
    interp.register_trait_default(
        "Eq",
        "neq",
        BuiltinSpec::new("Eq.neq", |_, args| Ok(Value::Bool(args[0] != args[1]))).with_signature(eq_sig()),
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interp::CallSite;

    fn call(interp: &mut Interpreter, name: &str, args: Vec<Value>) -> InterpResult<Value> {
        interp.call_function(name, args)
    }

    #[test]
    fn test_length() {
        let mut interp = Interpreter::new();
        let list = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(call(&mut interp, "length", vec![list]).unwrap(), Value::Int(2));
        assert_eq!(call(&mut interp, "length", vec![Value::string("héllo")]).unwrap(), Value::Int(5));
        assert!(call(&mut interp, "length", vec![Value::Int(3)]).is_err());
        let wide = Value::Range(i64::MIN, i64::MAX);
        assert_eq!(call(&mut interp, "length", vec![wide]).unwrap(), Value::Int(i64::MAX));
        assert_eq!(call(&mut interp, "length", vec![Value::Range(5, 2)]).unwrap(), Value::Int(0));
    }

    #[test]
    fn test_fail_uses_default_message() {
        let mut interp = Interpreter::new();
        let err = call(&mut interp, "fail", vec![]).unwrap_err();
        assert_eq!(err.message, "failure");
        let err = call(&mut interp, "fail", vec![Value::string("bad input")]).unwrap_err();
        assert_eq!(err.message, "bad input");
    }

    #[test]
    fn test_custom_builtin_partial_and_defaults() {
        let mut interp = Interpreter::new();
        interp.register_builtin(
            BuiltinSpec::new("clamp", |_, args| {
                let (x, lo, hi) = (args[0].as_int(), args[1].as_int(), args[2].as_int());
                match (x, lo, hi) {
                    (Some(x), Some(lo), Some(hi)) => Ok(Value::Int(x.clamp(lo, hi))),
                    _ => Err(RuntimeError::type_error("Int", "other")),
                }
            })
            .with_signature(Type::func(
                vec![Type::con("Int"), Type::con("Int"), Type::con("Int")],
                Type::con("Int"),
            ))
            .with_defaults(vec![Value::Int(0), Value::Int(10)]),
        );
        assert_eq!(call(&mut interp, "clamp", vec![Value::Int(42)]).unwrap(), Value::Int(10));
        assert_eq!(
            call(&mut interp, "clamp", vec![Value::Int(-5), Value::Int(-2)]).unwrap(),
            Value::Int(-2)
        );
        let err = call(&mut interp, "clamp", vec![]).unwrap_err();
        assert_eq!(err.kind, crate::interp::ErrorKind::Arity);
    }

    #[test]
    fn test_builtin_partial_application() {
        let mut interp = Interpreter::new();
        interp.register_builtin(
            BuiltinSpec::new("sub", |_, args| match (&args[0], &args[1]) {
                (Value::Int(a), Value::Int(b)) => Ok(Value::Int(a - b)),
                _ => Err(RuntimeError::type_error("Int", "other")),
            })
            .with_signature(Type::func(vec![Type::con("Int"), Type::con("Int")], Type::con("Int"))),
        );
        let partial = call(&mut interp, "sub", vec![Value::Int(10)]).unwrap();
        match &partial {
            Value::Partial(p) => assert_eq!(p.remaining, 1),
            other => panic!("expected partial, got {other}"),
        }
        let site = CallSite::named("sub");
        assert_eq!(interp.apply(partial, vec![Value::Int(3)], &site).unwrap(), Value::Int(7));
    }

    #[test]
    fn test_builtin_name() {
        assert_eq!(BuiltinSpec::new("noop", |_, _| Ok(Value::Unit)).name(), "noop");
    }
}
