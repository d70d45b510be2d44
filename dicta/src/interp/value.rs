//! Runtime values for the interpreter
//!
//! Everything is reference counted with `Arc` so values (closures and the
//! environments they capture included) can cross threads.

use super::env::EnvRef;
use super::error::{InterpResult, RuntimeError};
use super::registry::TypeKey;
use super::stacks::WitnessFrame;
use super::Interpreter;
use crate::ast::{BinOp, DispatchSource, FnDef, Type};
use indexmap::IndexMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Native implementation of a builtin
pub type BuiltinFn = Arc<dyn Fn(&mut Interpreter, Vec<Value>) -> InterpResult<Value> + Send + Sync>;

/// Runtime value
#[derive(Debug, Clone)]
pub enum Value {
    Unit,
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(char),
    Str(Arc<str>),
    List(Arc<Vec<Value>>),
    Tuple(Arc<Vec<Value>>),
    Record(Arc<IndexMap<String, Value>>),
    /// Instance of a user data type: `Some(1)`
    Data(Arc<DataValue>),
    /// Integer range, end exclusive
    Range(i64, i64),
    /// Reified error produced by `try`
    Error(Arc<RuntimeError>),
    /// Concrete type bound to a type variable at a call
    Type(Arc<Type>),
    /// Opaque foreign value, only reachable through the host bridge
    Host(HostValue),

    /// User-defined function or lambda
    Function(Arc<Closure>),
    Builtin(Arc<Builtin>),
    Partial(Arc<PartialApplication>),
    Constructor(Arc<ConstructorFn>),
    /// Unresolved trait method
    ClassMethod(Arc<ClassMethod>),
    /// Method bundle of one trait instance
    Dictionary(Arc<Dictionary>),
    Bound(Arc<BoundMethod>),
    /// Binary operator as a function: `(+)`
    Operator(BinOp),
    /// `outer . inner`
    Composed(Arc<ComposedFunction>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataValue {
    pub type_name: String,
    pub constructor: String,
    pub fields: Vec<Value>,
}

#[derive(Clone)]
pub struct HostValue {
    pub type_name: String,
    pub handle: Arc<dyn Any + Send + Sync>,
}

impl fmt::Debug for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostValue({})", self.type_name)
    }
}

/// A function definition closed over its defining environment
pub struct Closure {
    pub def: Arc<FnDef>,
    pub env: EnvRef,
    /// Witness evidence active when the closure was created
    pub witnesses: Option<Arc<WitnessFrame>>,
    /// Trait whose instance or default body this is
    pub owner_trait: Option<String>,
}

impl Closure {
    pub fn new(def: Arc<FnDef>, env: EnvRef) -> Self {
        Closure {
            def,
            env,
            witnesses: None,
            owner_trait: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.def.name
    }
}

// The captured environment usually contains the closure itself.
impl fmt::Debug for Closure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Closure")
            .field("name", &self.def.name)
            .field("params", &self.def.params.len())
            .field("owner_trait", &self.owner_trait)
            .finish_non_exhaustive()
    }
}

pub struct Builtin {
    pub name: String,
    pub func: BuiltinFn,
    /// Declared function type; without one the builtin takes any arguments
    pub signature: Option<Type>,
    /// Values for the trailing parameters when omitted
    pub defaults: Vec<Value>,
}

impl Builtin {
    /// Declared parameter count, if the builtin has a signature.
    pub fn arity(&self) -> Option<usize> {
        self.signature.as_ref().and_then(|s| s.fn_params()).map(|p| p.len())
    }

    pub fn required(&self) -> Option<usize> {
        self.arity().map(|a| a.saturating_sub(self.defaults.len()))
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

#[derive(Debug)]
pub struct PartialApplication {
    pub callee: Value,
    pub args: Vec<Value>,
    /// Arguments still needed before the callee runs
    pub remaining: usize,
}

#[derive(Debug)]
pub struct ConstructorFn {
    pub type_name: String,
    pub name: String,
    pub arity: usize,
}

#[derive(Debug)]
pub struct ClassMethod {
    pub trait_name: String,
    pub method: String,
    pub arity: usize,
    pub dispatch: Option<Vec<DispatchSource>>,
}

#[derive(Debug)]
pub struct Dictionary {
    pub trait_name: String,
    pub type_key: Option<TypeKey>,
    /// Methods in the trait's method order
    pub methods: Vec<Value>,
    pub supers: Vec<Arc<Dictionary>>,
}

impl Dictionary {
    /// Stand-in dictionary carrying no evidence.
    pub fn placeholder(trait_name: impl Into<String>) -> Self {
        Dictionary {
            trait_name: trait_name.into(),
            type_key: None,
            methods: Vec::new(),
            supers: Vec::new(),
        }
    }

    /// No instance behind it. Marker traits still carry their type key.
    pub fn is_placeholder(&self) -> bool {
        self.type_key.is_none() && self.methods.is_empty() && self.supers.is_empty()
    }

    /// Transitively search super dictionaries for `trait_name`.
    pub fn find_super(&self, trait_name: &str) -> Option<Arc<Dictionary>> {
        for sup in &self.supers {
            if sup.trait_name == trait_name {
                return Some(Arc::clone(sup));
            }
            if let Some(found) = sup.find_super(trait_name) {
                return Some(found);
            }
        }
        None
    }
}

#[derive(Debug)]
pub struct BoundMethod {
    pub method: Value,
    pub receiver: Value,
}

#[derive(Debug)]
pub struct ComposedFunction {
    pub outer: Value,
    pub inner: Value,
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::Str(Arc::from(s))
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Arc::new(items))
    }

    pub fn tuple(items: Vec<Value>) -> Self {
        Value::Tuple(Arc::new(items))
    }

    pub fn data(type_name: &str, constructor: &str, fields: Vec<Value>) -> Self {
        Value::Data(Arc::new(DataValue {
            type_name: type_name.to_string(),
            constructor: constructor.to_string(),
            fields,
        }))
    }

    pub fn partial(callee: Value, args: Vec<Value>, remaining: usize) -> Self {
        Value::Partial(Arc::new(PartialApplication {
            callee,
            args,
            remaining,
        }))
    }

    pub fn bound(method: Value, receiver: Value) -> Self {
        Value::Bound(Arc::new(BoundMethod { method, receiver }))
    }

    /// Runtime type name, as used in instance keys
    pub fn type_name(&self) -> &str {
        match self {
            Value::Unit => "Unit",
            Value::Int(_) => "Int",
            Value::Float(_) => "Float",
            Value::Bool(_) => "Bool",
            Value::Char(_) => "Char",
            Value::Str(_) => "String",
            Value::List(_) => "List",
            Value::Tuple(_) => "Tuple",
            Value::Record(_) => "Record",
            Value::Data(d) => &d.type_name,
            Value::Range(..) => "Range",
            Value::Error(_) => "Error",
            Value::Type(_) => "Type",
            Value::Host(h) => &h.type_name,
            Value::Dictionary(_) => "Dictionary",
            Value::Function(_)
            | Value::Builtin(_)
            | Value::Partial(_)
            | Value::Constructor(_)
            | Value::ClassMethod(_)
            | Value::Bound(_)
            | Value::Operator(_)
            | Value::Composed(_) => "Function",
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(
            self,
            Value::Function(_)
                | Value::Builtin(_)
                | Value::Partial(_)
                | Value::Constructor(_)
                | Value::ClassMethod(_)
                | Value::Bound(_)
                | Value::Operator(_)
                | Value::Composed(_)
        )
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_dictionary(&self) -> Option<&Arc<Dictionary>> {
        match self {
            Value::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    /// Display form used inside containers, where strings are quoted.
    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Char(c) => write!(f, "{c:?}"),
            other => write!(f, "{other}"),
        }
    }
}

fn fmt_seq(f: &mut fmt::Formatter<'_>, open: &str, items: &[Value], close: &str) -> fmt::Result {
    write!(f, "{open}")?;
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        item.fmt_nested(f)?;
    }
    write!(f, "{close}")
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Char(c) => write!(f, "{c}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::List(items) => fmt_seq(f, "[", items, "]"),
            Value::Tuple(items) => fmt_seq(f, "(", items, ")"),
            Value::Record(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, " {k}: ")?;
                    v.fmt_nested(f)?;
                }
                write!(f, " }}")
            }
            Value::Data(d) => {
                write!(f, "{}", d.constructor)?;
                if d.fields.is_empty() {
                    Ok(())
                } else {
                    fmt_seq(f, "(", &d.fields, ")")
                }
            }
            Value::Range(start, end) => write!(f, "{start}..{end}"),
            Value::Error(e) => write!(f, "<error: {}>", e.message),
            Value::Type(t) => write!(f, "{t}"),
            Value::Host(h) => write!(f, "<host {}>", h.type_name),
            Value::Function(c) => write!(f, "<function {}>", c.name()),
            Value::Builtin(b) => write!(f, "<builtin {}>", b.name),
            Value::Partial(p) => write!(f, "<partial {} awaiting {}>", p.callee, p.remaining),
            Value::Constructor(c) => write!(f, "<constructor {}>", c.name),
            Value::ClassMethod(m) => write!(f, "<method {}.{}>", m.trait_name, m.method),
            Value::Dictionary(d) => match &d.type_key {
                Some(key) => write!(f, "<dictionary {} {}>", d.trait_name, key),
                None => write!(f, "<dictionary {}>", d.trait_name),
            },
            Value::Bound(b) => write!(f, "<bound {}>", b.method),
            Value::Operator(op) => write!(f, "({op})"),
            Value::Composed(c) => write!(f, "<{} . {}>", c.outer, c.inner),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Unit, Value::Unit) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Char(a), Value::Char(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Tuple(a), Value::Tuple(b)) => a == b,
            (Value::Record(a), Value::Record(b)) => a == b,
            (Value::Data(a), Value::Data(b)) => a == b,
            (Value::Range(s1, e1), Value::Range(s2, e2)) => s1 == s2 && e1 == e2,
            (Value::Type(a), Value::Type(b)) => a == b,
            (Value::Operator(a), Value::Operator(b)) => a == b,
            // Callables and opaque values compare by identity
            (Value::Error(a), Value::Error(b)) => Arc::ptr_eq(a, b),
            (Value::Host(a), Value::Host(b)) => Arc::ptr_eq(&a.handle, &b.handle),
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => Arc::ptr_eq(a, b),
            (Value::Partial(a), Value::Partial(b)) => Arc::ptr_eq(a, b),
            (Value::Constructor(a), Value::Constructor(b)) => Arc::ptr_eq(a, b),
            (Value::ClassMethod(a), Value::ClassMethod(b)) => Arc::ptr_eq(a, b),
            (Value::Dictionary(a), Value::Dictionary(b)) => Arc::ptr_eq(a, b),
            (Value::Bound(a), Value::Bound(b)) => Arc::ptr_eq(a, b),
            (Value::Composed(a), Value::Composed(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_value_is_send_sync() {
        assert_send_sync::<Value>();
    }

    #[test]
    fn test_value_display() {
        assert_eq!(Value::Int(42).to_string(), "42");
        assert_eq!(Value::string("hi").to_string(), "hi");
        assert_eq!(
            Value::list(vec![Value::Int(1), Value::string("a")]).to_string(),
            "[1, \"a\"]"
        );
        assert_eq!(Value::data("Option", "Some", vec![Value::Int(1)]).to_string(), "Some(1)");
        assert_eq!(Value::data("Option", "None", vec![]).to_string(), "None");
        assert_eq!(Value::Operator(BinOp::Add).to_string(), "(+)");
    }

    #[test]
    fn test_record_display_keeps_order() {
        let mut fields = IndexMap::new();
        fields.insert("y".to_string(), Value::Int(2));
        fields.insert("x".to_string(), Value::Int(1));
        assert_eq!(Value::Record(Arc::new(fields)).to_string(), "{ y: 2, x: 1 }");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Int(1).type_name(), "Int");
        assert_eq!(Value::string("").type_name(), "String");
        assert_eq!(Value::list(vec![]).type_name(), "List");
        assert_eq!(Value::data("Option", "None", vec![]).type_name(), "Option");
        assert_eq!(Value::Operator(BinOp::Mul).type_name(), "Function");
        assert!(Value::Operator(BinOp::Mul).is_callable());
        assert!(!Value::Int(1).is_callable());
    }

    #[test]
    fn test_structural_and_identity_equality() {
        assert_eq!(Value::list(vec![Value::Int(1)]), Value::list(vec![Value::Int(1)]));
        let dict = Arc::new(Dictionary::placeholder("Eq"));
        assert_eq!(Value::Dictionary(dict.clone()), Value::Dictionary(dict));
        assert_ne!(
            Value::Dictionary(Arc::new(Dictionary::placeholder("Eq"))),
            Value::Dictionary(Arc::new(Dictionary::placeholder("Eq")))
        );
    }

    #[test]
    fn test_find_super_is_transitive() {
        let eq = Arc::new(Dictionary {
            trait_name: "Eq".to_string(),
            type_key: Some(TypeKey::single("Int")),
            methods: vec![Value::Operator(BinOp::Eq)],
            supers: vec![],
        });
        let ord = Arc::new(Dictionary {
            trait_name: "Ord".to_string(),
            type_key: Some(TypeKey::single("Int")),
            methods: vec![Value::Operator(BinOp::Lt)],
            supers: vec![eq],
        });
        let num = Dictionary {
            trait_name: "Num".to_string(),
            type_key: Some(TypeKey::single("Int")),
            methods: vec![],
            supers: vec![ord],
        };
        assert!(!num.is_placeholder());
        let marker = Dictionary {
            trait_name: "Marker".to_string(),
            type_key: Some(TypeKey::single("Int")),
            methods: vec![],
            supers: vec![],
        };
        assert!(!marker.is_placeholder());
        assert!(Dictionary::placeholder("Marker").is_placeholder());
        assert_eq!(num.find_super("Eq").map(|d| d.trait_name.clone()), Some("Eq".to_string()));
        assert!(num.find_super("Show").is_none());
    }
}
