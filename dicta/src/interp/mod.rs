//! Tree-walking interpreter
//!
//! Evaluates analyzed programs. Calls go through the application engine in
//! `apply`, and trait methods are resolved to instances in `dispatch`.

mod apply;
mod builtins;
mod dispatch;
mod env;
mod error;
mod eval;
mod interop;
mod registry;
mod stacks;
mod trace;
mod value;

pub use apply::{callable_name, CallSite};
pub use builtins::BuiltinSpec;
pub use dispatch::Resolution;
pub use env::{child_env, EnvRef, Environment};
pub use error::{ErrorKind, InterpResult, RuntimeError};
pub use eval::Interpreter;
pub use interop::{FallbackCallHandler, HostBridge};
pub use registry::{MethodTable, TraitRegistry, TypeKey};
pub use stacks::{EvalStacks, ScopedStack, StackGuard, WitnessFrame, WitnessStack, RESULT_KEY};
pub use trace::{CallFrame, CallStack};
pub use value::{
    BoundMethod, Builtin, BuiltinFn, ClassMethod, Closure, ComposedFunction, ConstructorFn, DataValue, Dictionary,
    HostValue, PartialApplication, Value,
};
