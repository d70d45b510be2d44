//! Capabilities supplied by the embedding host

use super::error::InterpResult;
use super::value::{HostValue, Value};

/// Access to members of foreign values.
///
/// The evaluator never inspects a [`HostValue`] itself; member calls and
/// field reads are forwarded here.
pub trait HostBridge: Send + Sync {
    fn call_member(&self, target: &HostValue, member: &str, args: Vec<Value>) -> InterpResult<Value>;

    fn read_field(&self, target: &HostValue, field: &str) -> InterpResult<Value>;
}

/// Last resort for callables the engine does not know how to apply.
pub trait FallbackCallHandler: Send + Sync {
    /// `None` declines the call, which then fails as "not a function".
    fn try_call(&self, callee: &Value, args: &[Value]) -> Option<InterpResult<Value>>;
}
