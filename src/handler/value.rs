//! Values found in scopes and handler properties

use std::fmt;
use std::sync::Arc;

use super::{HandlerRef, MacroHandler};

/// A property value as seen by the resolver
#[derive(Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    /// A plain callable that is not a macro; never invoked by the engine
    Function,
    /// A nested object that can act as a handler
    Object(HandlerRef),
}

impl Value {
    pub fn object(handler: impl MacroHandler + 'static) -> Self {
        Value::Object(Arc::new(handler))
    }

    pub fn as_handler(&self) -> Option<&HandlerRef> {
        match self {
            Value::Object(h) => Some(h),
            _ => None,
        }
    }

    pub fn into_handler(self) -> Option<HandlerRef> {
        match self {
            Value::Object(h) => Some(h),
            _ => None,
        }
    }

    /// Text rendered for a value macro; `None` for functions and objects
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(b) => Some(b.to_string()),
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Function | Value::Object(_) => None,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Function => write!(f, "Function"),
            Value::Object(_) => write!(f, "Object(..)"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) | (Value::Function, Value::Function) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => {
                std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
            }
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<HandlerRef> for Value {
    fn from(h: HandlerRef) -> Self {
        Value::Object(h)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}
