//! Values produced by conversions, and their extraction into Rust types.

use std::any::Any;
use std::sync::Arc;

use trellis_core::{Code, Literal};

use crate::error::{BridgeError, Result};
use crate::proxy::BridgedObject;
use crate::runtime::{ForeignArg, ForeignHandle};
use crate::sequence::LazySequence;

/// A converted value on the typed side of the bridge.
#[derive(Debug, Clone)]
pub enum Value {
    /// Absent value (foreign `None`, or a boxed target with no value).
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    /// Localizable text.
    Text(Literal),
    /// Constant of a code-list family.
    Code(Code),
    /// Foreign object bridged to an interface.
    Object(BridgedObject),
    /// Lazy view over a foreign collection.
    Sequence(LazySequence),
    /// Raw foreign handle, returned by pass-through bridging.
    Foreign(ForeignHandle),
    /// Result of a user-defined conversion strategy.
    Custom(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Text(_) => "text",
            Value::Code(_) => "code",
            Value::Object(_) => "object",
            Value::Sequence(_) => "sequence",
            Value::Foreign(_) => "foreign handle",
            Value::Custom(_) => "custom value",
        }
    }

    /// Whether this is [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Marshal this value as a foreign call argument.
    ///
    /// Strings (plain or localizable) become foreign strings, bridged objects
    /// are unwrapped to their handle, and numbers pass through. Anything else
    /// is passed through unchanged.
    pub fn into_foreign_arg(self) -> ForeignArg {
        match self {
            Value::Null => ForeignArg::Null,
            Value::Str(s) => ForeignArg::Str(s),
            Value::Text(text) => ForeignArg::Str(text.into_string()),
            Value::Int(i) => ForeignArg::Int(i),
            Value::Float(x) => ForeignArg::Float(x),
            Value::Object(object) => ForeignArg::Handle(object.handle().clone()),
            Value::Foreign(handle) => ForeignArg::Handle(handle),
            other => ForeignArg::Value(other),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<BridgedObject> for Value {
    fn from(object: BridgedObject) -> Self {
        Value::Object(object)
    }
}

/// Extract a Rust type from a converted [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

fn mismatch<T>(expected: &'static str, found: &Value) -> Result<T> {
    Err(BridgeError::TypeMismatch {
        expected,
        found: found.kind(),
    })
}

impl FromValue for Value {
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

impl FromValue for String {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Str(s) => Ok(s),
            Value::Text(text) => Ok(text.into_string()),
            other => mismatch("string", &other),
        }
    }
}

impl FromValue for Literal {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(text) => Ok(text),
            Value::Str(s) => Ok(Literal::from(s)),
            other => mismatch("text", &other),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => Ok(i),
            other => mismatch("int", &other),
        }
    }
}

impl FromValue for i32 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Int(i) => i32::try_from(i).map_err(|_| BridgeError::TypeMismatch {
                expected: "32-bit int",
                found: "int",
            }),
            other => mismatch("int", &other),
        }
    }
}

impl FromValue for f64 {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Float(x) => Ok(x),
            Value::Int(i) => Ok(i as f64),
            other => mismatch("float", &other),
        }
    }
}

impl FromValue for bool {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => mismatch("bool", &other),
        }
    }
}

impl FromValue for Code {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Code(code) => Ok(code),
            other => mismatch("code", &other),
        }
    }
}

impl FromValue for BridgedObject {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(object) => Ok(object),
            other => mismatch("object", &other),
        }
    }
}

impl FromValue for LazySequence {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Sequence(sequence) => Ok(sequence),
            other => mismatch("sequence", &other),
        }
    }
}

impl FromValue for ForeignHandle {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Foreign(handle) => Ok(handle),
            Value::Object(object) => Ok(object.handle().clone()),
            other => mismatch("foreign handle", &other),
        }
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}
