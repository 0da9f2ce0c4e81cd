//! The foreign object protocol consumed by the bridge.
//!
//! The embedding layer implements [`ForeignRuntime`] for a concrete foreign
//! runtime. The bridge only ever talks to foreign objects through this
//! protocol: attribute lookup, method invocation by name, equality, `hash`,
//! `len`, iteration, `str`, `type`, and scalar value extraction.
//!
//! A foreign `None` is represented as `Option::None` wherever a handle may be
//! absent. End of iteration is a first-class [`Advance::Done`] outcome, never
//! an error.

use std::any::Any;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::value::Value;

/// Opaque, shared reference to a foreign object.
///
/// Cloning a handle clones the reference, not the object. Two handles may
/// denote the same foreign object; only [`ForeignRuntime::equals`] can tell.
#[derive(Clone)]
pub struct ForeignHandle(Arc<dyn Any + Send + Sync>);

impl ForeignHandle {
    /// Wrap a runtime-specific reference.
    pub fn new<T: Any + Send + Sync>(reference: T) -> Self {
        Self(Arc::new(reference))
    }

    /// Borrow the runtime-specific reference, if it has the given type.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Address of the shared reference. Stable for the lifetime of the handle.
    pub fn identity(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    /// Whether both handles are clones of the same reference.
    pub fn same_reference(&self, other: &ForeignHandle) -> bool {
        self.identity() == other.identity()
    }
}

impl fmt::Debug for ForeignHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ForeignHandle({:#x})", self.identity())
    }
}

impl Hash for ForeignHandle {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity().hash(state);
    }
}

/// An error raised by the foreign side.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ForeignError {
    /// Foreign exception type (`AttributeError`, `TypeError`, ...).
    pub kind: String,
    /// Foreign exception message.
    pub message: String,
}

impl ForeignError {
    /// Create a foreign error.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }
}

/// Result type alias for foreign protocol calls.
pub type ForeignResult<T> = std::result::Result<T, ForeignError>;

/// Outcome of advancing a foreign iterator.
#[derive(Debug, Clone)]
pub enum Advance {
    /// The iterator is exhausted.
    Done,
    /// The next element, which may be the foreign `None`.
    Item(Option<ForeignHandle>),
}

/// An argument marshaled for a foreign method call.
#[derive(Debug, Clone)]
pub enum ForeignArg {
    /// Foreign `None`.
    Null,
    /// A string, converted to the foreign string representation.
    Str(String),
    /// An integral number, passed through.
    Int(i64),
    /// A floating-point number, passed through.
    Float(f64),
    /// A foreign object, unwrapped from a bridged object or passed as-is.
    Handle(ForeignHandle),
    /// Anything else, passed through unchanged. The foreign call may reject it.
    Value(Value),
}

/// The protocol a foreign runtime exposes to the bridge.
///
/// Calls are synchronous and block until the foreign side returns or raises.
/// The runtime is assumed to be non-reentrant; callers serialize access.
pub trait ForeignRuntime: Send + Sync {
    /// Look up an attribute by name.
    fn get_attribute(&self, object: &ForeignHandle, name: &str) -> ForeignResult<Option<ForeignHandle>>;

    /// Invoke a method by name.
    fn call_method(
        &self,
        object: &ForeignHandle,
        name: &str,
        args: &[ForeignArg],
    ) -> ForeignResult<Option<ForeignHandle>>;

    /// Foreign equality (`==`).
    fn equals(&self, a: &ForeignHandle, b: &ForeignHandle) -> ForeignResult<bool>;

    /// Foreign `hash`.
    fn hash(&self, object: &ForeignHandle) -> ForeignResult<i64>;

    /// Foreign `len`.
    fn length(&self, object: &ForeignHandle) -> ForeignResult<usize>;

    /// Foreign `iter`: a fresh iterator over the object.
    fn iterate(&self, object: &ForeignHandle) -> ForeignResult<ForeignHandle>;

    /// Foreign `next`, with exhaustion reported as [`Advance::Done`].
    fn advance(&self, iterator: &ForeignHandle) -> ForeignResult<Advance>;

    /// Foreign `str`.
    fn stringify(&self, object: &ForeignHandle) -> ForeignResult<String>;

    /// Foreign `type`: the class of the object, if the runtime exposes one.
    fn type_of(&self, object: &ForeignHandle) -> ForeignResult<Option<ForeignHandle>>;

    /// Extract an integral value.
    fn int_value(&self, object: &ForeignHandle) -> ForeignResult<i64>;

    /// Extract a floating-point value.
    fn float_value(&self, object: &ForeignHandle) -> ForeignResult<f64>;

    /// Extract a string value.
    fn string_value(&self, object: &ForeignHandle) -> ForeignResult<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handle_identity_survives_clone() {
        let handle = ForeignHandle::new(42u32);
        let clone = handle.clone();
        assert!(handle.same_reference(&clone));
        assert_eq!(clone.downcast_ref::<u32>(), Some(&42));
        assert!(clone.downcast_ref::<String>().is_none());
    }

    #[test]
    fn distinct_handles_have_distinct_identities() {
        let a = ForeignHandle::new(1u32);
        let b = ForeignHandle::new(1u32);
        assert!(!a.same_reference(&b));
    }

    #[test]
    fn foreign_error_display() {
        let err = ForeignError::new("AttributeError", "no attribute 'title'");
        assert_eq!(err.to_string(), "AttributeError: no attribute 'title'");
    }
}
