//! Bridged objects: typed method calls dispatched onto foreign objects.

use std::fmt;
use std::sync::Arc;

use tracing::trace;
use trellis_core::TypeDesc;

use crate::dispatch::{DispatchTable, ReturnShape};
use crate::environment::Environment;
use crate::error::Result;
use crate::runtime::{ForeignArg, ForeignHandle};
use crate::sequence::LazySequence;
use crate::value::{FromValue, Value};

struct ProxyBinding {
    env: Environment,
    handle: ForeignHandle,
    table: Arc<DispatchTable>,
}

/// A foreign object bound to one interface.
///
/// Method calls are looked up in the interface's dispatch table, forwarded
/// by name to the foreign object, and their results converted on the way
/// back. Nothing is cached between calls: every call reaches the foreign
/// object.
///
/// Cloning yields the same instance; see [`BridgedObject::same_instance`].
#[derive(Clone)]
pub struct BridgedObject {
    inner: Arc<ProxyBinding>,
}

impl BridgedObject {
    pub(crate) fn new(env: Environment, handle: ForeignHandle, table: Arc<DispatchTable>) -> Self {
        Self {
            inner: Arc::new(ProxyBinding { env, handle, table }),
        }
    }

    /// The underlying foreign object.
    pub fn handle(&self) -> &ForeignHandle {
        &self.inner.handle
    }

    /// The interface this object is bridged as.
    pub fn interface(&self) -> &str {
        self.inner.table.interface()
    }

    /// The environment this object was created by.
    pub fn environment(&self) -> &Environment {
        &self.inner.env
    }

    /// Whether this object was bridged without an interface description.
    pub fn is_pass_through(&self) -> bool {
        self.inner.table.is_pass_through()
    }

    /// Whether this object's interface is `interface` or inherits from it.
    pub fn implements(&self, interface: &str) -> bool {
        self.inner.env.registry().is_subtype(self.interface(), interface)
    }

    /// Whether both values are the same bridged instance.
    pub fn same_instance(&self, other: &BridgedObject) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Invoke a method by its typed-side name.
    ///
    /// `toString`, `hashCode` and `equals` with their usual argument counts
    /// are answered by [`describe`](Self::describe),
    /// [`hash_code`](Self::hash_code) and [`equals`](Self::equals). Every
    /// other call reads the foreign attribute when no argument is given and
    /// invokes the foreign method otherwise.
    pub fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value> {
        match (method, args.as_slice()) {
            ("toString", []) => return self.describe().map(Value::Str),
            ("hashCode", []) => return self.hash_code().map(Value::Int),
            ("equals", [other]) => return self.equals(other).map(Value::Bool),
            _ => {}
        }
        let binding = self.inner.table.lookup(method, args.len())?;
        let runtime = self.inner.env.runtime();
        trace!(
            interface = self.interface(),
            method,
            foreign = %binding.foreign_name,
            argc = args.len(),
            "dispatching"
        );
        let result = if args.is_empty() {
            runtime.get_attribute(&self.inner.handle, &binding.foreign_name)?
        } else {
            let args: Vec<ForeignArg> = args.into_iter().map(Value::into_foreign_arg).collect();
            runtime.call_method(&self.inner.handle, &binding.foreign_name, &args)?
        };
        self.convert_result(&binding.shape, result)
    }

    /// Invoke a zero-argument method and extract the result.
    pub fn get<T: FromValue>(&self, method: &str) -> Result<T> {
        T::from_value(self.invoke(method, Vec::new())?)
    }

    /// Invoke a method with arguments and extract the result.
    pub fn call<T: FromValue>(&self, method: &str, args: Vec<Value>) -> Result<T> {
        T::from_value(self.invoke(method, args)?)
    }

    /// Foreign `str` of the object.
    pub fn describe(&self) -> Result<String> {
        Ok(self.inner.env.runtime().stringify(&self.inner.handle)?)
    }

    /// Foreign hash of the object.
    pub fn hash_code(&self) -> Result<i64> {
        Ok(self.inner.env.runtime().hash(&self.inner.handle)?)
    }

    /// Foreign equality with another bridged object.
    ///
    /// Anything that is not a bridged object compares unequal without a
    /// foreign call.
    pub fn equals(&self, other: &Value) -> Result<bool> {
        match other {
            Value::Object(other) => Ok(self
                .inner
                .env
                .runtime()
                .equals(&self.inner.handle, other.handle())?),
            _ => Ok(false),
        }
    }

    fn convert_result(&self, shape: &ReturnShape, result: Option<ForeignHandle>) -> Result<Value> {
        let env = &self.inner.env;
        match shape {
            ReturnShape::Raw => Ok(result.map_or(Value::Null, Value::Foreign)),
            ReturnShape::Sequence(generic) => {
                let sequence = match result {
                    Some(collection) => {
                        let element = env.element_type(generic)?;
                        LazySequence::new(env.clone(), &element, collection)?
                    }
                    None => {
                        let element = env
                            .element_type(generic)
                            .unwrap_or_else(|_| TypeDesc::Named(generic.to_string()));
                        LazySequence::empty(env.clone(), element)
                    }
                };
                Ok(Value::Sequence(sequence))
            }
            ReturnShape::Single(target) => {
                if let (Some(returned), TypeDesc::Interface(interface)) = (&result, target) {
                    if env.runtime().equals(returned, &self.inner.handle)? {
                        trace!(interface = %interface, "method returned its receiver");
                        if interface == self.interface() {
                            return Ok(Value::Object(self.clone()));
                        }
                        return match env.to_typed(Some(&self.inner.handle), target)? {
                            Value::Object(rebound) if rebound.interface() == self.interface() => {
                                Ok(Value::Object(self.clone()))
                            }
                            other => Ok(other),
                        };
                    }
                }
                env.to_typed(result.as_ref(), target)
            }
        }
    }
}

impl fmt::Debug for BridgedObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BridgedObject")
            .field("interface", &self.interface())
            .field("handle", &self.inner.handle)
            .finish()
    }
}
