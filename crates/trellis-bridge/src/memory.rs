//! In-memory implementation of the foreign object protocol.
//!
//! [`MemoryRuntime`] models a small dynamic object system: integers, floats,
//! booleans, strings, lists, iterators, classes with base classes, and
//! objects carrying attributes and native methods. It lets an embedder
//! exercise interface descriptions without a real interpreter, and backs
//! the bridge's own tests.
//!
//! Every protocol call is counted, so callers can check how many foreign
//! round-trips an operation made.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::runtime::{Advance, ForeignArg, ForeignError, ForeignHandle, ForeignResult, ForeignRuntime};

/// A native method: receives the runtime, the receiver and the arguments.
pub type NativeMethod = Arc<
    dyn Fn(&MemoryRuntime, &ForeignHandle, &[ForeignArg]) -> ForeignResult<Option<ForeignHandle>>
        + Send
        + Sync,
>;

/// Reference to a node of a [`MemoryRuntime`], carried inside a [`ForeignHandle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MemoryRef(usize);

enum Node {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    List(Vec<Option<ForeignHandle>>),
    Iter {
        list: usize,
        position: usize,
    },
    Class {
        qualified: String,
        module: ForeignHandle,
        name: ForeignHandle,
        bases: ForeignHandle,
    },
    Object {
        class: ForeignHandle,
        class_name: String,
        attributes: HashMap<String, Option<ForeignHandle>>,
        methods: HashMap<String, NativeMethod>,
    },
}

impl Node {
    fn type_name(&self) -> &str {
        match self {
            Node::Int(_) => "int",
            Node::Float(_) => "float",
            Node::Bool(_) => "bool",
            Node::Str(_) => "str",
            Node::List(_) => "list",
            Node::Iter { .. } => "list_iterator",
            Node::Class { .. } => "type",
            Node::Object { class_name, .. } => class_name,
        }
    }
}

fn type_error(message: impl Into<String>) -> ForeignError {
    ForeignError::new("TypeError", message)
}

fn attribute_error(type_name: &str, attribute: &str) -> ForeignError {
    ForeignError::new(
        "AttributeError",
        format!("'{type_name}' object has no attribute '{attribute}'"),
    )
}

/// An in-memory foreign runtime.
///
/// Nodes are never freed: every value built, every `iterate` and every
/// materialized argument adds one for the life of the runtime. Meant for
/// tests and short-lived embeddings, not long-running processes.
#[derive(Default)]
pub struct MemoryRuntime {
    nodes: Mutex<Vec<Node>>,
    calls: AtomicUsize,
}

impl MemoryRuntime {
    /// Create an empty runtime.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of protocol calls made so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of nodes allocated so far.
    pub fn node_count(&self) -> usize {
        self.nodes.lock().len()
    }

    /// Reset the protocol call counter.
    pub fn reset_calls(&self) {
        self.calls.store(0, Ordering::SeqCst);
    }

    fn count(&self, operation: &str) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        trace!(operation, "memory runtime call");
    }

    fn alloc(&self, node: Node) -> ForeignHandle {
        let mut nodes = self.nodes.lock();
        nodes.push(node);
        ForeignHandle::new(MemoryRef(nodes.len() - 1))
    }

    fn id(&self, handle: &ForeignHandle) -> ForeignResult<usize> {
        let id = handle
            .downcast_ref::<MemoryRef>()
            .map(|r| r.0)
            .ok_or_else(|| type_error("handle does not belong to this runtime"))?;
        if id < self.nodes.lock().len() {
            Ok(id)
        } else {
            Err(type_error(format!("dangling reference {id}")))
        }
    }

    /// A new integer.
    pub fn int(&self, value: i64) -> ForeignHandle {
        self.alloc(Node::Int(value))
    }

    /// A new float.
    pub fn float(&self, value: f64) -> ForeignHandle {
        self.alloc(Node::Float(value))
    }

    /// A new boolean.
    pub fn bool(&self, value: bool) -> ForeignHandle {
        self.alloc(Node::Bool(value))
    }

    /// A new string.
    pub fn str(&self, value: &str) -> ForeignHandle {
        self.alloc(Node::Str(value.to_string()))
    }

    /// A new list. `None` items are the foreign `None`.
    pub fn list(&self, items: Vec<Option<ForeignHandle>>) -> ForeignHandle {
        self.alloc(Node::List(items))
    }

    /// Append to a list.
    pub fn push(&self, list: &ForeignHandle, item: Option<ForeignHandle>) -> ForeignResult<()> {
        let id = self.id(list)?;
        match &mut self.nodes.lock()[id] {
            Node::List(items) => {
                items.push(item);
                Ok(())
            }
            other => Err(attribute_error(other.type_name(), "append")),
        }
    }

    /// A new class with the given module, name and base classes.
    pub fn class(&self, module: &str, name: &str, bases: &[ForeignHandle]) -> ForeignHandle {
        let module_handle = self.str(module);
        let name_handle = self.str(name);
        let bases = self.list(bases.iter().cloned().map(Some).collect());
        self.alloc(Node::Class {
            qualified: format!("{module}.{name}"),
            module: module_handle,
            name: name_handle,
            bases,
        })
    }

    /// A new instance of `class`, with no attributes.
    pub fn object(&self, class: &ForeignHandle) -> ForeignResult<ForeignHandle> {
        let id = self.id(class)?;
        let class_name = match &self.nodes.lock()[id] {
            Node::Class { qualified, .. } => qualified
                .rsplit('.')
                .next()
                .unwrap_or(qualified.as_str())
                .to_string(),
            other => return Err(type_error(format!("'{}' is not a class", other.type_name()))),
        };
        Ok(self.alloc(Node::Object {
            class: class.clone(),
            class_name,
            attributes: HashMap::new(),
            methods: HashMap::new(),
        }))
    }

    /// Set an attribute of an object.
    pub fn set_attribute(
        &self,
        object: &ForeignHandle,
        name: &str,
        value: Option<ForeignHandle>,
    ) -> ForeignResult<()> {
        let id = self.id(object)?;
        match &mut self.nodes.lock()[id] {
            Node::Object { attributes, .. } => {
                attributes.insert(name.to_string(), value);
                Ok(())
            }
            other => Err(attribute_error(other.type_name(), name)),
        }
    }

    /// Define a native method on an object.
    pub fn define_method<F>(&self, object: &ForeignHandle, name: &str, method: F) -> ForeignResult<()>
    where
        F: Fn(&MemoryRuntime, &ForeignHandle, &[ForeignArg]) -> ForeignResult<Option<ForeignHandle>>
            + Send
            + Sync
            + 'static,
    {
        let id = self.id(object)?;
        match &mut self.nodes.lock()[id] {
            Node::Object { methods, .. } => {
                methods.insert(name.to_string(), Arc::new(method));
                Ok(())
            }
            other => Err(attribute_error(other.type_name(), name)),
        }
    }

    /// Turn a marshaled argument back into a foreign value.
    pub fn materialize(&self, arg: &ForeignArg) -> ForeignResult<Option<ForeignHandle>> {
        match arg {
            ForeignArg::Null => Ok(None),
            ForeignArg::Str(s) => Ok(Some(self.str(s))),
            ForeignArg::Int(i) => Ok(Some(self.int(*i))),
            ForeignArg::Float(x) => Ok(Some(self.float(*x))),
            ForeignArg::Handle(handle) => Ok(Some(handle.clone())),
            ForeignArg::Value(value) => Err(type_error(format!(
                "cannot pass a {} to a foreign call",
                value.kind()
            ))),
        }
    }
}

impl fmt::Debug for MemoryRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryRuntime")
            .field("nodes", &self.nodes.lock().len())
            .field("calls", &self.calls())
            .finish()
    }
}

impl ForeignRuntime for MemoryRuntime {
    fn get_attribute(&self, object: &ForeignHandle, name: &str) -> ForeignResult<Option<ForeignHandle>> {
        self.count("getattr");
        let id = self.id(object)?;
        let nodes = self.nodes.lock();
        match (&nodes[id], name) {
            (Node::Class { module, .. }, "__module__") => Ok(Some(module.clone())),
            (Node::Class { name, .. }, "__name__") => Ok(Some(name.clone())),
            (Node::Class { bases, .. }, "__bases__") => Ok(Some(bases.clone())),
            (Node::Object { class, .. }, "__class__") => Ok(Some(class.clone())),
            (Node::Object { attributes, .. }, _) => match attributes.get(name) {
                Some(value) => Ok(value.clone()),
                None => Err(attribute_error(nodes[id].type_name(), name)),
            },
            (other, _) => Err(attribute_error(other.type_name(), name)),
        }
    }

    fn call_method(
        &self,
        object: &ForeignHandle,
        name: &str,
        args: &[ForeignArg],
    ) -> ForeignResult<Option<ForeignHandle>> {
        self.count("call");
        let id = self.id(object)?;
        let method = {
            let nodes = self.nodes.lock();
            let found = match &nodes[id] {
                Node::Object { methods, .. } => methods.get(name).cloned(),
                _ => None,
            };
            found.ok_or_else(|| attribute_error(nodes[id].type_name(), name))?
        };
        method(self, object, args)
    }

    fn equals(&self, a: &ForeignHandle, b: &ForeignHandle) -> ForeignResult<bool> {
        self.count("eq");
        let (a, b) = (self.id(a)?, self.id(b)?);
        if a == b {
            return Ok(true);
        }
        let nodes = self.nodes.lock();
        Ok(match (&nodes[a], &nodes[b]) {
            (Node::Int(x), Node::Int(y)) => x == y,
            (Node::Float(x), Node::Float(y)) => x == y,
            (Node::Int(x), Node::Float(y)) | (Node::Float(y), Node::Int(x)) => (*x as f64) == *y,
            (Node::Bool(x), Node::Bool(y)) => x == y,
            (Node::Str(x), Node::Str(y)) => x == y,
            _ => false,
        })
    }

    fn hash(&self, object: &ForeignHandle) -> ForeignResult<i64> {
        self.count("hash");
        let id = self.id(object)?;
        let nodes = self.nodes.lock();
        Ok(match &nodes[id] {
            Node::Int(i) => *i,
            Node::Bool(b) => i64::from(*b),
            Node::Str(s) => {
                let mut hasher = DefaultHasher::new();
                s.hash(&mut hasher);
                hasher.finish() as i64
            }
            Node::List(_) => return Err(type_error("unhashable type: 'list'")),
            _ => id as i64,
        })
    }

    fn length(&self, object: &ForeignHandle) -> ForeignResult<usize> {
        self.count("len");
        let id = self.id(object)?;
        match &self.nodes.lock()[id] {
            Node::List(items) => Ok(items.len()),
            Node::Str(s) => Ok(s.chars().count()),
            other => Err(type_error(format!(
                "object of type '{}' has no len()",
                other.type_name()
            ))),
        }
    }

    fn iterate(&self, object: &ForeignHandle) -> ForeignResult<ForeignHandle> {
        self.count("iter");
        let id = self.id(object)?;
        let node = {
            let nodes = self.nodes.lock();
            match &nodes[id] {
                Node::List(_) => Node::Iter {
                    list: id,
                    position: 0,
                },
                Node::Iter { .. } => return Ok(object.clone()),
                other => {
                    return Err(type_error(format!(
                        "'{}' object is not iterable",
                        other.type_name()
                    )))
                }
            }
        };
        Ok(self.alloc(node))
    }

    fn advance(&self, iterator: &ForeignHandle) -> ForeignResult<Advance> {
        self.count("next");
        let id = self.id(iterator)?;
        let mut nodes = self.nodes.lock();
        let (list, position) = match &nodes[id] {
            Node::Iter { list, position } => (*list, *position),
            other => {
                return Err(type_error(format!(
                    "'{}' object is not an iterator",
                    other.type_name()
                )))
            }
        };
        let item = match &nodes[list] {
            Node::List(items) => items.get(position).cloned(),
            _ => None,
        };
        let Some(item) = item else {
            return Ok(Advance::Done);
        };
        if let Node::Iter { position, .. } = &mut nodes[id] {
            *position += 1;
        }
        Ok(Advance::Item(item))
    }

    fn stringify(&self, object: &ForeignHandle) -> ForeignResult<String> {
        self.count("str");
        let id = self.id(object)?;
        let custom = {
            let nodes = self.nodes.lock();
            match &nodes[id] {
                Node::Int(i) => return Ok(i.to_string()),
                Node::Float(x) => return Ok(format!("{x:?}")),
                Node::Bool(true) => return Ok("True".to_string()),
                Node::Bool(false) => return Ok("False".to_string()),
                Node::Str(s) => return Ok(s.clone()),
                Node::List(items) => return Ok(format!("<list of {}>", items.len())),
                Node::Iter { .. } => return Ok("<list_iterator>".to_string()),
                Node::Class { qualified, .. } => return Ok(format!("<class '{qualified}'>")),
                Node::Object {
                    methods, class_name, ..
                } => match methods.get("__str__") {
                    Some(method) => Arc::clone(method),
                    None => return Ok(format!("<{class_name} object>")),
                },
            }
        };
        let text = custom(self, object, &[])?;
        match text {
            Some(text) => self
                .string_value(&text)?
                .ok_or_else(|| type_error("__str__ returned a non-string")),
            None => Err(type_error("__str__ returned None")),
        }
    }

    fn type_of(&self, object: &ForeignHandle) -> ForeignResult<Option<ForeignHandle>> {
        self.count("type");
        let id = self.id(object)?;
        match &self.nodes.lock()[id] {
            Node::Object { class, .. } => Ok(Some(class.clone())),
            _ => Ok(None),
        }
    }

    fn int_value(&self, object: &ForeignHandle) -> ForeignResult<i64> {
        self.count("int");
        let id = self.id(object)?;
        match &self.nodes.lock()[id] {
            Node::Int(i) => Ok(*i),
            Node::Bool(b) => Ok(i64::from(*b)),
            Node::Float(x) => Ok(*x as i64),
            other => Err(type_error(format!(
                "int() argument must be a number, not '{}'",
                other.type_name()
            ))),
        }
    }

    fn float_value(&self, object: &ForeignHandle) -> ForeignResult<f64> {
        self.count("float");
        let id = self.id(object)?;
        match &self.nodes.lock()[id] {
            Node::Float(x) => Ok(*x),
            Node::Int(i) => Ok(*i as f64),
            Node::Bool(b) => Ok(f64::from(u8::from(*b))),
            other => Err(type_error(format!(
                "float() argument must be a number, not '{}'",
                other.type_name()
            ))),
        }
    }

    fn string_value(&self, object: &ForeignHandle) -> ForeignResult<Option<String>> {
        self.count("string");
        let id = self.id(object)?;
        match &self.nodes.lock()[id] {
            Node::Str(s) => Ok(Some(s.clone())),
            other => Err(type_error(format!(
                "expected a string, found '{}'",
                other.type_name()
            ))),
        }
    }
}
