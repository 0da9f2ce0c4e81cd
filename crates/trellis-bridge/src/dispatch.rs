//! Per-interface dispatch tables.
//!
//! A [`DispatchTable`] is built once per interface and shared by every
//! object bridged as that interface. It holds, for each method, the foreign
//! name to call (explicit override or mapped name) and the shape of the
//! return value, so dispatch does no signature analysis per call.

use std::borrow::Cow;
use std::collections::HashMap;

use tracing::debug;
use trellis_core::{to_foreign_name, GenericType, InterfaceDesc, MethodDesc, TypeDesc};

use crate::environment::Environment;
use crate::error::{BridgeError, Result};

/// How a method's foreign result is turned into a value.
#[derive(Debug, Clone)]
pub enum ReturnShape {
    /// Convert with the resolver for this type.
    Single(TypeDesc),
    /// Wrap in a lazy sequence; the element type comes from the signature.
    Sequence(GenericType),
    /// Return the foreign handle unconverted.
    Raw,
}

/// Dispatch information for one method.
#[derive(Debug, Clone)]
pub struct MethodBinding {
    /// Method name on the typed side.
    pub name: String,
    /// Name used on the foreign object.
    pub foreign_name: String,
    /// Expected number of arguments, or `None` when any count is accepted.
    pub arity: Option<usize>,
    /// Return value handling.
    pub shape: ReturnShape,
}

impl MethodBinding {
    fn managed(env: &Environment, method: &MethodDesc) -> Self {
        let shape = match env.type_of(&method.returns) {
            TypeDesc::Collection(generic) => ReturnShape::Sequence(generic),
            single => ReturnShape::Single(single),
        };
        Self {
            name: method.name.clone(),
            foreign_name: foreign_name_of(method),
            arity: Some(method.arity),
            shape,
        }
    }

    fn raw(name: &str, foreign_name: String) -> Self {
        Self {
            name: name.to_string(),
            foreign_name,
            arity: None,
            shape: ReturnShape::Raw,
        }
    }
}

fn foreign_name_of(method: &MethodDesc) -> String {
    method
        .foreign_name
        .clone()
        .unwrap_or_else(|| to_foreign_name(&method.name))
}

/// Method table of one interface.
#[derive(Debug)]
pub struct DispatchTable {
    interface: String,
    methods: HashMap<String, MethodBinding>,
    pass_through: bool,
}

impl DispatchTable {
    /// Build the table of a managed interface.
    ///
    /// Includes methods inherited from every ancestor. A method declared
    /// nearer to the interface hides one with the same name further up.
    pub fn build(env: &Environment, desc: &InterfaceDesc) -> Self {
        let mut methods = HashMap::new();
        let ancestors = env.registry().ancestors(&desc.name);
        let lineage = std::iter::once(desc.name.clone()).chain(ancestors);
        for name in lineage {
            let Some(declaring) = env.registry().get(&name) else {
                continue;
            };
            for method in &declaring.methods {
                methods
                    .entry(method.name.clone())
                    .or_insert_with(|| MethodBinding::managed(env, method));
            }
        }
        debug!(interface = %desc.name, methods = methods.len(), "built dispatch table");
        Self {
            interface: desc.name.clone(),
            methods,
            pass_through: false,
        }
    }

    /// Build a pass-through table.
    ///
    /// Any method name is accepted and its result returned unconverted.
    /// Foreign names declared for a registered interface are still honoured.
    pub fn pass_through(env: &Environment, interface: &str) -> Self {
        let mut methods = HashMap::new();
        if env.registry().contains(interface) {
            let ancestors = env.registry().ancestors(interface);
            for name in std::iter::once(interface.to_string()).chain(ancestors) {
                let Some(declaring) = env.registry().get(&name) else {
                    continue;
                };
                for method in &declaring.methods {
                    methods
                        .entry(method.name.clone())
                        .or_insert_with(|| MethodBinding::raw(&method.name, foreign_name_of(method)));
                }
            }
        }
        debug!(interface, methods = methods.len(), "built pass-through table");
        Self {
            interface: interface.to_string(),
            methods,
            pass_through: true,
        }
    }

    /// The interface this table dispatches for.
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// Whether unknown methods are forwarded unconverted.
    pub fn is_pass_through(&self) -> bool {
        self.pass_through
    }

    /// The binding of a declared or inherited method.
    pub fn get(&self, method: &str) -> Option<&MethodBinding> {
        self.methods.get(method)
    }

    /// Number of known methods.
    pub fn len(&self) -> usize {
        self.methods.len()
    }

    /// Whether no method is known.
    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// The binding to use for a call with `argc` arguments.
    pub fn lookup(&self, method: &str, argc: usize) -> Result<Cow<'_, MethodBinding>> {
        match self.methods.get(method) {
            Some(binding) => match binding.arity {
                Some(expected) if expected != argc => Err(BridgeError::ArityMismatch {
                    interface: self.interface.clone(),
                    method: method.to_string(),
                    expected,
                    found: argc,
                }),
                _ => Ok(Cow::Borrowed(binding)),
            },
            None if self.pass_through => {
                Ok(Cow::Owned(MethodBinding::raw(method, to_foreign_name(method))))
            }
            None => Err(BridgeError::UnknownMethod {
                interface: self.interface.clone(),
                method: method.to_string(),
            }),
        }
    }
}
