//! Interfacing policy: how each interface is bridged.
//!
//! The embedding layer decides, per interface, whether the bridge manages it
//! (dispatch through an interface description, with subtype specialization),
//! wraps it in a generic pass-through object, or hands conversion over to a
//! user-supplied strategy. It also supplies the hook that finds the most
//! specific interface for a foreign object when an interface has known
//! subtypes.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::trace;
use trellis_core::{InterfaceRegistry, TypeDesc};

use crate::environment::Environment;
use crate::error::Result;
use crate::runtime::{Advance, ForeignHandle};
use crate::value::Value;

type ConvertFn = dyn Fn(&ForeignHandle, &TypeDesc) -> Result<Value> + Send + Sync;

/// A caller-supplied conversion strategy.
#[derive(Clone)]
pub struct UserStrategy {
    convert: Arc<ConvertFn>,
    output: Option<TypeDesc>,
}

impl UserStrategy {
    /// Wrap a conversion function. It receives the raw handle and the target type.
    pub fn new<F>(convert: F) -> Self
    where
        F: Fn(&ForeignHandle, &TypeDesc) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            convert: Arc::new(convert),
            output: None,
        }
    }

    /// Declare the type this strategy produces.
    ///
    /// Without a declaration the strategy is assumed to produce exactly the
    /// requested type. A declared type that is not assignable to the requested
    /// one makes resolution fail.
    pub fn producing(mut self, output: TypeDesc) -> Self {
        self.output = Some(output);
        self
    }

    /// The declared output type, if any.
    pub fn output(&self) -> Option<&TypeDesc> {
        self.output.as_ref()
    }

    /// Run the strategy.
    pub fn convert(&self, handle: &ForeignHandle, target: &TypeDesc) -> Result<Value> {
        (self.convert)(handle, target)
    }
}

impl fmt::Debug for UserStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserStrategy")
            .field("output", &self.output)
            .finish_non_exhaustive()
    }
}

/// Classification of an interface.
#[derive(Debug, Clone)]
pub enum Interfacing {
    /// Bridged through the registry's interface description.
    Managed,
    /// Wrapped in a pass-through object with no specialization.
    Default,
    /// Converted by a caller-supplied strategy.
    UserDefined(UserStrategy),
}

impl Interfacing {
    /// Short name for logs.
    pub fn label(&self) -> &'static str {
        match self {
            Interfacing::Managed => "managed",
            Interfacing::Default => "default",
            Interfacing::UserDefined(_) => "user-defined",
        }
    }
}

/// Classification hook: decides how an interface (by name) is bridged.
pub type Classifier = Arc<dyn Fn(&InterfaceRegistry, &str) -> Interfacing + Send + Sync>;

/// Subtype hook: given a base interface and a foreign object, returns the
/// name of the most specific interface to bridge the object as.
pub type SubtypeResolver =
    Arc<dyn Fn(&Environment, &str, &ForeignHandle) -> Result<String> + Send + Sync>;

/// Classifier managing every registered interface and passing through the rest.
pub fn registry_classifier() -> Classifier {
    Arc::new(|registry: &InterfaceRegistry, name: &str| {
        if registry.contains(name) {
            Interfacing::Managed
        } else {
            Interfacing::Default
        }
    })
}

/// Subtype hook that never specializes.
pub fn base_type_resolver() -> SubtypeResolver {
    Arc::new(|_: &Environment, base: &str, _: &ForeignHandle| Ok(base.to_string()))
}

/// Index from foreign class names to interfaces.
///
/// Finds the most specific interface for a foreign object by looking at the
/// object's class and, recursively, at the classes it derives from
/// (`__bases__`). Only classes whose `__module__` starts with the configured
/// prefix are considered.
#[derive(Debug, Clone, Default)]
pub struct ClassIndex {
    module_prefix: Option<String>,
    classes: HashMap<String, String>,
}

impl ClassIndex {
    /// Build the index from the foreign classes declared in a registry.
    ///
    /// Declared class names may carry a standard prefix ending in `_`
    /// (`CI_Citation`); the index is keyed by the part after it, which is the
    /// foreign class name. Names listed in `excludes` are skipped, and on a
    /// collision the interface with the smallest name wins.
    pub fn from_registry(
        registry: &InterfaceRegistry,
        module_prefix: Option<String>,
        excludes: &[String],
    ) -> Self {
        let mut declared: Vec<(&str, &str)> = registry
            .iter()
            .filter_map(|desc| {
                desc.foreign_class
                    .as_deref()
                    .map(|class| (desc.name.as_str(), class))
            })
            .filter(|(_, class)| !excludes.iter().any(|e| e == class))
            .collect();
        declared.sort_unstable();
        let mut classes = HashMap::with_capacity(declared.len());
        for (interface, class) in declared {
            let key = class.split_once('_').map_or(class, |(_, rest)| rest);
            classes
                .entry(key.to_string())
                .or_insert_with(|| interface.to_string());
        }
        Self {
            module_prefix,
            classes,
        }
    }

    /// Number of indexed classes.
    pub fn len(&self) -> usize {
        self.classes.len()
    }

    /// Whether no class is indexed.
    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    /// The interface mapped to a foreign class name, if any.
    pub fn interface_named(&self, class_name: &str) -> Option<&str> {
        self.classes.get(class_name).map(String::as_str)
    }

    /// The interface mapped to a foreign class object, if any.
    pub fn interface_for_class(
        &self,
        env: &Environment,
        class: &ForeignHandle,
    ) -> Result<Option<String>> {
        let runtime = env.runtime();
        if let Some(prefix) = &self.module_prefix {
            let module = match runtime.get_attribute(class, "__module__")? {
                Some(module) => runtime.string_value(&module)?,
                None => None,
            };
            if !module.is_some_and(|m| m.starts_with(prefix.as_str())) {
                return Ok(None);
            }
        }
        let Some(name) = runtime.get_attribute(class, "__name__")? else {
            return Ok(None);
        };
        let name = runtime.string_value(&name)?;
        Ok(name.and_then(|n| self.classes.get(&n).cloned()))
    }

    /// Search the base classes of `class` for an interface assignable to `base`.
    ///
    /// Bases that are not indexed are searched recursively; indexed bases that
    /// are not subtypes of `base` are skipped.
    pub fn specialize(
        &self,
        env: &Environment,
        base: &str,
        class: &ForeignHandle,
    ) -> Result<Option<String>> {
        let runtime = env.runtime();
        let Some(bases) = runtime.get_attribute(class, "__bases__")? else {
            return Ok(None);
        };
        let iter = runtime.iterate(&bases)?;
        while let Advance::Item(parent) = runtime.advance(&iter)? {
            let Some(parent) = parent else { continue };
            match self.interface_for_class(env, &parent)? {
                None => {
                    if let Some(found) = self.specialize(env, base, &parent)? {
                        return Ok(Some(found));
                    }
                }
                Some(found) if env.registry().is_subtype(&found, base) => {
                    return Ok(Some(found));
                }
                Some(_) => {}
            }
        }
        Ok(None)
    }

    /// The most specific interface for `object`, or `base` when none is found.
    pub fn most_specific(
        &self,
        env: &Environment,
        base: &str,
        object: &ForeignHandle,
    ) -> Result<String> {
        let Some(class) = env.runtime().type_of(object)? else {
            return Ok(base.to_string());
        };
        if let Some(found) = self.interface_for_class(env, &class)? {
            if env.registry().is_subtype(&found, base) {
                trace!(base, found = %found, "foreign class maps directly to subtype");
                return Ok(found);
            }
        }
        let found = self.specialize(env, base, &class)?;
        trace!(base, found = ?found, "specialized through base classes");
        Ok(found.unwrap_or_else(|| base.to_string()))
    }

    /// Use this index as the environment's subtype hook.
    pub fn into_resolver(self) -> SubtypeResolver {
        Arc::new(move |env: &Environment, base: &str, object: &ForeignHandle| {
            self.most_specific(env, base, object)
        })
    }
}
