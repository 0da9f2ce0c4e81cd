//! Interface descriptions and the interface registry.
//!
//! An [`InterfaceDesc`] is the data form of a typed interface: its name, the
//! foreign class it corresponds to, its parent interfaces and its methods.
//! Method descriptions carry an optional explicit foreign name (used verbatim
//! instead of the derived one) and the declared return type.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TypeError};
use crate::types::GenericType;

/// One method of a bridged interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodDesc {
    /// Method name on the typed side (`getTitle`).
    pub name: String,
    /// Explicit foreign name, used verbatim when present.
    #[serde(default)]
    pub foreign_name: Option<String>,
    /// Declared return type.
    pub returns: GenericType,
    /// Number of arguments the method takes.
    #[serde(default)]
    pub arity: usize,
}

impl MethodDesc {
    /// Describe a method by name and return type signature.
    pub fn new(name: impl Into<String>, returns: &str) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            foreign_name: None,
            returns: GenericType::parse(returns)?,
            arity: 0,
        })
    }

    /// Override the foreign name.
    pub fn with_foreign_name(mut self, foreign_name: impl Into<String>) -> Self {
        self.foreign_name = Some(foreign_name.into());
        self
    }

    /// Set the number of arguments.
    pub fn with_arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }
}

/// The data form of a typed interface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterfaceDesc {
    /// Interface name (`Citation`).
    pub name: String,
    /// Foreign class name this interface is implemented by (`CI_Citation`).
    #[serde(default)]
    pub foreign_class: Option<String>,
    /// Names of directly extended interfaces.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Methods declared directly on this interface.
    #[serde(default)]
    pub methods: Vec<MethodDesc>,
}

impl InterfaceDesc {
    /// Create an interface with no parents and no methods.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            foreign_class: None,
            parents: Vec::new(),
            methods: Vec::new(),
        }
    }

    /// Add a parent interface.
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parents.push(parent.into());
        self
    }

    /// Set the foreign class name.
    pub fn with_foreign_class(mut self, class: impl Into<String>) -> Self {
        self.foreign_class = Some(class.into());
        self
    }

    /// Add a method.
    pub fn with_method(mut self, method: MethodDesc) -> Self {
        self.methods.push(method);
        self
    }

    /// Look up a method declared directly on this interface.
    pub fn method(&self, name: &str) -> Option<&MethodDesc> {
        self.methods.iter().find(|m| m.name == name)
    }
}

/// All interfaces known to a bridge.
///
/// Parents may be registered after their children; [`InterfaceRegistry::validate`]
/// checks that every parent link resolves once registration is complete.
#[derive(Debug, Clone, Default)]
pub struct InterfaceRegistry {
    interfaces: HashMap<String, Arc<InterfaceDesc>>,
    by_foreign_class: HashMap<String, String>,
    subtyped: HashSet<String>,
}

impl InterfaceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an interface.
    pub fn register(&mut self, desc: InterfaceDesc) -> Result<Arc<InterfaceDesc>> {
        if self.interfaces.contains_key(&desc.name) {
            return Err(TypeError::DuplicateInterface { name: desc.name });
        }
        if let Some(class) = &desc.foreign_class {
            if let Some(first) = self.by_foreign_class.get(class) {
                return Err(TypeError::DuplicateForeignClass {
                    class: class.clone(),
                    first: first.clone(),
                    second: desc.name,
                });
            }
            self.by_foreign_class.insert(class.clone(), desc.name.clone());
        }
        self.subtyped.extend(desc.parents.iter().cloned());
        let desc = Arc::new(desc);
        self.interfaces.insert(desc.name.clone(), Arc::clone(&desc));
        Ok(desc)
    }

    /// Check that every parent is registered and that inheritance is acyclic.
    pub fn validate(&self) -> Result<()> {
        let mut names: Vec<&String> = self.interfaces.keys().collect();
        names.sort();
        for name in names {
            let desc = &self.interfaces[name];
            for parent in &desc.parents {
                if !self.interfaces.contains_key(parent) {
                    return Err(TypeError::UnknownParent {
                        interface: name.clone(),
                        parent: parent.clone(),
                    });
                }
            }
            if self.ancestors(name).iter().any(|a| a == name) {
                return Err(TypeError::CyclicInheritance {
                    interface: name.clone(),
                });
            }
        }
        Ok(())
    }

    /// Look up an interface by name.
    pub fn get(&self, name: &str) -> Option<Arc<InterfaceDesc>> {
        self.interfaces.get(name).cloned()
    }

    /// Whether an interface with this name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.interfaces.contains_key(name)
    }

    /// Look up the interface implemented by a foreign class.
    pub fn by_foreign_class(&self, class: &str) -> Option<Arc<InterfaceDesc>> {
        self.by_foreign_class
            .get(class)
            .and_then(|name| self.interfaces.get(name))
            .cloned()
    }

    /// Whether some registered interface extends the given one.
    pub fn has_known_subtypes(&self, name: &str) -> bool {
        self.subtyped.contains(name)
    }

    /// All interfaces with at least one registered subtype, sorted by name.
    pub fn subtyped(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.subtyped.iter().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Whether `sub` is `sup` or inherits from it.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        sub == sup || self.ancestors(sub).iter().any(|a| a == sup)
    }

    /// Every ancestor of an interface, nearest first, without duplicates.
    ///
    /// Stops at unknown parents and at the first repetition, so cyclic
    /// inheritance terminates.
    pub fn ancestors(&self, name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        if let Some(desc) = self.interfaces.get(name) {
            queue.extend(desc.parents.iter().map(String::as_str));
        }
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.to_string()) {
                continue;
            }
            order.push(next.to_string());
            if let Some(desc) = self.interfaces.get(next) {
                queue.extend(desc.parents.iter().map(String::as_str));
            }
        }
        order
    }

    /// Number of registered interfaces.
    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Iterate over registered interfaces in arbitrary order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<InterfaceDesc>> {
        self.interfaces.values()
    }
}
