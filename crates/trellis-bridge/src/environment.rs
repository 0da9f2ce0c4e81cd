//! The bridge context.
//!
//! An [`Environment`] is created once per foreign runtime and shared by every
//! object and sequence it produces. It owns the interface registry, the
//! code-list families, the interfacing hooks, and two caches: resolved
//! converters keyed by target type, and dispatch tables keyed by interface.
//! Cloning an environment is cheap and yields a handle to the same context.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;
use trellis_core::{CodeListFamily, GenericType, InterfaceRegistry, TypeDesc};

use crate::converter::Converter;
use crate::declaration::BridgeDeclaration;
use crate::dispatch::DispatchTable;
use crate::error::{BridgeError, Result};
use crate::interfacing::{
    base_type_resolver, registry_classifier, Classifier, Interfacing, SubtypeResolver,
};
use crate::proxy::BridgedObject;
use crate::runtime::{ForeignHandle, ForeignRuntime};
use crate::sequence::LazySequence;
use crate::value::{FromValue, Value};

struct Context {
    runtime: Arc<dyn ForeignRuntime>,
    registry: InterfaceRegistry,
    code_lists: HashMap<String, Arc<CodeListFamily>>,
    classifier: Classifier,
    subtypes: SubtypeResolver,
    converters: Mutex<HashMap<TypeDesc, Converter>>,
    tables: Mutex<HashMap<String, Arc<DispatchTable>>>,
}

/// Shared bridge context.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<Context>,
}

/// Builder for [`Environment`].
pub struct EnvironmentBuilder {
    runtime: Arc<dyn ForeignRuntime>,
    registry: InterfaceRegistry,
    code_lists: HashMap<String, Arc<CodeListFamily>>,
    classifier: Option<Classifier>,
    subtypes: Option<SubtypeResolver>,
}

impl EnvironmentBuilder {
    /// Use this interface registry.
    pub fn registry(mut self, registry: InterfaceRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Make a code-list family known to the bridge under its name.
    pub fn code_list(mut self, family: Arc<CodeListFamily>) -> Self {
        self.code_lists.insert(family.name().to_string(), family);
        self
    }

    /// Override the classification hook.
    pub fn classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = Some(classifier);
        self
    }

    /// Override the subtype hook.
    pub fn subtype_resolver(mut self, resolver: SubtypeResolver) -> Self {
        self.subtypes = Some(resolver);
        self
    }

    /// Validate the registry and create the environment.
    pub fn build(self) -> Result<Environment> {
        self.registry
            .validate()
            .map_err(|e| BridgeError::setup("interface registry is inconsistent", e))?;
        debug!(
            interfaces = self.registry.len(),
            code_lists = self.code_lists.len(),
            "bridge environment created"
        );
        Ok(Environment {
            inner: Arc::new(Context {
                runtime: self.runtime,
                registry: self.registry,
                code_lists: self.code_lists,
                classifier: self.classifier.unwrap_or_else(registry_classifier),
                subtypes: self.subtypes.unwrap_or_else(base_type_resolver),
                converters: Mutex::new(HashMap::new()),
                tables: Mutex::new(HashMap::new()),
            }),
        })
    }
}

impl Environment {
    /// Start building an environment over a foreign runtime.
    ///
    /// Defaults: empty registry, no code lists, every registered interface
    /// managed, no subtype specialization.
    pub fn builder(runtime: Arc<dyn ForeignRuntime>) -> EnvironmentBuilder {
        EnvironmentBuilder {
            runtime,
            registry: InterfaceRegistry::new(),
            code_lists: HashMap::new(),
            classifier: None,
            subtypes: None,
        }
    }

    /// Create an environment from a bridge declaration.
    ///
    /// Interfaces and code lists come from the declaration, and subtypes are
    /// resolved through the class index it describes.
    pub fn from_declaration(
        runtime: Arc<dyn ForeignRuntime>,
        declaration: &BridgeDeclaration,
    ) -> Result<Self> {
        let registry = declaration.to_registry()?;
        let index = declaration.class_index(&registry);
        let mut builder = Self::builder(runtime)
            .registry(registry)
            .subtype_resolver(index.into_resolver());
        for family in declaration.code_list_families() {
            builder = builder.code_list(family);
        }
        builder.build()
    }

    /// The foreign runtime.
    pub fn runtime(&self) -> &dyn ForeignRuntime {
        self.inner.runtime.as_ref()
    }

    /// The interface registry.
    pub fn registry(&self) -> &InterfaceRegistry {
        &self.inner.registry
    }

    /// A known code-list family.
    pub fn code_list(&self, name: &str) -> Option<Arc<CodeListFamily>> {
        self.inner.code_lists.get(name).cloned()
    }

    /// Classify an interface.
    pub fn classify(&self, interface: &str) -> Interfacing {
        (self.inner.classifier)(&self.inner.registry, interface)
    }

    /// Whether both values are handles to the same context.
    pub fn same_context(&self, other: &Environment) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Descriptor for a type name.
    ///
    /// Built-in names first, then known code lists, then registered
    /// interfaces. Collection names yield a raw collection descriptor, so a
    /// registered interface named like a collection (`Sequence`) stays an
    /// interface. Anything else is [`TypeDesc::Named`].
    pub fn type_named(&self, name: &str) -> TypeDesc {
        if let Some(builtin) = TypeDesc::builtin(name) {
            return builtin;
        }
        if let Some(family) = self.inner.code_lists.get(name) {
            return TypeDesc::CodeList(Arc::clone(family));
        }
        if self.inner.registry.contains(name) {
            return TypeDesc::Interface(name.to_string());
        }
        if trellis_core::types::is_collection_name(name) {
            return TypeDesc::Collection(GenericType::Class(name.to_string()));
        }
        TypeDesc::Named(name.to_string())
    }

    /// Descriptor for a declared generic type.
    pub fn type_of(&self, generic: &GenericType) -> TypeDesc {
        let registered = generic
            .raw_name()
            .is_some_and(|raw| self.inner.registry.contains(raw));
        if generic.is_collection() && !registered {
            return TypeDesc::Collection(generic.clone());
        }
        match generic.raw_name() {
            Some(raw) => self.type_named(raw),
            None => TypeDesc::Named(generic.to_string()),
        }
    }

    /// Element type of a collection signature.
    ///
    /// Wildcard and parameterized bounds are unwrapped. Fails with
    /// [`BridgeError::UnconvertibleType`] naming the whole signature when no
    /// single element bound exists or the bound is itself a collection.
    pub fn element_type(&self, collection: &GenericType) -> Result<TypeDesc> {
        let element = collection
            .element_bound()
            .map(|bound| self.type_named(bound))
            .filter(|desc| !desc.is_collection());
        element.ok_or_else(|| BridgeError::unconvertible(collection))
    }

    /// The converter for a target type, resolved once and cached.
    pub fn resolve(&self, target: &TypeDesc) -> Result<Converter> {
        if let Some(converter) = self.inner.converters.lock().get(target) {
            return Ok(converter.clone());
        }
        let converter = Converter::resolve(self, target)?;
        Ok(self
            .inner
            .converters
            .lock()
            .entry(target.clone())
            .or_insert(converter)
            .clone())
    }

    /// Convert a foreign value to a typed value.
    ///
    /// `None` is the foreign `None`. Collection targets are rejected with
    /// [`BridgeError::CollectionRequested`] before anything else.
    pub fn to_typed(&self, value: Option<&ForeignHandle>, target: &TypeDesc) -> Result<Value> {
        if let TypeDesc::Collection(generic) = target {
            return Err(BridgeError::CollectionRequested {
                type_name: generic.to_string(),
            });
        }
        self.resolve(target)?.apply(self, value)
    }

    /// Convert a foreign value and extract it as a Rust type.
    pub fn to<T: FromValue>(&self, value: Option<&ForeignHandle>, target: &TypeDesc) -> Result<T> {
        T::from_value(self.to_typed(value, target)?)
    }

    /// Lazy view over a foreign collection whose elements convert to `element`.
    ///
    /// An absent collection yields the empty view.
    pub fn to_sequence(
        &self,
        collection: Option<ForeignHandle>,
        element: &TypeDesc,
    ) -> Result<LazySequence> {
        match collection {
            Some(handle) => LazySequence::new(self.clone(), element, handle),
            None => Ok(LazySequence::empty(self.clone(), element.clone())),
        }
    }

    /// The most specific interface to bridge `object` as, given a base interface.
    ///
    /// The subtype hook's answer must be `base` or one of its registered
    /// subtypes.
    pub fn most_specific_type(&self, base: &str, object: &ForeignHandle) -> Result<String> {
        let found = (self.inner.subtypes)(self, base, object)?;
        if !self.inner.registry.is_subtype(&found, base) {
            debug!(base, found = %found, "subtype hook returned an unrelated interface");
            return Err(BridgeError::unconvertible(base));
        }
        Ok(found)
    }

    /// The dispatch table for an interface, built once and shared.
    ///
    /// Managed, registered interfaces get a table of their declared and
    /// inherited methods. Every other interface gets a pass-through table.
    pub fn dispatch_table(&self, interface: &str) -> Arc<DispatchTable> {
        if let Some(table) = self.inner.tables.lock().get(interface) {
            return Arc::clone(table);
        }
        let table = match (self.classify(interface), self.inner.registry.get(interface)) {
            (Interfacing::Managed, Some(desc)) => DispatchTable::build(self, &desc),
            _ => DispatchTable::pass_through(self, interface),
        };
        Arc::clone(
            self.inner
                .tables
                .lock()
                .entry(interface.to_string())
                .or_insert_with(|| Arc::new(table)),
        )
    }

    /// Bridge a foreign object as the given interface.
    pub fn wrap(&self, handle: ForeignHandle, interface: &str) -> BridgedObject {
        BridgedObject::new(self.clone(), handle, self.dispatch_table(interface))
    }
}

impl fmt::Debug for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Environment")
            .field("interfaces", &self.inner.registry.len())
            .field("code_lists", &self.inner.code_lists.len())
            .field("converters", &self.inner.converters.lock().len())
            .finish_non_exhaustive()
    }
}
