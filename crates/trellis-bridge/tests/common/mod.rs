//! Shared fixture: a small citation metadata model over the memory runtime.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use trellis_bridge::runtime::ForeignResult;
use trellis_bridge::{
    Advance, BridgeDeclaration, Environment, ForeignArg, ForeignError, ForeignHandle,
    ForeignRuntime, MemoryRuntime,
};

pub const METADATA: &str = r#"
[bridge]
name = "metadata"
foreign-module-prefix = "opengis."
exclude = ["MD_Identifier"]

[[code-lists]]
name = "Role"
values = [
    { name = "AUTHOR", aliases = ["author"] },
    { name = "POINT_OF_CONTACT", aliases = ["pointOfContact"] },
]

[[code-lists]]
name = "Keyword"
open = true

[[interfaces]]
name = "Citation"
foreign-class = "CI_Citation"

[[interfaces.methods]]
name = "getTitle"
foreign-name = "title"
returns = "InternationalString"

[[interfaces.methods]]
name = "getEdition"
foreign-name = "edition"
returns = "String"

[[interfaces.methods]]
name = "pageCount"
returns = "int"

[[interfaces.methods]]
name = "seriesNumber"
returns = "Integer"

[[interfaces.methods]]
name = "scale"
returns = "double"

[[interfaces.methods]]
name = "isCurrent"
returns = "boolean"

[[interfaces.methods]]
name = "getCitation"
foreign-name = "citation"
returns = "Citation"

[[interfaces.methods]]
name = "getCitedResponsibleParties"
foreign-name = "cited_responsible_party"
returns = "Collection<? extends Responsibility>"

[[interfaces.methods]]
name = "getKeywords"
foreign-name = "keywords"
returns = "List<Keyword>"

[[interfaces.methods]]
name = "getAlternateTitles"
foreign-name = "alternate_titles"
returns = "Collection<InternationalString>"

[[interfaces.methods]]
name = "getIdentifier"
foreign-name = "identifier"
returns = "Identifier"

[[interfaces.methods]]
name = "getNestedTitles"
foreign-name = "nested_titles"
returns = "Collection<Collection<String>>"

[[interfaces.methods]]
name = "findTitle"
returns = "String"
arity = 1

[[interfaces]]
name = "Responsibility"
foreign-class = "CI_Responsibility"

[[interfaces.methods]]
name = "getRole"
foreign-name = "role"
returns = "Role"

[[interfaces.methods]]
name = "getParties"
foreign-name = "party"
returns = "Collection<? extends Party>"

[[interfaces]]
name = "Party"
foreign-class = "CI_Party"

[[interfaces.methods]]
name = "getName"
foreign-name = "name"
returns = "InternationalString"

[[interfaces]]
name = "Individual"
foreign-class = "CI_Individual"
parents = ["Party"]

[[interfaces.methods]]
name = "getPositionName"
foreign-name = "position_name"
returns = "InternationalString"

[[interfaces.methods]]
name = "getParty"
foreign-name = "party"
returns = "Party"

[[interfaces]]
name = "Organisation"
foreign-class = "CI_Organisation"
parents = ["Party"]

[[interfaces.methods]]
name = "getIndividual"
foreign-name = "individual"
returns = "Collection<Individual>"
"#;

/// Foreign classes of the fixture model.
pub struct Classes {
    pub citation: ForeignHandle,
    pub responsibility: ForeignHandle,
    pub party: ForeignHandle,
    pub individual: ForeignHandle,
    pub organisation: ForeignHandle,
    pub code: ForeignHandle,
}

/// A memory runtime, an environment over it, and the fixture classes.
pub struct World {
    pub rt: Arc<MemoryRuntime>,
    pub env: Environment,
    pub classes: Classes,
}

impl World {
    pub fn new() -> Self {
        init_tracing();
        let rt = Arc::new(MemoryRuntime::new());
        let decl = BridgeDeclaration::parse(METADATA).unwrap();
        let env = Environment::from_declaration(rt.clone(), &decl).unwrap();
        let module = "opengis.metadata.citation";
        let party = rt.class(module, "Party", &[]);
        let classes = Classes {
            citation: rt.class(module, "Citation", &[]),
            responsibility: rt.class(module, "Responsibility", &[]),
            individual: rt.class(module, "Individual", &[party.clone()]),
            organisation: rt.class(module, "Organisation", &[party.clone()]),
            party,
            code: rt.class("enum", "Enum", &[]),
        };
        Self { rt, env, classes }
    }

    /// A citation with a title and nothing else.
    pub fn citation(&self, title: &str) -> ForeignHandle {
        let citation = self.rt.object(&self.classes.citation).unwrap();
        self.rt
            .set_attribute(&citation, "title", Some(self.rt.str(title)))
            .unwrap();
        citation
    }

    /// An enumerated foreign value whose `value` attribute is `name`.
    pub fn code(&self, name: &str) -> ForeignHandle {
        let code = self.rt.object(&self.classes.code).unwrap();
        self.rt
            .set_attribute(&code, "value", Some(self.rt.str(name)))
            .unwrap();
        code
    }

    /// An instance of `class` with a `name` attribute.
    pub fn party(&self, class: &ForeignHandle, name: &str) -> ForeignHandle {
        let party = self.rt.object(class).unwrap();
        self.rt
            .set_attribute(&party, "name", Some(self.rt.str(name)))
            .unwrap();
        party
    }

    /// The string value of a foreign string.
    pub fn string(&self, handle: &ForeignHandle) -> String {
        self.rt.string_value(handle).unwrap().unwrap()
    }

    /// A foreign list of integers.
    pub fn ints(&self, values: &[i64]) -> ForeignHandle {
        self.rt
            .list(values.iter().map(|v| Some(self.rt.int(*v))).collect())
    }
}

/// A memory runtime whose iterators raise once, on a chosen `advance` call.
pub struct FailingAdvance {
    inner: Arc<MemoryRuntime>,
    fail_on: usize,
    advances: AtomicUsize,
}

impl FailingAdvance {
    /// Fail the `fail_on`-th advance (counted from 1) across all iterators.
    pub fn new(inner: Arc<MemoryRuntime>, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            advances: AtomicUsize::new(0),
        }
    }

    /// An environment over this runtime, from the fixture declaration.
    pub fn environment(self: &Arc<Self>) -> Environment {
        let decl = BridgeDeclaration::parse(METADATA).unwrap();
        Environment::from_declaration(self.clone(), &decl).unwrap()
    }
}

impl ForeignRuntime for FailingAdvance {
    fn get_attribute(&self, object: &ForeignHandle, name: &str) -> ForeignResult<Option<ForeignHandle>> {
        self.inner.get_attribute(object, name)
    }

    fn call_method(
        &self,
        object: &ForeignHandle,
        name: &str,
        args: &[ForeignArg],
    ) -> ForeignResult<Option<ForeignHandle>> {
        self.inner.call_method(object, name, args)
    }

    fn equals(&self, a: &ForeignHandle, b: &ForeignHandle) -> ForeignResult<bool> {
        self.inner.equals(a, b)
    }

    fn hash(&self, object: &ForeignHandle) -> ForeignResult<i64> {
        self.inner.hash(object)
    }

    fn length(&self, object: &ForeignHandle) -> ForeignResult<usize> {
        self.inner.length(object)
    }

    fn iterate(&self, object: &ForeignHandle) -> ForeignResult<ForeignHandle> {
        self.inner.iterate(object)
    }

    fn advance(&self, iterator: &ForeignHandle) -> ForeignResult<Advance> {
        let n = self.advances.fetch_add(1, Ordering::SeqCst) + 1;
        if n == self.fail_on {
            return Err(ForeignError::new("RuntimeError", "collection changed during iteration"));
        }
        self.inner.advance(iterator)
    }

    fn stringify(&self, object: &ForeignHandle) -> ForeignResult<String> {
        self.inner.stringify(object)
    }

    fn type_of(&self, object: &ForeignHandle) -> ForeignResult<Option<ForeignHandle>> {
        self.inner.type_of(object)
    }

    fn int_value(&self, object: &ForeignHandle) -> ForeignResult<i64> {
        self.inner.int_value(object)
    }

    fn float_value(&self, object: &ForeignHandle) -> ForeignResult<f64> {
        self.inner.float_value(object)
    }

    fn string_value(&self, object: &ForeignHandle) -> ForeignResult<Option<String>> {
        self.inner.string_value(object)
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
