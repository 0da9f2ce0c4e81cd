//! Type-driven selection of conversion strategies.
//!
//! [`Converter::resolve`] maps a target [`TypeDesc`] to exactly one strategy,
//! checking once that the strategy's output is assignable to the target.
//! A resolved converter is immutable and is cached by the [`Environment`].

use std::sync::Arc;

use tracing::{debug, warn};
use trellis_core::{CodeListFamily, InterfaceDesc, Literal, TypeDesc};

use crate::environment::Environment;
use crate::error::{BridgeError, Result};
use crate::interfacing::{Interfacing, UserStrategy};
use crate::runtime::ForeignHandle;
use crate::value::Value;

/// How a managed interface is bound when a foreign object is wrapped.
#[derive(Debug, Clone)]
pub enum Binding {
    /// The interface has no known subtypes: always bridge as this interface.
    Fixed(Arc<InterfaceDesc>),
    /// The interface has known subtypes: ask the environment's subtype hook
    /// for the most specific interface on every conversion.
    Polymorphic(Arc<InterfaceDesc>),
}

impl Binding {
    /// The interface this binding was resolved for.
    pub fn interface(&self) -> &InterfaceDesc {
        match self {
            Binding::Fixed(desc) | Binding::Polymorphic(desc) => desc,
        }
    }
}

#[derive(Debug, Clone)]
enum Strategy {
    Str,
    Text,
    Integer { boxed: bool },
    Float { boxed: bool },
    Boolean { boxed: bool },
    Code(Arc<CodeListFamily>),
    Bridge(Binding),
    PassThrough(String),
    UserDefined(UserStrategy),
}

impl Strategy {
    fn label(&self) -> &'static str {
        match self {
            Strategy::Str => "string",
            Strategy::Text => "text",
            Strategy::Integer { .. } => "integer",
            Strategy::Float { .. } => "float",
            Strategy::Boolean { .. } => "boolean",
            Strategy::Code(_) => "code-list",
            Strategy::Bridge(Binding::Fixed(_)) => "bridge",
            Strategy::Bridge(Binding::Polymorphic(_)) => "polymorphic bridge",
            Strategy::PassThrough(_) => "pass-through",
            Strategy::UserDefined(_) => "user-defined",
        }
    }
}

/// A conversion strategy bound to one target type.
#[derive(Debug, Clone)]
pub struct Converter {
    target: TypeDesc,
    output: TypeDesc,
    strategy: Strategy,
}

impl Converter {
    /// Select the strategy for `target`.
    ///
    /// Collection targets are rejected with
    /// [`BridgeError::CollectionRequested`]; they are served by
    /// [`Environment::to_sequence`]. Types with no strategy, and strategies
    /// whose output is not assignable to the target, fail with
    /// [`BridgeError::UnconvertibleType`].
    pub fn resolve(env: &Environment, target: &TypeDesc) -> Result<Self> {
        let (strategy, output) = match target {
            TypeDesc::Collection(generic) => {
                return Err(BridgeError::CollectionRequested {
                    type_name: generic.to_string(),
                })
            }
            TypeDesc::InternationalString => (Strategy::Text, target.clone()),
            TypeDesc::String => (Strategy::Str, target.clone()),
            TypeDesc::Interface(name) => Self::interface_strategy(env, name, target)?,
            TypeDesc::Integer { boxed } => (Strategy::Integer { boxed: *boxed }, target.clone()),
            TypeDesc::Float { boxed } => (Strategy::Float { boxed: *boxed }, target.clone()),
            TypeDesc::CodeList(family) => (Strategy::Code(Arc::clone(family)), target.clone()),
            TypeDesc::Boolean { boxed } => (Strategy::Boolean { boxed: *boxed }, target.clone()),
            TypeDesc::Named(_) => return Err(BridgeError::unconvertible(target)),
        };
        if !target.is_assignable_from(&output, env.registry()) {
            debug!(target = %target, output = %output, "converter output not assignable");
            return Err(BridgeError::unconvertible(target));
        }
        debug!(target = %target, strategy = strategy.label(), "resolved converter");
        Ok(Self {
            target: target.clone(),
            output,
            strategy,
        })
    }

    fn interface_strategy(
        env: &Environment,
        name: &str,
        target: &TypeDesc,
    ) -> Result<(Strategy, TypeDesc)> {
        let resolved = match env.classify(name) {
            Interfacing::Managed => {
                let Some(desc) = env.registry().get(name) else {
                    warn!(interface = name, "classified as managed but not registered");
                    return Err(BridgeError::unconvertible(target));
                };
                let binding = if env.registry().has_known_subtypes(name) {
                    Binding::Polymorphic(desc)
                } else {
                    Binding::Fixed(desc)
                };
                (Strategy::Bridge(binding), target.clone())
            }
            Interfacing::Default => (Strategy::PassThrough(name.to_string()), target.clone()),
            Interfacing::UserDefined(strategy) => {
                let output = strategy.output().cloned().unwrap_or_else(|| target.clone());
                (Strategy::UserDefined(strategy), output)
            }
        };
        Ok(resolved)
    }

    /// The type this converter was resolved for.
    pub fn target(&self) -> &TypeDesc {
        &self.target
    }

    /// The type this converter produces. Always assignable to [`Converter::target`].
    pub fn output(&self) -> &TypeDesc {
        &self.output
    }

    /// Short name of the selected strategy.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.label()
    }

    /// The interface binding, for bridging converters.
    pub fn binding(&self) -> Option<&Binding> {
        match &self.strategy {
            Strategy::Bridge(binding) => Some(binding),
            _ => None,
        }
    }

    /// Convert a foreign value. `None` is the foreign `None`.
    pub fn apply(&self, env: &Environment, value: Option<&ForeignHandle>) -> Result<Value> {
        let runtime = env.runtime();
        match &self.strategy {
            Strategy::Str => Ok(match value {
                Some(handle) => runtime.string_value(handle)?.map_or(Value::Null, Value::Str),
                None => Value::Null,
            }),
            Strategy::Text => Ok(match value {
                Some(handle) => runtime
                    .string_value(handle)?
                    .map_or(Value::Null, |s| Value::Text(Literal::new(s))),
                None => Value::Null,
            }),
            Strategy::Integer { boxed } => Ok(match value {
                Some(handle) => Value::Int(runtime.int_value(handle)?),
                None if *boxed => Value::Null,
                None => Value::Int(0),
            }),
            Strategy::Float { boxed } => Ok(match value {
                Some(handle) => Value::Float(runtime.float_value(handle)?),
                None if *boxed => Value::Null,
                None => Value::Float(f64::NAN),
            }),
            Strategy::Boolean { boxed } => Ok(match value {
                Some(handle) => Value::Bool(runtime.int_value(handle)? != 0),
                None if *boxed => Value::Null,
                None => Value::Bool(false),
            }),
            Strategy::Code(family) => match code_name(env, value)? {
                Some(name) => Ok(Value::Code(family.value_of(&name)?)),
                None => Ok(Value::Null),
            },
            Strategy::Bridge(binding) => {
                let Some(handle) = value else {
                    return Ok(Value::Null);
                };
                let interface = match binding {
                    Binding::Fixed(desc) => desc.name.clone(),
                    Binding::Polymorphic(desc) => env.most_specific_type(&desc.name, handle)?,
                };
                Ok(Value::Object(env.wrap(handle.clone(), &interface)))
            }
            Strategy::PassThrough(interface) => match value {
                Some(handle) => Ok(Value::Object(env.wrap(handle.clone(), interface))),
                None => Ok(Value::Null),
            },
            Strategy::UserDefined(strategy) => match value {
                Some(handle) => strategy.convert(handle, &self.target),
                None => Ok(Value::Null),
            },
        }
    }
}

/// Name of an enumerated foreign value: its `value` attribute, trimmed.
fn code_name(env: &Environment, value: Option<&ForeignHandle>) -> Result<Option<String>> {
    let Some(handle) = value else {
        return Ok(None);
    };
    let runtime = env.runtime();
    let Some(inner) = runtime.get_attribute(handle, "value")? else {
        return Ok(None);
    };
    let name = runtime.string_value(&inner)?;
    Ok(name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::memory::MemoryRuntime;
    use trellis_core::{InterfaceRegistry, MethodDesc};

    fn env() -> Environment {
        let mut registry = InterfaceRegistry::new();
        registry
            .register(
                InterfaceDesc::new("Party")
                    .with_method(MethodDesc::new("getName", "String").unwrap()),
            )
            .unwrap();
        registry
            .register(InterfaceDesc::new("Individual").with_parent("Party"))
            .unwrap();
        registry.register(InterfaceDesc::new("Citation")).unwrap();
        Environment::builder(Arc::new(MemoryRuntime::new()))
            .registry(registry)
            .build()
            .unwrap()
    }

    #[test]
    fn strategy_per_target() {
        let env = env();
        let cases = [
            (TypeDesc::String, "string"),
            (TypeDesc::InternationalString, "text"),
            (TypeDesc::Integer { boxed: true }, "integer"),
            (TypeDesc::Float { boxed: false }, "float"),
            (TypeDesc::Boolean { boxed: false }, "boolean"),
            (TypeDesc::Interface("Citation".into()), "bridge"),
            (TypeDesc::Interface("Party".into()), "polymorphic bridge"),
        ];
        for (target, label) in cases {
            let converter = Converter::resolve(&env, &target).unwrap();
            assert_eq!(converter.strategy_name(), label, "{target}");
            assert_eq!(converter.target(), &target);
        }
    }

    #[test]
    fn subtyped_interfaces_bind_polymorphically() {
        let env = env();
        let party = Converter::resolve(&env, &TypeDesc::Interface("Party".into())).unwrap();
        assert!(matches!(party.binding(), Some(Binding::Polymorphic(_))));
        let individual =
            Converter::resolve(&env, &TypeDesc::Interface("Individual".into())).unwrap();
        assert!(matches!(individual.binding(), Some(Binding::Fixed(_))));
        assert_eq!(individual.binding().unwrap().interface().name, "Individual");
    }

    #[test]
    fn primitive_null_defaults() {
        let env = env();
        let int = Converter::resolve(&env, &TypeDesc::Integer { boxed: false }).unwrap();
        assert!(matches!(int.apply(&env, None).unwrap(), Value::Int(0)));
        let float = Converter::resolve(&env, &TypeDesc::Float { boxed: false }).unwrap();
        assert!(matches!(float.apply(&env, None).unwrap(), Value::Float(f) if f.is_nan()));
        let boxed = Converter::resolve(&env, &TypeDesc::Boolean { boxed: true }).unwrap();
        assert!(boxed.apply(&env, None).unwrap().is_null());
    }

    #[test]
    fn named_types_are_unconvertible() {
        let env = env();
        let err = Converter::resolve(&env, &TypeDesc::Named("Geometry".into())).unwrap_err();
        assert!(matches!(err, BridgeError::UnconvertibleType { ref type_name } if type_name == "Geometry"));
    }
}
