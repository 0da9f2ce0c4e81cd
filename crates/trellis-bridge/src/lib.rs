//! Bridge between typed interfaces and a dynamic foreign object protocol.
//!
//! Converts foreign values into typed values on demand: strings, numbers,
//! code-list constants, bridged objects that forward interface method calls
//! to the foreign object by name, and lazy sequences over foreign iterables.
//!
//! ## Modules
//!
//! - [`runtime`] — the foreign object protocol the bridge consumes
//! - [`environment`] — the shared bridge context and converter cache
//! - [`converter`] — type-driven selection of conversion strategies
//! - [`interfacing`] — classification and subtype hooks, foreign class index
//! - [`dispatch`] — per-interface method tables
//! - [`proxy`] — bridged objects
//! - [`sequence`] — lazy sequences and their iterators
//! - [`value`] — converted values and their extraction into Rust types
//! - [`declaration`] — `.bridge.toml` declaration file parsing
//! - [`memory`] — in-memory implementation of the foreign protocol

pub mod converter;
pub mod declaration;
pub mod dispatch;
pub mod environment;
pub mod error;
pub mod interfacing;
pub mod memory;
pub mod proxy;
pub mod runtime;
pub mod sequence;
pub mod value;

// Re-export key types for convenience
pub use converter::{Binding, Converter};
pub use declaration::BridgeDeclaration;
pub use dispatch::{DispatchTable, MethodBinding, ReturnShape};
pub use environment::{Environment, EnvironmentBuilder};
pub use error::{BridgeError, Result};
pub use interfacing::{ClassIndex, Classifier, Interfacing, SubtypeResolver, UserStrategy};
pub use memory::MemoryRuntime;
pub use proxy::BridgedObject;
pub use runtime::{Advance, ForeignArg, ForeignError, ForeignHandle, ForeignRuntime};
pub use sequence::{LazySequence, ListIter, SequenceIter};
pub use value::{FromValue, Value};
