//! Type model for the Trellis object bridge.
//!
//! Describes the typed side of the bridge as data: target type descriptors,
//! generic signatures, interfaces and their methods, code-list families, and
//! the naming rule that maps typed method names to foreign attribute names.
//!
//! ## Modules
//!
//! - [`names`] — camel-case to foreign name mapping
//! - [`types`] — `TypeDesc` and parsed `GenericType` signatures
//! - [`interface`] — interface descriptions and the registry
//! - [`codelist`] — append-only enumerated and code-list families
//! - [`text`] — single-locale text literal
//! - [`error`] — type model errors

pub mod codelist;
pub mod error;
pub mod interface;
pub mod names;
pub mod text;
pub mod types;

// Re-export key types for convenience
pub use codelist::{Code, CodeListFamily};
pub use error::TypeError;
pub use interface::{InterfaceDesc, InterfaceRegistry, MethodDesc};
pub use names::to_foreign_name;
pub use text::Literal;
pub use types::{GenericType, TypeDesc};
