//! Type model error types.

/// Errors raised while building or querying the type model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    /// A generic type signature could not be parsed.
    #[error("invalid type signature '{signature}': {detail}")]
    InvalidSignature { signature: String, detail: String },

    /// The same interface name was registered twice.
    #[error("duplicate interface: {name}")]
    DuplicateInterface { name: String },

    /// Two interfaces claim the same foreign class.
    #[error("foreign class '{class}' is claimed by both {first} and {second}")]
    DuplicateForeignClass {
        class: String,
        first: String,
        second: String,
    },

    /// An interface names a parent that is not registered.
    #[error("interface {interface} extends unknown interface {parent}")]
    UnknownParent { interface: String, parent: String },

    /// An interface inherits from itself through its parents.
    #[error("interface {interface} inherits from itself")]
    CyclicInheritance { interface: String },

    /// No constant of a closed code list matches the requested name.
    #[error("no {family} value named '{name}'")]
    UnknownCode { family: String, name: String },
}

/// Result type alias for type model operations.
pub type Result<T> = std::result::Result<T, TypeError>;
