//! Bridge error types.

use trellis_core::TypeError;

use crate::runtime::ForeignError;

/// Errors that can occur while converting or dispatching across the bridge.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    /// No conversion strategy exists for the requested type, or the strategy
    /// found produces a type that is not assignable to it.
    #[error("cannot convert a foreign value to {type_name}")]
    UnconvertibleType { type_name: String },

    /// A collection type was requested through the single-value entry point.
    #[error("cannot convert to collection type {type_name}; request a sequence instead")]
    CollectionRequested { type_name: String },

    /// The bridge could not be set up. Fatal for the whole bridge.
    #[error("bridge setup failed: {detail}")]
    Setup {
        detail: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The foreign side raised an error. Propagated unchanged.
    #[error(transparent)]
    Foreign(#[from] ForeignError),

    /// A foreign value names no constant of a closed code list.
    #[error("no {family} value named '{name}'")]
    UnknownCode { family: String, name: String },

    /// The interface has no method with this name.
    #[error("interface {interface} has no method {method}")]
    UnknownMethod { interface: String, method: String },

    /// A method was called with the wrong number of arguments.
    #[error("{interface}.{method} takes {expected} argument(s), {found} given")]
    ArityMismatch {
        interface: String,
        method: String,
        expected: usize,
        found: usize,
    },

    /// A mutation was attempted on a read-only view.
    #[error("unsupported operation: {operation}")]
    UnsupportedOperation { operation: &'static str },

    /// Index past the end of a sequence.
    #[error("index {index} out of bounds")]
    IndexOutOfBounds { index: usize },

    /// No element in the requested direction.
    #[error("no such element")]
    NoSuchElement,

    /// A converted value does not have the Rust type the caller asked for.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Failed to validate a bridge declaration.
    #[error("invalid bridge declaration: {detail}")]
    InvalidDeclaration { detail: String },

    /// Type model error.
    #[error("type error: {0}")]
    Type(TypeError),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl BridgeError {
    /// Unconvertible-type error naming the given type.
    pub fn unconvertible(type_name: impl ToString) -> Self {
        BridgeError::UnconvertibleType {
            type_name: type_name.to_string(),
        }
    }

    /// Setup failure wrapping an underlying cause.
    pub fn setup(
        detail: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        BridgeError::Setup {
            detail: detail.into(),
            source: Some(Box::new(source)),
        }
    }
}

impl From<TypeError> for BridgeError {
    fn from(e: TypeError) -> Self {
        match e {
            TypeError::UnknownCode { family, name } => BridgeError::UnknownCode { family, name },
            other => BridgeError::Type(other),
        }
    }
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
