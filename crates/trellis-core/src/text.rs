//! Single-locale text literal.

use std::fmt;

/// A localizable string backed by a single text, whatever the locale.
///
/// Foreign strings carry no locale information, so every locale resolves to
/// the same text.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Literal(String);

impl Literal {
    /// Wrap a text.
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    /// The text in the requested locale. The locale is ignored.
    pub fn to_string_in(&self, _locale: Option<&str>) -> &str {
        &self.0
    }

    /// The text itself.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwrap into the underlying string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for Literal {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl From<&str> for Literal {
    fn from(text: &str) -> Self {
        Self(text.to_string())
    }
}
