//! Enumerated and code-list families.
//!
//! A family is a process-wide, append-only table of named constants. Closed
//! families behave like enumerations: lookups of unknown names fail. Open
//! families behave like extensible code lists: an unknown name is appended
//! as a new constant on first use.
//!
//! One mutex guards both reads (`values`) and appends (`declare`), so a name
//! is never declared twice even under concurrent first use. Constants are
//! never removed.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{Result, TypeError};

#[derive(Debug)]
struct CodeEntry {
    family: String,
    ordinal: usize,
    name: String,
    aliases: Vec<String>,
}

/// One constant of a code-list family.
#[derive(Debug, Clone)]
pub struct Code(Arc<CodeEntry>);

impl Code {
    /// The primary (programmatic) name of this constant.
    pub fn name(&self) -> &str {
        &self.0.name
    }

    /// Alternative names accepted by case-insensitive lookups.
    pub fn aliases(&self) -> &[String] {
        &self.0.aliases
    }

    /// Position of this constant in declaration order.
    pub fn ordinal(&self) -> usize {
        self.0.ordinal
    }

    /// Name of the family this constant belongs to.
    pub fn family(&self) -> &str {
        &self.0.family
    }

    /// The primary name followed by every alias.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.0.name.as_str()).chain(self.0.aliases.iter().map(String::as_str))
    }

    fn matches_ignoring_case(&self, name: &str) -> bool {
        let wanted = name.to_lowercase();
        self.names().any(|n| n.to_lowercase() == wanted)
    }
}

impl PartialEq for Code {
    fn eq(&self, other: &Self) -> bool {
        self.0.ordinal == other.0.ordinal && self.0.family == other.0.family
    }
}

impl Eq for Code {}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0.family, self.0.name)
    }
}

/// A named, append-only table of constants.
///
/// Two families are the same type when they have the same name.
#[derive(Debug)]
pub struct CodeListFamily {
    name: String,
    open: bool,
    values: Mutex<Vec<Code>>,
}

impl CodeListFamily {
    /// Create a closed (enumeration-like) family.
    pub fn closed(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }

    /// Create an open (extensible) family.
    pub fn open(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }

    fn new(name: impl Into<String>, open: bool) -> Self {
        Self {
            name: name.into(),
            open,
            values: Mutex::new(Vec::new()),
        }
    }

    /// Family name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether unknown names are appended instead of rejected.
    pub fn is_open(&self) -> bool {
        self.open
    }

    /// Declare a constant, or return the existing one with that exact name.
    ///
    /// Declaration is idempotent per name: aliases given on a repeated
    /// declaration are ignored.
    pub fn declare<S: Into<String>>(
        &self,
        name: &str,
        aliases: impl IntoIterator<Item = S>,
    ) -> Code {
        let mut values = self.values.lock();
        if let Some(existing) = values.iter().find(|c| c.name() == name) {
            return existing.clone();
        }
        let aliases = aliases.into_iter().map(Into::into).collect();
        self.push_locked(&mut values, name, aliases)
    }

    /// Snapshot of all constants in declaration order.
    pub fn values(&self) -> Vec<Code> {
        self.values.lock().clone()
    }

    /// Number of declared constants.
    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    /// Whether no constant has been declared yet.
    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    /// Exact, case-sensitive lookup on primary names.
    pub fn get(&self, name: &str) -> Option<Code> {
        self.values.lock().iter().find(|c| c.name() == name).cloned()
    }

    /// Find a constant by name.
    ///
    /// Tries an exact match on primary names first, then a case-insensitive
    /// scan over every name and alias of every constant.
    pub fn find(&self, name: &str) -> Result<Code> {
        find_in(&self.values.lock(), name).ok_or_else(|| self.unknown(name))
    }

    /// Find a constant by name, appending it when the family is open.
    ///
    /// The lookup and the append happen under one lock, so concurrent first
    /// uses of names differing only in case yield a single constant.
    pub fn value_of(&self, name: &str) -> Result<Code> {
        let mut values = self.values.lock();
        if let Some(code) = find_in(&values, name) {
            return Ok(code);
        }
        if !self.open {
            return Err(self.unknown(name));
        }
        Ok(self.push_locked(&mut values, name, Vec::new()))
    }

    fn push_locked(&self, values: &mut Vec<Code>, name: &str, aliases: Vec<String>) -> Code {
        let code = Code(Arc::new(CodeEntry {
            family: self.name.clone(),
            ordinal: values.len(),
            name: name.to_string(),
            aliases,
        }));
        values.push(code.clone());
        code
    }

    fn unknown(&self, name: &str) -> TypeError {
        TypeError::UnknownCode {
            family: self.name.clone(),
            name: name.to_string(),
        }
    }
}

fn find_in(values: &[Code], name: &str) -> Option<Code> {
    values
        .iter()
        .find(|c| c.name() == name)
        .or_else(|| values.iter().find(|c| c.matches_ignoring_case(name)))
        .cloned()
}

impl PartialEq for CodeListFamily {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for CodeListFamily {}

impl Hash for CodeListFamily {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}
