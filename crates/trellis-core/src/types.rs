//! Target type descriptors and generic signatures.
//!
//! A [`TypeDesc`] names the shape a foreign value must be converted into.
//! Descriptors are immutable, cheap to clone and hashable, so a resolved
//! conversion strategy can be cached per descriptor. A [`GenericType`] is the
//! parsed form of a declared return type such as
//! `Collection<? extends Responsibility>`, kept so that element types of
//! collections can be recovered from nested wildcard and parameterized bounds.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::codelist::CodeListFamily;
use crate::error::{Result, TypeError};
use crate::interface::InterfaceRegistry;

/// Raw type names treated as collection abstractions.
pub const COLLECTION_NAMES: &[&str] = &[
    "Collection",
    "List",
    "Set",
    "SortedSet",
    "Iterable",
    "Sequence",
];

/// Whether the given raw type name denotes a collection abstraction.
///
/// Purely lexical; callers holding a registry let registered interfaces win.
pub fn is_collection_name(name: &str) -> bool {
    COLLECTION_NAMES.contains(&name)
}

/// The shape a foreign value is converted into.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeDesc {
    /// Plain character string.
    String,
    /// Human-readable, localizable string. Converted to a single-locale literal.
    InternationalString,
    /// Boolean, either primitive (`boolean`) or boxed (`Boolean`, nullable).
    Boolean { boxed: bool },
    /// Integral number, either primitive (`int`, `long`, ...) or boxed.
    Integer { boxed: bool },
    /// Floating-point number, either primitive (`double`, `float`) or boxed.
    Float { boxed: bool },
    /// A value of an enumerated or extensible code-list family.
    CodeList(Arc<CodeListFamily>),
    /// A bridged interface, by name.
    Interface(String),
    /// A collection abstraction with its full generic signature.
    Collection(GenericType),
    /// Any other named type. No conversion strategy exists for it.
    Named(String),
}

impl TypeDesc {
    /// Map a built-in type name (`String`, `int`, `Double`, ...) to its descriptor.
    pub fn builtin(name: &str) -> Option<TypeDesc> {
        let desc = match name {
            "String" | "CharSequence" => TypeDesc::String,
            "InternationalString" => TypeDesc::InternationalString,
            "boolean" => TypeDesc::Boolean { boxed: false },
            "Boolean" => TypeDesc::Boolean { boxed: true },
            "int" | "long" | "short" | "byte" => TypeDesc::Integer { boxed: false },
            "Integer" | "Long" | "Short" | "Byte" => TypeDesc::Integer { boxed: true },
            "double" | "float" => TypeDesc::Float { boxed: false },
            "Double" | "Float" => TypeDesc::Float { boxed: true },
            _ => return None,
        };
        Some(desc)
    }

    /// Whether this descriptor is a collection abstraction.
    pub fn is_collection(&self) -> bool {
        matches!(self, TypeDesc::Collection(_))
    }

    /// Whether this descriptor is a string-like target.
    pub fn is_string_like(&self) -> bool {
        matches!(self, TypeDesc::String | TypeDesc::InternationalString)
    }

    /// Whether a value of type `other` can be used where `self` is expected.
    ///
    /// Interfaces follow the registry's inheritance links; every other shape
    /// is only assignable from itself.
    pub fn is_assignable_from(&self, other: &TypeDesc, registry: &InterfaceRegistry) -> bool {
        match (self, other) {
            (TypeDesc::Interface(target), TypeDesc::Interface(source)) => {
                registry.is_subtype(source, target)
            }
            (target, source) => target == source,
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::String => write!(f, "String"),
            TypeDesc::InternationalString => write!(f, "InternationalString"),
            TypeDesc::Boolean { boxed: true } => write!(f, "Boolean"),
            TypeDesc::Boolean { boxed: false } => write!(f, "boolean"),
            TypeDesc::Integer { boxed: true } => write!(f, "Integer"),
            TypeDesc::Integer { boxed: false } => write!(f, "int"),
            TypeDesc::Float { boxed: true } => write!(f, "Double"),
            TypeDesc::Float { boxed: false } => write!(f, "double"),
            TypeDesc::CodeList(family) => write!(f, "{}", family.name()),
            TypeDesc::Interface(name) => write!(f, "{name}"),
            TypeDesc::Collection(generic) => write!(f, "{generic}"),
            TypeDesc::Named(name) => write!(f, "{name}"),
        }
    }
}

/// A declared type as written in an interface description.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenericType {
    /// A plain type name (`String`, `Citation`).
    Class(String),
    /// A raw type with type arguments (`List<Citation>`).
    Parameterized { raw: String, args: Vec<GenericType> },
    /// A wildcard argument (`?`, `? extends Party`, `? super Party`).
    Wildcard {
        upper: Vec<GenericType>,
        lower: Vec<GenericType>,
    },
}

impl GenericType {
    /// Parse a type signature.
    ///
    /// Examples:
    /// - `"Citation"`
    /// - `"List<String>"`
    /// - `"Collection<? extends Map<String, ? extends Party>>"`
    pub fn parse(input: &str) -> Result<Self> {
        let tokens = tokenize(input)?;
        let mut parser = Parser {
            input,
            tokens: &tokens,
            pos: 0,
        };
        let ty = parser.parse_type()?;
        if parser.pos != tokens.len() {
            return Err(parser.error("unexpected trailing input"));
        }
        if matches!(ty, GenericType::Wildcard { .. }) {
            return Err(parser.error("a wildcard is only allowed as a type argument"));
        }
        Ok(ty)
    }

    /// The raw type name, or `None` for a wildcard.
    pub fn raw_name(&self) -> Option<&str> {
        match self {
            GenericType::Class(name) => Some(name),
            GenericType::Parameterized { raw, .. } => Some(raw),
            GenericType::Wildcard { .. } => None,
        }
    }

    /// Whether the raw type is a collection abstraction.
    pub fn is_collection(&self) -> bool {
        self.raw_name().is_some_and(is_collection_name)
    }

    /// Resolve the concrete element type of a single-argument parameterized type.
    ///
    /// Wildcards are replaced by their upper bound and parameterized arguments
    /// by their raw type, so `Collection<? extends List<Party>>` yields `List`.
    /// Returns `None` when no single concrete bound exists (`Collection<?>`,
    /// `Map<K, V>`, or a type with no arguments).
    pub fn element_bound(&self) -> Option<&str> {
        let GenericType::Parameterized { args, .. } = self else {
            return None;
        };
        let mut params: &[GenericType] = args;
        while let [only] = params {
            match only {
                GenericType::Wildcard { upper, .. } => params = upper.as_slice(),
                GenericType::Parameterized { raw, .. } => return Some(raw),
                GenericType::Class(name) => return Some(name),
            }
        }
        None
    }
}

impl fmt::Display for GenericType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GenericType::Class(name) => write!(f, "{name}"),
            GenericType::Parameterized { raw, args } => {
                write!(f, "{raw}<")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ">")
            }
            GenericType::Wildcard { upper, lower } => {
                write!(f, "?")?;
                let (keyword, bounds) = if !upper.is_empty() {
                    ("extends", upper)
                } else if !lower.is_empty() {
                    ("super", lower)
                } else {
                    return Ok(());
                };
                write!(f, " {keyword} ")?;
                for (i, bound) in bounds.iter().enumerate() {
                    if i > 0 {
                        write!(f, " & ")?;
                    }
                    write!(f, "{bound}")?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Open,
    Close,
    Comma,
    Question,
    Amp,
}

fn tokenize(input: &str) -> Result<Vec<Token>> {
    let mut tokens = Vec::new();
    let mut chars = input.char_indices().peekable();
    while let Some(&(start, c)) = chars.peek() {
        match c {
            c if c.is_whitespace() => {
                chars.next();
            }
            '<' => {
                chars.next();
                tokens.push(Token::Open);
            }
            '>' => {
                chars.next();
                tokens.push(Token::Close);
            }
            ',' => {
                chars.next();
                tokens.push(Token::Comma);
            }
            '?' => {
                chars.next();
                tokens.push(Token::Question);
            }
            '&' => {
                chars.next();
                tokens.push(Token::Amp);
            }
            c if c.is_alphabetic() || c == '_' => {
                let mut end = start;
                while let Some(&(i, c)) = chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '.' || c == '$' {
                        end = i + c.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Ident(input[start..end].to_string()));
            }
            other => {
                return Err(TypeError::InvalidSignature {
                    signature: input.to_string(),
                    detail: format!("unexpected character '{other}'"),
                });
            }
        }
    }
    Ok(tokens)
}

struct Parser<'a> {
    input: &'a str,
    tokens: &'a [Token],
    pos: usize,
}

impl Parser<'_> {
    fn error(&self, detail: &str) -> TypeError {
        TypeError::InvalidSignature {
            signature: self.input.to_string(),
            detail: detail.to_string(),
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn expect(&mut self, token: Token, what: &str) -> Result<()> {
        if self.peek() == Some(&token) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(&format!("expected {what}")))
        }
    }

    fn parse_type(&mut self) -> Result<GenericType> {
        match self.peek() {
            Some(Token::Question) => {
                self.pos += 1;
                self.parse_wildcard()
            }
            Some(Token::Ident(name)) => {
                let raw = name.clone();
                self.pos += 1;
                if self.peek() != Some(&Token::Open) {
                    return Ok(GenericType::Class(raw));
                }
                self.pos += 1;
                let mut args = vec![self.parse_type()?];
                while self.peek() == Some(&Token::Comma) {
                    self.pos += 1;
                    args.push(self.parse_type()?);
                }
                self.expect(Token::Close, "'>'")?;
                Ok(GenericType::Parameterized { raw, args })
            }
            Some(_) => Err(self.error("expected a type name or '?'")),
            None => Err(self.error("unexpected end of signature")),
        }
    }

    fn parse_wildcard(&mut self) -> Result<GenericType> {
        let keyword = match self.peek() {
            Some(Token::Ident(k)) if k == "extends" || k == "super" => k.clone(),
            _ => {
                return Ok(GenericType::Wildcard {
                    upper: Vec::new(),
                    lower: Vec::new(),
                })
            }
        };
        self.pos += 1;
        let mut bounds = vec![self.parse_bound()?];
        while self.peek() == Some(&Token::Amp) {
            self.pos += 1;
            bounds.push(self.parse_bound()?);
        }
        if keyword == "extends" {
            Ok(GenericType::Wildcard {
                upper: bounds,
                lower: Vec::new(),
            })
        } else {
            Ok(GenericType::Wildcard {
                upper: Vec::new(),
                lower: bounds,
            })
        }
    }

    fn parse_bound(&mut self) -> Result<GenericType> {
        let bound = self.parse_type()?;
        if matches!(bound, GenericType::Wildcard { .. }) {
            return Err(self.error("a wildcard bound cannot itself be a wildcard"));
        }
        Ok(bound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interface::{InterfaceDesc, InterfaceRegistry};

    #[test]
    fn parse_plain_class() {
        assert_eq!(
            GenericType::parse("Citation").unwrap(),
            GenericType::Class("Citation".to_string())
        );
    }

    #[test]
    fn parse_nested_wildcards() {
        let ty = GenericType::parse("Collection<? extends Map<String, ? extends Party>>").unwrap();
        assert_eq!(
            ty.to_string(),
            "Collection<? extends Map<String, ? extends Party>>"
        );
        assert!(ty.is_collection());
        assert_eq!(ty.element_bound(), Some("Map"));
    }

    #[test]
    fn element_bound_follows_wildcards() {
        let ty = GenericType::parse("List<? extends Responsibility>").unwrap();
        assert_eq!(ty.element_bound(), Some("Responsibility"));
        let ty = GenericType::parse("Set<Identifier>").unwrap();
        assert_eq!(ty.element_bound(), Some("Identifier"));
    }

    #[test]
    fn element_bound_unresolvable() {
        assert_eq!(GenericType::parse("List<?>").unwrap().element_bound(), None);
        assert_eq!(
            GenericType::parse("List<? super Party>").unwrap().element_bound(),
            None
        );
        assert_eq!(
            GenericType::parse("Map<String, Party>").unwrap().element_bound(),
            None
        );
        assert_eq!(GenericType::parse("List").unwrap().element_bound(), None);
    }

    #[test]
    fn intersection_bounds_are_unresolvable() {
        let ty = GenericType::parse("List<? extends Party & Comparable>").unwrap();
        assert_eq!(ty.to_string(), "List<? extends Party & Comparable>");
        assert_eq!(ty.element_bound(), None);
    }

    #[test]
    fn parse_errors() {
        assert!(GenericType::parse("").is_err());
        assert!(GenericType::parse("List<String").is_err());
        assert!(GenericType::parse("List<String>>").is_err());
        assert!(GenericType::parse("?").is_err());
        assert!(GenericType::parse("List<#>").is_err());
        let err = GenericType::parse("List<,>").unwrap_err();
        assert!(err.to_string().contains("List<,>"));
    }

    #[test]
    fn builtin_names() {
        assert_eq!(TypeDesc::builtin("int"), Some(TypeDesc::Integer { boxed: false }));
        assert_eq!(TypeDesc::builtin("Double"), Some(TypeDesc::Float { boxed: true }));
        assert_eq!(TypeDesc::builtin("Boolean"), Some(TypeDesc::Boolean { boxed: true }));
        assert_eq!(TypeDesc::builtin("Citation"), None);
    }

    #[test]
    fn display_names() {
        assert_eq!(TypeDesc::Integer { boxed: false }.to_string(), "int");
        assert_eq!(TypeDesc::Float { boxed: true }.to_string(), "Double");
        assert_eq!(TypeDesc::Named("Unit".into()).to_string(), "Unit");
    }

    #[test]
    fn interface_assignability() {
        let mut registry = InterfaceRegistry::new();
        registry.register(InterfaceDesc::new("Party")).unwrap();
        registry
            .register(InterfaceDesc::new("Individual").with_parent("Party"))
            .unwrap();
        let party = TypeDesc::Interface("Party".into());
        let individual = TypeDesc::Interface("Individual".into());
        assert!(party.is_assignable_from(&individual, &registry));
        assert!(!individual.is_assignable_from(&party, &registry));
        assert!(party.is_assignable_from(&party, &registry));
        assert!(!TypeDesc::String.is_assignable_from(&party, &registry));
        assert!(TypeDesc::String.is_assignable_from(&TypeDesc::String, &registry));
    }
}
