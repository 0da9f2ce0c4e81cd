//! Bridge declaration file (`.bridge.toml`) parsing.
//!
//! A `.bridge.toml` file declares the interfaces a bridge manages, the
//! foreign classes implementing them, explicit foreign names for methods
//! whose mapped name would be wrong, and the code lists known to the bridge.

use std::path::Path;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use trellis_core::{CodeListFamily, InterfaceDesc, InterfaceRegistry, MethodDesc};

use crate::error::{BridgeError, Result};
use crate::interfacing::ClassIndex;

/// A complete bridge declaration parsed from a `.bridge.toml` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeDeclaration {
    /// Bridge-wide settings.
    pub bridge: BridgeSection,
    /// Code lists and enumerations.
    #[serde(default, rename = "code-lists", alias = "code_lists")]
    pub code_lists: Vec<CodeListDecl>,
    /// Bridged interfaces.
    #[serde(default)]
    pub interfaces: Vec<InterfaceDecl>,
    /// Families created from `code_lists`, shared by every environment
    /// built from this declaration.
    #[serde(skip)]
    families: OnceCell<Vec<Arc<CodeListFamily>>>,
}

/// Bridge-wide settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeSection {
    /// Bridge name, for diagnostics.
    pub name: String,
    /// Foreign classes whose module does not start with this prefix are
    /// ignored when looking for subtypes.
    #[serde(default, rename = "foreign-module-prefix", alias = "foreign_module_prefix")]
    pub foreign_module_prefix: Option<String>,
    /// Foreign class names left out of the class index.
    #[serde(default)]
    pub exclude: Vec<String>,
}

/// A code list or enumeration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeListDecl {
    /// Family name, as used in method return types.
    pub name: String,
    /// Whether unknown names are appended (code list) or rejected (enumeration).
    #[serde(default)]
    pub open: bool,
    /// Constants, in declaration order.
    #[serde(default)]
    pub values: Vec<CodeDecl>,
}

/// One constant of a code list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeDecl {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// A bridged interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterfaceDecl {
    /// Interface name.
    pub name: String,
    /// Foreign class implementing the interface.
    #[serde(default, rename = "foreign-class", alias = "foreign_class")]
    pub foreign_class: Option<String>,
    /// Directly extended interfaces.
    #[serde(default)]
    pub parents: Vec<String>,
    /// Declared methods.
    #[serde(default)]
    pub methods: Vec<MethodDecl>,
}

/// A method of a bridged interface.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodDecl {
    /// Method name on the typed side.
    pub name: String,
    /// Explicit foreign name; the mapped name is used when absent.
    #[serde(default, rename = "foreign-name", alias = "foreign_name")]
    pub foreign_name: Option<String>,
    /// Return type signature (e.g., "Collection<? extends Party>").
    pub returns: String,
    /// Number of arguments.
    #[serde(default)]
    pub arity: usize,
}

impl BridgeDeclaration {
    /// Parse a bridge declaration from a TOML string.
    pub fn parse(input: &str) -> Result<Self> {
        let decl: BridgeDeclaration = toml::from_str(input).map_err(BridgeError::Toml)?;

        if decl.bridge.name.is_empty() {
            return Err(BridgeError::InvalidDeclaration {
                detail: "bridge.name is required".to_string(),
            });
        }
        if let Some(empty) = decl.interfaces.iter().find(|i| i.name.is_empty()) {
            return Err(BridgeError::InvalidDeclaration {
                detail: format!("interface with empty name (foreign class {:?})", empty.foreign_class),
            });
        }
        for list in &decl.code_lists {
            if list.name.is_empty() {
                return Err(BridgeError::InvalidDeclaration {
                    detail: "code list with empty name".to_string(),
                });
            }
            if list.values.iter().any(|v| v.name.trim().is_empty()) {
                return Err(BridgeError::InvalidDeclaration {
                    detail: format!("code list {} has a value with an empty name", list.name),
                });
            }
        }

        Ok(decl)
    }

    /// Parse a bridge declaration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Build and validate the interface registry described by this declaration.
    ///
    /// Malformed return type signatures, duplicate interfaces or foreign
    /// classes, unknown parents and cyclic inheritance are reported as
    /// [`BridgeError::InvalidDeclaration`].
    pub fn to_registry(&self) -> Result<InterfaceRegistry> {
        let invalid = |e: trellis_core::TypeError| BridgeError::InvalidDeclaration {
            detail: e.to_string(),
        };
        let mut registry = InterfaceRegistry::new();
        for decl in &self.interfaces {
            let mut desc = InterfaceDesc::new(&decl.name);
            desc.foreign_class = decl.foreign_class.clone();
            desc.parents = decl.parents.clone();
            for method in &decl.methods {
                let mut m = MethodDesc::new(&method.name, &method.returns)
                    .map_err(invalid)?
                    .with_arity(method.arity);
                m.foreign_name = method.foreign_name.clone();
                desc.methods.push(m);
            }
            registry.register(desc).map_err(invalid)?;
        }
        registry.validate().map_err(invalid)?;
        Ok(registry)
    }

    /// The declared code-list families, with their constants.
    ///
    /// Families are created on first call and shared afterwards, so a name
    /// appended to an open family through one environment is seen by every
    /// environment built from this declaration. Edits to `code_lists` after
    /// the first call are not picked up.
    pub fn code_list_families(&self) -> Vec<Arc<CodeListFamily>> {
        self.families.get_or_init(|| self.create_families()).clone()
    }

    fn create_families(&self) -> Vec<Arc<CodeListFamily>> {
        self.code_lists
            .iter()
            .map(|decl| {
                let family = if decl.open {
                    CodeListFamily::open(&decl.name)
                } else {
                    CodeListFamily::closed(&decl.name)
                };
                for value in &decl.values {
                    family.declare(value.name.trim(), value.aliases.iter().cloned());
                }
                Arc::new(family)
            })
            .collect()
    }

    /// The class index described by this declaration, over a registry built
    /// from it.
    pub fn class_index(&self, registry: &InterfaceRegistry) -> ClassIndex {
        ClassIndex::from_registry(
            registry,
            self.bridge.foreign_module_prefix.clone(),
            &self.bridge.exclude,
        )
    }
}
