use super::{Import, Version};
use std::fmt::{Display, Formatter, Result as FmtResult};

/// Contents of a qmltypes metadata file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeInfo {
    /// Modules listed in `dependencies`
    pub dependencies: Vec<Import>,
    pub components: Vec<TypeDeclaration>,
}

/// A `Component { ... }` block from a qmltypes file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TypeDeclaration {
    /// Internal (C++) name of the type
    pub name: String,
    pub prototype: Option<String>,
    pub access_semantics: AccessSemantics,
    pub exports: Vec<Export>,
    pub properties: Vec<PropertyDeclaration>,
    pub functions: Vec<FunctionDeclaration>,
    pub signals: Vec<SignalDeclaration>,
    pub enumerations: Vec<EnumerationDeclaration>,
}

/// How instances of a type are passed around.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AccessSemantics {
    #[default]
    Reference,
    Value,
    Sequence,
    None,
}
impl AccessSemantics {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessSemantics::Reference => "reference",
            AccessSemantics::Value => "value",
            AccessSemantics::Sequence => "sequence",
            AccessSemantics::None => "none",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "reference" => Some(AccessSemantics::Reference),
            "value" => Some(AccessSemantics::Value),
            "sequence" => Some(AccessSemantics::Sequence),
            "none" => Some(AccessSemantics::None),
            _ => None,
        }
    }
}
impl Display for AccessSemantics {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// `Package/Name M.m` entry of a component's `exports` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Export {
    /// Module the name is exported into (empty if the entry had no package)
    pub package: String,
    pub name: String,
    pub version: Version,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PropertyDeclaration {
    pub name: String,
    pub type_name: String,
    pub is_list: bool,
    pub is_pointer: bool,
    pub is_readonly: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ParameterDeclaration {
    pub name: String,
    /// Empty when the declaration carries no type annotation
    pub type_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FunctionDeclaration {
    pub name: String,
    /// Empty for `void` or unannotated functions
    pub return_type: String,
    pub parameters: Vec<ParameterDeclaration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SignalDeclaration {
    pub name: String,
    pub parameters: Vec<ParameterDeclaration>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumerationDeclaration {
    pub name: String,
    pub enumerators: Vec<EnumeratorDeclaration>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EnumeratorDeclaration {
    pub name: String,
    pub value: Option<i64>,
}
impl EnumeratorDeclaration {
    pub fn new(name: impl Into<String>, value: Option<i64>) -> Self {
        Self { name: name.into(), value }
    }
}
