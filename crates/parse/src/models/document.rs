use super::{EnumerationDeclaration, FunctionDeclaration, PropertyDeclaration, SignalDeclaration, Version};

/// A module import, from a QML document header or a qmltypes dependency.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Import {
    /// Dotted module name, e.g. `QtQuick.Controls`
    pub module: String,
    pub version: Version,
    pub alias: Option<String>,
}
impl Import {
    pub fn new(module: impl Into<String>, version: Version) -> Self {
        Self { module: module.into(), version, alias: None }
    }
}

/// What a QML document declares about the type it implements.
///
/// The type's own name comes from the file name, not from the content.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Document {
    pub imports: Vec<Import>,
    /// Type name of the root object, possibly qualified (`Controls.Button`)
    pub prototype: String,
    pub properties: Vec<PropertyDeclaration>,
    pub functions: Vec<FunctionDeclaration>,
    pub signals: Vec<SignalDeclaration>,
    pub enumerations: Vec<EnumerationDeclaration>,
}
