use super::Version;

/// Contents of a `qmldir` module manifest that the updater cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Manifest {
    /// Module namespace from the `module` directive (empty if absent)
    pub module: String,
    /// File names from `typeinfo` directives, relative to the manifest
    pub type_infos: Vec<String>,
    /// Declared QML components, in file order
    pub components: Vec<ComponentEntry>,
}

/// A `[singleton] Type [version] File.qml` line.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ComponentEntry {
    pub type_name: String,
    /// File name relative to the manifest's directory
    pub file_name: String,
    pub version: Version,
    pub singleton: bool,
}
impl ComponentEntry {
    pub fn new(type_name: impl Into<String>, file_name: impl Into<String>, version: Version) -> Self {
        Self { type_name: type_name.into(), file_name: file_name.into(), version, singleton: false }
    }
}
