//! Turning parsed files into storage records.

use qmlsync_parse::models::{ComponentEntry, Document, TypeInfo, Version};
use qmlsync_store::error::Result;
use qmlsync_store::{AccessSemantics, ExportedType, Import, ModuleId, SourceId, Type};
use std::cmp::Reverse;
use std::path::Path;

use crate::storage::SymbolStorage;

/// Suffix of the module that holds the C++ names of a module's types.
const CPP_NATIVE_SUFFIX: &str = "-cppnative";

pub(crate) fn cpp_native_module(namespace: &str) -> String {
    format!("{namespace}{CPP_NATIVE_SUFFIX}")
}

/// Type name of a component file: its file name without extension.
pub(crate) fn component_type_name(file_name: &str) -> String {
    Path::new(file_name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(file_name)
        .to_string()
}

/// Highest minor version per `(type name, major)`, ordered by type name and
/// version, descending.
pub(crate) fn dedup_components(mut components: Vec<ComponentEntry>) -> Vec<ComponentEntry> {
    components.sort_by_key(|entry| Reverse((entry.type_name.clone(), entry.version.major, entry.version.minor)));
    components.dedup_by(|later, earlier| {
        later.type_name == earlier.type_name && later.version.major == earlier.version.major
    });
    components
}

/// Imports and types declared by a qmltypes file of module `namespace`.
///
/// Every dependency `Mod M.m` becomes an import of `Mod-cppnative`, and the
/// file always imports `QML` and `QtQml-cppnative`. Each component is
/// exported under its declared names plus, unversioned, under its C++ name
/// in `<namespace>-cppnative`.
pub(crate) async fn type_info<S: SymbolStorage + ?Sized>(
    storage: &S,
    info: TypeInfo,
    source_id: SourceId,
    namespace: &str,
    imports: &mut Vec<Import>,
    types: &mut Vec<Type>,
) -> Result<()> {
    for dependency in &info.dependencies {
        let module_id = storage.module_id(&cpp_native_module(&dependency.module)).await?;
        imports.push(Import::new(module_id, dependency.version, source_id));
    }
    imports.push(Import::new(storage.module_id("QML").await?, Version::none(), source_id));
    imports.push(Import::new(storage.module_id("QtQml-cppnative").await?, Version::none(), source_id));

    let cpp_module_id = storage.module_id(&cpp_native_module(namespace)).await?;
    for component in info.components {
        let mut ty = Type::new(component.name, source_id);
        ty.prototype = component.prototype;
        ty.access_semantics = component.access_semantics;
        for export in component.exports {
            let module_id = storage.module_id(&export.package).await?;
            ty.exported_types.push(ExportedType::new(module_id, export.name, export.version));
        }
        ty.exported_types.push(ExportedType::new(cpp_module_id, ty.type_name.clone(), Version::none()));
        ty.properties = component.properties;
        ty.functions = component.functions;
        ty.signals = component.signals;
        ty.enumerations = component.enumerations;
        types.push(ty);
    }
    Ok(())
}

/// The type a QML document implements. Its imports are appended to `imports`.
pub(crate) async fn document<S: SymbolStorage + ?Sized>(
    storage: &S,
    document: Document,
    type_name: String,
    source_id: SourceId,
    imports: &mut Vec<Import>,
) -> Result<Type> {
    for import in &document.imports {
        let module_id: ModuleId = storage.module_id(&import.module).await?;
        imports.push(Import::new(module_id, import.version, source_id));
    }
    let mut ty = Type::new(type_name, source_id);
    ty.prototype = Some(document.prototype).filter(|prototype| !prototype.is_empty());
    ty.access_semantics = AccessSemantics::Reference;
    ty.properties = document.properties;
    ty.functions = document.functions;
    ty.signals = document.signals;
    ty.enumerations = document.enumerations;
    Ok(ty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn entry(type_name: &str, major: u32, minor: u32) -> ComponentEntry {
        ComponentEntry::new(type_name, format!("{type_name}.qml"), Version::new(major, minor))
    }

    #[test]
    fn test_dedup_keeps_highest_minor_per_major() {
        let components = vec![
            entry("Button", 1, 0),
            entry("Button", 1, 2),
            entry("Button", 2, 0),
            entry("Label", 1, 1),
            entry("Button", 1, 1),
        ];
        let names: Vec<_> = dedup_components(components)
            .into_iter()
            .map(|entry| (entry.type_name, entry.version))
            .collect();
        assert_eq!(
            names,
            vec![
                ("Label".to_string(), Version::new(1, 1)),
                ("Button".to_string(), Version::new(2, 0)),
                ("Button".to_string(), Version::new(1, 2)),
            ]
        );
    }

    #[rstest]
    #[case("FooItem.qml", "FooItem")]
    #[case("controls/Button.qml", "Button")]
    #[case("NoExtension", "NoExtension")]
    #[case("Dotted.ui.qml", "Dotted.ui")]
    fn test_component_type_name(#[case] file_name: &str, #[case] expected: &str) {
        assert_eq!(component_type_name(file_name), expected);
    }

    #[test]
    fn test_cpp_native_module() {
        assert_eq!(cpp_native_module("QtQuick"), "QtQuick-cppnative");
    }
}
