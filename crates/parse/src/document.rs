//! QML document parsing.
//!
//! Reads the import header, the root object's type and the declarations made
//! directly inside the root object. Bindings, nested objects and function
//! bodies are left to the grammar and never inspected.

use tree_sitter::Node;
use tracing::instrument;

use crate::error::{ErrorKind, Result};
use crate::models::{
    Document, EnumerationDeclaration, EnumeratorDeclaration, FunctionDeclaration, Import, ParameterDeclaration,
    PropertyDeclaration, SignalDeclaration, Version,
};
use crate::tree::{self, NodeExtractor};

/// Parse the text of a `.qml` document.
///
/// # Errors
///
/// [`MissingRootObject`](ErrorKind::MissingRootObject) when there is no root
/// object, [`UnexpectedEof`](ErrorKind::UnexpectedEof) for unbalanced braces
/// and [`Syntax`](ErrorKind::Syntax) for anything else that is not valid QML.
///
/// # Examples
///
/// ```
/// use qmlsync_parse::parse_document;
///
/// let document = parse_document("import QtQuick 2.15\nItem {\n    property int count: 0\n}\n").unwrap();
/// assert_eq!(document.prototype, "Item");
/// assert_eq!(document.imports[0].module, "QtQuick");
/// assert_eq!(document.properties[0].name, "count");
/// ```
#[instrument(level = "debug", skip(text), fields(text_size = text.len()))]
pub fn parse_document(text: &str) -> Result<Document> {
    let tree = tree::parse(text)?;
    let root = tree::checked_root(&tree, text, |_| false)?;
    let mut document = Document { prototype: tree::type_name(root, text), ..Document::default() };
    for node in tree.root_node().members() {
        if node.kind() != "ui_import" {
            continue;
        }
        if let Some(parsed) = import(node, text)? {
            document.imports.push(parsed);
        }
    }
    for member in tree::object_members(root) {
        declaration(&mut document, member, text)?;
    }
    tracing::debug!(
        prototype = %document.prototype,
        imports = document.imports.len(),
        properties = document.properties.len(),
        "Parsed QML document"
    );
    Ok(document)
}

fn syntax(node: Node<'_>, message: impl Into<String>) -> exn::Exn<ErrorKind> {
    exn::Exn::from(ErrorKind::syntax(node.line(), message))
}

/// Module imports; directory and script imports (`import "dir"`) yield `None`.
fn import(node: Node<'_>, source: &str) -> Result<Option<Import>> {
    let module = node
        .child_by_field_name("source")
        .or_else(|| node.members().into_iter().next())
        .ok_or_else(|| syntax(node, "expected module name or path after `import`"))?;
    if module.kind() == "string" {
        return Ok(None);
    }
    let mut import = Import::new(tree::qualified(module.text(source)), Version::none());
    if let Some(version) = node.child_by_field_name("version") {
        let text = version.text(source);
        import.version =
            Version::parse(text).ok_or_else(|| syntax(version, format!("invalid import version `{text}`")))?;
    }
    import.alias = node.field_text(source, "alias").map(str::to_string);
    Ok(Some(import))
}

fn declaration(document: &mut Document, member: Node<'_>, source: &str) -> Result<()> {
    match member.kind() {
        "ui_property" => document.properties.push(property(member, source)?),
        "ui_signal" => document.signals.push(signal(member, source)?),
        "function_declaration" | "generator_function_declaration" => {
            document.functions.push(function(member, source)?);
        },
        "enum_declaration" => document.enumerations.push(enumeration(member, source)?),
        "ui_annotated_object_member" => {
            if let Some(definition) = member.child_by_field_name("definition") {
                declaration(document, definition, source)?;
            }
        },
        _ => {},
    }
    Ok(())
}

/// `list<T>` or a plain (possibly qualified) type.
fn property_type(text: &str) -> (String, bool) {
    let text = tree::qualified(text);
    match text.strip_prefix("list<").and_then(|rest| rest.strip_suffix('>')) {
        Some(inner) => (inner.to_string(), true),
        None => (text, false),
    }
}

fn property(node: Node<'_>, source: &str) -> Result<PropertyDeclaration> {
    let type_node = node.child_by_field_name("type").ok_or_else(|| syntax(node, "property without a type"))?;
    let name = node.field_text(source, "name").ok_or_else(|| syntax(node, "property without a name"))?;
    let (type_name, is_list) = property_type(type_node.text(source));
    Ok(PropertyDeclaration {
        name: name.to_string(),
        type_name,
        is_list,
        is_pointer: false,
        is_readonly: node.has_token("readonly"),
    })
}

/// `(int a, string b)` or `(a: int, b: string)`.
fn signal(node: Node<'_>, source: &str) -> Result<SignalDeclaration> {
    let name = node.field_text(source, "name").ok_or_else(|| syntax(node, "signal without a name"))?;
    let mut parameters = Vec::new();
    if let Some(list) = node.child_by_field_name("parameters") {
        for parameter in list.members() {
            let parsed = match (parameter.field_text(source, "name"), parameter.field_text(source, "type")) {
                (Some(name), Some(type_name)) => Some((name.to_string(), property_type(type_name).0)),
                _ => signal_parameter(parameter.text(source)),
            };
            let (name, type_name) = parsed.ok_or_else(|| syntax(parameter, "invalid signal parameter"))?;
            parameters.push(ParameterDeclaration { name, type_name });
        }
    }
    Ok(SignalDeclaration { name: name.to_string(), parameters })
}

fn signal_parameter(text: &str) -> Option<(String, String)> {
    if let Some((name, type_name)) = text.split_once(':') {
        return Some((tree::qualified(name), property_type(type_name).0));
    }
    let (type_name, name) = text.trim().rsplit_once(char::is_whitespace)?;
    Some((name.to_string(), property_type(type_name).0))
}

/// `function name(a, b: int, c = 5): type { ... }`; default values are ignored.
fn function(node: Node<'_>, source: &str) -> Result<FunctionDeclaration> {
    let name = node.field_text(source, "name").ok_or_else(|| syntax(node, "function without a name"))?;
    let mut parameters = Vec::new();
    if let Some(list) = node.child_by_field_name("parameters") {
        for parameter in list.members() {
            let name = match parameter.kind() {
                "identifier" => parameter.text(source),
                _ => parameter
                    .child_by_field_name("pattern")
                    .or_else(|| parameter.members().into_iter().next())
                    .map(|pattern| pattern.text(source))
                    .ok_or_else(|| syntax(parameter, "invalid function parameter"))?,
            };
            let type_name = parameter.field_text(source, "type").map(tree::annotation).unwrap_or_default();
            parameters.push(ParameterDeclaration { name: name.to_string(), type_name });
        }
    }
    let return_type = node
        .field_text(source, "return_type")
        .map(tree::annotation)
        .filter(|annotation| annotation != "void")
        .unwrap_or_default();
    Ok(FunctionDeclaration { name: name.to_string(), return_type, parameters })
}

/// `enum Name { A, B = 2, C }`
fn enumeration(node: Node<'_>, source: &str) -> Result<EnumerationDeclaration> {
    let name = node.field_text(source, "name").ok_or_else(|| syntax(node, "enum without a name"))?;
    let mut enumerators = Vec::new();
    if let Some(body) = node.child_by_field_name("body") {
        for entry in body.members() {
            let enumerator = match entry.kind() {
                "enum_assignment" => {
                    let key = entry.field_text(source, "name").ok_or_else(|| syntax(entry, "invalid enumerator"))?;
                    let text = entry.field_text(source, "value").unwrap_or_default();
                    let value = tree::integer(text)
                        .ok_or_else(|| syntax(entry, format!("invalid enum value `{text}`")))?;
                    EnumeratorDeclaration::new(key, Some(value))
                },
                "string" => EnumeratorDeclaration::new(tree::unquote(entry.text(source)), None),
                _ => EnumeratorDeclaration::new(entry.text(source), None),
            };
            enumerators.push(enumerator);
        }
    }
    Ok(EnumerationDeclaration { name: name.to_string(), enumerators })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    const DOCUMENT: &str = r#"
        pragma Singleton
        import QtQuick 2.15
        import QtQuick.Controls 2.15 as Controls
        import QtQml
        import "../shared"
        import "utils.js" as Utils

        Controls.Button {
            id: root

            enum Mode { Off, On = 2, Auto = -1 }

            readonly property int count: items.length
            default property list<Item> items
            required property string label
            property var model: [
                "property", "signal"
            ]
            property Controls.Label caption: Controls.Label { property int hidden }

            signal activated(int index, string name)
            signal reset
            signal moved(x: real, y: real)

            function toggle(force, times: int, step = 1): bool {
                let property = 5
                return !force
            }

            onClicked: { var property = 1 }

            Rectangle {
                property color inner
                signal nested()
            }
        }
    "#;

    #[test]
    fn test_full_document() {
        let document = parse_document(DOCUMENT).unwrap();
        assert_eq!(
            document.imports,
            vec![
                Import::new("QtQuick", Version::new(2, 15)),
                Import { alias: Some("Controls".into()), ..Import::new("QtQuick.Controls", Version::new(2, 15)) },
                Import::new("QtQml", Version::none()),
            ]
        );
        assert_eq!(document.prototype, "Controls.Button");

        let properties: Vec<_> = document
            .properties
            .iter()
            .map(|p| (p.name.as_str(), p.type_name.as_str(), p.is_list, p.is_readonly))
            .collect();
        assert_eq!(
            properties,
            vec![
                ("count", "int", false, true),
                ("items", "Item", true, false),
                ("label", "string", false, false),
                ("model", "var", false, false),
                ("caption", "Controls.Label", false, false),
            ]
        );

        let signals: Vec<_> = document.signals.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(signals, ["activated", "reset", "moved"]);
        assert_eq!(
            document.signals[0].parameters,
            vec![
                ParameterDeclaration { name: "index".into(), type_name: "int".into() },
                ParameterDeclaration { name: "name".into(), type_name: "string".into() },
            ]
        );
        assert_eq!(document.signals[2].parameters[1].type_name, "real");

        assert_eq!(document.functions.len(), 1);
        let toggle = &document.functions[0];
        assert_eq!(toggle.return_type, "bool");
        let parameters: Vec<_> = toggle.parameters.iter().map(|p| (p.name.as_str(), p.type_name.as_str())).collect();
        assert_eq!(parameters, [("force", ""), ("times", "int"), ("step", "")]);

        assert_eq!(
            document.enumerations,
            vec![EnumerationDeclaration {
                name: "Mode".into(),
                enumerators: vec![
                    EnumeratorDeclaration::new("Off", None),
                    EnumeratorDeclaration::new("On", Some(2)),
                    EnumeratorDeclaration::new("Auto", Some(-1)),
                ],
            }]
        );
    }

    #[test]
    fn test_minimal_document() {
        let document = parse_document("Item {}").unwrap();
        assert!(document.imports.is_empty());
        assert_eq!(document.prototype, "Item");
        assert!(document.properties.is_empty());
    }

    #[test]
    fn test_semicolon_separated_declarations() {
        let document = parse_document("Item { property int a; property int b: 2; signal s; width: 5 }").unwrap();
        assert_eq!(document.properties.len(), 2);
        assert_eq!(document.signals.len(), 1);
    }

    #[test]
    fn test_bindings_and_children_are_not_declarations() {
        let text = concat!(
            "Item {\n",
            "    width: 5\n",
            "    Rectangle { property int hidden; signal nested }\n",
            "    onClicked: { var x = 1 }\n",
            "}",
        );
        let document = parse_document(text).unwrap();
        assert!(document.properties.is_empty());
        assert!(document.signals.is_empty());
    }

    #[rstest]
    #[case::quote_in_regex("function clean(s) { return s.replace(/'/g, \"\") }")]
    #[case::double_quote_in_regex("function clean(s) { return s.replace(/\"/g, '') }")]
    #[case::brace_in_regex("function braces(s) { return /\\}/.test(s) }")]
    #[case::regex_in_binding("property bool valid: /^[{(]+$/.test(text)")]
    #[case::template_literal("function greet(name) { return `}${name}{` }")]
    fn test_javascript_bodies(#[case] member: &str) {
        let text = format!("import QtQuick 2.15\nItem {{\n    {member}\n    property int after\n}}\n");
        let document = parse_document(&text).unwrap();
        assert_eq!(document.prototype, "Item");
        assert_eq!(document.properties.last().map(|p| p.name.as_str()), Some("after"));
    }

    #[rstest]
    #[case::empty("")]
    #[case::comments_only("// nothing here\n/* at all */")]
    #[case::imports_only("import QtQuick 2.15\n")]
    fn test_missing_root(#[case] text: &str) {
        let err = parse_document(text).unwrap_err();
        assert_eq!(*err, ErrorKind::MissingRootObject);
    }

    #[rstest]
    #[case::unclosed("Item {\n    Rectangle {\n}")]
    #[case::unclosed_root("Item {")]
    fn test_unbalanced_braces(#[case] text: &str) {
        let err = parse_document(text).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnexpectedEof(_) | ErrorKind::Syntax { .. }));
    }

    #[rstest]
    #[case::extra_close("Item {}\n}")]
    #[case::two_roots("Item {}\nRectangle {}")]
    #[case::bad_version("import QtQuick 2.x.1\nItem {}")]
    #[case::bad_import("import 5\nItem {}")]
    #[case::bad_property("Item {\n    property int\n}")]
    fn test_syntax_errors(#[case] text: &str) {
        let err = parse_document(text).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Syntax { .. } | ErrorKind::UnexpectedEof(_)));
    }

    #[test]
    fn test_root_without_body() {
        assert!(parse_document("Item\n").is_err());
    }
}
