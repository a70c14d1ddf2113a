//! qmltypes metadata parsing.

use exn::ResultExt;
use tree_sitter::Node;
use tracing::instrument;

use crate::consts::{DEPENDENCY_REGEX, ENUM_ENTRY_REGEX, EXPORT_REGEX};
use crate::error::{ErrorKind, Result};
use crate::models::{
    AccessSemantics, EnumerationDeclaration, EnumeratorDeclaration, Export, FunctionDeclaration, Import,
    ParameterDeclaration, PropertyDeclaration, SignalDeclaration, TypeDeclaration, TypeInfo, Version,
};
use crate::tree::{self, NodeExtractor};

/// Parse the text of a qmltypes file.
///
/// Members that are not understood are ignored. Anything that is not valid
/// QML, or a root object other than `Module`, is a
/// [`Syntax`](ErrorKind::Syntax) error.
///
/// # Examples
///
/// ```
/// use qmlsync_parse::{parse_qmltypes, models::Version};
///
/// let info = parse_qmltypes(r#"
///     import QtQuick.tooling 1.2
///     Module {
///         dependencies: ["QtQuick 2.0"]
///         Component { name: "Bar"; exports: ["Foo/Bar 1.0"] }
///     }
/// "#).unwrap();
/// assert_eq!(info.components[0].name, "Bar");
/// assert_eq!(info.components[0].exports[0].version, Version::new(1, 0));
/// ```
#[instrument(level = "debug", skip(text), fields(text_size = text.len()))]
pub fn parse_qmltypes(text: &str) -> Result<TypeInfo> {
    let tree = tree::parse(text)?;
    // Older files write enum values as `{ "A": 0 }`, which JavaScript reads as
    // a block; those values are read from the text instead.
    let root = tree::checked_root(&tree, text, |node| {
        node.kind() == "ui_binding" && node.field_text(text, "name").map(str::trim) == Some("values")
    })?;
    let module = Object::new(root, text);
    if module.type_name != "Module" {
        exn::bail!(ErrorKind::syntax(module.line(), format!("expected `Module`, found `{}`", module.type_name)));
    }

    let mut info = TypeInfo { dependencies: dependencies(&module)?, components: Vec::new() };
    for component in module.children_named("Component") {
        info.components.push(self::component(&component)?);
    }
    tracing::debug!(components = info.components.len(), dependencies = info.dependencies.len(), "Parsed qmltypes");
    Ok(info)
}

/// An object definition together with the text it was parsed from.
struct Object<'t, 's> {
    node: Node<'t>,
    source: &'s str,
    type_name: String,
    members: Vec<Node<'t>>,
}
impl<'t, 's> Object<'t, 's> {
    fn new(node: Node<'t>, source: &'s str) -> Self {
        Self { node, source, type_name: tree::type_name(node, source), members: tree::object_members(node) }
    }

    fn line(&self) -> usize {
        self.node.line()
    }

    fn syntax(&self, message: impl Into<String>) -> exn::Exn<ErrorKind> {
        exn::Exn::from(ErrorKind::syntax(self.line(), message))
    }

    /// Value of the `name: value` binding, unwrapped from its statement.
    fn binding(&self, name: &str) -> Option<Node<'t>> {
        let binding = self.members.iter().find(|member| {
            member.kind() == "ui_binding" && member.field_text(self.source, "name").map(str::trim) == Some(name)
        })?;
        let value = binding.child_by_field_name("value")?;
        match value.kind() {
            "expression_statement" => value.members().into_iter().next(),
            _ => Some(value),
        }
    }

    fn children_named(&self, type_name: &str) -> Vec<Object<'t, 's>> {
        self.members
            .iter()
            .filter(|member| member.kind() == "ui_object_definition")
            .map(|member| Object::new(*member, self.source))
            .filter(|object| object.type_name == type_name)
            .collect()
    }

    fn string(&self, name: &str) -> Result<Option<String>> {
        match self.binding(name) {
            None => Ok(None),
            Some(value) if value.kind() == "string" => Ok(Some(tree::unquote(value.text(self.source)))),
            Some(_) => Err(self.syntax(format!("`{name}` must be a string"))),
        }
    }

    fn flag(&self, name: &str) -> bool {
        self.binding(name).is_some_and(|value| value.kind() == "true")
    }

    fn strings(&self, name: &str) -> Result<Vec<String>> {
        let Some(value) = self.binding(name) else {
            return Ok(Vec::new());
        };
        if value.kind() != "array" {
            return Err(self.syntax(format!("`{name}` must be a list")));
        }
        value
            .members()
            .into_iter()
            .map(|item| match item.kind() {
                "string" => Ok(tree::unquote(item.text(self.source))),
                _ => Err(self.syntax(format!("`{name}` must be a list of strings"))),
            })
            .collect()
    }
}

fn version(major: Option<regex::Match<'_>>, minor: Option<regex::Match<'_>>) -> Version {
    Version {
        major: major.and_then(|m| m.as_str().parse().ok()),
        minor: minor.and_then(|m| m.as_str().parse().ok()),
    }
}

fn dependencies(module: &Object<'_, '_>) -> Result<Vec<Import>> {
    module
        .strings("dependencies")?
        .into_iter()
        .map(|dependency| {
            let captures = DEPENDENCY_REGEX
                .captures(dependency.trim())
                .ok_or_else(|| module.syntax(format!("invalid dependency `{dependency}`")))?;
            Ok(Import::new(&captures[1], version(captures.get(2), captures.get(3))))
        })
        .collect()
}

fn required_name(object: &Object<'_, '_>) -> Result<String> {
    match object.string("name")? {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(object.syntax(format!("`{}` without a name", object.type_name))),
    }
}

fn component(object: &Object<'_, '_>) -> Result<TypeDeclaration> {
    let name = required_name(object)?;
    let exports = object
        .strings("exports")?
        .into_iter()
        .map(|export| {
            let captures = EXPORT_REGEX
                .captures(export.trim())
                .ok_or_else(|| object.syntax(format!("invalid export `{export}`")))?;
            Ok(Export {
                package: captures.get(1).map(|m| m.as_str().to_string()).unwrap_or_default(),
                name: captures[2].to_string(),
                version: version(captures.get(3), captures.get(4)),
            })
        })
        .collect::<Result<Vec<_>>>()
        .or_raise(|| ErrorKind::syntax(object.line(), format!("invalid exports for `{name}`")))?;
    let access_semantics = match object.string("accessSemantics")? {
        None => AccessSemantics::Reference,
        Some(value) => AccessSemantics::parse(&value)
            .ok_or_else(|| object.syntax(format!("unknown access semantics `{value}`")))?,
    };

    let mut declaration = TypeDeclaration {
        prototype: object.string("prototype")?.filter(|p| !p.is_empty()),
        access_semantics,
        exports,
        ..TypeDeclaration::default()
    };
    for property in object.children_named("Property") {
        declaration.properties.push(PropertyDeclaration {
            name: required_name(&property)?,
            type_name: property.string("type")?.unwrap_or_default(),
            is_list: property.flag("isList"),
            is_pointer: property.flag("isPointer"),
            is_readonly: property.flag("isReadonly"),
        });
    }
    for method in object.children_named("Method") {
        declaration.functions.push(FunctionDeclaration {
            name: required_name(&method)?,
            return_type: method.string("type")?.filter(|t| t != "void").unwrap_or_default(),
            parameters: parameters(&method)?,
        });
    }
    for signal in object.children_named("Signal") {
        declaration.signals.push(SignalDeclaration { name: required_name(&signal)?, parameters: parameters(&signal)? });
    }
    for enumeration in object.children_named("Enum") {
        declaration.enumerations.push(self::enumeration(&enumeration)?);
    }
    declaration.name = name;
    Ok(declaration)
}

fn parameters(method: &Object<'_, '_>) -> Result<Vec<ParameterDeclaration>> {
    method
        .children_named("Parameter")
        .iter()
        .map(|parameter| {
            Ok(ParameterDeclaration {
                name: required_name(parameter)?,
                type_name: parameter.string("type")?.unwrap_or_default(),
            })
        })
        .collect()
}

fn enumeration(object: &Object<'_, '_>) -> Result<EnumerationDeclaration> {
    let enumerators = match object.binding("values") {
        None => Vec::new(),
        Some(value) if value.kind() == "array" => object
            .strings("values")
            .or_raise(|| ErrorKind::syntax(object.line(), "enum values must be strings"))?
            .into_iter()
            .map(|name| EnumeratorDeclaration::new(name, None))
            .collect(),
        Some(value) => {
            let text = value.text(object.source);
            let entries: Vec<_> = ENUM_ENTRY_REGEX
                .captures_iter(text)
                .map(|captures| {
                    let value = tree::integer(&captures[2])
                        .ok_or_else(|| object.syntax(format!("enum value `{}` must be an integer", &captures[1])))?;
                    Ok(EnumeratorDeclaration::new(&captures[1], Some(value)))
                })
                .collect::<Result<_>>()?;
            // Anything left over besides the entries is not a map of integers.
            let leftover = ENUM_ENTRY_REGEX.replace_all(text, "");
            if leftover.chars().any(|c| !matches!(c, '{' | '}' | ',') && !c.is_whitespace()) {
                exn::bail!(ErrorKind::syntax(object.line(), "enum values must be a list or a map of integers"));
            }
            entries
        },
    };
    Ok(EnumerationDeclaration { name: required_name(object)?, enumerators })
}
