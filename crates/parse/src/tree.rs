//! tree-sitter plumbing shared by the document and qmltypes parsers.
//!
//! Both file kinds are QML, so both go through the `qmljs` grammar. The
//! grammar is error tolerant; [`first_error`] turns the first `ERROR` or
//! `MISSING` node back into a parse error.

use exn::{OptionExt, ResultExt};
use tree_sitter::{Node, Parser, Tree};

use crate::error::{ErrorKind, Result};

/// Parse QML text into a syntax tree.
pub(crate) fn parse(text: &str) -> Result<Tree> {
    let mut parser = Parser::new();
    parser.set_language(&tree_sitter_qmljs::LANGUAGE.into()).or_raise(|| ErrorKind::Grammar)?;
    parser.parse(text, None).ok_or_raise(|| ErrorKind::Grammar)
}

/// Text and structure accessors on top of [`Node`].
pub(crate) trait NodeExtractor<'t> {
    /// Source text covered by the node.
    fn text<'s>(&self, source: &'s str) -> &'s str;

    /// Source text of the child stored under `field`.
    fn field_text<'s>(&self, source: &'s str, field: &str) -> Option<&'s str>;

    /// Named children, without comments.
    fn members(&self) -> Vec<Node<'t>>;

    /// Whether one of the direct (possibly anonymous) children is `kind`.
    fn has_token(&self, kind: &str) -> bool;

    /// 1-based start line.
    fn line(&self) -> usize;
}

impl<'t> NodeExtractor<'t> for Node<'t> {
    fn text<'s>(&self, source: &'s str) -> &'s str {
        &source[self.byte_range()]
    }

    fn field_text<'s>(&self, source: &'s str, field: &str) -> Option<&'s str> {
        self.child_by_field_name(field).map(|node| node.text(source))
    }

    fn members(&self) -> Vec<Node<'t>> {
        let mut cursor = self.walk();
        self.named_children(&mut cursor).filter(|child| !child.is_extra()).collect()
    }

    fn has_token(&self, kind: &str) -> bool {
        let mut cursor = self.walk();
        self.children(&mut cursor).any(|child| child.kind() == kind)
    }

    fn line(&self) -> usize {
        self.start_position().row + 1
    }
}

/// The first malformed node in document order, ignoring subtrees that `skip`
/// accepts.
pub(crate) fn first_error(root: Node<'_>, source: &str, skip: impl Fn(Node<'_>) -> bool) -> Option<ErrorKind> {
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if !node.has_error() || skip(node) {
            continue;
        }
        if node.is_missing() {
            return Some(ErrorKind::UnexpectedEof(format!("missing `{}` on line {}", node.kind(), node.line())));
        }
        if node.is_error() {
            let snippet: String = node.text(source).lines().next().unwrap_or_default().chars().take(32).collect();
            return Some(ErrorKind::syntax(node.line(), format!("unexpected `{}`", snippet.trim())));
        }
        let mut cursor = node.walk();
        let children: Vec<_> = node.children(&mut cursor).collect();
        stack.extend(children.into_iter().rev());
    }
    None
}

/// The object definition a file is built around.
pub(crate) fn root_object(program: Node<'_>) -> Option<Node<'_>> {
    program.members().into_iter().find_map(|node| match node.kind() {
        "ui_object_definition" => Some(node),
        "ui_annotated_object" => node
            .child_by_field_name("definition")
            .or_else(|| node.members().into_iter().find(|child| child.kind() == "ui_object_definition")),
        _ => None,
    })
}

/// Checks the tree and locates its root object.
///
/// Without a root object only genuine syntax errors are reported; anything
/// else is [`MissingRootObject`](ErrorKind::MissingRootObject).
pub(crate) fn checked_root<'t>(
    tree: &'t Tree,
    source: &str,
    skip: impl Fn(Node<'_>) -> bool,
) -> Result<Node<'t>> {
    let program = tree.root_node();
    let error = first_error(program, source, skip);
    match (root_object(program), error) {
        (_, Some(kind @ ErrorKind::Syntax { .. })) => exn::bail!(kind),
        (None, _) => exn::bail!(ErrorKind::MissingRootObject),
        (Some(_), Some(kind)) => exn::bail!(kind),
        (Some(root), None) => Ok(root),
    }
}

/// `type_name` of an object definition, with whitespace removed.
pub(crate) fn type_name(object: Node<'_>, source: &str) -> String {
    object
        .child_by_field_name("type_name")
        .or_else(|| object.members().into_iter().next())
        .map(|node| qualified(node.text(source)))
        .unwrap_or_default()
}

/// Members of an object definition's `{ ... }` block.
pub(crate) fn object_members(object: Node<'_>) -> Vec<Node<'_>> {
    object
        .child_by_field_name("initializer")
        .or_else(|| object.members().into_iter().find(|node| node.kind() == "ui_object_initializer"))
        .map(|initializer| initializer.members())
        .unwrap_or_default()
}

/// `QtQuick . Controls` and `QtQuick.Controls` name the same thing.
pub(crate) fn qualified(text: &str) -> String {
    text.split_whitespace().collect()
}

/// Contents of a single- or double-quoted string literal.
pub(crate) fn unquote(text: &str) -> String {
    let inner = text.get(1..text.len().saturating_sub(1)).unwrap_or_default();
    let mut value = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            value.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => value.push('\n'),
            Some('t') => value.push('\t'),
            Some(other) => value.push(other),
            None => {},
        }
    }
    value
}

/// Decimal or `0x` integer with an optional sign.
pub(crate) fn integer(text: &str) -> Option<i64> {
    let text = qualified(text);
    let (negative, digits) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text.strip_prefix('+').unwrap_or(&text)),
    };
    let value = match digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok()?,
        None => digits.parse::<i64>().ok()?,
    };
    Some(if negative { -value } else { value })
}

/// Type from a `: Type` annotation.
pub(crate) fn annotation(text: &str) -> String {
    qualified(text.trim_start().strip_prefix(':').unwrap_or(text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("\"plain\"", "plain")]
    #[case("'single'", "single")]
    #[case(r#""esc\"aped""#, "esc\"aped")]
    #[case(r#""line\nbreak""#, "line\nbreak")]
    #[case("\"\"", "")]
    fn test_unquote(#[case] text: &str, #[case] expected: &str) {
        assert_eq!(unquote(text), expected);
    }

    #[rstest]
    #[case("2", Some(2))]
    #[case("-1", Some(-1))]
    #[case("- 4", Some(-4))]
    #[case("0x10", Some(16))]
    #[case("1.5", None)]
    #[case("A", None)]
    fn test_integer(#[case] text: &str, #[case] expected: Option<i64>) {
        assert_eq!(integer(text), expected);
    }

    #[test]
    fn test_error_location() {
        let text = "Item {\n    width: 5\n    )\n}\n";
        let tree = parse(text).unwrap();
        let err = checked_root(&tree, text, |_| false).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Syntax { line, .. } if *line >= 2));
    }

    #[test]
    fn test_comments_are_not_members() {
        let text = "Item {\n    // note\n    width: 5\n    /* more */\n}\n";
        let tree = parse(text).unwrap();
        let root = checked_root(&tree, text, |_| false).unwrap();
        assert_eq!(type_name(root, text), "Item");
        assert_eq!(object_members(root).len(), 1);
    }
}
