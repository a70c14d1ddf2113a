//! `qmldir` module manifest parsing.
//!
//! The format is line oriented. Lines that are not understood are skipped so
//! newer directives never break older readers.

use tracing::instrument;

use crate::models::{ComponentEntry, Manifest, Version};

/// Directives that are valid in a manifest but carry nothing the updater uses.
const IGNORED_DIRECTIVES: &[&str] = &[
    "internal",
    "plugin",
    "optional",
    "classname",
    "depends",
    "import",
    "designersupported",
    "prefer",
    "linktarget",
    "static",
    "system",
];

/// Parse the text of a `qmldir` manifest.
///
/// Never fails: malformed or unknown lines are logged at `trace` level and
/// skipped.
///
/// # Examples
///
/// ```
/// use qmlsync_parse::{parse_qmldir, models::Version};
///
/// let manifest = parse_qmldir("module Foo\ntypeinfo foo.qmltypes\nFooItem 1.0 FooItem.qml\n");
/// assert_eq!(manifest.module, "Foo");
/// assert_eq!(manifest.type_infos, ["foo.qmltypes"]);
/// assert_eq!(manifest.components[0].type_name, "FooItem");
/// assert_eq!(manifest.components[0].version, Version::new(1, 0));
/// ```
#[instrument(level = "debug", skip(text), fields(text_size = text.len()))]
pub fn parse_qmldir(text: &str) -> Manifest {
    let mut manifest = Manifest::default();
    for (index, line) in text.lines().enumerate() {
        let line = match line.find('#') {
            Some(comment) => &line[..comment],
            None => line,
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => {},
            // A trailing version is tolerated.
            ["module", namespace, ..] => manifest.module = (*namespace).to_string(),
            ["typeinfo", file] => manifest.type_infos.push((*file).to_string()),
            [directive, ..] if IGNORED_DIRECTIVES.contains(directive) => {},
            ["singleton", rest @ ..] => match component(rest) {
                Some(mut entry) => {
                    entry.singleton = true;
                    manifest.components.push(entry);
                },
                None => tracing::trace!(line = index + 1, "Skipping malformed singleton declaration"),
            },
            rest => match component(rest) {
                Some(entry) => manifest.components.push(entry),
                None => tracing::trace!(line = index + 1, "Skipping unrecognised qmldir line"),
            },
        }
    }
    manifest
}

/// `Type [version] File.qml`. Script (`.js`) entries are not components.
fn component(words: &[&str]) -> Option<ComponentEntry> {
    let (type_name, version, file_name) = match words {
        [type_name, file_name] => (*type_name, Version::none(), *file_name),
        [type_name, version, file_name] => (*type_name, Version::parse(version)?, *file_name),
        _ => return None,
    };
    if !type_name.starts_with(|c: char| c.is_alphabetic()) || !file_name.ends_with(".qml") {
        return None;
    }
    Some(ComponentEntry::new(type_name, file_name, version))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn test_full_manifest() {
        let manifest = parse_qmldir(
            "# Foo module\n\
             module com.example.Foo\n\
             plugin foo_plugin\n\
             classname FooPlugin\n\
             typeinfo plugins.qmltypes\n\
             depends QtQuick 2.0\n\
             FooItem 1.0 FooItem.qml\n\
             singleton Theme 1.2 Theme.qml\n\
             internal Helper Helper.qml\n\
             Utils 1.0 utils.js\n",
        );
        assert_eq!(manifest.module, "com.example.Foo");
        assert_eq!(manifest.type_infos, ["plugins.qmltypes"]);
        assert_eq!(
            manifest.components,
            vec![
                ComponentEntry::new("FooItem", "FooItem.qml", Version::new(1, 0)),
                ComponentEntry {
                    singleton: true,
                    ..ComponentEntry::new("Theme", "Theme.qml", Version::new(1, 2))
                },
            ]
        );
    }

    #[test]
    fn test_module_with_version() {
        assert_eq!(parse_qmldir("module com.example 1.0\n").module, "com.example");
    }

    #[test]
    fn test_empty_manifest() {
        assert_eq!(parse_qmldir(""), Manifest::default());
    }

    #[test]
    fn test_multiple_typeinfos_and_versions() {
        let manifest = parse_qmldir(
            "module Foo\ntypeinfo a.qmltypes\ntypeinfo b.qmltypes\nItem 2.0 Item20.qml\nItem 2.1 Item21.qml\n",
        );
        assert_eq!(manifest.type_infos, ["a.qmltypes", "b.qmltypes"]);
        assert_eq!(manifest.components.len(), 2);
    }

    #[rstest]
    #[case("Button 1.0 Button.qml", Some(("Button", Version::new(1, 0), "Button.qml")))]
    #[case("Button 6 Button.qml", Some(("Button", Version::major(6), "Button.qml")))]
    #[case("Button Button.qml", Some(("Button", Version::none(), "Button.qml")))]
    #[case("Button 1.0 controls/Button.qml", Some(("Button", Version::new(1, 0), "controls/Button.qml")))]
    #[case("Button x.y Button.qml", None)]
    #[case("Script 1.0 script.js", None)]
    #[case("Button 1.0", None)]
    #[case("1Button 1.0 Button.qml", None)]
    #[case("what is this line even", None)]
    fn test_component_lines(#[case] line: &str, #[case] expected: Option<(&str, Version, &str)>) {
        let manifest = parse_qmldir(line);
        let found = manifest.components.first().map(|c| (c.type_name.as_str(), c.version, c.file_name.as_str()));
        assert_eq!(found, expected);
    }

    #[test]
    fn test_trailing_comment_and_whitespace() {
        let manifest = parse_qmldir("  module   Foo   # the module\r\n\tFooItem\t1.0\tFooItem.qml  \r\n");
        assert_eq!(manifest.module, "Foo");
        assert_eq!(manifest.components.len(), 1);
    }

    #[test]
    fn test_malformed_lines_do_not_abort() {
        let manifest = parse_qmldir("module\ntypeinfo\n}}}{{{\nFooItem 1.0 FooItem.qml\n");
        assert_eq!(manifest.module, "");
        assert!(manifest.type_infos.is_empty());
        assert_eq!(manifest.components.len(), 1);
    }
}
