use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// `2`, `2.15` in qmldir component declarations.
regex!(VERSION_REGEX, r"^(\d+)(?:\.(\d+))?$");
// `QtQuick/Item 2.0` in qmltypes export lists; the package part is optional.
regex!(EXPORT_REGEX, r"^(?:(.+)/)?([^/\s]+)\s+(\d+)(?:\.(\d+))?$");
// `QtQuick 2.0` or a bare `QtQuick` in qmltypes dependency lists.
regex!(DEPENDENCY_REGEX, r"^(\S+)(?:\s+(\d+)(?:\.(\d+))?)?\s*$");
// `"Off": 0` entries of a map-style enum in older qmltypes files.
regex!(ENUM_ENTRY_REGEX, r#""([^"]+)"\s*:\s*(-?(?:0[xX][0-9a-fA-F]+|\d+))"#);
