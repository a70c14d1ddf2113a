//! Parsers for the three file kinds a QML module is made of.
//!
//! - [`parse_qmldir`]: the `qmldir` module manifest (never fails),
//! - [`parse_qmltypes`]: typed-module metadata in QML object notation,
//! - [`parse_document`]: a `.qml` component source file.
//!
//! All three are pure functions of their input text. The last two are built
//! on the tree-sitter `qmljs` grammar. Resolving module names to storage
//! identifiers is left to the caller.

mod consts;
mod document;
pub mod error;
pub mod models;
mod qmldir;
mod qmltypes;
mod tree;

pub use crate::document::parse_document;
pub use crate::qmldir::parse_qmldir;
pub use crate::qmltypes::parse_qmltypes;

#[cfg(all(test, feature = "serde"))]
mod tests {
    use crate::models::{TypeInfo, Version};

    #[test]
    fn test_models_serialize() {
        let info = crate::parse_qmltypes("Module { Component { name: \"A\"; exports: [\"Foo/A 1.0\"] } }").unwrap();
        let json = serde_json::to_string(&info).unwrap();
        let back: TypeInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back.components[0].exports[0].version, Version::new(1, 0));
    }
}
