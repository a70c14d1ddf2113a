mod declaration;
mod document;
mod manifest;
mod version;

pub use self::declaration::{
    AccessSemantics, EnumerationDeclaration, EnumeratorDeclaration, Export, FunctionDeclaration,
    ParameterDeclaration, PropertyDeclaration, SignalDeclaration, TypeDeclaration, TypeInfo,
};
pub use self::document::{Document, Import};
pub use self::manifest::{ComponentEntry, Manifest};
pub use self::version::Version;
