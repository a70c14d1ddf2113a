//! Values exchanged with the project storage.

use qmlsync_parse::models::{
    AccessSemantics, EnumerationDeclaration, FunctionDeclaration, PropertyDeclaration, SignalDeclaration, Version,
};
use std::fmt::{Display, Formatter, Result as FmtResult};

macro_rules! id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, sqlx::Type)]
        #[sqlx(transparent)]
        pub struct $name(pub i64);
        impl $name {
            /// Ids handed out by SQLite start at 1.
            pub fn is_valid(&self) -> bool {
                self.0 > 0
            }
        }
        impl Display for $name {
            fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
                write!(f, "{}", self.0)
            }
        }
    };
}

id!(
    /// Identity of a single file path, stable for the lifetime of the database.
    SourceId
);
id!(
    /// Identity of a directory path.
    SourceContextId
);
id!(
    /// Identity of a module namespace string.
    ModuleId
);
id!(TypeId);

/// Size and modification time of a file, the unit of change detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct FileStatus {
    pub source_id: SourceId,
    pub size: i64,
    /// Nanoseconds since the Unix epoch
    pub last_modified: i64,
}
impl FileStatus {
    pub fn new(source_id: SourceId, size: i64, last_modified: i64) -> Self {
        Self { source_id, size, last_modified }
    }

    pub fn is_valid(&self) -> bool {
        self.source_id.is_valid() && self.size >= 0 && self.last_modified >= 0
    }
}

/// Kind of file a manifest links to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileType {
    QmlTypes,
    QmlDocument,
}
impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileType::QmlTypes => "qmltypes",
            FileType::QmlDocument => "qmldocument",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "qmltypes" => Some(FileType::QmlTypes),
            "qmldocument" => Some(FileType::QmlDocument),
            _ => None,
        }
    }
}
impl Display for FileType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

/// Links a manifest to a file it declares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProjectData {
    /// The manifest (`qmldir`) that declares the file
    pub project_source_id: SourceId,
    pub source_id: SourceId,
    pub module_id: ModuleId,
    pub file_type: FileType,
}
impl ProjectData {
    pub fn new(project_source_id: SourceId, source_id: SourceId, module_id: ModuleId, file_type: FileType) -> Self {
        Self { project_source_id, source_id, module_id, file_type }
    }
}

/// How much of a [`Type`] the synchronizer should rewrite.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ChangeLevel {
    /// Replace declarations and exported names.
    #[default]
    Full,
    /// The file did not change: keep declarations, replace exported names.
    Minimal,
    /// Replace declarations, keep whatever exported names are stored.
    ExcludeExportedTypes,
}

/// A name under which a type is visible in a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExportedType {
    pub module_id: ModuleId,
    pub name: String,
    pub version: Version,
}
impl ExportedType {
    pub fn new(module_id: ModuleId, name: impl Into<String>, version: Version) -> Self {
        Self { module_id, name: name.into(), version }
    }
}

/// An exported name as stored, joined with the type it resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedTypeName {
    pub module_id: ModuleId,
    pub name: String,
    pub version: Version,
    pub type_id: TypeId,
    pub type_name: String,
    pub source_id: SourceId,
}

/// A module imported by a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Import {
    pub module_id: ModuleId,
    pub version: Version,
    pub source_id: SourceId,
}
impl Import {
    pub fn new(module_id: ModuleId, version: Version, source_id: SourceId) -> Self {
        Self { module_id, version, source_id }
    }
}

/// A type declaration together with the names it is exported under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Type {
    pub type_name: String,
    pub prototype: Option<String>,
    pub access_semantics: AccessSemantics,
    pub source_id: SourceId,
    pub change_level: ChangeLevel,
    pub exported_types: Vec<ExportedType>,
    pub properties: Vec<PropertyDeclaration>,
    pub functions: Vec<FunctionDeclaration>,
    pub signals: Vec<SignalDeclaration>,
    pub enumerations: Vec<EnumerationDeclaration>,
}
impl Type {
    pub fn new(type_name: impl Into<String>, source_id: SourceId) -> Self {
        Self {
            type_name: type_name.into(),
            prototype: None,
            access_semantics: AccessSemantics::Reference,
            source_id,
            change_level: ChangeLevel::Full,
            exported_types: Vec::new(),
            properties: Vec::new(),
            functions: Vec::new(),
            signals: Vec::new(),
            enumerations: Vec::new(),
        }
    }
}

/// Everything one updater run found, committed in a single transaction.
///
/// Every source id that appears in `types` must also appear in
/// `updated_source_ids`, and every manifest id in `project_datas` must
/// appear in `updated_project_source_ids`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynchronizationPackage {
    pub imports: Vec<Import>,
    pub types: Vec<Type>,
    pub file_statuses: Vec<FileStatus>,
    /// Sources whose stored types, imports and project datas are replaced
    pub updated_source_ids: Vec<SourceId>,
    /// Sources whose stored file status is replaced
    pub updated_file_status_source_ids: Vec<SourceId>,
    /// Manifests whose project datas are replaced
    pub updated_project_source_ids: Vec<SourceId>,
    pub project_datas: Vec<ProjectData>,
}
impl SynchronizationPackage {
    /// `true` if synchronizing this package would not change anything.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
            && self.file_statuses.is_empty()
            && self.updated_source_ids.is_empty()
            && self.updated_file_status_source_ids.is_empty()
            && self.updated_project_source_ids.is_empty()
            && self.project_datas.is_empty()
            && self.imports.is_empty()
    }
}
