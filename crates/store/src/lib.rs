//! SQLite project storage for QML module structure.
//!
//! The storage is a cache of what the workspace's manifests, metadata files
//! and components declare. It is never the source of truth: deleting the
//! database and running the updater again rebuilds it.
//!
//! # Architecture
//! - [`SourcePathCache`] interns file and directory paths as small integer
//!   ids ([`SourceId`], [`SourceContextId`]).
//! - [`ProjectStorage`] owns everything else: module ids, file statuses from
//!   the last run, the manifest-to-file links ([`ProjectData`]), type
//!   declarations and their exported names. It is updated in one transaction
//!   per run through [`ProjectStorage::synchronize`].

mod db;
pub mod error;
mod models;
mod path_cache;
mod repo;
mod types;

pub use crate::db::Database;
pub use crate::path_cache::SourcePathCache;
pub use crate::repo::ProjectStorage;
pub use crate::types::{
    ChangeLevel, ExportedType, ExportedTypeName, FileStatus, FileType, Import, ModuleId, ProjectData, SourceContextId,
    SourceId, SynchronizationPackage, Type, TypeId,
};
pub use qmlsync_parse::models::{
    AccessSemantics, EnumerationDeclaration, EnumeratorDeclaration, FunctionDeclaration, ParameterDeclaration,
    PropertyDeclaration, SignalDeclaration, Version,
};
