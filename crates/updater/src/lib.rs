//! Incremental updater for the QML project storage.
//!
//! A [`ProjectUpdater`] walks the module manifests (`qmldir` files) a
//! [`ProjectManager`] lists and decides per file whether it changed since the
//! last run, using the size and modification time recorded in the storage.
//! Only changed manifests, qmltypes files and QML documents are parsed; the
//! findings of one run are committed as a single
//! [`SynchronizationPackage`](qmlsync_store::SynchronizationPackage).
//!
//! A declared file that is missing, or that cannot be parsed, aborts the run
//! with [`ErrorKind::CannotParseQmlTypes`](error::ErrorKind::CannotParseQmlTypes)
//! or [`ErrorKind::CannotParseQmlDocument`](error::ErrorKind::CannotParseQmlDocument)
//! and nothing is committed.

pub mod error;
mod project;
mod status;
mod storage;
mod translate;
mod updater;

pub use crate::project::{DiscoveredProject, ProjectManager, QMLDIR, StaticProject};
pub use crate::status::FileStatusCache;
pub use crate::storage::SymbolStorage;
pub use crate::updater::{IdPaths, ProjectUpdater, UpdateSummary};
