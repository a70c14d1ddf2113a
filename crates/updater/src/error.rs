//! Updater Error Types
//!
//! This module provides structured errors using `exn` for automatic location
//! tracking and error tree construction.

use derive_more::{Display, Error};
use std::path::PathBuf;

/// An updater error with automatic location tracking.
pub type Error = exn::Exn<ErrorKind>;
/// Result type alias for updater operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Classifies why an update run was aborted.
///
/// No run that fails commits anything: the storage is left exactly as the
/// previous successful run left it.
///
/// ### Project Errors
/// - [`ErrorKind::CannotParseQmlTypes`]
/// - [`ErrorKind::CannotParseQmlDocument`]
///
/// ### Dependency Errors
/// - [`ErrorKind::Storage`]
/// - [`ErrorKind::FileSystem`]
/// - [`ErrorKind::Project`]
#[derive(Debug, Display, Error, PartialEq, Eq)]
pub enum ErrorKind {
    /// A declared qmltypes file is missing or cannot be parsed.
    #[display("cannot parse qmltypes file: {}", _0.display())]
    CannotParseQmlTypes(#[error(not(source))] PathBuf),
    /// A declared QML document is missing or could not be parsed.
    #[display("cannot parse QML document: {}", _0.display())]
    CannotParseQmlDocument(#[error(not(source))] PathBuf),
    /// The project storage (or the path cache backed by it) failed.
    #[display("project storage error")]
    Storage,
    /// A file could not be stat'ed or read.
    #[display("filesystem error")]
    FileSystem,
    /// The project manager could not enumerate manifests.
    #[display("project manager error")]
    Project,
}

impl ErrorKind {
    /// Returns `true` if retrying might succeed.
    pub fn is_retryable(&self) -> bool {
        // Fixing a broken project takes a human.
        matches!(self, Self::Storage | Self::FileSystem)
    }
}
